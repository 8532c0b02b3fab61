use super::{reject, AkaProvider, Step};
use crate::crypto::aka::verify_packet_mac;
use crate::crypto::mppe::mppe_keys_from_msk;
use crate::providers::EapOutcome;
use crate::types::aka::{find_attribute, parse_mac, parse_res, AkaAttributeType, AttributeError, NotificationCode};
use crate::types::api::EapContext;
use crate::types::eap::{EapCode, Packet};
use crate::types::error::AppError;
use crate::types::user_ctx::{AkaState, UserCtx};

pub(super) async fn handle(provider: &AkaProvider, packet: Packet, mut ctx: EapContext) -> Result<EapOutcome, AppError> {
    let identifier = packet.identifier();

    let Some((imsi, mut user)) = provider.store.find_session(&ctx.session_id).await else {
        tracing::warn!(session_id = %ctx.session_id, "AKA-Challenge response for unknown session");
        return reject(identifier.wrapping_add(1), ctx);
    };

    let step = verify(provider, &mut user, &packet, &imsi).await;

    if let Ok(step) = &step {
        if step.packet.code() == EapCode::Success {
            ctx.imsi = imsi;
            ctx.identity = user.identity.clone();
            ctx.msisdn = user.profile.msisdn.clone().unwrap_or_default();
            ctx.auth_session_id = user.auth_session_id.clone();
            if let Some(keys) = &user.keys {
                let (recv, send) = mppe_keys_from_msk(&keys.msk);
                ctx.msk = hex::encode(keys.msk);
                ctx.mppe_recv_key = hex::encode(recv);
                ctx.mppe_send_key = hex::encode(send);
            }
        }
    }

    provider.finish(user, step, ctx).await
}

async fn verify(provider: &AkaProvider, user: &mut UserCtx, packet: &Packet, imsi: &str) -> Result<Step, AppError> {
    let identifier = packet.identifier();
    let next_id = identifier.wrapping_add(1);
    let retransmit = user.state() == AkaState::Authenticated;

    if !retransmit && user.state() != AkaState::Challenge {
        tracing::warn!(
            session_id = %user.session_id,
            "AKA-Challenge response in state {:?}",
            user.state()
        );
    }

    let Some(k_aut) = user.k_aut().map(<[u8]>::to_vec) else {
        tracing::warn!(session_id = %user.session_id, "No challenge outstanding");
        return provider.failure_step(user, next_id, NotificationCode::Failure);
    };

    let (mac_offset, res) = match read_attributes(packet) {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(session_id = %user.session_id, "Malformed AKA-Challenge response: {}", e);
            return provider.failure_step(user, next_id, NotificationCode::Failure);
        }
    };

    if !verify_packet_mac(packet.as_bytes(), mac_offset, &k_aut) {
        tracing::warn!(session_id = %user.session_id, imsi, "AT_MAC mismatch");
        return provider.failure_step(user, next_id, NotificationCode::Failure);
    }

    if res != user.xres {
        tracing::warn!(session_id = %user.session_id, imsi, "AT_RES mismatch");
        return provider.failure_step(user, next_id, NotificationCode::Failure);
    }

    if !retransmit {
        if let Some(sqn) = user.sqn {
            if let Err(e) = provider.store.accept_sqn(imsi, sqn).await {
                tracing::warn!(session_id = %user.session_id, imsi, "{}", e);
                return provider.failure_step(user, next_id, NotificationCode::Failure);
            }
        }
        tracing::info!(
            session_id = %user.session_id,
            imsi,
            elapsed_ms = user.age().as_millis() as u64,
            "EAP-AKA authentication succeeded"
        );
    } else {
        tracing::debug!(session_id = %user.session_id, "Repeating Success for retransmitted response");
    }

    user.set_state(AkaState::Authenticated);
    user.identifier = identifier;

    Ok(Step {
        packet: Packet::success(identifier),
        timeout: provider.config.timeouts.authenticated,
        status: None,
    })
}

/// Offset of the AT_MAC value and the RES carried by the response.
fn read_attributes(packet: &Packet) -> Result<(usize, Vec<u8>), AttributeError> {
    let mac = find_attribute(packet, AkaAttributeType::AtMac)?;
    parse_mac(&mac)?;
    let res = parse_res(&find_attribute(packet, AkaAttributeType::AtRes)?)?;
    Ok((mac.value_offset() + 2, res))
}
