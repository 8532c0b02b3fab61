use super::{build_failed, reject, AkaProvider, Step};
use crate::providers::EapOutcome;
use crate::types::aka::{self, find_attribute, parse_identity, AkaAttributeType, NotificationCode};
use crate::types::api::EapContext;
use crate::types::eap::Packet;
use crate::types::error::AppError;
use crate::types::identity::{parse_permanent_identity, IdentityError};
use crate::types::user_ctx::{AkaState, UserCtx};
use crate::types::vector::VectorAnswer;

/// AKA-Identity response: opens the session, fetches one vector and issues the
/// challenge (or steers a 2G-only subscriber to EAP-SIM).
pub(super) async fn handle(provider: &AkaProvider, packet: Packet, mut ctx: EapContext) -> Result<EapOutcome, AppError> {
    let next_id = packet.identifier().wrapping_add(1);

    let identity = match find_attribute(&packet, AkaAttributeType::AtIdentity).and_then(|a| parse_identity(&a)) {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!(session_id = %ctx.session_id, "Invalid AKA-Identity response: {}", e);
            return reject(next_id, ctx);
        }
    };

    let imsi = match parse_permanent_identity(&identity) {
        Ok(imsi) => imsi,
        Err(IdentityError::UnsupportedType(kind)) => {
            tracing::info!(
                session_id = %ctx.session_id,
                "Identity type '{}' not supported, requesting permanent identity",
                kind
            );
            let request = aka::identity_request(next_id).map_err(build_failed)?;
            return Ok(EapOutcome::new(request, ctx));
        }
        Err(e) => {
            tracing::warn!(session_id = %ctx.session_id, "Rejecting identity {}: {}", identity, e);
            return reject(next_id, ctx);
        }
    };

    if let Err(e) = provider.config.plmn_filter.check(&imsi, provider.config.mnc_length) {
        tracing::warn!(session_id = %ctx.session_id, imsi = %imsi, "{}", e);
        let packet = super::notification(next_id, NotificationCode::AccessDenied, None)?;
        return Ok(EapOutcome::new(packet, ctx));
    }

    let mut user = provider.store.init_session(&ctx.session_id, imsi.as_str()).await;
    let redirected = user.state() == AkaState::Redirected;
    user.identity = identity.clone();
    user.set_state(AkaState::Identity);

    let step = issue(provider, &mut user, next_id, redirected).await;

    ctx.imsi = imsi.to_string();
    ctx.identity = identity;
    ctx.auth_session_id = user.auth_session_id.clone();
    provider.finish(user, step, ctx).await
}

async fn issue(provider: &AkaProvider, user: &mut UserCtx, next_id: u8, redirected: bool) -> Result<Step, AppError> {
    let imsi = user.imsi.clone();

    match provider.supplier.authenticate(&imsi, 1, None).await {
        Err(e) => provider.supplier_failure_step(user, next_id, &e),
        Ok(VectorAnswer::CircuitSwitchedOnly) if redirected => {
            tracing::warn!(session_id = %user.session_id, imsi = %imsi, "Subscriber already redirected, giving up");
            user.set_state(AkaState::Redirected);
            provider.failure_step(user, next_id, NotificationCode::Failure)
        }
        Ok(VectorAnswer::CircuitSwitchedOnly) => {
            tracing::info!(session_id = %user.session_id, imsi = %imsi, "No 3G vectors, redirecting to EAP-SIM");
            user.set_state(AkaState::Redirected);
            user.identifier = next_id;
            Ok(Step {
                packet: aka::redirect_request(next_id).map_err(build_failed)?,
                timeout: provider.config.timeouts.challenge,
                status: None,
            })
        }
        Ok(VectorAnswer::Vectors {
            vectors,
            session_id,
            profile,
        }) => {
            let Some(vector) = vectors.into_iter().next() else {
                return provider.failure_step(user, next_id, NotificationCode::Failure);
            };
            user.auth_session_id = session_id.unwrap_or_default();
            user.profile = profile;
            provider.challenge_step(user, vector, next_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::providers::EapProvider;
    use crate::types::aka::{identity_value, AkaSubtype};
    use crate::types::config::AkaConfig;
    use crate::types::eap::{Attribute, EapCode};
    use crate::types::identity::{Plmn, PlmnFilter};
    use crate::types::user_ctx::AkaState;
    use crate::types::vector::{SupplierError, VectorAnswer};
    use super::*;

    fn identity_response(identifier: u8, identity: &str) -> Packet {
        let mut packet = aka::new_aka_packet(EapCode::Response, identifier, AkaSubtype::Identity);
        packet
            .append(&Attribute::new(AkaAttributeType::AtIdentity.into(), &identity_value(identity)))
            .unwrap();
        packet
    }

    fn notification_code(packet: &Packet) -> u16 {
        let attr = find_attribute(packet, AkaAttributeType::AtNotification).unwrap();
        aka::parse_u16(&attr, AkaAttributeType::AtNotification).unwrap()
    }

    #[tokio::test]
    async fn test_identity_response_yields_exact_challenge() {
        let supplier = ScriptedSupplier::new(vec![vectors()]);
        let provider = provider(supplier.clone());

        let outcome = provider.handle(packet(IDENTITY_RESPONSE), ctx("s1")).await.unwrap();
        assert_eq!(hex::encode(outcome.packet.as_bytes()), CHALLENGE_REQUEST);
        assert_eq!(outcome.ctx.imsi, IMSI);
        assert_eq!(outcome.ctx.identity, IDENTITY);
        assert_eq!(outcome.ctx.auth_session_id, "hss;42");
        assert!(outcome.status.is_none());

        let calls = supplier.calls.lock().unwrap().clone();
        assert_eq!(calls, vec![(IMSI.to_string(), None)]);

        let (_, user) = provider.store().find_session("s1").await.unwrap();
        assert_eq!(user.state(), AkaState::Challenge);
        assert_eq!(user.identifier, 2);
        assert_eq!(user.profile.msisdn.as_deref(), Some("15551234567"));
    }

    #[tokio::test]
    async fn test_malformed_identity_yields_notification() {
        let provider = provider(ScriptedSupplier::new(vec![]));
        let request = aka::new_aka_packet(EapCode::Response, 4, AkaSubtype::Identity);

        let outcome = provider.handle(request, ctx("s1")).await.unwrap();
        assert_eq!(outcome.packet.identifier(), 5);
        assert_eq!(notification_code(&outcome.packet), NotificationCode::Failure as u16);
        assert!(!provider.store().contains("s1").await);
    }

    #[tokio::test]
    async fn test_pseudonym_asks_for_permanent_identity() {
        let provider = provider(ScriptedSupplier::new(vec![]));
        let request = identity_response(1, "2pseudonym@wlan.mnc001.mcc001.3gppnetwork.org");

        let outcome = provider.handle(request, ctx("s1")).await.unwrap();
        assert_eq!(outcome.packet.as_bytes(), aka::identity_request(2).unwrap().as_bytes());
    }

    #[tokio::test]
    async fn test_invalid_imsi_is_rejected() {
        let supplier = ScriptedSupplier::new(vec![]);
        let provider = provider(supplier.clone());

        let outcome = provider.handle(identity_response(1, "0123@realm"), ctx("s1")).await.unwrap();
        assert_eq!(notification_code(&outcome.packet), NotificationCode::Failure as u16);
        assert_eq!(supplier.call_count(), 0);
    }

    #[tokio::test]
    async fn test_foreign_plmn_is_denied() {
        let supplier = ScriptedSupplier::new(vec![vectors()]);
        let config = AkaConfig {
            plmn_filter: PlmnFilter::new([Plmn::parse("310150").unwrap()]),
            ..Default::default()
        };
        let provider = provider_with(config, supplier.clone());

        let outcome = provider.handle(packet(IDENTITY_RESPONSE), ctx("s1")).await.unwrap();
        assert_eq!(notification_code(&outcome.packet), NotificationCode::AccessDenied as u16);
        assert_eq!(supplier.call_count(), 0);
        assert!(!provider.store().contains("s1").await);
    }

    #[tokio::test]
    async fn test_supplier_error_is_reported() {
        let supplier = ScriptedSupplier::new(vec![Err(SupplierError::NotSubscribed("unknown".to_string()))]);
        let provider = provider(supplier);

        let outcome = provider.handle(packet(IDENTITY_RESPONSE), ctx("s1")).await.unwrap();
        assert_eq!(notification_code(&outcome.packet), NotificationCode::NotSubscribed as u16);
        assert_eq!(
            outcome.status.map(|s| s.code),
            Some(crate::types::api::UpstreamCode::NotFound)
        );
        assert!(provider.store().contains("s1").await);
    }

    #[tokio::test]
    async fn test_circuit_switched_only_redirects_once() {
        let supplier = ScriptedSupplier::new(vec![
            Ok(VectorAnswer::CircuitSwitchedOnly),
            Ok(VectorAnswer::CircuitSwitchedOnly),
        ]);
        let provider = provider(supplier);

        let outcome = provider.handle(packet(IDENTITY_RESPONSE), ctx("s1")).await.unwrap();
        assert_eq!(outcome.packet.as_bytes(), aka::redirect_request(2).unwrap().as_bytes());

        let outcome = provider.handle(packet(IDENTITY_RESPONSE), ctx("s1")).await.unwrap();
        assert_eq!(outcome.packet.subtype(), Some(AkaSubtype::Notification as u8));
        assert_eq!(notification_code(&outcome.packet), NotificationCode::Failure as u16);

        let (_, user) = provider.store().find_session("s1").await.unwrap();
        assert_eq!(user.state(), AkaState::Redirected);
    }

    #[tokio::test]
    async fn test_redirected_subscriber_can_still_get_challenge() {
        let supplier = ScriptedSupplier::new(vec![Ok(VectorAnswer::CircuitSwitchedOnly), vectors()]);
        let provider = provider(supplier);

        provider.handle(packet(IDENTITY_RESPONSE), ctx("s1")).await.unwrap();
        let outcome = provider.handle(packet(IDENTITY_RESPONSE), ctx("s1")).await.unwrap();
        assert_eq!(hex::encode(outcome.packet.as_bytes()), CHALLENGE_REQUEST);
    }
}
