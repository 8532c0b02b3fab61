use super::AkaProvider;
use crate::providers::EapOutcome;
use crate::types::aka::{find_attribute, parse_u16, AkaAttributeType, AkaSubtype, ClientErrorCode};
use crate::types::api::EapContext;
use crate::types::eap::Packet;
use crate::types::error::AppError;

/// Peer gave up (Authentication-Reject, Client-Error) or acknowledged our
/// Notification. The session ends with EAP-Failure either way.
pub(super) async fn handle(provider: &AkaProvider, packet: Packet, ctx: EapContext) -> Result<EapOutcome, AppError> {
    let session_id = ctx.session_id.as_str();

    match packet.subtype().and_then(AkaSubtype::from_u8) {
        Some(AkaSubtype::ClientError) => {
            match find_attribute(&packet, AkaAttributeType::AtClientErrorCode)
                .and_then(|a| parse_u16(&a, AkaAttributeType::AtClientErrorCode))
            {
                Ok(code) => tracing::warn!(
                    session_id,
                    "Peer reported client error {} ({:?})",
                    code,
                    ClientErrorCode::from_u16(code)
                ),
                Err(e) => tracing::warn!(session_id, "Peer reported client error: {}", e),
            }
        }
        Some(AkaSubtype::Notification) => {
            if let Ok(code) = find_attribute(&packet, AkaAttributeType::AtNotification)
                .and_then(|a| parse_u16(&a, AkaAttributeType::AtNotification))
            {
                tracing::info!(session_id, code, "Peer acknowledged notification");
            } else {
                tracing::info!(session_id, "Peer acknowledged notification");
            }
        }
        _ => tracing::warn!(session_id, "Peer rejected authentication"),
    }

    // waits for any round still holding the context so it cannot re-store it
    if let Some((_, user)) = provider.store.find_session(session_id).await {
        provider.store.remove_and_unlock(user).await;
    }
    Ok(EapOutcome::new(Packet::failure(packet.identifier()), ctx))
}
