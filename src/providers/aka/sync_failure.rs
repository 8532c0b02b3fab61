use super::{reject, AkaProvider, Step};
use crate::providers::EapOutcome;
use crate::types::aka::{find_attribute, parse_auts, AkaAttributeType, NotificationCode};
use crate::types::api::EapContext;
use crate::types::eap::Packet;
use crate::types::error::AppError;
use crate::types::user_ctx::UserCtx;
use crate::types::vector::{ResyncInfo, VectorAnswer};

/// AKA-Synchronization-Failure: hands RAND|AUTS back to the supplier and
/// challenges again with the fresh vector.
pub(super) async fn handle(provider: &AkaProvider, packet: Packet, ctx: EapContext) -> Result<EapOutcome, AppError> {
    let next_id = packet.identifier().wrapping_add(1);

    let Some((_, mut user)) = provider.store.find_session(&ctx.session_id).await else {
        tracing::warn!(session_id = %ctx.session_id, "AKA-Synchronization-Failure for unknown session");
        return reject(next_id, ctx);
    };

    let step = resynchronize(provider, &mut user, &packet, next_id).await;
    provider.finish(user, step, ctx).await
}

async fn resynchronize(provider: &AkaProvider, user: &mut UserCtx, packet: &Packet, next_id: u8) -> Result<Step, AppError> {
    let auts = match find_attribute(packet, AkaAttributeType::AtAuts).and_then(|a| parse_auts(&a)) {
        Ok(auts) => auts,
        Err(e) => {
            tracing::warn!(session_id = %user.session_id, "Invalid AKA-Synchronization-Failure: {}", e);
            return provider.failure_step(user, next_id, NotificationCode::Failure);
        }
    };

    if user.resync_attempts >= provider.config.max_resync_attempts {
        tracing::warn!(
            session_id = %user.session_id,
            imsi = %user.imsi,
            "Giving up after {} resynchronization attempts",
            user.resync_attempts
        );
        return provider.failure_step(user, next_id, NotificationCode::Failure);
    }
    user.resync_attempts += 1;

    let resync = ResyncInfo::new(&user.rand, &auts);
    let imsi = user.imsi.clone();
    tracing::info!(
        session_id = %user.session_id,
        imsi = %imsi,
        attempt = user.resync_attempts,
        "Resynchronizing sequence number"
    );

    match provider.supplier.authenticate(&imsi, 1, Some(resync)).await {
        Err(e) => provider.supplier_failure_step(user, next_id, &e),
        Ok(VectorAnswer::CircuitSwitchedOnly) => {
            tracing::warn!(session_id = %user.session_id, "Supplier answered resync with 2G vectors only");
            provider.failure_step(user, next_id, NotificationCode::Failure)
        }
        Ok(VectorAnswer::Vectors { vectors, .. }) => match vectors.into_iter().next() {
            Some(vector) => provider.challenge_step(user, vector, next_id),
            None => provider.failure_step(user, next_id, NotificationCode::Failure),
        },
    }
}
