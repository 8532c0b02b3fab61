use axum::{extract::State, Json};
use base64::Engine;

use crate::types::api::{EapMessage, EapResult, MethodsResponse};
use crate::types::eap::Packet;
use crate::types::{AppError, AppState};

pub async fn handle(
    State(state): State<AppState>,
    Json(payload): Json<EapMessage>,
) -> Result<Json<EapResult>, AppError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&payload.eap_payload)
        .map_err(|e| AppError::BadRequest(format!("Invalid base64 EAP payload: {}", e)))?;

    let packet = Packet::parse(bytes)
        .map_err(|e| AppError::BadRequest(format!("Invalid EAP packet: {}", e)))?;

    tracing::debug!(
        session_id = %payload.ctx.session_id,
        "Received EAP packet: code={:?} id={} method={:?}",
        packet.code(),
        packet.identifier(),
        packet.method_type()
    );

    let outcome = state.registry.dispatch(packet, payload.ctx).await?;

    Ok(Json(EapResult {
        eap_payload: base64::engine::general_purpose::STANDARD.encode(outcome.packet.as_bytes()),
        ctx: outcome.ctx,
        status: outcome.status,
    }))
}

pub async fn supported_methods(State(state): State<AppState>) -> Json<MethodsResponse> {
    Json(MethodsResponse {
        methods: state.registry.supported_methods(),
    })
}
