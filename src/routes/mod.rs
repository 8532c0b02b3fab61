use axum::{routing::{get, post}, Router};
use crate::handlers::{eap, health};
use crate::types::AppState;

pub fn create_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/status", get(health::status))
        .route("/eap/v1/handle", post(eap::handle))
        .route("/eap/v1/methods", get(eap::supported_methods))
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use base64::Engine;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::providers::aka::test_support::*;
    use crate::providers::ProviderRegistry;

    fn app() -> Router {
        let provider = provider(ScriptedSupplier::new(vec![vectors()]));
        let store = Arc::clone(provider.store());
        let registry = ProviderRegistry::new().register(Arc::new(provider));
        create_routes(AppState::new(registry, store))
    }

    async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn post_eap(payload: &[u8], session_id: &str) -> Request<Body> {
        let body = json!({
            "eapPayload": base64::engine::general_purpose::STANDARD.encode(payload),
            "ctx": { "sessionId": session_id },
        });
        Request::post("/eap/v1/handle")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn decode(value: &Value) -> Vec<u8> {
        base64::engine::general_purpose::STANDARD
            .decode(value["eapPayload"].as_str().unwrap())
            .unwrap()
    }

    #[tokio::test]
    async fn test_methods() {
        let (status, body) = call(&app(), Request::get("/eap/v1/methods").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "methods": [23] }));
    }

    #[tokio::test]
    async fn test_full_authentication_over_http() {
        let app = app();

        let (status, body) = call(&app, post_eap(&hex::decode(IDENTITY_RESPONSE).unwrap(), "radius-1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(hex::encode(decode(&body)), CHALLENGE_REQUEST);
        assert_eq!(body["ctx"]["imsi"], IMSI);

        let (status, body) = call(&app, post_eap(&hex::decode(CHALLENGE_RESPONSE).unwrap(), "radius-1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(decode(&body), vec![3, 2, 0, 4]);
        assert_eq!(body["ctx"]["msisdn"], "15551234567");
        assert_eq!(body["ctx"]["msk"].as_str().map(str::len), Some(128));
        assert_eq!(body["ctx"]["mppeRecvKey"].as_str().map(str::len), Some(64));

        let (_, body) = call(&app, Request::get("/status").body(Body::empty()).unwrap()).await;
        assert_eq!(body["activeSessions"], 1);
        assert_eq!(body["trackedSubscribers"], 0);
    }

    #[tokio::test]
    async fn test_invalid_payloads_are_bad_requests() {
        let app = app();

        let request = Request::post("/eap/v1/handle")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"eapPayload":"***"}"#))
            .unwrap();
        let (status, body) = call(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);

        let (status, _) = call(&app, post_eap(&[2, 1, 0, 9, 23], "radius-1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_subtype_is_not_found() {
        let (status, _) = call(&app(), post_eap(&[2, 1, 0, 8, 23, 99, 0, 0], "radius-1")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
