use serde::{Deserialize, Serialize};

use crate::types::vector::SupplierError;

/// Request and response body of `POST /eap/v1/handle`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EapMessage {
    /// Base64 encoded EAP packet.
    pub eap_payload: String,
    #[serde(default)]
    pub ctx: EapContext,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EapContext {
    pub session_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub imsi: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub msisdn: String,
    /// Hex encoded MSK, present once authentication succeeded.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub msk: String,
    /// Hex encoded MS-MPPE-Recv-Key and MS-MPPE-Send-Key material split from
    /// the MSK. Wrapping them into RADIUS attributes is up to the caller.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mppe_recv_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mppe_send_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub identity: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub auth_session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EapResult {
    pub eap_payload: String,
    pub ctx: EapContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<UpstreamStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpstreamCode {
    PermissionDenied,
    NotFound,
    Unavailable,
    Internal,
}

/// Vector supplier failure reported next to the Notification packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamStatus {
    pub code: UpstreamCode,
    pub message: String,
}

impl From<&SupplierError> for UpstreamStatus {
    fn from(err: &SupplierError) -> Self {
        let code = match err {
            SupplierError::PermissionDenied(_) => UpstreamCode::PermissionDenied,
            SupplierError::NotSubscribed(_) => UpstreamCode::NotFound,
            SupplierError::Unavailable(_) => UpstreamCode::Unavailable,
            SupplierError::Malformed(_) => UpstreamCode::Internal,
        };
        Self {
            code,
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodsResponse {
    pub methods: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context_defaults_and_skips_empty_fields() {
        let msg: EapMessage = serde_json::from_value(json!({ "eapPayload": "AgEABQE=" })).unwrap();
        assert_eq!(msg.ctx, EapContext::default());

        let ctx = EapContext {
            session_id: "s1".to_string(),
            imsi: "001010000000055".to_string(),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&ctx).unwrap(),
            json!({ "sessionId": "s1", "imsi": "001010000000055" })
        );
    }

    #[test]
    fn test_upstream_status_from_supplier_error() {
        let status = UpstreamStatus::from(&SupplierError::NotSubscribed("unknown imsi".to_string()));
        assert_eq!(status.code, UpstreamCode::NotFound);
        assert_eq!(
            serde_json::to_value(&status).unwrap()["code"],
            json!("NOT_FOUND")
        );
    }
}
