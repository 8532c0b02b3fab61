pub mod s6a;
pub mod swx;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Serialize};

use crate::types::vector::{ResyncInfo, SupplierError, VectorAnswer};

pub use s6a::S6aClient;
pub use swx::SwxClient;

/// Source of authentication vectors for a subscriber.
#[async_trait]
pub trait VectorSupplier: Send + Sync {
    async fn authenticate(
        &self,
        imsi: &str,
        num_vectors: u32,
        resync: Option<ResyncInfo>,
    ) -> Result<VectorAnswer, SupplierError>;
}

pub(crate) fn status_error(status: StatusCode, body: String) -> SupplierError {
    let detail = format!("status {}: {}", status, body);
    match status {
        StatusCode::FORBIDDEN => SupplierError::PermissionDenied(detail),
        StatusCode::NOT_FOUND => SupplierError::NotSubscribed(detail),
        _ => SupplierError::Unavailable(detail),
    }
}

pub(crate) async fn post_json<Req, Resp>(
    client: &reqwest::Client,
    url: &str,
    request: &Req,
) -> Result<Resp, SupplierError>
where
    Req: Serialize + ?Sized,
    Resp: DeserializeOwned,
{
    let response = client
        .post(url)
        .json(request)
        .send()
        .await
        .map_err(|e| SupplierError::Unavailable(format!("request to {} failed: {}", url, e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(status_error(status, error_text));
    }

    response
        .json::<Resp>()
        .await
        .map_err(|e| SupplierError::Malformed(format!("undecodable answer: {}", e)))
}
