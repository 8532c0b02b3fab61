use async_trait::async_trait;
use reqwest::Client;

use crate::clients::{post_json, VectorSupplier};
use crate::crypto::validation::{validate_authentication_vector, HexVector};
use crate::types::supplier::{AuthenticationInformationAnswer, AuthenticationInformationRequest};
use crate::types::vector::{ResyncInfo, SubscriberProfile, SupplierError, VectorAnswer};

/// Vector supplier backed by the S6a (Authentication-Information) proxy.
pub struct S6aClient {
    client: Client,
    base_url: String,
}

impl S6aClient {
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl VectorSupplier for S6aClient {
    async fn authenticate(
        &self,
        imsi: &str,
        num_vectors: u32,
        resync: Option<ResyncInfo>,
    ) -> Result<VectorAnswer, SupplierError> {
        let request = AuthenticationInformationRequest {
            user_name: imsi.to_string(),
            num_requested_utran_vectors: num_vectors,
            resync_info: resync.map(|r| r.to_hex()),
        };

        let url = format!("{}/s6a/v1/authentication-information", self.base_url);
        tracing::debug!("Requesting {} vector(s) for {} from S6a proxy", num_vectors, imsi);

        let answer: AuthenticationInformationAnswer = post_json(&self.client, &url, &request).await?;
        into_vector_answer(answer)
    }
}

fn into_vector_answer(answer: AuthenticationInformationAnswer) -> Result<VectorAnswer, SupplierError> {
    if answer.utran_vectors.is_empty() {
        if !answer.geran_vectors.is_empty() {
            return Ok(VectorAnswer::CircuitSwitchedOnly);
        }
        return Err(SupplierError::Malformed("S6a answer carries no vectors".to_string()));
    }

    let vectors = answer
        .utran_vectors
        .iter()
        .map(|v| {
            validate_authentication_vector(&HexVector {
                rand: &v.rand,
                autn: &v.autn,
                xres: &v.xres,
                ik: &v.ik,
                ck: &v.ck,
                ak: v.ak.as_deref(),
            })
            .map_err(|e| SupplierError::Malformed(e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(VectorAnswer::Vectors {
        vectors,
        session_id: answer.session_id,
        profile: SubscriberProfile {
            msisdn: answer.msisdn,
        },
    })
}
