use async_trait::async_trait;
use reqwest::Client;

use crate::clients::{post_json, VectorSupplier};
use crate::crypto::validation::{validate_authentication_vector, HexVector};
use crate::types::aka::RAND_LEN;
use crate::types::supplier::{MultimediaAuthAnswer, MultimediaAuthRequest};
use crate::types::vector::{ResyncInfo, SubscriberProfile, SupplierError, VectorAnswer};

const SCHEME_AKA: &str = "EAP-AKA";
const SCHEME_SIM: &str = "EAP-SIM";

/// Vector supplier backed by the SWx (Multimedia-Auth) proxy.
pub struct SwxClient {
    client: Client,
    base_url: String,
}

impl SwxClient {
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl VectorSupplier for SwxClient {
    async fn authenticate(
        &self,
        imsi: &str,
        num_vectors: u32,
        resync: Option<ResyncInfo>,
    ) -> Result<VectorAnswer, SupplierError> {
        let request = MultimediaAuthRequest {
            user_name: imsi.to_string(),
            authentication_scheme: SCHEME_AKA.to_string(),
            number_of_vectors: num_vectors,
            resync_info: resync.map(|r| r.to_hex()),
            retrieve_user_profile: true,
        };

        let url = format!("{}/swx/v1/multimedia-auth", self.base_url);
        tracing::debug!("Requesting {} vector(s) for {} from SWx proxy", num_vectors, imsi);

        let answer: MultimediaAuthAnswer = post_json(&self.client, &url, &request).await?;
        into_vector_answer(answer)
    }
}

fn into_vector_answer(answer: MultimediaAuthAnswer) -> Result<VectorAnswer, SupplierError> {
    if answer.authentication_scheme.as_deref() == Some(SCHEME_SIM) {
        return Ok(VectorAnswer::CircuitSwitchedOnly);
    }

    if answer.sip_auth_vectors.is_empty() {
        return Err(SupplierError::Malformed("SWx answer carries no vectors".to_string()));
    }

    let vectors = answer
        .sip_auth_vectors
        .iter()
        .map(|v| {
            let split = (RAND_LEN * 2).min(v.rand_autn.len());
            if !v.rand_autn.is_char_boundary(split) {
                return Err(SupplierError::Malformed("non-ASCII randAutn".to_string()));
            }
            let (rand, autn) = v.rand_autn.split_at(split);
            validate_authentication_vector(&HexVector {
                rand,
                autn,
                xres: &v.xres,
                ik: &v.integrity_key,
                ck: &v.confidentiality_key,
                ak: v.anonymity_key.as_deref(),
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
