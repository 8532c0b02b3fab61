use serde::{Deserialize, Serialize};

/// SWx Multimedia-Auth-Request as relayed to the SWx proxy.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultimediaAuthRequest {
    pub user_name: String,
    pub authentication_scheme: String,
    pub number_of_vectors: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resync_info: Option<String>,
    pub retrieve_user_profile: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultimediaAuthAnswer {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub authentication_scheme: Option<String>,
    #[serde(default)]
    pub sip_auth_vectors: Vec<SipAuthVector>,
    #[serde(default)]
    pub msisdn: Option<String>,
}

/// `randAutn` is RAND followed by AUTN.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SipAuthVector {
    pub rand_autn: String,
    pub xres: String,
    pub confidentiality_key: String,
    pub integrity_key: String,
    #[serde(default)]
    pub anonymity_key: Option<String>,
}

/// S6a Authentication-Information-Request as relayed to the S6a proxy.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationInformationRequest {
    pub user_name: String,
    pub num_requested_utran_vectors: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resync_info: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationInformationAnswer {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub utran_vectors: Vec<UtranVector>,
    #[serde(default)]
    pub geran_vectors: Vec<GeranVector>,
    #[serde(default)]
    pub msisdn: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtranVector {
    pub rand: String,
    pub xres: String,
    pub autn: String,
    pub ck: String,
    pub ik: String,
    #[serde(default)]
    pub ak: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeranVector {
    pub rand: String,
    pub sres: String,
    pub kc: String,
}
