use serde::{Deserialize, Serialize};

use crate::types::aka::{AUTN_LEN, AUTS_LEN, RAND_LEN, SQN_LEN};

pub const KEY_LEN: usize = 16;
pub const RESYNC_INFO_LEN: usize = RAND_LEN + AUTS_LEN;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthVector {
    pub rand: [u8; RAND_LEN],
    pub autn: [u8; AUTN_LEN],
    pub xres: Vec<u8>,
    pub ik: [u8; KEY_LEN],
    pub ck: [u8; KEY_LEN],
    /// Anonymity key, when the supplier discloses it.
    pub ak: Option<[u8; SQN_LEN]>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msisdn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VectorAnswer {
    Vectors {
        vectors: Vec<AuthVector>,
        session_id: Option<String>,
        profile: SubscriberProfile,
    },
    /// Subscriber only has 2G (GSM triplet) credentials.
    CircuitSwitchedOnly,
}

/// RAND | AUTS handed back to the home network after a synchronization failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResyncInfo(pub [u8; RESYNC_INFO_LEN]);

impl ResyncInfo {
    pub fn new(rand: &[u8; RAND_LEN], auts: &[u8; AUTS_LEN]) -> Self {
        let mut info = [0u8; RESYNC_INFO_LEN];
        info[..RAND_LEN].copy_from_slice(rand);
        info[RAND_LEN..].copy_from_slice(auts);
        Self(info)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SupplierError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("User not subscribed: {0}")]
    NotSubscribed(String),
    #[error("Vector supplier unavailable: {0}")]
    Unavailable(String),
    #[error("Malformed authentication vector: {0}")]
    Malformed(String),
}
