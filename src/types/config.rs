use std::time::Duration;

use crate::types::error::AppError;
use crate::types::identity::{MncLength, Plmn, PlmnFilter};

pub const DEFAULT_CHALLENGE_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(12 * 60 * 60);
pub const DEFAULT_AUTHENTICATED_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_RESYNC_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub challenge: Duration,
    pub notification: Duration,
    pub session: Duration,
    pub authenticated: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            challenge: DEFAULT_CHALLENGE_TIMEOUT,
            notification: DEFAULT_NOTIFICATION_TIMEOUT,
            session: DEFAULT_SESSION_TIMEOUT,
            authenticated: DEFAULT_AUTHENTICATED_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorSource {
    Swx,
    S6a,
}

#[derive(Debug, Clone)]
pub struct AkaConfig {
    pub timeouts: Timeouts,
    pub plmn_filter: PlmnFilter,
    pub mnc_length: MncLength,
    pub vector_source: VectorSource,
    pub swx_uri: String,
    pub s6a_uri: String,
    pub max_resync_attempts: u32,
}

impl Default for AkaConfig {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::default(),
            plmn_filter: PlmnFilter::default(),
            mnc_length: MncLength::Three,
            vector_source: VectorSource::Swx,
            swx_uri: "http://127.0.0.1:9110".to_string(),
            s6a_uri: "http://127.0.0.1:9111".to_string(),
            max_resync_attempts: DEFAULT_MAX_RESYNC_ATTEMPTS,
        }
    }
}

impl AkaConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let millis = |key: &str, default: Duration| -> Result<Duration, AppError> {
            match lookup(key) {
                Some(v) => v
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .map_err(|e| AppError::ConfigError(format!("{}: {}", key, e))),
                None => Ok(default),
            }
        };

        let timeouts = Timeouts {
            challenge: millis("AKA_CHALLENGE_TIMEOUT_MS", defaults.timeouts.challenge)?,
            notification: millis("AKA_NOTIFICATION_TIMEOUT_MS", defaults.timeouts.notification)?,
            session: millis("AKA_SESSION_TIMEOUT_MS", defaults.timeouts.session)?,
            authenticated: millis("AKA_AUTHENTICATED_TIMEOUT_MS", defaults.timeouts.authenticated)?,
        };

        let plmn_filter = match lookup("AKA_PLMN_IDS") {
            Some(list) => PlmnFilter::new(
                list.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(|p| Plmn::parse(p).map_err(|e| AppError::ConfigError(format!("AKA_PLMN_IDS: {}", e))))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            None => defaults.plmn_filter,
        };

        let mnc_length = match lookup("AKA_MNC_LENGTH").as_deref() {
            None => defaults.mnc_length,
            Some("2") => MncLength::Two,
            Some("3") => MncLength::Three,
            Some(other) => {
                return Err(AppError::ConfigError(format!(
                    "AKA_MNC_LENGTH must be 2 or 3, got {}",
                    other
                )))
            }
        };

        let vector_source = match lookup("AKA_VECTOR_SOURCE").map(|s| s.to_ascii_lowercase()).as_deref() {
            None | Some("swx") => VectorSource::Swx,
            Some("s6a") => VectorSource::S6a,
            Some(other) => {
                return Err(AppError::ConfigError(format!(
                    "AKA_VECTOR_SOURCE must be swx or s6a, got {}",
                    other
                )))
            }
        };

        let max_resync_attempts = match lookup("AKA_MAX_RESYNC_ATTEMPTS") {
            Some(v) => v
                .parse()
                .map_err(|e| AppError::ConfigError(format!("AKA_MAX_RESYNC_ATTEMPTS: {}", e)))?,
            None => defaults.max_resync_attempts,
        };

        Ok(Self {
            timeouts,
            plmn_filter,
            mnc_length,
            vector_source,
            swx_uri: lookup("SWX_PROXY_URI").unwrap_or(defaults.swx_uri),
            s6a_uri: lookup("S6A_PROXY_URI").unwrap_or(defaults.s6a_uri),
            max_resync_attempts,
        })
    }
}
