use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

static PERMANENT_ID_REGEX: OnceLock<Regex> = OnceLock::new();

/// Leading digit of an EAP-AKA permanent identity (RFC 4187 section 4.1.1.6).
const PERMANENT_AKA_PREFIX: char = '0';

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("Unsupported identity type '{0}'")]
    UnsupportedType(char),
    #[error("Invalid permanent identity: {0}")]
    InvalidFormat(String),
    #[error("PLMN {0} is not permitted")]
    PlmnNotAllowed(Plmn),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Imsi(String);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Plmn {
    pub mcc: String,
    pub mnc: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MncLength {
    Two,
    Three,
}

impl MncLength {
    pub fn digits(self) -> usize {
        match self {
            MncLength::Two => 2,
            MncLength::Three => 3,
        }
    }
}

/// Parses the NAI carried in AT_IDENTITY. Only permanent AKA identities
/// (`0<IMSI>@realm`) are accepted.
pub fn parse_permanent_identity(identity: &str) -> Result<Imsi, IdentityError> {
    let first = identity
        .chars()
        .next()
        .ok_or_else(|| IdentityError::InvalidFormat("empty identity".to_string()))?;

    if first != PERMANENT_AKA_PREFIX {
        return Err(IdentityError::UnsupportedType(first));
    }

    let regex = PERMANENT_ID_REGEX.get_or_init(|| {
        Regex::new(r"^0(\d{6,15})(@.*)?$").expect("Invalid permanent identity regex")
    });

    let captures = regex
        .captures(identity)
        .ok_or_else(|| IdentityError::InvalidFormat(identity.to_string()))?;

    let imsi = captures
        .get(1)
        .ok_or_else(|| IdentityError::InvalidFormat(identity.to_string()))?
        .as_str();

    Imsi::parse(imsi)
}

impl Imsi {
    pub fn parse(digits: &str) -> Result<Self, IdentityError> {
        if digits.len() < 6 || digits.len() > 15 {
            return Err(IdentityError::InvalidFormat(format!(
                "IMSI must have 6-15 digits, got {}",
                digits.len()
            )));
        }

        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(IdentityError::InvalidFormat(
                "IMSI must contain only digits".to_string(),
            ));
        }

        Ok(Self(digits.to_string()))
    }

    pub fn plmn(&self, mnc_length: MncLength) -> Plmn {
        let mnc_end = 3 + mnc_length.digits();
        Plmn {
            mcc: self.0[0..3].to_string(),
            mnc: self.0[3..mnc_end].to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Imsi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Plmn {
    /// Accepts `MCCMNC` with a 2 or 3 digit MNC.
    pub fn parse(plmn: &str) -> Result<Self, String> {
        let plmn = plmn.trim();
        if plmn.len() < 5 || plmn.len() > 6 {
            return Err(format!("Invalid PLMN length: {}", plmn.len()));
        }

        let parsed = Plmn {
            mcc: plmn[0..3].to_string(),
            mnc: plmn[3..].to_string(),
        };
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.mcc.len() != 3 {
            return Err(format!("Invalid MCC length: expected 3, got {}", self.mcc.len()));
        }

        if self.mnc.len() != 2 && self.mnc.len() != 3 {
            return Err(format!("Invalid MNC length: expected 2 or 3, got {}", self.mnc.len()));
        }

        if !self.mcc.chars().all(|c| c.is_ascii_digit()) {
            return Err("MCC must contain only digits".to_string());
        }

        if !self.mnc.chars().all(|c| c.is_ascii_digit()) {
            return Err("MNC must contain only digits".to_string());
        }

        Ok(())
    }
}

impl fmt::Display for Plmn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.mcc, self.mnc)
    }
}

/// Allow-list of serving PLMNs. An empty list permits every subscriber.
#[derive(Debug, Clone, Default)]
pub struct PlmnFilter {
    allowed: HashSet<String>,
}

impl PlmnFilter {
    pub fn new(plmns: impl IntoIterator<Item = Plmn>) -> Self {
        Self {
            allowed: plmns.into_iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    /// The IMSI's PLMN is taken with the configured MNC length.
    pub fn check(&self, imsi: &Imsi, mnc_length: MncLength) -> Result<(), IdentityError> {
        if self.allowed.is_empty() {
            return Ok(());
        }

        let plmn = imsi.plmn(mnc_length);
        if self.allowed.contains(&plmn.to_string()) {
            return Ok(());
        }

        Err(IdentityError::PlmnNotAllowed(plmn))
    }
}
