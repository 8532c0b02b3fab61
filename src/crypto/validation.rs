use crate::types::aka::{AUTN_LEN, MAX_RES_LEN, MIN_RES_LEN, RAND_LEN, SQN_LEN};
use crate::types::vector::{AuthVector, KEY_LEN};

pub type ValidationResult<T> = Result<T, ValidationError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid RAND length: expected {expected} hex chars, got {actual}")]
    InvalidRandLength { expected: usize, actual: usize },
    #[error("Invalid AUTN length: expected {expected} hex chars, got {actual}")]
    InvalidAutnLength { expected: usize, actual: usize },
    #[error("Invalid XRES length: expected {min}-{max} hex chars, got {actual}")]
    InvalidXresLength { min: usize, max: usize, actual: usize },
    #[error("Invalid {field} length: expected {expected} hex chars, got {actual}")]
    InvalidKeyLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Invalid AK length: expected {expected} hex chars, got {actual}")]
    InvalidAkLength { expected: usize, actual: usize },
    #[error("Invalid hex encoding in field: {0}")]
    InvalidHexEncoding(&'static str),
}

/// Authentication vector as carried on the wire by the vector suppliers, all
/// fields hex encoded.
#[derive(Debug, Clone, Default)]
pub struct HexVector<'a> {
    pub rand: &'a str,
    pub autn: &'a str,
    pub xres: &'a str,
    pub ik: &'a str,
    pub ck: &'a str,
    pub ak: Option<&'a str>,
}

pub fn validate_authentication_vector(av: &HexVector<'_>) -> ValidationResult<AuthVector> {
    validate_hex(av.rand, "rand")?;
    validate_hex(av.autn, "autn")?;
    validate_hex(av.xres, "xres")?;
    validate_hex(av.ik, "ik")?;
    validate_hex(av.ck, "ck")?;

    if av.rand.len() != RAND_LEN * 2 {
        return Err(ValidationError::InvalidRandLength {
            expected: RAND_LEN * 2,
            actual: av.rand.len(),
        });
    }

    if av.autn.len() != AUTN_LEN * 2 {
        return Err(ValidationError::InvalidAutnLength {
            expected: AUTN_LEN * 2,
            actual: av.autn.len(),
        });
    }

    if av.xres.len() < MIN_RES_LEN * 2 || av.xres.len() > MAX_RES_LEN * 2 {
        return Err(ValidationError::InvalidXresLength {
            min: MIN_RES_LEN * 2,
            max: MAX_RES_LEN * 2,
            actual: av.xres.len(),
        });
    }

    for (field, value) in [("IK", av.ik), ("CK", av.ck)] {
        if value.len() != KEY_LEN * 2 {
            return Err(ValidationError::InvalidKeyLength {
                field,
                expected: KEY_LEN * 2,
                actual: value.len(),
            });
        }
    }

    let ak = match av.ak.filter(|ak| !ak.is_empty()) {
        Some(ak) => {
            validate_hex(ak, "ak")?;
            if ak.len() != SQN_LEN * 2 {
                return Err(ValidationError::InvalidAkLength {
                    expected: SQN_LEN * 2,
                    actual: ak.len(),
                });
            }
            Some(decode_array(ak, "ak")?)
        }
        None => None,
    };

    Ok(AuthVector {
        rand: decode_array(av.rand, "rand")?,
        autn: decode_array(av.autn, "autn")?,
        xres: hex::decode(av.xres).map_err(|_| ValidationError::InvalidHexEncoding("xres"))?,
        ik: decode_array(av.ik, "ik")?,
        ck: decode_array(av.ck, "ck")?,
        ak,
    })
}

fn validate_hex(value: &str, field_name: &'static str) -> ValidationResult<()> {
    if !value.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::InvalidHexEncoding(field_name));
    }
    Ok(())
}

fn decode_array<const N: usize>(value: &str, field_name: &'static str) -> ValidationResult<[u8; N]> {
    let mut out = [0u8; N];
    hex::decode_to_slice(value, &mut out).map_err(|_| ValidationError::InvalidHexEncoding(field_name))?;
    Ok(out)
}
