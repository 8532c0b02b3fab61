use crate::types::aka::{AUTN_LEN, SQN_LEN};

/// Largest forward jump accepted between two consecutive sequence numbers.
pub const SQN_DELTA_LIMIT: u64 = 1 << 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SqnError {
    #[error("SQN {received} is not newer than accepted SQN {stored}")]
    Replayed { stored: u64, received: u64 },
    #[error("SQN {received} is too far ahead of accepted SQN {stored}")]
    OutOfRange { stored: u64, received: u64 },
}

/// Recovers SQN from the first six bytes of AUTN (SQN ⊕ AK).
pub fn extract_sqn(autn: &[u8; AUTN_LEN], ak: &[u8; SQN_LEN]) -> u64 {
    autn[..SQN_LEN]
        .iter()
        .zip(ak.iter())
        .fold(0u64, |acc, (a, k)| (acc << 8) | (a ^ k) as u64)
}

/// SEQ must be strictly newer than the stored value and within
/// [`SQN_DELTA_LIMIT`] of it. A failure signals a synchronization failure.
pub fn check_freshness(stored: Option<u64>, received: u64) -> Result<(), SqnError> {
    let Some(stored) = stored else {
        return Ok(());
    };

    if received <= stored {
        return Err(SqnError::Replayed { stored, received });
    }

    if received - stored >= SQN_DELTA_LIMIT {
        return Err(SqnError::OutOfRange { stored, received });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_sqn() {
        let mut autn = [0u8; AUTN_LEN];
        autn[..6].copy_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x12, 0x34]);
        assert_eq!(extract_sqn(&autn, &[0; SQN_LEN]), 0x1234);

        let ak = [0xA5, 0x5A, 0xFF, 0x00, 0x0F, 0xF0];
        let mut concealed = autn;
        for (b, k) in concealed.iter_mut().zip(ak.iter()) {
            *b ^= k;
        }
        assert_eq!(extract_sqn(&concealed, &ak), 0x1234);
    }

    #[test]
    fn test_first_sqn_is_accepted() {
        assert!(check_freshness(None, 0).is_ok());
    }

    #[test]
    fn test_replayed_sqn_rejected() {
        assert_eq!(
            check_freshness(Some(100), 100),
            Err(SqnError::Replayed { stored: 100, received: 100 })
        );
        assert!(check_freshness(Some(100), 99).is_err());
    }

    #[test]
    fn test_window_bounds() {
        assert!(check_freshness(Some(100), 101).is_ok());
        assert!(check_freshness(Some(100), 100 + SQN_DELTA_LIMIT - 1).is_ok());
        assert_eq!(
            check_freshness(Some(100), 100 + SQN_DELTA_LIMIT),
            Err(SqnError::OutOfRange { stored: 100, received: 100 + SQN_DELTA_LIMIT })
        );
    }
}
