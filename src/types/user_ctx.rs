use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use crate::crypto::aka::AkaKeys;
use crate::types::aka::{AUTN_LEN, RAND_LEN};
use crate::types::vector::SubscriberProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AkaState {
    None,
    Created,
    Identity,
    Challenge,
    Authenticated,
    Redirected,
}

impl AkaState {
    pub fn can_transition_to(self, next: AkaState) -> bool {
        use AkaState::*;

        match (self, next) {
            (_, Created) => true,
            (_, Redirected) => true,
            (Created, Identity) | (Redirected, Identity) => true,
            (Created | Identity | Redirected, Challenge) => true,
            (Challenge, Challenge) => true,
            (Challenge | Authenticated, Authenticated) => true,
            _ => false,
        }
    }
}

/// Per-subscriber authentication context. Only reachable through a
/// [`LockedUserCtx`](crate::types::session_store::LockedUserCtx).
#[derive(Debug)]
pub struct UserCtx {
    pub session_id: String,
    pub imsi: String,
    pub identity: String,
    state: AkaState,
    state_changed_at: Instant,
    pub rand: [u8; RAND_LEN],
    pub autn: [u8; AUTN_LEN],
    pub xres: Vec<u8>,
    pub keys: Option<AkaKeys>,
    /// SQN of the outstanding challenge, known only when the vector carried AK.
    pub sqn: Option<u64>,
    pub profile: SubscriberProfile,
    pub auth_session_id: String,
    created_at: Instant,
    pub resync_attempts: u32,
    /// Identifier of the last request sent to the peer.
    pub identifier: u8,
}

impl UserCtx {
    pub fn new(session_id: &str, imsi: &str) -> Self {
        let now = Instant::now();
        Self {
            session_id: session_id.to_string(),
            imsi: imsi.to_string(),
            identity: String::new(),
            state: AkaState::None,
            state_changed_at: now,
            rand: [0; RAND_LEN],
            autn: [0; AUTN_LEN],
            xres: Vec::new(),
            keys: None,
            sqn: None,
            profile: SubscriberProfile::default(),
            auth_session_id: String::new(),
            created_at: now,
            resync_attempts: 0,
            identifier: 0,
        }
    }

    pub fn state(&self) -> AkaState {
        self.state
    }

    /// Time since the context was created.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Out-of-order transitions are logged and applied anyway; MAC and RES
    /// verification stay the security gate.
    pub fn set_state(&mut self, next: AkaState) {
        if !self.state.can_transition_to(next) {
            tracing::warn!(
                session_id = %self.session_id,
                "Unexpected EAP-AKA state transition: {:?} -> {:?}",
                self.state,
                next
            );
        } else {
            tracing::debug!(
                session_id = %self.session_id,
                in_state_ms = self.state_changed_at.elapsed().as_millis() as u64,
                "EAP-AKA state transition: {:?} -> {:?}",
                self.state,
                next
            );
        }
        self.state = next;
        self.state_changed_at = Instant::now();
    }

    pub fn k_aut(&self) -> Option<&[u8]> {
        self.keys.as_ref().map(|k| &k.k_aut[..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_age_tracks_creation() {
        let ctx = UserCtx::new("s1", "001010000000055");
        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(ctx.age() >= Duration::from_secs(3));
    }

    #[test]
    fn test_forward_path_is_valid() {
        assert!(AkaState::None.can_transition_to(AkaState::Created));
        assert!(AkaState::Created.can_transition_to(AkaState::Identity));
        assert!(AkaState::Identity.can_transition_to(AkaState::Challenge));
        assert!(AkaState::Challenge.can_transition_to(AkaState::Challenge));
        assert!(AkaState::Challenge.can_transition_to(AkaState::Authenticated));
        assert!(AkaState::Authenticated.can_transition_to(AkaState::Authenticated));
    }

    #[test]
    fn test_skipping_challenge_is_invalid() {
        assert!(!AkaState::Identity.can_transition_to(AkaState::Authenticated));
        assert!(!AkaState::Created.can_transition_to(AkaState::Authenticated));
        assert!(!AkaState::Authenticated.can_transition_to(AkaState::Challenge));
    }

    #[test]
    fn test_invalid_transition_still_applies() {
        let mut ctx = UserCtx::new("session-1", "001010000000055");
        ctx.set_state(AkaState::Authenticated);
        assert_eq!(ctx.state(), AkaState::Authenticated);
    }

    #[test]
    fn test_new_ctx_has_no_keys() {
        let ctx = UserCtx::new("session-1", "001010000000055");
        assert_eq!(ctx.state(), AkaState::None);
        assert!(ctx.k_aut().is_none());
        assert_eq!(ctx.resync_attempts, 0);
    }
}
