use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::task::JoinHandle;

use crate::crypto::sqn::{check_freshness, SqnError};
use crate::types::error::AppError;
use crate::types::user_ctx::{AkaState, UserCtx};

type SessionTable = Arc<RwLock<HashMap<String, SessionCtx>>>;

/// Table entry. Replaced wholesale whenever its timeout is rescheduled, so a
/// timer armed for an older generation finds a different entry and does
/// nothing.
struct SessionCtx {
    generation: u64,
    user: Arc<Mutex<UserCtx>>,
    timer: JoinHandle<()>,
    redirected: bool,
}

/// Exclusive handle on a subscriber's context. Holding one is the lock.
pub struct LockedUserCtx {
    cell: Arc<Mutex<UserCtx>>,
    guard: OwnedMutexGuard<UserCtx>,
}

impl Deref for LockedUserCtx {
    type Target = UserCtx;

    fn deref(&self) -> &UserCtx {
        &self.guard
    }
}

impl DerefMut for LockedUserCtx {
    fn deref_mut(&mut self) -> &mut UserCtx {
        &mut self.guard
    }
}

impl LockedUserCtx {
    async fn lock(cell: Arc<Mutex<UserCtx>>) -> Self {
        let guard = Arc::clone(&cell).lock_owned().await;
        Self { cell, guard }
    }
}

pub struct SessionStore {
    sessions: SessionTable,
    next_generation: AtomicU64,
    /// Newest accepted SQN per IMSI. Entries outlive sessions because they are
    /// the replay protection; the map holds one `u64` per subscriber that ever
    /// authenticated, so it is bounded by the subscriber population.
    accepted_sqn: RwLock<HashMap<String, u64>>,
    session_timeout: Duration,
}

impl SessionStore {
    pub fn new(session_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            next_generation: AtomicU64::new(1),
            accepted_sqn: RwLock::new(HashMap::new()),
            session_timeout,
        }
    }

    /// Creates (or replaces) the session and returns its context already
    /// locked. A `Redirected` state on the replaced session carries over.
    pub async fn init_session(&self, session_id: &str, imsi: &str) -> LockedUserCtx {
        let cell = Arc::new(Mutex::new(UserCtx::new(session_id, imsi)));
        let mut ctx = LockedUserCtx::lock(Arc::clone(&cell)).await;

        let mut sessions = self.sessions.write().await;
        let redirected = match sessions.remove(session_id) {
            Some(old) => {
                old.timer.abort();
                tracing::debug!(session_id, "Replacing existing EAP-AKA session");
                old.redirected
            }
            None => false,
        };

        ctx.set_state(if redirected { AkaState::Redirected } else { AkaState::Created });

        let entry = self.arm(session_id, cell, self.session_timeout, redirected);
        sessions.insert(session_id.to_string(), entry);
        drop(sessions);

        tracing::info!(session_id, imsi, "Created EAP-AKA session");
        ctx
    }

    /// Locks the current context of `session_id` and cancels its pending
    /// timer. Cancellation is best effort: a timer that already fired has
    /// removed the entry and the lookup reports `None`.
    pub async fn find_session(&self, session_id: &str) -> Option<(String, LockedUserCtx)> {
        loop {
            let cell = {
                let sessions = self.sessions.read().await;
                Arc::clone(&sessions.get(session_id)?.user)
            };

            let ctx = LockedUserCtx::lock(Arc::clone(&cell)).await;

            let sessions = self.sessions.read().await;
            match sessions.get(session_id) {
                Some(current) if Arc::ptr_eq(&current.user, &cell) => {
                    current.timer.abort();
                    let imsi = ctx.imsi.clone();
                    return Some((imsi, ctx));
                }
                // superseded by init_session while waiting for the lock
                Some(_) => continue,
                None => return None,
            }
        }
    }

    /// Stores a fresh wrapper with a new timer and releases the lock. A
    /// context superseded by a newer `init_session`, or whose session was
    /// removed or timed out meanwhile, is dropped instead.
    pub async fn update_and_unlock(&self, ctx: LockedUserCtx, timeout: Duration) -> Result<(), AppError> {
        let LockedUserCtx { cell, guard } = ctx;

        if guard.session_id.is_empty() {
            return Err(AppError::Invariant(
                "update of a user context without session id".to_string(),
            ));
        }

        let session_id = guard.session_id.clone();
        let redirected = guard.state() == AkaState::Redirected;

        let mut sessions = self.sessions.write().await;
        match sessions.get(&session_id) {
            Some(current) if Arc::ptr_eq(&current.user, &cell) => current.timer.abort(),
            Some(_) => {
                tracing::warn!(session_id = %session_id, "Discarding update of superseded EAP-AKA session");
                return Ok(());
            }
            None => {
                tracing::warn!(session_id = %session_id, "Discarding update of terminated EAP-AKA session");
                return Ok(());
            }
        }

        let entry = self.arm(&session_id, Arc::clone(&cell), timeout, redirected);
        sessions.insert(session_id, entry);
        drop(sessions);
        drop(guard);
        Ok(())
    }

    /// Rearms the timeout without touching the user context.
    pub async fn reset_timeout(&self, session_id: &str, timeout: Duration) -> bool {
        let mut sessions = self.sessions.write().await;
        let Some(old) = sessions.remove(session_id) else {
            return false;
        };

        old.timer.abort();
        let entry = self.arm(session_id, old.user, timeout, old.redirected);
        sessions.insert(session_id.to_string(), entry);
        true
    }

    pub async fn remove_session(&self, session_id: &str) -> bool {
        match self.sessions.write().await.remove(session_id) {
            Some(old) => {
                old.timer.abort();
                tracing::info!(session_id, "Removed EAP-AKA session");
                true
            }
            None => false,
        }
    }

    /// Removes the session the locked context belongs to and releases the
    /// lock. A newer session under the same id is left alone.
    pub async fn remove_and_unlock(&self, ctx: LockedUserCtx) -> bool {
        let LockedUserCtx { cell, guard } = ctx;
        let session_id = guard.session_id.as_str();

        let mut sessions = self.sessions.write().await;
        match sessions.get(session_id) {
            Some(current) if Arc::ptr_eq(&current.user, &cell) => {
                if let Some(old) = sessions.remove(session_id) {
                    old.timer.abort();
                }
                tracing::info!(
                    session_id,
                    imsi = %guard.imsi,
                    age_ms = guard.age().as_millis() as u64,
                    "Terminated EAP-AKA session"
                );
                true
            }
            _ => false,
        }
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Records `sqn` as the newest sequence number accepted for `imsi`.
    pub async fn accept_sqn(&self, imsi: &str, sqn: u64) -> Result<(), SqnError> {
        let mut accepted = self.accepted_sqn.write().await;
        check_freshness(accepted.get(imsi).copied(), sqn)?;
        accepted.insert(imsi.to_string(), sqn);
        Ok(())
    }

    /// Number of subscribers with a recorded SQN.
    pub async fn tracked_subscribers(&self) -> usize {
        self.accepted_sqn.read().await.len()
    }

    pub async fn shutdown(&self) {
        let mut sessions = self.sessions.write().await;
        for (_, entry) in sessions.drain() {
            entry.timer.abort();
        }
    }

    fn arm(&self, session_id: &str, user: Arc<Mutex<UserCtx>>, timeout: Duration, redirected: bool) -> SessionCtx {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let table = Arc::clone(&self.sessions);
        let sid = session_id.to_string();

        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            expire(&table, &sid, generation).await;
        });

        SessionCtx {
            generation,
            user,
            timer,
            redirected,
        }
    }
}

async fn expire(table: &SessionTable, session_id: &str, generation: u64) {
    let mut sessions = table.write().await;
    match sessions.get(session_id) {
        Some(current) if current.generation == generation => {
            sessions.remove(session_id);
            tracing::info!(session_id, "EAP-AKA session timed out");
        }
        _ => {
            tracing::debug!(session_id, generation, "Ignoring stale session timer");
        }
    }
}
