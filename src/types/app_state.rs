use std::sync::Arc;
use std::time::Instant;

use crate::providers::ProviderRegistry;
use crate::types::session_store::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ProviderRegistry>,
    pub session_store: Arc<SessionStore>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(registry: ProviderRegistry, session_store: Arc<SessionStore>) -> Self {
        Self {
            registry: Arc::new(registry),
            session_store,
            started_at: Instant::now(),
        }
    }
}
