pub mod aka;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::types::api::{EapContext, UpstreamStatus};
use crate::types::eap::{EapCode, EapMethod, Packet};
use crate::types::error::AppError;

pub use aka::AkaProvider;

/// Result of one EAP round: the packet for the peer and the updated context.
#[derive(Debug, Clone)]
pub struct EapOutcome {
    pub packet: Packet,
    pub ctx: EapContext,
    pub status: Option<UpstreamStatus>,
}

impl EapOutcome {
    pub fn new(packet: Packet, ctx: EapContext) -> Self {
        Self {
            packet,
            ctx,
            status: None,
        }
    }
}

#[async_trait]
pub trait EapProvider: Send + Sync {
    fn method(&self) -> EapMethod;

    async fn handle(&self, packet: Packet, ctx: EapContext) -> Result<EapOutcome, AppError>;
}

/// Method type to provider map, built once at startup.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<u8, Arc<dyn EapProvider>>,
    default_method: Option<u8>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first registered provider also answers EAP-Response/Identity.
    pub fn register(mut self, provider: Arc<dyn EapProvider>) -> Self {
        let method: u8 = provider.method().into();
        self.default_method.get_or_insert(method);
        self.providers.insert(method, provider);
        self
    }

    pub fn supported_methods(&self) -> Vec<u8> {
        self.providers.keys().copied().collect()
    }

    pub fn get(&self, method: u8) -> Option<&Arc<dyn EapProvider>> {
        self.providers.get(&method)
    }

    pub async fn dispatch(&self, packet: Packet, ctx: EapContext) -> Result<EapOutcome, AppError> {
        if packet.code() != EapCode::Response {
            return Err(AppError::BadRequest(format!(
                "Expected an EAP Response, got {:?}",
                packet.code()
            )));
        }

        let method = match packet.method_type() {
            Some(m) if m == u8::from(EapMethod::Identity) => self.default_method,
            Some(m) => Some(m),
            None => None,
        };

        let provider = method
            .and_then(|m| self.get(m))
            .ok_or_else(|| AppError::NotFound(format!("No provider for EAP method {:?}", packet.method_type())))?;

        provider.handle(packet, ctx).await
    }
}
