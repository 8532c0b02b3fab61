mod challenge;
mod failure;
mod identity;
mod sync_failure;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::clients::VectorSupplier;
use crate::crypto::aka::{sign_packet, AkaKeys};
use crate::crypto::sqn::extract_sqn;
use crate::providers::{EapOutcome, EapProvider};
use crate::types::aka::{self, AkaSubtype, NotificationCode};
use crate::types::api::{EapContext, UpstreamStatus};
use crate::types::config::AkaConfig;
use crate::types::eap::{EapError, EapMethod, Packet};
use crate::types::error::AppError;
use crate::types::session_store::{LockedUserCtx, SessionStore};
use crate::types::user_ctx::{AkaState, UserCtx};
use crate::types::vector::{AuthVector, SupplierError};

/// Packet to answer with and how long the session may idle before the next
/// round.
pub(crate) struct Step {
    packet: Packet,
    timeout: Duration,
    status: Option<UpstreamStatus>,
}

pub struct AkaProvider {
    store: Arc<SessionStore>,
    config: AkaConfig,
    supplier: Arc<dyn VectorSupplier>,
}

impl AkaProvider {
    pub fn new(config: AkaConfig, store: Arc<SessionStore>, supplier: Arc<dyn VectorSupplier>) -> Self {
        Self {
            store,
            config,
            supplier,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Stores the context under the step's timeout and releases it. The
    /// context is stored under the notification timeout when the step failed.
    async fn finish(
        &self,
        user: LockedUserCtx,
        step: Result<Step, AppError>,
        ctx: EapContext,
    ) -> Result<EapOutcome, AppError> {
        match step {
            Ok(step) => {
                self.store.update_and_unlock(user, step.timeout).await?;
                Ok(EapOutcome {
                    packet: step.packet,
                    ctx,
                    status: step.status,
                })
            }
            Err(e) => {
                self.store
                    .update_and_unlock(user, self.config.timeouts.notification)
                    .await?;
                Err(e)
            }
        }
    }

    /// Notification failure for the given user. AT_MAC is added when the
    /// code demands it and K_aut exists.
    fn failure_step(&self, user: &mut UserCtx, identifier: u8, code: NotificationCode) -> Result<Step, AppError> {
        let packet = notification(identifier, code, user.k_aut())?;
        user.identifier = identifier;
        Ok(Step {
            packet,
            timeout: self.config.timeouts.notification,
            status: None,
        })
    }

    fn supplier_failure_step(&self, user: &mut UserCtx, identifier: u8, err: &SupplierError) -> Result<Step, AppError> {
        tracing::warn!(session_id = %user.session_id, imsi = %user.imsi, "Vector supplier failed: {}", err);
        let mut step = self.failure_step(user, identifier, notification_code(err))?;
        step.status = Some(UpstreamStatus::from(err));
        Ok(step)
    }

    /// Derives keys from `vector`, stores the challenge material and builds the
    /// signed AKA-Challenge request.
    fn challenge_step(&self, user: &mut UserCtx, vector: AuthVector, identifier: u8) -> Result<Step, AppError> {
        let keys = AkaKeys::derive(user.identity.as_bytes(), &vector.ik, &vector.ck);

        let (mut packet, mac_offset) = aka::challenge_request(identifier, &vector.rand, &vector.autn).map_err(build_failed)?;
        sign_packet(packet.as_mut_bytes(), mac_offset, &keys.k_aut);

        user.sqn = vector.ak.map(|ak| extract_sqn(&vector.autn, &ak));
        user.rand = vector.rand;
        user.autn = vector.autn;
        user.xres = vector.xres;
        user.keys = Some(keys);
        user.identifier = identifier;
        user.set_state(AkaState::Challenge);

        Ok(Step {
            packet,
            timeout: self.config.timeouts.challenge,
            status: None,
        })
    }
}

#[async_trait]
impl EapProvider for AkaProvider {
    fn method(&self) -> EapMethod {
        EapMethod::Aka
    }

    async fn handle(&self, packet: Packet, mut ctx: EapContext) -> Result<EapOutcome, AppError> {
        if ctx.session_id.is_empty() {
            ctx.session_id = uuid::Uuid::new_v4().to_string();
            tracing::debug!(session_id = %ctx.session_id, "Assigned session id");
        }

        let identifier = packet.identifier();
        match packet.method_type().and_then(EapMethod::from_u8) {
            Some(EapMethod::Identity) => {
                let request = aka::identity_request(identifier.wrapping_add(1)).map_err(build_failed)?;
                return Ok(EapOutcome::new(request, ctx));
            }
            Some(EapMethod::Aka) => {}
            other => {
                return Err(AppError::NotFound(format!("EAP-AKA cannot handle method {:?}", other)));
            }
        }

        let Some(subtype) = packet.subtype().filter(|_| packet.has_method_header()) else {
            tracing::warn!(session_id = %ctx.session_id, "EAP-AKA response without subtype header");
            return reject(identifier.wrapping_add(1), ctx);
        };

        tracing::debug!(session_id = %ctx.session_id, subtype, identifier, "Handling EAP-AKA response");

        match AkaSubtype::from_u8(subtype) {
            Some(AkaSubtype::Identity) => identity::handle(self, packet, ctx).await,
            Some(AkaSubtype::Challenge) => challenge::handle(self, packet, ctx).await,
            Some(AkaSubtype::SynchronizationFailure) => sync_failure::handle(self, packet, ctx).await,
            Some(AkaSubtype::AuthenticationReject | AkaSubtype::ClientError | AkaSubtype::Notification) => {
                failure::handle(self, packet, ctx).await
            }
            _ => Err(AppError::NotFound(format!("Unsupported EAP-AKA subtype {}", subtype))),
        }
    }
}

/// Notification failure for a peer that has no usable session.
fn reject(identifier: u8, ctx: EapContext) -> Result<EapOutcome, AppError> {
    Ok(EapOutcome::new(notification(identifier, NotificationCode::Failure, None)?, ctx))
}

fn notification(identifier: u8, code: NotificationCode, k_aut: Option<&[u8]>) -> Result<Packet, AppError> {
    let k_aut = k_aut.filter(|_| code.requires_mac());
    let (mut packet, mac_offset) =
        aka::notification_request(identifier, code, k_aut.is_some()).map_err(build_failed)?;

    if let (Some(offset), Some(key)) = (mac_offset, k_aut) {
        sign_packet(packet.as_mut_bytes(), offset, key);
    }
    Ok(packet)
}

fn notification_code(err: &SupplierError) -> NotificationCode {
    match err {
        SupplierError::PermissionDenied(_) => NotificationCode::AccessDenied,
        SupplierError::NotSubscribed(_) => NotificationCode::NotSubscribed,
        SupplierError::Unavailable(_) | SupplierError::Malformed(_) => NotificationCode::Failure,
    }
}

fn build_failed(e: EapError) -> AppError {
    AppError::Invariant(format!("failed to build EAP-AKA packet: {}", e))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::types::vector::{ResyncInfo, SubscriberProfile, VectorAnswer};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    pub const IDENTITY: &str = "0001010000000055@wlan.mnc001.mcc001.3gppnetwork.org";
    pub const IMSI: &str = "001010000000055";
    pub const RAND: &str = "00112233445566778899aabbccddeeff";
    pub const AUTN: &str = "5c2b1e4a8f1e80002f9d1bc7e56a0011";
    pub const XRES: &str = "e818fbf691ae3b97";
    pub const IK: &str = "d5370f13796f2f615cbe15ef9f420a98";
    pub const CK: &str = "a835cf22b0f43e1519d6fd234c00d793";

    pub const IDENTITY_RESPONSE: &str = "02010040170500000e0e00333030303130313030303030303030353540776c616e2e6d6e633030312e6d63633030312e336770706e6574776f726b2e6f726700";
    pub const CHALLENGE_REQUEST: &str = "01020044170100000105000000112233445566778899aabbccddeeff020500005c2b1e4a8f1e80002f9d1bc7e56a00110b050000a5c357328a18b53037317c0bb9419bf1";
    pub const CHALLENGE_RESPONSE: &str = "020200281701000003030040e818fbf691ae3b970b050000c57fce660b4d7962815f51928ab2ee97";

    pub fn vector() -> AuthVector {
        AuthVector {
            rand: hex::decode(RAND).unwrap().try_into().unwrap(),
            autn: hex::decode(AUTN).unwrap().try_into().unwrap(),
            xres: hex::decode(XRES).unwrap(),
            ik: hex::decode(IK).unwrap().try_into().unwrap(),
            ck: hex::decode(CK).unwrap().try_into().unwrap(),
            ak: None,
        }
    }

    pub fn vectors() -> Result<VectorAnswer, SupplierError> {
        Ok(VectorAnswer::Vectors {
            vectors: vec![vector()],
            session_id: Some("hss;42".to_string()),
            profile: SubscriberProfile {
                msisdn: Some("15551234567".to_string()),
            },
        })
    }

    /// Supplier answering from a script and recording every call.
    #[derive(Default)]
    pub struct ScriptedSupplier {
        answers: Mutex<VecDeque<Result<VectorAnswer, SupplierError>>>,
        pub calls: Mutex<Vec<(String, Option<ResyncInfo>)>>,
    }

    impl ScriptedSupplier {
        pub fn new(answers: Vec<Result<VectorAnswer, SupplierError>>) -> Arc<Self> {
            Arc::new(Self {
                answers: Mutex::new(answers.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl VectorSupplier for ScriptedSupplier {
        async fn authenticate(
            &self,
            imsi: &str,
            _num_vectors: u32,
            resync: Option<ResyncInfo>,
        ) -> Result<VectorAnswer, SupplierError> {
            self.calls.lock().unwrap().push((imsi.to_string(), resync));
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(SupplierError::Unavailable("script exhausted".to_string())))
        }
    }

    /// Scripted supplier that holds every call until `open` is called.
    pub struct GatedSupplier {
        gate: tokio::sync::Notify,
        inner: ScriptedSupplier,
    }

    impl GatedSupplier {
        pub fn new(answers: Vec<Result<VectorAnswer, SupplierError>>) -> Arc<Self> {
            Arc::new(Self {
                gate: tokio::sync::Notify::new(),
                inner: ScriptedSupplier {
                    answers: Mutex::new(answers.into()),
                    calls: Mutex::new(Vec::new()),
                },
            })
        }

        pub fn open(&self) {
            self.gate.notify_one();
        }
    }

    #[async_trait]
    impl VectorSupplier for GatedSupplier {
        async fn authenticate(
            &self,
            imsi: &str,
            num_vectors: u32,
            resync: Option<ResyncInfo>,
        ) -> Result<VectorAnswer, SupplierError> {
            self.gate.notified().await;
            self.inner.authenticate(imsi, num_vectors, resync).await
        }
    }

    pub fn provider(supplier: Arc<dyn VectorSupplier>) -> AkaProvider {
        provider_with(AkaConfig::default(), supplier)
    }

    pub fn provider_with(config: AkaConfig, supplier: Arc<dyn VectorSupplier>) -> AkaProvider {
        let store = Arc::new(SessionStore::new(config.timeouts.session));
        AkaProvider::new(config, store, supplier)
    }

    pub fn ctx(session_id: &str) -> EapContext {
        EapContext {
            session_id: session_id.to_string(),
            ..Default::default()
        }
    }

    pub fn packet(hex_str: &str) -> Packet {
        Packet::parse(hex::decode(hex_str).unwrap()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[tokio::test]
    async fn test_identity_method_yields_permanent_id_request() {
        let provider = provider(ScriptedSupplier::new(vec![]));
        let request = Packet::parse(hex::decode("0201000801616263").unwrap()).unwrap();

        let outcome = provider.handle(request, ctx("s1")).await.unwrap();
        assert_eq!(outcome.packet.as_bytes(), &[1, 2, 0, 12, 23, 5, 0, 0, 10, 1, 0, 0]);
        assert!(!provider.store().contains("s1").await);
    }

    #[tokio::test]
    async fn test_empty_session_id_is_assigned() {
        let provider = provider(ScriptedSupplier::new(vec![]));
        let request = Packet::parse(vec![2, 1, 0, 5, 1]).unwrap();

        let outcome = provider.handle(request, EapContext::default()).await.unwrap();
        assert!(uuid::Uuid::parse_str(&outcome.ctx.session_id).is_ok());
    }

    #[tokio::test]
    async fn test_unknown_subtype_is_not_found() {
        let provider = provider(ScriptedSupplier::new(vec![]));
        let request = Packet::parse(vec![2, 1, 0, 8, 23, 99, 0, 0]).unwrap();

        let result = provider.handle(request, ctx("s1")).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_missing_subtype_header_yields_notification() {
        let provider = provider(ScriptedSupplier::new(vec![]));
        let request = Packet::parse(vec![2, 1, 0, 6, 23, 1]).unwrap();

        let outcome = provider.handle(request, ctx("s1")).await.unwrap();
        assert_eq!(outcome.packet.subtype(), Some(AkaSubtype::Notification as u8));
        assert_eq!(outcome.packet.identifier(), 2);
    }

    #[test]
    fn test_notification_mac_only_without_p_bit() {
        let k_aut = [0x11u8; 16];

        let plain = notification(3, NotificationCode::Failure, Some(&k_aut)).unwrap();
        assert_eq!(plain.len(), 12);

        let signed = notification(3, NotificationCode::FailureAfterAuthentication, Some(&k_aut)).unwrap();
        assert_eq!(signed.len(), 32);
        assert!(crate::crypto::aka::verify_packet_mac(signed.as_bytes(), 16, &k_aut));

        let unsigned = notification(3, NotificationCode::FailureAfterAuthentication, None).unwrap();
        assert_eq!(unsigned.len(), 12);
    }

    #[test]
    fn test_supplier_error_codes() {
        assert_eq!(
            notification_code(&SupplierError::PermissionDenied(String::new())),
            NotificationCode::AccessDenied
        );
        assert_eq!(
            notification_code(&SupplierError::NotSubscribed(String::new())),
            NotificationCode::NotSubscribed
        );
        assert_eq!(
            notification_code(&SupplierError::Unavailable(String::new())),
            NotificationCode::Failure
        );
    }
}
