use serde::{Deserialize, Serialize};

use crate::types::eap::{Attribute, EapCode, EapError, EapMethod, Packet};

pub const RAND_LEN: usize = 16;
pub const AUTN_LEN: usize = 16;
pub const AUTS_LEN: usize = 14;
pub const MAC_LEN: usize = 16;
pub const SQN_LEN: usize = 6;
pub const MIN_RES_LEN: usize = 4;
pub const MAX_RES_LEN: usize = 16;

/// Version list advertised when steering a peer to EAP-SIM.
const SIM_VERSION_1: u16 = 1;
const SIM_START_SUBTYPE: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AkaSubtype {
    Challenge = 1,
    AuthenticationReject = 2,
    SynchronizationFailure = 4,
    Identity = 5,
    Notification = 12,
    Reauthentication = 13,
    ClientError = 14,
}

impl AkaSubtype {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(AkaSubtype::Challenge),
            2 => Some(AkaSubtype::AuthenticationReject),
            4 => Some(AkaSubtype::SynchronizationFailure),
            5 => Some(AkaSubtype::Identity),
            12 => Some(AkaSubtype::Notification),
            13 => Some(AkaSubtype::Reauthentication),
            14 => Some(AkaSubtype::ClientError),
            _ => None,
        }
    }
}

impl From<AkaSubtype> for u8 {
    fn from(subtype: AkaSubtype) -> Self {
        subtype as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum AkaAttributeType {
    AtRand = 1,
    AtAutn = 2,
    AtRes = 3,
    AtAuts = 4,
    AtPadding = 6,
    AtNonceMt = 7,
    AtPermanentIdReq = 10,
    AtMac = 11,
    AtNotification = 12,
    AtAnyIdReq = 13,
    AtIdentity = 14,
    AtVersionList = 15,
    AtSelectedVersion = 16,
    AtFullauthIdReq = 17,
    AtCounter = 19,
    AtCounterTooSmall = 20,
    AtNonceS = 21,
    AtClientErrorCode = 22,
    AtIv = 129,
    AtEncrData = 130,
    AtNextPseudonym = 132,
    AtNextReauthId = 133,
    AtCheckcode = 134,
    AtResultInd = 135,
}

impl From<AkaAttributeType> for u8 {
    fn from(attr_type: AkaAttributeType) -> Self {
        attr_type as u8
    }
}

impl PartialEq<AkaAttributeType> for u8 {
    fn eq(&self, other: &AkaAttributeType) -> bool {
        *self == *other as u8
    }
}

/// AT_NOTIFICATION codes (RFC 4187 section 10.19). Bit 0x4000 (P) is set for
/// notifications sent before the challenge round completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum NotificationCode {
    FailureAfterAuthentication = 0,
    AccessDenied = 1026,
    NotSubscribed = 1031,
    Failure = 16384,
    Success = 32768,
}

impl NotificationCode {
    const P_BIT: u16 = 0x4000;

    /// AT_MAC must accompany a notification whose P bit is clear.
    pub fn requires_mac(self) -> bool {
        (self as u16) & Self::P_BIT == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum ClientErrorCode {
    UnableToProcess = 0,
    UnsupportedVersion = 1,
    InsufficientChallenges = 2,
    RandsNotFresh = 3,
}

impl ClientErrorCode {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(ClientErrorCode::UnableToProcess),
            1 => Some(ClientErrorCode::UnsupportedVersion),
            2 => Some(ClientErrorCode::InsufficientChallenges),
            3 => Some(ClientErrorCode::RandsNotFresh),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttributeError {
    #[error(transparent)]
    Codec(#[from] EapError),
    #[error("Missing {0:?} attribute")]
    Missing(AkaAttributeType),
    #[error("Malformed {0:?} attribute: {1}")]
    Malformed(AkaAttributeType, String),
}

pub fn new_aka_packet(code: EapCode, identifier: u8, subtype: AkaSubtype) -> Packet {
    Packet::new(code, identifier, EapMethod::Aka, subtype.into())
}

/// Value for attributes carrying two reserved bytes and a fixed payload
/// (AT_RAND, AT_AUTN, AT_MAC).
pub fn reserved_value(payload: &[u8]) -> Vec<u8> {
    let mut value = Vec::with_capacity(2 + payload.len());
    value.extend_from_slice(&[0, 0]);
    value.extend_from_slice(payload);
    value
}

pub fn identity_request(identifier: u8) -> Result<Packet, EapError> {
    let mut packet = new_aka_packet(EapCode::Request, identifier, AkaSubtype::Identity);
    packet.append(&Attribute::new(AkaAttributeType::AtPermanentIdReq.into(), &[0, 0]))?;
    Ok(packet)
}

/// Challenge request carrying AT_RAND, AT_AUTN and a zeroed AT_MAC. Returns the
/// packet together with the offset of the MAC value so the caller can sign it.
pub fn challenge_request(
    identifier: u8,
    rand: &[u8; RAND_LEN],
    autn: &[u8; AUTN_LEN],
) -> Result<(Packet, usize), EapError> {
    let mut packet = new_aka_packet(EapCode::Request, identifier, AkaSubtype::Challenge);
    packet.append(&Attribute::new(AkaAttributeType::AtRand.into(), &reserved_value(rand)))?;
    packet.append(&Attribute::new(AkaAttributeType::AtAutn.into(), &reserved_value(autn)))?;
    let mac_offset = packet.len() + 4;
    packet.append(&Attribute::new(AkaAttributeType::AtMac.into(), &[0u8; 2 + MAC_LEN]))?;
    Ok((packet, mac_offset))
}

/// Notification request. When `with_mac` is set a zeroed AT_MAC is appended and
/// its value offset returned.
pub fn notification_request(
    identifier: u8,
    code: NotificationCode,
    with_mac: bool,
) -> Result<(Packet, Option<usize>), EapError> {
    let mut packet = new_aka_packet(EapCode::Request, identifier, AkaSubtype::Notification);
    packet.append(&Attribute::new(
        AkaAttributeType::AtNotification.into(),
        &(code as u16).to_be_bytes(),
    ))?;

    if !with_mac {
        return Ok((packet, None));
    }

    let mac_offset = packet.len() + 4;
    packet.append(&Attribute::new(AkaAttributeType::AtMac.into(), &[0u8; 2 + MAC_LEN]))?;
    Ok((packet, Some(mac_offset)))
}

/// EAP-SIM Start request used to steer a subscriber without 3G vectors to the
/// legacy method.
pub fn redirect_request(identifier: u8) -> Result<Packet, EapError> {
    let mut packet = Packet::new(EapCode::Request, identifier, EapMethod::Sim, SIM_START_SUBTYPE);

    let mut version_list = Vec::with_capacity(4);
    version_list.extend_from_slice(&2u16.to_be_bytes());
    version_list.extend_from_slice(&SIM_VERSION_1.to_be_bytes());
    packet.append(&Attribute::new(AkaAttributeType::AtVersionList.into(), &version_list))?;
    packet.append(&Attribute::new(AkaAttributeType::AtPermanentIdReq.into(), &[0, 0]))?;
    Ok(packet)
}

pub fn identity_value(identity: &str) -> Vec<u8> {
    let mut value = Vec::with_capacity(2 + identity.len());
    value.extend_from_slice(&(identity.len() as u16).to_be_bytes());
    value.extend_from_slice(identity.as_bytes());
    value
}

pub fn res_value(res: &[u8]) -> Vec<u8> {
    let mut value = Vec::with_capacity(2 + res.len());
    value.extend_from_slice(&((res.len() * 8) as u16).to_be_bytes());
    value.extend_from_slice(res);
    value
}

pub fn parse_identity(attr: &Attribute) -> Result<String, AttributeError> {
    let malformed = |reason: &str| AttributeError::Malformed(AkaAttributeType::AtIdentity, reason.to_string());

    if attr.value.len() < 2 {
        return Err(malformed("missing actual identity length"));
    }
    let len = u16::from_be_bytes([attr.value[0], attr.value[1]]) as usize;
    let identity = attr
        .value
        .get(2..2 + len)
        .ok_or_else(|| malformed("identity length exceeds attribute"))?;
    if identity.is_empty() {
        return Err(malformed("empty identity"));
    }

    String::from_utf8(identity.to_vec()).map_err(|_| malformed("identity is not valid UTF-8"))
}

pub fn parse_res(attr: &Attribute) -> Result<Vec<u8>, AttributeError> {
    let malformed = |reason: String| AttributeError::Malformed(AkaAttributeType::AtRes, reason);

    if attr.value.len() < 2 {
        return Err(malformed("missing RES length".to_string()));
    }
    let bits = u16::from_be_bytes([attr.value[0], attr.value[1]]) as usize;
    if bits % 8 != 0 {
        return Err(malformed(format!("RES length {} is not a whole number of bytes", bits)));
    }
    let len = bits / 8;
    if !(MIN_RES_LEN..=MAX_RES_LEN).contains(&len) {
        return Err(malformed(format!("RES length {} out of range", len)));
    }

    attr.value
        .get(2..2 + len)
        .map(<[u8]>::to_vec)
        .ok_or_else(|| malformed("RES exceeds attribute".to_string()))
}

pub fn parse_auts(attr: &Attribute) -> Result<[u8; AUTS_LEN], AttributeError> {
    attr.value
        .get(..AUTS_LEN)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| {
            AttributeError::Malformed(
                AkaAttributeType::AtAuts,
                format!("expected {} bytes, got {}", AUTS_LEN, attr.value.len()),
            )
        })
}

pub fn parse_mac(attr: &Attribute) -> Result<[u8; MAC_LEN], AttributeError> {
    attr.value
        .get(2..2 + MAC_LEN)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| {
            AttributeError::Malformed(AkaAttributeType::AtMac, format!("value is {} bytes", attr.value.len()))
        })
}

pub fn parse_u16(attr: &Attribute, attr_type: AkaAttributeType) -> Result<u16, AttributeError> {
    match attr.value.as_slice() {
        [hi, lo, ..] => Ok(u16::from_be_bytes([*hi, *lo])),
        _ => Err(AttributeError::Malformed(attr_type, "value shorter than 2 bytes".to_string())),
    }
}

/// First attribute of the given type, propagating scanner defects.
pub fn find_attribute(packet: &Packet, attr_type: AkaAttributeType) -> Result<Attribute, AttributeError> {
    for attr in packet.attributes() {
        let attr = attr?;
        if attr.attr_type == attr_type {
            return Ok(attr);
        }
    }
    Err(AttributeError::Missing(attr_type))
}
