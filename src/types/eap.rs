use serde::{Deserialize, Serialize};

pub const EAP_HEADER_LEN: usize = 4;
pub const EAP_METHOD_HEADER_LEN: usize = 8;
pub const ATTRIBUTE_HEADER_LEN: usize = 2;
pub const MAX_ATTRIBUTE_LEN: usize = 1024;
pub const MAX_PACKET_LEN: usize = u16::MAX as usize;

const METHOD_TYPE_OFFSET: usize = 4;
const SUBTYPE_OFFSET: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EapError {
    #[error("EAP packet too short: expected at least {expected} bytes, got {actual}")]
    PacketTooShort { expected: usize, actual: usize },
    #[error("EAP length field {declared} does not match packet length {actual}")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("Invalid EAP code: {0}")]
    InvalidCode(u8),
    #[error("Attribute of {0} bytes exceeds the maximum attribute length")]
    AttributeTooLarge(usize),
    #[error("Appending {attribute} bytes would grow the packet past {max} bytes")]
    PacketTooLarge { attribute: usize, max: usize },
    #[error("Corrupt attribute at offset {offset}: {reason}")]
    CorruptAttribute { offset: usize, reason: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum EapCode {
    Request = 1,
    Response = 2,
    Success = 3,
    Failure = 4,
}

impl TryFrom<u8> for EapCode {
    type Error = EapError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(EapCode::Request),
            2 => Ok(EapCode::Response),
            3 => Ok(EapCode::Success),
            4 => Ok(EapCode::Failure),
            other => Err(EapError::InvalidCode(other)),
        }
    }
}

impl From<EapCode> for u8 {
    fn from(code: EapCode) -> Self {
        code as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EapMethod {
    Identity = 1,
    Notification = 2,
    Nak = 3,
    Sim = 18,
    Aka = 23,
    AkaPrime = 50,
}

impl EapMethod {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(EapMethod::Identity),
            2 => Some(EapMethod::Notification),
            3 => Some(EapMethod::Nak),
            18 => Some(EapMethod::Sim),
            23 => Some(EapMethod::Aka),
            50 => Some(EapMethod::AkaPrime),
            _ => None,
        }
    }
}

impl From<EapMethod> for u8 {
    fn from(method: EapMethod) -> Self {
        method as u8
    }
}

/// A raw EAP packet whose header length always equals the buffer length.
///
/// ```text
/// [code:1][identifier:1][length:2][method:1][subtype:1][reserved:2][attributes...]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet(Vec<u8>);

impl Packet {
    /// Builds a method packet with an empty attribute list.
    pub fn new(code: EapCode, identifier: u8, method: EapMethod, subtype: u8) -> Self {
        let mut bytes = Vec::with_capacity(EAP_METHOD_HEADER_LEN);
        bytes.push(code.into());
        bytes.push(identifier);
        bytes.extend_from_slice(&(EAP_METHOD_HEADER_LEN as u16).to_be_bytes());
        bytes.push(method.into());
        bytes.push(subtype);
        bytes.extend_from_slice(&[0, 0]);
        Self(bytes)
    }

    pub fn success(identifier: u8) -> Self {
        Self(vec![EapCode::Success.into(), identifier, 0, EAP_HEADER_LEN as u8])
    }

    pub fn failure(identifier: u8) -> Self {
        Self(vec![EapCode::Failure.into(), identifier, 0, EAP_HEADER_LEN as u8])
    }

    pub fn parse(bytes: impl Into<Vec<u8>>) -> Result<Self, EapError> {
        let bytes = bytes.into();

        if bytes.len() < EAP_HEADER_LEN {
            return Err(EapError::PacketTooShort {
                expected: EAP_HEADER_LEN,
                actual: bytes.len(),
            });
        }

        let code = EapCode::try_from(bytes[0])?;
        let declared = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;

        if declared != bytes.len() {
            return Err(EapError::LengthMismatch {
                declared,
                actual: bytes.len(),
            });
        }

        if matches!(code, EapCode::Request | EapCode::Response) && bytes.len() <= METHOD_TYPE_OFFSET {
            return Err(EapError::PacketTooShort {
                expected: METHOD_TYPE_OFFSET + 1,
                actual: bytes.len(),
            });
        }

        Ok(Self(bytes))
    }

    pub fn code(&self) -> EapCode {
        EapCode::try_from(self.0[0]).unwrap_or(EapCode::Failure)
    }

    pub fn identifier(&self) -> u8 {
        self.0[1]
    }

    pub fn length(&self) -> usize {
        u16::from_be_bytes([self.0[2], self.0[3]]) as usize
    }

    pub fn method_type(&self) -> Option<u8> {
        self.0.get(METHOD_TYPE_OFFSET).copied()
    }

    pub fn subtype(&self) -> Option<u8> {
        self.0.get(SUBTYPE_OFFSET).copied()
    }

    /// Type-data following the method byte, e.g. the identity string of an
    /// EAP-Response/Identity.
    pub fn type_data(&self) -> &[u8] {
        self.0.get(METHOD_TYPE_OFFSET + 1..).unwrap_or(&[])
    }

    pub fn has_method_header(&self) -> bool {
        self.0.len() >= EAP_METHOD_HEADER_LEN
    }

    pub fn append(&mut self, attribute: &Attribute) -> Result<(), EapError> {
        let encoded_len = attribute.encoded_len();
        if encoded_len > MAX_ATTRIBUTE_LEN || encoded_len / 4 > u8::MAX as usize {
            return Err(EapError::AttributeTooLarge(encoded_len));
        }

        let new_len = self.0.len() + encoded_len;
        if new_len > MAX_PACKET_LEN {
            return Err(EapError::PacketTooLarge {
                attribute: encoded_len,
                max: MAX_PACKET_LEN,
            });
        }

        attribute.write_to(&mut self.0);
        self.0[2..4].copy_from_slice(&(new_len as u16).to_be_bytes());
        Ok(())
    }

    pub fn attributes(&self) -> AttributeScanner<'_> {
        AttributeScanner::new(&self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub(crate) fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl AsRef<[u8]> for Packet {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// TLV attribute. `value` holds everything after the two header bytes,
/// padding included, so `length * 4 == value.len() + 2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub attr_type: u8,
    pub length: u8,
    pub value: Vec<u8>,
    /// Offset of the attribute inside the packet it was scanned from.
    pub offset: usize,
}

impl Attribute {
    pub fn new(attr_type: u8, value: &[u8]) -> Self {
        let mut padded = value.to_vec();
        let unpadded = ATTRIBUTE_HEADER_LEN + padded.len();
        padded.resize(padded.len() + (4 - unpadded % 4) % 4, 0);

        let words = (ATTRIBUTE_HEADER_LEN + padded.len()) / 4;
        Self {
            attr_type,
            length: words.min(u8::MAX as usize) as u8,
            value: padded,
            offset: 0,
        }
    }

    pub fn encoded_len(&self) -> usize {
        ATTRIBUTE_HEADER_LEN + self.value.len()
    }

    /// Offset of the value field (past type and length) in the source packet.
    pub fn value_offset(&self) -> usize {
        self.offset + ATTRIBUTE_HEADER_LEN
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.push(self.attr_type);
        out.push(self.length);
        out.extend_from_slice(&self.value);
    }
}

pub struct AttributeScanner<'a> {
    bytes: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> AttributeScanner<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: EAP_METHOD_HEADER_LEN,
            done: false,
        }
    }
}

impl Iterator for AttributeScanner<'_> {
    type Item = Result<Attribute, EapError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.bytes.len() {
            return None;
        }

        let offset = self.pos;
        if offset + ATTRIBUTE_HEADER_LEN > self.bytes.len() {
            self.done = true;
            return Some(Err(EapError::CorruptAttribute {
                offset,
                reason: "attribute header past end of packet",
            }));
        }

        let length = self.bytes[offset + 1];
        if length == 0 {
            self.done = true;
            return Some(Err(EapError::CorruptAttribute {
                offset,
                reason: "zero attribute length",
            }));
        }

        let end = offset + length as usize * 4;
        if end > self.bytes.len() {
            self.done = true;
            return Some(Err(EapError::CorruptAttribute {
                offset,
                reason: "attribute length past end of packet",
            }));
        }

        self.pos = end;
        Some(Ok(Attribute {
            attr_type: self.bytes[offset],
            length,
            value: self.bytes[offset + ATTRIBUTE_HEADER_LEN..end].to_vec(),
            offset,
        }))
    }
}
