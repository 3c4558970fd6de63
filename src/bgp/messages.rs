use bytes::BufMut;
use derive_builder::Builder;
use num_traits::FromPrimitive;
use std::fmt;
use std::net::Ipv4Addr;

use super::attributes::*;
use super::nlri::*;
use super::types::*;

#[derive(Builder, Debug, Clone, PartialEq, Eq)]
#[builder(setter(into))]
pub struct BGPOpenMessage {
    pub version: u8,
    pub asn: u16,
    pub hold_time: u16,
    pub router_id: Ipv4Addr,
    pub opt_params: Vec<u8>,
}

impl fmt::Display for BGPOpenMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "version : {} asn : {} hold_time : {} router_id : {} opt_params : {:?}",
            self.version, self.asn, self.hold_time, self.router_id, self.opt_params
        )
    }
}

impl BGPOpenMessage {
    /// An OPEN for this speaker, without optional parameters.
    pub fn new(asn: u16, router_id: Ipv4Addr, hold_time: u16) -> BGPOpenMessage {
        BGPOpenMessage {
            version: VERSION,
            asn,
            hold_time,
            router_id,
            opt_params: vec![],
        }
    }

    pub fn byte_len(&self) -> usize {
        self.opt_params.len() + 10
    }

    pub fn encode_body(&self) -> Result<Vec<u8>, BgpValidationError> {
        let opt_len = u8::try_from(self.opt_params.len()).map_err(|_| {
            BgpValidationError::MessageTooLong {
                actual: self.opt_params.len(),
                maximum: u8::MAX as usize,
            }
        })?;
        let mut buf = Vec::with_capacity(self.byte_len());
        buf.put_u8(self.version);
        buf.put_u16(self.asn);
        buf.put_u16(self.hold_time);
        buf.put_slice(&self.router_id.octets());
        buf.put_u8(opt_len);
        buf.put_slice(&self.opt_params);
        Ok(buf)
    }
}

#[derive(Default, Builder, Debug, Clone, PartialEq, Eq)]
#[builder(setter(into), default)]
pub struct BGPUpdateMessage {
    pub withdrawn_routes: Vec<Prefix>,
    pub path_attributes: Vec<PathAttribute>,
    pub nlri: Vec<Prefix>,
}

fn field_len(field: &'static str, len: usize) -> Result<u16, BgpValidationError> {
    u16::try_from(len).map_err(|_| BgpValidationError::LengthMismatch {
        field,
        needed: len,
        remaining: u16::MAX as usize,
    })
}

impl BGPUpdateMessage {
    pub fn new() -> BGPUpdateMessage {
        BGPUpdateMessage::default()
    }

    pub fn encode_body(&self) -> Result<Vec<u8>, BgpValidationError> {
        let wd = encode_prefixes(&self.withdrawn_routes);
        let pa = encode_attributes(&self.path_attributes)?;
        let nl = encode_prefixes(&self.nlri);

        let mut buf = Vec::with_capacity(wd.len() + pa.len() + nl.len() + 4);
        buf.put_u16(field_len("withdrawn_routes", wd.len())?);
        buf.put_slice(&wd);
        buf.put_u16(field_len("path_attributes", pa.len())?);
        buf.put_slice(&pa);
        buf.put_slice(&nl);
        Ok(buf)
    }

    pub fn next_hop(&self) -> Option<Ipv4Addr> {
        self.path_attributes.iter().find_map(|a| match a.value {
            PathAttributeValue::NextHop(nh) => Some(nh),
            _ => None,
        })
    }

    pub fn as_path(&self) -> Option<&Aspath> {
        self.path_attributes.iter().find_map(|a| match &a.value {
            PathAttributeValue::AsPath(asp) => Some(asp),
            _ => None,
        })
    }

    pub fn local_pref(&self) -> Option<u32> {
        self.path_attributes.iter().find_map(|a| match a.value {
            PathAttributeValue::LocalPref(lp) => Some(lp),
            _ => None,
        })
    }

    /// Value of the first community tagged with `asn`, or 0.
    pub fn community_for(&self, asn: u16) -> u16 {
        self.path_attributes
            .iter()
            .filter_map(|a| match &a.value {
                PathAttributeValue::Communities(c) => Some(c),
                _ => None,
            })
            .last()
            .and_then(|coms| coms.iter().find(|c| c.asn == asn))
            .map(|c| c.value)
            .unwrap_or(0)
    }
}

#[derive(Builder, Debug, Clone, PartialEq, Eq)]
#[builder(setter(into))]
pub struct BGPNotificationMessage {
    pub error_code: u8,
    pub error_subcode: u8,
    #[builder(default)]
    pub data: Vec<u8>,
}

impl fmt::Display for BGPNotificationMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.error_kind() {
            Some(code) => write!(f, "{:?} ({})", code, self.error_subcode),
            None => write!(f, "code {} ({})", self.error_code, self.error_subcode),
        }
    }
}

impl BGPNotificationMessage {
    pub fn new(code: ErrorCode, sub: u8) -> BGPNotificationMessage {
        BGPNotificationMessage {
            error_code: code as u8,
            error_subcode: sub,
            data: vec![],
        }
    }

    pub fn error_kind(&self) -> Option<ErrorCode> {
        FromPrimitive::from_u8(self.error_code)
    }

    pub fn byte_len(&self) -> usize {
        2 + self.data.len()
    }

    pub fn encode_body(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.byte_len());
        buf.put_u8(self.error_code);
        buf.put_u8(self.error_subcode);
        buf.put_slice(&self.data);
        buf
    }
}

impl From<&BgpValidationError> for BGPNotificationMessage {
    fn from(err: &BgpValidationError) -> Self {
        let (code, sub): (ErrorCode, u8) = err.into();
        BGPNotificationMessage::new(code, sub)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Open(BGPOpenMessage),
    Update(BGPUpdateMessage),
    Notification(BGPNotificationMessage),
    Keepalive,
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Open(_) => MessageType::Open,
            Message::Update(_) => MessageType::Update,
            Message::Notification(_) => MessageType::Notification,
            Message::Keepalive => MessageType::Keepalive,
        }
    }

    /// The complete wire form: header followed by the body.
    pub fn encode(&self) -> Result<Vec<u8>, BgpValidationError> {
        let body = match self {
            Message::Open(body) => body.encode_body()?,
            Message::Update(body) => body.encode_body()?,
            Message::Notification(body) => body.encode_body(),
            Message::Keepalive => vec![],
        };
        header(self.message_type(), &body)
    }
}

/// Prepends the 19 byte header (marker, total length, type) to `body`.
pub fn header(message_type: MessageType, body: &[u8]) -> Result<Vec<u8>, BgpValidationError> {
    let total_length = body.len() + HEADER_LENGTH;
    validate_message_length(total_length)?;
    let mut buf = Vec::with_capacity(total_length);
    buf.put_slice(&MARKER);
    buf.put_u16(total_length as u16);
    buf.put_u8(message_type as u8);
    buf.put_slice(body);
    Ok(buf)
}
