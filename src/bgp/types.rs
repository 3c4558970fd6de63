use num_derive::FromPrimitive;
use thiserror::Error;

// Constants
pub const MARKER: [u8; 16] = [0xff; 16];
pub const VERSION: u8 = 4;
pub const HEADER_LENGTH: usize = 19;
pub const MIN_MESSAGE_LENGTH: usize = 19;
pub const MAX_MESSAGE_LENGTH: usize = 4096;

/// Attribute flag selecting a 2-byte length field.
pub const ATTR_FLAG_EXTENDED_LENGTH: u8 = 0x20;
pub const ATTR_FLAG_TRANSITIVE: u8 = 0x40;
pub const ATTR_FLAG_OPTIONAL: u8 = 0x80;

#[derive(Debug, Clone, Copy, FromPrimitive, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum MessageType {
    Open = 1,
    #[default]
    Update,
    Notification,
    Keepalive,
}

#[derive(Debug, Clone, FromPrimitive, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    MessageHeader = 1,
    OpenMessage,
    UpdateMessage,
    HoldTimerExpired,
    FSMError,
    Cease,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(u8)]
pub enum HeaderSubCode {
    ConnectionNotSynchronized = 1,
    BadMessageLength = 2,
    BadMessageType = 3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(u8)]
pub enum OpenSubCode {
    UnsupportedVersionNumber = 1,
    BadPeerAS = 2,
    BadBGPIdentifier = 3,
    UnsupportedOptionalParameter = 4,
    Deprecated = 5,
    UnacceptableHoldTime = 6,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(u8)]
pub enum UpdateSubCode {
    MalformedAttributeList = 1,
    UnrecognizedWellKnownAttribute = 2,
    MissingWellKnownAttribute = 3,
    AttributeFlagsError = 4,
    AttributeLengthError = 5,
    InvalidORIGINAttribute = 6,
    Deprecated = 7,
    InvalidNEXTHOPAttribute = 8,
    OptionalAttributeError = 9,
    InvalidNetworkField = 10,
    MalformedASPATH = 11,
}

// BGP-specific validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BgpValidationError {
    #[error("Message too short: got {actual}, minimum {minimum}")]
    MessageTooShort { actual: usize, minimum: usize },

    #[error("Message too long: got {actual}, maximum {maximum}")]
    MessageTooLong { actual: usize, maximum: usize },

    #[error("Invalid message type: {0}")]
    InvalidMessageType(u8),

    #[error("Invalid AS number: {0}")]
    InvalidAsn(u16),

    #[error("Invalid hold time: {0}")]
    InvalidHoldTime(u16),

    #[error("Invalid NLRI prefix length: {0}")]
    InvalidNlriPrefixLength(u8),

    #[error("Invalid ORIGIN value: {0}")]
    InvalidOrigin(u8),

    #[error("Malformed AS_PATH: {0}")]
    MalformedAsPath(String),

    #[error("Invalid length {length} for path attribute type {type_code}")]
    InvalidPathAttributeLength { type_code: u8, length: usize },

    #[error("Path attribute type {type_code} value of {length} bytes needs the extended length flag")]
    PathAttributeTooLong { type_code: u8, length: usize },

    #[error("Field {field} needs {needed} bytes but only {remaining} remain in the message")]
    LengthMismatch {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    #[error("Buffer bounds exceeded: offset {offset}, length {length}, buffer size {buffer_size}")]
    InvalidBufferBounds {
        offset: usize,
        length: usize,
        buffer_size: usize,
    },

    #[error("Missing required field: {0}")]
    MissingField(String),
}

impl From<&BgpValidationError> for (ErrorCode, u8) {
    fn from(err: &BgpValidationError) -> Self {
        match err {
            BgpValidationError::MessageTooShort { .. }
            | BgpValidationError::MessageTooLong { .. }
            | BgpValidationError::LengthMismatch { .. } => (
                ErrorCode::MessageHeader,
                HeaderSubCode::BadMessageLength as u8,
            ),
            BgpValidationError::InvalidMessageType(_) => (
                ErrorCode::MessageHeader,
                HeaderSubCode::BadMessageType as u8,
            ),
            BgpValidationError::InvalidAsn(_) => {
                (ErrorCode::OpenMessage, OpenSubCode::BadPeerAS as u8)
            }
            BgpValidationError::InvalidHoldTime(_) => (
                ErrorCode::OpenMessage,
                OpenSubCode::UnacceptableHoldTime as u8,
            ),
            BgpValidationError::InvalidNlriPrefixLength(_) => (
                ErrorCode::UpdateMessage,
                UpdateSubCode::InvalidNetworkField as u8,
            ),
            BgpValidationError::InvalidOrigin(_) => (
                ErrorCode::UpdateMessage,
                UpdateSubCode::InvalidORIGINAttribute as u8,
            ),
            BgpValidationError::MalformedAsPath(_) => (
                ErrorCode::UpdateMessage,
                UpdateSubCode::MalformedASPATH as u8,
            ),
            BgpValidationError::InvalidPathAttributeLength { .. }
            | BgpValidationError::PathAttributeTooLong { .. }
            | BgpValidationError::InvalidBufferBounds { .. } => (
                ErrorCode::UpdateMessage,
                UpdateSubCode::AttributeLengthError as u8,
            ),
            BgpValidationError::MissingField(_) => (
                ErrorCode::UpdateMessage,
                UpdateSubCode::MalformedAttributeList as u8,
            ),
        }
    }
}

// Validation helper functions
pub fn validate_buffer_bounds(
    buffer: &[u8],
    offset: usize,
    length: usize,
) -> Result<(), BgpValidationError> {
    if offset.saturating_add(length) > buffer.len() {
        return Err(BgpValidationError::InvalidBufferBounds {
            offset,
            length,
            buffer_size: buffer.len(),
        });
    }
    Ok(())
}

pub fn validate_message_length(length: usize) -> Result<(), BgpValidationError> {
    if length < MIN_MESSAGE_LENGTH {
        return Err(BgpValidationError::MessageTooShort {
            actual: length,
            minimum: MIN_MESSAGE_LENGTH,
        });
    }
    if length > MAX_MESSAGE_LENGTH {
        return Err(BgpValidationError::MessageTooLong {
            actual: length,
            maximum: MAX_MESSAGE_LENGTH,
        });
    }
    Ok(())
}

pub fn validate_asn(asn: u16) -> Result<(), BgpValidationError> {
    if asn == 0 {
        return Err(BgpValidationError::InvalidAsn(asn));
    }
    Ok(())
}

pub fn validate_hold_time(hold_time: u16) -> Result<(), BgpValidationError> {
    // Hold time must be 0 or >= 3 seconds per RFC 4271
    if hold_time != 0 && hold_time < 3 {
        return Err(BgpValidationError::InvalidHoldTime(hold_time));
    }
    Ok(())
}

pub fn is_extended_len(flags: u8) -> bool {
    flags & ATTR_FLAG_EXTENDED_LENGTH != 0
}

// Safe slice extraction with validation
pub fn safe_slice(buffer: &[u8], start: usize, end: usize) -> Result<&[u8], BgpValidationError> {
    if start > end || end > buffer.len() {
        return Err(BgpValidationError::InvalidBufferBounds {
            offset: start,
            length: end.saturating_sub(start),
            buffer_size: buffer.len(),
        });
    }
    Ok(&buffer[start..end])
}

// Safe array extraction with validation
pub fn safe_array<const N: usize>(
    buffer: &[u8],
    offset: usize,
) -> Result<[u8; N], BgpValidationError> {
    validate_buffer_bounds(buffer, offset, N)?;
    let mut array = [0u8; N];
    array.copy_from_slice(&buffer[offset..offset + N]);
    Ok(array)
}
