use byteorder::{BigEndian, ByteOrder};
use bytes::{Buf, BytesMut};
use num_traits::FromPrimitive;
use std::fmt;
use std::net::Ipv4Addr;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::BgpError;

use super::attributes::*;
use super::messages::*;
use super::nlri::*;
use super::types::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpenPhase {
    Version,
    SenderAs,
    HoldTime,
    Identifier,
    OptParamsLength,
    OptParams(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpdatePhase {
    WithdrawnLength,
    Withdrawn(usize),
    AttributesLength,
    Attributes(usize),
    Nlri,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NotificationPhase {
    ErrorCode,
    ErrorSubcode,
    Data,
}

/// Where the decoder is within the current message.
///
/// `remaining` always counts the declared body bytes not consumed yet, so a
/// dropped message can be skipped without losing sync with the stream.
#[derive(Clone)]
pub enum DecodeState {
    Marker,
    Length,
    Type {
        length: usize,
    },
    Open {
        remaining: usize,
        phase: OpenPhase,
        open: BGPOpenMessageBuilder,
    },
    Update {
        remaining: usize,
        phase: UpdatePhase,
        update: BGPUpdateMessageBuilder,
    },
    Notification {
        remaining: usize,
        phase: NotificationPhase,
        notification: BGPNotificationMessageBuilder,
    },
    Discard {
        remaining: usize,
    },
}

impl fmt::Debug for DecodeState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DecodeState::Marker => write!(f, "Marker"),
            DecodeState::Length => write!(f, "Length"),
            DecodeState::Type { length } => write!(f, "Type {{ length: {} }}", length),
            DecodeState::Open {
                remaining, phase, ..
            } => write!(f, "Open {{ {:?}, remaining: {} }}", phase, remaining),
            DecodeState::Update {
                remaining, phase, ..
            } => write!(f, "Update {{ {:?}, remaining: {} }}", phase, remaining),
            DecodeState::Notification {
                remaining, phase, ..
            } => write!(f, "Notification {{ {:?}, remaining: {} }}", phase, remaining),
            DecodeState::Discard { remaining } => {
                write!(f, "Discard {{ remaining: {} }}", remaining)
            }
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    /// Not enough bytes buffered for the next field.
    NeedMore,
    Continue,
    Complete(Message),
    Dropped {
        message_type: Option<MessageType>,
        error: BgpValidationError,
    },
    Fatal(BgpValidationError),
}

#[derive(Debug)]
pub struct Transition {
    pub next: DecodeState,
    pub consumed: usize,
    pub outcome: Outcome,
}

impl Transition {
    fn advance(next: DecodeState, consumed: usize) -> Transition {
        Transition {
            next,
            consumed,
            outcome: Outcome::Continue,
        }
    }

    fn wait(state: DecodeState) -> Transition {
        Transition {
            next: state,
            consumed: 0,
            outcome: Outcome::NeedMore,
        }
    }

    fn complete(message: Message, consumed: usize, remaining: usize) -> Transition {
        if remaining > 0 {
            log::debug!(
                "skipping {} bytes past the end of a {:?} message",
                remaining,
                message.message_type()
            );
        }
        Transition {
            next: after(remaining),
            consumed,
            outcome: Outcome::Complete(message),
        }
    }

    fn dropped(
        message_type: MessageType,
        error: BgpValidationError,
        consumed: usize,
        remaining: usize,
    ) -> Transition {
        Transition {
            next: after(remaining),
            consumed,
            outcome: Outcome::Dropped {
                message_type: Some(message_type),
                error,
            },
        }
    }
}

fn after(remaining: usize) -> DecodeState {
    match remaining {
        0 => DecodeState::Marker,
        remaining => DecodeState::Discard { remaining },
    }
}

enum Field<'a> {
    Ready(&'a [u8]),
    Pending,
    Overrun(BgpValidationError),
}

fn take<'a>(src: &'a [u8], remaining: usize, n: usize, field: &'static str) -> Field<'a> {
    if n > remaining {
        return Field::Overrun(BgpValidationError::LengthMismatch {
            field,
            needed: n,
            remaining,
        });
    }
    if src.len() < n {
        return Field::Pending;
    }
    Field::Ready(&src[..n])
}

fn built<T>(result: Result<T, String>) -> Result<T, BgpValidationError> {
    result.map_err(BgpValidationError::MissingField)
}

impl DecodeState {
    /// Consumes at most one field from `src`.
    pub fn transition(self, src: &[u8]) -> Transition {
        match self {
            DecodeState::Marker => {
                if src.len() < MARKER.len() {
                    return Transition::wait(DecodeState::Marker);
                }
                if src[..MARKER.len()] != MARKER {
                    log::debug!("message marker is not all ones: {:02x?}", &src[..MARKER.len()]);
                }
                Transition::advance(DecodeState::Length, MARKER.len())
            }
            DecodeState::Length => {
                if src.len() < 2 {
                    return Transition::wait(DecodeState::Length);
                }
                let length = BigEndian::read_u16(&src[..2]) as usize;
                match validate_message_length(length) {
                    Ok(()) => Transition::advance(DecodeState::Type { length }, 2),
                    Err(e) => Transition {
                        next: DecodeState::Marker,
                        consumed: 2,
                        outcome: Outcome::Fatal(e),
                    },
                }
            }
            DecodeState::Type { length } => {
                if src.is_empty() {
                    return Transition::wait(DecodeState::Type { length });
                }
                let remaining = length - HEADER_LENGTH;
                match MessageType::from_u8(src[0]) {
                    Some(MessageType::Open) => Transition::advance(
                        DecodeState::Open {
                            remaining,
                            phase: OpenPhase::Version,
                            open: BGPOpenMessageBuilder::default(),
                        },
                        1,
                    ),
                    Some(MessageType::Update) => Transition::advance(
                        DecodeState::Update {
                            remaining,
                            phase: UpdatePhase::WithdrawnLength,
                            update: BGPUpdateMessageBuilder::default(),
                        },
                        1,
                    ),
                    Some(MessageType::Notification) => Transition::advance(
                        DecodeState::Notification {
                            remaining,
                            phase: NotificationPhase::ErrorCode,
                            notification: BGPNotificationMessageBuilder::default(),
                        },
                        1,
                    ),
                    Some(MessageType::Keepalive) => {
                        Transition::complete(Message::Keepalive, 1, remaining)
                    }
                    None => Transition {
                        next: after(remaining),
                        consumed: 1,
                        outcome: Outcome::Dropped {
                            message_type: None,
                            error: BgpValidationError::InvalidMessageType(src[0]),
                        },
                    },
                }
            }
            DecodeState::Open {
                remaining,
                phase,
                open,
            } => open_transition(remaining, phase, open, src),
            DecodeState::Update {
                remaining,
                phase,
                update,
            } => update_transition(remaining, phase, update, src),
            DecodeState::Notification {
                remaining,
                phase,
                notification,
            } => notification_transition(remaining, phase, notification, src),
            DecodeState::Discard { remaining } => {
                if remaining == 0 {
                    return Transition::advance(DecodeState::Marker, 0);
                }
                if src.is_empty() {
                    return Transition::wait(DecodeState::Discard { remaining });
                }
                let n = remaining.min(src.len());
                Transition::advance(after(remaining - n), n)
            }
        }
    }
}

fn open_transition(
    remaining: usize,
    phase: OpenPhase,
    mut open: BGPOpenMessageBuilder,
    src: &[u8],
) -> Transition {
    let (n, field) = match phase {
        OpenPhase::Version => (1, "version"),
        OpenPhase::SenderAs => (2, "sender_as"),
        OpenPhase::HoldTime => (2, "hold_time"),
        OpenPhase::Identifier => (4, "bgp_identifier"),
        OpenPhase::OptParamsLength => (1, "optional_length"),
        OpenPhase::OptParams(len) => (len, "optional_data"),
    };
    let bytes = match take(src, remaining, n, field) {
        Field::Ready(bytes) => bytes,
        Field::Pending => {
            return Transition::wait(DecodeState::Open {
                remaining,
                phase,
                open,
            })
        }
        Field::Overrun(e) => return Transition::dropped(MessageType::Open, e, 0, remaining),
    };
    let remaining = remaining - n;
    let phase = match phase {
        OpenPhase::Version => {
            open.version(bytes[0]);
            OpenPhase::SenderAs
        }
        OpenPhase::SenderAs => {
            open.asn(BigEndian::read_u16(bytes));
            OpenPhase::HoldTime
        }
        OpenPhase::HoldTime => {
            open.hold_time(BigEndian::read_u16(bytes));
            OpenPhase::Identifier
        }
        OpenPhase::Identifier => {
            open.router_id(Ipv4Addr::from(BigEndian::read_u32(bytes)));
            OpenPhase::OptParamsLength
        }
        OpenPhase::OptParamsLength => OpenPhase::OptParams(bytes[0] as usize),
        OpenPhase::OptParams(_) => {
            open.opt_params(bytes.to_vec());
            return match built(open.build()) {
                Ok(msg) => Transition::complete(Message::Open(msg), n, remaining),
                Err(e) => Transition::dropped(MessageType::Open, e, n, remaining),
            };
        }
    };
    Transition::advance(
        DecodeState::Open {
            remaining,
            phase,
            open,
        },
        n,
    )
}

fn update_transition(
    remaining: usize,
    phase: UpdatePhase,
    mut update: BGPUpdateMessageBuilder,
    src: &[u8],
) -> Transition {
    let (n, field) = match phase {
        UpdatePhase::WithdrawnLength => (2, "withdrawn_routes_length"),
        UpdatePhase::Withdrawn(len) => (len, "withdrawn_routes"),
        UpdatePhase::AttributesLength => (2, "total_path_attributes_length"),
        UpdatePhase::Attributes(len) => (len, "path_attributes"),
        // Whatever the declared length leaves after the attributes.
        UpdatePhase::Nlri => (remaining, "network_layer_reachability_information"),
    };
    let bytes = match take(src, remaining, n, field) {
        Field::Ready(bytes) => bytes,
        Field::Pending => {
            return Transition::wait(DecodeState::Update {
                remaining,
                phase,
                update,
            })
        }
        Field::Overrun(e) => return Transition::dropped(MessageType::Update, e, 0, remaining),
    };
    let remaining = remaining - n;
    let phase = match phase {
        UpdatePhase::WithdrawnLength => UpdatePhase::Withdrawn(BigEndian::read_u16(bytes) as usize),
        UpdatePhase::Withdrawn(_) => match decode_prefixes(bytes) {
            Ok(routes) => {
                update.withdrawn_routes(routes);
                UpdatePhase::AttributesLength
            }
            Err(e) => return Transition::dropped(MessageType::Update, e, n, remaining),
        },
        UpdatePhase::AttributesLength => {
            UpdatePhase::Attributes(BigEndian::read_u16(bytes) as usize)
        }
        UpdatePhase::Attributes(_) => match decode_attributes(bytes) {
            Ok(attributes) => {
                update.path_attributes(attributes);
                UpdatePhase::Nlri
            }
            Err(e) => return Transition::dropped(MessageType::Update, e, n, remaining),
        },
        UpdatePhase::Nlri => {
            let result = decode_prefixes(bytes).and_then(|nlri| {
                update.nlri(nlri);
                built(update.build())
            });
            return match result {
                Ok(msg) => Transition::complete(Message::Update(msg), n, remaining),
                Err(e) => Transition::dropped(MessageType::Update, e, n, remaining),
            };
        }
    };
    Transition::advance(
        DecodeState::Update {
            remaining,
            phase,
            update,
        },
        n,
    )
}

fn notification_transition(
    remaining: usize,
    phase: NotificationPhase,
    mut notification: BGPNotificationMessageBuilder,
    src: &[u8],
) -> Transition {
    let (n, field) = match phase {
        NotificationPhase::ErrorCode => (1, "error_code"),
        NotificationPhase::ErrorSubcode => (1, "error_subcode"),
        NotificationPhase::Data => (remaining, "data"),
    };
    let bytes = match take(src, remaining, n, field) {
        Field::Ready(bytes) => bytes,
        Field::Pending => {
            return Transition::wait(DecodeState::Notification {
                remaining,
                phase,
                notification,
            })
        }
        Field::Overrun(e) => {
            return Transition::dropped(MessageType::Notification, e, 0, remaining)
        }
    };
    let remaining = remaining - n;
    let phase = match phase {
        NotificationPhase::ErrorCode => {
            notification.error_code(bytes[0]);
            NotificationPhase::ErrorSubcode
        }
        NotificationPhase::ErrorSubcode => {
            notification.error_subcode(bytes[0]);
            NotificationPhase::Data
        }
        NotificationPhase::Data => {
            notification.data(bytes.to_vec());
            return match built(notification.build()) {
                Ok(msg) => Transition::complete(Message::Notification(msg), n, remaining),
                Err(e) => Transition::dropped(MessageType::Notification, e, n, remaining),
            };
        }
    };
    Transition::advance(
        DecodeState::Notification {
            remaining,
            phase,
            notification,
        },
        n,
    )
}

/// Incremental BGP message decoder and encoder.
///
/// The decode state survives across calls, so fields are consumed as soon as
/// they are fully buffered and a message may arrive in any number of reads.
#[derive(Debug)]
pub struct BGPMessageCodec {
    state: DecodeState,
}

impl Default for BGPMessageCodec {
    fn default() -> Self {
        BGPMessageCodec {
            state: DecodeState::Marker,
        }
    }
}

impl BGPMessageCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DecodeState {
        &self.state
    }

    /// True between messages.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, DecodeState::Marker)
    }

    /// Decodes every complete message in `src`, leaving any partial message
    /// buffered in the decode state.
    pub fn decode_all(&mut self, src: &mut BytesMut) -> Result<Vec<Message>, BgpError> {
        let mut messages = vec![];
        while let Some(m) = self.decode(src)? {
            messages.push(m);
        }
        Ok(messages)
    }
}

impl Decoder for BGPMessageCodec {
    type Item = Message;
    type Error = BgpError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let state = std::mem::replace(&mut self.state, DecodeState::Marker);
            let Transition {
                next,
                consumed,
                outcome,
            } = state.transition(&src[..]);
            src.advance(consumed);
            self.state = next;
            match outcome {
                Outcome::NeedMore => return Ok(None),
                Outcome::Continue => {}
                Outcome::Complete(m) => return Ok(Some(m)),
                Outcome::Dropped {
                    message_type,
                    error,
                } => match message_type {
                    Some(t) => log::warn!("dropping malformed {:?} message: {}", t, error),
                    None => log::warn!("dropping message: {}", error),
                },
                Outcome::Fatal(e) => return Err(BgpError::Framing(e)),
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(buf)? {
            Some(m) => Ok(Some(m)),
            None => {
                if !buf.is_empty() || !self.is_idle() {
                    log::debug!(
                        "stream closed with {} bytes of an incomplete message ({:?})",
                        buf.len(),
                        self.state
                    );
                    buf.clear();
                    self.state = DecodeState::Marker;
                }
                Ok(None)
            }
        }
    }
}

impl Encoder<Message> for BGPMessageCodec {
    type Error = BgpError;

    fn encode(&mut self, item: Message, buf: &mut BytesMut) -> Result<(), Self::Error> {
        let data = item.encode()?;
        buf.reserve(data.len());
        buf.extend_from_slice(&data);
        Ok(())
    }
}
