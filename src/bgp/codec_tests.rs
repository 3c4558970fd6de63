use crate::bgp::{
    ASPATHSegment, ASPATHSegmentType, BGPNotificationMessage, BGPOpenMessage, BGPUpdateMessage,
    BGPUpdateMessageBuilder, BgpValidationError, ErrorCode, Message, MessageType, OriginType,
    PathAttribute, Prefix, MARKER,
};
use crate::error::BgpError;
use bytes::BytesMut;
use pretty_assertions::assert_eq;
use std::net::Ipv4Addr;
use tokio_util::codec::{Decoder, Encoder};

fn p(s: &str) -> Prefix {
    s.parse().unwrap()
}

fn sample_update() -> BGPUpdateMessage {
    BGPUpdateMessageBuilder::default()
        .withdrawn_routes(vec![p("172.16.0.0/12")])
        .path_attributes(vec![
            PathAttribute::origin(OriginType::Igp),
            PathAttribute::aspath(vec![ASPATHSegment {
                segment_type: ASPATHSegmentType::AsSequence,
                as_list: vec![65001, 65002],
            }]),
            PathAttribute::nexthop(Ipv4Addr::new(192, 0, 2, 1)),
            PathAttribute::local_pref(100),
        ])
        .nlri(vec![p("10.0.0.0/8"), p("192.168.1.0/24")])
        .build()
        .unwrap()
}

fn raw(message_type: u8, body: &[u8]) -> Vec<u8> {
    let mut v = MARKER.to_vec();
    v.extend_from_slice(&((body.len() + 19) as u16).to_be_bytes());
    v.push(message_type);
    v.extend_from_slice(body);
    v
}

fn keepalive() -> Vec<u8> {
    raw(4, &[])
}

#[test]
fn test_decode_open() {
    let open = BGPOpenMessage::new(64496, Ipv4Addr::new(127, 0, 0, 1), 180);
    let mut buf = BytesMut::from(&Message::Open(open.clone()).encode().unwrap()[..]);
    let mut codec = BGPMessageCodec::new();

    assert_eq!(codec.decode(&mut buf).unwrap(), Some(Message::Open(open)));
    assert!(buf.is_empty());
    assert!(codec.is_idle());
}

#[test]
fn test_decode_keepalive() {
    let mut buf = BytesMut::from(&keepalive()[..]);
    let mut codec = BGPMessageCodec::new();
    assert_eq!(codec.decode(&mut buf).unwrap(), Some(Message::Keepalive));
}

#[test]
fn test_decode_notification() {
    let mut buf = BytesMut::from(&raw(3, &[6, 4, 0xaa])[..]);
    let mut codec = BGPMessageCodec::new();
    match codec.decode(&mut buf).unwrap() {
        Some(Message::Notification(n)) => {
            assert_eq!(n.error_kind(), Some(ErrorCode::Cease));
            assert_eq!(n.error_subcode, 4);
            assert_eq!(n.data, vec![0xaa]);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_decode_update() {
    let update = sample_update();
    let mut buf = BytesMut::from(&Message::Update(update.clone()).encode().unwrap()[..]);
    let mut codec = BGPMessageCodec::new();
    assert_eq!(codec.decode(&mut buf).unwrap(), Some(Message::Update(update)));
}

#[test]
fn test_update_split_at_every_offset() {
    let update = sample_update();
    let bytes = Message::Update(update.clone()).encode().unwrap();

    for split in 0..=bytes.len() {
        let mut codec = BGPMessageCodec::new();
        let mut buf = BytesMut::from(&bytes[..split]);
        let mut decoded = codec.decode_all(&mut buf).unwrap();
        if split < bytes.len() {
            assert!(decoded.is_empty(), "message completed early at {}", split);
        }
        buf.extend_from_slice(&bytes[split..]);
        decoded.extend(codec.decode_all(&mut buf).unwrap());

        assert_eq!(decoded, vec![Message::Update(update.clone())], "split {}", split);
        assert!(codec.is_idle());
    }
}

#[test]
fn test_update_one_byte_at_a_time() {
    let update = sample_update();
    let bytes = Message::Update(update.clone()).encode().unwrap();
    let mut codec = BGPMessageCodec::new();
    let mut buf = BytesMut::new();
    let mut decoded = vec![];
    for b in bytes {
        buf.extend_from_slice(&[b]);
        decoded.extend(codec.decode_all(&mut buf).unwrap());
    }
    assert_eq!(decoded, vec![Message::Update(update)]);
}

#[test]
fn test_two_messages_in_one_read() {
    let update = sample_update();
    let mut bytes = Message::Update(update.clone()).encode().unwrap();
    bytes.extend(keepalive());
    let mut buf = BytesMut::from(&bytes[..]);
    let mut codec = BGPMessageCodec::new();

    assert_eq!(
        codec.decode_all(&mut buf).unwrap(),
        vec![Message::Update(update), Message::Keepalive]
    );
}

#[test]
fn test_partial_header_waits() {
    let mut buf = BytesMut::from(&keepalive()[..10]);
    let mut codec = BGPMessageCodec::new();
    assert_eq!(codec.decode(&mut buf).unwrap(), None);
    assert_eq!(buf.len(), 10);
}

#[test]
fn test_unknown_type_is_skipped() {
    let mut bytes = raw(9, &[1, 2, 3, 4, 5]);
    bytes.extend(keepalive());
    let mut buf = BytesMut::from(&bytes[..]);
    let mut codec = BGPMessageCodec::new();

    assert_eq!(codec.decode_all(&mut buf).unwrap(), vec![Message::Keepalive]);
    assert!(buf.is_empty());
}

#[test]
fn test_length_over_maximum_is_fatal() {
    let mut bytes = MARKER.to_vec();
    bytes.extend_from_slice(&5000u16.to_be_bytes());
    bytes.push(2);
    let mut buf = BytesMut::from(&bytes[..]);
    let mut codec = BGPMessageCodec::new();

    match codec.decode(&mut buf) {
        Err(BgpError::Framing(BgpValidationError::MessageTooLong { actual, .. })) => {
            assert_eq!(actual, 5000)
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_length_under_minimum_is_fatal() {
    let mut bytes = MARKER.to_vec();
    bytes.extend_from_slice(&18u16.to_be_bytes());
    bytes.push(4);
    let mut buf = BytesMut::from(&bytes[..]);
    let mut codec = BGPMessageCodec::new();
    assert!(matches!(
        codec.decode(&mut buf),
        Err(BgpError::Framing(BgpValidationError::MessageTooShort { .. }))
    ));
}

#[test]
fn test_marker_is_not_validated() {
    let mut bytes = keepalive();
    bytes[0] = 0x00;
    let mut buf = BytesMut::from(&bytes[..]);
    let mut codec = BGPMessageCodec::new();
    assert_eq!(codec.decode(&mut buf).unwrap(), Some(Message::Keepalive));
}

#[test]
fn test_malformed_attribute_drops_update_only() {
    // ORIGIN with value 3 is invalid.
    let body = [0, 0, 0, 4, 0x40, 1, 1, 3, 8, 10];
    let mut bytes = raw(2, &body);
    bytes.extend(keepalive());
    let mut buf = BytesMut::from(&bytes[..]);
    let mut codec = BGPMessageCodec::new();

    assert_eq!(codec.decode_all(&mut buf).unwrap(), vec![Message::Keepalive]);
    assert!(codec.is_idle());
}

#[test]
fn test_truncated_nlri_drops_update() {
    let body = [0, 0, 0, 0, 24, 192, 168];
    let mut bytes = raw(2, &body);
    bytes.extend(keepalive());
    let mut buf = BytesMut::from(&bytes[..]);
    let mut codec = BGPMessageCodec::new();

    assert_eq!(codec.decode_all(&mut buf).unwrap(), vec![Message::Keepalive]);
}

#[test]
fn test_withdrawn_length_past_message_end_resyncs() {
    // Declares 200 withdrawn bytes inside a 4 byte body.
    let body = [0, 200, 0, 0];
    let mut bytes = raw(2, &body);
    bytes.extend(keepalive());
    let mut buf = BytesMut::from(&bytes[..]);
    let mut codec = BGPMessageCodec::new();

    assert_eq!(codec.decode_all(&mut buf).unwrap(), vec![Message::Keepalive]);
    assert!(buf.is_empty());
}

#[test]
fn test_keepalive_with_trailing_bytes_is_skipped_past() {
    let mut bytes = raw(4, &[0xee, 0xee]);
    bytes.extend(keepalive());
    let mut buf = BytesMut::from(&bytes[..]);
    let mut codec = BGPMessageCodec::new();

    assert_eq!(
        codec.decode_all(&mut buf).unwrap(),
        vec![Message::Keepalive, Message::Keepalive]
    );
    assert!(codec.is_idle());
}

#[test]
fn test_open_opt_params_overrun_drops_open() {
    // Optional parameters length of 10 but no parameter bytes.
    let body = [4, 0xfb, 0xf0, 0, 180, 1, 2, 3, 4, 10];
    let mut bytes = raw(1, &body);
    bytes.extend(keepalive());
    let mut buf = BytesMut::from(&bytes[..]);
    let mut codec = BGPMessageCodec::new();

    assert_eq!(codec.decode_all(&mut buf).unwrap(), vec![Message::Keepalive]);
}

#[test]
fn test_decode_eof_discards_partial_message() {
    let bytes = Message::Update(sample_update()).encode().unwrap();
    let mut buf = BytesMut::from(&bytes[..bytes.len() - 3]);
    let mut codec = BGPMessageCodec::new();

    assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
    assert!(buf.is_empty());
    assert!(codec.is_idle());
}

#[test]
fn test_transition_waits_for_full_marker() {
    let t = DecodeState::Marker.transition(&[0xff; 10]);
    assert_eq!(t.consumed, 0);
    assert!(matches!(t.outcome, Outcome::NeedMore));
    assert!(matches!(t.next, DecodeState::Marker));

    let t = DecodeState::Marker.transition(&[0xff; 16]);
    assert_eq!(t.consumed, 16);
    assert!(matches!(t.next, DecodeState::Length));
}

#[test]
fn test_state_tracks_partial_open() {
    let open = BGPOpenMessage::new(64496, Ipv4Addr::new(127, 0, 0, 1), 180);
    let bytes = Message::Open(open).encode().unwrap();
    let mut buf = BytesMut::from(&bytes[..22]);
    let mut codec = BGPMessageCodec::new();

    assert_eq!(codec.decode(&mut buf).unwrap(), None);
    match codec.state() {
        DecodeState::Open {
            remaining, phase, ..
        } => {
            assert_eq!(*remaining, 7);
            assert_eq!(*phase, OpenPhase::HoldTime);
        }
        other => panic!("unexpected state {:?}", other),
    }
}

#[test]
fn test_encoder_writes_wire_form() {
    let mut codec = BGPMessageCodec::new();
    let mut buf = BytesMut::new();
    codec.encode(Message::Keepalive, &mut buf).unwrap();
    let notification = BGPNotificationMessage::new(ErrorCode::Cease, 0);
    codec
        .encode(Message::Notification(notification.clone()), &mut buf)
        .unwrap();

    assert_eq!(buf.len(), 19 + 21);
    assert_eq!(
        codec.decode_all(&mut buf).unwrap(),
        vec![Message::Keepalive, Message::Notification(notification)]
    );
    assert_eq!(Message::Keepalive.message_type(), MessageType::Keepalive);
}
