use bytes::BytesMut;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_test::assert_ok;
use tokio_util::codec::Decoder;

use kbgpd::bgp;
use kbgpd::config::Config;
use kbgpd::speaker::{self, Context, RouteSink, Update};

#[derive(Default)]
struct CollectingSink {
    updates: Mutex<Vec<Update>>,
    withdrawn: Mutex<Vec<bgp::Prefix>>,
}

impl RouteSink for CollectingSink {
    fn update(&self, update: Update) {
        self.updates.lock().unwrap().push(update);
    }

    fn withdraw(&self, prefixes: &[bgp::Prefix], _rid: Ipv4Addr) {
        self.withdrawn.lock().unwrap().extend_from_slice(prefixes);
    }
}

async fn recv(stream: &mut TcpStream, codec: &mut bgp::BGPMessageCodec, buf: &mut BytesMut) -> bgp::Message {
    loop {
        if let Some(m) = codec.decode(buf).unwrap() {
            return m;
        }
        let n = timeout(Duration::from_secs(5), stream.read_buf(buf))
            .await
            .expect("timed out waiting for the speaker")
            .unwrap();
        assert!(n > 0, "speaker closed the connection");
    }
}

fn p(s: &str) -> bgp::Prefix {
    s.parse().unwrap()
}

#[tokio::test]
async fn session_collects_routes_over_tcp() {
    let mut config = Config::new(64496, Ipv4Addr::new(127, 0, 0, 1));
    config.port = Some(0);
    let ctx = Arc::new(Context::new(config));
    let sink = Arc::new(CollectingSink::default());

    let listener = assert_ok!(speaker::bind(&ctx).await);
    let addr = listener.local_addr().unwrap();
    tokio::spawn(speaker::serve(listener, ctx.clone(), sink.clone()));

    let mut stream = TcpStream::connect(addr).await.unwrap();
    let mut codec = bgp::BGPMessageCodec::new();
    let mut buf = BytesMut::new();

    match recv(&mut stream, &mut codec, &mut buf).await {
        bgp::Message::Open(open) => {
            assert_eq!(open.version, 4);
            assert_eq!(open.asn, 64496);
            assert_eq!(open.hold_time, 180);
            assert_eq!(open.router_id, Ipv4Addr::new(127, 0, 0, 1));
        }
        other => panic!("expected OPEN, got {:?}", other),
    }

    let open = bgp::BGPOpenMessage::new(65001, Ipv4Addr::new(192, 0, 2, 2), 90);
    stream
        .write_all(&bgp::Message::Open(open).encode().unwrap())
        .await
        .unwrap();
    assert_eq!(
        recv(&mut stream, &mut codec, &mut buf).await,
        bgp::Message::Keepalive
    );

    let announce = bgp::BGPUpdateMessageBuilder::default()
        .path_attributes(vec![
            bgp::PathAttribute::origin(bgp::OriginType::Igp),
            bgp::PathAttribute::aspath(vec![bgp::ASPATHSegment {
                segment_type: bgp::ASPATHSegmentType::AsSequence,
                as_list: vec![65001],
            }]),
            bgp::PathAttribute::nexthop(Ipv4Addr::new(192, 0, 2, 2)),
        ])
        .nlri(vec![p("10.0.0.0/8"), p("192.168.1.0/24")])
        .build()
        .unwrap();
    let withdraw = bgp::BGPUpdateMessageBuilder::default()
        .withdrawn_routes(vec![p("10.0.0.0/8")])
        .build()
        .unwrap();
    let mut bytes = bgp::Message::Update(announce).encode().unwrap();
    bytes.extend(bgp::Message::Update(withdraw).encode().unwrap());
    stream.write_all(&bytes).await.unwrap();

    for _ in 0..100 {
        if !sink.withdrawn.lock().unwrap().is_empty() {
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(ctx.total_routes(), 2);
    assert_eq!(*sink.withdrawn.lock().unwrap(), vec![p("10.0.0.0/8")]);
    {
        let updates = sink.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].rid, Ipv4Addr::new(192, 0, 2, 2));
        assert_eq!(updates[0].routes[1].0, p("192.168.1.0/24"));
    }

    let cease = bgp::BGPNotificationMessage::new(bgp::ErrorCode::Cease, 0);
    stream
        .write_all(&bgp::Message::Notification(cease).encode().unwrap())
        .await
        .unwrap();
    let n = timeout(Duration::from_secs(5), stream.read_buf(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(n, 0);
    assert_eq!(ctx.total_routes(), 2);
}
