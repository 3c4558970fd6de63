// src/neighbor/connection.rs

use futures::SinkExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_stream::StreamExt;
use tokio_util::codec::Framed;

use super::message_handler::{dispatch, Action};
use super::session::PeerSession;
use super::timers::KeepaliveTimer;
use super::types::{DisconnectReason, Event};
use crate::bgp;
use crate::error::BgpError;

pub type BGPFramed<T> = Framed<T, bgp::BGPMessageCodec>;

pub async fn send_open<T>(server: &mut BGPFramed<T>, open: bgp::BGPOpenMessage) -> Result<(), BgpError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    log::debug!("sending OPEN: {}", open);
    server.send(bgp::Message::Open(open)).await
}

pub async fn send_keepalive<T>(server: &mut BGPFramed<T>) -> Result<(), BgpError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    log::debug!("sending KEEPALIVE");
    server.send(bgp::Message::Keepalive).await
}

pub async fn send_notification<T>(
    server: &mut BGPFramed<T>,
    notification: bgp::BGPNotificationMessage,
) -> Result<(), BgpError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    log::debug!("sending NOTIFICATION: {}", notification);
    server.send(bgp::Message::Notification(notification)).await
}

/// Drives one session over `stream` until it disconnects.
///
/// `tx` must be the sending half of `rx`; the keepalive timer reports through
/// it and callers keep a clone to request [`Event::ManualStop`].
pub async fn run_session<T>(
    stream: T,
    mut session: PeerSession,
    tx: mpsc::Sender<Event>,
    mut rx: mpsc::Receiver<Event>,
) -> DisconnectReason
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let mut server = Framed::new(stream, bgp::BGPMessageCodec::new());
    let mut keepalive: Option<KeepaliveTimer> = None;

    let reason = match send_open(&mut server, session.local_open()).await {
        Ok(()) => {
            session_loop(&mut server, &mut session, &mut keepalive, tx, &mut rx).await
        }
        Err(e) => DisconnectReason::TransportError(e.to_string()),
    };

    if let Some(mut timer) = keepalive.take() {
        timer.cancel();
    }
    session.close(&reason);
    reason
}

async fn session_loop<T>(
    server: &mut BGPFramed<T>,
    session: &mut PeerSession,
    keepalive: &mut Option<KeepaliveTimer>,
    tx: mpsc::Sender<Event>,
    rx: &mut mpsc::Receiver<Event>,
) -> DisconnectReason
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let statistics = session.statistics_interval();
    let period = statistics.unwrap_or(std::time::Duration::from_secs(5));
    let mut stats = interval_at(Instant::now() + period, period);
    stats.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            Some(event) = rx.recv() => match event {
                Event::ManualStop => return DisconnectReason::ManualStop,
                Event::KeepaliveTimerExpires => {
                    if !session.is_active() {
                        continue;
                    }
                    if let Err(e) = send_keepalive(server).await {
                        return DisconnectReason::TransportError(e.to_string());
                    }
                }
            },
            _ = stats.tick(), if statistics.is_some() && session.is_established() => {
                session.log_statistics();
            }
            frame = server.next() => match frame {
                None => return DisconnectReason::PeerClosed,
                Some(Ok(message)) => match dispatch(session, message) {
                    Action::Continue => {}
                    Action::Established => {
                        if let Err(e) = send_keepalive(server).await {
                            return DisconnectReason::TransportError(e.to_string());
                        }
                        if let Some(period) = session.keepalive_period() {
                            *keepalive = Some(KeepaliveTimer::start(period, tx.clone()));
                        }
                    }
                    Action::Disconnect(reason) => return reason,
                },
                Some(Err(BgpError::Framing(e))) => {
                    log::error!("closing session: {}", e);
                    if let Err(err) = send_notification(server, bgp::BGPNotificationMessage::from(&e)).await {
                        log::debug!("could not send NOTIFICATION: {}", err);
                    }
                    return DisconnectReason::FramingError(e);
                }
                Some(Err(e)) => return DisconnectReason::TransportError(e.to_string()),
            },
        }
    }
}
