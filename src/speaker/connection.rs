// File: src/speaker/connection.rs
//
// Accepts peer connections and runs one session task per connection.

use anyhow::{Context as _, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::neighbor::{self, DisconnectReason, Event, PeerSession};

use super::events::RouteSink;
use super::types::Context;

/// Spawns the session task for an accepted connection.
pub fn add_incoming(
    ctx: Arc<Context>,
    sink: Arc<dyn RouteSink>,
    socket: TcpStream,
    addr: SocketAddr,
) -> (mpsc::Sender<Event>, JoinHandle<DisconnectReason>) {
    log::info!("connection established with {}", addr);
    let (tx, rx) = mpsc::channel::<Event>(100);
    let session = PeerSession::new(ctx, sink, Some(addr));
    let events = tx.clone();
    let handle = tokio::spawn(async move { neighbor::run_session(socket, session, events, rx).await });
    (tx, handle)
}

pub async fn bind(ctx: &Context) -> Result<TcpListener> {
    let socket_addr = SocketAddr::from((ctx.config.local_ip(), ctx.config.port()));
    let listener = TcpListener::bind(socket_addr)
        .await
        .with_context(|| format!("Failed to bind BGP listener to {}", socket_addr))?;
    log::info!("listening on {}", socket_addr);
    Ok(listener)
}

/// Accepts connections on `listener` until accepting fails.
pub async fn serve(listener: TcpListener, ctx: Arc<Context>, sink: Arc<dyn RouteSink>) -> Result<()> {
    loop {
        let (socket, addr) = listener
            .accept()
            .await
            .context("Failed to accept BGP connection")?;
        add_incoming(ctx.clone(), sink.clone(), socket, addr);
    }
}

/// Listen for incoming BGP connections.
pub async fn listen(ctx: Arc<Context>, sink: Arc<dyn RouteSink>) -> Result<()> {
    let listener = bind(&ctx).await?;
    serve(listener, ctx, sink).await
}
