//! Per-connection handler for the persistent stream.
//!
//! Lifecycle: `Connecting -> Authenticated -> Active -> Closed`. The first
//! two steps happen in the upgrade handler; this module drives the rest.

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitStream;
use futures_util::{Sink, SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use hushwire_proto::{Envelope, ValidationError};

use crate::api::AppState;
use crate::error::TransportError;
use crate::registry::{ConnectionHandle, Outbox};
use crate::router::{self, DispatcherClosed};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Authenticated,
    Active,
    Closed,
}

impl ConnectionState {
    pub fn can_advance_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Connecting, Authenticated)
                | (Authenticated, Active)
                | (Connecting | Authenticated | Active, Closed)
        )
    }
}

/// Tracks and traces the state of one connection attempt.
#[derive(Debug)]
pub struct ConnectionLifecycle {
    state: ConnectionState,
    user: Option<String>,
}

impl Default for ConnectionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionLifecycle {
    pub fn new() -> Self {
        debug!(state = ?ConnectionState::Connecting, "Connection accepted");
        Self {
            state: ConnectionState::Connecting,
            user: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn authenticated(&mut self, user_id: &str) {
        self.user = Some(user_id.to_string());
        self.advance(ConnectionState::Authenticated);
    }

    pub fn advance(&mut self, next: ConnectionState) {
        if !self.state.can_advance_to(next) {
            warn!(user = ?self.user, from = ?self.state, to = ?next, "Ignoring invalid connection transition");
            return;
        }
        debug!(user = ?self.user, from = ?self.state, to = ?next, "Connection state changed");
        self.state = next;
    }
}

/// Why a connection's read side stopped.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("rejected envelope: {0}")]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Dispatcher(#[from] DispatcherClosed),
}

#[derive(Debug, PartialEq, Eq)]
enum ReadEnd {
    PeerClosed,
    /// Removed from the registry by someone else (eviction or a duplicate
    /// identifier going away).
    Signalled,
}

/// Drive an upgraded, authenticated socket until it closes.
pub async fn handle_socket(
    socket: WebSocket,
    user_id: String,
    state: AppState,
    mut lifecycle: ConnectionLifecycle,
) {
    let (handle, Outbox { envelopes, closed }) = state.registry.open(&user_id);
    let (sink, mut stream) = socket.split();
    let writer = tokio::spawn(write_loop(sink, envelopes, closed.clone(), handle.clone()));

    state.registry.add_client(handle.clone()).await;
    state
        .metrics
        .active_connections
        .set(state.registry.len().await as f64);
    lifecycle.advance(ConnectionState::Active);
    info!(conn = handle.id(), user = %user_id, "Connection registered");

    let end = read_loop(&mut stream, &handle, &state, closed).await;
    match &end {
        Ok(ReadEnd::PeerClosed) => info!(conn = handle.id(), user = %user_id, "Peer closed connection"),
        Ok(ReadEnd::Signalled) => info!(conn = handle.id(), user = %user_id, "Connection removed by relay"),
        Err(e) => {
            if matches!(e, ConnectionError::Transport(TransportError::Decode(_)) | ConnectionError::Invalid(_)) {
                state.metrics.envelopes_rejected.inc();
            }
            warn!(conn = handle.id(), user = %user_id, error = %e, "Closing connection");
        }
    }

    if matches!(end, Ok(ReadEnd::Signalled)) {
        // No-op unless our own writer signalled the close.
        state.registry.evict(handle.id()).await;
    } else {
        state.registry.remove_client(&handle).await;
    }
    handle.close();
    state
        .metrics
        .active_connections
        .set(state.registry.len().await as f64);

    match writer.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(conn = handle.id(), error = %e, "Connection writer failed"),
        Err(e) => error!(conn = handle.id(), error = %e, "Connection writer panicked"),
    }
    lifecycle.advance(ConnectionState::Closed);
}

async fn read_loop(
    stream: &mut SplitStream<WebSocket>,
    handle: &ConnectionHandle,
    state: &AppState,
    mut closed: watch::Receiver<bool>,
) -> Result<ReadEnd, ConnectionError> {
    loop {
        let frame = tokio::select! {
            frame = stream.next() => frame,
            _ = closed.changed() => return Ok(ReadEnd::Signalled),
        };

        let message = match frame {
            None => return Ok(ReadEnd::PeerClosed),
            Some(Err(e)) => return Err(TransportError::ReadFailed(e.to_string()).into()),
            Some(Ok(message)) => message,
        };

        let mut envelope = match message {
            Message::Text(text) => Envelope::from_json(&text).map_err(TransportError::from)?,
            Message::Binary(bytes) => Envelope::from_slice(&bytes).map_err(TransportError::from)?,
            Message::Close(_) => return Ok(ReadEnd::PeerClosed),
            Message::Ping(_) | Message::Pong(_) => continue,
        };

        router::validate(&envelope)?;

        if envelope.sender_id != handle.user_id() {
            warn!(
                conn = handle.id(),
                user = %handle.user_id(),
                claimed = %envelope.sender_id,
                "Sender id does not match token, overwriting"
            );
            envelope.sender_id = handle.user_id().to_string();
        }

        debug!(
            conn = handle.id(),
            from = %envelope.sender_id,
            to = %envelope.recipient_id,
            len = envelope.body.len(),
            "Envelope received"
        );
        state.metrics.envelopes_received.inc();
        state.router.submit(envelope)?;
    }
}

/// Drain the outbound queue into `sink`. A failed write signals the
/// connection closed so its reader unregisters it.
async fn write_loop<S>(
    mut sink: S,
    mut envelopes: mpsc::UnboundedReceiver<Envelope>,
    mut closed: watch::Receiver<bool>,
    handle: ConnectionHandle,
) -> Result<(), TransportError>
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    loop {
        tokio::select! {
            next = envelopes.recv() => {
                let Some(envelope) = next else { break };
                let sent = match envelope.to_json() {
                    Ok(text) => sink.send(Message::Text(text)).await.map_err(|e| e.to_string()),
                    Err(e) => Err(e.to_string()),
                };
                if let Err(reason) = sent {
                    handle.close();
                    return Err(TransportError::WriteFailed(reason));
                }
            }
            _ = closed.changed() => break,
        }
    }

    if let Err(e) = sink.close().await {
        debug!(conn = handle.id(), error = %e, "Close frame not sent");
    }
    Ok(())
}
