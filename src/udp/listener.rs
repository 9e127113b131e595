//! Background receive loop for tagger hit messages

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::game::{GameState, ScoreDecision};

use super::broadcast::BroadcastDispatcher;
use super::protocol::{HitMessage, MAX_PAYLOAD_BYTES};

/// Anything that yields datagrams with their sender
pub trait DatagramSource: Send + Sync {
    fn recv_from(
        &self,
        buf: &mut [u8],
    ) -> impl Future<Output = io::Result<(usize, SocketAddr)>> + Send;
}

impl DatagramSource for UdpSocket {
    fn recv_from(
        &self,
        buf: &mut [u8],
    ) -> impl Future<Output = io::Result<(usize, SocketAddr)>> + Send {
        UdpSocket::recv_from(self, buf)
    }
}

/// Owns the receive socket; consumed by [`UdpListener::run`]
pub struct UdpListener<S = UdpSocket> {
    source: S,
    game: Arc<GameState>,
    dispatcher: Arc<BroadcastDispatcher>,
    active: Arc<AtomicBool>,
    read_timeout: Duration,
    error_backoff: Duration,
}

impl UdpListener<UdpSocket> {
    /// Bind the receive socket configured in `state`
    pub async fn bind(state: &AppState) -> io::Result<Self> {
        let socket = UdpSocket::bind(state.config.udp.receive_addr).await?;
        info!(addr = %socket.local_addr()?, "UDP receive socket ready");
        Ok(Self::with_source(socket, state))
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.source.local_addr()
    }
}

impl<S: DatagramSource> UdpListener<S> {
    pub fn with_source(source: S, state: &AppState) -> Self {
        let udp = &state.config.udp;
        Self {
            source,
            game: state.game.clone(),
            dispatcher: state.dispatcher.clone(),
            active: state.listener_active.clone(),
            read_timeout: udp.read_timeout,
            error_backoff: udp.error_backoff,
        }
    }

    /// Receive until `shutdown` flips to true or its sender is dropped
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        self.active.store(true, Ordering::Relaxed);
        info!("UDP listener started");

        // One spare byte so oversized datagrams are detected instead of truncated
        let mut buffer = [0u8; MAX_PAYLOAD_BYTES + 1];

        loop {
            if *shutdown.borrow() {
                break;
            }

            let received = tokio::select! {
                _ = shutdown.changed() => break,
                received = timeout(self.read_timeout, self.source.recv_from(&mut buffer)) => received,
            };

            match received {
                // Timeouts only exist so shutdown is noticed promptly
                Err(_elapsed) => continue,
                Ok(Ok((len, from))) => {
                    self.handle_datagram(&buffer[..len], from).await;
                }
                Ok(Err(e)) => {
                    error!(error = %e, "UDP receiver error");
                    sleep(self.error_backoff).await;
                }
            }
        }

        self.active.store(false, Ordering::Relaxed);
        info!("UDP listener stopped");
    }

    /// Parse, score, apply, then echo. Returns the applied decision, or `None`
    /// when the datagram was discarded.
    pub async fn handle_datagram(&self, payload: &[u8], from: SocketAddr) -> Option<ScoreDecision> {
        let message = match HitMessage::from_bytes(payload) {
            Ok(message) => message,
            Err(e) => {
                warn!(%from, error = %e, "Discarding malformed hit message");
                return None;
            }
        };
        debug!(%from, %message, "Received hit message");

        // State is committed before any echo is attempted
        let decision = self.game.process(&message);

        if let Err(e) = self.dispatcher.dispatch(&decision.echo).await {
            warn!(%message, error = %e, "Echo failed after score was applied");
        }

        Some(decision)
    }
}
