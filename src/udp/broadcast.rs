//! Outbound echo broadcasts to tagger hardware

use std::future::Future;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use parking_lot::RwLock;
use tokio::net::UdpSocket;
use tracing::{debug, error, info};

use crate::config::UdpConfig;
use crate::game::EchoPlan;

use super::protocol::{encode_code, MATCH_END, MATCH_START};

/// Number of times the match-end code is sent
pub const MATCH_END_REPEATS: usize = 3;

/// Anything that can put a datagram on the wire
pub trait EchoSink: Send + Sync {
    fn send_to(
        &self,
        payload: &[u8],
        target: SocketAddr,
    ) -> impl Future<Output = io::Result<usize>> + Send;
}

impl EchoSink for UdpSocket {
    fn send_to(
        &self,
        payload: &[u8],
        target: SocketAddr,
    ) -> impl Future<Output = io::Result<usize>> + Send {
        UdpSocket::send_to(self, payload, target)
    }
}

/// Inter-send delays for multi-datagram patterns
#[derive(Debug, Clone, Copy)]
pub struct EchoTiming {
    pub paired_delay: Duration,
    pub repeat_delay: Duration,
}

impl From<&UdpConfig> for EchoTiming {
    fn from(config: &UdpConfig) -> Self {
        Self {
            paired_delay: config.paired_delay,
            repeat_delay: config.repeat_delay,
        }
    }
}

/// Sends decimal codes to the configured destination and broadcast port.
///
/// The destination address can be changed while the server runs. Multi-send
/// patterns read it once up front so one logical broadcast never spans two
/// destinations.
pub struct BroadcastDispatcher<S = UdpSocket> {
    sink: S,
    address: RwLock<IpAddr>,
    port: u16,
    timing: EchoTiming,
}

impl BroadcastDispatcher<UdpSocket> {
    /// Bind an ephemeral broadcast-capable socket
    pub async fn bind(config: &UdpConfig) -> io::Result<Self> {
        let socket = UdpSocket::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0)).await?;
        socket.set_broadcast(true)?;
        info!(
            address = %config.broadcast_address,
            port = config.broadcast_port,
            "UDP broadcast socket ready"
        );
        Ok(Self::with_sink(socket, config))
    }
}

impl<S: EchoSink> BroadcastDispatcher<S> {
    pub fn with_sink(sink: S, config: &UdpConfig) -> Self {
        Self {
            sink,
            address: RwLock::new(config.broadcast_address),
            port: config.broadcast_port,
            timing: EchoTiming::from(config),
        }
    }

    pub fn address(&self) -> IpAddr {
        *self.address.read()
    }

    pub fn set_address(&self, address: IpAddr) {
        *self.address.write() = address;
        info!(%address, "Broadcast address changed");
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn destination(&self) -> SocketAddr {
        SocketAddr::new(self.address(), self.port)
    }

    async fn send_code(&self, code: u32, target: SocketAddr) -> Result<(), BroadcastError> {
        match self.sink.send_to(&encode_code(code), target).await {
            Ok(_) => {
                debug!(code, %target, "Broadcasted code");
                Ok(())
            }
            Err(source) => {
                error!(code, %target, error = %source, "Broadcast failed");
                Err(BroadcastError::Send {
                    code,
                    target,
                    source,
                })
            }
        }
    }

    /// One datagram
    pub async fn send_single(&self, code: u32) -> Result<(), BroadcastError> {
        self.send_code(code, self.destination()).await
    }

    /// Two datagrams separated by the paired delay; the second is still
    /// attempted if the first fails, and the first error is returned
    pub async fn send_paired(&self, first: u32, second: u32) -> Result<(), BroadcastError> {
        let target = self.destination();
        let first_result = self.send_code(first, target).await;
        tokio::time::sleep(self.timing.paired_delay).await;
        let second_result = self.send_code(second, target).await;
        first_result.and(second_result)
    }

    /// `times` datagrams separated by the repeat delay, stopping at the first failure
    pub async fn send_repeated(&self, code: u32, times: usize) -> Result<(), BroadcastError> {
        let target = self.destination();
        for attempt in 0..times {
            if attempt > 0 {
                tokio::time::sleep(self.timing.repeat_delay).await;
            }
            self.send_code(code, target)
                .await
                .map_err(|e| BroadcastError::Aborted {
                    code,
                    attempt: attempt + 1,
                    source: Box::new(e),
                })?;
        }
        Ok(())
    }

    pub async fn send_match_start(&self) -> Result<(), BroadcastError> {
        self.send_single(MATCH_START).await
    }

    pub async fn send_match_end(&self) -> Result<(), BroadcastError> {
        self.send_repeated(MATCH_END, MATCH_END_REPEATS).await
    }

    /// Send the echoes a score decision asked for
    pub async fn dispatch(&self, plan: &EchoPlan) -> Result<(), BroadcastError> {
        match *plan {
            EchoPlan::None => Ok(()),
            EchoPlan::Single(code) => self.send_single(code).await,
            EchoPlan::Paired { first, second } => self.send_paired(first, second).await,
        }
    }
}

/// Broadcast errors
#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    #[error("failed to send code {code} to {target}: {source}")]
    Send {
        code: u32,
        target: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("repeated broadcast of code {code} aborted on attempt {attempt}")]
    Aborted {
        code: u32,
        attempt: usize,
        #[source]
        source: Box<BroadcastError>,
    },
}
