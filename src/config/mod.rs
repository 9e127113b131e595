//! Configuration module - environment variable parsing

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// HTTP control surface binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Hardware-facing UDP settings
    pub udp: UdpConfig,

    /// PostgREST base URL for the player roster (in-memory roster when unset)
    pub roster_url: Option<String>,
    /// API key sent with roster requests
    pub roster_api_key: Option<String>,

    /// Allowed client origins for CORS ("*" allows any)
    pub client_origin: String,
}

/// UDP listener and broadcast settings
#[derive(Clone, Debug)]
pub struct UdpConfig {
    /// Receive socket address for hit messages
    pub receive_addr: SocketAddr,
    /// Destination port for echo broadcasts
    pub broadcast_port: u16,
    /// Initial destination address for echo broadcasts
    pub broadcast_address: IpAddr,
    /// Receive timeout; only bounds how long shutdown can be delayed
    pub read_timeout: Duration,
    /// Pause after an unexpected listener error
    pub error_backoff: Duration,
    /// Gap between the two echoes of a friendly-fire pair
    pub paired_delay: Duration,
    /// Gap between repeated match-end echoes
    pub repeat_delay: Duration,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            receive_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 7501),
            broadcast_port: 7500,
            broadcast_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            read_timeout: Duration::from_millis(1000),
            error_backoff: Duration::from_millis(1000),
            paired_delay: Duration::from_millis(50),
            repeat_delay: Duration::from_millis(100),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 5000),
            log_level: "info".to_string(),
            udp: UdpConfig::default(),
            roster_url: None,
            roster_api_key: None,
            client_origin: "*".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
                .parse()
                .map_err(|_| ConfigError::InvalidAddress("PORT"))?
        } else {
            parse_var("SERVER_ADDR", defaults.server_addr)
                .map_err(|_| ConfigError::InvalidAddress("SERVER_ADDR"))?
        };

        let udp = UdpConfig {
            receive_addr: parse_var("UDP_RECEIVE_ADDR", defaults.udp.receive_addr)
                .map_err(|_| ConfigError::InvalidAddress("UDP_RECEIVE_ADDR"))?,
            broadcast_port: parse_var("UDP_BROADCAST_PORT", defaults.udp.broadcast_port)?,
            broadcast_address: parse_var("UDP_BROADCAST_ADDRESS", defaults.udp.broadcast_address)
                .map_err(|_| ConfigError::InvalidAddress("UDP_BROADCAST_ADDRESS"))?,
            read_timeout: parse_millis("UDP_READ_TIMEOUT_MS", defaults.udp.read_timeout)?,
            error_backoff: parse_millis("UDP_ERROR_BACKOFF_MS", defaults.udp.error_backoff)?,
            paired_delay: parse_millis("FRIENDLY_FIRE_DELAY_MS", defaults.udp.paired_delay)?,
            repeat_delay: parse_millis("END_SIGNAL_DELAY_MS", defaults.udp.repeat_delay)?,
        };

        if udp.read_timeout.is_zero() {
            return Err(ConfigError::Invalid("UDP_READ_TIMEOUT_MS"));
        }

        let roster_url = env::var("ROSTER_URL").ok().filter(|s| !s.trim().is_empty());
        let roster_api_key = env::var("ROSTER_API_KEY").ok();
        if roster_url.is_some() && roster_api_key.is_none() {
            return Err(ConfigError::Missing("ROSTER_API_KEY"));
        }

        Ok(Self {
            server_addr,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            udp,
            roster_url,
            roster_api_key,
            client_origin: env::var("CLIENT_ORIGIN").unwrap_or(defaults.client_origin),
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

fn parse_millis(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid address format in {0}")]
    InvalidAddress(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
