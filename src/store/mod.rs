//! Persistent player roster (player id -> codename)

pub mod memory;
pub mod rest;

pub use memory::MemoryRoster;
pub use rest::RestRoster;

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Longest codename the roster table accepts
pub const MAX_CODENAME_LEN: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: u32,
    pub codename: String,
}

/// Roster backend selected at startup
#[derive(Clone)]
pub enum RosterStore {
    Memory(MemoryRoster),
    Rest(RestRoster),
}

impl RosterStore {
    pub fn from_config(config: &Config) -> Self {
        match (&config.roster_url, &config.roster_api_key) {
            (Some(url), Some(key)) => RosterStore::Rest(RestRoster::new(url.clone(), key.clone())),
            _ => RosterStore::Memory(MemoryRoster::new()),
        }
    }

    pub fn backend(&self) -> &'static str {
        match self {
            RosterStore::Memory(_) => "memory",
            RosterStore::Rest(_) => "rest",
        }
    }

    pub async fn lookup_codename(&self, player_id: u32) -> Result<Option<String>, RosterError> {
        match self {
            RosterStore::Memory(m) => Ok(m.lookup_codename(player_id)),
            RosterStore::Rest(r) => r.lookup_codename(player_id).await,
        }
    }

    /// Validate and store a codename; returns the stored (trimmed) form
    pub async fn upsert(&self, player_id: u32, codename: &str) -> Result<String, RosterError> {
        let codename = validate_codename(codename)?;
        match self {
            RosterStore::Memory(m) => m.upsert(player_id, &codename),
            RosterStore::Rest(r) => r.upsert(player_id, &codename).await?,
        }
        tracing::info!(player_id, %codename, "Roster entry saved");
        Ok(codename)
    }

    pub async fn list(&self) -> Result<Vec<RosterEntry>, RosterError> {
        match self {
            RosterStore::Memory(m) => Ok(m.list()),
            RosterStore::Rest(r) => r.list().await,
        }
    }

    pub async fn clear(&self) -> Result<(), RosterError> {
        match self {
            RosterStore::Memory(m) => {
                m.clear();
                Ok(())
            }
            RosterStore::Rest(r) => r.clear().await,
        }
    }

    pub async fn count(&self) -> Result<usize, RosterError> {
        match self {
            RosterStore::Memory(m) => Ok(m.count()),
            RosterStore::Rest(r) => r.count().await,
        }
    }

    pub async fn ping(&self) -> Result<(), RosterError> {
        match self {
            RosterStore::Memory(_) => Ok(()),
            RosterStore::Rest(r) => r.ping().await,
        }
    }
}

pub fn validate_codename(codename: &str) -> Result<String, RosterError> {
    let trimmed = codename.trim();
    if trimmed.is_empty() {
        return Err(RosterError::InvalidCodename("codename is empty".to_string()));
    }
    if trimmed.chars().count() > MAX_CODENAME_LEN {
        return Err(RosterError::InvalidCodename(format!(
            "codename longer than {} characters",
            MAX_CODENAME_LEN
        )));
    }
    Ok(trimmed.to_string())
}

/// Roster errors
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(reqwest::Error),

    #[error("Invalid codename: {0}")]
    InvalidCodename(String),
}
