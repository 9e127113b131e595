//! Application state shared across routes and the UDP listener

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::game::GameState;
use crate::store::RosterStore;
use crate::udp::BroadcastDispatcher;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub game: Arc<GameState>,
    pub dispatcher: Arc<BroadcastDispatcher>,
    pub roster: RosterStore,
    /// Set while the UDP listener loop is running
    pub listener_active: Arc<AtomicBool>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config, dispatcher: BroadcastDispatcher) -> Self {
        let roster = RosterStore::from_config(&config);
        Self::with_roster(config, dispatcher, roster)
    }

    pub fn with_roster(config: Config, dispatcher: BroadcastDispatcher, roster: RosterStore) -> Self {
        Self {
            config: Arc::new(config),
            game: Arc::new(GameState::new()),
            dispatcher: Arc::new(dispatcher),
            roster,
            listener_active: Arc::new(AtomicBool::new(false)),
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
