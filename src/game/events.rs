//! Bounded match event log shown on the live scoreboard

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of events retained; older entries are evicted first
pub const EVENT_LOG_CAPACITY: usize = 50;

/// Event category, used by the scoreboard for styling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Info,
    Hit,
    FriendlyFire,
    BaseHit,
}

/// A single human-readable log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
}

impl Event {
    pub fn new(message: impl Into<String>, kind: EventKind) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
            kind,
        }
    }
}

/// FIFO event log with a fixed capacity
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<Event>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an event, evicting the oldest entry when full
    pub fn push(&mut self, event: Event) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(event);
    }

    /// The `n` most recent events, oldest first
    pub fn recent(&self, n: usize) -> Vec<Event> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(EVENT_LOG_CAPACITY)
    }
}
