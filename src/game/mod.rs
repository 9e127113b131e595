//! Match state and hit scoring

pub mod events;
pub mod scoring;
pub mod snapshot;
pub mod state;

pub use events::{Event, EventKind, EventLog, EVENT_LOG_CAPACITY};
pub use scoring::{EchoPlan, ScoreDecision};
pub use snapshot::GameSnapshot;
pub use state::{EquipmentId, GameState, PlayerRecord, Team};
