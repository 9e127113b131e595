//! Authoritative match state shared by the UDP listener and HTTP handlers

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::udp::protocol::HitMessage;

use super::events::{Event, EventKind, EventLog};
use super::scoring::{self, ScoreDecision};
use super::snapshot::GameSnapshot;

/// Identifier burned into a tagger or sensor unit
pub type EquipmentId = u32;

/// Team assignment, fixed for the duration of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Red,
    Green,
}

impl Team {
    pub fn opponent(self) -> Self {
        match self {
            Team::Red => Team::Green,
            Team::Green => Team::Red,
        }
    }
}

impl Default for Team {
    fn default() -> Self {
        Self::Red
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::Red => f.write_str("Red"),
            Team::Green => f.write_str("Green"),
        }
    }
}

/// A player bound to a piece of equipment for the current match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub equipment_id: EquipmentId,
    pub player_id: u32,
    pub codename: String,
    pub team: Team,
    pub score: i64,
    pub hit_base: bool,
}

impl PlayerRecord {
    pub fn new(equipment_id: EquipmentId, player_id: u32, codename: String, team: Team) -> Self {
        Self {
            equipment_id,
            player_id,
            codename,
            team,
            score: 0,
            hit_base: false,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    players: HashMap<EquipmentId, PlayerRecord>,
    is_active: bool,
    events: EventLog,
}

impl Inner {
    fn apply(&mut self, decision: &ScoreDecision) {
        for &(equipment_id, delta) in &decision.deltas {
            if let Some(player) = self.players.get_mut(&equipment_id) {
                player.score += delta;
            }
        }

        if let Some(equipment_id) = decision.base_hit {
            if let Some(player) = self.players.get_mut(&equipment_id) {
                player.hit_base = true;
            }
        }

        if let Some(entry) = &decision.log {
            self.events.push(Event::new(entry.message.clone(), entry.kind));
        }
    }
}

/// Lock-protected match state.
///
/// Every method takes the lock exactly once, so each call is atomic with
/// respect to every other call. Guards are never held across an `.await`.
#[derive(Debug, Default)]
pub struct GameState {
    inner: RwLock<Inner>,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a player to equipment, replacing any existing record for that equipment.
    /// Returns the replaced record.
    pub fn add_player(
        &self,
        equipment_id: EquipmentId,
        player_id: u32,
        codename: impl Into<String>,
        team: Team,
    ) -> Option<PlayerRecord> {
        let record = PlayerRecord::new(equipment_id, player_id, codename.into(), team);
        let mut inner = self.inner.write();
        let previous = inner.players.insert(equipment_id, record);

        match &previous {
            Some(old) if old.player_id != player_id => warn!(
                equipment_id,
                previous_player = old.player_id,
                player_id,
                "Equipment reassigned to a different player"
            ),
            _ => info!(equipment_id, player_id, team = %team, "Player added to match"),
        }

        previous
    }

    pub fn get_player(&self, equipment_id: EquipmentId) -> Option<PlayerRecord> {
        self.inner.read().players.get(&equipment_id).cloned()
    }

    /// All records, in no particular order
    pub fn players(&self) -> Vec<PlayerRecord> {
        self.inner.read().players.values().cloned().collect()
    }

    pub fn player_count(&self) -> usize {
        self.inner.read().players.len()
    }

    /// Add `delta` to a player's score; `None` if the equipment is unknown
    pub fn update_score(&self, equipment_id: EquipmentId, delta: i64) -> Option<i64> {
        let mut inner = self.inner.write();
        let player = inner.players.get_mut(&equipment_id)?;
        player.score += delta;
        Some(player.score)
    }

    pub fn mark_base_hit(&self, equipment_id: EquipmentId) -> bool {
        match self.inner.write().players.get_mut(&equipment_id) {
            Some(player) => {
                player.hit_base = true;
                true
            }
            None => false,
        }
    }

    /// Both players known and on the same team
    pub fn is_friendly_fire(&self, attacker: EquipmentId, victim: EquipmentId) -> bool {
        let inner = self.inner.read();
        match (inner.players.get(&attacker), inner.players.get(&victim)) {
            (Some(a), Some(v)) => a.team == v.team,
            _ => false,
        }
    }

    pub fn team_score(&self, team: Team) -> i64 {
        self.inner
            .read()
            .players
            .values()
            .filter(|p| p.team == team)
            .map(|p| p.score)
            .sum()
    }

    pub fn is_active(&self) -> bool {
        self.inner.read().is_active
    }

    pub fn start_match(&self) {
        self.inner.write().is_active = true;
        info!("Match started");
    }

    pub fn end_match(&self) {
        self.inner.write().is_active = false;
        info!("Match ended");
    }

    /// Zero scores and base flags; roster and event log are kept
    pub fn reset_match(&self) {
        let mut inner = self.inner.write();
        for player in inner.players.values_mut() {
            player.score = 0;
            player.hit_base = false;
        }
        inner.is_active = false;
        info!("Match state reset");
    }

    /// Drop every record and the event log
    pub fn clear_roster(&self) {
        let mut inner = self.inner.write();
        inner.players.clear();
        inner.events.clear();
        inner.is_active = false;
        info!("All players cleared from match state");
    }

    pub fn append_event(&self, message: impl Into<String>, kind: EventKind) {
        self.inner.write().events.push(Event::new(message, kind));
    }

    pub fn recent_events(&self, n: usize) -> Vec<Event> {
        self.inner.read().events.recent(n)
    }

    /// Resolve and apply one hit message inside a single critical section
    pub fn process(&self, message: &HitMessage) -> ScoreDecision {
        let mut inner = self.inner.write();
        let decision = scoring::decide(message, &inner.players);
        inner.apply(&decision);
        decision
    }

    /// Consistent scoreboard view with the last `event_count` events
    pub fn snapshot(&self, event_count: usize) -> GameSnapshot {
        let inner = self.inner.read();
        GameSnapshot::build(
            inner.is_active,
            inner.players.values(),
            inner.events.recent(event_count),
        )
    }
}
