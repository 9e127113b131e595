//! In-process roster used when no database is configured

use std::sync::Arc;

use dashmap::DashMap;

use super::RosterEntry;

#[derive(Clone, Default)]
pub struct MemoryRoster {
    players: Arc<DashMap<u32, String>>,
}

impl MemoryRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup_codename(&self, player_id: u32) -> Option<String> {
        self.players.get(&player_id).map(|c| c.value().clone())
    }

    pub fn upsert(&self, player_id: u32, codename: &str) {
        self.players.insert(player_id, codename.to_string());
    }

    /// Entries ordered by player id
    pub fn list(&self) -> Vec<RosterEntry> {
        let mut entries: Vec<RosterEntry> = self
            .players
            .iter()
            .map(|e| RosterEntry {
                id: *e.key(),
                codename: e.value().clone(),
            })
            .collect();
        entries.sort_by_key(|e| e.id);
        entries
    }

    pub fn clear(&self) {
        self.players.clear();
    }

    pub fn count(&self) -> usize {
        self.players.len()
    }
}
