//! Scoreboard snapshots for the control surface

use serde::Serialize;

use super::events::Event;
use super::state::{EquipmentId, PlayerRecord, Team};

/// Per-player line on the scoreboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerSnapshot {
    pub equipment_id: EquipmentId,
    pub player_id: u32,
    pub codename: String,
    pub score: i64,
    pub hit_base: bool,
}

impl From<&PlayerRecord> for PlayerSnapshot {
    fn from(p: &PlayerRecord) -> Self {
        Self {
            equipment_id: p.equipment_id,
            player_id: p.player_id,
            codename: p.codename.clone(),
            score: p.score,
            hit_base: p.hit_base,
        }
    }
}

/// One team's players, highest score first, with the team total
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeamSnapshot {
    pub players: Vec<PlayerSnapshot>,
    pub total_score: i64,
}

/// Full match view, assembled under a single read guard
#[derive(Debug, Clone, Serialize)]
pub struct GameSnapshot {
    pub is_active: bool,
    pub red_team: TeamSnapshot,
    pub green_team: TeamSnapshot,
    pub events: Vec<Event>,
}

impl GameSnapshot {
    pub fn build<'a>(
        is_active: bool,
        players: impl IntoIterator<Item = &'a PlayerRecord>,
        events: Vec<Event>,
    ) -> Self {
        let mut red_team = TeamSnapshot::default();
        let mut green_team = TeamSnapshot::default();

        for player in players {
            let team = match player.team {
                Team::Red => &mut red_team,
                Team::Green => &mut green_team,
            };
            team.total_score += player.score;
            team.players.push(PlayerSnapshot::from(player));
        }

        for team in [&mut red_team, &mut green_team] {
            // Ties broken by equipment id so polling clients see a stable order
            team.players
                .sort_by(|a, b| b.score.cmp(&a.score).then(a.equipment_id.cmp(&b.equipment_id)));
        }

        Self {
            is_active,
            red_team,
            green_team,
            events,
        }
    }

    pub fn team(&self, team: Team) -> &TeamSnapshot {
        match team {
            Team::Red => &self.red_team,
            Team::Green => &self.green_team,
        }
    }
}
