//! Hit resolution - maps a parsed datagram onto score changes and echoes

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::udp::protocol::{HitMessage, GREEN_BASE, MATCH_END, MATCH_START, RED_BASE};

use super::events::EventKind;
use super::state::{EquipmentId, PlayerRecord, Team};

/// Points for tagging an opponent
pub const HIT_POINTS: i64 = 10;
/// Applied to both attacker and victim on a same-team hit
pub const FRIENDLY_FIRE_PENALTY: i64 = -10;
/// Points for tagging the opposing base
pub const BASE_SCORE: i64 = 100;

/// Outbound acknowledgement pattern for one message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EchoPlan {
    #[default]
    None,
    Single(u32),
    /// Two codes separated by the dispatcher's paired delay
    Paired { first: u32, second: u32 },
}

impl EchoPlan {
    /// Codes in send order
    pub fn codes(&self) -> Vec<u32> {
        match *self {
            EchoPlan::None => Vec::new(),
            EchoPlan::Single(code) => vec![code],
            EchoPlan::Paired { first, second } => vec![first, second],
        }
    }
}

/// Entry destined for the public event log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub message: String,
    pub kind: EventKind,
}

/// Everything one message does to the match, applied atomically by `GameState`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreDecision {
    pub deltas: Vec<(EquipmentId, i64)>,
    pub base_hit: Option<EquipmentId>,
    pub log: Option<LogEntry>,
    pub echo: EchoPlan,
}

impl ScoreDecision {
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
            && self.base_hit.is_none()
            && self.log.is_none()
            && self.echo == EchoPlan::None
    }

    fn with_log(mut self, message: String, kind: EventKind) -> Self {
        self.log = Some(LogEntry { message, kind });
        self
    }
}

/// Team that owns the base behind a reserved target code
pub fn base_owner(code: u32) -> Option<Team> {
    match code {
        RED_BASE => Some(Team::Red),
        GREEN_BASE => Some(Team::Green),
        _ => None,
    }
}

/// Resolve a message against the current roster
pub fn decide(message: &HitMessage, players: &HashMap<EquipmentId, PlayerRecord>) -> ScoreDecision {
    match *message {
        HitMessage::Hit {
            transmitter,
            target,
        } => match (base_owner(target), target) {
            (Some(owner), _) => resolve_base_hit(transmitter, target, owner, players),
            // Echoing a control code would start or end the match on the hardware
            (None, MATCH_START | MATCH_END) => {
                warn!(
                    equipment_id = transmitter,
                    code = target,
                    "Hit targets a control code - dropped"
                );
                ScoreDecision::default()
            }
            (None, _) => resolve_player_hit(transmitter, target, players),
        },
        HitMessage::Code(code) => resolve_bare_code(code),
    }
}

fn resolve_base_hit(
    transmitter: EquipmentId,
    base_code: u32,
    owner: Team,
    players: &HashMap<EquipmentId, PlayerRecord>,
) -> ScoreDecision {
    let attacker = match players.get(&transmitter) {
        Some(attacker) if attacker.team == owner.opponent() => attacker,
        Some(attacker) => {
            warn!(
                equipment_id = transmitter,
                team = %attacker.team,
                "Player hit own base - no points awarded"
            );
            return ScoreDecision::default();
        }
        None => {
            warn!(
                equipment_id = transmitter,
                base = %owner,
                "Unknown transmitter hit base - no points awarded"
            );
            return ScoreDecision::default();
        }
    };

    info!(
        equipment_id = transmitter,
        base = %owner,
        "{} scored on the {} base",
        attacker.codename,
        owner
    );

    ScoreDecision {
        deltas: vec![(transmitter, BASE_SCORE)],
        base_hit: Some(transmitter),
        echo: EchoPlan::Single(base_code),
        ..Default::default()
    }
    .with_log(
        format!(
            "{} hit the {} base (+{} pts)",
            attacker.codename, owner, BASE_SCORE
        ),
        EventKind::BaseHit,
    )
}

fn resolve_player_hit(
    transmitter: EquipmentId,
    victim_id: EquipmentId,
    players: &HashMap<EquipmentId, PlayerRecord>,
) -> ScoreDecision {
    let attacker = players.get(&transmitter);
    let victim = players.get(&victim_id);

    let attacker_name = label(attacker, transmitter);
    let victim_name = label(victim, victim_id);

    let friendly = matches!((attacker, victim), (Some(a), Some(v)) if a.team == v.team);

    if friendly {
        warn!(
            attacker = transmitter,
            victim = victim_id,
            "FRIENDLY FIRE: {} hit teammate {}",
            attacker_name,
            victim_name
        );

        return ScoreDecision {
            deltas: vec![
                (transmitter, FRIENDLY_FIRE_PENALTY),
                (victim_id, FRIENDLY_FIRE_PENALTY),
            ],
            echo: EchoPlan::Paired {
                first: transmitter,
                second: victim_id,
            },
            ..Default::default()
        }
        .with_log(
            format!(
                "FRIENDLY FIRE! {} hit {} ({} pts each)",
                attacker_name, victim_name, FRIENDLY_FIRE_PENALTY
            ),
            EventKind::FriendlyFire,
        );
    }

    info!(
        attacker = transmitter,
        victim = victim_id,
        "Valid hit: {} hit {}",
        attacker_name,
        victim_name
    );

    let deltas = if attacker.is_some() {
        vec![(transmitter, HIT_POINTS)]
    } else {
        Vec::new()
    };

    ScoreDecision {
        deltas,
        echo: EchoPlan::Single(victim_id),
        ..Default::default()
    }
    .with_log(
        format!("{} hit {} (+{} pts)", attacker_name, victim_name, HIT_POINTS),
        EventKind::Hit,
    )
}

fn resolve_bare_code(code: u32) -> ScoreDecision {
    match base_owner(code) {
        Some(owner) => {
            info!(code, "{} base hit reported without attacker context", owner);
            ScoreDecision::default().with_log(
                format!("{} base (code {}) hit", owner, code),
                EventKind::Info,
            )
        }
        None => {
            debug!(code, "Ignoring bare code");
            ScoreDecision::default()
        }
    }
}

/// Codename, or `#<id>` for equipment that is not in the match
fn label(record: Option<&PlayerRecord>, id: EquipmentId) -> String {
    record
        .map(|r| r.codename.clone())
        .unwrap_or_else(|| format!("#{}", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> HashMap<EquipmentId, PlayerRecord> {
        let mut players = HashMap::new();
        for (id, name, team) in [
            (1, "Opus", Team::Green),
            (2, "Scooby", Team::Red),
            (3, "Vortex", Team::Green),
            (4, "Ghost", Team::Red),
        ] {
            players.insert(id, PlayerRecord::new(id, id + 100, name.to_string(), team));
        }
        players
    }

    fn hit(transmitter: u32, target: u32) -> HitMessage {
        HitMessage::Hit {
            transmitter,
            target,
        }
    }

    #[test]
    fn test_green_attacker_scores_on_red_base() {
        let decision = decide(&hit(1, RED_BASE), &roster());
        assert_eq!(decision.deltas, vec![(1, BASE_SCORE)]);
        assert_eq!(decision.base_hit, Some(1));
        assert_eq!(decision.echo, EchoPlan::Single(RED_BASE));
        assert_eq!(decision.log.unwrap().kind, EventKind::BaseHit);
    }

    #[test]
    fn test_red_attacker_on_red_base_does_nothing() {
        let decision = decide(&hit(2, RED_BASE), &roster());
        assert!(decision.is_empty());
    }

    #[test]
    fn test_green_base_is_symmetric() {
        let scored = decide(&hit(2, GREEN_BASE), &roster());
        assert_eq!(scored.deltas, vec![(2, BASE_SCORE)]);
        assert_eq!(scored.echo, EchoPlan::Single(GREEN_BASE));

        assert!(decide(&hit(3, GREEN_BASE), &roster()).is_empty());
    }

    #[test]
    fn test_unknown_transmitter_on_base_does_nothing() {
        assert!(decide(&hit(99, GREEN_BASE), &roster()).is_empty());
    }

    #[test]
    fn test_friendly_fire_penalizes_both_and_pairs_echo() {
        let decision = decide(&hit(2, 4), &roster());
        assert_eq!(
            decision.deltas,
            vec![(2, FRIENDLY_FIRE_PENALTY), (4, FRIENDLY_FIRE_PENALTY)]
        );
        assert_eq!(decision.echo, EchoPlan::Paired { first: 2, second: 4 });
        assert_eq!(decision.echo.codes(), vec![2, 4]);

        let log = decision.log.unwrap();
        assert_eq!(log.kind, EventKind::FriendlyFire);
        assert!(log.message.contains("Scooby"));
        assert!(log.message.contains("Ghost"));
    }

    #[test]
    fn test_valid_hit_rewards_attacker_only() {
        let decision = decide(&hit(2, 1), &roster());
        assert_eq!(decision.deltas, vec![(2, HIT_POINTS)]);
        assert_eq!(decision.base_hit, None);
        assert_eq!(decision.echo, EchoPlan::Single(1));
        assert_eq!(decision.log.unwrap().kind, EventKind::Hit);
    }

    #[test]
    fn test_unknown_victim_still_rewards_attacker() {
        let decision = decide(&hit(1, 77), &roster());
        assert_eq!(decision.deltas, vec![(1, HIT_POINTS)]);
        assert_eq!(decision.echo, EchoPlan::Single(77));
        assert!(decision.log.unwrap().message.contains("#77"));
    }

    #[test]
    fn test_unknown_attacker_is_labelled_and_not_scored() {
        let decision = decide(&hit(88, 1), &roster());
        assert!(decision.deltas.is_empty());
        assert_eq!(decision.echo, EchoPlan::Single(1));
        assert!(decision.log.unwrap().message.starts_with("#88"));
    }

    #[test]
    fn test_bare_base_code_logs_info_only() {
        let decision = decide(&HitMessage::Code(RED_BASE), &roster());
        assert!(decision.deltas.is_empty());
        assert_eq!(decision.echo, EchoPlan::None);
        assert_eq!(decision.log.unwrap().kind, EventKind::Info);

        assert!(decide(&HitMessage::Code(12), &roster()).is_empty());
    }

    #[test]
    fn test_hit_on_control_code_is_dropped() {
        for code in [MATCH_START, MATCH_END] {
            let decision = decide(&hit(4, code), &roster());
            assert!(decision.is_empty());
            assert_eq!(decision.echo, EchoPlan::None);
        }
    }

    #[test]
    fn test_at_most_two_echoes_and_one_log() {
        let players = roster();
        for transmitter in 0..6 {
            for target in [0, 1, 2, 3, 4, 5, GREEN_BASE, RED_BASE] {
                let decision = decide(&hit(transmitter, target), &players);
                assert!(decision.echo.codes().len() <= 2);
            }
        }
    }
}
