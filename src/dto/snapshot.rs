use serde::Serialize;
use uuid::Uuid;

use crate::{
    dto::{format_clock, phase::VisibleGamePhase},
    services::allocator::Shortfall,
    state::{
        game::{PhraseId, Team, TeamId},
        state_machine::{GameMachine, GamePhase, TurnId},
    },
};

/// Team currently playing or announced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamSnapshot {
    pub id: TeamId,
    pub color: String,
    pub name: &'static str,
}

impl From<&Team> for TeamSnapshot {
    fn from(team: &Team) -> Self {
        Self {
            id: team.id,
            color: team.color.clone(),
            name: team.display_name(),
        }
    }
}

/// Score line of a team for the scoreboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamScoreSnapshot {
    pub team: TeamSnapshot,
    /// Phrases found in the current round.
    pub round_score: u32,
    /// Phrases found since the start of the game.
    pub total_score: u32,
}

/// Read-only view of a game, published after every accepted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameSnapshot {
    pub game_id: Uuid,
    /// Number of accepted events; increases with every published snapshot.
    pub version: usize,
    pub turn: TurnId,
    pub phase: VisibleGamePhase,
    pub round: u8,
    pub round_label: &'static str,
    pub instructions: &'static str,
    pub current_team: Option<TeamSnapshot>,
    /// Only set while the countdown runs so the phrase is never shown early.
    pub current_phrase: Option<String>,
    pub current_phrase_id: Option<PhraseId>,
    pub time_remaining_secs: u32,
    /// `time_remaining_secs` rendered as `mm:ss`.
    pub clock: String,
    pub scores: Vec<TeamScoreSnapshot>,
    pub pending_phrases: usize,
    pub found_phrases: usize,
    pub total_phrases: usize,
    pub completed_rounds: Vec<u8>,
    pub game_complete: bool,
    /// Winning teams once the game is complete; several on a tie.
    pub leaders: Vec<TeamId>,
    /// Set when fewer phrases than requested could be allocated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortfall: Option<Shortfall>,
}

impl GameSnapshot {
    /// Capture the state of `machine`, carrying the allocation shortfall of the game.
    pub fn capture(machine: &GameMachine, shortfall: Option<Shortfall>) -> Self {
        let state = machine.state();
        let phase = machine.phase();
        let round = &state.round;
        let round_scores = state.round_scores();
        let cumulative = state.ledger.cumulative_scores();
        let current_phrase = machine.current_phrase();
        let game_complete = phase == GamePhase::GameComplete;

        let scores = state
            .teams
            .iter()
            .map(|team| TeamScoreSnapshot {
                team: team.into(),
                round_score: round_scores.get(&team.id).copied().unwrap_or_default(),
                total_score: cumulative.get(&team.id).copied().unwrap_or_default(),
            })
            .collect();

        let current_team = match phase {
            GamePhase::Running(_) => state.active_team().map(TeamSnapshot::from),
            _ => None,
        };

        Self {
            game_id: state.id,
            version: machine.version(),
            turn: machine.turn(),
            phase: phase.into(),
            round: state.current_round.number(),
            round_label: state.current_round.label(),
            instructions: state.current_round.instructions(),
            current_team,
            current_phrase: current_phrase.map(|phrase| phrase.text.clone()),
            current_phrase_id: current_phrase.map(|phrase| phrase.phrase_id),
            time_remaining_secs: round.time_remaining_secs,
            clock: format_clock(round.time_remaining_secs),
            scores,
            pending_phrases: round.pending_count(),
            found_phrases: round.found_count(),
            total_phrases: round.phrase_pool.len(),
            completed_rounds: state
                .finished_rounds
                .keys()
                .map(|number| number.number())
                .chain(round.completed.then(|| state.current_round.number()))
                .collect(),
            game_complete,
            leaders: if game_complete {
                state.ledger.leaders()
            } else {
                Vec::new()
            },
            shortfall,
        }
    }

    /// Score line of `team_id`.
    pub fn score_of(&self, team_id: TeamId) -> Option<&TeamScoreSnapshot> {
        self.scores.iter().find(|line| line.team.id == team_id)
    }
}

impl From<&GameMachine> for GameSnapshot {
    fn from(machine: &GameMachine) -> Self {
        Self::capture(machine, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        game::{AllocationPolicy, GamePhrase, GameSettings, GameState, PhraseStatus, Player},
        state_machine::GameEvent,
    };

    fn machine() -> GameMachine {
        let teams = vec![
            Team {
                id: 1,
                color: "#e53935".into(),
                players: vec![Player {
                    id: 1,
                    name: "Ana".into(),
                }],
            },
            Team {
                id: 2,
                color: "#1e88e5".into(),
                players: vec![Player {
                    id: 2,
                    name: "Ben".into(),
                }],
            },
        ];
        let pool = (1..=4)
            .map(|id| GamePhrase {
                phrase_id: id,
                text: format!("phrase {id}"),
                status: PhraseStatus::Pending,
                owner_team_id: if id % 2 == 1 { 1 } else { 2 },
            })
            .collect();
        let settings = GameSettings {
            category_ids: vec![1],
            phrases_per_team: 2,
            round_duration_secs: 90,
            policy: AllocationPolicy::SharedPool,
        };
        GameMachine::new(GameState::new(settings, teams, pool))
    }

    #[test]
    fn phrase_is_hidden_until_the_turn_starts() {
        let mut machine = machine();
        machine.apply(GameEvent::StartGame).unwrap();

        let announced = GameSnapshot::from(&machine);
        assert_eq!(announced.phase, VisibleGamePhase::AwaitingTeamReady);
        assert_eq!(announced.current_team.as_ref().map(|t| t.name), Some("Red"));
        assert_eq!(announced.current_phrase, None);
        assert_eq!(announced.clock, "01:30");

        machine.apply(GameEvent::StartTurn).unwrap();
        let active = GameSnapshot::from(&machine);
        assert_eq!(active.phase, VisibleGamePhase::Active);
        assert_eq!(active.current_phrase.as_deref(), Some("phrase 1"));
        assert_eq!(active.current_phrase_id, Some(1));
        assert_eq!(active.version, 2);
    }

    #[test]
    fn scores_follow_found_phrases() {
        let mut machine = machine();
        machine.apply(GameEvent::StartGame).unwrap();
        machine.apply(GameEvent::StartTurn).unwrap();
        machine.apply(GameEvent::MarkFound { phrase_id: 1 }).unwrap();

        let snapshot = GameSnapshot::from(&machine);
        let red = snapshot.score_of(1).unwrap();
        assert_eq!((red.round_score, red.total_score), (1, 1));
        assert_eq!(snapshot.score_of(2).unwrap().total_score, 0);
        assert_eq!(snapshot.found_phrases, 1);
        assert_eq!(snapshot.pending_phrases, 3);
        assert_eq!(snapshot.total_phrases, 4);
        assert!(snapshot.leaders.is_empty());
    }

    #[test]
    fn snapshot_serializes_phase_in_snake_case() {
        let snapshot = GameSnapshot::from(&machine());
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["phase"], "not_started");
        assert_eq!(json["round"], 1);
        assert!(json.get("shortfall").is_none());
    }
}
