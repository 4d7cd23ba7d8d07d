use serde::Serialize;

use crate::state::state_machine::{GamePhase, RunningPhase};

/// Game phase exposed to the screens.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleGamePhase {
    /// Pool ready, game not started.
    NotStarted,
    /// Next team announced, waiting for it to be ready.
    AwaitingTeamReady,
    /// Countdown running.
    Active,
    /// Final scores.
    GameComplete,
    /// Game left.
    Abandoned,
}

impl From<GamePhase> for VisibleGamePhase {
    fn from(value: GamePhase) -> Self {
        match value {
            GamePhase::NotStarted => VisibleGamePhase::NotStarted,
            GamePhase::Running(RunningPhase::AwaitingTeamReady) => {
                VisibleGamePhase::AwaitingTeamReady
            }
            GamePhase::Running(RunningPhase::Active) => VisibleGamePhase::Active,
            GamePhase::GameComplete => VisibleGamePhase::GameComplete,
            GamePhase::Abandoned => VisibleGamePhase::Abandoned,
        }
    }
}
