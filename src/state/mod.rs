//! Domain state of a game and the pure logic driving it.

pub mod game;
pub mod scheduler;
pub mod scores;
pub mod state_machine;

pub use self::scores::ScoreLedger;
pub use self::state_machine::{
    Applied, GameEvent, GameMachine, GamePhase, Rejection, RunningPhase, Step, TurnEndReason,
    TurnId,
};
