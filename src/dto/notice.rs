use indexmap::IndexMap;
use serde::Serialize;

use crate::{
    services::allocator::Shortfall,
    state::{
        game::{PhraseId, PhraseStatus, TeamId},
        state_machine::{TurnEndReason, TurnId},
    },
};

/// One-off message fanned out to the screens next to the snapshot stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// An action was refused; shown as a warning toast.
    Rejected {
        /// Text for the toast.
        message: String,
    },
    /// Fewer phrases than requested could be dealt.
    ShortAllocation {
        /// Requested against allocated counts.
        #[serde(flatten)]
        shortfall: Shortfall,
    },
    /// The first team of the game was announced.
    GameStarted {
        /// Round opened.
        round: u8,
        /// Team announced first.
        team_id: TeamId,
    },
    /// A turn started.
    TurnStarted {
        /// Turn identifier.
        turn: TurnId,
        /// Team playing.
        team_id: TeamId,
    },
    /// A phrase was found or skipped.
    PhraseResolved {
        /// Phrase resolved.
        phrase_id: PhraseId,
        /// Found or skipped.
        status: PhraseStatus,
        /// Team that played it.
        team_id: TeamId,
    },
    /// A turn ended.
    TurnEnded {
        /// Team whose turn ended.
        team_id: TeamId,
        /// Why it ended.
        reason: TurnEndReason,
        /// Team announced next, `None` when the round is over.
        next_team_id: Option<TeamId>,
    },
    /// The next round is ready.
    RoundCompleted {
        /// Round just completed.
        finished: u8,
        /// Round now played.
        next: u8,
        /// Instructions for the new round.
        instructions: &'static str,
    },
    /// The game is over.
    GameCompleted {
        /// Cumulative scores by team.
        final_scores: IndexMap<TeamId, u32>,
        /// Winning teams.
        leaders: Vec<TeamId>,
    },
    /// The game was left.
    Abandoned,
}
