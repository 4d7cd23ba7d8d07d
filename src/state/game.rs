use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    dao::models::{CategoryEntity, PhraseEntity, PlayerEntity, TeamEntity},
    state::scores::ScoreLedger,
};

/// Identifier of a phrase row in persistence.
pub type PhraseId = i64;
/// Identifier of a category row in persistence.
pub type CategoryId = i64;
/// Identifier of a team row in persistence.
pub type TeamId = i64;
/// Identifier of a player row in persistence.
pub type PlayerId = i64;

/// Phrase category selectable before a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Stable identifier for the category.
    pub id: CategoryId,
    /// Human readable category name.
    pub name: String,
}

/// Immutable phrase content owned by persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrase {
    /// Stable identifier for the phrase.
    pub id: PhraseId,
    /// Text the describing player has to make their teammate guess.
    pub text: String,
    /// Category the phrase belongs to.
    pub category_id: CategoryId,
}

/// Player registered in a team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Stable identifier for the player.
    pub id: PlayerId,
    /// Display name chosen for the player.
    pub name: String,
}

/// Team taking part in a game, immutable for the whole game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    /// Stable identifier for the team.
    pub id: TeamId,
    /// Colour token used both for display and to derive the team name.
    pub color: String,
    /// Players registered in the team.
    pub players: Vec<Player>,
}

impl Team {
    /// Name shown to players, derived from the team colour.
    pub fn display_name(&self) -> &'static str {
        team_name_for_color(&self.color)
    }

    /// A team can only be selected for a game once it has players.
    pub fn is_eligible(&self) -> bool {
        !self.players.is_empty()
    }
}

/// Map a colour token of the team palette to its display name.
pub fn team_name_for_color(color: &str) -> &'static str {
    match color.trim().to_ascii_lowercase().as_str() {
        "#e53935" => "Red",
        "#1e88e5" => "Blue",
        "#43a047" => "Green",
        "#fdd835" => "Yellow",
        _ => "Unknown",
    }
}

/// Rule deciding whether phrases belong to a single team or to everyone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationPolicy {
    /// Each team only plays the phrases allocated to it.
    UniqueByTeam,
    /// Any team may resolve any pending phrase; turn order is pure round-robin.
    #[default]
    SharedPool,
}

impl AllocationPolicy {
    /// Whether found/skip must check the phrase owner.
    pub fn enforces_ownership(self) -> bool {
        matches!(self, AllocationPolicy::UniqueByTeam)
    }
}

/// Lifecycle of a phrase within one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhraseStatus {
    /// Not resolved yet in this round.
    Pending,
    /// Guessed by the team that played it.
    Found,
    /// Passed by the team that played it.
    Skipped,
}

/// Per-round play state wrapping a phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GamePhrase {
    /// Identifier of the underlying phrase.
    pub phrase_id: PhraseId,
    /// Copy of the phrase text.
    pub text: String,
    /// Status within the current round.
    pub status: PhraseStatus,
    /// Team the phrase was allocated to. Only enforced under
    /// [`AllocationPolicy::UniqueByTeam`].
    pub owner_team_id: TeamId,
}

impl GamePhrase {
    /// Wrap a phrase as pending for the given owner.
    pub fn pending(phrase: &Phrase, owner_team_id: TeamId) -> Self {
        Self {
            phrase_id: phrase.id,
            text: phrase.text.clone(),
            status: PhraseStatus::Pending,
            owner_team_id,
        }
    }

    /// Whether the phrase still has to be played this round.
    pub fn is_pending(&self) -> bool {
        self.status == PhraseStatus::Pending
    }
}

/// The three fixed rounds of a game, each replaying the same phrases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundNumber {
    /// Free description without saying the words of the phrase.
    Description = 1,
    /// A single word, repeated as often as needed.
    OneWord = 2,
    /// Mime without speaking.
    Mime = 3,
}

impl RoundNumber {
    /// Rounds in play order.
    pub const ALL: [RoundNumber; 3] = [
        RoundNumber::Description,
        RoundNumber::OneWord,
        RoundNumber::Mime,
    ];

    /// Numeric value (1, 2 or 3).
    pub fn number(self) -> u8 {
        self as u8
    }

    /// Following round, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            RoundNumber::Description => Some(RoundNumber::OneWord),
            RoundNumber::OneWord => Some(RoundNumber::Mime),
            RoundNumber::Mime => None,
        }
    }

    /// Whether completing this round ends the game.
    pub fn is_last(self) -> bool {
        self.next().is_none()
    }

    /// Short label of the clue mode.
    pub fn label(self) -> &'static str {
        match self {
            RoundNumber::Description => "Description",
            RoundNumber::OneWord => "One word",
            RoundNumber::Mime => "Mime",
        }
    }

    /// Rules read to the players before the round starts.
    pub fn instructions(self) -> &'static str {
        match self {
            RoundNumber::Description => {
                "Round 1: DESCRIPTION. Use as many words as you like to make your team guess \
                 the phrase, without saying any word of the phrase."
            }
            RoundNumber::OneWord => {
                "Round 2: ONE WORD. Use a single word to make your team guess the phrase. \
                 You may repeat that word as often as needed."
            }
            RoundNumber::Mime => "Round 3: MIME. Mime the phrase without speaking.",
        }
    }
}

/// Settings fixed for the whole game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSettings {
    /// Categories the phrases were drawn from.
    pub category_ids: Vec<CategoryId>,
    /// Requested number of phrases per team.
    pub phrases_per_team: u32,
    /// Length of a turn in seconds.
    pub round_duration_secs: u32,
    /// Phrase ownership rule.
    pub policy: AllocationPolicy,
}

/// Play state of one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundState {
    /// Index into the game's team list of the team playing (or about to play).
    pub active_team_index: usize,
    /// Index into [`RoundState::phrase_pool`] of the phrase being played.
    /// `None` once no pending phrase is left.
    pub active_phrase_index: Option<usize>,
    /// Phrases of the round in play order.
    pub phrase_pool: Vec<GamePhrase>,
    /// Seconds left in the current turn.
    pub time_remaining_secs: u32,
    /// Whether the countdown is running.
    pub is_running: bool,
    /// Set once every phrase of the round has been resolved.
    pub completed: bool,
}

impl RoundState {
    /// Fresh round state with every phrase pending and the timer full.
    pub fn new(phrase_pool: Vec<GamePhrase>, round_duration_secs: u32) -> Self {
        Self {
            active_team_index: 0,
            active_phrase_index: None,
            phrase_pool,
            time_remaining_secs: round_duration_secs,
            is_running: false,
            completed: false,
        }
    }

    /// Phrase currently offered to the active team.
    pub fn current_phrase(&self) -> Option<&GamePhrase> {
        self.active_phrase_index
            .and_then(|index| self.phrase_pool.get(index))
    }

    /// Number of phrases still pending.
    pub fn pending_count(&self) -> usize {
        self.phrase_pool.iter().filter(|p| p.is_pending()).count()
    }

    /// Number of phrases found this round.
    pub fn found_count(&self) -> usize {
        self.phrase_pool
            .iter()
            .filter(|p| p.status == PhraseStatus::Found)
            .count()
    }

    /// Phrase identifiers of the pool, in pool order.
    pub fn phrase_ids(&self) -> Vec<PhraseId> {
        self.phrase_pool.iter().map(|p| p.phrase_id).collect()
    }
}

/// Aggregated state of a game, exclusively owned by the state machine.
#[derive(Debug, Clone)]
pub struct GameState {
    /// Identifier of this game.
    pub id: Uuid,
    /// Settings chosen at setup.
    pub settings: GameSettings,
    /// Participating teams in turn order.
    pub teams: Vec<Team>,
    /// Round being played.
    pub current_round: RoundNumber,
    /// State of the round being played.
    pub round: RoundState,
    /// Final state of the rounds already completed.
    pub finished_rounds: IndexMap<RoundNumber, RoundState>,
    /// Per-round score tallies.
    pub ledger: ScoreLedger,
    /// Set once the first turn has been announced.
    pub has_started: bool,
    /// Set once the last round is complete.
    pub has_finished: bool,
}

impl GameState {
    /// Build the state of a game whose first round plays `pool`.
    pub fn new(settings: GameSettings, teams: Vec<Team>, pool: Vec<GamePhrase>) -> Self {
        let round = RoundState::new(pool, settings.round_duration_secs);
        let ledger = ScoreLedger::new(teams.iter().map(|team| team.id));

        Self {
            id: Uuid::new_v4(),
            settings,
            teams,
            current_round: RoundNumber::Description,
            round,
            finished_rounds: IndexMap::new(),
            ledger,
            has_started: false,
            has_finished: false,
        }
    }

    /// State of any round reached so far.
    pub fn round_state(&self, number: RoundNumber) -> Option<&RoundState> {
        if number == self.current_round {
            Some(&self.round)
        } else {
            self.finished_rounds.get(&number)
        }
    }

    /// Team playing (or about to play) the current turn.
    pub fn active_team(&self) -> Option<&Team> {
        self.teams.get(self.round.active_team_index)
    }

    /// Scores of the current round keyed by team.
    pub fn round_scores(&self) -> IndexMap<TeamId, u32> {
        self.ledger.scores_for(self.current_round)
    }
}

impl From<CategoryEntity> for Category {
    fn from(value: CategoryEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
        }
    }
}

impl From<PhraseEntity> for Phrase {
    fn from(value: PhraseEntity) -> Self {
        Self {
            id: value.id,
            text: value.text,
            category_id: value.category_id,
        }
    }
}

impl From<PlayerEntity> for Player {
    fn from(value: PlayerEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
        }
    }
}

impl From<TeamEntity> for Team {
    fn from(value: TeamEntity) -> Self {
        Self {
            id: value.id,
            color: value.color,
            players: value.players.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_advance_in_order_and_stop_after_mime() {
        assert_eq!(RoundNumber::Description.next(), Some(RoundNumber::OneWord));
        assert_eq!(RoundNumber::OneWord.next(), Some(RoundNumber::Mime));
        assert_eq!(RoundNumber::Mime.next(), None);
        assert!(RoundNumber::Mime.is_last());
        assert_eq!(RoundNumber::OneWord.number(), 2);
    }

    #[test]
    fn team_names_follow_palette() {
        assert_eq!(team_name_for_color("#E53935"), "Red");
        assert_eq!(team_name_for_color("#1e88e5"), "Blue");
        assert_eq!(team_name_for_color("#123456"), "Unknown");
    }

    #[test]
    fn team_without_players_is_not_eligible() {
        let team = Team {
            id: 1,
            color: "#43a047".into(),
            players: Vec::new(),
        };
        assert!(!team.is_eligible());
    }
}
