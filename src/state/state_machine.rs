use indexmap::IndexMap;
use rand::{SeedableRng, rngs::StdRng};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    services::allocator::reshuffle,
    state::{
        game::{GamePhrase, GameState, PhraseId, PhraseStatus, RoundNumber, RoundState, TeamId},
        scheduler::{self, Slot},
    },
};

/// Monotonic identifier of an active turn, carried by timer ticks.
pub type TurnId = u64;

/// High-level phases the game can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// The phrase pool is ready but the game has not been started yet.
    NotStarted,
    /// Rounds are being played and the game can be in one of the turn sub-phases.
    Running(RunningPhase),
    /// The last round is complete and final scores are available.
    GameComplete,
    /// The players left the game before it finished.
    Abandoned,
}

/// Fine-grained phase while rounds are being played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunningPhase {
    /// Next team is shown and must confirm it is ready; the timer is full.
    AwaitingTeamReady,
    /// The turn is being played and the countdown is running.
    Active,
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// Leave the not-started screen and announce the first team.
    StartGame,
    /// The announced team is ready: start the countdown.
    StartTurn,
    /// The current phrase was guessed.
    MarkFound {
        /// Phrase the UI believes is current.
        phrase_id: PhraseId,
    },
    /// The current phrase was passed.
    MarkSkip {
        /// Phrase the UI believes is current.
        phrase_id: PhraseId,
    },
    /// One second elapsed in the turn the tick was armed for.
    TimerTick {
        /// Turn the tick belongs to.
        turn: TurnId,
    },
    /// End the current turn before the countdown expires.
    ForceEndTurn,
    /// Leave the game.
    Quit,
}

/// Why a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnEndReason {
    /// The countdown reached zero.
    TimerExpired,
    /// The players ended the turn themselves.
    Forced,
    /// The team has no phrase left to play in this round.
    TeamExhausted,
}

/// Observable consequence of an accepted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The game left the not-started phase.
    GameStarted {
        /// Round being opened.
        round: RoundNumber,
        /// Team announced first.
        team_id: TeamId,
    },
    /// A turn started and the countdown is running.
    TurnStarted {
        /// Identifier of the new turn.
        turn: TurnId,
        /// Team playing the turn.
        team_id: TeamId,
    },
    /// One second elapsed.
    Ticked {
        /// Seconds left after the tick.
        remaining_secs: u32,
    },
    /// A phrase was marked found or skipped.
    PhraseResolved {
        /// Resolved phrase.
        phrase_id: PhraseId,
        /// New status.
        status: PhraseStatus,
        /// Team that played it.
        team_id: TeamId,
    },
    /// The turn is over.
    TurnEnded {
        /// Team whose turn ended.
        team_id: TeamId,
        /// Why it ended.
        reason: TurnEndReason,
        /// Team announced next in the same round, `None` when the round is over.
        next_team_id: Option<TeamId>,
    },
    /// Every phrase of a round was resolved and the next round is ready.
    RoundCompleted {
        /// Round just completed.
        finished: RoundNumber,
        /// Round now being played.
        next: RoundNumber,
        /// Team announced first in the new round.
        next_team_id: TeamId,
    },
    /// The last round is complete.
    GameCompleted {
        /// Cumulative scores across all rounds.
        final_scores: IndexMap<TeamId, u32>,
    },
    /// The game was left before the end.
    Abandoned,
}

/// Result of an accepted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    /// Version of the state machine after the event.
    pub version: usize,
    /// Consequences of the event, in order.
    pub steps: Vec<Step>,
}

/// Benign refusal of an event. The state is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// The event is not valid in the current phase.
    #[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
    InvalidTransition {
        /// The phase the state machine was in when the event was received.
        from: GamePhase,
        /// The event that cannot be applied from this phase.
        event: GameEvent,
    },
    /// Found/skip targeted a phrase other than the current one.
    #[error("phrase {got} is not the active phrase (active: {expected:?})")]
    NotActivePhrase {
        /// Phrase currently played.
        expected: Option<PhraseId>,
        /// Phrase named by the event.
        got: PhraseId,
    },
    /// Found/skip targeted a phrase owned by another team.
    #[error("phrase {phrase_id} belongs to team {owner_team_id}, not to team {active_team_id}")]
    WrongTeam {
        /// Phrase named by the event.
        phrase_id: PhraseId,
        /// Owner of that phrase.
        owner_team_id: TeamId,
        /// Team currently playing.
        active_team_id: TeamId,
    },
    /// A timer tick armed for another turn.
    #[error("timer tick for turn {tick_turn} ignored (current turn {current_turn})")]
    StaleTick {
        /// Turn the tick was armed for.
        tick_turn: TurnId,
        /// Current turn.
        current_turn: TurnId,
    },
}

impl Rejection {
    /// Message suitable for a toast or an alert.
    pub fn notice(&self) -> String {
        match self {
            Rejection::InvalidTransition { .. } => "This action is not available right now.".into(),
            Rejection::NotActivePhrase { .. } => {
                "This phrase is no longer the one being played.".into()
            }
            Rejection::WrongTeam { .. } => {
                "This phrase belongs to another team. You cannot mark it.".into()
            }
            Rejection::StaleTick { .. } => "The timer of a previous turn was ignored.".into(),
        }
    }
}

/// State machine implementing the round and turn flow of a game.
///
/// It is the single writer of [`GameState`]: every mutation goes through
/// [`GameMachine::apply`].
#[derive(Debug, Clone)]
pub struct GameMachine {
    state: GameState,
    phase: GamePhase,
    version: usize,
    turn: TurnId,
    rng: StdRng,
}

impl GameMachine {
    /// Create a machine in the not-started phase, reshuffling later rounds
    /// from an OS-seeded generator.
    pub fn new(state: GameState) -> Self {
        Self::with_rng(state, StdRng::from_rng(&mut rand::rng()))
    }

    /// Create a machine using `rng` for the between-round reshuffles.
    pub fn with_rng(state: GameState, rng: StdRng) -> Self {
        Self {
            state,
            phase: GamePhase::NotStarted,
            version: 0,
            turn: 0,
            rng,
        }
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Read-only access to the game state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Number of accepted events so far.
    pub fn version(&self) -> usize {
        self.version
    }

    /// Identifier of the latest turn (0 before the first turn).
    pub fn turn(&self) -> TurnId {
        self.turn
    }

    /// Turn whose countdown must be running, if any.
    pub fn armed_turn(&self) -> Option<TurnId> {
        match self.phase {
            GamePhase::Running(RunningPhase::Active) => Some(self.turn),
            _ => None,
        }
    }

    /// Whether the game reached a terminal phase.
    pub fn is_over(&self) -> bool {
        matches!(self.phase, GamePhase::GameComplete | GamePhase::Abandoned)
    }

    /// Apply `event`, returning the steps it produced or why it was refused.
    pub fn apply(&mut self, event: GameEvent) -> Result<Applied, Rejection> {
        let steps = match (self.phase, &event) {
            (_, GameEvent::TimerTick { turn }) if *turn != self.turn => {
                return Err(Rejection::StaleTick {
                    tick_turn: *turn,
                    current_turn: self.turn,
                });
            }
            (GamePhase::NotStarted, GameEvent::StartGame) => self.start_game(),
            (GamePhase::Running(RunningPhase::AwaitingTeamReady), GameEvent::StartTurn) => {
                self.start_turn()
            }
            (GamePhase::Running(RunningPhase::Active), GameEvent::MarkFound { phrase_id }) => {
                self.resolve(*phrase_id, PhraseStatus::Found)?
            }
            (GamePhase::Running(RunningPhase::Active), GameEvent::MarkSkip { phrase_id }) => {
                self.resolve(*phrase_id, PhraseStatus::Skipped)?
            }
            (GamePhase::Running(RunningPhase::Active), GameEvent::TimerTick { .. }) => self.tick(),
            (GamePhase::Running(RunningPhase::Active), GameEvent::ForceEndTurn) => {
                let mut steps = Vec::new();
                self.end_turn(TurnEndReason::Forced, &mut steps);
                steps
            }
            (GamePhase::NotStarted | GamePhase::Running(_), GameEvent::Quit) => {
                self.state.round.is_running = false;
                self.phase = GamePhase::Abandoned;
                info!(game_id = %self.state.id, "game abandoned");
                vec![Step::Abandoned]
            }
            (from, event) => {
                return Err(Rejection::InvalidTransition {
                    from,
                    event: event.clone(),
                });
            }
        };

        self.version += 1;
        Ok(Applied {
            version: self.version,
            steps,
        })
    }

    fn start_game(&mut self) -> Vec<Step> {
        let round = self.state.current_round;
        self.state.has_started = true;
        self.state.ledger.begin_round(round);

        let mut steps = Vec::new();
        match scheduler::playable_from(
            &self.state.round.phrase_pool,
            &self.state.teams,
            0,
            self.state.settings.policy,
        ) {
            Some(slot) => {
                self.announce(slot);
                let team_id = self.active_team_id();
                info!(game_id = %self.state.id, round = round.number(), team_id, "game started");
                steps.push(Step::GameStarted { round, team_id });
            }
            None => self.complete_round(&mut steps),
        }
        steps
    }

    fn start_turn(&mut self) -> Vec<Step> {
        self.turn += 1;
        self.state.round.is_running = true;
        self.phase = GamePhase::Running(RunningPhase::Active);
        let team_id = self.active_team_id();
        debug!(turn = self.turn, team_id, "turn started");
        vec![Step::TurnStarted {
            turn: self.turn,
            team_id,
        }]
    }

    fn tick(&mut self) -> Vec<Step> {
        let round = &mut self.state.round;
        round.time_remaining_secs = round.time_remaining_secs.saturating_sub(1);
        let remaining_secs = round.time_remaining_secs;

        let mut steps = vec![Step::Ticked { remaining_secs }];
        if remaining_secs == 0 {
            self.end_turn(TurnEndReason::TimerExpired, &mut steps);
        }
        steps
    }

    fn resolve(&mut self, phrase_id: PhraseId, status: PhraseStatus) -> Result<Vec<Step>, Rejection> {
        let policy = self.state.settings.policy;
        let team_id = self.active_team_id();
        let round_number = self.state.current_round;

        let Some(index) = self.state.round.active_phrase_index else {
            return Err(Rejection::NotActivePhrase {
                expected: None,
                got: phrase_id,
            });
        };
        let current = &self.state.round.phrase_pool[index];
        if current.phrase_id != phrase_id {
            return Err(Rejection::NotActivePhrase {
                expected: Some(current.phrase_id),
                got: phrase_id,
            });
        }
        if policy.enforces_ownership() && current.owner_team_id != team_id {
            return Err(Rejection::WrongTeam {
                phrase_id,
                owner_team_id: current.owner_team_id,
                active_team_id: team_id,
            });
        }

        self.state.round.phrase_pool[index].status = status;
        if status == PhraseStatus::Found {
            self.state.ledger.record_found(team_id, round_number);
        }

        let mut steps = vec![Step::PhraseResolved {
            phrase_id,
            status,
            team_id,
        }];

        match scheduler::next_phrase_in_turn(&self.state.round.phrase_pool, team_id, policy) {
            Some(next) => self.state.round.active_phrase_index = Some(next),
            None => self.end_turn(TurnEndReason::TeamExhausted, &mut steps),
        }
        Ok(steps)
    }

    fn end_turn(&mut self, reason: TurnEndReason, steps: &mut Vec<Step>) {
        let team_id = self.active_team_id();
        self.state.round.is_running = false;

        let next = scheduler::next_playable(
            &self.state.round.phrase_pool,
            &self.state.teams,
            self.state.round.active_team_index,
            self.state.settings.policy,
        );

        match next {
            Some(slot) => {
                self.announce(slot);
                let next_team_id = self.active_team_id();
                debug!(team_id, ?reason, next_team_id, "turn ended");
                steps.push(Step::TurnEnded {
                    team_id,
                    reason,
                    next_team_id: Some(next_team_id),
                });
            }
            None => {
                debug!(team_id, ?reason, "turn ended with the round");
                steps.push(Step::TurnEnded {
                    team_id,
                    reason,
                    next_team_id: None,
                });
                self.complete_round(steps);
            }
        }
    }

    fn complete_round(&mut self, steps: &mut Vec<Step>) {
        let finished = self.state.current_round;
        let round = &mut self.state.round;
        round.is_running = false;
        round.active_phrase_index = None;
        round.completed = true;

        let Some(next) = finished.next() else {
            self.state.has_finished = true;
            self.phase = GamePhase::GameComplete;
            let final_scores = self.state.ledger.cumulative_scores();
            info!(game_id = %self.state.id, ?final_scores, "game complete");
            steps.push(Step::GameCompleted { final_scores });
            return;
        };

        let pool = reshuffle(&self.state.round.phrase_pool, &mut self.rng);
        let start = (self.state.round.active_team_index + 1) % self.state.teams.len().max(1);
        let next_round = RoundState::new(pool, self.state.settings.round_duration_secs);
        let previous = std::mem::replace(&mut self.state.round, next_round);
        self.state.finished_rounds.insert(finished, previous);
        self.state.current_round = next;
        self.state.ledger.begin_round(next);

        let slot = scheduler::playable_from(
            &self.state.round.phrase_pool,
            &self.state.teams,
            start,
            self.state.settings.policy,
        );
        match slot {
            Some(slot) => {
                self.announce(slot);
                let next_team_id = self.active_team_id();
                info!(
                    game_id = %self.state.id,
                    finished = finished.number(),
                    next = next.number(),
                    next_team_id,
                    "round complete"
                );
                steps.push(Step::RoundCompleted {
                    finished,
                    next,
                    next_team_id,
                });
            }
            // Only reachable with an empty pool, which setup refuses.
            None => self.complete_round(steps),
        }
    }

    /// Hand the next turn to `slot` and wait for the team to be ready.
    fn announce(&mut self, slot: Slot) {
        let duration = self.state.settings.round_duration_secs;
        let round = &mut self.state.round;
        round.active_team_index = slot.team_index;
        round.active_phrase_index = Some(slot.phrase_index);
        round.time_remaining_secs = duration;
        round.is_running = false;
        self.phase = GamePhase::Running(RunningPhase::AwaitingTeamReady);
    }

    fn active_team_id(&self) -> TeamId {
        self.state.active_team().map(|team| team.id).unwrap_or_default()
    }

    /// Phrase currently played, only exposed while the countdown runs.
    pub fn current_phrase(&self) -> Option<&GamePhrase> {
        match self.phase {
            GamePhase::Running(RunningPhase::Active) => self.state.round.current_phrase(),
            _ => None,
        }
    }
}
