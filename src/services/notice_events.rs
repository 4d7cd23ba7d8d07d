use tokio::sync::broadcast;
use tracing::debug;

use crate::{
    dto::notice::Notice,
    services::allocator::Shortfall,
    state::{
        game::GameState,
        state_machine::{Rejection, Step},
    },
};

/// Broadcast hub fanning notices out to every subscribed screen.
#[derive(Debug, Clone)]
pub struct NoticeHub {
    sender: broadcast::Sender<Notice>,
}

impl NoticeHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent notices.
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.sender.subscribe()
    }

    /// Send a notice to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, notice: Notice) {
        if self.sender.send(notice).is_err() {
            debug!("notice dropped: no subscriber");
        }
    }
}

/// Broadcast the notices produced by the steps of an accepted event.
pub fn broadcast_steps(hub: &NoticeHub, steps: &[Step], state: &GameState) {
    for notice in steps.iter().filter_map(|step| notice_for_step(step, state)) {
        hub.broadcast(notice);
    }
}

/// Broadcast a refused action as a warning toast.
pub fn broadcast_rejection(hub: &NoticeHub, rejection: &Rejection) {
    hub.broadcast(Notice::Rejected {
        message: rejection.notice(),
    });
}

/// Broadcast that the game plays with fewer phrases than requested.
pub fn broadcast_shortfall(hub: &NoticeHub, shortfall: Shortfall) {
    hub.broadcast(Notice::ShortAllocation { shortfall });
}

/// Notice announcing `step`, if it deserves one. Ticks only update snapshots.
pub fn notice_for_step(step: &Step, state: &GameState) -> Option<Notice> {
    let notice = match step {
        Step::GameStarted { round, team_id } => Notice::GameStarted {
            round: round.number(),
            team_id: *team_id,
        },
        Step::TurnStarted { turn, team_id } => Notice::TurnStarted {
            turn: *turn,
            team_id: *team_id,
        },
        Step::Ticked { .. } => return None,
        Step::PhraseResolved {
            phrase_id,
            status,
            team_id,
        } => Notice::PhraseResolved {
            phrase_id: *phrase_id,
            status: *status,
            team_id: *team_id,
        },
        Step::TurnEnded {
            team_id,
            reason,
            next_team_id,
        } => Notice::TurnEnded {
            team_id: *team_id,
            reason: *reason,
            next_team_id: *next_team_id,
        },
        Step::RoundCompleted { finished, next, .. } => Notice::RoundCompleted {
            finished: finished.number(),
            next: next.number(),
            instructions: next.instructions(),
        },
        Step::GameCompleted { final_scores } => Notice::GameCompleted {
            final_scores: final_scores.clone(),
            leaders: state.ledger.leaders(),
        },
        Step::Abandoned => Notice::Abandoned,
    };
    Some(notice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        game::{AllocationPolicy, GameSettings, RoundNumber, Team},
        state_machine::TurnEndReason,
    };

    fn state() -> GameState {
        let settings = GameSettings {
            category_ids: vec![1],
            phrases_per_team: 1,
            round_duration_secs: 30,
            policy: AllocationPolicy::SharedPool,
        };
        let teams = vec![
            Team {
                id: 1,
                color: "#e53935".into(),
                players: Vec::new(),
            },
            Team {
                id: 2,
                color: "#1e88e5".into(),
                players: Vec::new(),
            },
        ];
        GameState::new(settings, teams, Vec::new())
    }

    #[test]
    fn ticks_do_not_produce_notices() {
        assert_eq!(
            notice_for_step(&Step::Ticked { remaining_secs: 3 }, &state()),
            None
        );
    }

    #[test]
    fn round_completion_carries_next_instructions() {
        let step = Step::RoundCompleted {
            finished: RoundNumber::Description,
            next: RoundNumber::OneWord,
            next_team_id: 2,
        };
        let Some(Notice::RoundCompleted {
            finished,
            next,
            instructions,
        }) = notice_for_step(&step, &state())
        else {
            panic!("expected a round notice");
        };
        assert_eq!((finished, next), (1, 2));
        assert_eq!(instructions, RoundNumber::OneWord.instructions());
    }

    #[tokio::test]
    async fn subscribers_receive_step_notices_in_order() {
        let hub = NoticeHub::new(8);
        let mut rx = hub.subscribe();
        let steps = vec![
            Step::Ticked { remaining_secs: 0 },
            Step::TurnEnded {
                team_id: 1,
                reason: TurnEndReason::TimerExpired,
                next_team_id: Some(2),
            },
            Step::Abandoned,
        ];

        broadcast_steps(&hub, &steps, &state());

        assert!(matches!(
            rx.recv().await.unwrap(),
            Notice::TurnEnded {
                reason: TurnEndReason::TimerExpired,
                ..
            }
        ));
        assert_eq!(rx.recv().await.unwrap(), Notice::Abandoned);
    }
}
