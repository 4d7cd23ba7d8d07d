//! Single-writer game session.
//!
//! One task owns the [`GameMachine`]. UI commands and timer ticks are queued
//! into that task and applied one at a time, so a tick and a tap can never
//! interleave inside a transition.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dto::{notice::Notice, snapshot::GameSnapshot},
    error::SessionError,
    services::{
        allocator::Shortfall,
        game_service::PreparedGame,
        notice_events::{NoticeHub, broadcast_rejection, broadcast_shortfall, broadcast_steps},
        timer::TurnTimer,
    },
    state::{
        game::PhraseId,
        state_machine::{Applied, GameEvent, GameMachine, GamePhase, Rejection, Step, TurnId},
    },
};

/// Ticks waiting to be applied. A few suffice: the task drains them as fast
/// as they arrive.
const TICK_BUFFER: usize = 4;

struct Command {
    event: GameEvent,
    reply: oneshot::Sender<Result<Applied, Rejection>>,
}

/// Cloneable handle to a running game session.
///
/// Dropping every handle tears the session down and disarms its timer.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    game_id: Uuid,
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<GameSnapshot>,
    notices: NoticeHub,
}

impl SessionHandle {
    /// Identifier of the game played by this session.
    pub fn game_id(&self) -> Uuid {
        self.game_id
    }

    /// Queue `event` and wait for the state machine's answer.
    pub async fn dispatch(&self, event: GameEvent) -> Result<Applied, SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command { event, reply })
            .await
            .map_err(|_| SessionError::Closed)?;
        let outcome = response.await.map_err(|_| SessionError::Closed)?;
        Ok(outcome?)
    }

    /// Leave the not-started screen and announce the first team.
    pub async fn start_game(&self) -> Result<Applied, SessionError> {
        self.dispatch(GameEvent::StartGame).await
    }

    /// The announced team is ready: start the countdown.
    pub async fn start_turn(&self) -> Result<Applied, SessionError> {
        self.dispatch(GameEvent::StartTurn).await
    }

    /// Mark `phrase_id` as guessed.
    pub async fn mark_found(&self, phrase_id: PhraseId) -> Result<Applied, SessionError> {
        self.dispatch(GameEvent::MarkFound { phrase_id }).await
    }

    /// Pass on `phrase_id`.
    pub async fn mark_skip(&self, phrase_id: PhraseId) -> Result<Applied, SessionError> {
        self.dispatch(GameEvent::MarkSkip { phrase_id }).await
    }

    /// End the current turn now.
    pub async fn force_end_turn(&self) -> Result<Applied, SessionError> {
        self.dispatch(GameEvent::ForceEndTurn).await
    }

    /// Leave the game and stop the session. Leaving the final summary is
    /// accepted as well.
    pub async fn quit(&self) -> Result<(), SessionError> {
        match self.dispatch(GameEvent::Quit).await {
            Ok(_)
            | Err(SessionError::Rejected(Rejection::InvalidTransition {
                from: GamePhase::GameComplete,
                ..
            })) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> GameSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified after every accepted event.
    pub fn watch_snapshots(&self) -> watch::Receiver<GameSnapshot> {
        self.snapshots.clone()
    }

    /// Subscribe to the notices of this session.
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Wait until the session task has stopped.
    pub async fn closed(&self) {
        self.commands.closed().await;
    }

    /// Whether the session task has stopped.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

/// Task state of a running session.
pub struct GameSession {
    machine: GameMachine,
    shortfall: Option<Shortfall>,
    timer: Option<TurnTimer>,
    tick_interval: Duration,
    ticks: mpsc::Sender<TurnId>,
    snapshots: watch::Sender<GameSnapshot>,
    notices: NoticeHub,
}

impl GameSession {
    /// Spawn the session task of `prepared` and return its first handle.
    pub fn spawn(prepared: PreparedGame, config: &AppConfig) -> SessionHandle {
        let (state, shortfall) = prepared.into_parts();
        let machine = GameMachine::new(state);
        let game_id = machine.state().id;

        let (command_tx, command_rx) = mpsc::channel(config.command_buffer.max(1));
        let (tick_tx, tick_rx) = mpsc::channel(TICK_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(GameSnapshot::capture(&machine, shortfall));
        let notices = NoticeHub::new(config.notice_buffer);

        let session = Self {
            machine,
            shortfall,
            timer: None,
            tick_interval: config.tick_interval,
            ticks: tick_tx,
            snapshots: snapshot_tx,
            notices: notices.clone(),
        };
        tokio::spawn(session.run(command_rx, tick_rx));
        info!(%game_id, "game session started");

        SessionHandle {
            game_id,
            commands: command_tx,
            snapshots: snapshot_rx,
            notices,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut ticks: mpsc::Receiver<TurnId>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(Command { event, reply }) = command else {
                        debug!(game_id = %self.machine.state().id, "every handle dropped");
                        break;
                    };
                    let quitting = event == GameEvent::Quit;
                    let outcome = self.handle(event);
                    let _ = reply.send(outcome);
                    if quitting {
                        break;
                    }
                }
                Some(turn) = ticks.recv() => {
                    let _ = self.handle(GameEvent::TimerTick { turn });
                }
            }
        }

        if let Some(timer) = self.timer.take() {
            timer.stop();
        }
        info!(
            game_id = %self.machine.state().id,
            phase = ?self.machine.phase(),
            "game session stopped"
        );
    }

    fn handle(&mut self, event: GameEvent) -> Result<Applied, Rejection> {
        let is_tick = matches!(event, GameEvent::TimerTick { .. });
        match self.machine.apply(event) {
            Ok(applied) => {
                self.sync_timer();
                self.publish(&applied.steps);
                Ok(applied)
            }
            Err(rejection) => {
                debug!(error = %rejection, "event rejected");
                if !is_tick {
                    broadcast_rejection(&self.notices, &rejection);
                }
                Err(rejection)
            }
        }
    }

    /// Keep exactly one timer armed while a turn is active, none otherwise.
    fn sync_timer(&mut self) {
        let running = self.timer.as_ref().map(TurnTimer::turn);
        match (self.machine.armed_turn(), running) {
            (Some(armed), Some(running)) if armed == running => {}
            (Some(armed), _) => {
                self.timer = Some(TurnTimer::start(
                    armed,
                    self.tick_interval,
                    self.ticks.clone(),
                ));
            }
            (None, Some(_)) => {
                if let Some(timer) = self.timer.take() {
                    timer.stop();
                }
            }
            (None, None) => {}
        }
    }

    fn publish(&self, steps: &[Step]) {
        self.snapshots
            .send_replace(GameSnapshot::capture(&self.machine, self.shortfall));

        let started = steps
            .iter()
            .any(|step| matches!(step, Step::GameStarted { .. }));
        if let Some(shortfall) = self.shortfall.filter(|_| started) {
            broadcast_shortfall(&self.notices, shortfall);
        }
        broadcast_steps(&self.notices, steps, self.machine.state());
    }
}
