//! Countdown driving the active turn.

use std::time::Duration;

use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::debug;

use crate::state::state_machine::TurnId;

/// Running countdown of one turn.
///
/// Every `period` the timer sends the turn it was armed for on its channel.
/// The task is aborted when the timer is stopped or dropped, so a turn that
/// ends on any path leaves no ticker behind.
#[derive(Debug)]
pub struct TurnTimer {
    turn: TurnId,
    handle: JoinHandle<()>,
}

impl TurnTimer {
    /// Arm a countdown for `turn`. The first tick fires one `period` from now.
    pub fn start(turn: TurnId, period: Duration, ticks: mpsc::Sender<TurnId>) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            loop {
                interval.tick().await;
                if ticks.send(turn).await.is_err() {
                    break;
                }
            }
        });
        debug!(turn, period_ms = period.as_millis() as u64, "turn timer armed");
        Self { turn, handle }
    }

    /// Turn the timer was armed for.
    pub fn turn(&self) -> TurnId {
        self.turn
    }

    /// Cancel the countdown.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for TurnTimer {
    fn drop(&mut self) {
        self.handle.abort();
        debug!(turn = self.turn, "turn timer disarmed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period_for_its_turn() {
        let (tx, mut rx) = mpsc::channel(8);
        let started = Instant::now();
        let _timer = TurnTimer::start(7, Duration::from_secs(1), tx);

        for _ in 0..3 {
            assert_eq!(rx.recv().await, Some(7));
        }
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn stopping_closes_the_tick_channel() {
        let (tx, mut rx) = mpsc::channel(8);
        let timer = TurnTimer::start(1, Duration::from_secs(1), tx);
        assert_eq!(rx.recv().await, Some(1));

        timer.stop();
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_cancels_the_countdown() {
        let (tx, mut rx) = mpsc::channel(8);
        {
            let timer = TurnTimer::start(2, Duration::from_secs(1), tx);
            assert_eq!(timer.turn(), 2);
        }
        assert_eq!(rx.recv().await, None);
    }
}
