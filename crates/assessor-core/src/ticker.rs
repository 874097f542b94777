//! Tokio-backed tick source.
//!
//! Each started countdown gets its own interval task that sends its token
//! down a channel once per period. The session owner drains the channel with
//! [`pump_ticks`]; cancellation aborts the task, and anything it already
//! queued is rejected by the session's token check.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::countdown::{TickScheduler, TimerHandle, TimerToken};
use crate::session::{AttemptSession, SessionState, TickOutcome};

/// Scheduler that spawns one interval task per countdown.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<TimerToken>,
    period: Duration,
}

impl TokioScheduler {
    /// One tick per second, delivered to the returned receiver.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerToken>) {
        Self::with_period(Duration::from_secs(1))
    }

    pub fn with_period(period: Duration) -> (Self, mpsc::UnboundedReceiver<TimerToken>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, period }, rx)
    }
}

impl TickScheduler for TokioScheduler {
    fn start(&self, token: TimerToken) -> TimerHandle {
        let tx = self.tx.clone();
        let period = self.period;
        let task = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(token).is_err() {
                    break;
                }
            }
        });
        TimerHandle::new(move || task.abort())
    }
}

/// Feed ticks from `rx` into `session` until it leaves `InProgress`.
///
/// Returns the last meaningful outcome: `AutoSubmitted` when the countdown
/// expired, otherwise `Ignored` (submitted by other means, the channel
/// closed, or the session has no running countdown).
pub async fn pump_ticks(
    session: &mut AttemptSession,
    rx: &mut mpsc::UnboundedReceiver<TimerToken>,
) -> TickOutcome {
    while session.state() == SessionState::InProgress {
        if session.timer_token().is_none() {
            break;
        }
        let Some(token) = rx.recv().await else {
            break;
        };
        match session.on_tick(token) {
            TickOutcome::AutoSubmitted => return TickOutcome::AutoSubmitted,
            TickOutcome::Ticked { remaining_seconds } => {
                tracing::trace!(remaining_seconds, "tick");
            }
            TickOutcome::Ignored => {}
        }
    }
    TickOutcome::Ignored
}
