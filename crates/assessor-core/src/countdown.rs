//! Per-attempt countdown and the scheduler seam that drives it.
//!
//! The countdown itself is pure state: it only moves when the owning
//! session feeds it a tick. A [`TickScheduler`] decides where ticks come
//! from (a tokio interval in production, the test itself in unit tests).

use std::sync::{Arc, Mutex};

use uuid::Uuid;

/// Identifies one started countdown. Ticks carrying any other token are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken {
    pub attempt_id: Uuid,
    pub generation: u64,
}

/// Cancels the underlying tick source when cancelled or dropped.
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl TimerHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A handle with nothing to cancel.
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    pub fn cancel(mut self) {
        self.fire();
    }

    fn fire(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.fire();
    }
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

/// Source of one-second ticks for a countdown.
pub trait TickScheduler: Send + Sync {
    /// Begin delivering ticks for `token` until the returned handle is
    /// cancelled or dropped.
    fn start(&self, token: TimerToken) -> TimerHandle;
}

/// What a single tick did to the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEvent {
    Tick { remaining_seconds: u64 },
    /// Fired exactly once, on the tick that reaches zero.
    Expired,
}

/// Remaining-seconds counter for one attempt.
#[derive(Debug)]
pub struct Countdown {
    token: TimerToken,
    remaining_seconds: u64,
    expired: bool,
    handle: Option<TimerHandle>,
}

impl Countdown {
    /// Start a countdown of `total_seconds` and register it with `scheduler`.
    pub fn start(token: TimerToken, total_seconds: u64, scheduler: &dyn TickScheduler) -> Self {
        tracing::debug!(
            attempt_id = %token.attempt_id,
            generation = token.generation,
            total_seconds,
            "countdown started"
        );
        Self {
            token,
            remaining_seconds: total_seconds,
            expired: false,
            handle: Some(scheduler.start(token)),
        }
    }

    pub fn token(&self) -> TimerToken {
        self.token
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    /// Whether the countdown still accepts ticks.
    pub fn is_running(&self) -> bool {
        !self.expired && self.handle.is_some()
    }

    /// Advance by one second. Returns `None` once expired or cancelled.
    pub fn tick(&mut self) -> Option<CountdownEvent> {
        if !self.is_running() {
            return None;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            self.expired = true;
            self.cancel();
            Some(CountdownEvent::Expired)
        } else {
            Some(CountdownEvent::Tick {
                remaining_seconds: self.remaining_seconds,
            })
        }
    }

    /// Stop the tick source. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            tracing::debug!(
                attempt_id = %self.token.attempt_id,
                generation = self.token.generation,
                "countdown cancelled"
            );
            handle.cancel();
        }
    }
}

/// Scheduler that delivers no ticks on its own and records what it was asked.
///
/// Tests drive the session by calling `on_tick` with the recorded token.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    state: Arc<Mutex<ManualSchedulerState>>,
}

#[derive(Debug, Default)]
struct ManualSchedulerState {
    started: Vec<TimerToken>,
    cancelled: Vec<TimerToken>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every token ever started, oldest first.
    pub fn started(&self) -> Vec<TimerToken> {
        self.lock().started.clone()
    }

    /// Every token whose handle was cancelled or dropped.
    pub fn cancelled(&self) -> Vec<TimerToken> {
        self.lock().cancelled.clone()
    }

    /// Tokens started and not yet cancelled.
    pub fn active(&self) -> Vec<TimerToken> {
        let state = self.lock();
        state
            .started
            .iter()
            .filter(|t| !state.cancelled.contains(t))
            .copied()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualSchedulerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TickScheduler for ManualScheduler {
    fn start(&self, token: TimerToken) -> TimerHandle {
        self.lock().started.push(token);
        let state = Arc::clone(&self.state);
        TimerHandle::new(move || {
            state
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .cancelled
                .push(token);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(generation: u64) -> TimerToken {
        TimerToken {
            attempt_id: Uuid::nil(),
            generation,
        }
    }

    #[test]
    fn expires_exactly_once() {
        let scheduler = ManualScheduler::new();
        let mut countdown = Countdown::start(token(1), 3, &scheduler);

        assert_eq!(
            countdown.tick(),
            Some(CountdownEvent::Tick {
                remaining_seconds: 2
            })
        );
        assert_eq!(
            countdown.tick(),
            Some(CountdownEvent::Tick {
                remaining_seconds: 1
            })
        );
        assert_eq!(countdown.tick(), Some(CountdownEvent::Expired));
        assert_eq!(countdown.tick(), None);
        assert!(!countdown.is_running());
        assert_eq!(scheduler.cancelled(), vec![token(1)]);
    }

    #[test]
    fn cancelled_countdown_ignores_ticks() {
        let scheduler = ManualScheduler::new();
        let mut countdown = Countdown::start(token(1), 60, &scheduler);
        countdown.cancel();
        countdown.cancel();
        assert_eq!(countdown.tick(), None);
        assert_eq!(countdown.remaining_seconds(), 60);
        assert_eq!(scheduler.cancelled().len(), 1);
        assert!(scheduler.active().is_empty());
    }

    #[test]
    fn dropping_countdown_cancels_source() {
        let scheduler = ManualScheduler::new();
        {
            let _countdown = Countdown::start(token(7), 60, &scheduler);
            assert_eq!(scheduler.active(), vec![token(7)]);
        }
        assert!(scheduler.active().is_empty());
    }

    #[test]
    fn handle_cancel_runs_once() {
        let counter = Arc::new(Mutex::new(0));
        let c = Arc::clone(&counter);
        let handle = TimerHandle::new(move || *c.lock().unwrap() += 1);
        handle.cancel();
        assert_eq!(*counter.lock().unwrap(), 1);
        drop(TimerHandle::noop());
    }
}
