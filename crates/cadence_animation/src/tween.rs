//! Tween driver
//!
//! Converts elapsed clock time into a non-decreasing unit-progress stream
//! for one animation run. The driver knows nothing about targets or the
//! scheduler: it carries an opaque [`AnimationKey`] handle so its output can
//! be routed back to the owning record.
//!
//! ```text
//!          start()            progress >= 1
//!   Idle ──────────▶ Running ───────────────▶ Finished
//!    ▲                 ▲                          │
//!    │   stop()        └──────── start() ─────────┤ (repeat)
//!    └────────────────────────────────────────────┘
//! ```

use crate::ticker::{TickId, Ticker};
use cadence_core::AnimationKey;

/// Lifecycle state of a tween
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TweenState {
    Idle,
    Running,
    Finished,
}

/// Output of one driver tick
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TweenTick {
    /// Unit progress after this tick (`ValueUpdated`)
    pub value: f64,
    /// Set on the tick that reaches 1.0 (`Finished`)
    pub finished: bool,
}

/// Per-run progress state machine
#[derive(Debug)]
pub struct TweenDriver {
    handle: AnimationKey,
    length_ms: u32,
    elapsed_ms: u64,
    value: f64,
    state: TweenState,
    subscription: Option<TickId>,
}

impl TweenDriver {
    pub fn new(handle: AnimationKey, length_ms: u32) -> Self {
        Self {
            handle,
            length_ms,
            elapsed_ms: 0,
            value: 0.0,
            state: TweenState::Idle,
            subscription: None,
        }
    }

    /// Routing handle for this run
    pub fn handle(&self) -> &AnimationKey {
        &self.handle
    }

    pub fn length_ms(&self) -> u32 {
        self.length_ms
    }

    pub fn state(&self) -> TweenState {
        self.state
    }

    /// Last emitted progress
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn is_running(&self) -> bool {
        self.state == TweenState::Running
    }

    /// Ticker subscription, if attached
    pub fn subscription(&self) -> Option<TickId> {
        self.subscription
    }

    /// Begin (or restart) a run
    ///
    /// Resets elapsed time. Subscribes to the ticker with the callback made
    /// by `subscribe` unless a subscription is already attached, which is
    /// the case when a finished run repeats.
    pub fn start<F>(&mut self, ticker: &Ticker, subscribe: F)
    where
        F: FnOnce() -> Box<dyn FnMut(u64) -> bool + Send>,
    {
        self.elapsed_ms = 0;
        self.value = 0.0;
        self.state = TweenState::Running;

        if self.subscription.is_none() {
            self.subscription = Some(ticker.insert(subscribe()));
        }
    }

    /// Advance by `step_ms` of clock time
    ///
    /// Returns `None` unless the driver is running.
    pub fn advance(&mut self, step_ms: u64) -> Option<TweenTick> {
        if self.state != TweenState::Running {
            return None;
        }

        self.elapsed_ms = self.elapsed_ms.saturating_add(step_ms);
        self.value = if self.length_ms == 0 {
            1.0
        } else {
            (self.elapsed_ms as f64 / self.length_ms as f64).min(1.0)
        };

        let finished = self.value >= 1.0;
        if finished {
            self.state = TweenState::Finished;
        }

        Some(TweenTick {
            value: self.value,
            finished,
        })
    }

    /// Forget the subscription without touching the ticker
    ///
    /// Used when the ticker has already dropped it (the tick callback
    /// returned false).
    pub fn detach(&mut self) -> Option<TickId> {
        self.subscription.take()
    }

    /// Return to idle and unsubscribe from the ticker
    ///
    /// Idempotent: the subscription is removed at most once.
    pub fn stop(&mut self, ticker: &Ticker) {
        self.state = TweenState::Idle;
        if let Some(id) = self.subscription.take() {
            ticker.remove(id);
        }
    }
}
