//! Kinetic decay
//!
//! A fling decelerates a single scalar: each tick the speed loses
//! `drag × ms` until it reaches zero. The caller receives the signed
//! displacement for the tick and the remaining speed, and may stop the
//! fling early by returning `false`.

use cadence_core::{AnimationError, Result};

/// Per-tick fling callback: `(delta, speed) -> keep going`
pub type KineticCallback = Box<dyn FnMut(f64, f64) -> bool + Send>;

/// Fired once when a fling stops on its own
pub type KineticFinished = Box<dyn FnOnce() + Send>;

/// Parameters of a fling
pub struct KineticOptions {
    velocity: f64,
    drag: f64,
    finished: Option<KineticFinished>,
}

impl KineticOptions {
    /// `velocity` in units per ms (sign gives direction), `drag` in units per ms²
    pub fn new(velocity: f64, drag: f64) -> Self {
        Self {
            velocity,
            drag,
            finished: None,
        }
    }

    /// Callback fired once when speed reaches zero or the step callback stops
    ///
    /// Not fired when the fling is aborted.
    pub fn on_finished<F>(mut self, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.finished = Some(Box::new(callback));
        self
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn drag(&self) -> f64 {
        self.drag
    }

    /// Reject parameters that cannot produce a direction or a decay
    pub fn validate(&self) -> Result<()> {
        if !self.velocity.is_finite() || self.velocity == 0.0 {
            return Err(AnimationError::InvalidArgument(format!(
                "kinetic velocity must be finite and non-zero, got {}",
                self.velocity
            )));
        }
        if !self.drag.is_finite() || self.drag < 0.0 {
            return Err(AnimationError::InvalidArgument(format!(
                "kinetic drag must be finite and non-negative, got {}",
                self.drag
            )));
        }
        Ok(())
    }

    pub(crate) fn into_parts(self) -> (KineticDecay, Option<KineticFinished>) {
        (KineticDecay::new(self.velocity, self.drag), self.finished)
    }
}

/// Decay state of one fling
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KineticDecay {
    sign: f64,
    speed: f64,
    drag: f64,
}

impl KineticDecay {
    pub fn new(velocity: f64, drag: f64) -> Self {
        Self {
            sign: velocity / velocity.abs(),
            speed: velocity.abs(),
            drag,
        }
    }

    /// Direction of travel, `1.0` or `-1.0`
    pub fn sign(&self) -> f64 {
        self.sign
    }

    /// Remaining speed (always non-negative)
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Decay by `ms` elapsed since the previous tick
    ///
    /// Returns `(signed delta, speed)` while still moving, `None` once the
    /// speed has reached zero.
    pub fn step(&mut self, ms: u64) -> Option<(f64, f64)> {
        let ms = ms as f64;
        self.speed = (self.speed - self.drag * ms).max(0.0);

        if self.speed > 0.0 {
            Some((self.sign * self.speed * ms, self.speed))
        } else {
            None
        }
    }
}
