//! Cadence Animation System
//!
//! Hierarchical, time-driven animations scheduled against weakly held
//! targets.
//!
//! # Features
//!
//! - **Animation Trees**: Child fragments mapped onto sub-ranges of a parent
//! - **Easing**: Classic curves, cubic bezier, and custom functions
//! - **Single Flight**: One tween and one fling per (owner, name) key
//! - **Kinetic**: Velocity/drag flings with linear decay
//! - **Thread Affinity**: Off-thread calls marshaled to the home thread

pub mod animation;
pub mod config;
pub mod easing;
pub mod interpolate;
pub mod kinetic;
pub mod scheduler;
pub mod ticker;
pub mod tween;

pub use animation::{Animation, RootCallback};
pub use config::AnimationConfig;
pub use easing::{Easing, NAMED_EASINGS};
pub use interpolate::{interpolate, Interpolator};
pub use kinetic::{KineticDecay, KineticOptions};
pub use scheduler::{
    is_scheduler_initialized, set_global_scheduler, try_get_scheduler, AnimationOptions,
    AnimationScheduler, RunInfo,
};
pub use ticker::{ClockDriver, TickId, Ticker};
pub use tween::{TweenDriver, TweenState, TweenTick};

pub use cadence_core::{Animatable, AnimationError, AnimationKey, Dispatcher, Result};
