//! Cadence Core
//!
//! Collaborator capabilities shared by the Cadence animation system:
//!
//! - **Animatable targets**: identity plus batch begin/commit hooks
//! - **Animation keys**: (owner identity, name) single-flight tokens
//! - **Dispatch**: thread-affinity checks and main-thread marshaling
//! - **Errors**: the shared `AnimationError` type

pub mod animatable;
pub mod dispatch;
pub mod error;

pub use animatable::{Animatable, AnimationKey};
pub use dispatch::{Action, Dispatcher, ImmediateDispatcher, MainThreadDispatcher, WakeCallback};
pub use error::{AnimationError, Result};
