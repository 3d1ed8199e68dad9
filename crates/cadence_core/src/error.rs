//! Animation error types

use thiserror::Error;

/// Errors raised by the animation system
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    /// A segment bound lies outside `[0, 1]`
    #[error("{bound} must be within [0, 1], got {value}")]
    Range { bound: &'static str, value: f64 },

    /// A segment finishes at or before it begins
    #[error("finish_at ({finish_at}) must be greater than begin_at ({begin_at})")]
    InvertedRange { begin_at: f64, finish_at: f64 },

    /// A required argument was rejected
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// The global scheduler was installed twice
    #[error("Global animation scheduler already set")]
    SchedulerAlreadySet,
}

impl AnimationError {
    /// Returns true for the range validation errors raised while building a tree
    pub fn is_range_error(&self) -> bool {
        matches!(
            self,
            AnimationError::Range { .. } | AnimationError::InvertedRange { .. }
        )
    }
}

/// Result type for animation operations
pub type Result<T> = std::result::Result<T, AnimationError>;
