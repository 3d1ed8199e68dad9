//! Scheduler configuration
//!
//! Defaults used when an animation leaves its rate or length unset, and
//! the period of the background clock. Loadable from TOML:
//!
//! ```toml
//! rate_ms = 16
//! length_ms = 300
//! clock_interval_ms = 8
//! ```

use cadence_core::{AnimationError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Animation scheduler configuration
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AnimationConfig {
    /// Requested tick granularity in milliseconds
    #[serde(default = "default_rate_ms")]
    pub rate_ms: u32,
    /// Default animation length in milliseconds
    #[serde(default = "default_length_ms")]
    pub length_ms: u32,
    /// Period of the background clock driver
    #[serde(default = "default_clock_interval_ms")]
    pub clock_interval_ms: u64,
}

fn default_rate_ms() -> u32 {
    16
}

fn default_length_ms() -> u32 {
    250
}

fn default_clock_interval_ms() -> u64 {
    16
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            rate_ms: default_rate_ms(),
            length_ms: default_length_ms(),
            clock_interval_ms: default_clock_interval_ms(),
        }
    }
}

impl AnimationConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| AnimationError::Config(e.to_string()))?;
        if config.clock_interval_ms == 0 {
            return Err(AnimationError::Config(
                "clock_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn clock_interval(&self) -> Duration {
        Duration::from_millis(self.clock_interval_ms)
    }
}
