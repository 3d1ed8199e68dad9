//! Loading `cadence.toml`

use anyhow::{Context, Result};
use cadence_animation::AnimationConfig;
use std::fs;
use std::path::Path;

/// Read an animation config file, or fall back to defaults when none is given
pub fn load(path: Option<&Path>) -> Result<AnimationConfig> {
    let Some(path) = path else {
        return Ok(AnimationConfig::default());
    };

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config = AnimationConfig::from_toml_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    tracing::debug!("Loaded config from {}: {:?}", path.display(), config);
    Ok(config)
}
