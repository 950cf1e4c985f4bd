//! Publish configuration file.
//!
//! An optional JSON file with `limits`, `upload` and `retry` sections.
//! Missing sections and fields keep their defaults.

use std::path::Path;

use anyhow::Context;
use sitedrop_publish::PublishConfig;

/// Loads and validates the configuration. `None` yields the defaults.
pub fn load(path: Option<&Path>) -> anyhow::Result<PublishConfig> {
    let Some(path) = path else {
        return Ok(PublishConfig::default());
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: PublishConfig = serde_json::from_str(&content)
        .with_context(|| format!("parsing config {}", path.display()))?;
    config.validate()?;

    tracing::debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}
