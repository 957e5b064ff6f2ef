//! Read-only loading of `BridgeConfig` documents supplied by the host.

use std::path::Path;

use crate::camera::error::{CameraError, Result};
use crate::settings::types::BridgeConfig;

/// Load a configuration file, returning the defaults when it is missing.
pub fn load(path: &Path) -> Result<BridgeConfig> {
    if !path.exists() {
        tracing::debug!("no bridge config at {}, using defaults", path.display());
        return Ok(BridgeConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .map_err(|e| CameraError::Config(format!("{}: {e}", path.display())))?;
    from_json(&contents)
}

/// Parse a configuration document.
pub fn from_json(contents: &str) -> Result<BridgeConfig> {
    let config: BridgeConfig =
        serde_json::from_str(contents).map_err(|e| CameraError::Config(e.to_string()))?;
    validate(&config)?;
    Ok(config)
}

/// A zero-width request would match every preview size.
fn validate(config: &BridgeConfig) -> Result<()> {
    let extent = config.requested_extent;
    if extent.width == 0 || extent.height == 0 {
        return Err(CameraError::Config(format!(
            "requested extent must be non-zero, got {extent}"
        )));
    }
    Ok(())
}
