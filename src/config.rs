//! Pipeline and browser configuration

use crate::device::DeviceProfiles;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for the shared capture browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run Chrome without a visible window
    pub headless: bool,
    /// Keep Chrome's sandbox enabled (usually off inside containers)
    pub sandbox: bool,
    /// Explicit Chrome binary; autodetected when `None`
    pub chrome_path: Option<PathBuf>,
    /// Hard deadline for reaching the network-settled state
    pub navigation_timeout_ms: u64,
    /// How often the settle flag is polled
    pub settle_poll_ms: u64,
    /// How long the browser connection may sit idle between requests
    pub idle_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            sandbox: false,
            chrome_path: None,
            navigation_timeout_ms: 60_000,
            settle_poll_ms: 100,
            idle_timeout_secs: 24 * 60 * 60,
        }
    }
}

/// Configuration for the capture-then-composite pipeline
///
/// # Examples
///
/// ```
/// let cfg = shotframe::PipelineConfig::default();
/// assert_eq!(cfg.browser.navigation_timeout_ms, 60_000);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the frame templates
    pub assets_dir: PathBuf,
    /// Scratch directory for raw captures
    pub temp_dir: PathBuf,
    /// Directory where finished mockups are written
    pub output_dir: PathBuf,
    pub browser: BrowserConfig,
    pub profiles: DeviceProfiles,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("server").join("assets"),
            temp_dir: PathBuf::from("temp"),
            output_dir: PathBuf::from("generated"),
            browser: BrowserConfig::default(),
            profiles: DeviceProfiles::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a JSON configuration file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }
}
