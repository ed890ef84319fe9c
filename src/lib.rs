//! Shotframe
//!
//! Captures a live webpage at an emulated device viewport and composites the
//! screenshot into a laptop or mobile frame template.
//!
//! # Features
//!
//! - **CDP Backend** (default): captures through headless Chrome via the
//!   Chrome DevTools Protocol
//! - **Pluggable Backends**: the pipeline only sees the [`CaptureBackend`]
//!   trait, so tests and alternative browsers can be injected
//! - **Exact Geometry**: screen areas are derived from per-device ratio tables
//!
//! # Example
//!
//! ```no_run
//! use shotframe::{CaptureRequest, DeviceKind, Pipeline, PipelineConfig, Quality};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::default();
//! let backend = shotframe::launch_backend(&config.browser)?;
//! let pipeline = Pipeline::new(config, backend.clone())?;
//!
//! let request = CaptureRequest::new("https://example.com", DeviceKind::Mobile, Quality::High)?;
//! let artifact = pipeline.generate(&request).await?;
//! println!("{} -> {}", artifact.id, artifact.output_location.display());
//!
//! backend.shutdown()?;
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod error;
pub use error::{Error, Result};

pub mod capture;
pub mod compose;
pub mod config;
pub mod device;
pub mod pipeline;
pub mod store;

pub use capture::CaptureBackend;
pub use compose::{Composite, Compositor};
pub use config::{BrowserConfig, PipelineConfig};
pub use device::{DeviceProfile, DeviceProfiles, ScreenArea, ScreenGeometry};
pub use pipeline::{MockupArtifact, Pipeline};
pub use store::{ArtifactStore, MemoryArtifactStore};

#[cfg(feature = "cdp")]
pub use capture::cdp::CdpCaptureBackend;

/// Device frame a capture is placed into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[default]
    Laptop,
    Mobile,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Laptop => f.write_str("laptop"),
            DeviceKind::Mobile => f.write_str("mobile"),
        }
    }
}

impl FromStr for DeviceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "laptop" => Ok(DeviceKind::Laptop),
            "mobile" => Ok(DeviceKind::Mobile),
            other => Err(Error::Validation(format!("unsupported device frame '{}'", other))),
        }
    }
}

/// Capture resolution tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    #[default]
    High,
    Medium,
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::High => f.write_str("high"),
            Quality::Medium => f.write_str("medium"),
        }
    }
}

impl FromStr for Quality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Quality::High),
            "medium" => Ok(Quality::Medium),
            other => Err(Error::Validation(format!("unsupported quality '{}'", other))),
        }
    }
}

/// Viewport used while capturing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    /// Device pixel ratio applied during capture
    pub scale_factor: f64,
}

impl Viewport {
    /// Pixel dimensions of a capture taken at this viewport.
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            (self.width as f64 * self.scale_factor).round() as u32,
            (self.height as f64 * self.scale_factor).round() as u32,
        )
    }
}

/// A validated request to capture `target_url` inside a device frame.
///
/// Only constructible through validation, so every value the pipeline sees
/// has an absolute http(s) URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    target_url: url::Url,
    device: DeviceKind,
    quality: Quality,
}

impl CaptureRequest {
    pub fn new(target_url: &str, device: DeviceKind, quality: Quality) -> Result<Self> {
        let parsed = url::Url::parse(target_url.trim())
            .map_err(|e| Error::Validation(format!("'{}' is not a valid URL: {}", target_url, e)))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Validation(format!(
                "unsupported URL scheme '{}', expected http or https",
                parsed.scheme()
            )));
        }
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(Error::Validation(format!("'{}' has no host", target_url)));
        }

        Ok(Self {
            target_url: parsed,
            device,
            quality,
        })
    }

    /// Validate string selectors as they arrive from an outer layer. Absent
    /// values default to a high quality laptop capture.
    pub fn parse(target_url: &str, device: Option<&str>, quality: Option<&str>) -> Result<Self> {
        let device: DeviceKind = device.map(str::parse).transpose()?.unwrap_or_default();
        let quality: Quality = quality.map(str::parse).transpose()?.unwrap_or_default();
        Self::new(target_url, device, quality)
    }

    pub fn target_url(&self) -> &str {
        self.target_url.as_str()
    }

    pub fn device(&self) -> DeviceKind {
        self.device
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }
}

/// Launch the default CDP capture backend.
#[cfg(feature = "cdp")]
pub fn launch_backend(config: &BrowserConfig) -> Result<std::sync::Arc<dyn CaptureBackend>> {
    Ok(std::sync::Arc::new(capture::cdp::CdpCaptureBackend::launch(config)?))
}
