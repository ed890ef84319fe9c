//! Capture backends
//!
//! A backend renders a URL at a device profile's viewport and returns the
//! viewport-sized screenshot as PNG bytes. The pipeline owns one shared
//! backend for the life of the process and calls it from tokio's blocking
//! pool, so implementations may block.

#[cfg(feature = "cdp")]
pub mod cdp;

use crate::device::DeviceProfile;
use crate::{Quality, Result};

/// Shared, long-lived capture resource.
///
/// Every `capture` call must use its own isolated browsing context and
/// dispose of it before returning; implementations must tolerate concurrent
/// calls.
pub trait CaptureBackend: Send + Sync {
    /// Render `url` at `profile`'s viewport for `quality` and return PNG bytes.
    ///
    /// Fails with `NavigationTimeout`, `DnsResolution` or `Navigation`.
    fn capture(&self, url: &str, profile: &DeviceProfile, quality: Quality) -> Result<Vec<u8>>;

    /// Release the underlying browser. Later captures fail with
    /// `Initialization`.
    fn shutdown(&self) -> Result<()>;
}
