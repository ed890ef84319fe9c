//! Device profiles and screen-area geometry
//!
//! Each device kind carries a static profile: the viewport used while
//! capturing, the frame template it is composited into, and the ratios that
//! locate the screen inside that template. Ratios never depend on the
//! quality tier.

use crate::{DeviceKind, Quality, Viewport};
use serde::{Deserialize, Serialize};

/// User agent presented by the mobile profile so sites serve their mobile layout.
pub const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 15_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.0 Mobile/15E148 Safari/604.1";

/// Frame size assumed when a template's dimensions cannot be read.
pub const FALLBACK_FRAME_SIZE: (u32, u32) = (1024, 640);

/// Rectangle inside a frame template where the capture is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenArea {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

/// How the screen area is positioned inside a frame, as fractions of the
/// frame's native width/height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScreenGeometry {
    /// Fixed offsets from the frame's top-left corner.
    Anchored {
        left: f64,
        top: f64,
        width: f64,
        height: f64,
    },
    /// Area centered inside the frame.
    Centered { width: f64, height: f64 },
}

impl ScreenGeometry {
    /// Compute the pixel rectangle for a frame of `frame_w` x `frame_h`.
    ///
    /// Every component is rounded half-up on its own. For centered geometry
    /// the offsets are derived from the already-rounded width and height.
    pub fn screen_area(&self, frame_w: u32, frame_h: u32) -> ScreenArea {
        let fw = frame_w as f64;
        let fh = frame_h as f64;
        match *self {
            ScreenGeometry::Anchored {
                left,
                top,
                width,
                height,
            } => ScreenArea {
                left: round_half_up(fw * left),
                top: round_half_up(fh * top),
                width: round_half_up(fw * width),
                height: round_half_up(fh * height),
            },
            ScreenGeometry::Centered { width, height } => {
                let area_w = round_half_up(fw * width);
                let area_h = round_half_up(fh * height);
                ScreenArea {
                    left: round_half_up(frame_w.saturating_sub(area_w) as f64 / 2.0),
                    top: round_half_up(frame_h.saturating_sub(area_h) as f64 / 2.0),
                    width: area_w,
                    height: area_h,
                }
            }
        }
    }
}

fn round_half_up(v: f64) -> u32 {
    (v + 0.5).floor().max(0.0) as u32
}

/// Static configuration for one device kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub kind: DeviceKind,
    /// Capture viewport for the high quality tier
    pub high: Viewport,
    /// Capture viewport for the medium quality tier
    pub medium: Viewport,
    /// Emulate a touch/mobile device during capture
    pub mobile: bool,
    /// User agent override, if any
    pub user_agent: Option<String>,
    /// File name of the frame template inside the assets directory
    pub frame_template: String,
    pub geometry: ScreenGeometry,
    /// Corner radius as a fraction of the screen-area width
    pub corner_radius_ratio: Option<f64>,
}

impl DeviceProfile {
    /// Default laptop profile: 16:10-ish viewport, anchored screen area.
    pub fn laptop() -> Self {
        let laptop_viewport = |width: u32| Viewport {
            width,
            height: round_half_up(width as f64 * 0.7),
            scale_factor: 1.0,
        };
        Self {
            kind: DeviceKind::Laptop,
            high: laptop_viewport(1440),
            medium: laptop_viewport(1024),
            mobile: false,
            user_agent: None,
            frame_template: "laptop-mockup.png".to_string(),
            geometry: ScreenGeometry::Anchored {
                left: 0.128,
                top: 0.25,
                width: 0.744,
                height: 0.47,
            },
            corner_radius_ratio: None,
        }
    }

    /// Default mobile profile: phone viewport at 3x, centered rounded screen.
    pub fn mobile() -> Self {
        let phone = Viewport {
            width: 390,
            height: 844,
            scale_factor: 3.0,
        };
        Self {
            kind: DeviceKind::Mobile,
            high: phone,
            medium: phone,
            mobile: true,
            user_agent: Some(MOBILE_USER_AGENT.to_string()),
            frame_template: "mobile-mockup.png".to_string(),
            geometry: ScreenGeometry::Centered {
                width: 0.57,
                height: 0.81,
            },
            corner_radius_ratio: Some(0.08),
        }
    }

    pub fn viewport(&self, quality: Quality) -> Viewport {
        match quality {
            Quality::High => self.high,
            Quality::Medium => self.medium,
        }
    }

    /// Corner radius in pixels for a computed area, if this device masks corners.
    pub fn corner_radius(&self, area: &ScreenArea) -> Option<u32> {
        self.corner_radius_ratio
            .map(|ratio| round_half_up(area.width as f64 * ratio))
    }
}

/// Per-device profile table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfiles {
    pub laptop: DeviceProfile,
    pub mobile: DeviceProfile,
}

impl Default for DeviceProfiles {
    fn default() -> Self {
        Self {
            laptop: DeviceProfile::laptop(),
            mobile: DeviceProfile::mobile(),
        }
    }
}

impl DeviceProfiles {
    pub fn get(&self, kind: DeviceKind) -> &DeviceProfile {
        match kind {
            DeviceKind::Laptop => &self.laptop,
            DeviceKind::Mobile => &self.mobile,
        }
    }
}
