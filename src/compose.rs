//! Frame compositing
//!
//! Places a raw capture inside a device frame template:
//!
//! 1. read the template's native size (falling back to 1024x640)
//! 2. compute the screen area from the device's geometry ratios
//! 3. stretch the capture to exactly fill that area (Lanczos3)
//! 4. mask rounded corners for devices that have them
//! 5. draw the capture onto a transparent frame-sized canvas
//! 6. draw the frame template on top
//! 7. encode as PNG
//!
//! The frame is drawn last so its artwork hides the capture's rectangular
//! edges.

use crate::device::{DeviceProfile, ScreenArea, FALLBACK_FRAME_SIZE};
use crate::{Error, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageOutputFormat, RgbaImage};
use log::{debug, warn};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Encoded result of a composite
#[derive(Debug, Clone)]
pub struct Composite {
    /// PNG bytes
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Where the capture was placed
    pub area: ScreenArea,
}

impl Composite {
    pub fn byte_size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Composites captures into the frame templates found in `assets_dir`.
#[derive(Debug, Clone)]
pub struct Compositor {
    assets_dir: PathBuf,
}

impl Compositor {
    pub fn new(assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            assets_dir: assets_dir.into(),
        }
    }

    /// Location of the frame template for `profile`.
    pub fn frame_path(&self, profile: &DeviceProfile) -> PathBuf {
        self.assets_dir.join(&profile.frame_template)
    }

    /// Native size of `profile`'s frame template, or the fallback size when
    /// the template cannot be read.
    pub fn frame_size(&self, profile: &DeviceProfile) -> (u32, u32) {
        frame_size(&self.frame_path(profile))
    }

    /// Screen area for `profile` inside its frame template.
    pub fn screen_area(&self, profile: &DeviceProfile) -> ScreenArea {
        let (frame_w, frame_h) = self.frame_size(profile);
        profile.geometry.screen_area(frame_w, frame_h)
    }

    /// Produce the final mockup for a raw capture.
    pub fn compose(&self, raw: &[u8], profile: &DeviceProfile) -> Result<Composite> {
        let frame_path = self.frame_path(profile);
        let (frame_w, frame_h) = frame_size(&frame_path);
        let area = profile.geometry.screen_area(frame_w, frame_h);
        debug!(
            "Compositing {} capture into {}x{} frame at {:?}",
            profile.kind, frame_w, frame_h, area
        );

        let mut canvas = render_capture_layer(raw, profile, frame_w, frame_h, &area)?;

        let frame = image::open(&frame_path)
            .map_err(|e| {
                Error::Compositing(format!(
                    "Failed to load frame template {}: {}",
                    frame_path.display(),
                    e
                ))
            })?
            .to_rgba8();
        imageops::overlay(&mut canvas, &frame, 0, 0);

        let (width, height) = canvas.dimensions();
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(canvas)
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .map_err(|e| Error::Compositing(format!("Failed to encode mockup: {}", e)))?;

        Ok(Composite {
            bytes,
            width,
            height,
            area,
        })
    }

    /// The frame-sized canvas holding only the resized (and masked) capture,
    /// before the frame template is drawn over it.
    pub fn capture_layer(&self, raw: &[u8], profile: &DeviceProfile) -> Result<(RgbaImage, ScreenArea)> {
        let (frame_w, frame_h) = self.frame_size(profile);
        let area = profile.geometry.screen_area(frame_w, frame_h);
        let layer = render_capture_layer(raw, profile, frame_w, frame_h, &area)?;
        Ok((layer, area))
    }
}

fn frame_size(path: &Path) -> (u32, u32) {
    match image::image_dimensions(path) {
        Ok(size) => size,
        Err(e) => {
            warn!(
                "Could not read frame size from {}: {}; assuming {}x{}",
                path.display(),
                e,
                FALLBACK_FRAME_SIZE.0,
                FALLBACK_FRAME_SIZE.1
            );
            FALLBACK_FRAME_SIZE
        }
    }
}

fn render_capture_layer(
    raw: &[u8],
    profile: &DeviceProfile,
    frame_w: u32,
    frame_h: u32,
    area: &ScreenArea,
) -> Result<RgbaImage> {
    let mut resized = resize_to_area(raw, area)?;
    if let Some(radius) = profile.corner_radius(area) {
        apply_rounded_mask(&mut resized, radius);
    }

    let mut canvas = RgbaImage::new(frame_w, frame_h);
    imageops::overlay(&mut canvas, &resized, area.left as i64, area.top as i64);
    Ok(canvas)
}

/// Decode a capture and stretch it to exactly the area's size. The aspect
/// ratio is not preserved.
pub fn resize_to_area(raw: &[u8], area: &ScreenArea) -> Result<RgbaImage> {
    if area.width == 0 || area.height == 0 {
        return Err(Error::Compositing(format!(
            "screen area {}x{} is empty",
            area.width, area.height
        )));
    }

    let capture = image::load_from_memory(raw)
        .map_err(|e| Error::Compositing(format!("Failed to decode capture: {}", e)))?
        .to_rgba8();

    Ok(imageops::resize(&capture, area.width, area.height, FilterType::Lanczos3))
}

/// Make every pixel whose centre lies outside a rounded rectangle of
/// `radius` fully transparent. The radius is clamped to half the shorter side.
pub fn apply_rounded_mask(img: &mut RgbaImage, radius: u32) {
    let (w, h) = img.dimensions();
    let r = radius.min(w / 2).min(h / 2) as f64;
    if r <= 0.0 {
        return;
    }
    let (wf, hf) = (w as f64, h as f64);

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let cx = x as f64 + 0.5;
        let cy = y as f64 + 0.5;

        let corner_x = if cx < r {
            Some(r)
        } else if cx > wf - r {
            Some(wf - r)
        } else {
            None
        };
        let corner_y = if cy < r {
            Some(r)
        } else if cy > hf - r {
            Some(hf - r)
        } else {
            None
        };

        if let (Some(ox), Some(oy)) = (corner_x, corner_y) {
            let (dx, dy) = (cx - ox, cy - oy);
            if dx * dx + dy * dy > r * r {
                pixel.0[3] = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn png(img: &RgbaImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img.clone())
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn mask_clears_corners_and_keeps_edges() {
        let mut img = RgbaImage::from_pixel(100, 60, Rgba([10, 20, 30, 255]));
        apply_rounded_mask(&mut img, 20);

        for (x, y) in [(0, 0), (99, 0), (0, 59), (99, 59), (3, 3)] {
            assert_eq!(img.get_pixel(x, y).0[3], 0, "corner pixel ({}, {}) kept", x, y);
        }
        for (x, y) in [(50, 0), (0, 30), (99, 30), (50, 59), (50, 30), (20, 20)] {
            assert_eq!(img.get_pixel(x, y).0[3], 255, "pixel ({}, {}) masked", x, y);
        }
    }

    #[test]
    fn zero_radius_is_a_no_op() {
        let mut img = RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 255]));
        apply_rounded_mask(&mut img, 0);
        assert!(img.pixels().all(|p| p.0[3] == 255));
    }

    #[test]
    fn resize_stretches_to_exact_area() {
        let raw = png(&RgbaImage::from_pixel(40, 10, Rgba([200, 0, 0, 255])));
        let area = ScreenArea { left: 0, top: 0, width: 13, height: 29 };
        let out = resize_to_area(&raw, &area).unwrap();
        assert_eq!(out.dimensions(), (13, 29));
    }

    #[test]
    fn undecodable_capture_is_compositing_error() {
        let area = ScreenArea { left: 0, top: 0, width: 10, height: 10 };
        assert!(matches!(resize_to_area(b"not an image", &area), Err(Error::Compositing(_))));
    }

    #[test]
    fn missing_frame_falls_back_for_geometry_but_fails_compose() {
        let compositor = Compositor::new("/nonexistent/assets");
        let profile = DeviceProfile::laptop();
        assert_eq!(compositor.frame_size(&profile), FALLBACK_FRAME_SIZE);
        assert_eq!(
            compositor.screen_area(&profile),
            ScreenArea { left: 131, top: 160, width: 762, height: 301 }
        );

        let raw = png(&RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 255])));
        assert!(matches!(compositor.compose(&raw, &profile), Err(Error::Compositing(_))));
    }
}
