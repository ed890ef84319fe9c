//! Shared helpers: a fake capture backend and generated frame templates.

#![allow(dead_code)]

use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use sha2::{Digest, Sha256};
use shotframe::device::{DeviceProfile, DeviceProfiles};
use shotframe::{CaptureBackend, Error, PipelineConfig, Quality, Result, ScreenArea, Viewport};
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

pub const LAPTOP_FRAME: (u32, u32) = (1024, 640);
pub const MOBILE_FRAME: (u32, u32) = (300, 600);
pub const FRAME_COLOR: Rgba<u8> = Rgba([40, 40, 48, 255]);

pub fn encode_png(img: &RgbaImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(img.clone())
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .expect("encode png");
    bytes
}

/// Solid colour that identifies a URL.
pub fn url_color(url: &str) -> Rgba<u8> {
    let digest = Sha256::digest(url.as_bytes());
    Rgba([digest[0], digest[1], digest[2], 255])
}

pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128, 255])
    });
    encode_png(&img)
}

enum Mode {
    Solid,
    Fixed(Vec<u8>),
    Fail(fn() -> Error),
}

/// Returns canned captures instead of driving a browser.
pub struct FakeBackend {
    mode: Mode,
    calls: AtomicUsize,
}

impl FakeBackend {
    /// Captures filled with the URL's identifying colour.
    pub fn solid() -> Self {
        Self { mode: Mode::Solid, calls: AtomicUsize::new(0) }
    }

    pub fn fixed(png: Vec<u8>) -> Self {
        Self { mode: Mode::Fixed(png), calls: AtomicUsize::new(0) }
    }

    pub fn failing(make: fn() -> Error) -> Self {
        Self { mode: Mode::Fail(make), calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CaptureBackend for FakeBackend {
    fn capture(&self, url: &str, profile: &DeviceProfile, quality: Quality) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (w, h) = profile.viewport(quality).pixel_size();
        match &self.mode {
            Mode::Solid => Ok(encode_png(&RgbaImage::from_pixel(w, h, url_color(url)))),
            Mode::Fixed(png) => Ok(png.clone()),
            Mode::Fail(make) => Err(make()),
        }
    }

    fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

/// Default profiles shrunk to small viewports so tests stay fast. Geometry
/// and masking are untouched.
pub fn small_profiles() -> DeviceProfiles {
    let mut profiles = DeviceProfiles::default();
    profiles.laptop.high = Viewport { width: 144, height: 101, scale_factor: 1.0 };
    profiles.laptop.medium = Viewport { width: 102, height: 72, scale_factor: 1.0 };
    profiles.mobile.high = Viewport { width: 39, height: 84, scale_factor: 2.0 };
    profiles.mobile.medium = profiles.mobile.high;
    profiles
}

/// Frame template: opaque shell with a transparent screen area.
pub fn write_frame(path: &Path, (width, height): (u32, u32), area: ScreenArea) {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        let inside = x >= area.left
            && x < area.left + area.width
            && y >= area.top
            && y < area.top + area.height;
        if inside {
            Rgba([0, 0, 0, 0])
        } else {
            FRAME_COLOR
        }
    });
    img.save(path).expect("write frame");
}

pub struct Workspace {
    pub dir: TempDir,
    pub config: PipelineConfig,
}

/// Temp directories plus both frame templates.
pub fn workspace() -> Workspace {
    let dir = tempfile::tempdir().expect("tempdir");
    let assets = dir.path().join("assets");
    std::fs::create_dir_all(&assets).expect("assets dir");

    let profiles = small_profiles();
    let laptop_area = profiles.laptop.geometry.screen_area(LAPTOP_FRAME.0, LAPTOP_FRAME.1);
    write_frame(&assets.join(&profiles.laptop.frame_template), LAPTOP_FRAME, laptop_area);
    let mobile_area = profiles.mobile.geometry.screen_area(MOBILE_FRAME.0, MOBILE_FRAME.1);
    write_frame(&assets.join(&profiles.mobile.frame_template), MOBILE_FRAME, mobile_area);

    let config = PipelineConfig {
        assets_dir: assets,
        temp_dir: dir.path().join("temp"),
        output_dir: dir.path().join("generated"),
        profiles,
        ..Default::default()
    };
    Workspace { dir, config }
}

pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|rd| rd.count()).unwrap_or(0)
}
