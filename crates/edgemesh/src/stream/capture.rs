//! Screen-capture collaborator contract and the frame encode/downscale
//! pipeline that turns captured frames into bounded JPEG payloads.

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::{imageops::FilterType, RgbImage};

/// Maximum size of a single frame sent over the data channel, chosen to
/// stay well under typical SCTP/DataChannel message limits.
pub const MAX_FRAME_BYTES: usize = 63 * 1024;
const RESCALE_ATTEMPTS: u32 = 4;
const RESCALE_FACTOR: f32 = 0.7;
const QUALITY_STEP: u8 = 10;
const MIN_QUALITY: u8 = 20;

/// A single captured frame: raw RGB8 pixels plus dimensions.
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

/// OS-specific screen scraper. The
/// coordinator depends only on this trait; an actual capture backend is
/// wired in per-platform outside this crate's concerns.
#[async_trait]
pub trait ScreenCapture: Send + Sync {
    async fn capture(&self, monitor_index: i32) -> Option<RawFrame>;

    /// Number of monitors this collaborator can capture from. `StreamManager::start`
    /// rejects any `monitor_index` outside `0..monitor_count()`.
    async fn monitor_count(&self) -> usize;
}

/// Capture backend that never produces a frame, used when no platform
/// scraper is wired in. `StreamManager::start` still succeeds (the SDP
/// offer is negotiated); the capture loop simply never sends data.
pub struct UnavailableCapture;

#[async_trait]
impl ScreenCapture for UnavailableCapture {
    async fn capture(&self, _monitor_index: i32) -> Option<RawFrame> {
        None
    }

    async fn monitor_count(&self) -> usize {
        0
    }
}

/// Downscales by `0.5`, JPEG-encodes at `quality`, and if still over
/// [`MAX_FRAME_BYTES`] retries up to [`RESCALE_ATTEMPTS`] times, shrinking
/// by a further `0.7x` and stepping quality down by 10 (floor 20) each
/// attempt. Drops the frame (returns `None`) if still oversize.
pub fn encode_frame(frame: &RawFrame, starting_quality: u8) -> Option<Vec<u8>> {
    let initial = resize(frame, 0.5);
    let mut quality = starting_quality;
    let mut image = initial;

    for attempt in 0..=RESCALE_ATTEMPTS {
        if let Some(bytes) = try_encode(&image, quality) {
            if bytes.len() <= MAX_FRAME_BYTES {
                return Some(bytes);
            }
        }
        if attempt == RESCALE_ATTEMPTS {
            break;
        }
        image = resize_image(&image, RESCALE_FACTOR);
        quality = quality.saturating_sub(QUALITY_STEP).max(MIN_QUALITY);
    }
    None
}

fn resize(frame: &RawFrame, factor: f32) -> RgbImage {
    let img = RgbImage::from_raw(frame.width, frame.height, frame.rgb.clone())
        .unwrap_or_else(|| RgbImage::new(frame.width.max(1), frame.height.max(1)));
    resize_image(&img, factor)
}

fn resize_image(img: &RgbImage, factor: f32) -> RgbImage {
    let new_w = ((img.width() as f32) * factor).max(1.0) as u32;
    let new_h = ((img.height() as f32) * factor).max(1.0) as u32;
    image::imageops::resize(img, new_w, new_h, FilterType::Triangle)
}

fn try_encode(img: &RgbImage, quality: u8) -> Option<Vec<u8>> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder.encode(img, img.width(), img.height(), image::ExtendedColorType::Rgb8).ok()?;
    Some(buf)
}

#[path = "capture_tests.rs"]
#[cfg(test)]
mod capture_tests;
