/// Still development
///
/// Turns the frame picked by the shutter into a JPEG still in the capture
/// directory plus a small in-memory preview.
use chrono::Utc;
use image::codecs::jpeg::JpegEncoder;
use image::{imageops::FilterType, DynamicImage};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use super::CaptureError;
use crate::state::data::CapturedPhoto;

/// Longest edge of the on-screen preview
const PREVIEW_SIZE: u32 = 400;
/// Quality of the still sent for identification
const STILL_QUALITY: u8 = 90;
/// Quality of the on-screen preview
const PREVIEW_QUALITY: u8 = 80;

/// Name prefix and extension of every still in the capture directory
pub(crate) const STILL_PREFIX: &str = "capture-";
pub(crate) const STILL_EXTENSION: &str = "jpg";

/// Develop `frame` into a still under `capture_dir`
pub async fn develop(frame: PathBuf, capture_dir: PathBuf) -> Result<CapturedPhoto, CaptureError> {
    // Spawn blocking task for CPU-bound work
    tokio::task::spawn_blocking(move || develop_blocking(&frame, &capture_dir)).await?
}

fn develop_blocking(frame: &Path, capture_dir: &Path) -> Result<CapturedPhoto, CaptureError> {
    let captured_at = Utc::now();

    // JPEG has no alpha channel
    let image = DynamicImage::ImageRgb8(image::open(frame)?.to_rgb8());

    fs::create_dir_all(capture_dir)?;
    let path = capture_dir.join(format!(
        "{}{}.{}",
        STILL_PREFIX,
        captured_at.format("%Y%m%dT%H%M%S%.9f"),
        STILL_EXTENSION
    ));

    let writer = BufWriter::new(File::create(&path)?);
    if let Err(e) = image.write_with_encoder(JpegEncoder::new_with_quality(writer, STILL_QUALITY)) {
        let _ = fs::remove_file(&path);
        return Err(e.into());
    }

    let preview = image.resize(PREVIEW_SIZE, PREVIEW_SIZE, FilterType::Lanczos3);
    let mut preview_jpeg = Vec::new();
    preview.write_with_encoder(JpegEncoder::new_with_quality(&mut preview_jpeg, PREVIEW_QUALITY))?;

    tracing::info!(
        "📸 Captured {}x{} still: {}",
        image.width(),
        image.height(),
        path.display()
    );

    Ok(CapturedPhoto {
        path,
        captured_at,
        width: image.width(),
        height: image.height(),
        preview_jpeg,
    })
}
