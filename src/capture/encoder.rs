//! JPEG encoding of captured frames.

use super::Frame;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Quality used when the configuration does not override it.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Errors that can occur while writing a photo.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("frame buffer does not match a {width}x{height} RGB image")]
    InvalidFrame { width: u32, height: u32 },
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("jpeg encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Encodes `frame` as JPEG into a new file at `path`.
///
/// Never overwrites an existing file. A partially written file is removed
/// on failure.
pub fn write_jpeg(frame: Frame, path: &Path, quality: u8) -> Result<(), EncodeError> {
    let (width, height) = (frame.width(), frame.height());
    let image = RgbImage::from_raw(width, height, frame.into_pixels())
        .ok_or(EncodeError::InvalidFrame { width, height })?;

    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|source| EncodeError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let result = encode_into(&image, file, quality.clamp(1, 100), path);
    if result.is_err() {
        let _ = fs::remove_file(path);
    }
    result
}

fn encode_into(
    image: &RgbImage,
    file: fs::File,
    quality: u8,
    path: &Path,
) -> Result<(), EncodeError> {
    let mut writer = BufWriter::new(file);
    image.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, quality))?;
    writer.flush().map_err(|source| EncodeError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::trace!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        quality,
        "Encoded JPEG"
    );
    Ok(())
}
