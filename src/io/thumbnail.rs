//! Thumbnail image export.
//!
//! `.jpg`/`.jpeg` paths are encoded as baseline JPEG at the requested
//! quality; any other extension is handed to `image`'s format inference
//! (PNG is the usual alternative).

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, ImageFormat, RgbImage};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default JPEG quality.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error writing {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode {path:?}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Unsupported output format for {0:?}")]
    UnsupportedFormat(PathBuf),

    #[error("JPEG quality must be in 1..=100, got {0}")]
    InvalidQuality(u8),
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false)
}

/// Write `image` to `path`, creating missing parent directories.
pub fn save_thumbnail(image: &RgbImage, path: &Path, quality: u8) -> Result<(), OutputError> {
    if !(1..=100).contains(&quality) {
        return Err(OutputError::InvalidQuality(quality));
    }

    let io_err = |source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    if is_jpeg(path) {
        let file = File::create(path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        JpegEncoder::new_with_quality(&mut writer, quality)
            .encode(image.as_raw(), image.width(), image.height(), ColorType::Rgb8)
            .map_err(|source| OutputError::Encode {
                path: path.to_path_buf(),
                source,
            })?;
        writer.flush().map_err(io_err)?;
    } else {
        let format = ImageFormat::from_path(path)
            .map_err(|_| OutputError::UnsupportedFormat(path.to_path_buf()))?;
        image
            .save_with_format(path, format)
            .map_err(|source| OutputError::Encode {
                path: path.to_path_buf(),
                source,
            })?;
    }

    tracing::debug!(path = %path.display(), "wrote thumbnail");
    Ok(())
}
