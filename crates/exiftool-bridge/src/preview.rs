//! Preview decoding for quality scoring
//!
//! RAW files carry one or more embedded JPEGs; decoding those is far cheaper
//! than demosaicing the sensor data and plenty for judging focus and
//! clipping. Other formats are decoded directly with the `image` crate.

use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Command;
use anyhow::{bail, Context, Result};
use image::{DynamicImage, ImageReader};
use tracing::debug;

/// Extensions handled through the embedded-preview path
pub const RAW_EXTENSIONS: &[&str] = &["cr2", "cr3", "nef", "arw", "raf", "dng", "rw2", "orf", "raw"];

/// Check if this is a RAW file based on extension
pub fn is_raw_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| RAW_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Embedded image tags, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewTag {
    /// Mid-size preview most bodies write alongside the RAW data
    PreviewImage,
    /// Full-resolution JPEG (Nikon, Canon CR2)
    JpgFromRaw,
    /// Small thumbnail, last resort
    ThumbnailImage,
}

impl PreviewTag {
    pub const FALLBACK_ORDER: [PreviewTag; 3] = [
        PreviewTag::PreviewImage,
        PreviewTag::JpgFromRaw,
        PreviewTag::ThumbnailImage,
    ];

    pub fn exiftool_tag(&self) -> &'static str {
        match self {
            PreviewTag::PreviewImage => "PreviewImage",
            PreviewTag::JpgFromRaw => "JpgFromRaw",
            PreviewTag::ThumbnailImage => "ThumbnailImage",
        }
    }
}

impl fmt::Display for PreviewTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.exiftool_tag())
    }
}

/// Decodes the raster a photo is scored on
#[derive(Debug, Clone)]
pub struct PreviewExtractor {
    program: PathBuf,
}

impl PreviewExtractor {
    pub fn new(program: &Path) -> Self {
        Self {
            program: program.to_path_buf(),
        }
    }

    /// Decode the preview for one file
    pub fn decode(&self, file_path: &Path) -> Result<DynamicImage> {
        if is_raw_path(file_path) {
            self.decode_embedded(file_path)
        } else {
            ImageReader::open(file_path)
                .with_context(|| format!("Failed to open {}", file_path.display()))?
                .with_guessed_format()?
                .decode()
                .with_context(|| format!("Failed to decode {}", file_path.display()))
        }
    }

    fn decode_embedded(&self, file_path: &Path) -> Result<DynamicImage> {
        first_decodable_preview(file_path, |tag| self.extract_embedded_jpeg(file_path, tag))
    }

    /// Extract embedded JPEG from a RAW file using exiftool
    fn extract_embedded_jpeg(&self, file_path: &Path, tag: PreviewTag) -> Result<Vec<u8>> {
        let output = Command::new(&self.program)
            .arg("-b") // Binary output
            .arg(format!("-{}", tag.exiftool_tag()))
            .arg(file_path)
            .output()
            .with_context(|| format!("Failed to run {} on {}", self.program.display(), file_path.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("exiftool failed: {}", stderr.trim());
        }

        if output.stdout.is_empty() {
            bail!("tag is empty");
        }

        Ok(output.stdout)
    }
}

/// Walk [`PreviewTag::FALLBACK_ORDER`] and return the first payload that
/// both extracts and decodes.
fn first_decodable_preview<F>(file_path: &Path, mut extract: F) -> Result<DynamicImage>
where
    F: FnMut(PreviewTag) -> Result<Vec<u8>>,
{
    let mut failures = Vec::new();
    for tag in PreviewTag::FALLBACK_ORDER {
        match extract(tag).and_then(|data| decode_bytes(&data)) {
            Ok(image) => return Ok(image),
            Err(e) => {
                debug!(file = %file_path.display(), %tag, error = %e, "Embedded preview unusable");
                failures.push(format!("{}: {}", tag, e));
            }
        }
    }
    bail!("No usable embedded preview in {} ({})", file_path.display(), failures.join("; "))
}

/// Decode an in-memory encoded image, guessing the format from its header
pub fn decode_bytes(data: &[u8]) -> Result<DynamicImage> {
    let image = ImageReader::new(Cursor::new(data))
        .with_guessed_format()?
        .decode()?;
    Ok(image)
}
