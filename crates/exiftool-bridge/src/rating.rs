//! Star rating persistence
//!
//! Ratings are written as three tags so every common photo manager sees
//! them: `XMP:Rating` (Lightroom, digiKam), `XMP:RatingPercent` (Windows
//! Explorer) and the EXIF-level `Rating`.

use std::path::Path;
use anyhow::{bail, Result};
use tracing::debug;
use crate::runner::ExiftoolRunner;

/// Windows Explorer's percent value for a star count.
/// Out-of-range star counts map to 0.
pub fn rating_percent(stars: u8) -> u8 {
    match stars {
        1 => 1,
        2 => 25,
        3 => 50,
        4 => 75,
        5 => 99,
        _ => 0,
    }
}

/// exiftool arguments that set `stars` on one file, without a backup copy
pub fn rating_args(file_path: &Path, stars: u8) -> Vec<String> {
    vec![
        "-overwrite_original".to_string(),
        format!("-XMP:Rating={}", stars),
        format!("-XMP:RatingPercent={}", rating_percent(stars)),
        format!("-Rating={}", stars),
        file_path.display().to_string(),
    ]
}

/// Interpret exiftool's write summary ("    1 image files updated").
///
/// A file whose tags already held the requested values counts as written.
pub fn check_write_summary(output: &str) -> Result<()> {
    for line in output.lines() {
        let line = line.trim();
        let Some((count, rest)) = line.split_once(' ') else {
            continue;
        };
        let Ok(count) = count.parse::<u32>() else {
            continue;
        };
        if count > 0 && (rest == "image files updated" || rest == "image files unchanged") {
            return Ok(());
        }
    }
    bail!("exiftool did not update the file: {}", output.trim())
}

impl ExiftoolRunner {
    /// Write a star rating into one file's metadata
    pub fn write_rating(&mut self, file_path: &Path, stars: u8) -> Result<()> {
        let output = self.execute(&rating_args(file_path, stars))?;
        check_write_summary(&output)?;
        debug!(file = %file_path.display(), stars, "Wrote rating");
        Ok(())
    }
}
