//! Per-photo records for BurstCull
//!
//! A [`PhotoRecord`] is the immutable capture metadata of one file. A
//! [`ScoredPhoto`] wraps a record with the scores the pipeline attaches to it;
//! every scoring stage consumes the previous value and returns a new one.

use std::path::{Path, PathBuf};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use crate::quality::QualityScore;

/// Sub-second value assumed when the camera did not record one
pub const DEFAULT_SUB_SECOND: &str = "00";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    /// Source file. Only used as a label by the selection core.
    pub path: PathBuf,
    /// Capture time at whole-second resolution
    pub timestamp: NaiveDateTime,
    /// Fractional-second counter as written by the camera (usually hundredths)
    pub sub_second: String,
    pub iso: Option<u32>,
    /// Display form, e.g. "1/2000"
    pub shutter_speed: Option<String>,
    /// f-number
    pub aperture: Option<f64>,
}

impl PhotoRecord {
    /// Create a record with the required timing fields only
    pub fn new(path: PathBuf, timestamp: NaiveDateTime, sub_second: impl Into<String>) -> Self {
        Self {
            path,
            timestamp,
            sub_second: sub_second.into(),
            iso: None,
            shutter_speed: None,
            aperture: None,
        }
    }

    /// Chronological sort key.
    ///
    /// Sub-seconds compare as raw strings, so "10" orders before "9".
    pub fn sort_key(&self) -> (NaiveDateTime, &str) {
        (self.timestamp, self.sub_second.as_str())
    }

    /// Sub-second counter as an integer, if it parses
    pub fn sub_second_hundredths(&self) -> Option<i64> {
        self.sub_second.trim().parse().ok()
    }

    pub fn file_name(&self) -> &str {
        label_for(&self.path)
    }
}

fn label_for(path: &Path) -> &str {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("unknown")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPhoto {
    pub record: PhotoRecord,
    pub sharpness_score: f64,
    pub exposure_score: f64,
    pub combined_score: f64,
}

impl ScoredPhoto {
    /// Wrap a record with all scores at zero
    pub fn unscored(record: PhotoRecord) -> Self {
        Self {
            record,
            sharpness_score: 0.0,
            exposure_score: 0.0,
            combined_score: 0.0,
        }
    }

    /// Attach raw scorer output
    pub fn with_quality(self, quality: QualityScore) -> Self {
        Self {
            sharpness_score: quality.sharpness,
            exposure_score: quality.exposure,
            ..self
        }
    }

    pub(crate) fn with_normalized(self, sharpness_score: f64, exposure_score: f64) -> Self {
        Self {
            sharpness_score,
            exposure_score,
            ..self
        }
    }

    pub(crate) fn with_combined(self, combined_score: f64) -> Self {
        Self {
            combined_score,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32, min: u32, sec: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(hour, min, sec)
            .unwrap()
    }

    #[test]
    fn test_sub_second_parsing() {
        let record = PhotoRecord::new(PathBuf::from("a.cr2"), at(12, 0, 0), "50");
        assert_eq!(record.sub_second_hundredths(), Some(50));

        let padded = PhotoRecord::new(PathBuf::from("b.cr2"), at(12, 0, 0), " 07 ");
        assert_eq!(padded.sub_second_hundredths(), Some(7));

        let garbage = PhotoRecord::new(PathBuf::from("c.cr2"), at(12, 0, 0), "n/a");
        assert_eq!(garbage.sub_second_hundredths(), None);
    }

    #[test]
    fn test_sort_key_compares_sub_seconds_as_strings() {
        let nine = PhotoRecord::new(PathBuf::from("a.cr2"), at(12, 0, 0), "9");
        let ten = PhotoRecord::new(PathBuf::from("b.cr2"), at(12, 0, 0), "10");
        assert!(ten.sort_key() < nine.sort_key());

        let later = PhotoRecord::new(PathBuf::from("c.cr2"), at(12, 0, 1), "00");
        assert!(nine.sort_key() < later.sort_key());
    }

    #[test]
    fn test_scored_photo_stages() {
        let record = PhotoRecord::new(PathBuf::from("/shoot/IMG_0001.CR2"), at(8, 15, 0), "00");
        assert_eq!(record.file_name(), "IMG_0001.CR2");

        let photo = ScoredPhoto::unscored(record.clone());
        assert_eq!(photo.sharpness_score, 0.0);
        assert_eq!(photo.exposure_score, 0.0);
        assert_eq!(photo.combined_score, 0.0);

        let scored = photo.with_quality(QualityScore { sharpness: 412.5, exposure: 0.9 });
        assert_eq!(scored.sharpness_score, 412.5);
        assert_eq!(scored.exposure_score, 0.9);
        assert_eq!(scored.combined_score, 0.0);
        assert_eq!(scored.record, record);
    }
}
