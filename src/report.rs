//! Run report written by `--output` and printed as the burst summary

use std::path::PathBuf;
use burst_selection::{Burst, RatingDecision};
use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct PhotoReport {
    pub path: PathBuf,
    pub timestamp: NaiveDateTime,
    pub sub_second: String,
    /// Normalized within the burst
    pub sharpness: f64,
    /// Normalized within the burst
    pub exposure: f64,
    pub combined: f64,
    pub rating: u8,
    pub is_best: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BurstReport {
    /// 1-based position in the session
    pub number: usize,
    pub best_index: Option<usize>,
    pub photos: Vec<PhotoReport>,
}

impl BurstReport {
    pub fn new(number: usize, burst: &Burst, decisions: &[RatingDecision]) -> Self {
        let photos = burst
            .photos()
            .iter()
            .zip(decisions)
            .map(|(photo, decision)| PhotoReport {
                path: photo.record.path.clone(),
                timestamp: photo.record.timestamp,
                sub_second: photo.record.sub_second.clone(),
                sharpness: photo.sharpness_score,
                exposure: photo.exposure_score,
                combined: photo.combined_score,
                rating: decision.rating,
                is_best: decision.is_best,
            })
            .collect();

        Self {
            number,
            best_index: burst.best_index(),
            photos,
        }
    }

    pub fn best(&self) -> Option<&PhotoReport> {
        self.best_index.and_then(|idx| self.photos.get(idx))
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub photos: usize,
    pub bursts: usize,
    /// Photos that kept zero scores because decoding or scoring failed
    pub unscored: usize,
    pub ratings_written: usize,
    pub rating_failures: usize,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CullReport {
    pub summary: RunSummary,
    pub bursts: Vec<BurstReport>,
}
