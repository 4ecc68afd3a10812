//! Best-photo selection within a burst
//!
//! Raw sharpness is only meaningful relative to the other frames of the same
//! burst, so both metrics are min-max normalized per burst before they are
//! weighted and summed. The highest combined score wins; ties go to the
//! earliest frame.

use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::burst::Burst;
use crate::record::ScoredPhoto;

#[derive(Debug, Clone, Copy)]
pub struct BurstResolver {
    sharpness_weight: f64,
    exposure_weight: f64,
}

impl BurstResolver {
    /// Weights need not sum to 1 and may be negative.
    pub fn new(sharpness_weight: f64, exposure_weight: f64) -> Self {
        Self {
            sharpness_weight,
            exposure_weight,
        }
    }

    /// `(sharpness_weight, exposure_weight)`
    pub fn weights(&self) -> (f64, f64) {
        (self.sharpness_weight, self.exposure_weight)
    }

    /// Normalize, combine and pick the best photo of a fully scored burst.
    pub fn resolve(&self, burst: Burst) -> Burst {
        let photos: Vec<ScoredPhoto> = normalize_scores(burst.into_photos())
            .into_iter()
            .map(|photo| {
                let combined = photo.sharpness_score * self.sharpness_weight
                    + photo.exposure_score * self.exposure_weight;
                photo.with_combined(combined)
            })
            .collect();

        let best_index = select_best(&photos);
        if let Some(best) = best_index.and_then(|idx| photos.get(idx)) {
            debug!(
                photo = best.record.file_name(),
                combined = best.combined_score,
                frames = photos.len(),
                "Selected best photo"
            );
        }

        Burst::resolved(photos, best_index)
    }
}

/// Rescale sharpness and exposure independently to `[0, 1]` over the group.
///
/// A metric with no spread (including a lone photo) becomes 1.0 for every
/// photo, so the other metric decides.
pub fn normalize_scores(photos: Vec<ScoredPhoto>) -> Vec<ScoredPhoto> {
    let (sharp_lo, sharp_hi) = min_max(photos.iter().map(|p| p.sharpness_score));
    let (expo_lo, expo_hi) = min_max(photos.iter().map(|p| p.exposure_score));

    photos
        .into_iter()
        .map(|photo| {
            let sharpness = rescale(photo.sharpness_score, sharp_lo, sharp_hi);
            let exposure = rescale(photo.exposure_score, expo_lo, expo_hi);
            photo.with_normalized(sharpness, exposure)
        })
        .collect()
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

fn rescale(value: f64, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        (value - lo) / (hi - lo)
    } else {
        1.0
    }
}

/// Index of the highest combined score, first occurrence on ties
pub fn select_best(photos: &[ScoredPhoto]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, photo) in photos.iter().enumerate() {
        match best {
            Some((_, score)) if photo.combined_score <= score => {}
            _ => best = Some((idx, photo.combined_score)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Star rating to persist for one photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingDecision {
    pub path: PathBuf,
    pub rating: u8,
    pub is_best: bool,
}

impl RatingDecision {
    /// The best photo gets `rating_best`, every other photo `rating_rest`.
    pub fn for_burst(burst: &Burst, rating_best: u8, rating_rest: u8) -> Vec<Self> {
        burst
            .photos()
            .iter()
            .enumerate()
            .map(|(idx, photo)| {
                let is_best = burst.best_index() == Some(idx);
                Self {
                    path: photo.record.path.clone(),
                    rating: if is_best { rating_best } else { rating_rest },
                    is_best,
                }
            })
            .collect()
    }
}
