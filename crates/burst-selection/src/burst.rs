//! Burst segmentation for BurstCull
//!
//! Splits a shooting session into bursts by walking the photos in capture
//! order and starting a new burst whenever the gap to the previous frame
//! exceeds a threshold. Frames within the same whole second are separated
//! using the camera's sub-second counter.

use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};
use crate::config::ConfigError;
use crate::quality::QualityScore;
use crate::record::{PhotoRecord, ScoredPhoto};

/// A chronologically contiguous, never empty run of photos.
/// Only the segmenter and resolver construct one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Burst {
    /// Photos in capture order
    photos: Vec<ScoredPhoto>,
    /// Index of the selected photo, set once the burst has been resolved
    best_index: Option<usize>,
}

impl Burst {
    pub(crate) fn open(first: ScoredPhoto) -> Self {
        Self {
            photos: vec![first],
            best_index: None,
        }
    }

    pub(crate) fn push(&mut self, photo: ScoredPhoto) {
        self.photos.push(photo);
    }

    pub(crate) fn resolved(photos: Vec<ScoredPhoto>, best_index: Option<usize>) -> Self {
        debug_assert!(!photos.is_empty(), "a burst always holds at least one photo");
        Self { photos, best_index }
    }

    pub fn photos(&self) -> &[ScoredPhoto] {
        &self.photos
    }

    pub fn into_photos(self) -> Vec<ScoredPhoto> {
        self.photos
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn start_time(&self) -> Option<NaiveDateTime> {
        self.photos.first().map(|p| p.record.timestamp)
    }

    pub fn end_time(&self) -> Option<NaiveDateTime> {
        self.photos.last().map(|p| p.record.timestamp)
    }

    pub fn best_index(&self) -> Option<usize> {
        self.best_index
    }

    /// The selected photo, if the burst has been resolved
    pub fn best_photo(&self) -> Option<&ScoredPhoto> {
        self.best_index.and_then(|idx| self.photos.get(idx))
    }

    /// Score every photo in parallel and return the burst once all are done.
    ///
    /// `scorer` returns `None` for photos that could not be decoded or scored;
    /// those keep their zero scores and stay in the burst.
    pub fn score_with<F>(self, scorer: F) -> Self
    where
        F: Fn(&PhotoRecord) -> Option<QualityScore> + Sync + Send,
    {
        let photos = self.photos
            .into_par_iter()
            .map(|photo| match scorer(&photo.record) {
                Some(quality) => photo.with_quality(quality),
                None => photo,
            })
            .collect();

        Self {
            photos,
            best_index: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BurstSegmenter {
    threshold_seconds: f64,
}

impl BurstSegmenter {
    pub fn new(threshold_seconds: f64) -> Result<Self, ConfigError> {
        if !threshold_seconds.is_finite() || threshold_seconds <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "burst threshold must be a positive number of seconds, got {}",
                threshold_seconds
            )));
        }
        Ok(Self { threshold_seconds })
    }

    pub fn threshold_seconds(&self) -> f64 {
        self.threshold_seconds
    }

    /// Partition photos into bursts.
    ///
    /// Every record ends up in exactly one burst; bursts and the photos inside
    /// them come out in capture order.
    pub fn segment(&self, mut records: Vec<PhotoRecord>) -> Vec<Burst> {
        if records.is_empty() {
            warn!("No photos to group into bursts");
            return Vec::new();
        }

        info!(
            photos = records.len(),
            threshold_seconds = self.threshold_seconds,
            "Grouping photos into bursts"
        );
        records.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let mut bursts: Vec<Burst> = Vec::new();
        for record in records {
            let joins_current = bursts
                .last()
                .and_then(|burst| burst.photos.last())
                .map(|previous| Self::gap_seconds(&previous.record, &record) <= self.threshold_seconds)
                .unwrap_or(false);

            let photo = ScoredPhoto::unscored(record);
            match bursts.last_mut() {
                Some(current) if joins_current => current.push(photo),
                _ => bursts.push(Burst::open(photo)),
            }
        }

        info!(bursts = bursts.len(), "Created bursts");
        bursts
    }

    /// Seconds between two consecutive photos.
    ///
    /// Within the same whole second the sub-second counters are compared as
    /// hundredths; if either does not parse the gap stays zero.
    fn gap_seconds(previous: &PhotoRecord, current: &PhotoRecord) -> f64 {
        let gap = current.timestamp
            .signed_duration_since(previous.timestamp)
            .num_milliseconds() as f64 / 1000.0;
        if gap != 0.0 {
            return gap;
        }

        match (previous.sub_second_hundredths(), current.sub_second_hundredths()) {
            (Some(prev), Some(cur)) => (cur - prev).abs() as f64 / 100.0,
            _ => {
                debug!(
                    previous = %previous.path.display(),
                    current = %current.path.display(),
                    "Unparseable sub-second counter, treating as same instant"
                );
                0.0
            }
        }
    }
}
