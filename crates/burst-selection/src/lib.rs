//! Burst segmentation and best-frame selection library for BurstCull
//!
//! This crate groups a shooting session into bursts by capture time, scores
//! decoded previews for sharpness and exposure, and picks the best frame of
//! each burst. It performs no file or process I/O.

pub mod burst;
pub mod config;
pub mod quality;
pub mod record;
pub mod resolve;

pub use burst::{Burst, BurstSegmenter};
pub use config::{ConfigError, CullConfig, MAX_RATING};
pub use quality::{QualityScore, QualityScorer};
pub use record::{PhotoRecord, ScoredPhoto, DEFAULT_SUB_SECOND};
pub use resolve::{normalize_scores, select_best, BurstResolver, RatingDecision};
