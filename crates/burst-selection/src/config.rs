//! Culling configuration
//!
//! One [`CullConfig`] drives the whole run. The segmenter, scorer and resolver
//! are built from it, so defaults live here and nowhere else.
//!
//! Loaded from TOML with every key optional:
//!
//! ```toml
//! burst_threshold_seconds = 0.5
//! sharpness_weight = 0.8
//! exposure_weight = 0.2
//! center_weight = 2.0
//! rating_best = 5
//! rating_rest = 1
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::burst::BurstSegmenter;
use crate::quality::QualityScorer;
use crate::resolve::BurstResolver;

/// Highest star rating photo managers understand
pub const MAX_RATING: u8 = 5;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CullConfig {
    /// Largest gap between consecutive shots of one burst (seconds)
    pub burst_threshold_seconds: f64,
    pub sharpness_weight: f64,
    pub exposure_weight: f64,
    /// Extra weight for sharpness in the middle of the frame; 1.0 or less disables it
    pub center_weight: f64,
    /// Stars written to the best photo of each burst
    pub rating_best: u8,
    /// Stars written to every other photo
    pub rating_rest: u8,
}

impl Default for CullConfig {
    fn default() -> Self {
        Self {
            burst_threshold_seconds: 1.0,
            sharpness_weight: 0.7,
            exposure_weight: 0.3,
            // Birds are usually framed near the centre
            center_weight: 1.5,
            rating_best: 5,
            rating_rest: 1,
        }
    }
}

impl CullConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.burst_threshold_seconds.is_finite() || self.burst_threshold_seconds <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "burst_threshold_seconds must be a positive number, got {}",
                self.burst_threshold_seconds
            )));
        }
        for (name, value) in [
            ("sharpness_weight", self.sharpness_weight),
            ("exposure_weight", self.exposure_weight),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::Validation(format!("{} must be finite, got {}", name, value)));
            }
        }
        if !self.center_weight.is_finite() || self.center_weight < 0.0 {
            return Err(ConfigError::Validation(format!(
                "center_weight must be a non-negative number, got {}",
                self.center_weight
            )));
        }
        for (name, value) in [("rating_best", self.rating_best), ("rating_rest", self.rating_rest)] {
            if value > MAX_RATING {
                return Err(ConfigError::Validation(format!(
                    "{} must be between 0 and {}, got {}",
                    name, MAX_RATING, value
                )));
            }
        }
        Ok(())
    }

    pub fn segmenter(&self) -> Result<BurstSegmenter, ConfigError> {
        BurstSegmenter::new(self.burst_threshold_seconds)
    }

    pub fn scorer(&self) -> QualityScorer {
        QualityScorer::new(self.center_weight)
    }

    pub fn resolver(&self) -> BurstResolver {
        BurstResolver::new(self.sharpness_weight, self.exposure_weight)
    }
}
