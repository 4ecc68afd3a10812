//! End-to-end culling run
//!
//! metadata -> bursts -> per-photo scores -> best pick -> ratings.
//!
//! Scoring is the only parallel stage; rating writes go out one at a time.
//!
//! The file-facing steps go through three small traits so the run can be
//! driven by exiftool in production and by in-memory fakes in tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use anyhow::{Context, Result};
use burst_selection::{Burst, CullConfig, PhotoRecord, QualityScore, QualityScorer, RatingDecision};
use exiftool_bridge::{ExiftoolRunner, PreviewExtractor};
use image::DynamicImage;
use rayon::prelude::*;
use tracing::{info, warn};
use crate::report::{BurstReport, CullReport, RunSummary};

/// Reads capture metadata for a batch of files
pub trait MetadataSource {
    fn read_metadata(&mut self, paths: &[PathBuf]) -> Result<Vec<PhotoRecord>>;
}

/// Produces the raster a photo is scored on. Called from worker threads.
pub trait PreviewDecoder: Sync {
    fn decode(&self, path: &Path) -> Result<DynamicImage>;
}

/// Persists a star rating
pub trait RatingSink {
    fn write_rating(&mut self, path: &Path, stars: u8) -> Result<()>;
}

impl MetadataSource for ExiftoolRunner {
    fn read_metadata(&mut self, paths: &[PathBuf]) -> Result<Vec<PhotoRecord>> {
        self.extract(paths)
    }
}

impl PreviewDecoder for PreviewExtractor {
    fn decode(&self, path: &Path) -> Result<DynamicImage> {
        PreviewExtractor::decode(self, path)
    }
}

impl RatingSink for ExiftoolRunner {
    fn write_rating(&mut self, path: &Path, stars: u8) -> Result<()> {
        ExiftoolRunner::write_rating(self, path, stars)
    }
}

/// Logs the rating each file would get and touches nothing
pub struct DryRun;

impl RatingSink for DryRun {
    fn write_rating(&mut self, path: &Path, stars: u8) -> Result<()> {
        info!(file = %path.display(), stars, "[dry run] would write rating");
        Ok(())
    }
}

/// Cull one session.
///
/// Decode, scoring and rating failures are logged and counted; only an
/// invalid config or a failed metadata read aborts the run.
pub fn run<M, P, R>(
    paths: &[PathBuf],
    config: &CullConfig,
    metadata: &mut M,
    previews: &P,
    ratings: &mut R,
    dry_run: bool,
) -> Result<CullReport>
where
    M: MetadataSource,
    P: PreviewDecoder,
    R: RatingSink,
{
    config.validate()?;
    let segmenter = config.segmenter()?;
    let scorer = config.scorer();
    let resolver = config.resolver();

    let records = metadata.read_metadata(paths)
        .context("Failed to read photo metadata")?;
    let photo_count = records.len();

    let bursts = segmenter.segment(records);
    let unscored = AtomicUsize::new(0);
    let mut summary = RunSummary {
        photos: photo_count,
        bursts: bursts.len(),
        dry_run,
        ..RunSummary::default()
    };

    let score = |record: &PhotoRecord| match score_photo(previews, &scorer, record) {
        Ok(quality) => Some(quality),
        Err(e) => {
            warn!(file = %record.path.display(), error = %format!("{:#}", e), "Leaving photo unscored");
            unscored.fetch_add(1, Ordering::Relaxed);
            None
        }
    };
    // Bursts are scored concurrently with each other as well as within
    let scored: Vec<Burst> = bursts
        .into_par_iter()
        .map(|burst| burst.score_with(&score))
        .collect();

    let mut reports = Vec::with_capacity(scored.len());
    for (idx, burst) in scored.into_iter().enumerate() {
        let resolved = resolver.resolve(burst);

        let decisions = RatingDecision::for_burst(&resolved, config.rating_best, config.rating_rest);
        for decision in &decisions {
            match ratings.write_rating(&decision.path, decision.rating) {
                Ok(()) if dry_run => {}
                Ok(()) => summary.ratings_written += 1,
                Err(e) => {
                    warn!(file = %decision.path.display(), error = %format!("{:#}", e), "Failed to write rating");
                    summary.rating_failures += 1;
                }
            }
        }

        reports.push(BurstReport::new(idx + 1, &resolved, &decisions));
    }

    summary.unscored = unscored.into_inner();
    info!(
        photos = summary.photos,
        bursts = summary.bursts,
        unscored = summary.unscored,
        ratings_written = summary.ratings_written,
        rating_failures = summary.rating_failures,
        "Culling finished"
    );

    Ok(CullReport {
        summary,
        bursts: reports,
    })
}

fn score_photo<P: PreviewDecoder>(previews: &P, scorer: &QualityScorer, record: &PhotoRecord) -> Result<QualityScore> {
    let preview = previews.decode(&record.path)
        .with_context(|| format!("Failed to decode preview for {}", record.path.display()))?;
    scorer.score(&preview)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use chrono::{NaiveDate, NaiveDateTime};
    use image::{GrayImage, Luma};
    use std::collections::HashMap;

    fn at(seconds: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(6, 30, 0).unwrap()
            + chrono::Duration::seconds(seconds)
    }

    /// Returns preset records regardless of the requested paths
    struct FakeMetadata {
        records: Vec<PhotoRecord>,
        fail: bool,
    }

    impl MetadataSource for FakeMetadata {
        fn read_metadata(&mut self, _paths: &[PathBuf]) -> Result<Vec<PhotoRecord>> {
            if self.fail {
                bail!("exiftool crashed");
            }
            Ok(self.records.clone())
        }
    }

    /// Rasters keyed by path; unknown paths fail to decode
    #[derive(Default)]
    struct FakePreviews {
        images: HashMap<PathBuf, GrayImage>,
    }

    impl PreviewDecoder for FakePreviews {
        fn decode(&self, path: &Path) -> Result<DynamicImage> {
            match self.images.get(path) {
                Some(image) => Ok(DynamicImage::ImageLuma8(image.clone())),
                None => bail!("corrupt preview"),
            }
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        written: Vec<(PathBuf, u8)>,
        fail_on: Option<PathBuf>,
    }

    impl RatingSink for RecordingSink {
        fn write_rating(&mut self, path: &Path, stars: u8) -> Result<()> {
            if self.fail_on.as_deref() == Some(path) {
                bail!("read-only file");
            }
            self.written.push((path.to_path_buf(), stars));
            Ok(())
        }
    }

    /// Mid-grey frame with a bright square whose edges are softened by `blur`
    fn frame(blur: f32) -> GrayImage {
        let sharp = GrayImage::from_fn(64, 64, |x, y| {
            if (16..48).contains(&x) && (16..48).contains(&y) { Luma([200]) } else { Luma([60]) }
        });
        if blur > 0.0 {
            image::imageops::blur(&sharp, blur)
        } else {
            sharp
        }
    }

    fn record(name: &str, seconds: i64, sub_second: &str) -> PhotoRecord {
        PhotoRecord::new(PathBuf::from(name), at(seconds), sub_second)
    }

    fn session() -> (FakeMetadata, FakePreviews) {
        let records = vec![
            record("b1_soft.nef", 0, "00"),
            record("b1_sharp.nef", 0, "20"),
            record("b1_softer.nef", 0, "40"),
            record("b2_only.nef", 10, "00"),
        ];
        let mut previews = FakePreviews::default();
        previews.images.insert(PathBuf::from("b1_soft.nef"), frame(1.5));
        previews.images.insert(PathBuf::from("b1_sharp.nef"), frame(0.0));
        previews.images.insert(PathBuf::from("b1_softer.nef"), frame(3.0));
        previews.images.insert(PathBuf::from("b2_only.nef"), frame(2.0));
        (FakeMetadata { records, fail: false }, previews)
    }

    fn paths(metadata: &FakeMetadata) -> Vec<PathBuf> {
        metadata.records.iter().map(|r| r.path.clone()).collect()
    }

    #[test]
    fn test_run_selects_sharpest_and_writes_ratings() -> Result<()> {
        let (mut metadata, previews) = session();
        let mut sink = RecordingSink::default();
        let paths = paths(&metadata);

        let report = run(&paths, &CullConfig::default(), &mut metadata, &previews, &mut sink, false)?;

        assert_eq!(report.summary.photos, 4);
        assert_eq!(report.summary.bursts, 2);
        assert_eq!(report.summary.unscored, 0);
        assert_eq!(report.summary.ratings_written, 4);
        assert_eq!(report.bursts.len(), 2);

        let best = report.bursts[0].best().unwrap();
        assert_eq!(best.path, PathBuf::from("b1_sharp.nef"));
        assert_eq!(report.bursts[1].best().unwrap().path, PathBuf::from("b2_only.nef"));

        let ratings: HashMap<PathBuf, u8> = sink.written.into_iter().collect();
        assert_eq!(ratings[Path::new("b1_sharp.nef")], 5);
        assert_eq!(ratings[Path::new("b1_soft.nef")], 1);
        assert_eq!(ratings[Path::new("b1_softer.nef")], 1);
        assert_eq!(ratings[Path::new("b2_only.nef")], 5);
        Ok(())
    }

    #[test]
    fn test_custom_ratings_from_config() -> Result<()> {
        let (mut metadata, previews) = session();
        let mut sink = RecordingSink::default();
        let config = CullConfig { rating_best: 4, rating_rest: 0, ..CullConfig::default() };

        run(&paths(&metadata), &config, &mut metadata, &previews, &mut sink, false)?;

        let mut stars: Vec<u8> = sink.written.iter().map(|(_, s)| *s).collect();
        stars.sort();
        assert_eq!(stars, vec![0, 0, 4, 4]);
        Ok(())
    }

    #[test]
    fn test_undecodable_photo_stays_in_burst() -> Result<()> {
        let (mut metadata, mut previews) = session();
        previews.images.remove(Path::new("b1_soft.nef"));
        let mut sink = RecordingSink::default();

        let report = run(&paths(&metadata), &CullConfig::default(), &mut metadata, &previews, &mut sink, false)?;

        assert_eq!(report.summary.unscored, 1);
        assert_eq!(report.bursts[0].photos.len(), 3);
        assert_eq!(report.bursts[0].best().unwrap().path, PathBuf::from("b1_sharp.nef"));
        assert_eq!(sink.written.len(), 4);
        Ok(())
    }

    #[test]
    fn test_run_completes_when_nothing_scores() -> Result<()> {
        let (mut metadata, _) = session();
        let previews = FakePreviews::default();
        let mut sink = RecordingSink::default();

        let report = run(&paths(&metadata), &CullConfig::default(), &mut metadata, &previews, &mut sink, false)?;

        assert_eq!(report.summary.unscored, 4);
        // All tied at zero, so the first frame of each burst wins
        assert_eq!(report.bursts[0].best().unwrap().path, PathBuf::from("b1_soft.nef"));
        assert_eq!(report.summary.ratings_written, 4);
        Ok(())
    }

    #[test]
    fn test_rating_failure_is_counted_not_fatal() -> Result<()> {
        let (mut metadata, previews) = session();
        let mut sink = RecordingSink {
            fail_on: Some(PathBuf::from("b1_softer.nef")),
            ..RecordingSink::default()
        };

        let report = run(&paths(&metadata), &CullConfig::default(), &mut metadata, &previews, &mut sink, false)?;

        assert_eq!(report.summary.ratings_written, 3);
        assert_eq!(report.summary.rating_failures, 1);
        Ok(())
    }

    #[test]
    fn test_dry_run_sink() -> Result<()> {
        let (mut metadata, previews) = session();
        let report = run(&paths(&metadata), &CullConfig::default(), &mut metadata, &previews, &mut DryRun, true)?;
        assert!(report.summary.dry_run);
        assert_eq!(report.summary.ratings_written, 0);
        assert_eq!(report.summary.rating_failures, 0);
        assert_eq!(report.bursts.len(), 2);
        Ok(())
    }

    #[test]
    fn test_many_single_frame_bursts() -> Result<()> {
        let records: Vec<PhotoRecord> = (0..24)
            .map(|i| record(&format!("single_{:02}.nef", i), i * 5, "00"))
            .collect();
        let mut previews = FakePreviews::default();
        for (i, r) in records.iter().enumerate() {
            previews.images.insert(r.path.clone(), frame((i % 4) as f32));
        }
        let mut metadata = FakeMetadata { records, fail: false };
        let mut sink = RecordingSink::default();

        let report = run(&paths(&metadata), &CullConfig::default(), &mut metadata, &previews, &mut sink, false)?;

        assert_eq!(report.summary.bursts, 24);
        assert_eq!(report.summary.unscored, 0);
        for (i, burst) in report.bursts.iter().enumerate() {
            assert_eq!(burst.number, i + 1);
            assert_eq!(burst.best().unwrap().path, PathBuf::from(format!("single_{:02}.nef", i)));
        }
        // Ratings still go out in capture order
        let written: Vec<&PathBuf> = sink.written.iter().map(|(p, _)| p).collect();
        let expected: Vec<PathBuf> = (0..24).map(|i| PathBuf::from(format!("single_{:02}.nef", i))).collect();
        assert_eq!(written, expected.iter().collect::<Vec<_>>());
        assert!(sink.written.iter().all(|(_, stars)| *stars == 5));
        Ok(())
    }

    #[test]
    fn test_empty_session() -> Result<()> {
        let mut metadata = FakeMetadata { records: Vec::new(), fail: false };
        let mut sink = RecordingSink::default();

        let report = run(&[], &CullConfig::default(), &mut metadata, &FakePreviews::default(), &mut sink, false)?;

        assert_eq!(report.summary.photos, 0);
        assert!(report.bursts.is_empty());
        assert!(sink.written.is_empty());
        Ok(())
    }

    #[test]
    fn test_metadata_failure_aborts() {
        let (mut metadata, previews) = session();
        metadata.fail = true;
        let mut sink = RecordingSink::default();

        let result = run(&paths(&metadata), &CullConfig::default(), &mut metadata, &previews, &mut sink, false);
        assert!(result.is_err());
        assert!(sink.written.is_empty());
    }

    #[test]
    fn test_invalid_config_aborts() {
        let (mut metadata, previews) = session();
        let config = CullConfig { burst_threshold_seconds: 0.0, ..CullConfig::default() };
        let mut sink = RecordingSink::default();

        assert!(run(&paths(&metadata), &config, &mut metadata, &previews, &mut sink, false).is_err());
    }
}
