use std::path::{Path, PathBuf};
use anyhow::{bail, Context, Result};
use burst_selection::CullConfig;
use burstcull::{pipeline, scan_folder, CullReport, DryRun};
use clap::Parser;
use exiftool_bridge::{is_available, ExiftoolRunner, PreviewExtractor, DEFAULT_PROGRAM};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "burstcull")]
#[command(about = "Picks the sharpest, best-exposed frame of every burst and rates it")]
struct Cli {
    /// Folder containing the session's RAW/JPEG files
    directory: PathBuf,

    /// TOML file with culling settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum gap between frames of one burst (seconds)
    #[arg(long)]
    burst_threshold: Option<f64>,

    #[arg(long)]
    sharpness_weight: Option<f64>,

    #[arg(long)]
    exposure_weight: Option<f64>,

    /// Weight of the centre region in the sharpness score
    #[arg(long)]
    center_weight: Option<f64>,

    /// Stars given to the best frame of each burst
    #[arg(long)]
    rating_best: Option<u8>,

    /// Stars given to every other frame
    #[arg(long)]
    rating_rest: Option<u8>,

    /// Score and report without writing ratings
    #[arg(long)]
    dry_run: bool,

    /// Debug logging and per-burst scores
    #[arg(short, long)]
    verbose: bool,

    /// exiftool executable
    #[arg(long, default_value = DEFAULT_PROGRAM)]
    exiftool: PathBuf,

    /// Write the full report as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Cli {
    /// Config file (or defaults) with command-line values layered on top
    fn resolve_config(&self) -> Result<CullConfig> {
        let mut config = match &self.config {
            Some(path) => CullConfig::load(path)?,
            None => CullConfig::default(),
        };

        if let Some(v) = self.burst_threshold {
            config.burst_threshold_seconds = v;
        }
        if let Some(v) = self.sharpness_weight {
            config.sharpness_weight = v;
        }
        if let Some(v) = self.exposure_weight {
            config.exposure_weight = v;
        }
        if let Some(v) = self.center_weight {
            config.center_weight = v;
        }
        if let Some(v) = self.rating_best {
            config.rating_best = v;
        }
        if let Some(v) = self.rating_rest {
            config.rating_rest = v;
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env("RUST_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.resolve_config()?;

    if !is_available(&cli.exiftool) {
        bail!(
            "exiftool not found at '{}'. Install it or pass --exiftool <PATH>",
            cli.exiftool.display()
        );
    }

    let paths = scan_folder(&cli.directory)?;
    if paths.is_empty() {
        println!("No supported image files found in {}", cli.directory.display());
        return Ok(());
    }
    info!(files = paths.len(), folder = %cli.directory.display(), "Scanned session folder");

    let mut reader = ExiftoolRunner::new(&cli.exiftool)?;
    info!(exiftool = %reader.program().display(), dry_run = cli.dry_run, "Culling session");
    let previews = PreviewExtractor::new(&cli.exiftool);

    let report = if cli.dry_run {
        pipeline::run(&paths, &config, &mut reader, &previews, &mut DryRun, true)?
    } else {
        let mut writer = ExiftoolRunner::new(&cli.exiftool)?;
        pipeline::run(&paths, &config, &mut reader, &previews, &mut writer, false)?
    };

    print_summary(&report, cli.verbose);

    if let Some(output_path) = &cli.output {
        write_report(&report, output_path)?;
        println!("Report saved to: {}", output_path.display());
    }

    Ok(())
}

fn write_report(report: &CullReport, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .context("Failed to serialize cull report to JSON")?;
    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write output to {}", output_path.display()))
}

fn print_summary(report: &CullReport, verbose: bool) {
    let summary = &report.summary;

    println!("\nCULL RESULTS{}", if summary.dry_run { " (dry run)" } else { "" });
    println!("============");
    println!("Photos:  {}", summary.photos);
    println!("Bursts:  {}", summary.bursts);
    if summary.unscored > 0 {
        println!("Unscored: {} (preview could not be decoded)", summary.unscored);
    }
    if !summary.dry_run {
        println!("Ratings written: {}", summary.ratings_written);
        if summary.rating_failures > 0 {
            println!("Rating failures: {}", summary.rating_failures);
        }
    }

    println!();
    for burst in &report.bursts {
        let Some(best) = burst.best() else {
            continue;
        };
        let name = best
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| best.path.display().to_string());

        println!("Burst {:>3}  {:>3} photos  best: {}", burst.number, burst.photos.len(), name);
        if verbose {
            println!(
                "           sharpness {:.3}  exposure {:.3}  combined {:.3}",
                best.sharpness, best.exposure, best.combined
            );
        }
    }
}
