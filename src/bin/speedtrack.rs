//! `speedtrack` CLI: replay recorded detections into the speed store and fit
//! ground-plane homographies.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use speedtrack::estimator::mps_to_kmh;
use speedtrack::projector::CalibrationFile;
use speedtrack::replay::read_frames;
use speedtrack::{SpeedConfig, SpeedTracker};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "speedtrack", about = "Per-track speed estimation from tracked detections")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate speeds for a recorded `timestamp:[detections]` log.
    Replay {
        /// Detection log, one frame per line
        input: PathBuf,
        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        /// SQLite database to append speed rows to
        #[arg(long, conflicts_with = "no_store")]
        db: Option<PathBuf>,
        /// Estimate only, do not write to a database
        #[arg(long)]
        no_store: bool,
        /// Raw units per meter
        #[arg(long)]
        scale: Option<f64>,
        /// History window size
        #[arg(long)]
        window: Option<usize>,
        /// Row-major 3x3 homography, nine comma separated numbers
        #[arg(long)]
        homography: Option<String>,
        /// Print speeds in km/h instead of units per second
        #[arg(long)]
        kmh: bool,
    },
    /// Fit an image-to-ground homography from point correspondences.
    Calibrate {
        /// Image point `x,y` (repeat, at least 4)
        #[arg(long = "image", value_parser = parse_point, required = true)]
        image: Vec<(f64, f64)>,
        /// Matching ground point `x,y` in meters (same order as --image)
        #[arg(long = "world", value_parser = parse_point, required = true)]
        world: Vec<(f64, f64)>,
        /// Write the calibration JSON here
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn parse_point(s: &str) -> Result<(f64, f64), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, got `{}`", s))?;

    let x = x.trim().parse().map_err(|_| format!("bad x in `{}`", s))?;
    let y = y.trim().parse().map_err(|_| format!("bad y in `{}`", s))?;

    Ok((x, y))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("speedtrack=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            input,
            config,
            db,
            no_store,
            scale,
            window,
            homography,
            kmh,
        } => {
            let mut cfg = match config {
                Some(path) => SpeedConfig::load(&path)
                    .with_context(|| format!("loading config {:?}", path))?,
                None => SpeedConfig::default(),
            };

            if let Some(scale) = scale {
                cfg.scale_factor = scale;
            }
            if let Some(window) = window {
                cfg.window_size = window;
            }
            if homography.is_some() {
                cfg.homography = homography;
            }
            if db.is_some() {
                cfg.storage_path = db;
            }
            if no_store {
                cfg.storage_path = None;
            }

            run_replay(&input, cfg, kmh)?;
        }
        Commands::Calibrate {
            image,
            world,
            output,
        } => {
            run_calibrate(&image, &world, output)?;
        }
    }

    Ok(())
}

fn run_replay(input: &std::path::Path, cfg: SpeedConfig, kmh: bool) -> Result<()> {
    let file = File::open(input).with_context(|| format!("opening {:?}", input))?;
    let mut tracker = SpeedTracker::open(cfg);

    let start = std::time::Instant::now();
    let mut records = 0usize;
    let mut skipped = 0usize;

    for frame in read_frames(BufReader::new(file)) {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                warn!("{}", err);
                skipped += 1;
                continue;
            }
        };

        for r in tracker.process_frame(&frame) {
            let speed = if kmh { mps_to_kmh(r.speed) } else { r.speed };
            println!("{:.3} {} {:.2}", r.timestamp, r.track_id, speed);
            records += 1;
        }
    }

    info!(
        "Processed {} frames in {:.2?}: {} records, {} tracks, {} skipped lines, {} failed writes",
        tracker.frames(),
        start.elapsed(),
        records,
        tracker.track_count(),
        skipped,
        tracker.failed_flushes()
    );

    Ok(())
}

fn run_calibrate(image: &[(f64, f64)], world: &[(f64, f64)], output: Option<PathBuf>) -> Result<()> {
    if image.len() != world.len() {
        bail!(
            "{} --image points but {} --world points",
            image.len(),
            world.len()
        );
    }

    let file = CalibrationFile::new(image, world)?;
    println!("{}", file.homography());

    if let Some(path) = output {
        file.save(&path)
            .with_context(|| format!("writing {:?}", path))?;
        info!("Saved calibration to {:?}", path);
    }

    Ok(())
}
