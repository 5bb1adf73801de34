//! Command-line interface for photonrig spectrometer analysis.
//!
//! Scans are replayed from recorded engine captures, so the binary runs
//! without the time-tagger hardware or its vendor engine.
#![allow(clippy::uninlined_format_args)]

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use photonrig_core::{
    AnalysisConfig, AnalysisKind, BinPlan, ChannelId, ColorModel, CorrelationPairSpec,
};
use photonrig_engine::{AnalysisSession, CancellationToken, Recipe, ReplayEngine, ScanProgress};
use serde_json::{json, Value};
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Core error: {0}")]
    Core(#[from] photonrig_core::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] photonrig_engine::Error),

    #[error("Invalid pair '{0}', expected two channel numbers like 2,3")]
    InvalidPair(String),

    #[error("Scan was cancelled")]
    Cancelled,
}

/// Color model selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Model {
    /// CIE 1931 approximation
    Cie,
    /// Piecewise-linear spectrum
    Simple,
}

impl From<Model> for ColorModel {
    fn from(model: Model) -> Self {
        match model {
            Model::Cie => ColorModel::Cie,
            Model::Simple => ColorModel::Simple,
        }
    }
}

/// Per-channel analysis selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    /// Counts per 0.1 s over the scan time
    Countrate,
    /// Counts versus time since trigger
    Lifetime,
}

impl From<Kind> for AnalysisKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Countrate => AnalysisKind::Countrate,
            Kind::Lifetime => AnalysisKind::Lifetime,
        }
    }
}

/// Time-tagged spectrometer analysis.
#[derive(Parser)]
#[command(name = "photonrig")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log progress and engine activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print wavelength bin edges and centers for the detector array
    Bins {
        /// Monochromator center wavelength (nm)
        #[arg(long, default_value = "729.1")]
        center: f64,

        /// Spectral width of one pixel (nm)
        #[arg(long, default_value = "0.6")]
        pixel_width: f64,

        /// Number of detector channels
        #[arg(long, default_value = "3")]
        channels: usize,
    },

    /// Print the display color of a wavelength
    Color {
        /// Wavelength (nm)
        wavelength: f64,

        /// Color model
        #[arg(short, long, value_enum, default_value = "cie")]
        model: Model,
    },

    /// Replay a capture and summarize every configured channel
    Scan {
        /// Recorded engine capture (JSON)
        #[arg(long)]
        capture: PathBuf,

        /// Engine recipe (JSON)
        #[arg(short, long)]
        recipe: PathBuf,

        /// Analysis configuration (JSON); defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Analysis kind
        #[arg(short, long, value_enum, default_value = "lifetime")]
        kind: Kind,

        /// Color model for channel colors
        #[arg(short, long, value_enum, default_value = "cie")]
        model: Model,
    },

    /// Replay a capture and merge photon-pair correlation histograms
    Correlate {
        /// Recorded engine capture (JSON)
        #[arg(long)]
        capture: PathBuf,

        /// Engine recipe (JSON)
        #[arg(short, long)]
        recipe: PathBuf,

        /// Analysis configuration (JSON); defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Channel pair as two channel numbers, e.g. 2,3 (repeatable)
        #[arg(short, long = "pair", required = true)]
        pairs: Vec<String>,
    },
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    Ok(match path {
        Some(path) => AnalysisConfig::from_file(path)?,
        None => AnalysisConfig::default(),
    })
}

fn parse_pair(text: &str) -> Result<CorrelationPairSpec> {
    let invalid = || CliError::InvalidPair(text.to_string());
    let (a, b) = text.split_once(',').ok_or_else(invalid)?;
    let a: ChannelId = a.trim().parse().map_err(|_| invalid())?;
    let b: ChannelId = b.trim().parse().map_err(|_| invalid())?;
    if a == b {
        return Err(invalid());
    }
    Ok(CorrelationPairSpec::between(a, b))
}

fn report_progress(verbose: bool) -> impl FnMut(ScanProgress) {
    move |p: ScanProgress| {
        if verbose {
            eprintln!("  chunk {} (position {})", p.iteration, p.position);
        }
    }
}

fn print_json(value: &Value) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Bins {
            center,
            pixel_width,
            channels,
        } => {
            let plan = BinPlan::compute(center, pixel_width, channels)?;
            print_json(&json!({
                "edges": plan.edges(),
                "centers": plan.centers(),
            }))?;
        }

        Commands::Color { wavelength, model } => {
            let color = ColorModel::from(model).apply(wavelength);
            println!("{}", color.to_hex());
        }

        Commands::Scan {
            capture,
            recipe,
            config,
            kind,
            model,
        } => {
            let config = load_config(config.as_deref())?;
            let recipe = Recipe::from_file(&recipe)?;
            let start = Instant::now();

            let mut session =
                AnalysisSession::new(ReplayEngine::new(), config, kind.into(), &recipe)?
                    .with_color_model(model.into());
            let cancel = CancellationToken::new();
            let channels = session
                .analyze(&capture, report_progress(cli.verbose), &cancel)?
                .completed()
                .ok_or(CliError::Cancelled)?;

            info!(
                "Summarized {} channels in {:.2?}",
                channels.len(),
                start.elapsed()
            );
            let records: Vec<Value> = channels
                .iter()
                .map(|c| {
                    json!({
                        "channel": c.id,
                        "wavelength_nm": c.wavelength,
                        "color": c.color.to_hex(),
                        "total_counts": c.total_counts,
                        "peak_bin_index": c.peak_bin_index,
                        "lifetime": c.lifetime_value,
                        "histogram": c.histogram,
                    })
                })
                .collect();
            print_json(&json!({
                "kind": session.kind(),
                "time_unit": session.config().timing.time_unit,
                "channels": records,
            }))?;
        }

        Commands::Correlate {
            capture,
            recipe,
            config,
            pairs,
        } => {
            let config = load_config(config.as_deref())?;
            let recipe = Recipe::from_file(&recipe)?;
            let specs = pairs
                .iter()
                .map(|p| parse_pair(p))
                .collect::<Result<Vec<_>>>()?;

            let mut session = AnalysisSession::new(
                ReplayEngine::new(),
                config,
                AnalysisKind::Correlation,
                &recipe,
            )?;
            let cancel = CancellationToken::new();
            let merged = session
                .correlate(&capture, &specs, report_progress(cli.verbose), &cancel)?
                .completed()
                .ok_or(CliError::Cancelled)?;

            let out: BTreeMap<String, Value> = merged
                .into_iter()
                .map(|(label, result)| {
                    let value = match result {
                        Ok(pair) => json!({
                            "delay_ns": pair.delay_axis,
                            "counts": pair.histogram,
                        }),
                        Err(e) => json!({ "error": e.to_string() }),
                    };
                    (label, value)
                })
                .collect();
            print_json(&serde_json::to_value(out)?)?;
        }
    }

    Ok(())
}
