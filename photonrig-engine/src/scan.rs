//! Resumable event-stream scanning.
//!
//! A scan pages one event file through a [`HistogramEngine`], one clip per
//! engine call, and folds every chunk's histogram delta into running totals:
//!
//! 1. Open a clip at the current cursor and run the engine on it, passing
//!    the resume context of the previous call.
//! 2. Every `cancel_poll_interval` engine calls, poll the cancellation check
//!    before folding; if set, stop and report the partial totals as
//!    cancelled.
//! 3. If the engine returns the cursor it was given, the file is exhausted.
//!    The delta of that terminal call is **not** folded.
//! 4. Otherwise fold the delta, advance the cursor, report progress, repeat.
//!
//! Dropping the terminal delta matches the behavior of the acquisition
//! software this replaces. Engines are expected to return an empty delta on
//! the terminal call; a non-empty one is logged as a warning.

use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, info, warn};
use photonrig_core::{
    time_axis, AnalysisConfig, AnalysisKind, ChannelHistograms, ChannelId, Histogram,
    RawHistograms, RecipeParams, TimeUnit,
};

use crate::cancel::CancelCheck;
use crate::engine::{EventPosition, FormatCode, HistogramEngine, RunSettings};
use crate::{Error, Result};

/// Default number of engine calls between cancellation checks.
pub const DEFAULT_CANCEL_POLL_INTERVAL: usize = 100;

/// Parameters of one scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Bin count and width every delta must match.
    pub params: RecipeParams,
    /// Event file encoding.
    pub format: FormatCode,
    /// Settings passed to every engine run call.
    pub run: RunSettings,
    /// Engine calls between cancellation checks (at least 1).
    pub cancel_poll_interval: usize,
    /// Unit of the produced time axis.
    pub time_unit: TimeUnit,
}

impl ScanOptions {
    /// Options with default engine settings for the given parameters.
    #[must_use]
    pub fn new(params: RecipeParams) -> Self {
        Self {
            params,
            format: FormatCode::VENDOR,
            run: RunSettings::default(),
            cancel_poll_interval: DEFAULT_CANCEL_POLL_INTERVAL,
            time_unit: TimeUnit::Nanoseconds,
        }
    }

    /// Options for an analysis of `kind` under `config`.
    #[must_use]
    pub fn from_config(config: &AnalysisConfig, kind: AnalysisKind) -> Self {
        Self {
            params: config.recipe_params(kind),
            format: FormatCode(config.scan.format_code),
            run: RunSettings {
                group: config.scan.group.clone(),
                max_autofeed: config.scan.max_autofeed,
            },
            cancel_poll_interval: config.scan.cancel_poll_interval,
            time_unit: config.timing.time_unit,
        }
    }

    /// Set the cancellation poll interval. Values less than 1 are clamped to 1.
    #[must_use]
    pub fn with_cancel_poll_interval(mut self, interval: usize) -> Self {
        self.cancel_poll_interval = interval.max(1);
        self
    }

    /// Set the time axis unit.
    #[must_use]
    pub fn with_time_unit(mut self, unit: TimeUnit) -> Self {
        self.time_unit = unit;
        self
    }
}

/// Progress report sent after each folded chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanProgress {
    /// Chunks folded so far.
    pub iteration: usize,
    /// Cursor after the latest chunk.
    pub position: EventPosition,
}

/// How a scan ended.
#[derive(Debug, Clone)]
pub enum ScanOutcome<T> {
    /// The engine reached end of file.
    Completed(T),
    /// Cancellation was requested; `partial` must not be used as a result.
    Cancelled { partial: T },
}

impl<T> ScanOutcome<T> {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScanOutcome::Cancelled { .. })
    }

    /// The completed result, discarding partial state of a cancelled scan.
    #[must_use]
    pub fn completed(self) -> Option<T> {
        match self {
            ScanOutcome::Completed(value) => Some(value),
            ScanOutcome::Cancelled { .. } => None,
        }
    }

    /// Treat cancellation as an error.
    ///
    /// # Errors
    /// Returns [`Error::Cancelled`] for a cancelled scan.
    pub fn into_result(self) -> Result<T> {
        self.completed().ok_or(Error::Cancelled)
    }

    /// Map the carried value, keeping the outcome.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ScanOutcome<U> {
        match self {
            ScanOutcome::Completed(value) => ScanOutcome::Completed(f(value)),
            ScanOutcome::Cancelled { partial } => ScanOutcome::Cancelled {
                partial: f(partial),
            },
        }
    }
}

/// Which engine histograms a scan accumulates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistogramSelection {
    /// Exactly these names; each must be present in every delta.
    Named(Vec<String>),
    /// Everything the engine returns.
    All,
}

/// Accumulated named histograms of one scan.
#[derive(Debug, Clone, Default)]
pub struct NamedScan {
    pub histograms: BTreeMap<String, Histogram>,
    /// Chunks folded.
    pub iterations: usize,
    /// Engine run calls made, including the terminal one.
    pub engine_calls: usize,
    /// Cursor after the last folded chunk.
    pub position: EventPosition,
}

impl NamedScan {
    /// Plain count vectors keyed by name.
    #[must_use]
    pub fn into_raw(self) -> RawHistograms {
        self.histograms
            .into_iter()
            .map(|(name, hist)| (name, hist.into_counts()))
            .collect()
    }
}

/// Accumulated per-channel histograms of one scan with their time axis.
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub histograms: ChannelHistograms,
    /// `time_axis[i] = i * binsize`, in `time_unit`.
    pub time_axis: Vec<f64>,
    pub time_unit: TimeUnit,
    pub iterations: usize,
    pub engine_calls: usize,
    pub final_position: EventPosition,
}

fn fold(
    totals: &mut BTreeMap<String, Histogram>,
    delta: &RawHistograms,
    selection: &HistogramSelection,
    bins: usize,
) -> Result<()> {
    match selection {
        HistogramSelection::Named(_) => {
            // Check the whole delta before touching the totals.
            for name in totals.keys() {
                let counts = delta.get(name).ok_or_else(|| {
                    photonrig_core::Error::MissingChannel { name: name.clone() }
                })?;
                check_len(name, counts, bins)?;
            }
            for (name, total) in totals.iter_mut() {
                total.accumulate(name, &delta[name])?;
            }
        }
        HistogramSelection::All => {
            for (name, counts) in delta {
                check_len(name, counts, bins)?;
            }
            for (name, counts) in delta {
                totals
                    .entry(name.clone())
                    .or_insert_with(|| Histogram::zeros(bins))
                    .accumulate(name, counts)?;
            }
        }
    }
    Ok(())
}

fn check_len(name: &str, counts: &[u64], bins: usize) -> Result<()> {
    if counts.len() == bins {
        Ok(())
    } else {
        Err(photonrig_core::Error::HistogramLength {
            name: name.to_string(),
            expected: bins,
            actual: counts.len(),
        }
        .into())
    }
}

/// Scan `file` to the end, accumulating the selected engine histograms.
///
/// `progress` is called from the calling thread after every folded chunk.
/// `cancel` is polled on every engine call whose 1-based index is a multiple
/// of `options.cancel_poll_interval`, after the call and before its delta is
/// folded.
///
/// # Errors
/// Any clip or run failure aborts the scan; nothing accumulated is returned.
/// A delta missing a selected name or of the wrong length aborts with the
/// corresponding core error, and a cursor that moves backwards aborts with
/// [`Error::Engine`].
pub fn scan_named<E, P, C>(
    engine: &mut E,
    file: &Path,
    selection: &HistogramSelection,
    options: &ScanOptions,
    mut progress: P,
    cancel: &C,
) -> Result<ScanOutcome<NamedScan>>
where
    E: HistogramEngine + ?Sized,
    P: FnMut(ScanProgress),
    C: CancelCheck + ?Sized,
{
    let bins = options.params.bins;
    let poll_interval = options.cancel_poll_interval.max(1);

    let mut scan = NamedScan::default();
    if let HistogramSelection::Named(names) = selection {
        for name in names {
            scan.histograms
                .insert(name.clone(), Histogram::zeros(bins));
        }
    }

    info!(
        "Scanning {} ({} bins of {} ps)",
        file.display(),
        bins,
        options.params.binsize_ps
    );

    let mut position = EventPosition::START;
    let mut context = None;

    loop {
        let clip = engine.clips(file, position, options.format)?;
        let run = engine.run(clip, context.take(), &options.run)?;
        scan.engine_calls += 1;

        if scan.engine_calls % poll_interval == 0 && cancel.is_cancelled() {
            warn!(
                "Scan of {} cancelled after {} chunks",
                file.display(),
                scan.iterations
            );
            return Ok(ScanOutcome::Cancelled { partial: scan });
        }

        if run.position == position {
            let dropped: u64 = run.histograms.values().flatten().sum();
            if dropped > 0 {
                warn!("Discarding {dropped} counts from terminal chunk at position {position}");
            }
            break;
        }
        if run.position < position {
            return Err(Error::Engine(format!(
                "engine moved cursor backwards from {position} to {}",
                run.position
            )));
        }

        fold(&mut scan.histograms, &run.histograms, selection, bins)?;

        position = run.position;
        context = Some(run.context);
        scan.iterations += 1;
        scan.position = position;
        debug!("Chunk {} folded, position {position}", scan.iterations);
        progress(ScanProgress {
            iteration: scan.iterations,
            position,
        });
    }

    let total: u64 = scan.histograms.values().map(Histogram::total).sum();
    info!(
        "Scan of {} complete: {} chunks, position {}, {} counts",
        file.display(),
        scan.iterations,
        scan.position,
        total
    );
    Ok(ScanOutcome::Completed(scan))
}

/// Scan `file` to the end, accumulating one histogram per channel.
///
/// See [`scan_named`] for cancellation, progress and error semantics.
///
/// # Errors
/// A channel listed twice is rejected with
/// [`photonrig_core::Error::InvalidConfiguration`] before the engine is
/// called. Otherwise see [`scan_named`].
pub fn run_full_scan<E, P, C>(
    engine: &mut E,
    file: &Path,
    channels: &[ChannelId],
    options: &ScanOptions,
    progress: P,
    cancel: &C,
) -> Result<ScanOutcome<ScanResult>>
where
    E: HistogramEngine + ?Sized,
    P: FnMut(ScanProgress),
    C: CancelCheck + ?Sized,
{
    for (i, id) in channels.iter().enumerate() {
        if channels[..i].contains(id) {
            return Err(photonrig_core::Error::InvalidConfiguration(format!(
                "channel {id} listed more than once"
            ))
            .into());
        }
    }

    let selection = HistogramSelection::Named(channels.iter().map(|c| c.name()).collect());
    let outcome = scan_named(engine, file, &selection, options, progress, cancel)?;

    let axis = time_axis(
        options.params.bins,
        options.params.binsize_ps,
        options.time_unit,
    );
    Ok(outcome.map(|mut scan| {
        let histograms = channels
            .iter()
            .map(|&id| {
                let hist = scan
                    .histograms
                    .remove(&id.name())
                    .unwrap_or_else(|| Histogram::zeros(options.params.bins));
                (id, hist)
            })
            .collect();
        ScanResult {
            histograms,
            time_axis: axis,
            time_unit: options.time_unit,
            iterations: scan.iterations,
            engine_calls: scan.engine_calls,
            final_position: scan.position,
        }
    }))
}
