//! Analysis sessions.
//!
//! An [`AnalysisSession`] owns everything one analysis needs: the engine
//! with its recipe loaded, the validated configuration, the wavelength bin
//! plan and the results of the last completed run. The engine is exclusively
//! owned, so at most one scan runs through it at a time.
//!
//! Scans block until the event file is exhausted; interactive callers run
//! the session on a worker thread and marshal progress to their UI.

use std::collections::BTreeMap;
use std::path::Path;

use log::{info, warn};
use photonrig_core::{
    merge_pairs, summarize_with_model, AnalysisConfig, AnalysisKind, BinPlan, Channel,
    ColorModel, CorrelationPair, CorrelationPairSpec, RecipeParams,
};

use crate::cancel::CancelCheck;
use crate::engine::HistogramEngine;
use crate::recipe::Recipe;
use crate::scan::{run_full_scan, scan_named, HistogramSelection, ScanOptions, ScanProgress};
use crate::Result;

/// Result of a session run.
#[derive(Debug, Clone)]
pub enum AnalysisOutcome<T> {
    Completed(T),
    /// The run was cancelled and produced nothing.
    Cancelled,
}

impl<T> AnalysisOutcome<T> {
    #[must_use]
    pub fn completed(self) -> Option<T> {
        match self {
            AnalysisOutcome::Completed(value) => Some(value),
            AnalysisOutcome::Cancelled => None,
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AnalysisOutcome::Cancelled)
    }
}

/// Merged correlation curves, one entry per requested pair.
pub type PairResults = BTreeMap<String, photonrig_core::Result<CorrelationPair>>;

/// One analysis of one kind, owning its engine.
pub struct AnalysisSession<E: HistogramEngine> {
    engine: E,
    config: AnalysisConfig,
    kind: AnalysisKind,
    params: RecipeParams,
    plan: BinPlan,
    color_model: ColorModel,
    channels: Vec<Channel>,
    pairs: BTreeMap<String, CorrelationPair>,
}

impl<E: HistogramEngine> AnalysisSession<E> {
    /// Validate `config` and load `recipe` into `engine`.
    ///
    /// # Errors
    /// Returns a configuration error or the engine's recipe error; no scan
    /// can start on a session that failed to build.
    pub fn new(
        mut engine: E,
        config: AnalysisConfig,
        kind: AnalysisKind,
        recipe: &Recipe,
    ) -> Result<Self> {
        config.validate()?;
        let plan = config.bin_plan()?;
        let params = config.recipe_params(kind);
        engine.load_recipe(recipe, &params)?;
        info!(
            "{kind} session ready: {} channels, {} bins of {} ps",
            config.channel_count(),
            params.bins,
            params.binsize_ps
        );

        Ok(Self {
            engine,
            config,
            kind,
            params,
            plan,
            color_model: ColorModel::Cie,
            channels: Vec::new(),
            pairs: BTreeMap::new(),
        })
    }

    /// Use `model` for channel colors.
    #[must_use]
    pub fn with_color_model(mut self, model: ColorModel) -> Self {
        self.color_model = model;
        self
    }

    /// Scan options derived from the session configuration.
    #[must_use]
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions::from_config(&self.config, self.kind)
    }

    /// Scan `file` and summarize every configured channel.
    ///
    /// A completed run replaces the stored channels wholesale; a cancelled
    /// or failed run leaves them untouched.
    ///
    /// # Errors
    /// Fails for correlation sessions, and propagates scan and
    /// summarization errors.
    pub fn analyze<P, C>(
        &mut self,
        file: &Path,
        progress: P,
        cancel: &C,
    ) -> Result<AnalysisOutcome<Vec<Channel>>>
    where
        P: FnMut(ScanProgress),
        C: CancelCheck + ?Sized,
    {
        if self.kind == AnalysisKind::Correlation {
            return Err(photonrig_core::Error::InvalidConfiguration(
                "correlation sessions produce pairs, use correlate()".to_string(),
            )
            .into());
        }

        let options = self.scan_options();
        let order = self.config.spectrometer.channels.clone();
        let outcome = run_full_scan(&mut self.engine, file, &order, &options, progress, cancel)?;
        let Some(result) = outcome.completed() else {
            warn!("{} analysis of {} cancelled", self.kind, file.display());
            return Ok(AnalysisOutcome::Cancelled);
        };

        let channels = summarize_with_model(
            &result.histograms,
            &order,
            &result.time_axis,
            &self.plan,
            self.color_model,
        )?;
        self.channels.clone_from(&channels);
        Ok(AnalysisOutcome::Completed(channels))
    }

    /// Scan `file` and merge the directional histograms of every pair.
    ///
    /// Pairs are merged independently: a pair whose histograms the engine
    /// never produced fails on its own without affecting the others.
    ///
    /// # Errors
    /// Fails for non-correlation sessions, and propagates scan errors.
    pub fn correlate<P, C>(
        &mut self,
        file: &Path,
        pairs: &[CorrelationPairSpec],
        progress: P,
        cancel: &C,
    ) -> Result<AnalysisOutcome<PairResults>>
    where
        P: FnMut(ScanProgress),
        C: CancelCheck + ?Sized,
    {
        if self.kind != AnalysisKind::Correlation {
            return Err(photonrig_core::Error::InvalidConfiguration(format!(
                "{} sessions produce channels, use analyze()",
                self.kind
            ))
            .into());
        }

        let options = self.scan_options();
        let outcome = scan_named(
            &mut self.engine,
            file,
            &HistogramSelection::All,
            &options,
            progress,
            cancel,
        )?;
        let Some(scan) = outcome.completed() else {
            warn!("Correlation of {} cancelled", file.display());
            return Ok(AnalysisOutcome::Cancelled);
        };

        let raw = scan.into_raw();
        let merged = merge_pairs(&raw, pairs, self.params.bins, self.params.binsize_ps);
        for (label, result) in &merged {
            if let Err(e) = result {
                warn!("Pair {label} not merged: {e}");
            }
        }
        self.pairs = merged
            .iter()
            .filter_map(|(label, r)| r.as_ref().ok().map(|p| (label.clone(), p.clone())))
            .collect();
        Ok(AnalysisOutcome::Completed(merged))
    }

    /// Channels of the last completed [`Self::analyze`] run.
    #[must_use]
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Successfully merged pairs of the last completed [`Self::correlate`] run.
    #[must_use]
    pub fn pairs(&self) -> &BTreeMap<String, CorrelationPair> {
        &self.pairs
    }

    #[must_use]
    pub fn bin_plan(&self) -> &BinPlan {
        &self.plan
    }

    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    #[must_use]
    pub fn kind(&self) -> AnalysisKind {
        self.kind
    }

    #[must_use]
    pub fn recipe_params(&self) -> &RecipeParams {
        &self.params
    }

    /// Release the engine for reuse in another session.
    pub fn into_engine(self) -> E {
        self.engine
    }
}

impl<E: HistogramEngine> std::fmt::Debug for AnalysisSession<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisSession")
            .field("kind", &self.kind)
            .field("params", &self.params)
            .field("channels", &self.channels.len())
            .field("pairs", &self.pairs.len())
            .finish_non_exhaustive()
    }
}
