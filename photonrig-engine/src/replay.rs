//! Replay of recorded engine output.
//!
//! A capture is the sequence of histogram deltas an engine produced for one
//! event file, stored as JSON:
//!
//! ```json
//! { "chunks": [ { "h2": [0, 3, 1], "h3": [1, 0, 0] },
//!               { "h2": [2, 0, 0], "h3": [0, 1, 4] } ] }
//! ```
//!
//! [`ReplayEngine`] treats the capture file as the event file and the chunk
//! index as the cursor. Like the hardware engine, it answers a clip past the
//! last chunk with an all-zero delta and an unchanged cursor.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use photonrig_core::{RawHistograms, RecipeParams};
use serde::{Deserialize, Serialize};

use crate::engine::{ClipSource, EngineRun, EventPosition, FormatCode, HistogramEngine, RunSettings};
use crate::recipe::Recipe;
use crate::{Error, Result};

/// Recorded engine output for one event file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayCapture {
    pub chunks: Vec<RawHistograms>,
}

impl ReplayCapture {
    /// Load a capture from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Write the capture as JSON.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer(file, self)?;
        Ok(())
    }
}

/// A clip of a capture starting at one chunk.
#[derive(Debug, Clone)]
pub struct ReplayClip {
    capture: Arc<ReplayCapture>,
    start: usize,
}

/// Resume state: chunks consumed so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayContext {
    pub chunks_read: usize,
}

/// Correlation engine that replays a [`ReplayCapture`].
#[derive(Debug, Default)]
pub struct ReplayEngine {
    params: Option<RecipeParams>,
    loaded: Option<(PathBuf, Arc<ReplayCapture>)>,
}

impl ReplayEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with a capture preloaded for `path`, bypassing the filesystem.
    #[must_use]
    pub fn with_capture(path: impl Into<PathBuf>, capture: ReplayCapture) -> Self {
        Self {
            params: None,
            loaded: Some((path.into(), Arc::new(capture))),
        }
    }

    fn capture_for(&mut self, file: &Path) -> Result<Arc<ReplayCapture>> {
        if let Some((path, capture)) = &self.loaded {
            if path == file {
                return Ok(Arc::clone(capture));
            }
        }
        let capture = Arc::new(ReplayCapture::from_file(file)?);
        debug!(
            "Loaded capture {} ({} chunks)",
            file.display(),
            capture.chunks.len()
        );
        self.loaded = Some((file.to_path_buf(), Arc::clone(&capture)));
        Ok(capture)
    }
}

impl ClipSource for ReplayEngine {
    type Clip = ReplayClip;

    fn clips(&mut self, file: &Path, seek: EventPosition, _format: FormatCode) -> Result<ReplayClip> {
        let capture = self.capture_for(file)?;
        let start = usize::try_from(seek.as_u64())
            .map_err(|_| Error::Engine(format!("seek position {seek} out of range")))?;
        if start > capture.chunks.len() {
            return Err(Error::Engine(format!(
                "seek position {seek} past end of capture ({} chunks)",
                capture.chunks.len()
            )));
        }
        Ok(ReplayClip { capture, start })
    }
}

impl HistogramEngine for ReplayEngine {
    type Context = ReplayContext;

    fn load_recipe(&mut self, recipe: &Recipe, params: &RecipeParams) -> Result<()> {
        if params.bins == 0 {
            return Err(Error::Recipe("bins must be at least 1".to_string()));
        }
        debug!(
            "Recipe {} loaded: {} bins of {} ps",
            recipe
                .source()
                .map_or_else(|| "<inline>".to_string(), |p| p.display().to_string()),
            params.bins,
            params.binsize_ps
        );
        self.params = Some(*params);
        Ok(())
    }

    fn run(
        &mut self,
        clip: ReplayClip,
        context: Option<ReplayContext>,
        settings: &RunSettings,
    ) -> Result<EngineRun<ReplayContext>> {
        let params = self
            .params
            .ok_or_else(|| Error::Engine("no recipe loaded".to_string()))?;
        let chunks = &clip.capture.chunks;
        let end = (clip.start + settings.max_autofeed.max(1)).min(chunks.len());

        let mut histograms = RawHistograms::new();
        if clip.start == end {
            // Past the last chunk: empty delta, cursor unchanged.
            if let Some(first) = chunks.first() {
                for name in first.keys() {
                    histograms.insert(name.clone(), vec![0; params.bins]);
                }
            }
        }
        for chunk in &chunks[clip.start..end] {
            for (name, counts) in chunk {
                if counts.len() != params.bins {
                    return Err(Error::Engine(format!(
                        "capture histogram {name} has {} bins, recipe expects {}",
                        counts.len(),
                        params.bins
                    )));
                }
                let total = histograms
                    .entry(name.clone())
                    .or_insert_with(|| vec![0; params.bins]);
                for (t, &c) in total.iter_mut().zip(counts) {
                    *t = t.saturating_add(c);
                }
            }
        }

        let read = context.unwrap_or_default().chunks_read + (end - clip.start);
        Ok(EngineRun {
            histograms,
            position: EventPosition(end as u64),
            context: ReplayContext { chunks_read: read },
        })
    }
}
