//! Correlation engine abstraction.
//!
//! A correlation engine turns raw time tags into histograms. It is driven
//! in two steps: [`ClipSource::clips`] opens a clip of the event file at a
//! cursor, and [`HistogramEngine::run`] histograms that clip, returning the
//! cursor where the next clip starts and the parser state to resume from.

use std::fmt;
use std::path::Path;

use photonrig_core::{RawHistograms, RecipeParams};
use serde::{Deserialize, Serialize};

use crate::recipe::Recipe;
use crate::Result;

/// Opaque cursor into an event file.
///
/// Within one scan the engine only ever moves it forward; returning the
/// same position that was requested signals end of file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct EventPosition(pub u64);

impl EventPosition {
    /// Start of file.
    pub const START: EventPosition = EventPosition(0);

    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Vendor encoding of an event file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormatCode(pub u8);

impl FormatCode {
    /// The time-tagger's native binary encoding.
    pub const VENDOR: FormatCode = FormatCode(1);
}

impl Default for FormatCode {
    fn default() -> Self {
        Self::VENDOR
    }
}

/// Per-call engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    /// Engine group whose histograms are returned.
    pub group: String,
    /// Clips the engine may consume in one run call.
    pub max_autofeed: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            group: "main".to_string(),
            max_autofeed: 1,
        }
    }
}

/// Output of one engine run call.
#[derive(Debug, Clone)]
pub struct EngineRun<C> {
    /// Histogram delta for the consumed clip(s), keyed by recipe name.
    pub histograms: RawHistograms,
    /// Cursor where the next clip starts.
    pub position: EventPosition,
    /// Parser state to resume from.
    pub context: C,
}

/// Opens clips of an event file.
pub trait ClipSource {
    /// Engine-specific clip handle.
    type Clip;

    /// Open a clip of `file` starting at `seek`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read at `seek`.
    fn clips(&mut self, file: &Path, seek: EventPosition, format: FormatCode)
        -> Result<Self::Clip>;
}

/// Histograms clips according to a loaded recipe.
///
/// An engine instance is not assumed to be shareable; a scan takes it by
/// exclusive reference for its whole duration.
pub trait HistogramEngine: ClipSource {
    /// Resume state carried from one run call to the next.
    type Context;

    /// Load a recipe with its keyword parameters.
    ///
    /// # Errors
    /// Returns an error if the engine cannot be initialized from the recipe.
    fn load_recipe(&mut self, recipe: &Recipe, params: &RecipeParams) -> Result<()>;

    /// Histogram `clip`, resuming from `context` when given.
    ///
    /// # Errors
    /// Returns an error if the clip cannot be processed.
    fn run(
        &mut self,
        clip: Self::Clip,
        context: Option<Self::Context>,
        settings: &RunSettings,
    ) -> Result<EngineRun<Self::Context>>;
}
