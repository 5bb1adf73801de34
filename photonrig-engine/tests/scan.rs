#![allow(clippy::cast_possible_truncation, clippy::uninlined_format_args)]
use std::cell::Cell;
use std::path::Path;

use photonrig_core::{ChannelId, RawHistograms, RecipeParams, TimeUnit};
use photonrig_engine::{
    run_full_scan, scan_named, ClipSource, EngineRun, Error, EventPosition, FormatCode,
    HistogramEngine, HistogramSelection, Recipe, RunSettings, ScanOptions, ScanOutcome,
};

/// Engine that answers each run call with the next scripted step.
#[derive(Default)]
struct ScriptedEngine {
    steps: Vec<(u64, RawHistograms)>,
    seeks: Vec<EventPosition>,
    contexts: Vec<Option<usize>>,
    fail_at_call: Option<usize>,
}

impl ScriptedEngine {
    fn new(steps: Vec<(u64, RawHistograms)>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.contexts.len()
    }
}

impl ClipSource for ScriptedEngine {
    type Clip = EventPosition;

    fn clips(
        &mut self,
        _file: &Path,
        seek: EventPosition,
        _format: FormatCode,
    ) -> photonrig_engine::Result<EventPosition> {
        self.seeks.push(seek);
        Ok(seek)
    }
}

impl HistogramEngine for ScriptedEngine {
    type Context = usize;

    fn load_recipe(
        &mut self,
        _recipe: &Recipe,
        _params: &RecipeParams,
    ) -> photonrig_engine::Result<()> {
        Ok(())
    }

    fn run(
        &mut self,
        clip: EventPosition,
        context: Option<usize>,
        _settings: &RunSettings,
    ) -> photonrig_engine::Result<EngineRun<usize>> {
        let call = self.calls();
        self.contexts.push(context);
        if self.fail_at_call == Some(call) {
            return Err(Error::Engine("clip read failed".to_string()));
        }
        // Past the script: behave like end of file.
        let (position, histograms) = self
            .steps
            .get(call)
            .cloned()
            .unwrap_or((clip.as_u64(), RawHistograms::new()));
        Ok(EngineRun {
            histograms,
            position: EventPosition(position),
            context: call,
        })
    }
}

fn chunk(h2: Vec<u64>, h3: Vec<u64>) -> RawHistograms {
    [("h2".to_string(), h2), ("h3".to_string(), h3)]
        .into_iter()
        .collect()
}

fn options(bins: usize) -> ScanOptions {
    ScanOptions::new(RecipeParams {
        bins,
        binsize_ps: 100,
        det_delay_ps: None,
    })
}

const CHANNELS: [ChannelId; 2] = [ChannelId::H2, ChannelId::H3];

fn never() -> bool {
    false
}

#[test]
fn test_repeat_position_terminates_and_drops_delta() {
    let mut engine = ScriptedEngine::new(vec![
        (5, chunk(vec![1, 2], vec![0, 1])),
        (5, chunk(vec![10, 10], vec![10, 10])),
    ]);

    let outcome = run_full_scan(
        &mut engine,
        Path::new("run.ttbin"),
        &CHANNELS,
        &options(2),
        |_| {},
        &never,
    )
    .unwrap();

    assert_eq!(engine.calls(), 2);
    assert_eq!(engine.seeks, vec![EventPosition(0), EventPosition(5)]);

    let result = outcome.completed().unwrap();
    assert_eq!(result.histograms[&ChannelId::H2].counts(), &[1, 2]);
    assert_eq!(result.histograms[&ChannelId::H3].counts(), &[0, 1]);
    assert_eq!(result.iterations, 1);
    assert_eq!(result.engine_calls, 2);
    assert_eq!(result.final_position, EventPosition(5));
}

#[test]
fn test_context_is_threaded_between_calls() {
    let mut engine = ScriptedEngine::new(vec![
        (3, chunk(vec![1], vec![1])),
        (7, chunk(vec![1], vec![1])),
        (7, chunk(vec![0], vec![0])),
    ]);
    run_full_scan(
        &mut engine,
        Path::new("run.ttbin"),
        &CHANNELS,
        &options(1),
        |_| {},
        &never,
    )
    .unwrap();
    assert_eq!(engine.contexts, vec![None, Some(0), Some(1)]);
}

#[test]
fn test_empty_file_yields_zero_histograms() {
    let mut engine = ScriptedEngine::new(vec![(0, chunk(vec![0, 0, 0], vec![0, 0, 0]))]);
    let result = run_full_scan(
        &mut engine,
        Path::new("empty.ttbin"),
        &CHANNELS,
        &options(3).with_time_unit(TimeUnit::Picoseconds),
        |_| {},
        &never,
    )
    .unwrap()
    .into_result()
    .unwrap();
    assert_eq!(engine.calls(), 1);
    assert_eq!(result.histograms[&ChannelId::H2].total(), 0);
    assert_eq!(result.time_axis, vec![0.0, 100.0, 200.0]);
}

#[test]
fn test_chunk_order_does_not_change_totals() {
    let a = chunk(vec![1, 0, 4], vec![2, 2, 0]);
    let b = chunk(vec![0, 3, 1], vec![5, 0, 1]);

    let run = |steps| {
        let mut engine = ScriptedEngine::new(steps);
        run_full_scan(
            &mut engine,
            Path::new("run.ttbin"),
            &CHANNELS,
            &options(3),
            |_| {},
            &never,
        )
        .unwrap()
        .into_result()
        .unwrap()
        .histograms
    };

    let ab = run(vec![(1, a.clone()), (2, b.clone())]);
    let ba = run(vec![(1, b), (2, a)]);
    assert_eq!(ab, ba);
    assert_eq!(ab[&ChannelId::H2].counts(), &[1, 3, 5]);
}

#[test]
fn test_cancel_on_hundredth_call_keeps_ninety_nine_folds() {
    let steps = (1..=150).map(|p| (p, chunk(vec![1, 0], vec![0, 2]))).collect();
    let mut engine = ScriptedEngine::new(steps);
    let cancel = || true;

    let outcome = run_full_scan(
        &mut engine,
        Path::new("run.ttbin"),
        &CHANNELS,
        &options(2),
        |_| {},
        &cancel,
    )
    .unwrap();

    assert!(outcome.is_cancelled());
    assert_eq!(engine.calls(), 100);
    let ScanOutcome::Cancelled { partial } = outcome else {
        panic!("expected cancellation");
    };
    assert_eq!(partial.iterations, 99);
    assert_eq!(partial.histograms[&ChannelId::H2].counts(), &[99, 0]);
    assert_eq!(partial.histograms[&ChannelId::H3].counts(), &[0, 198]);
}

#[test]
fn test_cancel_polled_every_interval() {
    let steps = (1..=250).map(|p| (p, chunk(vec![1], vec![1]))).collect();
    let mut engine = ScriptedEngine::new(steps);
    let polls = Cell::new(0usize);
    let check = || {
        polls.set(polls.get() + 1);
        false
    };

    let outcome = run_full_scan(
        &mut engine,
        Path::new("run.ttbin"),
        &CHANNELS,
        &options(1),
        |_| {},
        &check,
    )
    .unwrap();

    // 250 advancing calls plus the terminal one
    assert_eq!(engine.calls(), 251);
    assert_eq!(polls.get(), 2);
    assert_eq!(outcome.completed().unwrap().histograms[&ChannelId::H2].total(), 250);
}

#[test]
fn test_custom_poll_interval() {
    let steps = (1..=10).map(|p| (p, chunk(vec![1], vec![1]))).collect();
    let mut engine = ScriptedEngine::new(steps);
    let outcome = run_full_scan(
        &mut engine,
        Path::new("run.ttbin"),
        &CHANNELS,
        &options(1).with_cancel_poll_interval(3),
        |_| {},
        &|| true,
    )
    .unwrap();
    assert_eq!(engine.calls(), 3);
    assert!(matches!(outcome.into_result(), Err(Error::Cancelled)));
}

#[test]
fn test_progress_reported_per_folded_chunk() {
    let steps = vec![
        (10, chunk(vec![1], vec![1])),
        (20, chunk(vec![1], vec![1])),
        (20, chunk(vec![0], vec![0])),
    ];
    let mut engine = ScriptedEngine::new(steps);
    let mut seen = Vec::new();
    run_full_scan(
        &mut engine,
        Path::new("run.ttbin"),
        &CHANNELS,
        &options(1),
        |p| seen.push((p.iteration, p.position)),
        &never,
    )
    .unwrap();
    assert_eq!(seen, vec![(1, EventPosition(10)), (2, EventPosition(20))]);
}

#[test]
fn test_engine_error_aborts_scan() {
    let steps = (1..=5).map(|p| (p, chunk(vec![1], vec![1]))).collect();
    let mut engine = ScriptedEngine::new(steps);
    engine.fail_at_call = Some(2);
    let err = run_full_scan(
        &mut engine,
        Path::new("run.ttbin"),
        &CHANNELS,
        &options(1),
        |_| {},
        &never,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Engine(_)));
    assert_eq!(engine.calls(), 3);
}

#[test]
fn test_backwards_cursor_is_engine_error() {
    let mut engine = ScriptedEngine::new(vec![
        (8, chunk(vec![1], vec![1])),
        (4, chunk(vec![1], vec![1])),
    ]);
    let err = run_full_scan(
        &mut engine,
        Path::new("run.ttbin"),
        &CHANNELS,
        &options(1),
        |_| {},
        &never,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Engine(_)));
}

#[test]
fn test_missing_channel_in_delta() {
    let only_h2: RawHistograms = [("h2".to_string(), vec![1])].into_iter().collect();
    let mut engine = ScriptedEngine::new(vec![(1, only_h2)]);
    let err = run_full_scan(
        &mut engine,
        Path::new("run.ttbin"),
        &CHANNELS,
        &options(1),
        |_| {},
        &never,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Core(photonrig_core::Error::MissingChannel { ref name }) if name == "h3"
    ));
}

#[test]
fn test_scan_named_all_collects_every_histogram() {
    let pair_chunk = |a: u64, b: u64| -> RawHistograms {
        [("h23".to_string(), vec![a, 0]), ("h32".to_string(), vec![0, b])]
            .into_iter()
            .collect()
    };
    let mut engine = ScriptedEngine::new(vec![(1, pair_chunk(1, 2)), (2, pair_chunk(3, 4))]);
    let scan = scan_named(
        &mut engine,
        Path::new("g2.ttbin"),
        &HistogramSelection::All,
        &options(2),
        |_| {},
        &never,
    )
    .unwrap()
    .into_result()
    .unwrap();
    let raw = scan.into_raw();
    assert_eq!(raw["h23"], vec![4, 0]);
    assert_eq!(raw["h32"], vec![0, 6]);
}

#[test]
fn test_duplicate_channel_rejected_before_engine_call() {
    let mut engine = ScriptedEngine::new(vec![
        (1, chunk(vec![3, 1], vec![0, 0])),
        (2, chunk(vec![4, 1], vec![0, 0])),
    ]);
    let err = run_full_scan(
        &mut engine,
        Path::new("run.ttbin"),
        &[ChannelId::H2, ChannelId::H2],
        &options(2),
        |_| {},
        &never,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Core(photonrig_core::Error::InvalidConfiguration(_))
    ));
    assert_eq!(engine.calls(), 0);
    assert!(engine.seeks.is_empty());
}
