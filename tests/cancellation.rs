use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use rowmatch::config::subsystems::MatcherConfig;
use rowmatch::matcher::{Phase, ProgressSink};
use rowmatch::{CancelToken, CartesianEngine, Error, RowMatcher};

/// Cancels on the first non-zero level reported while scoring, i.e. after
/// the first batch of the scan has been processed.
struct ScoringCancelSink {
    cancel: CancelToken,
    scoring: AtomicBool,
    phases: Mutex<Vec<(Phase, bool)>>,
    scoring_levels: Mutex<Vec<f64>>,
}

impl ScoringCancelSink {
    fn new(cancel: CancelToken) -> Self {
        Self {
            cancel,
            scoring: AtomicBool::new(false),
            phases: Mutex::new(Vec::new()),
            scoring_levels: Mutex::new(Vec::new()),
        }
    }
}

impl ProgressSink for ScoringCancelSink {
    fn start_phase(&self, phase: Phase) {
        self.scoring.store(phase == Phase::Scoring, Ordering::SeqCst);
        self.phases.lock().unwrap().push((phase, false));
    }

    fn set_level(&self, fraction: f64) {
        if self.scoring.load(Ordering::SeqCst) && fraction > 0.0 {
            self.scoring_levels.lock().unwrap().push(fraction);
            self.cancel.cancel();
        }
    }

    fn end_phase(&self) {
        if let Some(last) = self.phases.lock().unwrap().last_mut() {
            last.1 = true;
        }
    }
}

fn line(n: usize, offset: f64) -> Vec<Vec<f64>> {
    (0..n).map(|i| vec![i as f64 * 3.0 + offset]).collect()
}

fn check_stopped_in_scoring(sink: &ScoringCancelSink, tables: usize) {
    let phases = sink.phases.lock().unwrap();
    let mut expected: Vec<(Phase, bool)> = (0..tables).map(|table| (Phase::Binning { table }, true)).collect();
    expected.push((Phase::Scoring, true));
    assert_eq!(phases.as_slice(), expected.as_slice());

    // Exactly one batch got through before the scan stopped
    let levels = sink.scoring_levels.lock().unwrap();
    assert_eq!(levels.len(), 1);
    assert!(levels[0] < 1.0);
}

#[test]
fn pair_scoring_stops_mid_scan() {
    let a = line(200, 0.0);
    let b = line(200, 0.1);
    let engine = CartesianEngine::new(1, 1.0).unwrap();
    let config = MatcherConfig { cancel_check_rows: 10, ..MatcherConfig::default() };
    let mut matcher = RowMatcher::new(&engine).with_config(config);
    matcher.add_table(&a);
    matcher.add_table(&b);
    let sink = Arc::new(ScoringCancelSink::new(matcher.cancel_token()));
    matcher.set_progress_sink(sink.clone());

    let err = matcher.find_pair_matches(true, true).unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    check_stopped_in_scoring(&sink, 2);
}

#[test]
fn group_scoring_stops_mid_scan() {
    let tables = vec![line(200, 0.0), line(200, 0.1), line(200, 0.2)];
    let engine = CartesianEngine::new(1, 1.0).unwrap();
    for parallel in [false, true] {
        let config = MatcherConfig {
            parallel,
            thread_count: 2,
            cancel_check_rows: 10,
            ..MatcherConfig::default()
        };
        let mut matcher = RowMatcher::new(&engine).with_config(config);
        for table in &tables {
            matcher.add_table(table);
        }
        let sink = Arc::new(ScoringCancelSink::new(matcher.cancel_token()));
        matcher.set_progress_sink(sink.clone());

        let err = matcher.find_group_matches(&[true, true, true]).unwrap_err();
        assert!(err.is_cancelled());
        check_stopped_in_scoring(&sink, 3);
    }
}
