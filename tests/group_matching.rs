use std::collections::HashSet;
use rowmatch::config::subsystems::MatcherConfig;
use rowmatch::engine::MatchEngine;
use rowmatch::{CartesianEngine, Error, ExactEngine, RowLink, RowMatcher, RowRef};

fn r(table: usize, row: usize) -> RowRef {
    RowRef::new(table, row)
}

fn line(values: &[f64]) -> Vec<Vec<f64>> {
    values.iter().map(|v| vec![*v]).collect()
}

fn scatter(n: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut state = seed;
    let mut next = move || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((state >> 33) as f64) / ((1u64 << 31) as f64) * 60.0
    };
    (0..n).map(|_| vec![next(), next()]).collect()
}

fn group_matcher<'a>(
    engine: &'a CartesianEngine,
    tables: &'a [Vec<Vec<f64>>],
    config: MatcherConfig,
) -> RowMatcher<'a, CartesianEngine> {
    let mut matcher = RowMatcher::new(engine).with_config(config);
    for table in tables {
        matcher.add_table(table);
    }
    matcher
}

#[test]
fn links_are_transitive() {
    // A~B and B~C are within range, A~C is not
    let tables = vec![line(&[0.0]), line(&[0.9]), line(&[1.8])];
    let engine = CartesianEngine::new(1, 1.0).unwrap();
    let matcher = group_matcher(&engine, &tables, MatcherConfig::default());

    let result = matcher.find_group_matches(&[false, false, false]).unwrap();
    assert_eq!(result.links, vec![RowLink::new(vec![r(0, 0), r(1, 0), r(2, 0)]).unwrap()]);
}

#[test]
fn require_all_keeps_unmatched_rows() {
    let tables = vec![line(&[0.0, 20.0]), line(&[0.5, 40.0]), line(&[60.0])];
    let engine = CartesianEngine::new(1, 1.0).unwrap();
    let matcher = group_matcher(&engine, &tables, MatcherConfig::default());

    let bare = matcher.find_group_matches(&[false, false, false]).unwrap();
    assert_eq!(bare.links, vec![RowLink::pair(r(0, 0), r(1, 0))]);

    let some = matcher.find_group_matches(&[false, true, true]).unwrap();
    assert_eq!(some.links, vec![
        RowLink::pair(r(0, 0), r(1, 0)),
        RowLink::singleton(r(1, 1)),
        RowLink::singleton(r(2, 0)),
    ]);

    let summary = some.summary(3);
    assert_eq!(summary.match_count, 1);
    assert_eq!(summary.link_count, 3);
    assert_eq!(summary.table_subset_sizes(), vec![1, 2, 1]);
    assert_eq!(summary.partial_tables(), vec![0, 1, 2]);
}

#[test]
fn rows_of_one_table_never_link_directly() {
    // Two identical rows in table 0 with nothing nearby elsewhere
    let tables = vec![line(&[1.0, 1.0]), line(&[10.0])];
    let engine = CartesianEngine::new(1, 1.0).unwrap();
    let matcher = group_matcher(&engine, &tables, MatcherConfig::default());
    assert!(matcher.find_group_matches(&[false, false]).unwrap().links.is_empty());

    // Bridged through a row of another table they share a link
    let tables = vec![line(&[1.0, 1.0]), line(&[1.2])];
    let matcher = group_matcher(&engine, &tables, MatcherConfig::default());
    let result = matcher.find_group_matches(&[false, false]).unwrap();
    assert_eq!(result.links, vec![RowLink::new(vec![r(0, 0), r(0, 1), r(1, 0)]).unwrap()]);
}

#[test]
fn links_partition_the_rows_in_canonical_order() {
    let tables = vec![scatter(300, 1), scatter(300, 2), scatter(300, 3), scatter(300, 4)];
    let engine = CartesianEngine::new(2, 1.5).unwrap();
    let matcher = group_matcher(&engine, &tables, MatcherConfig::default());

    let result = matcher.find_group_matches(&[true, true, true, true]).unwrap();
    let mut seen = HashSet::new();
    for link in &result.links {
        for member in link.refs() {
            assert!(seen.insert(*member), "{} in two links", member);
        }
    }
    assert_eq!(seen.len(), 1200);
    for pair in result.links.windows(2) {
        assert!(pair[0] < pair[1]);
        assert!(pair[0].first() < pair[1].first());
    }
}

#[test]
fn serial_and_parallel_partitions_agree() {
    let tables = vec![scatter(700, 5), scatter(700, 6), scatter(700, 7)];
    let engine = CartesianEngine::new(2, 2.0).unwrap();

    let serial = group_matcher(&engine, &tables, MatcherConfig::default())
        .find_group_matches(&[false, true, false])
        .unwrap();
    let again = group_matcher(&engine, &tables, MatcherConfig::default())
        .find_group_matches(&[false, true, false])
        .unwrap();
    assert_eq!(serial, again);

    let config = MatcherConfig {
        parallel: true,
        thread_count: 3,
        cancel_check_rows: 64,
        ..MatcherConfig::default()
    };
    let parallel = group_matcher(&engine, &tables, config)
        .find_group_matches(&[false, true, false])
        .unwrap();
    assert_eq!(parallel, serial);
}

#[test]
fn tighter_threshold_only_splits_links() {
    let tables = vec![scatter(400, 8), scatter(400, 9), scatter(400, 10)];
    let loose_engine = CartesianEngine::new(2, 2.0).unwrap();
    let tight_engine = CartesianEngine::new(2, 1.0).unwrap();

    let loose = group_matcher(&loose_engine, &tables, MatcherConfig::default())
        .find_group_matches(&[false, false, false])
        .unwrap();
    let tight = group_matcher(&tight_engine, &tables, MatcherConfig::default())
        .find_group_matches(&[false, false, false])
        .unwrap();

    for link in &tight.links {
        let container = loose.links.iter().find(|l| l.contains(&link.first()));
        let container = container.unwrap_or_else(|| panic!("{} has no loose link", link));
        assert!(link.refs().iter().all(|m| container.contains(m)), "{} not within {}", link, container);
    }
}

#[test]
fn exact_values_group_across_tables() {
    let tables: Vec<Vec<String>> = vec![
        vec!["x".into(), "y".into()],
        vec!["y".into()],
        vec!["y".into(), "z".into(), "x".into()],
    ];
    let engine = ExactEngine::<String>::new();
    let mut matcher = RowMatcher::new(&engine);
    for table in &tables {
        matcher.add_table(table);
    }
    let result = matcher.find_group_matches(&[false, false, false]).unwrap();
    assert_eq!(result.links, vec![
        RowLink::pair(r(0, 0), r(2, 2)),
        RowLink::new(vec![r(0, 1), r(1, 0), r(2, 0)]).unwrap(),
    ]);
}

#[test]
fn bad_arguments_are_rejected() {
    let tables = vec![line(&[0.0])];
    let engine = CartesianEngine::new(1, 1.0).unwrap();
    let matcher = group_matcher(&engine, &tables, MatcherConfig::default());
    assert!(matches!(matcher.find_group_matches(&[true]), Err(Error::InvalidConfiguration(_))));

    let tables = vec![line(&[0.0]), line(&[0.0])];
    let matcher = group_matcher(&engine, &tables, MatcherConfig::default());
    assert!(matches!(matcher.find_group_matches(&[true]), Err(Error::InvalidConfiguration(_))));
}

/// Values sharing a tens digit are comparable. Units 1 against units 2
/// scores NaN; every other comparable pair scores 1.
struct UnitsEngine;

impl MatchEngine for UnitsEngine {
    type Tuple = u32;
    type Key = u32;

    fn bin_keys(&self, value: &u32) -> std::result::Result<Vec<u32>, String> {
        Ok(vec![value / 10])
    }

    fn score(&self, a: &u32, b: &u32) -> Option<f64> {
        if a / 10 != b / 10 {
            return None;
        }
        match (a % 10, b % 10) {
            (1, 2) | (2, 1) => Some(f64::NAN),
            _ => Some(1.0),
        }
    }

    fn description(&self) -> String {
        "units".to_string()
    }
}

#[test]
fn bad_scores_are_counted_alike_in_serial_and_parallel() {
    // 1 ~ 2 is bad but already linked through 0; 11 ~ 12 is bad and unlinked.
    let tables: Vec<Vec<u32>> = vec![vec![0], vec![1, 11], vec![2, 12]];
    let engine = UnitsEngine;
    let run = |config: MatcherConfig| {
        let mut matcher = RowMatcher::new(&engine).with_config(config);
        for table in &tables {
            matcher.add_table(table);
        }
        matcher.find_group_matches(&[false, false, false]).unwrap()
    };

    let serial = run(MatcherConfig::default());
    let parallel = run(MatcherConfig {
        parallel: true,
        thread_count: 2,
        cancel_check_rows: 1,
        ..MatcherConfig::default()
    });

    assert_eq!(serial.links, vec![RowLink::new(vec![r(0, 0), r(1, 0), r(2, 0)]).unwrap()]);
    assert_eq!(serial.anomalies.count, 1);
    assert_eq!(serial.anomalies.sample[0].row, r(1, 1));
    assert_eq!(parallel, serial);
}
