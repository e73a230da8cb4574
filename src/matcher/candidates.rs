// src/matcher/candidates.rs
use ahash::AHashSet;
use std::hash::Hash;
use crate::engine::{MatchEngine, RowSource};
use crate::types::{RowRef, Score};
use super::bins::BinIndex;

/// Enumerates rows that share at least one bin with a query row.
///
/// Candidates come back in discovery order (query key order, then index
/// order, then bucket order) and each appears exactly once per query.
pub struct CandidateGenerator<'a, K> {
    indexes: Vec<&'a BinIndex<K>>,
}

impl<'a, K: Hash + Eq + Clone + Send + Sync> CandidateGenerator<'a, K> {
    pub fn new(indexes: Vec<&'a BinIndex<K>>) -> Self {
        Self { indexes }
    }

    pub fn candidates(&self, row: RowRef, keys: &[K]) -> Vec<RowRef> {
        let mut seen: AHashSet<RowRef> = AHashSet::new();
        let mut found = Vec::new();
        for key in keys {
            for index in &self.indexes {
                for &candidate in index.bucket(key) {
                    if candidate != row && seen.insert(candidate) {
                        found.push(candidate);
                    }
                }
            }
        }
        found
    }
}

/// What scoring one query row produced.
#[derive(Debug, Default)]
pub(crate) struct RowScores {
    pub(crate) accepted: Vec<(RowRef, Score)>,
    // Candidate and reason for each non-finite score
    pub(crate) rejected_scores: Vec<(RowRef, String)>,
}

/// Scores every candidate of `row` not excluded by `skip`. Pairs the engine
/// rejects are dropped. A NaN or infinite score is not a valid result: the
/// pair is dropped and the reason kept for the anomaly log.
pub(crate) fn score_row<E, F>(
    engine: &E,
    sources: &[&dyn RowSource<E::Tuple>],
    generator: &CandidateGenerator<'_, E::Key>,
    row: RowRef,
    keys: &[E::Key],
    mut skip: F,
) -> RowScores
where
    E: MatchEngine,
    F: FnMut(RowRef) -> bool,
{
    let mut scores = RowScores::default();
    let candidates = generator.candidates(row, keys);
    if candidates.is_empty() {
        return scores;
    }
    let tuple = sources[row.table].tuple(row.row);
    for candidate in candidates {
        if skip(candidate) {
            continue;
        }
        let other = sources[candidate.table].tuple(candidate.row);
        match engine.score(&tuple, &other) {
            Some(score) if score.is_finite() => scores.accepted.push((candidate, score)),
            Some(score) => scores.rejected_scores.push(
                (candidate, format!("score {} against row {}", score, candidate))
            ),
            None => {}
        }
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ExactEngine;
    use crate::matcher::anomaly::AnomalyLog;
    use crate::matcher::batch::BatchRunner;
    use crate::matcher::progress::{CancelToken, PhaseTracker};

    fn index_of(table: usize, rows: &Vec<Vec<u32>>) -> BinIndex<u32> {
        // Multi-key engine: each row lists its own keys.
        struct ListEngine;
        impl MatchEngine for ListEngine {
            type Tuple = Vec<u32>;
            type Key = u32;
            fn bin_keys(&self, t: &Vec<u32>) -> std::result::Result<Vec<u32>, String> {
                Ok(t.clone())
            }
            fn score(&self, _a: &Vec<u32>, _b: &Vec<u32>) -> Option<f64> {
                Some(1.0)
            }
            fn description(&self) -> String {
                "list".to_string()
            }
        }
        let cancel = CancelToken::new();
        let mut tracker = PhaseTracker::new(None, &cancel);
        let mut anomalies = AnomalyLog::new(0);
        let source: &dyn RowSource<Vec<u32>> = rows;
        BinIndex::build(table, source, &ListEngine, &BatchRunner::serial(8), &mut tracker, &mut anomalies).unwrap()
    }

    #[test]
    fn candidates_are_deduplicated_in_discovery_order() {
        let t0 = vec![vec![1, 2]];
        let t1 = vec![vec![2], vec![1, 2], vec![3], vec![1]];
        let i0 = index_of(0, &t0);
        let i1 = index_of(1, &t1);
        let generator = CandidateGenerator::new(vec![&i1]);
        let found = generator.candidates(RowRef::new(0, 0), i0.keys(0).unwrap());
        assert_eq!(found, vec![RowRef::new(1, 1), RowRef::new(1, 3), RowRef::new(1, 0)]);
    }

    #[test]
    fn query_row_excluded_within_own_table() {
        let t0 = vec![vec![5], vec![5], vec![6]];
        let i0 = index_of(0, &t0);
        let generator = CandidateGenerator::new(vec![&i0]);
        assert_eq!(generator.candidates(RowRef::new(0, 0), &[5]), vec![RowRef::new(0, 1)]);
        assert!(generator.candidates(RowRef::new(0, 2), &[6]).is_empty());
    }

    #[test]
    fn score_row_drops_rejections_and_bad_scores() {
        struct OddEngine;
        impl MatchEngine for OddEngine {
            type Tuple = i32;
            type Key = u8;
            fn bin_keys(&self, _t: &i32) -> std::result::Result<Vec<u8>, String> {
                Ok(vec![0])
            }
            fn score(&self, a: &i32, b: &i32) -> Option<f64> {
                match b {
                    0 => None,
                    1 => Some(f64::NAN),
                    _ => Some((a - b).abs() as f64),
                }
            }
            fn description(&self) -> String {
                "odd".to_string()
            }
        }
        let left: Vec<i32> = vec![10];
        let right: Vec<i32> = vec![0, 1, 7];
        let sources: Vec<&dyn RowSource<i32>> = vec![&left, &right];
        let cancel = CancelToken::new();
        let mut tracker = PhaseTracker::new(None, &cancel);
        let mut anomalies = AnomalyLog::new(0);
        let runner = BatchRunner::serial(8);
        let i1 = BinIndex::build(1, sources[1], &OddEngine, &runner, &mut tracker, &mut anomalies).unwrap();
        let generator = CandidateGenerator::new(vec![&i1]);

        let scores = score_row(&OddEngine, &sources, &generator, RowRef::new(0, 0), &[0], |_| false);
        assert_eq!(scores.accepted, vec![(RowRef::new(1, 2), 3.0)]);
        assert_eq!(scores.rejected_scores.len(), 1);
        assert_eq!(scores.rejected_scores[0].0, RowRef::new(1, 1));

        let skipped = score_row(&OddEngine, &sources, &generator, RowRef::new(0, 0), &[0],
            |c| c == RowRef::new(1, 2));
        assert!(skipped.accepted.is_empty());
    }

    #[test]
    fn exact_engine_candidates() {
        let engine = ExactEngine::<u32>::new();
        let left: Vec<u32> = vec![4];
        let right: Vec<u32> = vec![4, 5, 4];
        let sources: Vec<&dyn RowSource<u32>> = vec![&left, &right];
        let cancel = CancelToken::new();
        let mut tracker = PhaseTracker::new(None, &cancel);
        let mut anomalies = AnomalyLog::new(0);
        let runner = BatchRunner::serial(8);
        let i1 = BinIndex::build(1, sources[1], &engine, &runner, &mut tracker, &mut anomalies).unwrap();
        let generator = CandidateGenerator::new(vec![&i1]);
        let scores = score_row(&engine, &sources, &generator, RowRef::new(0, 0), &[4], |_| false);
        assert_eq!(scores.accepted, vec![(RowRef::new(1, 0), 0.0), (RowRef::new(1, 2), 0.0)]);
    }
}
