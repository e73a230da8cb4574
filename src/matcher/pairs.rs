// src/matcher/pairs.rs
use bit_vec::BitVec;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Instant;
use log::{info, debug, trace};
use crate::error::Result;
use crate::engine::{MatchEngine, RowSource};
use crate::types::{RowLink, RowRef, Score};
use super::anomaly::{AnomalyKind, AnomalyLog};
use super::batch::BatchRunner;
use super::bins::BinIndex;
use super::candidates::{score_row, CandidateGenerator, RowScores};
use super::progress::PhaseTracker;

// Resolution reports progress and polls for cancellation this often.
const RESOLUTION_STEP: usize = 10_000;

/// One candidate pair that survived scoring: `a` from table 1, `b` from table 2.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ScoredPair {
    pub(crate) score: Score,
    pub(crate) a: RowRef,
    pub(crate) b: RowRef,
}

impl ScoredPair {
    /// Best score first; equal scores fall back to canonical row order.
    /// Adding 0.0 folds -0.0 into +0.0 so the two compare equal.
    fn resolution_order(&self, other: &Self) -> Ordering {
        (self.score + 0.0).total_cmp(&(other.score + 0.0))
            .then_with(|| self.a.cmp(&other.a))
            .then_with(|| self.b.cmp(&other.b))
    }
}

/// Scores every row of table 1 against its candidates in table 2.
pub(crate) fn score_pairs<E: MatchEngine>(
    engine: &E,
    sources: &[&dyn RowSource<E::Tuple>],
    indexes: &[BinIndex<E::Key>],
    runner: &BatchRunner,
    tracker: &mut PhaseTracker<'_>,
    anomalies: &mut AnomalyLog,
) -> Result<Vec<ScoredPair>> {
    let start_time = Instant::now();
    let generator = CandidateGenerator::new(vec![&indexes[1]]);
    let nrow = sources[0].row_count();
    let mut pairs: Vec<ScoredPair> = Vec::new();

    for batch in runner.batches(nrow) {
        tracker.checkpoint()?;
        let end = batch.end;
        let scored: Vec<Option<RowScores>> = runner.map(batch.clone(), |row| {
            indexes[0].keys(row).map(|keys| {
                score_row(engine, sources, &generator, RowRef::new(0, row), keys, |_| false)
            })
        });

        for (row, scores) in batch.zip(scored) {
            let Some(scores) = scores else { continue };
            let a = RowRef::new(0, row);
            for (_, reason) in scores.rejected_scores {
                anomalies.record(a, AnomalyKind::Score, reason);
            }
            pairs.try_reserve(scores.accepted.len())?;
            for (b, score) in scores.accepted {
                trace!("candidate {} ~ {} score {}", a, b, score);
                pairs.push(ScoredPair { score, a, b });
            }
        }
        tracker.set_level(end as f64 / nrow as f64);
    }

    info!("Scored {} rows of table 1: {} candidate pairs in {:?}",
        nrow, pairs.len(), start_time.elapsed());
    Ok(pairs)
}

/// Greedy best-score-first assignment.
///
/// Pairs are taken in ascending score order (ties by canonical row order)
/// and a pair is accepted only if neither row has been taken by an earlier
/// one. Singletons without a score are then added for unmatched rows of
/// each table whose `require_all` flag is set.
pub(crate) fn resolve_pairs(
    mut pairs: Vec<ScoredPair>,
    row_counts: [usize; 2],
    require_all: [bool; 2],
    tracker: &mut PhaseTracker<'_>,
) -> Result<BTreeMap<RowLink, Option<Score>>> {
    let start_time = Instant::now();
    pairs.sort_unstable_by(ScoredPair::resolution_order);
    tracker.checkpoint()?;

    let mut used = [
        BitVec::from_elem(row_counts[0], false),
        BitVec::from_elem(row_counts[1], false),
    ];
    let mut links: BTreeMap<RowLink, Option<Score>> = BTreeMap::new();
    let total = pairs.len();

    for (i, pair) in pairs.iter().enumerate() {
        if i % RESOLUTION_STEP == 0 && i > 0 {
            tracker.checkpoint()?;
            tracker.set_level(i as f64 / total as f64);
        }
        if used[0][pair.a.row] || used[1][pair.b.row] {
            continue;
        }
        used[0].set(pair.a.row, true);
        used[1].set(pair.b.row, true);
        links.insert(RowLink::pair(pair.a, pair.b), Some(pair.score));
    }
    let matched = links.len();
    debug!("Accepted {} of {} candidate pairs", matched, total);

    for (table, used) in used.iter().enumerate() {
        if !require_all[table] {
            continue;
        }
        for row in used.iter().enumerate().filter(|(_, u)| !u).map(|(row, _)| row) {
            links.insert(RowLink::singleton(RowRef::new(table, row)), None);
        }
    }

    info!("Resolved {} pairs ({} output links) in {:?}",
        matched, links.len(), start_time.elapsed());
    Ok(links)
}
