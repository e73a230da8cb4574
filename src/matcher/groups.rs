// src/matcher/groups.rs
use std::time::Instant;
use log::{info, debug, trace};
use crate::error::Result;
use crate::engine::{MatchEngine, RowSource};
use crate::types::{RowLink, RowRef};
use super::anomaly::{AnomalyKind, AnomalyLog};
use super::batch::BatchRunner;
use super::bins::BinIndex;
use super::candidates::{score_row, CandidateGenerator, RowScores};
use super::links::LinkSet;
use super::progress::PhaseTracker;

/// Unions every accepted pair between rows of different tables.
///
/// Each row is compared only against the tables after its own, so every
/// unordered table pair is scored once. Rows are visited by table, then row,
/// then candidate discovery order. In serial mode candidates already in the
/// row's set are skipped without scoring; in parallel mode a batch is scored
/// first and the merge drops the same candidates, so links and anomalies
/// come out identical.
pub(crate) fn link_groups<E: MatchEngine>(
    engine: &E,
    sources: &[&dyn RowSource<E::Tuple>],
    indexes: &[BinIndex<E::Key>],
    links: &mut LinkSet,
    runner: &BatchRunner,
    tracker: &mut PhaseTracker<'_>,
    anomalies: &mut AnomalyLog,
) -> Result<()> {
    let start_time = Instant::now();
    let total_rows: usize = sources.iter().map(|s| s.row_count()).sum();
    let mut done_rows = 0usize;
    let mut merges = 0usize;

    // The last table has no later tables to compare against.
    for table in 0..sources.len().saturating_sub(1) {
        let generator = CandidateGenerator::new(indexes[table + 1..].iter().collect());
        let index = &indexes[table];
        let nrow = sources[table].row_count();
        let table_merges = merges;

        for batch in runner.batches(nrow) {
            tracker.checkpoint()?;
            let batch_len = batch.len();

            if runner.is_parallel() {
                let scored: Vec<Option<RowScores>> = runner.map(batch.clone(), |row| {
                    index.keys(row).map(|keys| {
                        score_row(engine, sources, &generator, RowRef::new(table, row), keys, |_| false)
                    })
                });
                for (row, scores) in batch.zip(scored) {
                    if let Some(scores) = scores {
                        merges += merge_row(links, anomalies, RowRef::new(table, row), scores);
                    }
                }
            } else {
                for row in batch {
                    let Some(keys) = index.keys(row) else { continue };
                    let rref = RowRef::new(table, row);
                    let scores = score_row(engine, sources, &generator, rref, keys,
                        |candidate| links.same_set(rref, candidate));
                    merges += merge_row(links, anomalies, rref, scores);
                }
            }

            done_rows += batch_len;
            tracker.set_level(done_rows as f64 / total_rows as f64);
        }
        debug!("Table {}: {} merges against later tables", table + 1, merges - table_merges);
    }

    info!("Linked {} rows across {} tables: {} merges, {} sets in {:?}",
        total_rows, sources.len(), merges, links.set_count(), start_time.elapsed());
    Ok(())
}

/// Applies one row's scores to the link set. Candidates already in the row's
/// set when the row is reached are dropped first, scored or not, so a batch
/// scored in parallel merges exactly like the serial scan that skipped them.
fn merge_row(links: &mut LinkSet, anomalies: &mut AnomalyLog, row: RowRef, scores: RowScores) -> usize {
    let RowScores { mut accepted, mut rejected_scores } = scores;
    accepted.retain(|(candidate, _)| !links.same_set(row, *candidate));
    rejected_scores.retain(|(candidate, _)| !links.same_set(row, *candidate));

    for (_, reason) in rejected_scores {
        anomalies.record(row, AnomalyKind::Score, reason);
    }
    let mut merged = 0;
    for (candidate, score) in accepted {
        if links.union(row, candidate) {
            trace!("linked {} ~ {} score {}", row, candidate, score);
            merged += 1;
        }
    }
    merged
}

/// Output links: every multi-row set, plus singletons of tables whose
/// `require_all` flag is set. Sets come out in canonical order.
pub(crate) fn collect_groups(links: &mut LinkSet, require_all: &[bool]) -> Vec<RowLink> {
    links
        .all_sets()
        .filter(|link| link.len() > 1 || require_all[link.first().table])
        .collect()
}
