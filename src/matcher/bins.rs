// src/matcher/bins.rs
use ahash::AHashMap;
use std::hash::Hash;
use std::time::Instant;
use log::{info, debug};
use crate::error::Result;
use crate::engine::{MatchEngine, RowSource};
use crate::types::RowRef;
use super::anomaly::{AnomalyKind, AnomalyLog};
use super::batch::BatchRunner;
use super::progress::PhaseTracker;

/// Bin key buckets for one table.
///
/// Each bucket lists the rows carrying that key in ascending row order.
/// The keys computed for every row are kept so candidate generation never
/// asks the engine twice. Rows whose keys could not be computed have no
/// entry and appear in no bucket.
#[derive(Debug)]
pub struct BinIndex<K> {
    table: usize,
    buckets: AHashMap<K, Vec<RowRef>>,
    row_keys: Vec<Option<Vec<K>>>,
}

impl<K: Hash + Eq + Clone + Send + Sync> BinIndex<K> {
    pub(crate) fn build<E>(
        table: usize,
        source: &dyn RowSource<E::Tuple>,
        engine: &E,
        runner: &BatchRunner,
        tracker: &mut PhaseTracker<'_>,
        anomalies: &mut AnomalyLog,
    ) -> Result<Self>
    where
        E: MatchEngine<Key = K>,
    {
        let start_time = Instant::now();
        let nrow = source.row_count();
        let mut row_keys: Vec<Option<Vec<K>>> = Vec::new();
        row_keys.try_reserve_exact(nrow)?;
        let mut buckets: AHashMap<K, Vec<RowRef>> = AHashMap::new();
        let anomalies_before = anomalies.count();

        for batch in runner.batches(nrow) {
            tracker.checkpoint()?;
            let end = batch.end;
            let computed = runner.map(batch.clone(), |row| engine.bin_keys(&source.tuple(row)));

            for (row, keys) in batch.zip(computed) {
                let rref = RowRef::new(table, row);
                match keys {
                    Ok(keys) => {
                        for key in &keys {
                            let bucket = buckets.entry(key.clone()).or_insert_with(Vec::new);
                            // An engine may repeat a key for one row
                            if bucket.last() != Some(&rref) {
                                bucket.push(rref);
                            }
                        }
                        row_keys.push(Some(keys));
                    }
                    Err(reason) => {
                        anomalies.record(rref, AnomalyKind::BinKeys, reason);
                        row_keys.push(None);
                    }
                }
            }
            tracker.set_level(end as f64 / nrow as f64);
        }

        let excluded = anomalies.count() - anomalies_before;
        info!("Binned table {}: {} rows into {} bins in {:?}",
            table + 1, nrow, buckets.len(), start_time.elapsed());
        if excluded > 0 {
            info!("Table {}: {} rows excluded from binning", table + 1, excluded);
        }
        if log::log_enabled!(log::Level::Debug) {
            let refs: usize = buckets.values().map(|b| b.len()).sum();
            let largest = buckets.values().map(|b| b.len()).max().unwrap_or(0);
            debug!("Table {}: {} bin entries, largest bin {} rows", table + 1, refs, largest);
        }

        Ok(Self { table, buckets, row_keys })
    }

    pub fn table(&self) -> usize {
        self.table
    }

    /// Rows carrying `key`, in row order. Empty when the key is absent.
    pub fn bucket(&self, key: &K) -> &[RowRef] {
        self.buckets.get(key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Keys computed for `row`, or `None` if the row was excluded.
    pub fn keys(&self, row: usize) -> Option<&[K]> {
        self.row_keys.get(row).and_then(|k| k.as_deref())
    }

    pub fn bin_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn row_count(&self) -> usize {
        self.row_keys.len()
    }
}
