// src/matcher/batch.rs
use std::ops::Range;
use rayon::prelude::*;
use log::debug;
use crate::error::Result;
use crate::config::subsystems::matcher::MatcherConfig;

/// Splits a row scan into fixed-size batches and maps each batch either
/// serially or on a rayon pool. Results always come back in row order, so
/// the caller's merge step sees the same sequence either way.
pub(crate) struct BatchRunner {
    parallel: bool,
    batch_rows: usize,
    pool: Option<rayon::ThreadPool>,
}

impl BatchRunner {
    pub(crate) fn from_config(config: &MatcherConfig) -> Result<Self> {
        let pool = if config.parallel && config.thread_count > 0 {
            debug!("Building scoring pool with {} threads", config.thread_count);
            Some(rayon::ThreadPoolBuilder::new()
                .num_threads(config.thread_count)
                .build()?)
        } else {
            None
        };
        if config.parallel {
            debug!("Parallel scoring on {} threads", Self::thread_count(config));
        }
        Ok(Self {
            parallel: config.parallel,
            batch_rows: config.cancel_check_rows.max(1),
            pool,
        })
    }

    #[cfg(test)]
    pub(crate) fn serial(batch_rows: usize) -> Self {
        Self { parallel: false, batch_rows: batch_rows.max(1), pool: None }
    }

    fn thread_count(config: &MatcherConfig) -> usize {
        if config.thread_count > 0 {
            config.thread_count
        } else {
            num_cpus::get()
        }
    }

    pub(crate) fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Consecutive row ranges covering `0..rows`.
    pub(crate) fn batches(&self, rows: usize) -> impl Iterator<Item = Range<usize>> {
        let step = self.batch_rows;
        (0..rows).step_by(step).map(move |start| start..(start + step).min(rows))
    }

    pub(crate) fn map<R, F>(&self, rows: Range<usize>, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(usize) -> R + Send + Sync,
    {
        if !self.parallel {
            return rows.map(f).collect();
        }
        match &self.pool {
            Some(pool) => pool.install(|| rows.into_par_iter().map(&f).collect()),
            None => rows.into_par_iter().map(&f).collect(),
        }
    }
}
