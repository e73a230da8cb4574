// src/matcher/row_matcher.rs
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use log::{info, debug, warn};
use crate::error::{Error, Result};
use crate::engine::{MatchEngine, RowSource};
use crate::config::subsystems::matcher::MatcherConfig;
use crate::types::{GroupMatches, PairMatches};
use super::anomaly::AnomalyLog;
use super::batch::BatchRunner;
use super::bins::BinIndex;
use super::groups::{collect_groups, link_groups};
use super::links::LinkSet;
use super::pairs::{resolve_pairs, score_pairs};
use super::progress::{CancelToken, MatchState, Phase, PhaseTracker, ProgressSink};

/// Finds rows that refer to the same entity across two or more tables.
///
/// The engine decides which rows are comparable (bin keys) and how well they
/// match (score). Bin indexes and link sets live only for the duration of
/// one call; nothing is shared between calls except the configuration, the
/// progress sink and the cancel token.
pub struct RowMatcher<'a, E: MatchEngine> {
    engine: &'a E,
    tables: Vec<&'a dyn RowSource<E::Tuple>>,
    config: MatcherConfig,
    progress: Option<Arc<dyn ProgressSink>>,
    cancel: CancelToken,
}

impl<'a, E: MatchEngine> fmt::Debug for RowMatcher<'a, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowMatcher")
            .field("engine", &self.engine.description())
            .field("tables", &self.tables.len())
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<'a, E: MatchEngine> RowMatcher<'a, E> {
    pub fn new(engine: &'a E) -> Self {
        Self {
            engine,
            tables: Vec::new(),
            config: MatcherConfig::default(),
            progress: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_tables(engine: &'a E, tables: Vec<&'a dyn RowSource<E::Tuple>>) -> Self {
        let mut matcher = Self::new(engine);
        matcher.tables = tables;
        matcher
    }

    /// Appends a table and returns its index.
    pub fn add_table<S: RowSource<E::Tuple> + 'a>(&mut self, source: &'a S) -> usize {
        self.tables.push(source);
        self.tables.len() - 1
    }

    pub fn with_config(mut self, config: MatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn engine(&self) -> &E {
        self.engine
    }

    pub fn set_progress_sink(&mut self, sink: Arc<dyn ProgressSink>) {
        self.progress = Some(sink);
    }

    /// Shares an externally owned cancel token, e.g. one wired to a signal handler.
    pub fn set_cancel_token(&mut self, token: CancelToken) {
        self.cancel = token;
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Requests that the running call, or the next one, stop at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// One-to-one matching between exactly two tables.
    ///
    /// Unmatched rows of table 1 (resp. 2) are returned as unscored
    /// singletons when `require_all_1` (resp. `require_all_2`) is set.
    pub fn find_pair_matches(&self, require_all_1: bool, require_all_2: bool) -> Result<PairMatches> {
        if self.tables.len() != 2 {
            return Err(Error::invalid_config(format!(
                "pair matching needs exactly 2 tables, got {}", self.tables.len()
            )));
        }
        self.check_config()?;

        let start_time = Instant::now();
        info!("Starting pair match: {} ({} x {} rows)",
            self.engine.description(), self.tables[0].row_count(), self.tables[1].row_count());

        let mut tracker = PhaseTracker::new(self.progress.as_deref(), &self.cancel);
        let mut anomalies = AnomalyLog::new(self.config.anomaly_sample_size);
        let runner = BatchRunner::from_config(&self.config)?;

        let indexes = self.build_indexes(&runner, &mut tracker, &mut anomalies)?;

        tracker.enter(MatchState::Scoring)?;
        tracker.start_phase(Phase::Scoring)?;
        let pairs = score_pairs(self.engine, &self.tables, &indexes, &runner, &mut tracker, &mut anomalies)?;
        tracker.end_phase()?;
        drop(indexes);

        tracker.enter(MatchState::Resolution)?;
        tracker.start_phase(Phase::Resolution)?;
        let row_counts = [self.tables[0].row_count(), self.tables[1].row_count()];
        let links = resolve_pairs(pairs, row_counts, [require_all_1, require_all_2], &mut tracker)?;
        tracker.end_phase()?;
        tracker.finish()?;

        let anomalies = anomalies.into_summary();
        self.report(&tracker, anomalies.count, start_time);
        Ok(PairMatches { links, anomalies })
    }

    /// Transitive grouping across two or more tables.
    ///
    /// `require_all[t]` keeps unmatched rows of table `t` as singleton links.
    pub fn find_group_matches(&self, require_all: &[bool]) -> Result<GroupMatches> {
        if self.tables.len() < 2 {
            return Err(Error::invalid_config(format!(
                "group matching needs at least 2 tables, got {}", self.tables.len()
            )));
        }
        if require_all.len() != self.tables.len() {
            return Err(Error::invalid_config(format!(
                "{} require_all flags given for {} tables", require_all.len(), self.tables.len()
            )));
        }
        self.check_config()?;

        let start_time = Instant::now();
        info!("Starting group match: {} over {} tables",
            self.engine.description(), self.tables.len());

        let mut tracker = PhaseTracker::new(self.progress.as_deref(), &self.cancel);
        let mut anomalies = AnomalyLog::new(self.config.anomaly_sample_size);
        let runner = BatchRunner::from_config(&self.config)?;

        let indexes = self.build_indexes(&runner, &mut tracker, &mut anomalies)?;

        tracker.enter(MatchState::Scoring)?;
        tracker.start_phase(Phase::Scoring)?;
        let counts: Vec<usize> = self.tables.iter().map(|t| t.row_count()).collect();
        let mut links = LinkSet::new(&counts)?;
        link_groups(self.engine, &self.tables, &indexes, &mut links, &runner, &mut tracker, &mut anomalies)?;
        tracker.end_phase()?;
        drop(indexes);

        tracker.enter(MatchState::Resolution)?;
        tracker.start_phase(Phase::Resolution)?;
        let groups = collect_groups(&mut links, require_all);
        tracker.end_phase()?;
        tracker.finish()?;

        let anomalies = anomalies.into_summary();
        self.report(&tracker, anomalies.count, start_time);
        Ok(GroupMatches { links: groups, anomalies })
    }

    fn check_config(&self) -> Result<()> {
        self.config.validate().map_err(|e| Error::invalid_config(e.to_string()))
    }

    fn build_indexes(
        &self,
        runner: &BatchRunner,
        tracker: &mut PhaseTracker<'_>,
        anomalies: &mut AnomalyLog,
    ) -> Result<Vec<BinIndex<E::Key>>> {
        tracker.enter(MatchState::Binning)?;
        let mut indexes = Vec::with_capacity(self.tables.len());
        for (table, source) in self.tables.iter().enumerate() {
            tracker.start_phase(Phase::Binning { table })?;
            indexes.push(BinIndex::build(table, *source, self.engine, runner, tracker, anomalies)?);
            tracker.end_phase()?;
        }
        Ok(indexes)
    }

    fn report(&self, tracker: &PhaseTracker<'_>, anomaly_count: usize, start_time: Instant) {
        debug!("Match finished in state {:?}", tracker.state());
        if anomaly_count > 0 {
            let message = format!("{} row anomalies recorded (malformed rows or non-finite scores)", anomaly_count);
            warn!("{}", message);
            tracker.log_message(&message);
        }
        info!("Matching complete in {:?}", start_time.elapsed());
    }
}
