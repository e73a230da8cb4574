// src/matcher/anomaly.rs
use serde::Serialize;
use std::fmt;
use log::{debug, warn};
use crate::types::RowRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// The engine could not compute bin keys; the row was not binned.
    BinKeys,
    /// The engine returned a NaN or infinite score; the pair was discarded.
    Score,
}

impl AnomalyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyKind::BinKeys => "bin_keys",
            AnomalyKind::Score => "score",
        }
    }
}

/// A row that could not take part in matching. Not fatal to the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowAnomaly {
    pub row: RowRef,
    pub kind: AnomalyKind,
    pub reason: String,
}

impl fmt::Display for RowAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {} [{}]: {}", self.row, self.kind.as_str(), self.reason)
    }
}

/// Count of anomalies seen during a run, with the first few kept as a sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnomalySummary {
    pub count: usize,
    pub sample: Vec<RowAnomaly>,
}

impl AnomalySummary {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Accumulates anomalies in the order they are observed.
#[derive(Debug)]
pub(crate) struct AnomalyLog {
    sample_size: usize,
    count: usize,
    sample: Vec<RowAnomaly>,
}

impl AnomalyLog {
    pub(crate) fn new(sample_size: usize) -> Self {
        Self {
            sample_size,
            count: 0,
            sample: Vec::with_capacity(sample_size.min(64)),
        }
    }

    pub(crate) fn record(&mut self, row: RowRef, kind: AnomalyKind, reason: String) {
        self.count += 1;
        let anomaly = RowAnomaly { row, kind, reason };
        if self.sample.len() < self.sample_size {
            warn!("Row anomaly {}", anomaly);
            self.sample.push(anomaly);
        } else {
            debug!("Row anomaly {}", anomaly);
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.count
    }

    pub(crate) fn into_summary(self) -> AnomalySummary {
        AnomalySummary {
            count: self.count,
            sample: self.sample,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_count_beyond_sample() {
        let mut log = AnomalyLog::new(2);
        for i in 0..5 {
            log.record(RowRef::new(0, i), AnomalyKind::BinKeys, format!("bad row {}", i));
        }
        assert_eq!(log.count(), 5);
        let summary = log.into_summary();
        assert_eq!(summary.count, 5);
        assert_eq!(summary.sample.len(), 2);
        assert_eq!(summary.sample[1].row, RowRef::new(0, 1));
    }

    #[test]
    fn zero_sample_still_counts() {
        let mut log = AnomalyLog::new(0);
        log.record(RowRef::new(1, 3), AnomalyKind::Score, "NaN".to_string());
        let summary = log.into_summary();
        assert_eq!(summary.count, 1);
        assert!(summary.sample.is_empty());
        assert!(!summary.is_empty());
    }

    #[test]
    fn display_names_row_and_kind() {
        let a = RowAnomaly {
            row: RowRef::new(1, 7),
            kind: AnomalyKind::Score,
            reason: "score is NaN".to_string(),
        };
        assert_eq!(a.to_string(), "row 1:7 [score]: score is NaN");
    }
}
