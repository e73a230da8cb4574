// src/engine/mod.rs
pub mod cartesian;
pub mod exact;

use serde::Serialize;
use std::fmt::Debug;
use std::hash::Hash;
use crate::types::Score;

pub use self::cartesian::CartesianEngine;
pub use self::exact::ExactEngine;

/// A named parameter the engine was configured with, reported alongside results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchParameter {
    pub name: String,
    pub value: String,
    pub description: String,
}

impl MatchParameter {
    pub fn new(name: &str, value: impl ToString, description: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            description: description.to_string(),
        }
    }
}

/// The pluggable similarity capability the matcher is driven by.
///
/// `bin_keys` must guarantee that any two tuples `score` would accept share
/// at least one key; rows sharing no key are never compared.
pub trait MatchEngine: Send + Sync {
    type Tuple: Send + Sync;
    type Key: Hash + Eq + Clone + Debug + Send + Sync;

    /// Locality keys for a tuple. An error marks the row as malformed; the
    /// message is kept as the anomaly reason.
    fn bin_keys(&self, tuple: &Self::Tuple) -> std::result::Result<Vec<Self::Key>, String>;

    /// `None` rejects the pair. Lower scores are better matches.
    fn score(&self, a: &Self::Tuple, b: &Self::Tuple) -> Option<Score>;

    fn description(&self) -> String;

    fn match_parameters(&self) -> Vec<MatchParameter> {
        Vec::new()
    }
}

/// Random-access rows of one input table.
pub trait RowSource<T>: Send + Sync {
    fn row_count(&self) -> usize;
    fn tuple(&self, row: usize) -> T;
}

impl<T: Clone + Send + Sync> RowSource<T> for Vec<T> {
    fn row_count(&self) -> usize {
        self.len()
    }

    fn tuple(&self, row: usize) -> T {
        self[row].clone()
    }
}

impl<T: Clone + Send + Sync> RowSource<T> for [T] {
    fn row_count(&self) -> usize {
        self.len()
    }

    fn tuple(&self, row: usize) -> T {
        self[row].clone()
    }
}
