//! rowmatch finds matching rows across two or more tables.
//!
//! A [`MatchEngine`] decides which rows could match (bin keys) and how well
//! they match (score). [`RowMatcher`] drives the engine over the tables and
//! produces either best one-to-one pairs between two tables or transitive
//! groups across many.

// Module declarations
pub mod error;
pub mod types;
pub mod engine;
pub mod matcher;
pub mod config;
pub mod utils;

// Re-exports
pub use error::{Error, Result};
pub use types::{Score, RowRef, RowLink, PairMatches, GroupMatches, MatchResult};
pub use engine::{MatchEngine, RowSource, CartesianEngine, ExactEngine};
pub use matcher::{RowMatcher, CancelToken, ProgressSink, MatchSummary};

// Re-export the config from config module
pub use config::RowMatchConfig;
