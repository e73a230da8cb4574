pub mod anomaly;
pub mod bins;
pub mod candidates;
pub mod links;
pub mod progress;
pub mod row_matcher;
pub mod summary;
mod batch;
mod groups;
mod pairs;

// Re-export the main types
pub use self::row_matcher::RowMatcher;
pub use self::bins::BinIndex;
pub use self::candidates::CandidateGenerator;
pub use self::links::LinkSet;
pub use self::summary::MatchSummary;
pub use self::anomaly::{AnomalyKind, AnomalySummary, RowAnomaly};
pub use self::progress::{
    Phase,
    ProgressSink,
    LogProgress,
    BarProgress,
    CancelToken,
    MatchState,
};
