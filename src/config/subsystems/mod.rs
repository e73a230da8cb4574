pub mod matcher;
pub mod engine;
pub mod logging;

pub use matcher::MatcherConfig;
pub use engine::{EngineConfig, EngineKind};
pub use logging::LoggingConfig;
