use std::fs::{self, File};
use std::path::PathBuf;
use env_logger::{Builder, Target};
use log::LevelFilter;
use crate::config::subsystems::LoggingConfig;
use crate::error::{Error, Result};

/// Installs the global logger. With `log_dir` set, output goes to
/// `<log_dir>/matcher_<timestamp>.log`; otherwise to stderr.
///
/// Returns the log file path when one was created.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<PathBuf>> {
    let level = config.level_filter()
        .ok_or_else(|| Error::config(format!("Invalid log level: {}", config.level)))?;

    let mut builder = Builder::new();
    builder.filter(None, level);

    let log_path = match &config.log_dir {
        Some(dir) if level != LevelFilter::Off => {
            fs::create_dir_all(dir)?;
            let timestamp = chrono::Local::now().format("%m_%d_%H_%M_%S");
            let path = dir.join(format!("matcher_{}.log", timestamp));
            let log_file = File::create(&path)?;
            builder.target(Target::Pipe(Box::new(log_file)));
            Some(path)
        },
        _ => {
            builder.target(Target::Stderr);
            None
        },
    };

    // A logger may already be installed (tests, embedding apps)
    if builder.try_init().is_err() {
        log::debug!("Global logger already initialised; keeping it");
    }
    Ok(log_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_into_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            level: "info".to_string(),
            log_dir: Some(dir.path().join("logs")),
        };
        let path = init_logging(&config).unwrap().unwrap();
        assert!(path.exists());
        assert!(path.starts_with(dir.path()));
    }

    #[test]
    fn rejects_unknown_level() {
        let config = LoggingConfig { level: "chatty".to_string(), log_dir: None };
        assert!(init_logging(&config).is_err());
    }
}
