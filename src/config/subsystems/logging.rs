// src/config/subsystems/logging.rs

use serde::{Serialize, Deserialize};
use std::path::PathBuf;
use log::LevelFilter;
use crate::error::{Error, Result};
use crate::config::FromIni;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    // Log to a timestamped file here instead of stderr
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> Option<LevelFilter> {
        match self.level.to_lowercase().as_str() {
            "error" => Some(LevelFilter::Error),
            "warn" => Some(LevelFilter::Warn),
            "info" => Some(LevelFilter::Info),
            "debug" => Some(LevelFilter::Debug),
            "trace" => Some(LevelFilter::Trace),
            "none" => Some(LevelFilter::Off),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.level_filter().is_none() {
            return Err(Error::Config(format!("Invalid log level: {}", self.level)));
        }
        Ok(())
    }
}

impl FromIni for LoggingConfig {
    fn from_ini_section(&mut self, section_name: &str, key: &str, value: &str) -> Option<Result<()>> {
        if section_name != "logging" {
            return None;
        }
        match key {
            "level" => {
                self.level = value.trim_matches('"').to_string();
                Some(Ok(()))
            },
            "log_dir" => {
                let dir = value.trim_matches('"');
                self.log_dir = if dir.is_empty() { None } else { Some(PathBuf::from(dir)) };
                Some(Ok(()))
            },
            _ => None,
        }
    }
}
