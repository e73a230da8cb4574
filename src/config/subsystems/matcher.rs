// src/config/subsystems/matcher.rs

use serde::{Serialize, Deserialize};
use crate::error::{Error, Result};
use crate::config::FromIni;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    // Score rows on the rayon pool; merging stays single-threaded
    pub parallel: bool,
    // 0 = rayon's global pool
    pub thread_count: usize,
    // Rows per batch between cancellation checks
    pub cancel_check_rows: usize,
    // Anomalies kept verbatim in the result summary
    pub anomaly_sample_size: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            thread_count: 0,
            cancel_check_rows: 1000,
            anomaly_sample_size: 10,
        }
    }
}

pub(crate) fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim_matches('"').to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(Error::Config(format!("Invalid {} (must be true or false): {}", key, value))),
    }
}

impl FromIni for MatcherConfig {
    fn from_ini_section(&mut self, section_name: &str, key: &str, value: &str) -> Option<Result<()>> {
        if section_name != "matcher" {
            return None;
        }

        match key {
            "parallel" => {
                Some(parse_bool(key, value).map(|v| self.parallel = v))
            },
            "thread_count" => {
                match value.parse() {
                    Ok(count) => {
                        self.thread_count = count;
                        Some(Ok(()))
                    },
                    Err(_) => Some(Err(Error::Config(
                        format!("Invalid thread_count: {}", value)
                    ))),
                }
            },
            "cancel_check_rows" => {
                match value.parse::<usize>() {
                    Ok(rows) if rows > 0 => {
                        self.cancel_check_rows = rows;
                        Some(Ok(()))
                    },
                    _ => Some(Err(Error::Config(
                        format!("Invalid cancel_check_rows (must be > 0): {}", value)
                    ))),
                }
            },
            "anomaly_sample_size" => {
                match value.parse() {
                    Ok(size) => {
                        self.anomaly_sample_size = size;
                        Some(Ok(()))
                    },
                    Err(_) => Some(Err(Error::Config(
                        format!("Invalid anomaly_sample_size: {}", value)
                    ))),
                }
            },
            _ => None,
        }
    }
}

impl MatcherConfig {
    pub fn validate(&self) -> Result<()> {
        if self.cancel_check_rows == 0 {
            return Err(Error::Config("cancel_check_rows must be greater than 0".to_string()));
        }
        Ok(())
    }
}
