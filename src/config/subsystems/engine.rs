// src/config/subsystems/engine.rs

use std::str::FromStr;
use serde::{Serialize, Deserialize};
use crate::error::{Error, Result};
use crate::config::FromIni;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineKind {
    Cartesian,
    Exact,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Cartesian => "cartesian",
            EngineKind::Exact => "exact",
        }
    }
}

impl FromStr for EngineKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim_matches('"').to_lowercase().as_str() {
            "cartesian" => Ok(Self::Cartesian),
            "exact" => Ok(Self::Exact),
            _ => Err(Error::Config(format!("Invalid engine kind: {}", s))),
        }
    }
}

impl Default for EngineKind {
    fn default() -> Self {
        Self::Cartesian
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub kind: EngineKind,
    pub max_distance: f64,
    pub bin_factor: f64,
    // Columns forming the match tuple; empty means the first column(s)
    pub columns: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::Cartesian,
            max_distance: 1.0,
            bin_factor: 1.0,
            columns: Vec::new(),
        }
    }
}

fn parse_positive(key: &str, value: &str) -> Result<f64> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
        _ => Err(Error::Config(format!("Invalid {} (must be > 0): {}", key, value))),
    }
}

impl FromIni for EngineConfig {
    fn from_ini_section(&mut self, section_name: &str, key: &str, value: &str) -> Option<Result<()>> {
        if section_name != "engine" {
            return None;
        }

        match key {
            "kind" => Some(value.parse().map(|kind| self.kind = kind)),
            "max_distance" => Some(parse_positive(key, value).map(|v| self.max_distance = v)),
            "bin_factor" => Some(parse_positive(key, value).map(|v| self.bin_factor = v)),
            "columns" => {
                self.columns = value.trim_matches('"')
                    .split(',')
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect();
                Some(Ok(()))
            },
            _ => None,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.max_distance.is_finite() && self.max_distance > 0.0) {
            return Err(Error::Config(format!("Invalid max_distance: {}", self.max_distance)));
        }
        if !(self.bin_factor.is_finite() && self.bin_factor > 0.0) {
            return Err(Error::Config(format!("Invalid bin_factor: {}", self.bin_factor)));
        }
        Ok(())
    }
}
