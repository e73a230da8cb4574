// src/engine/cartesian.rs
use crate::error::{Error, Result};
use crate::types::Score;
use super::{MatchEngine, MatchParameter};

// Keeps boundary points from falling out of a neighbour's cell through rounding.
const BOUNDARY_SLACK: f64 = 1e-9;
// A match box spans about 1 / bin_factor cells per axis.
const MAX_CELLS_PER_AXIS: f64 = 1024.0;
// Upper bound on keys for one row across all axes.
const MAX_KEYS_PER_ROW: usize = 1 << 20;

/// Matches points in an N-dimensional Cartesian space that lie within
/// `max_distance` of each other. The score is the Euclidean distance.
///
/// Space is divided into cubic cells of side `max_distance * bin_factor`.
/// A point is binned into every cell touched by the box of half-width
/// `max_distance / 2` around it, so two points within `max_distance` always
/// share a cell.
#[derive(Debug, Clone)]
pub struct CartesianEngine {
    dimensions: usize,
    max_distance: f64,
    bin_factor: f64,
    cell_size: f64,
}

impl CartesianEngine {
    pub fn new(dimensions: usize, max_distance: f64) -> Result<Self> {
        Self::with_bin_factor(dimensions, max_distance, 1.0)
    }

    pub fn with_bin_factor(dimensions: usize, max_distance: f64, bin_factor: f64) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::invalid_config("Cartesian engine needs at least one dimension"));
        }
        if !(max_distance.is_finite() && max_distance > 0.0) {
            return Err(Error::invalid_config(
                format!("Invalid max_distance (must be finite and > 0): {}", max_distance)
            ));
        }
        if !(bin_factor.is_finite() && bin_factor > 0.0) {
            return Err(Error::invalid_config(
                format!("Invalid bin_factor (must be finite and > 0): {}", bin_factor)
            ));
        }
        if 1.0 / bin_factor > MAX_CELLS_PER_AXIS {
            return Err(Error::invalid_config(
                format!("bin_factor {} gives more than {} cells per axis", bin_factor, MAX_CELLS_PER_AXIS)
            ));
        }
        Ok(Self {
            dimensions,
            max_distance,
            bin_factor,
            cell_size: max_distance * bin_factor,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    fn cell_range(&self, x: f64) -> std::result::Result<(i64, i64), String> {
        let half = self.max_distance * 0.5 * (1.0 + BOUNDARY_SLACK);
        let lo = ((x - half) / self.cell_size).floor();
        let hi = ((x + half) / self.cell_size).floor();
        // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive
        if !(lo >= i64::MIN as f64 && hi < i64::MAX as f64) {
            return Err(format!("coordinate {} is outside the binning grid", x));
        }
        Ok((lo as i64, hi as i64))
    }
}

impl MatchEngine for CartesianEngine {
    type Tuple = Vec<f64>;
    type Key = Vec<i64>;

    fn bin_keys(&self, tuple: &Vec<f64>) -> std::result::Result<Vec<Vec<i64>>, String> {
        if tuple.len() != self.dimensions {
            return Err(format!(
                "expected {} coordinates, found {}", self.dimensions, tuple.len()
            ));
        }
        if let Some(bad) = tuple.iter().find(|x| !x.is_finite()) {
            return Err(format!("non-finite coordinate {}", bad));
        }

        // Cartesian product of the per-dimension cell ranges.
        let mut ranges = Vec::with_capacity(self.dimensions);
        let mut key_count: usize = 1;
        for &x in tuple {
            let (lo, hi) = self.cell_range(x)?;
            let span = hi.checked_sub(lo)
                .and_then(|d| usize::try_from(d).ok())
                .and_then(|d| d.checked_add(1));
            key_count = match span.and_then(|n| key_count.checked_mul(n)) {
                Some(n) if n <= MAX_KEYS_PER_ROW => n,
                _ => return Err(format!("coordinate {} spans too many grid cells", x)),
            };
            ranges.push((lo, hi));
        }

        let mut keys: Vec<Vec<i64>> = vec![Vec::with_capacity(self.dimensions)];
        for (lo, hi) in ranges {
            let mut next = Vec::with_capacity(keys.len() * (hi - lo + 1) as usize);
            for prefix in &keys {
                for cell in lo..=hi {
                    let mut key = prefix.clone();
                    key.push(cell);
                    next.push(key);
                }
            }
            keys = next;
        }
        Ok(keys)
    }

    fn score(&self, a: &Vec<f64>, b: &Vec<f64>) -> Option<Score> {
        if a.len() != self.dimensions || b.len() != self.dimensions {
            return None;
        }
        let mut sum = 0.0;
        for (x, y) in a.iter().zip(b) {
            let d = x - y;
            // Early exit once any single axis is already out of range
            if d.abs() > self.max_distance {
                return None;
            }
            sum += d * d;
        }
        let distance = sum.sqrt();
        if distance <= self.max_distance {
            Some(distance)
        } else {
            None
        }
    }

    fn description(&self) -> String {
        format!("Cartesian {}-d, max distance {}", self.dimensions, self.max_distance)
    }

    fn match_parameters(&self) -> Vec<MatchParameter> {
        vec![
            MatchParameter::new("max_distance", self.max_distance, "Maximum Euclidean distance for a match"),
            MatchParameter::new("bin_factor", self.bin_factor, "Grid cell size as a multiple of max_distance"),
        ]
    }
}
