//! Allele ranges
//!
//! Per-allele ranges used to initialize integer and real chromosomes and,
//! when bounded operators are requested, to clamp them.

use serde::{Deserialize, Serialize};

/// Inclusive range for one allele
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Lower bound (inclusive)
    pub min: f64,
    /// Upper bound (inclusive)
    pub max: f64,
}

impl Bounds {
    /// Create new bounds; callers validate `min <= max` at setup
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Bounds from a center value and a relative half-width
    ///
    /// `percent` is a fraction, so `(10.0, 0.5)` spans `[5.0, 15.0]`.
    pub fn from_percent(center: f64, percent: f64) -> Self {
        let half = (center * percent).abs();
        Self::new(center - half, center + half)
    }

    /// Check the range is finite and ordered
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    /// Clamp a real allele
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Integer range covered by these bounds
    pub fn int_range(&self) -> (i64, i64) {
        (self.min.ceil() as i64, self.max.floor() as i64)
    }

    /// Clamp an integer allele
    pub fn clamp_int(&self, value: i64) -> i64 {
        let (lo, hi) = self.int_range();
        value.clamp(lo, hi.max(lo))
    }
}

impl From<(f64, f64)> for Bounds {
    fn from((min, max): (f64, f64)) -> Self {
        Self::new(min, max)
    }
}
