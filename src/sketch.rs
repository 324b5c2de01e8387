// Ratemeter - Live metrics aggregation
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Streaming rank estimation for percentile reports.
//!
//! Wraps a CKMS summary: bounded memory, `O(log n)` amortized insertion,
//! answers are within `error * n` ranks of the true quantile.

use crate::config::SketchConfig;
use quantiles::ckms::CKMS;

/// Bounded-error quantile sketch targeting one quantile.
#[derive(Debug, Clone)]
pub struct QuantileSketch {
    summary: CKMS<f64>,
    quantile: f64,
    error: f64,
}

impl QuantileSketch {
    /// `quantile` is a fraction in (0, 1].
    pub fn new(quantile: f64, config: &SketchConfig) -> Self {
        Self {
            summary: CKMS::new(config.error),
            quantile,
            error: config.error,
        }
    }

    pub fn insert(&mut self, value: f64) {
        self.summary.insert(value);
    }

    /// Estimate of the target quantile, 0.0 when nothing has been observed.
    pub fn query(&self) -> f64 {
        self.summary
            .query(self.quantile)
            .map(|(_, value)| value)
            .unwrap_or(0.0)
    }

    /// Drop every observation.
    pub fn reset(&mut self) {
        self.summary = CKMS::new(self.error);
    }

    pub fn count(&self) -> usize {
        self.summary.count()
    }

    pub fn quantile(&self) -> f64 {
        self.quantile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sketch(q: f64) -> QuantileSketch {
        QuantileSketch::new(q, &SketchConfig::default())
    }

    #[test]
    fn test_empty_sketch_reads_zero() {
        assert_eq!(sketch(0.5).query(), 0.0);
    }

    #[test]
    fn test_single_point_is_exact() {
        let mut s = sketch(0.99);
        s.insert(42.5);
        assert_eq!(s.query(), 42.5);
    }

    #[test]
    fn test_median_of_uniform_stream() {
        let mut s = sketch(0.5);
        for i in 1..=1000 {
            s.insert(i as f64);
        }
        let median = s.query();
        assert!((median - 500.0).abs() <= 5.0, "median was {}", median);
    }

    #[test]
    fn test_reset_clears_observations() {
        let mut s = sketch(0.9);
        for i in 0..100 {
            s.insert(i as f64);
        }
        s.reset();
        assert_eq!(s.count(), 0);
        assert_eq!(s.query(), 0.0);
        s.insert(7.0);
        assert_eq!(s.query(), 7.0);
    }
}
