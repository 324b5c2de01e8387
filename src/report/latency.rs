// Ratemeter - Live metrics aggregation
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Latency reports: percentiles over a window or since start.

use super::Report;
use crate::config::SketchConfig;
use crate::sketch::QuantileSketch;
use std::time::Duration;

/// Percentile of the observations since the previous read.
#[derive(Debug)]
pub struct WindowedPercentile {
    name: String,
    sketch: QuantileSketch,
}

impl WindowedPercentile {
    /// `quantile` is a fraction in (0, 1].
    pub fn new(name: impl Into<String>, quantile: f64, config: &SketchConfig) -> Self {
        Self {
            name: name.into(),
            sketch: QuantileSketch::new(quantile, config),
        }
    }

    pub fn quantile(&self) -> f64 {
        self.sketch.quantile()
    }
}

impl Report for WindowedPercentile {
    fn name(&self) -> &str {
        &self.name
    }

    fn add(&mut self, value: f64) {
        self.sketch.insert(value);
    }

    fn get_and_advance(&mut self, _iter_elapsed: Duration, _cumulative_elapsed: Duration) -> f64 {
        let value = self.sketch.query();
        self.sketch.reset();
        value
    }
}

/// Percentile of every observation since start.
#[derive(Debug)]
pub struct CumulativePercentile {
    name: String,
    sketch: QuantileSketch,
}

impl CumulativePercentile {
    /// `quantile` is a fraction in (0, 1].
    pub fn new(name: impl Into<String>, quantile: f64, config: &SketchConfig) -> Self {
        Self {
            name: name.into(),
            sketch: QuantileSketch::new(quantile, config),
        }
    }

    pub fn quantile(&self) -> f64 {
        self.sketch.quantile()
    }
}

impl Report for CumulativePercentile {
    fn name(&self) -> &str {
        &self.name
    }

    fn add(&mut self, value: f64) {
        self.sketch.insert(value);
    }

    fn get_and_advance(&mut self, _iter_elapsed: Duration, _cumulative_elapsed: Duration) -> f64 {
        self.sketch.query()
    }
}
