// Ratemeter - Live metrics aggregation
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Configuration types for Ratemeter

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reporter-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    /// Capacity of the observation queue created by [`crate::Reporter::channel`]
    pub queue_capacity: usize,

    /// Interval at which decaying averages fold in the observed rate
    pub decay_tick: Duration,

    /// Quantile sketch settings
    pub sketch: SketchConfig,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 100,
            decay_tick: Duration::from_secs(1),
            sketch: SketchConfig::default(),
        }
    }
}

impl ReporterConfig {
    /// Create a configuration with a custom queue capacity
    pub fn with_queue_capacity(queue_capacity: usize) -> Self {
        Self {
            queue_capacity,
            ..Default::default()
        }
    }

    /// Create a configuration with a custom decay tick
    pub fn with_decay_tick(decay_tick: Duration) -> Self {
        Self {
            decay_tick,
            ..Default::default()
        }
    }

    /// Parse from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Quantile sketch configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SketchConfig {
    /// Rank error bound, as a fraction of the observation count
    pub error: f64,
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self { error: 0.001 }
    }
}
