// Ratemeter - Live metrics aggregation
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Report kinds: the derived statistics computed for a field.
//!
//! | Token | Variant | Value on read | Read resets? |
//! |-------|---------|---------------|--------------|
//! | `iter` | [`Rate`] | growth since last read / iteration seconds | baseline advances |
//! | `cum` | [`CumulativeAverage`] | sum / seconds since start | no |
//! | `total` | [`Total`] | sum | no |
//! | `ewma1` ... `ewma60` | [`DecayingAverage`] | decayed per-tick rate | no |
//! | `w<p>` | [`WindowedPercentile`] | p-th percentile since last read | sketch resets |
//! | `c<p>` | [`CumulativePercentile`] | p-th percentile since start | no |
//!
//! Report instances are not internally synchronized: a metric set owns
//! them and callers serialize access through it. The decaying average is
//! the exception, its state is shared with its ticker task.

mod counter;
mod latency;

pub use counter::{CumulativeAverage, DecayingAverage, Rate, Total};
pub use latency::{CumulativePercentile, WindowedPercentile};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How a report's value is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberFormat {
    /// Truncated toward zero, no decimals.
    Integer,
    /// Two decimals.
    Decimal,
}

impl NumberFormat {
    pub fn render(&self, value: f64) -> String {
        match self {
            NumberFormat::Integer => format!("{}", value.trunc() as i64),
            NumberFormat::Decimal => format!("{:.2}", value),
        }
    }
}

/// A derived statistic over one field's observations.
pub trait Report: Send + fmt::Debug {
    /// Column name, e.g. `iter` or `w99.9`.
    fn name(&self) -> &str;

    /// Ingest one observation.
    fn add(&mut self, value: f64);

    /// Current value. Both intervals must be strictly positive.
    ///
    /// Read-destructive for [`Rate`] and [`WindowedPercentile`].
    fn get_and_advance(&mut self, iter_elapsed: Duration, cumulative_elapsed: Duration) -> f64;

    fn format(&self) -> NumberFormat {
        NumberFormat::Decimal
    }

    /// Release background resources. Safe to call more than once.
    fn close(&mut self) {}

    /// Whether the report still runs background work.
    fn is_live(&self) -> bool {
        false
    }
}
