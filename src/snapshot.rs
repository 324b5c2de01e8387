// Ratemeter - Live metrics aggregation
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Snapshots and structural descriptions of metric sets.
//!
//! A [`Layout`] describes a metric set's columns once; every [`Snapshot`]
//! taken from the same metric set lists its values in the same order, so a
//! renderer can zip the two by position.

use crate::report::NumberFormat;
use serde::{Deserialize, Serialize};

/// Structural description of a metric set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub metrics: Vec<MetricLayout>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricLayout {
    pub name: String,
    pub reports: Vec<ReportLayout>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportLayout {
    pub name: String,
    pub format: NumberFormat,
}

impl Layout {
    /// `(metric, report)` name pairs in column order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &str)> {
        self.metrics.iter().flat_map(|metric| {
            metric
                .reports
                .iter()
                .map(move |report| (metric.name.as_str(), report.name.as_str()))
        })
    }

    pub fn column_count(&self) -> usize {
        self.metrics.iter().map(|m| m.reports.len()).sum()
    }
}

/// Point-in-time values of a metric set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub metrics: Vec<MetricValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    pub name: String,
    pub reports: Vec<ReportValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportValue {
    pub name: String,
    pub value: f64,
}

impl Snapshot {
    /// Value of one report, looked up by name.
    pub fn get(&self, metric: &str, report: &str) -> Option<f64> {
        self.metrics
            .iter()
            .find(|m| m.name == metric)?
            .reports
            .iter()
            .find(|r| r.name == report)
            .map(|r| r.value)
    }

    /// Values in column order.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.metrics
            .iter()
            .flat_map(|m| m.reports.iter().map(|r| r.value))
    }

    /// Whether this snapshot lines up with `layout` column for column.
    pub fn matches(&self, layout: &Layout) -> bool {
        self.metrics.len() == layout.metrics.len()
            && self
                .metrics
                .iter()
                .zip(&layout.metrics)
                .all(|(value, shape)| {
                    value.name == shape.name
                        && value.reports.len() == shape.reports.len()
                        && value
                            .reports
                            .iter()
                            .zip(&shape.reports)
                            .all(|(v, s)| v.name == s.name)
                })
    }

    /// Serialize to compact JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
