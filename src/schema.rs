// Ratemeter - Live metrics aggregation
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Declarative field schemas.
//!
//! A [`Schema`] is an ordered list of fields, each naming a measurement kind
//! and the reports to derive from it. Field order is the column order of
//! every header and snapshot produced from the schema.
//!
//! Example JSON:
//! ```json
//! [
//!   {"name": "Transactions", "kind": "counter", "reports": "iter,cum"},
//!   {"name": "Latency", "kind": "latency", "reports": "w50,w99,c99.9"}
//! ]
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a field measures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MeasurementKind {
    /// Additive quantity: rates, averages, totals, decaying averages.
    Counter,
    /// Per-event duration: windowed and cumulative percentiles.
    Latency,
    /// Anything else. Compiling it fails.
    Other(String),
}

impl MeasurementKind {
    pub fn as_str(&self) -> &str {
        match self {
            MeasurementKind::Counter => "counter",
            MeasurementKind::Latency => "latency",
            MeasurementKind::Other(kind) => kind,
        }
    }
}

impl From<String> for MeasurementKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "counter" => MeasurementKind::Counter,
            "latency" => MeasurementKind::Latency,
            _ => MeasurementKind::Other(kind),
        }
    }
}

impl From<&str> for MeasurementKind {
    fn from(kind: &str) -> Self {
        MeasurementKind::from(kind.to_string())
    }
}

impl From<MeasurementKind> for String {
    fn from(kind: MeasurementKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Field name, used as the metric name in headers and snapshots.
    pub name: String,
    /// Measurement kind.
    pub kind: MeasurementKind,
    /// Comma-separated report tokens, e.g. `"iter,total"` or `"w50,c99.9"`.
    pub reports: String,
}

impl FieldSchema {
    pub fn new(
        name: impl Into<String>,
        kind: impl Into<MeasurementKind>,
        reports: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            reports: reports.into(),
        }
    }

    /// Counter field.
    pub fn counter(name: impl Into<String>, reports: impl Into<String>) -> Self {
        Self::new(name, MeasurementKind::Counter, reports)
    }

    /// Latency field.
    pub fn latency(name: impl Into<String>, reports: impl Into<String>) -> Self {
        Self::new(name, MeasurementKind::Latency, reports)
    }

    /// Report tokens in declaration order, trimmed, empty tokens kept.
    pub fn report_tokens(&self) -> Vec<&str> {
        if self.reports.trim().is_empty() {
            return Vec::new();
        }
        self.reports.split(',').map(str::trim).collect()
    }
}

/// Ordered collection of fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    fields: Vec<FieldSchema>,
}

impl Schema {
    pub fn new(fields: Vec<FieldSchema>) -> Self {
        Self { fields }
    }

    /// Start building a schema field by field.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Parse from a JSON array of fields.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to a JSON array of fields.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<FieldSchema> for Schema {
    fn from_iter<I: IntoIterator<Item = FieldSchema>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Builder for [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldSchema>,
}

impl SchemaBuilder {
    /// Builder: add a counter field.
    pub fn counter(mut self, name: impl Into<String>, reports: impl Into<String>) -> Self {
        self.fields.push(FieldSchema::counter(name, reports));
        self
    }

    /// Builder: add a latency field.
    pub fn latency(mut self, name: impl Into<String>, reports: impl Into<String>) -> Self {
        self.fields.push(FieldSchema::latency(name, reports));
        self
    }

    /// Builder: add an arbitrary field.
    pub fn field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    pub fn build(self) -> Schema {
        Schema::new(self.fields)
    }
}
