// Ratemeter - Live metrics aggregation
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Error types for Ratemeter
//!
//! Schema problems surface synchronously when a consumer is started.
//! Ingest problems are per-record and never stop the dispatch loop.

use thiserror::Error;

/// Result type alias for Ratemeter operations
pub type Result<T> = std::result::Result<T, RatemeterError>;

/// Main error type for Ratemeter operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RatemeterError {
    /// A schema could not be compiled into a metric set
    #[error("Schema compilation error: {0}")]
    SchemaCompilation(#[from] SchemaError),

    /// A record could not be ingested
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// A snapshot was requested with an invalid interval
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// The reporter has been closed
    #[error("Reporter is closed")]
    Closed,

    /// A schema document could not be parsed
    #[error("Invalid schema document: {0}")]
    Json(String),
}

impl From<serde_json::Error> for RatemeterError {
    fn from(err: serde_json::Error) -> Self {
        RatemeterError::Json(err.to_string())
    }
}

/// Errors raised while compiling a field schema
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// Report token is not known for the field's measurement kind
    #[error("Unknown report kind '{token}' for field {field}")]
    UnknownReportKind { field: String, token: String },

    /// Latency token whose percentile part is not a number in (0, 100]
    #[error("Invalid percentile '{token}' for field {field}")]
    InvalidPercentile { field: String, token: String },

    /// Field declares no reports
    #[error("Field {field} must define at least one report")]
    EmptyReportSpec { field: String },

    /// Field kind is neither counter nor latency
    #[error("Field {field} has unsupported measurement kind '{kind}'")]
    UnsupportedMeasurementKind { field: String, kind: String },

    /// A decaying average needs a running async runtime for its ticker
    #[error("Field {field} requests a decaying average outside of an async runtime")]
    RuntimeUnavailable { field: String },
}

/// Errors raised while ingesting one record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IngestError {
    /// Field value cannot be widened to a float
    #[error("Type mismatch for field {field}: {found} is not numeric")]
    TypeMismatch { field: String, found: &'static str },

    /// Record does not line up with the schema
    #[error("Record has {actual} fields, schema expects {expected}")]
    FieldCountMismatch { expected: usize, actual: usize },
}

/// Errors raised while taking a snapshot
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapshotError {
    /// Iteration or cumulative elapsed time was zero
    #[error("Snapshot intervals must be strictly positive")]
    NonPositiveInterval,
}
