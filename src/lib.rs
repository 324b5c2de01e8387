//! # Ratemeter - Live metrics aggregation
//!
//! Declare which statistics you want for each field of an observation
//! stream, push observations down a queue, and read rates, totals, decaying
//! averages and percentiles once per period.
//!
//! ## Key Features
//!
//! - **Declarative schemas**: a field kind plus a comma-separated report list
//! - **Counter reports**: `iter`, `cum`, `total`, `ewma1`/`ewma5`/`ewma15`/`ewma60`
//! - **Latency reports**: windowed (`w99`) and cumulative (`c99.9`) percentiles
//! - **Independent consumers**: any number of renderers on one stream, each at its own cadence
//!
//! ## Quick Start
//!
//! ```rust
//! use ratemeter::{MetricSet, Record, ReporterConfig, Schema};
//! use std::time::Duration;
//!
//! // Declare the fields and the reports wanted for each
//! let schema = Schema::builder()
//!     .counter("Transactions", "iter,total")
//!     .latency("Latency", "c50")
//!     .build();
//! let mut set = MetricSet::compile(&schema, &ReporterConfig::default()).unwrap();
//!
//! // Ingest observations
//! for ms in [12.0, 12.0, 15.0] {
//!     set.ingest(&Record::new(vec![1u32.into(), ms.into()])).unwrap();
//! }
//!
//! // Read derived values
//! let second = Duration::from_secs(1);
//! let snapshot = set.snapshot(second, second).unwrap();
//! assert_eq!(snapshot.get("Transactions", "total"), Some(3.0));
//! assert_eq!(snapshot.get("Latency", "c50"), Some(12.0));
//! ```
//!
//! Running consumers on a live stream goes through a [`Reporter`]:
//!
//! ```rust,no_run
//! # use ratemeter::{Layout, RenderContext, Renderer, Record, Reporter, Schema, Snapshot};
//! # struct Stdout;
//! # impl Renderer for Stdout {
//! #     fn render_header(&mut self, _: &Layout) -> std::io::Result<()> { Ok(()) }
//! #     fn render_values(&mut self, _: &Layout, s: &Snapshot, _: &RenderContext) -> std::io::Result<()> {
//! #         println!("{:?}", s.values().collect::<Vec<_>>());
//! #         Ok(())
//! #     }
//! # }
//! # async fn run() -> ratemeter::Result<()> {
//! let reporter = Reporter::default();
//! let (tx, rx) = reporter.channel::<Record>();
//! reporter.spawn_feed(rx);
//!
//! let schema = Schema::builder().counter("Ops", "iter,ewma1").build();
//! let consumer = reporter.start(&schema, Stdout).await?;
//! tx.send(Record::new(vec![1u32.into()])).await.ok();
//! consumer.stop().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`schema`]: Field declarations and their JSON form
//! - [`record`]: Observation records
//! - [`report`]: Report kinds
//! - [`compiler`]: Report tokens to report instances
//! - [`metric_set`]: Ingest and snapshot of one compiled schema
//! - [`reporter`]: Registry, dispatch loop and consumers
//! - [`render`]: Renderer collaborator interface

// Modules
pub mod compiler;
pub mod config;
pub mod error;
pub mod ewma;
pub mod metric_set;
pub mod record;
pub mod render;
pub mod report;
pub mod reporter;
pub mod schema;
pub mod sketch;
pub mod snapshot;

// Re-exports for convenient access
pub use config::{ReporterConfig, SketchConfig};
pub use error::{IngestError, RatemeterError, Result, SchemaError, SnapshotError};
pub use metric_set::{Metric, MetricSet};
pub use record::{FieldValue, IntoRecord, Record};
pub use render::{HeaderPolicy, RenderContext, Renderer};
pub use report::{NumberFormat, Report};
pub use reporter::{ConsumerHandle, Reporter, ReporterStats};
pub use schema::{FieldSchema, MeasurementKind, Schema, SchemaBuilder};
pub use snapshot::{Layout, MetricLayout, MetricValue, ReportLayout, ReportValue, Snapshot};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Lock a mutex, recovering the guard if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
