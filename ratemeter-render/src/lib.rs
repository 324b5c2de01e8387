// Ratemeter Render - Column and CSV renderers
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # Ratemeter Render
//!
//! Reference [`Renderer`](ratemeter::Renderer) implementations:
//!
//! - [`ColumnRenderer`]: dstat-style fixed-width columns with repeated headers
//! - [`CsvRenderer`]: one quoted CSV row per period with a timestamp column
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ratemeter::{Record, Reporter, Schema};
//! use ratemeter_render::ColumnRenderer;
//!
//! # async fn run() -> ratemeter::Result<()> {
//! let reporter = Reporter::default();
//! let (tx, rx) = reporter.channel::<Record>();
//! reporter.spawn_feed(rx);
//!
//! let schema = Schema::builder().counter("Ops", "iter,cum,total").build();
//! let consumer = reporter.start(&schema, ColumnRenderer::stdout()).await?;
//! tx.send(Record::new(vec![1u32.into()])).await.ok();
//! consumer.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod column;
pub mod delimited;

pub use column::ColumnRenderer;
pub use delimited::CsvRenderer;
