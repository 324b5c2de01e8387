// Ratemeter Render - Column and CSV renderers
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! dstat-style fixed-width columns.
//!
//! ```text
//! ----------- a ------------ ------------------ b ------------------
//!         iter        total |        ewma1          cum        total
//!         2.00            2 |         0.00         2.00            2
//! ```

use chrono::{DateTime, Local};
use ratemeter::{HeaderPolicy, Layout, RenderContext, Renderer, Snapshot};
use std::io::{self, Write};
use std::time::Duration;

/// Width of one report column.
pub const COLUMN_WIDTH: usize = 12;

/// Timestamp printed before each line when timestamps are enabled.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Signed "lines between headers" count used by [`ColumnRenderer::new`].
pub const DEFAULT_LINES_BETWEEN_HEADERS: i64 = 24;

/// Fixed-width column renderer.
#[derive(Debug)]
pub struct ColumnRenderer<W> {
    writer: W,
    period: Duration,
    header_policy: HeaderPolicy,
    prefix: String,
    timestamps: bool,
}

impl ColumnRenderer<io::Stdout> {
    /// Once per second to stdout, timestamped, header every 25 lines.
    pub fn stdout() -> Self {
        Self::new(io::stdout()).with_timestamps(true)
    }
}

impl<W: Write> ColumnRenderer<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            period: Duration::from_secs(1),
            header_policy: HeaderPolicy::from_lines_between(DEFAULT_LINES_BETWEEN_HEADERS),
            prefix: String::new(),
            timestamps: false,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn with_header_policy(mut self, policy: HeaderPolicy) -> Self {
        self.header_policy = policy;
        self
    }

    /// Text written at the start of every line.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_timestamps(mut self, timestamps: bool) -> Self {
        self.timestamps = timestamps;
        self
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, at: DateTime<Local>, body: &str) -> io::Result<()> {
        self.writer.write_all(self.prefix.as_bytes())?;
        if self.timestamps {
            write!(self.writer, "{} ", at.format(TIMESTAMP_FORMAT))?;
        }
        writeln!(self.writer, "{}", body)?;
        self.writer.flush()
    }
}

impl<W: Write + Send + 'static> Renderer for ColumnRenderer<W> {
    fn period(&self) -> Duration {
        self.period
    }

    fn header_policy(&self) -> HeaderPolicy {
        self.header_policy
    }

    fn render_header(&mut self, layout: &Layout) -> io::Result<()> {
        let now = Local::now();
        self.write_line(now, &title_line(layout))?;
        self.write_line(now, &names_line(layout))
    }

    fn render_values(
        &mut self,
        layout: &Layout,
        snapshot: &Snapshot,
        context: &RenderContext,
    ) -> io::Result<()> {
        self.write_line(context.at, &values_line(layout, snapshot))
    }
}

/// Metric names centred in dashes over their columns.
pub fn title_line(layout: &Layout) -> String {
    let mut line = String::new();
    for (i, metric) in layout.metrics.iter().enumerate() {
        if i > 0 {
            line.push_str("- -");
        }
        let reports = metric.reports.len();
        let width = COLUMN_WIDTH * reports + reports.saturating_sub(1);
        let padding = width.saturating_sub(metric.name.chars().count() + 2);
        let left = padding / 2;

        line.push_str(&"-".repeat(left));
        line.push(' ');
        line.push_str(&metric.name.to_lowercase());
        line.push(' ');
        line.push_str(&"-".repeat(padding - left));
    }
    line
}

/// Report names, right-aligned in their columns.
pub fn names_line(layout: &Layout) -> String {
    join_metrics(layout.metrics.iter().map(|metric| {
        metric
            .reports
            .iter()
            .map(|report| format!("{:>width$}", report.name, width = COLUMN_WIDTH))
            .collect::<Vec<_>>()
    }))
}

/// Formatted values, right-aligned under [`names_line`].
pub fn values_line(layout: &Layout, snapshot: &Snapshot) -> String {
    join_metrics(
        layout
            .metrics
            .iter()
            .zip(&snapshot.metrics)
            .map(|(shape, metric)| {
                shape
                    .reports
                    .iter()
                    .zip(&metric.reports)
                    .map(|(report, value)| {
                        format!(
                            "{:>width$}",
                            report.format.render(value.value),
                            width = COLUMN_WIDTH
                        )
                    })
                    .collect::<Vec<_>>()
            }),
    )
}

fn join_metrics(metrics: impl Iterator<Item = Vec<String>>) -> String {
    metrics
        .map(|columns| columns.join(" "))
        .collect::<Vec<_>>()
        .join(" | ")
}
