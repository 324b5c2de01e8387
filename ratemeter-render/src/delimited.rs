// Ratemeter Render - Column and CSV renderers
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Comma-separated output, one row per period.
//!
//! ```text
//! time,"A iter","A total","B ewma1","B cum","B total"
//! "2025-04-12 00:41:06.921153316 -0400",1.999723,2.000000,0.000000,1.999723,2.000000
//! ```

use csv::{QuoteStyle, WriterBuilder};
use ratemeter::{HeaderPolicy, Layout, RenderContext, Renderer, Snapshot};
use std::io::{self, Write};
use std::time::Duration;

/// Timestamp written in the first column of every row.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.9f %z";

/// CSV renderer backed by the `csv` crate.
pub struct CsvRenderer<W: Write> {
    writer: csv::Writer<W>,
    period: Duration,
    header: bool,
}

impl<W: Write> std::fmt::Debug for CsvRenderer<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvRenderer")
            .field("period", &self.period)
            .field("header", &self.header)
            .finish()
    }
}

impl<W: Write> CsvRenderer<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: WriterBuilder::new()
                .quote_style(QuoteStyle::NonNumeric)
                .from_writer(writer),
            period: Duration::from_secs(1),
            header: true,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Skip the header row, e.g. when appending to an existing file.
    pub fn without_header(mut self) -> Self {
        self.header = false;
        self
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|err| err.into_error())
    }
}

impl<W: Write + Send + 'static> Renderer for CsvRenderer<W> {
    fn period(&self) -> Duration {
        self.period
    }

    fn header_policy(&self) -> HeaderPolicy {
        if self.header {
            HeaderPolicy::Once
        } else {
            HeaderPolicy::Never
        }
    }

    fn render_header(&mut self, layout: &Layout) -> io::Result<()> {
        // `time` stays bare; the column names are always quoted.
        let mut line = String::from("time");
        for (metric, report) in layout.columns() {
            let name = format!("{} {}", metric, report).replace('"', "\"\"");
            line.push_str(&format!(",\"{}\"", name));
        }
        line.push('\n');

        self.writer.flush()?;
        let out = self.writer.get_mut();
        out.write_all(line.as_bytes())?;
        out.flush()
    }

    fn render_values(
        &mut self,
        _layout: &Layout,
        snapshot: &Snapshot,
        context: &RenderContext,
    ) -> io::Result<()> {
        let row = std::iter::once(context.at.format(TIMESTAMP_FORMAT).to_string())
            .chain(snapshot.values().map(|value| format!("{:.6}", value)));
        self.writer.write_record(row)?;
        self.writer.flush()
    }
}
