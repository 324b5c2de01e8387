// Ratemeter - Live metrics aggregation
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Output collaborator interface.
//!
//! A consumer started on a [`Reporter`](crate::Reporter) reads its metric
//! set through two operations only: the [`Layout`] once, for headers, and a
//! [`Snapshot`] per period. Formatting belongs to the [`Renderer`].

use crate::snapshot::{Layout, Snapshot};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::io;
use std::time::Duration;

/// When a renderer's header is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderPolicy {
    /// No header at all.
    Never,
    /// One header when the consumer starts.
    #[default]
    Once,
    /// A header at start, then again after every `n` value lines.
    Every(usize),
}

impl HeaderPolicy {
    /// Map a signed "lines between headers" count: negative means never,
    /// zero means once. A positive `n` repeats the header once more than
    /// `n` value lines have been written since the last one, so it lands
    /// every `n + 1` lines.
    pub fn from_lines_between(lines: i64) -> Self {
        match lines {
            n if n < 0 => HeaderPolicy::Never,
            0 => HeaderPolicy::Once,
            n => HeaderPolicy::Every(n as usize + 1),
        }
    }
}

/// Timing of one rendered line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderContext {
    /// Wall-clock time of the tick.
    pub at: DateTime<Local>,
    /// Time since the previous tick.
    pub iter_elapsed: Duration,
    /// Time since the consumer started.
    pub cumulative_elapsed: Duration,
}

/// Turns layouts and snapshots into output.
pub trait Renderer: Send + 'static {
    /// Snapshot cadence.
    fn period(&self) -> Duration {
        Duration::from_secs(1)
    }

    fn header_policy(&self) -> HeaderPolicy {
        HeaderPolicy::Once
    }

    fn render_header(&mut self, layout: &Layout) -> io::Result<()>;

    /// `snapshot` lines up with `layout` column for column.
    fn render_values(
        &mut self,
        layout: &Layout,
        snapshot: &Snapshot,
        context: &RenderContext,
    ) -> io::Result<()>;
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn period(&self) -> Duration {
        (**self).period()
    }

    fn header_policy(&self) -> HeaderPolicy {
        (**self).header_policy()
    }

    fn render_header(&mut self, layout: &Layout) -> io::Result<()> {
        (**self).render_header(layout)
    }

    fn render_values(
        &mut self,
        layout: &Layout,
        snapshot: &Snapshot,
        context: &RenderContext,
    ) -> io::Result<()> {
        (**self).render_values(layout, snapshot, context)
    }
}

/// Tracks when the next header is due.
#[derive(Debug, Clone)]
pub(crate) struct HeaderCadence {
    policy: HeaderPolicy,
    lines_since_header: usize,
}

impl HeaderCadence {
    pub(crate) fn new(policy: HeaderPolicy) -> Self {
        Self {
            policy,
            lines_since_header: 0,
        }
    }

    /// Whether a header is written when the consumer starts.
    pub(crate) fn at_start(&self) -> bool {
        self.policy != HeaderPolicy::Never
    }

    /// Called before each value line; true if a header goes first.
    pub(crate) fn before_line(&mut self) -> bool {
        match self.policy {
            HeaderPolicy::Every(n) if n > 0 && self.lines_since_header >= n => {
                self.lines_since_header = 0;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn after_line(&mut self) {
        self.lines_since_header += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(policy: HeaderPolicy, lines: usize) -> Vec<usize> {
        let mut cadence = HeaderCadence::new(policy);
        let mut at = Vec::new();
        if cadence.at_start() {
            at.push(0);
        }
        for line in 1..=lines {
            if cadence.before_line() {
                at.push(line);
            }
            cadence.after_line();
        }
        at
    }

    #[test]
    fn test_header_policies() {
        assert_eq!(headers(HeaderPolicy::Never, 10), Vec::<usize>::new());
        assert_eq!(headers(HeaderPolicy::Once, 10), vec![0]);
        assert_eq!(headers(HeaderPolicy::Every(3), 10), vec![0, 4, 7, 10]);
    }

    #[test]
    fn test_from_lines_between() {
        assert_eq!(HeaderPolicy::from_lines_between(-1), HeaderPolicy::Never);
        assert_eq!(HeaderPolicy::from_lines_between(0), HeaderPolicy::Once);
        assert_eq!(HeaderPolicy::from_lines_between(24), HeaderPolicy::Every(25));
    }

    #[test]
    fn test_lines_between_headers() {
        // A header follows once more than two value lines have been written.
        let policy = HeaderPolicy::from_lines_between(2);
        assert_eq!(headers(policy, 8), vec![0, 4, 7]);
    }

    #[test]
    fn test_policy_json() {
        let policy: HeaderPolicy = serde_json::from_str(r#"{"every":24}"#).unwrap();
        assert_eq!(policy, HeaderPolicy::Every(24));
        assert_eq!(serde_json::to_string(&HeaderPolicy::Never).unwrap(), r#""never""#);
    }
}
