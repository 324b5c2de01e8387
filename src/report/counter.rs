// Ratemeter - Live metrics aggregation
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Counter reports.

use super::{NumberFormat, Report};
use crate::ewma::{DecayState, DecayTicker};
use crate::lock;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;

/// Rate since the previous read.
#[derive(Debug, Default)]
pub struct Rate {
    sum: f64,
    last_read_sum: f64,
}

impl Rate {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Report for Rate {
    fn name(&self) -> &str {
        "iter"
    }

    fn add(&mut self, value: f64) {
        self.sum += value;
    }

    fn get_and_advance(&mut self, iter_elapsed: Duration, _cumulative_elapsed: Duration) -> f64 {
        let rate = (self.sum - self.last_read_sum) / iter_elapsed.as_secs_f64();
        self.last_read_sum = self.sum;
        rate
    }
}

/// Average rate since the metric set started.
#[derive(Debug, Default)]
pub struct CumulativeAverage {
    sum: f64,
}

impl CumulativeAverage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Report for CumulativeAverage {
    fn name(&self) -> &str {
        "cum"
    }

    fn add(&mut self, value: f64) {
        self.sum += value;
    }

    fn get_and_advance(&mut self, _iter_elapsed: Duration, cumulative_elapsed: Duration) -> f64 {
        self.sum / cumulative_elapsed.as_secs_f64()
    }
}

/// Running total.
#[derive(Debug, Default)]
pub struct Total {
    sum: f64,
}

impl Total {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Report for Total {
    fn name(&self) -> &str {
        "total"
    }

    fn add(&mut self, value: f64) {
        self.sum += value;
    }

    fn get_and_advance(&mut self, _iter_elapsed: Duration, _cumulative_elapsed: Duration) -> f64 {
        self.sum
    }

    fn format(&self) -> NumberFormat {
        NumberFormat::Integer
    }
}

/// Exponentially weighted rate, advanced by its own ticker.
///
/// Reads never mutate the average; only the ticker does, once per tick.
#[derive(Debug)]
pub struct DecayingAverage {
    name: String,
    state: Arc<Mutex<DecayState>>,
    ticker: DecayTicker,
}

impl DecayingAverage {
    /// Spawn a decaying average whose weights decay over `age` ticks.
    pub fn spawn(name: impl Into<String>, age: u32, tick: Duration, runtime: &Handle) -> Self {
        let state = Arc::new(Mutex::new(DecayState::new(age as f64)));
        let ticker = DecayTicker::spawn(runtime, Arc::clone(&state), tick);
        Self {
            name: name.into(),
            state,
            ticker,
        }
    }
}

impl Report for DecayingAverage {
    fn name(&self) -> &str {
        &self.name
    }

    fn add(&mut self, value: f64) {
        lock(&self.state).sum += value;
    }

    fn get_and_advance(&mut self, _iter_elapsed: Duration, _cumulative_elapsed: Duration) -> f64 {
        lock(&self.state).average.value()
    }

    fn close(&mut self) {
        self.ticker.close();
    }

    fn is_live(&self) -> bool {
        self.ticker.is_live()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn test_rate_reports_growth_since_last_read() {
        let mut rate = Rate::new();
        for _ in 0..5 {
            rate.add(5.0);
        }
        assert_relative_eq!(rate.get_and_advance(MS, MS), 25_000.0);

        rate.add(1.0);
        assert_relative_eq!(rate.get_and_advance(Duration::from_secs(2), MS), 0.5);
        assert_eq!(rate.get_and_advance(Duration::from_secs(1), MS), 0.0);
    }

    #[test]
    fn test_cumulative_average_ignores_read_frequency() {
        let mut once = CumulativeAverage::new();
        let mut often = CumulativeAverage::new();
        for i in 0..100 {
            once.add(i as f64);
            often.add(i as f64);
            often.get_and_advance(MS, Duration::from_millis(i + 1));
        }
        let elapsed = Duration::from_secs(4);
        assert_relative_eq!(
            once.get_and_advance(MS, elapsed),
            often.get_and_advance(MS, elapsed)
        );
        assert_relative_eq!(once.get_and_advance(MS, elapsed), 4950.0 / 4.0);
    }

    #[test]
    fn test_total_is_running_sum() {
        let mut total = Total::new();
        for _ in 0..7 {
            total.add(3.0);
        }
        assert_eq!(total.get_and_advance(MS, MS), 21.0);
        assert_eq!(total.get_and_advance(MS, MS), 21.0);
        assert_eq!(total.format(), NumberFormat::Integer);
    }

    #[tokio::test(start_paused = true)]
    async fn test_decaying_average_closes_ticker() {
        let mut ewma =
            DecayingAverage::spawn("ewma1", 60, Duration::from_secs(1), &Handle::current());
        assert_eq!(ewma.name(), "ewma1");
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(ewma.is_live());

        ewma.add(10.0);
        assert_eq!(ewma.get_and_advance(MS, MS), 0.0);

        ewma.close();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(!ewma.is_live());
    }
}
