// Ratemeter - Live metrics aggregation
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Exponentially weighted moving averages and their background ticker.
//!
//! A [`DecayTicker`] owns one spawned task. Once per tick it converts the
//! growth of a running sum into a rate and folds that rate into a
//! [`MovingAverage`]. The task stops when the ticker is closed or dropped.

use crate::lock;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Samples averaged arithmetically before decay starts.
pub const WARMUP_SAMPLES: u32 = 10;

/// Moving average with a decay derived from its age in samples.
///
/// Reads 0.0 until more than [`WARMUP_SAMPLES`] samples have been added.
/// The first [`WARMUP_SAMPLES`] samples seed the average with their mean.
#[derive(Debug, Clone, PartialEq)]
pub struct MovingAverage {
    decay: f64,
    value: f64,
    count: u32,
}

impl MovingAverage {
    /// `age` is the number of samples over which an observation's weight
    /// decays; decay factor is `2 / (age + 1)`.
    pub fn new(age: f64) -> Self {
        Self {
            decay: 2.0 / (age + 1.0),
            value: 0.0,
            count: 0,
        }
    }

    pub fn add(&mut self, sample: f64) {
        if self.count < WARMUP_SAMPLES {
            self.count += 1;
            self.value += sample;
            return;
        }
        if self.count == WARMUP_SAMPLES {
            self.count += 1;
            self.value /= WARMUP_SAMPLES as f64;
        }
        self.value = sample * self.decay + self.value * (1.0 - self.decay);
    }

    pub fn value(&self) -> f64 {
        if self.count <= WARMUP_SAMPLES {
            0.0
        } else {
            self.value
        }
    }

    pub fn decay(&self) -> f64 {
        self.decay
    }
}

/// State shared between a decaying average report and its ticker.
#[derive(Debug, Clone)]
pub struct DecayState {
    /// Running sum of every observed value.
    pub sum: f64,
    /// Rate filter, advanced only by the ticker.
    pub average: MovingAverage,
}

impl DecayState {
    pub fn new(age: f64) -> Self {
        Self {
            sum: 0.0,
            average: MovingAverage::new(age),
        }
    }
}

/// Owned background task folding rates into a [`DecayState`].
#[derive(Debug)]
pub struct DecayTicker {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl DecayTicker {
    /// Spawn the ticker on `runtime`. The first fold happens one `tick` after spawning.
    pub fn spawn(runtime: &Handle, state: Arc<Mutex<DecayState>>, tick: Duration) -> Self {
        let cancel = CancellationToken::new();
        let task = runtime.spawn(run_ticker(state, tick, cancel.clone()));
        Self {
            cancel,
            task: Some(task),
        }
    }

    /// Signal the task to stop. Idempotent.
    pub fn close(&mut self) {
        self.cancel.cancel();
    }

    /// Whether the task is still scheduled.
    pub fn is_live(&self) -> bool {
        self.task.as_ref().map_or(false, |task| !task.is_finished())
    }

    /// Stop the task and wait for it to exit.
    pub async fn join(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for DecayTicker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_ticker(state: Arc<Mutex<DecayState>>, tick: Duration, cancel: CancellationToken) {
    let mut last_tick = Instant::now();
    let mut interval = time::interval_at(last_tick + tick, tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_sum = lock(&state).sum;
    debug!(tick_ms = tick.as_millis() as u64, "decay ticker started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let now = Instant::now();
                let elapsed = now.duration_since(last_tick).as_secs_f64();
                if elapsed <= 0.0 {
                    continue;
                }
                let mut guard = lock(&state);
                let rate = (guard.sum - last_sum) / elapsed;
                guard.average.add(rate);
                last_sum = guard.sum;
                last_tick = now;
            }
        }
    }

    debug!("decay ticker stopped");
}
