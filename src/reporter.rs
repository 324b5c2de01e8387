// Ratemeter - Live metrics aggregation
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Registry, dispatch loop and output consumers.
//!
//! One [`Reporter`] fans a single inbound record stream out to any number
//! of metric sets. Each metric set belongs to exactly one consumer, started
//! with [`Reporter::start`], which snapshots it on its renderer's period
//! until its [`ConsumerHandle`] is stopped or dropped.
//!
//! ```text
//! producers --> mpsc queue --> feed() --read lock--> MetricSet #1 <-- consumer #1 --> Renderer
//!                                               \--> MetricSet #2 <-- consumer #2 --> Renderer
//! ```
//!
//! Registration and unregistration take the registry's write lock, which
//! waits for any in-flight dispatch to finish.

use crate::config::ReporterConfig;
use crate::error::{RatemeterError, Result, SnapshotError};
use crate::lock;
use crate::metric_set::MetricSet;
use crate::record::{IntoRecord, Record};
use crate::render::{HeaderCadence, RenderContext, Renderer};
use crate::schema::Schema;
use crate::snapshot::Layout;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Counters describing a reporter's activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReporterStats {
    /// Records taken off the queue by the dispatch loop.
    pub records_received: u64,
    /// Rejections, counted once per record and metric set.
    pub records_rejected: u64,
    /// Consumers currently running.
    pub active_consumers: usize,
}

struct Registration {
    id: u64,
    set: Arc<Mutex<MetricSet>>,
}

struct Shared {
    config: ReporterConfig,
    registry: RwLock<Vec<Registration>>,
    next_id: AtomicU64,
    shutdown: CancellationToken,
    records_received: AtomicU64,
    records_rejected: AtomicU64,
    consumers: watch::Sender<usize>,
}

/// Central collection point for one record stream.
///
/// Cloning is cheap and every clone refers to the same registry.
#[derive(Clone)]
pub struct Reporter {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("config", &self.shared.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(ReporterConfig::default())
    }
}

impl Reporter {
    pub fn new(config: ReporterConfig) -> Self {
        let (consumers, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                config,
                registry: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(0),
                shutdown: CancellationToken::new(),
                records_received: AtomicU64::new(0),
                records_rejected: AtomicU64::new(0),
                consumers,
            }),
        }
    }

    pub fn config(&self) -> &ReporterConfig {
        &self.shared.config
    }

    /// Bounded queue sized by `queue_capacity`, to be drained by [`feed`](Self::feed).
    pub fn channel<R>(&self) -> (mpsc::Sender<R>, mpsc::Receiver<R>) {
        mpsc::channel(self.shared.config.queue_capacity.max(1))
    }

    /// Dispatch loop. Returns once every sender of `receiver` is dropped.
    pub async fn feed<R: IntoRecord>(&self, mut receiver: mpsc::Receiver<R>) {
        debug!("dispatch loop started");
        while let Some(item) = receiver.recv().await {
            self.dispatch(&item.into_record()).await;
        }
        debug!("dispatch loop finished, queue closed");
    }

    /// Run [`feed`](Self::feed) on a new task.
    pub fn spawn_feed<R>(&self, receiver: mpsc::Receiver<R>) -> JoinHandle<()>
    where
        R: IntoRecord + Send + 'static,
    {
        let reporter = self.clone();
        tokio::spawn(async move { reporter.feed(receiver).await })
    }

    /// Fan one record out to every registered metric set, in registration
    /// order. A set that rejects the record is skipped; the others still
    /// ingest it.
    pub async fn dispatch(&self, record: &Record) {
        self.shared.records_received.fetch_add(1, Ordering::Relaxed);
        let registry = self.shared.registry.read().await;
        for registration in registry.iter() {
            if let Err(err) = lock(&registration.set).ingest(record) {
                self.shared.records_rejected.fetch_add(1, Ordering::Relaxed);
                warn!(consumer = registration.id, error = %err, "record rejected");
            }
        }
    }

    /// Compile `schema`, register it and start a consumer rendering it.
    ///
    /// The metric set is registered when this returns, so every record
    /// dispatched afterwards reaches it. A schema that fails to compile is
    /// never registered.
    pub async fn start<R: Renderer>(&self, schema: &Schema, renderer: R) -> Result<ConsumerHandle> {
        if self.is_closed() {
            return Err(RatemeterError::Closed);
        }
        let period = renderer.period();
        if period.is_zero() {
            return Err(SnapshotError::NonPositiveInterval.into());
        }

        let mut set = MetricSet::compile(schema, &self.shared.config)?;
        let layout = set.layout();

        // `close` may have run while we waited for the write lock.
        let mut registry = self.shared.registry.write().await;
        if self.is_closed() {
            set.close();
            return Err(RatemeterError::Closed);
        }
        let set = Arc::new(Mutex::new(set));
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        registry.push(Registration {
            id,
            set: Arc::clone(&set),
        });
        self.shared.consumers.send_modify(|n| *n += 1);
        drop(registry);
        debug!(consumer = id, fields = schema.len(), "metric set registered");

        let cancel = self.shared.shutdown.child_token();
        let consumer = Consumer {
            id,
            shared: Arc::clone(&self.shared),
            set,
            layout,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(consumer.run(renderer, period));

        Ok(ConsumerHandle {
            id,
            cancel,
            task: Some(task),
        })
    }

    /// Stop every consumer started from this reporter and wait for them to
    /// unregister. Later calls to [`start`](Self::start) fail with
    /// [`RatemeterError::Closed`].
    pub async fn close(&self) {
        self.shared.shutdown.cancel();
        // Any `start` holding the write lock has registered its consumer
        // once this is acquired.
        drop(self.shared.registry.write().await);
        let mut consumers = self.shared.consumers.subscribe();
        // Only fails if the sender is gone, which `self` rules out.
        let _ = consumers.wait_for(|n| *n == 0).await;
        info!("reporter closed");
    }

    pub fn is_closed(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }

    pub fn stats(&self) -> ReporterStats {
        ReporterStats {
            records_received: self.shared.records_received.load(Ordering::Relaxed),
            records_rejected: self.shared.records_rejected.load(Ordering::Relaxed),
            active_consumers: *self.shared.consumers.borrow(),
        }
    }
}

/// Running consumer. Dropping the handle cancels the consumer.
#[derive(Debug)]
pub struct ConsumerHandle {
    id: u64,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ConsumerHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the consumer loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Cancel the consumer and wait until its metric set is unregistered
    /// and closed.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(consumer = self.id, error = %err, "consumer task failed");
            }
        }
    }
}

impl Drop for ConsumerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Consumer {
    id: u64,
    shared: Arc<Shared>,
    set: Arc<Mutex<MetricSet>>,
    layout: Layout,
    cancel: CancellationToken,
}

impl Consumer {
    async fn run<R: Renderer>(self, mut renderer: R, period: std::time::Duration) {
        info!(consumer = self.id, period_ms = period.as_millis() as u64, "consumer started");

        let mut cadence = HeaderCadence::new(renderer.header_policy());
        if cadence.at_start() {
            self.header(&mut renderer);
        }

        let started = Instant::now();
        let mut last = started;
        let mut ticker = time::interval_at(started + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let now = Instant::now();
                    let context = RenderContext {
                        at: Local::now(),
                        iter_elapsed: now.duration_since(last),
                        cumulative_elapsed: now.duration_since(started),
                    };
                    last = now;
                    self.tick(&mut renderer, &mut cadence, &context);
                }
            }
        }

        self.shutdown().await;
    }

    fn tick<R: Renderer>(&self, renderer: &mut R, cadence: &mut HeaderCadence, context: &RenderContext) {
        let snapshot =
            match lock(&self.set).snapshot(context.iter_elapsed, context.cumulative_elapsed) {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    warn!(consumer = self.id, error = %err, "snapshot skipped");
                    return;
                }
            };

        if cadence.before_line() {
            self.header(renderer);
        }
        if let Err(err) = renderer.render_values(&self.layout, &snapshot, context) {
            warn!(consumer = self.id, error = %err, "failed to render values");
        }
        cadence.after_line();
    }

    fn header<R: Renderer>(&self, renderer: &mut R) {
        if let Err(err) = renderer.render_header(&self.layout) {
            warn!(consumer = self.id, error = %err, "failed to render header");
        }
    }

    async fn shutdown(self) {
        self.shared
            .registry
            .write()
            .await
            .retain(|registration| registration.id != self.id);
        lock(&self.set).close();
        debug!(consumer = self.id, "metric set unregistered");

        self.shared.consumers.send_modify(|n| *n = n.saturating_sub(1));
        info!(consumer = self.id, "consumer stopped");
    }
}
