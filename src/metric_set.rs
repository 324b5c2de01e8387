// Ratemeter - Live metrics aggregation
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Live, compiled representation of one schema instance.
//!
//! A [`MetricSet`] holds one [`Metric`] per schema field, in schema order,
//! and each metric holds its report instances in token order. That order
//! never changes after compilation, so [`MetricSet::layout`] and every
//! [`MetricSet::snapshot`] line up column for column.
//!
//! # Example
//!
//! ```
//! use ratemeter::{MetricSet, Record, ReporterConfig, Schema};
//! use std::time::Duration;
//!
//! let schema = Schema::builder().counter("Ops", "iter,total").build();
//! let mut set = MetricSet::compile(&schema, &ReporterConfig::default()).unwrap();
//!
//! set.ingest(&Record::new(vec![4u64.into()])).unwrap();
//! let snapshot = set
//!     .snapshot(Duration::from_secs(2), Duration::from_secs(2))
//!     .unwrap();
//! assert_eq!(snapshot.get("Ops", "iter"), Some(2.0));
//! assert_eq!(snapshot.get("Ops", "total"), Some(4.0));
//! ```

use crate::compiler::compile_field;
use crate::config::ReporterConfig;
use crate::error::{IngestError, Result, SnapshotError};
use crate::record::Record;
use crate::report::Report;
use crate::schema::Schema;
use crate::snapshot::{Layout, MetricLayout, MetricValue, ReportLayout, ReportValue, Snapshot};
use std::time::Duration;

/// One field's compiled reports.
#[derive(Debug)]
pub struct Metric {
    name: String,
    reports: Vec<Box<dyn Report>>,
}

impl Metric {
    pub fn new(name: impl Into<String>, reports: Vec<Box<dyn Report>>) -> Self {
        Self {
            name: name.into(),
            reports,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reports(&self) -> &[Box<dyn Report>] {
        &self.reports
    }

    /// Feed one observation to every report, in order.
    pub fn add(&mut self, value: f64) {
        for report in &mut self.reports {
            report.add(value);
        }
    }

    fn read(&mut self, iter_elapsed: Duration, cumulative_elapsed: Duration) -> MetricValue {
        MetricValue {
            name: self.name.clone(),
            reports: self
                .reports
                .iter_mut()
                .map(|report| ReportValue {
                    name: report.name().to_string(),
                    value: report.get_and_advance(iter_elapsed, cumulative_elapsed),
                })
                .collect(),
        }
    }

    fn layout(&self) -> MetricLayout {
        MetricLayout {
            name: self.name.clone(),
            reports: self
                .reports
                .iter()
                .map(|report| ReportLayout {
                    name: report.name().to_string(),
                    format: report.format(),
                })
                .collect(),
        }
    }

    pub fn close(&mut self) {
        for report in &mut self.reports {
            report.close();
        }
    }

    pub fn is_live(&self) -> bool {
        self.reports.iter().any(|r| r.is_live())
    }
}

/// Compiled metrics for one schema.
#[derive(Debug)]
pub struct MetricSet {
    metrics: Vec<Metric>,
}

impl MetricSet {
    /// Compile every field of `schema`.
    ///
    /// Decaying averages spawn their tickers on the current tokio runtime.
    /// If a later field fails, the metrics already compiled are closed
    /// before the error is returned.
    pub fn compile(schema: &Schema, config: &ReporterConfig) -> Result<Self> {
        let mut metrics = Vec::with_capacity(schema.len());
        for field in schema.fields() {
            match compile_field(field, config) {
                Ok(metric) => metrics.push(metric),
                Err(err) => {
                    metrics.iter_mut().for_each(Metric::close);
                    return Err(err.into());
                }
            }
        }
        Ok(Self { metrics })
    }

    /// Dispatch one record, field by field.
    ///
    /// The record is validated completely before any report is touched; a
    /// rejected record leaves the set unchanged.
    pub fn ingest(&mut self, record: &Record) -> std::result::Result<(), IngestError> {
        if record.len() != self.metrics.len() {
            return Err(IngestError::FieldCountMismatch {
                expected: self.metrics.len(),
                actual: record.len(),
            });
        }

        let values = self
            .metrics
            .iter()
            .zip(record.values())
            .map(|(metric, value)| value.to_f64(metric.name()))
            .collect::<std::result::Result<Vec<f64>, IngestError>>()?;

        for (metric, value) in self.metrics.iter_mut().zip(values) {
            metric.add(value);
        }
        Ok(())
    }

    /// Read every report.
    ///
    /// Advances the read baseline of windowed reports, so two concurrent
    /// callers would each see half an interval. Callers serialize access.
    pub fn snapshot(
        &mut self,
        iter_elapsed: Duration,
        cumulative_elapsed: Duration,
    ) -> Result<Snapshot> {
        if iter_elapsed.is_zero() || cumulative_elapsed.is_zero() {
            return Err(SnapshotError::NonPositiveInterval.into());
        }
        Ok(Snapshot {
            metrics: self
                .metrics
                .iter_mut()
                .map(|metric| metric.read(iter_elapsed, cumulative_elapsed))
                .collect(),
        })
    }

    /// Structural description, for headers.
    pub fn layout(&self) -> Layout {
        Layout {
            metrics: self.metrics.iter().map(Metric::layout).collect(),
        }
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Stop every background ticker. Idempotent.
    pub fn close(&mut self) {
        self.metrics.iter_mut().for_each(Metric::close);
    }

    /// Whether any report still has a running ticker.
    pub fn is_live(&self) -> bool {
        self.metrics.iter().any(Metric::is_live)
    }
}

impl Drop for MetricSet {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RatemeterError;
    use crate::record::FieldValue;
    use approx::assert_relative_eq;
    use std::sync::{Arc, Mutex};
    use std::thread;

    const SEC: Duration = Duration::from_secs(1);

    fn compile(schema: &Schema) -> MetricSet {
        MetricSet::compile(schema, &ReporterConfig::default()).unwrap()
    }

    fn ones(n: usize) -> Record {
        (0..n).map(|_| 1u32).collect()
    }

    #[test]
    fn test_sample_values() {
        let schema = Schema::builder()
            .counter("Ops", "iter,cum,total")
            .latency("Latency", "w50,c50")
            .build();
        let mut set = compile(&schema);

        for _ in 0..3 {
            set.ingest(&Record::new(vec![FieldValue::from(2u8), 20u32.into()]))
                .unwrap();
        }

        let snap = set.snapshot(SEC * 2, SEC * 3).unwrap();
        assert_relative_eq!(snap.get("Ops", "iter").unwrap(), 3.0);
        assert_relative_eq!(snap.get("Ops", "cum").unwrap(), 2.0);
        assert_eq!(snap.get("Ops", "total"), Some(6.0));
        assert_eq!(snap.get("Latency", "w50"), Some(20.0));
        assert_eq!(snap.get("Latency", "c50"), Some(20.0));

        let snap = set.snapshot(SEC, SEC * 4).unwrap();
        assert_eq!(snap.get("Ops", "iter"), Some(0.0));
        assert_relative_eq!(snap.get("Ops", "cum").unwrap(), 1.5);
        assert_eq!(snap.get("Latency", "w50"), Some(0.0));
        assert_eq!(snap.get("Latency", "c50"), Some(20.0));
    }

    #[test]
    fn test_total_is_count_times_value() {
        let mut set = compile(&Schema::builder().counter("A", "total").build());
        for _ in 0..250 {
            set.ingest(&Record::new(vec![FieldValue::Float(0.5)])).unwrap();
        }
        let snap = set.snapshot(SEC, SEC).unwrap();
        assert_eq!(snap.get("A", "total"), Some(125.0));
    }

    #[test]
    fn test_rate_matches_raw_sums() {
        let mut set = compile(&Schema::builder().counter("A", "iter").build());
        let mut sum = 0.0;
        let mut last = 0.0;
        for (round, elapsed_ms) in [(3u32, 250u64), (0, 1000), (17, 1300)] {
            for i in 0..round {
                set.ingest(&Record::new(vec![i.into()])).unwrap();
                sum += i as f64;
            }
            let elapsed = Duration::from_millis(elapsed_ms);
            let snap = set.snapshot(elapsed, SEC * 10).unwrap();
            assert_relative_eq!(
                snap.get("A", "iter").unwrap(),
                (sum - last) / elapsed.as_secs_f64()
            );
            last = sum;
        }
    }

    #[test]
    fn test_concurrent_ingest_matches_serial() {
        let schema = Schema::builder().counter("A", "total").build();
        let shared = Arc::new(Mutex::new(compile(&schema)));

        let producers: Vec<_> = (0..8u64)
            .map(|t| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    for i in 0..500u64 {
                        let record = Record::new(vec![(t * 500 + i).into()]);
                        shared.lock().unwrap().ingest(&record).unwrap();
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }

        let mut serial = compile(&schema);
        for v in 0..4000u64 {
            serial.ingest(&Record::new(vec![v.into()])).unwrap();
        }

        let concurrent = shared.lock().unwrap().snapshot(SEC, SEC).unwrap();
        let serial = serial.snapshot(SEC, SEC).unwrap();
        assert_eq!(concurrent.get("A", "total"), serial.get("A", "total"));
        assert_eq!(serial.get("A", "total"), Some(7_998_000.0));
    }

    #[test]
    fn test_type_mismatch_rejects_whole_record() {
        let schema = Schema::builder()
            .counter("A", "total")
            .counter("B", "total")
            .build();
        let mut set = compile(&schema);

        let err = set
            .ingest(&Record::new(vec![1u8.into(), "lots".into()]))
            .unwrap_err();
        assert_eq!(
            err,
            IngestError::TypeMismatch {
                field: "B".to_string(),
                found: "text"
            }
        );

        let snap = set.snapshot(SEC, SEC).unwrap();
        assert_eq!(snap.get("A", "total"), Some(0.0));
    }

    #[test]
    fn test_field_count_mismatch() {
        let mut set = compile(&Schema::builder().counter("A", "total").build());
        let err = set.ingest(&ones(2)).unwrap_err();
        assert_eq!(
            err,
            IngestError::FieldCountMismatch {
                expected: 1,
                actual: 2
            }
        );
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut set = compile(&Schema::builder().counter("A", "iter").build());
        let err = set.snapshot(Duration::ZERO, SEC).unwrap_err();
        assert_eq!(
            err,
            RatemeterError::Snapshot(SnapshotError::NonPositiveInterval)
        );
        assert!(set.snapshot(SEC, Duration::ZERO).is_err());
    }

    #[test]
    fn test_layout_matches_snapshot_order() {
        let schema = Schema::builder()
            .counter("A", "iter,total")
            .counter("B", "cum,total,iter")
            .latency("L", "c99,w50")
            .build();
        let mut set = compile(&schema);
        let layout = set.layout();

        let columns: Vec<_> = layout.columns().collect();
        assert_eq!(
            columns,
            vec![
                ("A", "iter"),
                ("A", "total"),
                ("B", "cum"),
                ("B", "total"),
                ("B", "iter"),
                ("L", "c99"),
                ("L", "w50"),
            ]
        );

        set.ingest(&ones(3)).unwrap();
        let snap = set.snapshot(SEC, SEC).unwrap();
        assert!(snap.matches(&layout));
        assert_eq!(snap.values().count(), layout.column_count());
    }

    #[test]
    fn test_failed_compile_is_error() {
        let schema = Schema::builder()
            .counter("A", "total")
            .counter("B", "bogus")
            .build();
        let err = MetricSet::compile(&schema, &ReporterConfig::default()).unwrap_err();
        assert!(matches!(err, RatemeterError::SchemaCompilation(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_stops_tickers() {
        let schema = Schema::builder().counter("A", "iter,ewma1,ewma5").build();
        let mut set = compile(&schema);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(set.is_live());

        set.close();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(!set.is_live());

        set.close();
    }
}
