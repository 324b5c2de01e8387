//! Renderers driven by a live reporter.

use ratemeter::{HeaderPolicy, Record, Reporter, Schema};
use ratemeter_render::{ColumnRenderer, CsvRenderer};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

// ============================================================================
// Helpers
// ============================================================================

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock().unwrap())
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn example_schema() -> Schema {
    Schema::builder()
        .counter("A", "iter,total")
        .counter("B", "ewma1,cum,total")
        .build()
}

/// Ten `{A: 1, B: 1}` records 400 ms apart, starting 50 ms in.
async fn feed_example(reporter: &Reporter) {
    let (tx, rx) = reporter.channel::<Record>();
    let feed = reporter.spawn_feed(rx);
    sleep(Duration::from_millis(50)).await;
    for _ in 0..10 {
        tx.send(Record::new(vec![1u8.into(), 1u8.into()]))
            .await
            .unwrap();
        sleep(Duration::from_millis(400)).await;
    }
    sleep(Duration::from_millis(50)).await;
    drop(tx);
    feed.await.unwrap();
}

// ============================================================================
// Column output
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_column_output() {
    let reporter = Reporter::default();
    let buffer = SharedBuffer::default();
    let renderer = ColumnRenderer::new(buffer.clone())
        .with_prefix("example: ")
        .with_header_policy(HeaderPolicy::Once);
    let consumer = reporter.start(&example_schema(), renderer).await.unwrap();

    feed_example(&reporter).await;
    consumer.stop().await;

    assert_eq!(
        buffer.lines(),
        vec![
            "example: ----------- a ------------ ------------------ b ------------------",
            "example:         iter        total |        ewma1          cum        total",
            "example:         3.00            3 |         0.00         3.00            3",
            "example:         2.00            5 |         0.00         2.50            5",
            "example:         3.00            8 |         0.00         2.67            8",
            "example:         2.00           10 |         0.00         2.50           10",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_column_header_repeats() {
    let reporter = Reporter::default();
    let buffer = SharedBuffer::default();
    let renderer = ColumnRenderer::new(buffer.clone()).with_header_policy(HeaderPolicy::Every(2));
    let consumer = reporter.start(&example_schema(), renderer).await.unwrap();

    feed_example(&reporter).await;
    consumer.stop().await;

    let lines = buffer.lines();
    // header, 2 values, header, 2 values
    assert_eq!(lines.len(), 8);
    assert_eq!(lines[0], lines[4]);
    assert_eq!(lines[1], lines[5]);
    assert!(lines[1].contains("ewma1"));
}

// ============================================================================
// CSV output
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_csv_file_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.csv");

    let reporter = Reporter::default();
    let file = std::fs::File::create(&path).unwrap();
    let consumer = reporter
        .start(&example_schema(), CsvRenderer::new(file))
        .await
        .unwrap();

    feed_example(&reporter).await;
    consumer.stop().await;

    let raw = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        raw.lines().next(),
        Some(r#"time,"A iter","A total","B ewma1","B cum","B total""#)
    );

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec!["time", "A iter", "A total", "B ewma1", "B cum", "B total"]
    );

    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 4);
    let totals: Vec<f64> = rows.iter().map(|r| r[2].parse().unwrap()).collect();
    assert_eq!(totals, vec![3.0, 5.0, 8.0, 10.0]);
    assert_eq!(&rows[2][4], "2.666667");
    assert!(rows.iter().all(|r| !r[0].is_empty()));
}
