// Ratemeter Render - Column and CSV renderers
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # Ratemeter demo
//!
//! Feeds a synthetic observation stream through a reporter and prints it
//! dstat-style, optionally mirrored to a CSV file.
//!
//! ## Usage
//!
//! ```bash
//! # Built-in schema, 200 records per second, for 10 seconds
//! ratemeter-demo
//!
//! # Custom schema, CSV copy, header every 10 lines
//! ratemeter-demo --schema schema.json --csv out.csv --header-lines 10
//! ```

use clap::Parser;
use rand::Rng;
use ratemeter::{
    FieldValue, HeaderPolicy, MeasurementKind, Record, Reporter, ReporterConfig, Schema,
};
use ratemeter_render::{ColumnRenderer, CsvRenderer};
use std::fs::File;
use std::io::BufWriter;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

/// Ratemeter demo
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON schema file (array of {"name", "kind", "reports"})
    #[arg(short, long)]
    schema: Option<String>,

    /// Records generated per second
    #[arg(short, long, default_value = "200")]
    rate: u32,

    /// How long to generate records, in seconds
    #[arg(short, long, default_value = "10")]
    duration: u64,

    /// Reporting period in milliseconds
    #[arg(short, long, default_value = "1000")]
    period_ms: u64,

    /// Value lines between headers (negative = never, 0 = once)
    #[arg(long, default_value = "24", allow_hyphen_values = true)]
    header_lines: i64,

    /// Also write CSV rows to this file
    #[arg(short, long)]
    csv: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Ratemeter demo v{}", env!("CARGO_PKG_VERSION"));

    let schema = match load_schema(args.schema.as_deref()) {
        Ok(schema) => schema,
        Err(e) => {
            error!("Failed to load schema: {}", e);
            std::process::exit(1);
        }
    };

    let period = Duration::from_millis(args.period_ms);
    let reporter = Reporter::new(ReporterConfig::default());
    let (tx, rx) = reporter.channel::<Record>();
    let feed = reporter.spawn_feed(rx);

    let columns = ColumnRenderer::stdout()
        .with_period(period)
        .with_header_policy(HeaderPolicy::from_lines_between(args.header_lines));
    let mut consumers = Vec::new();
    match reporter.start(&schema, columns).await {
        Ok(handle) => consumers.push(handle),
        Err(e) => {
            error!("Failed to start column output: {}", e);
            std::process::exit(1);
        }
    }

    if let Some(path) = &args.csv {
        let started = match File::create(path) {
            Ok(file) => {
                let csv = CsvRenderer::new(BufWriter::new(file)).with_period(period);
                reporter.start(&schema, csv).await
            }
            Err(e) => {
                error!("Failed to create {}: {}", path, e);
                std::process::exit(1);
            }
        };
        match started {
            Ok(handle) => {
                info!("Writing CSV rows to {}", path);
                consumers.push(handle);
            }
            Err(e) => error!("Failed to start CSV output: {}", e),
        }
    }

    let producer = tokio::spawn(produce(
        schema,
        tx,
        args.rate,
        Duration::from_secs(args.duration),
    ));
    let abort = producer.abort_handle();

    tokio::select! {
        _ = producer => info!("Generator finished"),
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            abort.abort();
        }
    }

    // Let the last period print before shutting down
    time::sleep(period).await;
    reporter.close().await;
    drop(consumers);
    if feed.await.is_err() {
        error!("Dispatch loop failed");
    }
}

fn load_schema(path: Option<&str>) -> ratemeter::Result<Schema> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .map_err(|e| ratemeter::RatemeterError::Json(e.to_string()))?;
            Schema::from_json(&json)
        }
        None => Ok(Schema::builder()
            .counter("Transactions", "iter,cum,ewma1")
            .counter("Faults", "cum,total")
            .latency("Latency", "w50,w99,c99.9")
            .build()),
    }
}

/// Push `rate` records per second for `duration`.
async fn produce(schema: Schema, tx: mpsc::Sender<Record>, rate: u32, duration: Duration) {
    let deadline = Instant::now() + duration;
    let mut ticker = time::interval(Duration::from_secs(1) / rate.max(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

    while Instant::now() < deadline {
        ticker.tick().await;
        let record = synthetic_record(&schema);
        if tx.send(record).await.is_err() {
            break;
        }
    }
}

/// One record: counters tick by one (faults rarely), latencies around 100 ms.
fn synthetic_record(schema: &Schema) -> Record {
    let mut rng = rand::thread_rng();
    schema
        .fields()
        .iter()
        .map(|field| match field.kind {
            MeasurementKind::Counter if field.name.eq_ignore_ascii_case("faults") => {
                FieldValue::UInt(u64::from(rng.gen_bool(0.02)))
            }
            MeasurementKind::Latency => {
                // Sum of uniforms: roughly normal, mean 100, sd 20
                let noise: f64 = (0..12).map(|_| rng.gen::<f64>()).sum::<f64>() - 6.0;
                FieldValue::Float(100.0 + 20.0 * noise)
            }
            _ => FieldValue::UInt(1),
        })
        .collect::<Vec<_>>()
        .into()
}
