// Ratemeter - Live metrics aggregation
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Metric model compiler.
//!
//! Turns one [`FieldSchema`] into a [`Metric`] holding one report instance
//! per token, in token order. Counter tokens are fixed identifiers; latency
//! tokens are a window selector (`w` or `c`) followed by a percentile.

use crate::config::ReporterConfig;
use crate::error::SchemaError;
use crate::metric_set::Metric;
use crate::report::{
    CumulativeAverage, CumulativePercentile, DecayingAverage, Rate, Report, Total,
    WindowedPercentile,
};
use crate::schema::{FieldSchema, MeasurementKind};
use tokio::runtime::Handle;

/// Decaying average tokens and their age in ticks.
pub const DECAY_TOKENS: [(&str, u32); 4] =
    [("ewma1", 60), ("ewma5", 300), ("ewma15", 900), ("ewma60", 3600)];

/// Compile one field into a metric.
///
/// Any report instance created before a failure is closed before the
/// error is returned, so a failed compile leaves no ticker behind.
pub fn compile_field(
    field: &FieldSchema,
    config: &ReporterConfig,
) -> Result<Metric, SchemaError> {
    let tokens = field.report_tokens();
    if tokens.is_empty() {
        return Err(SchemaError::EmptyReportSpec {
            field: field.name.clone(),
        });
    }

    let mut reports: Vec<Box<dyn Report>> = Vec::with_capacity(tokens.len());
    for token in tokens {
        let compiled = match &field.kind {
            MeasurementKind::Counter => compile_counter(&field.name, token, config),
            MeasurementKind::Latency => compile_latency(&field.name, token, config),
            MeasurementKind::Other(kind) => Err(SchemaError::UnsupportedMeasurementKind {
                field: field.name.clone(),
                kind: kind.clone(),
            }),
        };
        match compiled {
            Ok(report) => reports.push(report),
            Err(err) => {
                reports.iter_mut().for_each(|r| r.close());
                return Err(err);
            }
        }
    }

    Ok(Metric::new(field.name.clone(), reports))
}

fn compile_counter(
    field: &str,
    token: &str,
    config: &ReporterConfig,
) -> Result<Box<dyn Report>, SchemaError> {
    match token {
        "iter" => return Ok(Box::new(Rate::new())),
        "cum" => return Ok(Box::new(CumulativeAverage::new())),
        "total" => return Ok(Box::new(Total::new())),
        _ => {}
    }

    let age = DECAY_TOKENS
        .iter()
        .find(|(name, _)| *name == token)
        .map(|(_, age)| *age)
        .ok_or_else(|| SchemaError::UnknownReportKind {
            field: field.to_string(),
            token: token.to_string(),
        })?;

    let runtime = Handle::try_current().map_err(|_| SchemaError::RuntimeUnavailable {
        field: field.to_string(),
    })?;
    Ok(Box::new(DecayingAverage::spawn(
        token,
        age,
        config.decay_tick,
        &runtime,
    )))
}

fn compile_latency(
    field: &str,
    token: &str,
    config: &ReporterConfig,
) -> Result<Box<dyn Report>, SchemaError> {
    let unknown = || SchemaError::UnknownReportKind {
        field: field.to_string(),
        token: token.to_string(),
    };
    let mut chars = token.chars();
    let selector = chars.next().ok_or_else(unknown)?;
    let quantile = parse_percentile(chars.as_str()).ok_or_else(|| {
        SchemaError::InvalidPercentile {
            field: field.to_string(),
            token: token.to_string(),
        }
    });

    match selector {
        'w' => Ok(Box::new(WindowedPercentile::new(
            token,
            quantile?,
            &config.sketch,
        ))),
        'c' => Ok(Box::new(CumulativePercentile::new(
            token,
            quantile?,
            &config.sketch,
        ))),
        _ => Err(unknown()),
    }
}

/// Parse a percentile literal into a fraction in (0, 1].
fn parse_percentile(literal: &str) -> Option<f64> {
    let percentile: f64 = literal.parse().ok()?;
    if percentile.is_finite() && percentile > 0.0 && percentile <= 100.0 {
        Some(percentile / 100.0)
    } else {
        None
    }
}
