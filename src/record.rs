// Ratemeter - Live metrics aggregation
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Observation records.
//!
//! A [`Record`] carries one value per schema field, matched by position.

use crate::error::IngestError;

/// A single field value as produced by a caller.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl FieldValue {
    /// Name of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Int(_) => "int",
            FieldValue::UInt(_) => "uint",
            FieldValue::Float(_) => "float",
            FieldValue::Bool(_) => "bool",
            FieldValue::Text(_) => "text",
        }
    }

    /// Widen to `f64`. Non-numeric values are a type mismatch.
    pub fn to_f64(&self, field: &str) -> Result<f64, IngestError> {
        match self {
            FieldValue::Int(v) => Ok(*v as f64),
            FieldValue::UInt(v) => Ok(*v as f64),
            FieldValue::Float(v) => Ok(*v),
            other => Err(IngestError::TypeMismatch {
                field: field.to_string(),
                found: other.type_name(),
            }),
        }
    }
}

macro_rules! impl_from_primitive {
    ($variant:ident, $target:ty, $($t:ty),*) => {
        $(
            impl From<$t> for FieldValue {
                fn from(v: $t) -> Self {
                    FieldValue::$variant(v as $target)
                }
            }
        )*
    };
}

impl_from_primitive!(Int, i64, i8, i16, i32, i64, isize);
impl_from_primitive!(UInt, u64, u8, u16, u32, u64, usize);
impl_from_primitive!(Float, f64, f32, f64);

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

/// Positional observation matching a schema field for field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    values: Vec<FieldValue>,
}

impl Record {
    pub fn new(values: Vec<FieldValue>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&FieldValue> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Builder: append a value.
    pub fn with(mut self, value: impl Into<FieldValue>) -> Self {
        self.values.push(value.into());
        self
    }
}

impl<V: Into<FieldValue>> FromIterator<V> for Record {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

impl From<Vec<FieldValue>> for Record {
    fn from(values: Vec<FieldValue>) -> Self {
        Self::new(values)
    }
}

/// Conversion of a caller-defined observation type into a [`Record`].
///
/// ```rust
/// use ratemeter::{IntoRecord, Record};
///
/// struct Sample {
///     transactions: u64,
///     latency_ms: f64,
/// }
///
/// impl IntoRecord for Sample {
///     fn into_record(self) -> Record {
///         Record::default().with(self.transactions).with(self.latency_ms)
///     }
/// }
///
/// let record = Sample { transactions: 3, latency_ms: 12.5 }.into_record();
/// assert_eq!(record.len(), 2);
/// ```
pub trait IntoRecord {
    fn into_record(self) -> Record;
}

impl IntoRecord for Record {
    fn into_record(self) -> Record {
        self
    }
}

impl IntoRecord for Vec<FieldValue> {
    fn into_record(self) -> Record {
        Record::new(self)
    }
}
