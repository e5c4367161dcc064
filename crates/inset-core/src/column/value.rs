//! Single cell values.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single cell value detached from its column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnValue {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Unsigned integer value (also Date/DateTime)
    UInt(u64),
    /// Signed integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value (also FixedString)
    String(String),
}

impl ColumnValue {
    /// Returns true for `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Total order used for sorting and range bounds.
    ///
    /// Numbers compare numerically across kinds, booleans order as 0/1, numbers sort
    /// before strings. NULL and NaN sort last when `nulls_last` is set, first otherwise.
    #[must_use]
    pub fn total_cmp(&self, other: &Self, nulls_last: bool) -> Ordering {
        let null_side = if nulls_last {
            Ordering::Greater
        } else {
            Ordering::Less
        };
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => null_side,
            (_, Self::Null) => null_side.reverse(),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::String(_), _) => Ordering::Greater,
            (_, Self::String(_)) => Ordering::Less,
            (a, b) => compare_numbers(a, b, nulls_last),
        }
    }
}

fn as_i128(value: &ColumnValue) -> Option<i128> {
    match value {
        ColumnValue::Bool(b) => Some(i128::from(*b)),
        ColumnValue::UInt(u) => Some(i128::from(*u)),
        ColumnValue::Int(i) => Some(i128::from(*i)),
        _ => None,
    }
}

// Reason: float/integer comparison falls back to i128 only for integral floats in range.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn compare_float_int(f: f64, i: i128, nulls_last: bool) -> Ordering {
    if f.is_nan() {
        return if nulls_last {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    match f.partial_cmp(&(i as f64)) {
        Some(Ordering::Equal) if f.fract() == 0.0 && f.abs() < 1.7e38 => (f as i128).cmp(&i),
        Some(ord) => ord,
        None => Ordering::Equal,
    }
}

fn compare_floats(a: f64, b: f64, nulls_last: bool) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) if nulls_last => Ordering::Greater,
        (true, false) => Ordering::Less,
        (false, true) if nulls_last => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

fn compare_numbers(a: &ColumnValue, b: &ColumnValue, nulls_last: bool) -> Ordering {
    match (a, b) {
        (ColumnValue::Float(x), ColumnValue::Float(y)) => compare_floats(*x, *y, nulls_last),
        (ColumnValue::Float(x), other) => as_i128(other)
            .map_or(Ordering::Equal, |i| compare_float_int(*x, i, nulls_last)),
        (other, ColumnValue::Float(y)) => as_i128(other).map_or(Ordering::Equal, |i| {
            compare_float_int(*y, i, nulls_last).reverse()
        }),
        (x, y) => as_i128(x).cmp(&as_i128(y)),
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::UInt(u) => write!(f, "{u}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "'{s}'"),
        }
    }
}

impl From<u64> for ColumnValue {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl From<i64> for ColumnValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for ColumnValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ColumnValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for ColumnValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl<T: Into<ColumnValue>> From<Option<T>> for ColumnValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
