//! Accurate (lossless) casting between column types.

use super::{Column, ColumnValue, ColumnWithTypeAndName, DataType};
use crate::error::{Error, Result};

/// Largest integer magnitude every f64 represents exactly.
const F64_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// Converts a value to `u64` when no information is lost.
#[must_use]
// Reason: the float branch only casts integral values strictly inside the u64 range.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn exact_u64(value: &ColumnValue) -> Option<u64> {
    match value {
        ColumnValue::UInt(u) => Some(*u),
        ColumnValue::Int(i) => u64::try_from(*i).ok(),
        ColumnValue::Bool(b) => Some(u64::from(*b)),
        ColumnValue::Float(f) if f.fract() == 0.0 && *f >= 0.0 && *f < 18_446_744_073_709_551_616.0 => {
            Some(*f as u64)
        }
        _ => None,
    }
}

/// Converts a value to `i64` when no information is lost.
#[must_use]
// Reason: the float branch only casts integral values strictly inside the i64 range.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn exact_i64(value: &ColumnValue) -> Option<i64> {
    match value {
        ColumnValue::Int(i) => Some(*i),
        ColumnValue::UInt(u) => i64::try_from(*u).ok(),
        ColumnValue::Bool(b) => Some(i64::from(*b)),
        ColumnValue::Float(f)
            if f.fract() == 0.0
                && *f >= -9_223_372_036_854_775_808.0
                && *f < 9_223_372_036_854_775_808.0 =>
        {
            Some(*f as i64)
        }
        _ => None,
    }
}

/// Converts a value to `f64` when no information is lost.
#[must_use]
// Reason: integers are only accepted inside the exactly representable range.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn exact_f64(value: &ColumnValue) -> Option<f64> {
    match value {
        ColumnValue::Float(f) => Some(*f),
        ColumnValue::UInt(u) if (*u as f64) <= F64_EXACT_INT => Some(*u as f64),
        ColumnValue::Int(i) if (*i as f64).abs() <= F64_EXACT_INT => Some(*i as f64),
        ColumnValue::Bool(b) => Some(f64::from(u8::from(*b))),
        _ => None,
    }
}

/// Converts a value to `f32` when no information is lost. NaN stays NaN.
#[must_use]
// Reason: the narrowing cast is verified by a round-trip comparison.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn exact_f32(value: &ColumnValue) -> Option<f32> {
    let wide = exact_f64(value)?;
    let narrow = wide as f32;
    if wide.is_nan() || f64::from(narrow) == wide {
        Some(narrow)
    } else {
        None
    }
}

/// Converts a value to `bool` when it is a boolean or the numbers 0/1.
#[must_use]
pub(crate) fn exact_bool(value: &ColumnValue) -> Option<bool> {
    match value {
        ColumnValue::Bool(b) => Some(*b),
        other => match exact_u64(other)? {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        },
    }
}

/// Casts a column to `to`, failing on the first value that cannot be represented exactly.
///
/// Constant and dictionary-encoded inputs are materialized. NULLs are only accepted when
/// `to` is `Nullable`.
pub fn cast_accurate(source: &ColumnWithTypeAndName, to: &DataType) -> Result<Column> {
    let column = source.column.materialize();
    if source.data_type.remove_low_cardinality() == to.remove_low_cardinality() {
        return Ok(column.into_owned());
    }

    let mut result = to.create_column();
    for row in 0..column.len() {
        let value = column.value_at(row);
        if value.is_null() && !result.is_nullable() {
            return Err(Error::CannotConvertType {
                value: value.to_string(),
                to: to.name(),
            });
        }
        result.push_value(&value).map_err(|_| Error::CannotConvertType {
            value: value.to_string(),
            to: to.name(),
        })?;
    }
    Ok(result)
}

/// Casts a column to `Nullable(to)`, turning values that cannot be represented exactly
/// into NULL.
pub fn cast_accurate_or_null(source: &ColumnWithTypeAndName, to: &DataType) -> Result<Column> {
    let inner = to.remove_nullable();
    if !inner.can_be_inside_nullable() {
        return Err(Error::Logical(format!(
            "type {} cannot be inside Nullable",
            inner.name()
        )));
    }
    let target = DataType::nullable(inner.remove_low_cardinality());
    let column = source.column.materialize();

    let mut result = target.create_column();
    for row in 0..column.len() {
        let value = column.value_at(row);
        if result.push_value(&value).is_err() {
            result.push_value(&ColumnValue::Null)?;
        }
    }
    Ok(result)
}
