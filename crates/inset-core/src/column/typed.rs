//! Plain typed column storage.

use std::cmp::Ordering;

use super::cast::{exact_bool, exact_f32, exact_f64, exact_i64, exact_u64};
use super::{ColumnValue, DataType};
use crate::error::{Error, Result};

/// A typed column storing non-null values of one physical type.
///
/// `Date` and `DateTime` live in `UInt16`/`UInt32` storage. Each `FixedString`
/// value is exactly `width` bytes, zero padded.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedColumn {
    /// u8 values
    UInt8(Vec<u8>),
    /// u16 values
    UInt16(Vec<u16>),
    /// u32 values
    UInt32(Vec<u32>),
    /// u64 values
    UInt64(Vec<u64>),
    /// i8 values
    Int8(Vec<i8>),
    /// i16 values
    Int16(Vec<i16>),
    /// i32 values
    Int32(Vec<i32>),
    /// i64 values
    Int64(Vec<i64>),
    /// f32 values
    Float32(Vec<f32>),
    /// f64 values
    Float64(Vec<f64>),
    /// bool values
    Bool(Vec<bool>),
    /// UTF-8 strings
    String(Vec<String>),
    /// Fixed-width byte strings
    FixedString {
        /// Byte width of every value
        width: usize,
        /// Values, each exactly `width` bytes
        values: Vec<Vec<u8>>,
    },
}

macro_rules! map_values {
    ($col:expr, |$v:ident| $e:expr) => {
        match $col {
            TypedColumn::UInt8($v) => TypedColumn::UInt8($e),
            TypedColumn::UInt16($v) => TypedColumn::UInt16($e),
            TypedColumn::UInt32($v) => TypedColumn::UInt32($e),
            TypedColumn::UInt64($v) => TypedColumn::UInt64($e),
            TypedColumn::Int8($v) => TypedColumn::Int8($e),
            TypedColumn::Int16($v) => TypedColumn::Int16($e),
            TypedColumn::Int32($v) => TypedColumn::Int32($e),
            TypedColumn::Int64($v) => TypedColumn::Int64($e),
            TypedColumn::Float32($v) => TypedColumn::Float32($e),
            TypedColumn::Float64($v) => TypedColumn::Float64($e),
            TypedColumn::Bool($v) => TypedColumn::Bool($e),
            TypedColumn::String($v) => TypedColumn::String($e),
            TypedColumn::FixedString { width, values: $v } => TypedColumn::FixedString {
                width: *width,
                values: $e,
            },
        }
    };
}

macro_rules! with_values {
    ($col:expr, |$v:ident| $e:expr) => {
        match $col {
            TypedColumn::UInt8($v) => $e,
            TypedColumn::UInt16($v) => $e,
            TypedColumn::UInt32($v) => $e,
            TypedColumn::UInt64($v) => $e,
            TypedColumn::Int8($v) => $e,
            TypedColumn::Int16($v) => $e,
            TypedColumn::Int32($v) => $e,
            TypedColumn::Int64($v) => $e,
            TypedColumn::Float32($v) => $e,
            TypedColumn::Float64($v) => $e,
            TypedColumn::Bool($v) => $e,
            TypedColumn::String($v) => $e,
            TypedColumn::FixedString { values: $v, .. } => $e,
        }
    };
}

fn cannot_convert(value: &ColumnValue, to: &str) -> Error {
    Error::CannotConvertType {
        value: value.to_string(),
        to: to.to_string(),
    }
}

fn filter_vec<T: Clone>(values: &[T], mask: &[bool]) -> Vec<T> {
    values
        .iter()
        .zip(mask)
        .filter(|(_, keep)| **keep)
        .map(|(v, _)| v.clone())
        .collect()
}

fn permute_vec<T: Clone>(values: &[T], perm: &[usize]) -> Vec<T> {
    perm.iter().map(|&i| values[i].clone()).collect()
}

fn compare_floats(a: f64, b: f64, nulls_last: bool) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (true, true) => Ordering::Equal,
        (true, false) if nulls_last => Ordering::Greater,
        (true, false) => Ordering::Less,
        (false, true) if nulls_last => Ordering::Less,
        (false, true) => Ordering::Greater,
    }
}

impl TypedColumn {
    /// Creates an empty column for a plain (non-wrapper) type.
    ///
    /// Wrapper types resolve to their innermost plain type.
    #[must_use]
    pub fn empty(data_type: &DataType) -> Self {
        match data_type {
            DataType::UInt8 => Self::UInt8(Vec::new()),
            DataType::UInt16 | DataType::Date => Self::UInt16(Vec::new()),
            DataType::UInt32 | DataType::DateTime => Self::UInt32(Vec::new()),
            DataType::UInt64 => Self::UInt64(Vec::new()),
            DataType::Int8 => Self::Int8(Vec::new()),
            DataType::Int16 => Self::Int16(Vec::new()),
            DataType::Int32 => Self::Int32(Vec::new()),
            DataType::Int64 => Self::Int64(Vec::new()),
            DataType::Float32 => Self::Float32(Vec::new()),
            DataType::Float64 => Self::Float64(Vec::new()),
            DataType::Bool => Self::Bool(Vec::new()),
            DataType::String => Self::String(Vec::new()),
            DataType::FixedString(width) => Self::FixedString {
                width: *width,
                values: Vec::new(),
            },
            DataType::Nullable(inner) | DataType::LowCardinality(inner) => Self::empty(inner),
        }
    }

    /// Physical type name, used in conversion errors.
    #[must_use]
    pub fn type_name(&self) -> String {
        match self {
            Self::UInt8(_) => "UInt8".to_string(),
            Self::UInt16(_) => "UInt16".to_string(),
            Self::UInt32(_) => "UInt32".to_string(),
            Self::UInt64(_) => "UInt64".to_string(),
            Self::Int8(_) => "Int8".to_string(),
            Self::Int16(_) => "Int16".to_string(),
            Self::Int32(_) => "Int32".to_string(),
            Self::Int64(_) => "Int64".to_string(),
            Self::Float32(_) => "Float32".to_string(),
            Self::Float64(_) => "Float64".to_string(),
            Self::Bool(_) => "Bool".to_string(),
            Self::String(_) => "String".to_string(),
            Self::FixedString { width, .. } => format!("FixedString({width})"),
        }
    }

    /// Returns the number of values in the column.
    #[must_use]
    pub fn len(&self) -> usize {
        with_values!(self, |v| v.len())
    }

    /// Returns true if the column is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Width in bytes of each value when stored as a packed key, `None` for `String`.
    #[must_use]
    pub fn key_width(&self) -> Option<usize> {
        match self {
            Self::UInt8(_) | Self::Int8(_) | Self::Bool(_) => Some(1),
            Self::UInt16(_) | Self::Int16(_) => Some(2),
            Self::UInt32(_) | Self::Int32(_) | Self::Float32(_) => Some(4),
            Self::UInt64(_) | Self::Int64(_) | Self::Float64(_) => Some(8),
            Self::FixedString { width, .. } => Some(*width),
            Self::String(_) => None,
        }
    }

    /// Returns the value at `row`.
    #[must_use]
    pub fn value_at(&self, row: usize) -> ColumnValue {
        match self {
            Self::UInt8(v) => ColumnValue::UInt(u64::from(v[row])),
            Self::UInt16(v) => ColumnValue::UInt(u64::from(v[row])),
            Self::UInt32(v) => ColumnValue::UInt(u64::from(v[row])),
            Self::UInt64(v) => ColumnValue::UInt(v[row]),
            Self::Int8(v) => ColumnValue::Int(i64::from(v[row])),
            Self::Int16(v) => ColumnValue::Int(i64::from(v[row])),
            Self::Int32(v) => ColumnValue::Int(i64::from(v[row])),
            Self::Int64(v) => ColumnValue::Int(v[row]),
            Self::Float32(v) => ColumnValue::Float(f64::from(v[row])),
            Self::Float64(v) => ColumnValue::Float(v[row]),
            Self::Bool(v) => ColumnValue::Bool(v[row]),
            Self::String(v) => ColumnValue::String(v[row].clone()),
            Self::FixedString { values, .. } => {
                let bytes = &values[row];
                let end = bytes.iter().rposition(|b| *b != 0).map_or(0, |p| p + 1);
                ColumnValue::String(String::from_utf8_lossy(&bytes[..end]).into_owned())
            }
        }
    }

    /// Appends a value, converting it exactly to the column type.
    ///
    /// Fails with `CannotConvertType` for NULL or for values that would lose
    /// information (out of range, fractional into integer, over-long fixed string).
    pub fn push_value(&mut self, value: &ColumnValue) -> Result<()> {
        match self {
            Self::UInt8(v) => v.push(
                exact_u64(value)
                    .and_then(|u| u8::try_from(u).ok())
                    .ok_or_else(|| cannot_convert(value, "UInt8"))?,
            ),
            Self::UInt16(v) => v.push(
                exact_u64(value)
                    .and_then(|u| u16::try_from(u).ok())
                    .ok_or_else(|| cannot_convert(value, "UInt16"))?,
            ),
            Self::UInt32(v) => v.push(
                exact_u64(value)
                    .and_then(|u| u32::try_from(u).ok())
                    .ok_or_else(|| cannot_convert(value, "UInt32"))?,
            ),
            Self::UInt64(v) => {
                v.push(exact_u64(value).ok_or_else(|| cannot_convert(value, "UInt64"))?);
            }
            Self::Int8(v) => v.push(
                exact_i64(value)
                    .and_then(|i| i8::try_from(i).ok())
                    .ok_or_else(|| cannot_convert(value, "Int8"))?,
            ),
            Self::Int16(v) => v.push(
                exact_i64(value)
                    .and_then(|i| i16::try_from(i).ok())
                    .ok_or_else(|| cannot_convert(value, "Int16"))?,
            ),
            Self::Int32(v) => v.push(
                exact_i64(value)
                    .and_then(|i| i32::try_from(i).ok())
                    .ok_or_else(|| cannot_convert(value, "Int32"))?,
            ),
            Self::Int64(v) => {
                v.push(exact_i64(value).ok_or_else(|| cannot_convert(value, "Int64"))?);
            }
            Self::Float32(v) => {
                v.push(exact_f32(value).ok_or_else(|| cannot_convert(value, "Float32"))?);
            }
            Self::Float64(v) => {
                v.push(exact_f64(value).ok_or_else(|| cannot_convert(value, "Float64"))?);
            }
            Self::Bool(v) => {
                v.push(exact_bool(value).ok_or_else(|| cannot_convert(value, "Bool"))?);
            }
            Self::String(v) => match value {
                ColumnValue::String(s) => v.push(s.clone()),
                _ => return Err(cannot_convert(value, "String")),
            },
            Self::FixedString { width, values } => match value {
                ColumnValue::String(s) if s.len() <= *width => {
                    let mut padded = s.as_bytes().to_vec();
                    padded.resize(*width, 0);
                    values.push(padded);
                }
                _ => return Err(cannot_convert(value, &format!("FixedString({width})"))),
            },
        }
        Ok(())
    }

    /// Appends the type's default value (zero, empty string, zero bytes).
    pub fn push_default(&mut self) {
        match self {
            Self::UInt8(v) => v.push(0),
            Self::UInt16(v) => v.push(0),
            Self::UInt32(v) => v.push(0),
            Self::UInt64(v) => v.push(0),
            Self::Int8(v) => v.push(0),
            Self::Int16(v) => v.push(0),
            Self::Int32(v) => v.push(0),
            Self::Int64(v) => v.push(0),
            Self::Float32(v) => v.push(0.0),
            Self::Float64(v) => v.push(0.0),
            Self::Bool(v) => v.push(false),
            Self::String(v) => v.push(String::new()),
            Self::FixedString { width, values } => values.push(vec![0; *width]),
        }
    }

    /// Appends every value of `other`.
    ///
    /// Same physical types are copied directly; otherwise values are converted one by one.
    pub fn extend_from(&mut self, other: &TypedColumn) -> Result<()> {
        match (&mut *self, other) {
            (Self::UInt8(a), Self::UInt8(b)) => a.extend_from_slice(b),
            (Self::UInt16(a), Self::UInt16(b)) => a.extend_from_slice(b),
            (Self::UInt32(a), Self::UInt32(b)) => a.extend_from_slice(b),
            (Self::UInt64(a), Self::UInt64(b)) => a.extend_from_slice(b),
            (Self::Int8(a), Self::Int8(b)) => a.extend_from_slice(b),
            (Self::Int16(a), Self::Int16(b)) => a.extend_from_slice(b),
            (Self::Int32(a), Self::Int32(b)) => a.extend_from_slice(b),
            (Self::Int64(a), Self::Int64(b)) => a.extend_from_slice(b),
            (Self::Float32(a), Self::Float32(b)) => a.extend_from_slice(b),
            (Self::Float64(a), Self::Float64(b)) => a.extend_from_slice(b),
            (Self::Bool(a), Self::Bool(b)) => a.extend_from_slice(b),
            (Self::String(a), Self::String(b)) => a.extend_from_slice(b),
            (
                Self::FixedString { width: wa, values: a },
                Self::FixedString { width: wb, values: b },
            ) if wa == wb => a.extend_from_slice(b),
            _ => {
                for row in 0..other.len() {
                    self.push_value(&other.value_at(row))?;
                }
            }
        }
        Ok(())
    }

    /// Keeps the rows whose mask entry is true.
    #[must_use]
    pub fn filter(&self, mask: &[bool]) -> Self {
        map_values!(self, |v| filter_vec(v, mask))
    }

    /// Builds a column with rows taken in `perm` order.
    #[must_use]
    pub fn permute(&self, perm: &[usize]) -> Self {
        map_values!(self, |v| permute_vec(v, perm))
    }

    /// Creates an empty column of the same physical type.
    #[must_use]
    pub fn clone_empty(&self) -> Self {
        map_values!(self, |_v| Vec::new())
    }

    /// Compares `self[row]` with `other[other_row]`.
    ///
    /// NaN sorts last when `nulls_last` is set. Different physical types fall back
    /// to value comparison.
    #[must_use]
    pub fn compare_at(
        &self,
        row: usize,
        other: &TypedColumn,
        other_row: usize,
        nulls_last: bool,
    ) -> Ordering {
        match (self, other) {
            (Self::UInt8(a), Self::UInt8(b)) => a[row].cmp(&b[other_row]),
            (Self::UInt16(a), Self::UInt16(b)) => a[row].cmp(&b[other_row]),
            (Self::UInt32(a), Self::UInt32(b)) => a[row].cmp(&b[other_row]),
            (Self::UInt64(a), Self::UInt64(b)) => a[row].cmp(&b[other_row]),
            (Self::Int8(a), Self::Int8(b)) => a[row].cmp(&b[other_row]),
            (Self::Int16(a), Self::Int16(b)) => a[row].cmp(&b[other_row]),
            (Self::Int32(a), Self::Int32(b)) => a[row].cmp(&b[other_row]),
            (Self::Int64(a), Self::Int64(b)) => a[row].cmp(&b[other_row]),
            (Self::Float32(a), Self::Float32(b)) => {
                compare_floats(f64::from(a[row]), f64::from(b[other_row]), nulls_last)
            }
            (Self::Float64(a), Self::Float64(b)) => {
                compare_floats(a[row], b[other_row], nulls_last)
            }
            (Self::Bool(a), Self::Bool(b)) => a[row].cmp(&b[other_row]),
            (Self::String(a), Self::String(b)) => a[row].cmp(&b[other_row]),
            (Self::FixedString { values: a, .. }, Self::FixedString { values: b, .. }) => {
                a[row].cmp(&b[other_row])
            }
            _ => self
                .value_at(row)
                .total_cmp(&other.value_at(other_row), nulls_last),
        }
    }

    /// Approximate memory footprint in bytes.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        match self {
            Self::String(v) => v.iter().map(|s| s.len() + std::mem::size_of::<u64>()).sum(),
            Self::FixedString { width, values } => width * values.len(),
            other => other.len() * other.key_width().unwrap_or(0),
        }
    }

    /// Writes the packed little-endian key bytes of `row` into `out`.
    ///
    /// Floats are keyed by bit pattern. `String` values are written raw, without length.
    pub fn write_key_bytes(&self, row: usize, out: &mut Vec<u8>) {
        match self {
            Self::UInt8(v) => out.push(v[row]),
            Self::UInt16(v) => out.extend_from_slice(&v[row].to_le_bytes()),
            Self::UInt32(v) => out.extend_from_slice(&v[row].to_le_bytes()),
            Self::UInt64(v) => out.extend_from_slice(&v[row].to_le_bytes()),
            Self::Int8(v) => out.extend_from_slice(&v[row].to_le_bytes()),
            Self::Int16(v) => out.extend_from_slice(&v[row].to_le_bytes()),
            Self::Int32(v) => out.extend_from_slice(&v[row].to_le_bytes()),
            Self::Int64(v) => out.extend_from_slice(&v[row].to_le_bytes()),
            Self::Float32(v) => out.extend_from_slice(&v[row].to_bits().to_le_bytes()),
            Self::Float64(v) => out.extend_from_slice(&v[row].to_bits().to_le_bytes()),
            Self::Bool(v) => out.push(u8::from(v[row])),
            Self::String(v) => out.extend_from_slice(v[row].as_bytes()),
            Self::FixedString { values, .. } => out.extend_from_slice(&values[row]),
        }
    }

    /// Returns the value at `row` zero-extended to 64 bits, for fixed keys up to 8 bytes.
    #[must_use]
    pub fn key_bits_at(&self, row: usize) -> Option<u64> {
        Some(match self {
            Self::UInt8(v) => u64::from(v[row]),
            Self::UInt16(v) => u64::from(v[row]),
            Self::UInt32(v) => u64::from(v[row]),
            Self::UInt64(v) => v[row],
            Self::Int8(v) => u64::from(v[row].to_le_bytes()[0]),
            Self::Int16(v) => u64::from(u16::from_le_bytes(v[row].to_le_bytes())),
            Self::Int32(v) => u64::from(u32::from_le_bytes(v[row].to_le_bytes())),
            Self::Int64(v) => u64::from_le_bytes(v[row].to_le_bytes()),
            Self::Float32(v) => u64::from(v[row].to_bits()),
            Self::Float64(v) => v[row].to_bits(),
            Self::Bool(v) => u64::from(v[row]),
            Self::String(_) | Self::FixedString { .. } => return None,
        })
    }

    /// Returns the raw bytes of a string value.
    #[must_use]
    pub fn bytes_at(&self, row: usize) -> Option<&[u8]> {
        match self {
            Self::String(v) => Some(v[row].as_bytes()),
            Self::FixedString { values, .. } => Some(&values[row]),
            _ => None,
        }
    }
}
