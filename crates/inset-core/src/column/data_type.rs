//! Logical column types.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Column, TypedColumn};

/// Logical type of a key column.
///
/// `Date` is stored as days since epoch (`u16`) and `DateTime` as seconds since
/// epoch (`u32`); both compare and hash as their unsigned representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// 8-bit unsigned integer
    UInt8,
    /// 16-bit unsigned integer
    UInt16,
    /// 32-bit unsigned integer
    UInt32,
    /// 64-bit unsigned integer
    UInt64,
    /// 8-bit signed integer
    Int8,
    /// 16-bit signed integer
    Int16,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 32-bit floating point
    Float32,
    /// 64-bit floating point
    Float64,
    /// Boolean
    Bool,
    /// Days since epoch
    Date,
    /// Seconds since epoch
    DateTime,
    /// Variable-length string
    String,
    /// Fixed-length byte string
    FixedString(usize),
    /// Nullable wrapper
    Nullable(Box<DataType>),
    /// Dictionary-encoded wrapper
    LowCardinality(Box<DataType>),
}

impl DataType {
    /// Wraps a type into `Nullable`.
    #[must_use]
    pub fn nullable(inner: DataType) -> Self {
        Self::Nullable(Box::new(inner))
    }

    /// Wraps a type into `LowCardinality`.
    #[must_use]
    pub fn low_cardinality(inner: DataType) -> Self {
        Self::LowCardinality(Box::new(inner))
    }

    /// Returns the display name, e.g. `Nullable(UInt32)`.
    #[must_use]
    pub fn name(&self) -> String {
        self.to_string()
    }

    /// Returns true for a top-level `Nullable` type.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        matches!(self, Self::Nullable(_))
    }

    /// Returns true for a top-level `LowCardinality` type.
    #[must_use]
    pub fn is_low_cardinality(&self) -> bool {
        matches!(self, Self::LowCardinality(_))
    }

    /// Strips one top-level `Nullable` wrapper.
    #[must_use]
    pub fn remove_nullable(&self) -> DataType {
        match self {
            Self::Nullable(inner) => inner.as_ref().clone(),
            other => other.clone(),
        }
    }

    /// Strips `LowCardinality` wrappers at any depth.
    #[must_use]
    pub fn remove_low_cardinality(&self) -> DataType {
        match self {
            Self::LowCardinality(inner) => inner.remove_low_cardinality(),
            Self::Nullable(inner) => Self::nullable(inner.remove_low_cardinality()),
            other => other.clone(),
        }
    }

    /// Returns true if the type can be wrapped into `Nullable`.
    #[must_use]
    pub fn can_be_inside_nullable(&self) -> bool {
        !matches!(self, Self::Nullable(_) | Self::LowCardinality(_))
    }

    /// Returns true for number-like types whose value is its own key.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.value_width().is_some()
    }

    /// Width in bytes of a number-like value, `None` for strings and wrappers.
    #[must_use]
    pub fn value_width(&self) -> Option<usize> {
        match self {
            Self::UInt8 | Self::Int8 | Self::Bool => Some(1),
            Self::UInt16 | Self::Int16 | Self::Date => Some(2),
            Self::UInt32 | Self::Int32 | Self::Float32 | Self::DateTime => Some(4),
            Self::UInt64 | Self::Int64 | Self::Float64 => Some(8),
            _ => None,
        }
    }

    /// Width in bytes when every value occupies the same contiguous size.
    #[must_use]
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            Self::FixedString(n) => Some(*n),
            other => other.value_width(),
        }
    }

    /// Creates an empty column for this type.
    ///
    /// `LowCardinality` types produce their materialized dictionary representation.
    #[must_use]
    pub fn create_column(&self) -> Column {
        match self {
            Self::Nullable(inner) => Column::Nullable {
                nested: TypedColumn::empty(&inner.remove_low_cardinality()),
                null_map: Vec::new(),
            },
            Self::LowCardinality(inner) => inner.create_column(),
            other => Column::Full(TypedColumn::empty(other)),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UInt8 => f.write_str("UInt8"),
            Self::UInt16 => f.write_str("UInt16"),
            Self::UInt32 => f.write_str("UInt32"),
            Self::UInt64 => f.write_str("UInt64"),
            Self::Int8 => f.write_str("Int8"),
            Self::Int16 => f.write_str("Int16"),
            Self::Int32 => f.write_str("Int32"),
            Self::Int64 => f.write_str("Int64"),
            Self::Float32 => f.write_str("Float32"),
            Self::Float64 => f.write_str("Float64"),
            Self::Bool => f.write_str("Bool"),
            Self::Date => f.write_str("Date"),
            Self::DateTime => f.write_str("DateTime"),
            Self::String => f.write_str("String"),
            Self::FixedString(n) => write!(f, "FixedString({n})"),
            Self::Nullable(inner) => write!(f, "Nullable({inner})"),
            Self::LowCardinality(inner) => write!(f, "LowCardinality({inner})"),
        }
    }
}
