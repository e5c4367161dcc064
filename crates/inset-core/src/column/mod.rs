//! Columnar value access used by the set engine.
//!
//! A deliberately small column layer: typed vectors, a Nullable wrapper with a null
//! map, constant columns and dictionary-encoded (low cardinality) columns, plus the
//! handful of operations the IN-set needs (row access, comparison, filtering,
//! accurate casting and materialization).
//!
//! ```text
//! Block
//! └── ColumnWithTypeAndName { column, data_type, name }
//!     └── Column
//!         ├── Full(TypedColumn)
//!         ├── Nullable { nested: TypedColumn, null_map }
//!         ├── Const { value: Column (1 row), len }
//!         └── LowCardinality { dictionary: Column, indices }
//! ```

mod cast;
mod data_type;
mod typed;
mod value;

#[cfg(test)]
mod cast_tests;

use std::borrow::Cow;
use std::cmp::Ordering;

pub use cast::{cast_accurate, cast_accurate_or_null};
pub use data_type::DataType;
pub use typed::TypedColumn;
pub use value::ColumnValue;

use crate::error::{Error, Result};

/// A column of values, possibly wrapped.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Plain column without NULLs
    Full(TypedColumn),
    /// Nullable column: `null_map[i]` marks row `i` as NULL
    Nullable {
        /// Values (defaults at NULL rows)
        nested: TypedColumn,
        /// NULL flags, one per row
        null_map: Vec<bool>,
    },
    /// One value repeated `len` times
    Const {
        /// Single-row column holding the value
        value: Box<Column>,
        /// Logical row count
        len: usize,
    },
    /// Dictionary-encoded column
    LowCardinality {
        /// Distinct values
        dictionary: Box<Column>,
        /// Per-row position in `dictionary`
        indices: Vec<u32>,
    },
}

impl Column {
    /// Builds a column of `data_type` from values.
    pub fn from_values(data_type: &DataType, values: &[ColumnValue]) -> Result<Self> {
        let mut column = data_type.create_column();
        for value in values {
            column.push_value(value)?;
        }
        Ok(column)
    }

    /// Builds a constant column repeating `value` `len` times.
    pub fn constant(data_type: &DataType, value: &ColumnValue, len: usize) -> Result<Self> {
        let single = Self::from_values(data_type, std::slice::from_ref(value))?;
        Ok(Self::Const {
            value: Box::new(single),
            len,
        })
    }

    /// Builds a dictionary-encoded column.
    pub fn low_cardinality(dictionary: Column, indices: Vec<u32>) -> Result<Self> {
        let size = dictionary.len();
        if let Some(bad) = indices.iter().find(|i| **i as usize >= size) {
            return Err(Error::Logical(format!(
                "dictionary index {bad} out of range for dictionary of {size} values"
            )));
        }
        Ok(Self::LowCardinality {
            dictionary: Box::new(dictionary),
            indices,
        })
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Full(typed) => typed.len(),
            Self::Nullable { null_map, .. } => null_map.len(),
            Self::Const { len, .. } => *len,
            Self::LowCardinality { indices, .. } => indices.len(),
        }
    }

    /// Returns true if the column has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the column can hold NULLs.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        match self {
            Self::Full(_) => false,
            Self::Nullable { .. } => true,
            Self::Const { value, .. } => value.is_nullable(),
            Self::LowCardinality { dictionary, .. } => dictionary.is_nullable(),
        }
    }

    /// Returns true for constant columns.
    #[must_use]
    pub fn is_const(&self) -> bool {
        matches!(self, Self::Const { .. })
    }

    /// Returns true if row `row` is NULL.
    #[must_use]
    pub fn is_null_at(&self, row: usize) -> bool {
        match self {
            Self::Full(_) => false,
            Self::Nullable { null_map, .. } => null_map[row],
            Self::Const { value, .. } => value.is_null_at(0),
            Self::LowCardinality {
                dictionary,
                indices,
            } => dictionary.is_null_at(indices[row] as usize),
        }
    }

    /// Returns the value at `row`.
    #[must_use]
    pub fn value_at(&self, row: usize) -> ColumnValue {
        match self {
            Self::Full(typed) => typed.value_at(row),
            Self::Nullable { nested, null_map } => {
                if null_map[row] {
                    ColumnValue::Null
                } else {
                    nested.value_at(row)
                }
            }
            Self::Const { value, .. } => value.value_at(0),
            Self::LowCardinality {
                dictionary,
                indices,
            } => dictionary.value_at(indices[row] as usize),
        }
    }

    /// Returns the plain values of a full or nullable column.
    #[must_use]
    pub fn nested(&self) -> Option<&TypedColumn> {
        match self {
            Self::Full(typed) | Self::Nullable { nested: typed, .. } => Some(typed),
            _ => None,
        }
    }

    /// Returns the null map of a nullable column.
    #[must_use]
    pub fn null_map(&self) -> Option<&[bool]> {
        match self {
            Self::Nullable { null_map, .. } => Some(null_map),
            _ => None,
        }
    }

    /// Expands a constant column into a full one.
    #[must_use]
    pub fn convert_to_full_if_const(&self) -> Cow<'_, Column> {
        match self {
            Self::Const { value, len } => {
                let full = value.convert_to_full_if_low_cardinality();
                Cow::Owned(full.permute(&vec![0; *len]))
            }
            other => Cow::Borrowed(other),
        }
    }

    /// Expands a dictionary-encoded column into a full one.
    #[must_use]
    pub fn convert_to_full_if_low_cardinality(&self) -> Cow<'_, Column> {
        match self {
            Self::LowCardinality {
                dictionary,
                indices,
            } => {
                let positions: Vec<usize> = indices.iter().map(|i| *i as usize).collect();
                Cow::Owned(dictionary.materialize().permute(&positions))
            }
            other => Cow::Borrowed(other),
        }
    }

    /// Expands constant and dictionary-encoded columns; the result is `Full` or `Nullable`.
    #[must_use]
    pub fn materialize(&self) -> Cow<'_, Column> {
        match self {
            Self::Const { .. } => Cow::Owned(self.convert_to_full_if_const().into_owned()),
            Self::LowCardinality { .. } => {
                Cow::Owned(self.convert_to_full_if_low_cardinality().into_owned())
            }
            other => Cow::Borrowed(other),
        }
    }

    /// Keeps the rows whose mask entry is true.
    #[must_use]
    pub fn filter(&self, mask: &[bool]) -> Column {
        match self {
            Self::Full(typed) => Self::Full(typed.filter(mask)),
            Self::Nullable { nested, null_map } => Self::Nullable {
                nested: nested.filter(mask),
                null_map: null_map
                    .iter()
                    .zip(mask)
                    .filter(|(_, keep)| **keep)
                    .map(|(null, _)| *null)
                    .collect(),
            },
            other => other.materialize().filter(mask),
        }
    }

    /// Builds a column with rows taken in `perm` order.
    #[must_use]
    pub fn permute(&self, perm: &[usize]) -> Column {
        match self {
            Self::Full(typed) => Self::Full(typed.permute(perm)),
            Self::Nullable { nested, null_map } => Self::Nullable {
                nested: nested.permute(perm),
                null_map: perm.iter().map(|&i| null_map[i]).collect(),
            },
            other => other.materialize().permute(perm),
        }
    }

    /// Creates an empty full (or nullable) column of the same type.
    #[must_use]
    pub fn clone_empty(&self) -> Column {
        match self {
            Self::Full(typed) => Self::Full(typed.clone_empty()),
            Self::Nullable { nested, .. } => Self::Nullable {
                nested: nested.clone_empty(),
                null_map: Vec::new(),
            },
            Self::Const { value, .. } => value.clone_empty(),
            Self::LowCardinality { dictionary, .. } => dictionary.clone_empty(),
        }
    }

    /// Appends one value, converting it exactly to the column type.
    pub fn push_value(&mut self, value: &ColumnValue) -> Result<()> {
        match self {
            Self::Full(typed) => typed.push_value(value),
            Self::Nullable { nested, null_map } => {
                if value.is_null() {
                    nested.push_default();
                    null_map.push(true);
                } else {
                    nested.push_value(value)?;
                    null_map.push(false);
                }
                Ok(())
            }
            Self::Const { .. } | Self::LowCardinality { .. } => Err(Error::Logical(
                "cannot insert into a constant or dictionary-encoded column".to_string(),
            )),
        }
    }

    /// Appends the type's default (non-null) value.
    pub fn push_default(&mut self) -> Result<()> {
        match self {
            Self::Full(typed) => typed.push_default(),
            Self::Nullable { nested, null_map } => {
                nested.push_default();
                null_map.push(false);
            }
            Self::Const { .. } | Self::LowCardinality { .. } => {
                return Err(Error::Logical(
                    "cannot insert into a constant or dictionary-encoded column".to_string(),
                ))
            }
        }
        Ok(())
    }

    /// Appends every row of `other`.
    pub fn extend_from(&mut self, other: &Column) -> Result<()> {
        let other = other.materialize();
        match (&mut *self, other.as_ref()) {
            (Self::Full(a), Self::Full(b)) => a.extend_from(b),
            (
                Self::Nullable {
                    nested: a,
                    null_map: na,
                },
                Self::Nullable {
                    nested: b,
                    null_map: nb,
                },
            ) => {
                a.extend_from(b)?;
                na.extend_from_slice(nb);
                Ok(())
            }
            (
                Self::Nullable {
                    nested: a,
                    null_map: na,
                },
                Self::Full(b),
            ) => {
                a.extend_from(b)?;
                na.resize(na.len() + b.len(), false);
                Ok(())
            }
            (_, source) => {
                for row in 0..source.len() {
                    self.push_value(&source.value_at(row))?;
                }
                Ok(())
            }
        }
    }

    /// Compares `self[row]` with `other[other_row]`.
    ///
    /// NULL (and NaN) sort after every value when `nulls_last` is set, before otherwise.
    #[must_use]
    pub fn compare_at(
        &self,
        row: usize,
        other: &Column,
        other_row: usize,
        nulls_last: bool,
    ) -> Ordering {
        let null_side = if nulls_last {
            Ordering::Greater
        } else {
            Ordering::Less
        };
        match (self.is_null_at(row), other.is_null_at(other_row)) {
            (true, true) => return Ordering::Equal,
            (true, false) => return null_side,
            (false, true) => return null_side.reverse(),
            (false, false) => {}
        }
        match (self.nested(), other.nested()) {
            (Some(a), Some(b)) => a.compare_at(row, b, other_row, nulls_last),
            _ => self
                .value_at(row)
                .total_cmp(&other.value_at(other_row), nulls_last),
        }
    }

    /// Approximate memory footprint in bytes.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        match self {
            Self::Full(typed) => typed.byte_size(),
            Self::Nullable { nested, null_map } => nested.byte_size() + null_map.len(),
            Self::Const { value, .. } => value.byte_size(),
            Self::LowCardinality {
                dictionary,
                indices,
            } => dictionary.byte_size() + indices.len() * std::mem::size_of::<u32>(),
        }
    }

    /// Splits a column into its non-null values and its null map.
    #[must_use]
    pub fn into_nested_and_null_map(self) -> (Column, Option<Vec<bool>>) {
        match self {
            Self::Nullable { nested, null_map } => (Self::Full(nested), Some(null_map)),
            other => (other, None),
        }
    }
}

/// Strips Nullable wrappers from materialized key columns in place and returns the
/// combined null map: row `i` is marked when any key component is NULL.
///
/// Returns `None` when no column was nullable.
pub fn extract_nested_columns_and_null_map(columns: &mut [Column]) -> Option<Vec<bool>> {
    let mut combined: Option<Vec<bool>> = None;
    for column in columns.iter_mut() {
        if !matches!(column, Column::Nullable { .. }) {
            continue;
        }
        let taken = std::mem::replace(column, Column::Full(TypedColumn::UInt8(Vec::new())));
        let (nested, null_map) = taken.into_nested_and_null_map();
        *column = nested;
        if let Some(null_map) = null_map {
            match combined.as_mut() {
                None => combined = Some(null_map),
                Some(acc) => {
                    for (slot, null) in acc.iter_mut().zip(null_map) {
                        *slot |= null;
                    }
                }
            }
        }
    }
    combined
}

/// A column together with its logical type and name.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnWithTypeAndName {
    /// Column values
    pub column: Column,
    /// Logical type
    pub data_type: DataType,
    /// Column name
    pub name: String,
}

impl ColumnWithTypeAndName {
    /// Creates a named typed column.
    #[must_use]
    pub fn new(column: Column, data_type: DataType, name: impl Into<String>) -> Self {
        Self {
            column,
            data_type,
            name: name.into(),
        }
    }
}

/// An ordered list of equally long typed columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    columns: Vec<ColumnWithTypeAndName>,
}

impl Block {
    /// Creates a block from columns.
    #[must_use]
    pub fn new(columns: Vec<ColumnWithTypeAndName>) -> Self {
        Self { columns }
    }

    /// Creates a zero-row block describing a schema.
    #[must_use]
    pub fn header<S: AsRef<str>>(fields: &[(S, DataType)]) -> Self {
        Self::new(
            fields
                .iter()
                .map(|(name, data_type)| {
                    ColumnWithTypeAndName::new(
                        data_type.create_column(),
                        data_type.clone(),
                        name.as_ref(),
                    )
                })
                .collect(),
        )
    }

    /// Appends a column.
    pub fn insert(&mut self, column: ColumnWithTypeAndName) {
        self.columns.push(column);
    }

    /// Number of columns.
    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows (rows of the first column, 0 for an empty block).
    #[must_use]
    pub fn rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.column.len())
    }

    /// Returns all columns.
    #[must_use]
    pub fn columns(&self) -> &[ColumnWithTypeAndName] {
        &self.columns
    }

    /// Returns the column at `position`, failing with a logical error when out of range.
    pub fn safe_get_by_position(&self, position: usize) -> Result<&ColumnWithTypeAndName> {
        self.columns.get(position).ok_or_else(|| {
            Error::Logical(format!(
                "position {position} is out of bounds for block with {} columns",
                self.columns.len()
            ))
        })
    }

    /// Returns a zero-row block with the same names and types.
    #[must_use]
    pub fn clone_empty(&self) -> Self {
        Self::new(
            self.columns
                .iter()
                .map(|c| {
                    ColumnWithTypeAndName::new(
                        c.data_type.create_column(),
                        c.data_type.clone(),
                        c.name.clone(),
                    )
                })
                .collect(),
        )
    }

    /// Returns `(name, type)` pairs.
    #[must_use]
    pub fn schema(&self) -> Vec<(String, DataType)> {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.data_type.clone()))
            .collect()
    }

    /// Checks that every column has the same number of rows.
    pub fn check_number_of_rows(&self) -> Result<()> {
        let rows = self.rows();
        for c in &self.columns {
            if c.column.len() != rows {
                return Err(Error::Logical(format!(
                    "sizes of columns don't match: {} has {} rows, expected {rows}",
                    c.name,
                    c.column.len()
                )));
            }
        }
        Ok(())
    }
}
