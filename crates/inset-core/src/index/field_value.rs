//! Bound points compared against sorted element columns.

use std::cmp::Ordering;

use super::range::Bound;
use crate::column::Column;
use crate::error::Result;

/// One component of a search point.
///
/// A concrete value is held as a one-row column of the element column's type so
/// the column comparator can be reused.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Below every value
    NegativeInfinity,
    /// Above every value (and equal to NULL)
    PositiveInfinity,
    /// One-row column
    Value(Column),
}

impl FieldValue {
    /// Replaces the held value with `bound`, typed like `template`.
    ///
    /// Fails when the value cannot be represented exactly in the column type.
    pub fn update(&mut self, bound: &Bound, template: &Column) -> Result<()> {
        *self = match bound {
            Bound::NegativeInfinity => Self::NegativeInfinity,
            Bound::PositiveInfinity => Self::PositiveInfinity,
            Bound::Value(value) => {
                let mut column = template.clone_empty();
                column.push_value(value)?;
                Self::Value(column)
            }
        };
        Ok(())
    }

    /// Returns true for a concrete value.
    #[must_use]
    pub fn is_normal(&self) -> bool {
        matches!(self, Self::Value(_))
    }
}

/// Compares `column[row]` with `value`. NULL rows sort last and are equal to `+inf`.
#[must_use]
pub fn compare(column: &Column, row: usize, value: &FieldValue) -> Ordering {
    match value {
        FieldValue::NegativeInfinity => Ordering::Greater,
        FieldValue::PositiveInfinity => {
            if column.is_null_at(row) {
                Ordering::Equal
            } else {
                Ordering::Less
            }
        }
        FieldValue::Value(single) => column.compare_at(row, single, 0, true),
    }
}

/// Returns true if two point components denote the same single point.
#[must_use]
pub(crate) fn same_point(left: &FieldValue, right: &FieldValue) -> bool {
    match (left, right) {
        (FieldValue::Value(l), FieldValue::Value(r)) => l.compare_at(0, r, 0, true).is_eq(),
        (FieldValue::PositiveInfinity, FieldValue::PositiveInfinity)
        | (FieldValue::NegativeInfinity, FieldValue::NegativeInfinity) => true,
        _ => false,
    }
}
