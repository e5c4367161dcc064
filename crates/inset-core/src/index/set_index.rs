//! Sorted-tuple index over set elements, used for range pruning.

use std::cmp::Ordering;

use super::field_value::{compare, same_point, FieldValue};
use super::monotonic::{apply_monotonic_functions_chain_to_range, MonotonicFunctionsChain};
use super::range::{BoolMask, Range};
use crate::column::{Column, DataType};
use crate::error::{Error, Result};

/// Links set element column `tuple_index` to key column `key_index`.
#[derive(Debug, Clone)]
pub struct KeyTuplePositionMapping {
    /// Position in the set tuple
    pub tuple_index: usize,
    /// Position in the outer key
    pub key_index: usize,
    /// Transforms from the key column to the set column
    pub functions: MonotonicFunctionsChain,
}

impl KeyTuplePositionMapping {
    /// Direct mapping without transforms.
    #[must_use]
    pub fn new(tuple_index: usize, key_index: usize) -> Self {
        Self {
            tuple_index,
            key_index,
            functions: Vec::new(),
        }
    }

    /// Sets the transform chain.
    #[must_use]
    pub fn with_functions(mut self, functions: MonotonicFunctionsChain) -> Self {
        self.functions = functions;
        self
    }
}

/// Immutable, lexicographically sorted projection of set elements.
///
/// Column 0 is the primary sort key; NULLs sort last.
#[derive(Debug, Clone)]
pub struct RangeIndex {
    indexes_mapping: Vec<KeyTuplePositionMapping>,
    ordered_set: Vec<Column>,
}

impl RangeIndex {
    /// Builds the index.
    ///
    /// The mapping is sorted by `(key_index, tuple_index)` and only the first entry
    /// per `key_index` is kept.
    pub fn new(
        set_elements: &[Column],
        mut mapping: Vec<KeyTuplePositionMapping>,
    ) -> Result<Self> {
        mapping.sort_by(|l, r| (l.key_index, l.tuple_index).cmp(&(r.key_index, r.tuple_index)));
        mapping.dedup_by(|later, earlier| later.key_index == earlier.key_index);

        let mut columns = Vec::with_capacity(mapping.len());
        for entry in &mapping {
            let column = set_elements.get(entry.tuple_index).ok_or_else(|| {
                Error::Logical(format!(
                    "tuple index {} is out of range for {} set columns",
                    entry.tuple_index,
                    set_elements.len()
                ))
            })?;
            columns.push(column.materialize().into_owned());
        }

        let rows = columns.first().map_or(0, Column::len);
        if columns.iter().any(|c| c.len() != rows) {
            return Err(Error::Logical(
                "set element columns have different sizes".to_string(),
            ));
        }

        let mut permutation: Vec<usize> = (0..rows).collect();
        permutation.sort_by(|&a, &b| {
            columns
                .iter()
                .map(|c| c.compare_at(a, c, b, true))
                .find(|ord| ord.is_ne())
                .unwrap_or(Ordering::Equal)
        });
        let ordered_set: Vec<Column> = columns.iter().map(|c| c.permute(&permutation)).collect();

        tracing::debug!(
            tuple_size = mapping.len(),
            elements = rows,
            "set range index built"
        );
        Ok(Self {
            indexes_mapping: mapping,
            ordered_set,
        })
    }

    /// Number of indexed tuples.
    #[must_use]
    pub fn size(&self) -> usize {
        self.ordered_set.first().map_or(0, Column::len)
    }

    /// The deduplicated, sorted mapping.
    #[must_use]
    pub fn mapping(&self) -> &[KeyTuplePositionMapping] {
        &self.indexes_mapping
    }

    /// Returns true if any mapped column goes through a transform chain.
    #[must_use]
    pub fn has_monotonic_functions_chain(&self) -> bool {
        self.indexes_mapping.iter().any(|m| !m.functions.is_empty())
    }

    /// Checks whether the key hyperrectangle `key_ranges` can contain set tuples
    /// (`can_be_true`) and tuples outside the set (`can_be_false`).
    ///
    /// `key_ranges` and `data_types` are indexed by key position.
    pub fn check_in_range(&self, key_ranges: &[Range], data_types: &[DataType]) -> Result<BoolMask> {
        let tuple_size = self.indexes_mapping.len();
        if tuple_size == 0 {
            return Ok(BoolMask::UNKNOWN);
        }

        let mut left_point = vec![FieldValue::NegativeInfinity; tuple_size];
        let mut right_point = vec![FieldValue::PositiveInfinity; tuple_size];
        let mut left_included = true;
        let mut right_included = true;

        for (i, entry) in self.indexes_mapping.iter().enumerate() {
            let (Some(key_range), Some(key_type)) = (
                key_ranges.get(entry.key_index),
                data_types.get(entry.key_index),
            ) else {
                return Err(Error::Logical(format!(
                    "no range or type for key column {}",
                    entry.key_index
                )));
            };

            let Some(range) =
                apply_monotonic_functions_chain_to_range(key_range, &entry.functions, key_type)
            else {
                return Ok(BoolMask::UNKNOWN);
            };

            let template = &self.ordered_set[i];
            if left_point[i].update(&range.left, template).is_err()
                || right_point[i].update(&range.right, template).is_err()
            {
                return Ok(BoolMask::UNKNOWN);
            }
            left_included &= range.left_included;
            right_included &= range.right_included;
        }

        let size = self.size();
        let left_lower = self.lower_bound(&left_point);
        let right_lower = self.lower_bound(&right_point);

        let one_element_range = left_point
            .iter()
            .zip(&right_point)
            .all(|(l, r)| same_point(l, r));
        if one_element_range {
            if !left_included || !right_included {
                return Ok(BoolMask::new(false, true));
            }
            let found = left_lower != size && self.row_equals(left_lower, &left_point);
            return Ok(BoolMask::new(found, !found));
        }

        let right_matches = || {
            right_included && right_lower != size && self.row_equals(right_lower, &right_point)
        };

        if left_lower + 1 < right_lower {
            return Ok(BoolMask::new(true, true));
        }
        if left_lower + 1 == right_lower {
            if left_included || !self.row_equals(left_lower, &left_point) {
                return Ok(BoolMask::new(true, true));
            }
            return Ok(BoolMask::new(right_matches(), true));
        }
        Ok(BoolMask::new(right_matches(), true))
    }

    fn row_less(&self, row: usize, point: &[FieldValue]) -> bool {
        self.ordered_set
            .iter()
            .zip(point)
            .map(|(column, value)| compare(column, row, value))
            .find(|ord| ord.is_ne())
            .is_some_and(Ordering::is_lt)
    }

    fn row_equals(&self, row: usize, point: &[FieldValue]) -> bool {
        self.ordered_set
            .iter()
            .zip(point)
            .all(|(column, value)| compare(column, row, value).is_eq())
    }

    /// First row not less than `point`.
    fn lower_bound(&self, point: &[FieldValue]) -> usize {
        let (mut lo, mut hi) = (0, self.size());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.row_less(mid, point) {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }
}
