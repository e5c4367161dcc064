//! The IN-predicate set.
//!
//! A [`Set`] is a multi-column hash set built once from streamed blocks and then
//! probed by many threads. The whole structure sits behind one `parking_lot::RwLock`:
//! building takes the write lock, probing takes the read lock.
//!
//! # Lifecycle
//!
//! ```text
//! Set::new ─► set_header (once) ─► insert_from_block* ─► finish_insert ─► execute*
//!                                                      └► serialize ─► deserialize
//! ```
//!
//! # Wire layout
//!
//! ```text
//! [limits: bincode][fill_elements: 1B][transform_null_in: 1B]
//! [header schema: bincode Vec<(name, type)>]
//! [payload: count u64 LE + keys (absent for zero key columns)]
//! [built: 1B]
//! ```

mod arena;
mod codec;
mod key;
mod variants;

#[cfg(test)]
mod set_tests;

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

pub use variants::SetVariantKind;

use crate::column::{
    cast_accurate, cast_accurate_or_null, extract_nested_columns_and_null_map, Block, Column,
    ColumnWithTypeAndName, DataType,
};
use crate::config::{SetConfig, SizeLimits};
use crate::error::{Error, Result};
use crate::index::{KeyTuplePositionMapping, RangeIndex};
use key::KeyColumns;
use variants::SetVariants;

/// Label used in size-limit errors.
const SET_LIMIT_LABEL: &str = "IN-set";

#[derive(Debug, Default)]
struct SetData {
    /// Schema the header was set with.
    header: Vec<(String, DataType)>,
    /// Stored key types, dictionary encoding removed (and Nullable unless NULL is a value).
    data_types: Vec<DataType>,
    set_elements_types: Vec<DataType>,
    variants: Option<SetVariants>,
    set_elements: Vec<Column>,
    /// False once the element projection no longer mirrors the stored keys.
    elements_complete: bool,
}

impl SetData {
    fn total_row_count(&self) -> usize {
        self.variants.as_ref().map_or(0, SetVariants::len)
    }

    fn total_byte_count(&self) -> usize {
        self.variants.as_ref().map_or(0, SetVariants::byte_size)
    }
}

/// Multi-column IN-set.
#[derive(Debug)]
pub struct Set {
    limits: SizeLimits,
    fill_elements: bool,
    transform_null_in: bool,
    data: RwLock<SetData>,
    is_created: AtomicBool,
}

impl Set {
    /// Creates an empty set.
    ///
    /// `fill_elements` keeps a projection of distinct key components (required for
    /// [`Set::build_range_index`]). `transform_null_in` makes NULL an ordinary key value.
    #[must_use]
    pub fn new(limits: SizeLimits, fill_elements: bool, transform_null_in: bool) -> Self {
        Self {
            limits,
            fill_elements,
            transform_null_in,
            data: RwLock::new(SetData {
                elements_complete: true,
                ..SetData::default()
            }),
            is_created: AtomicBool::new(false),
        }
    }

    /// Creates an empty set from configuration.
    #[must_use]
    pub fn from_config(config: &SetConfig) -> Self {
        Self::new(
            config.limits,
            config.fill_elements,
            config.transform_null_in,
        )
    }

    /// Size-limit policy.
    #[must_use]
    pub fn limits(&self) -> SizeLimits {
        self.limits
    }

    /// Whether distinct key components are kept.
    #[must_use]
    pub fn fill_elements(&self) -> bool {
        self.fill_elements
    }

    /// Whether NULL is treated as an ordinary key value.
    #[must_use]
    pub fn transform_null_in(&self) -> bool {
        self.transform_null_in
    }

    /// Fixes the key schema and chooses the hash-table variant.
    ///
    /// Only the names and types of `header` are used. Does nothing once a variant
    /// has been chosen.
    pub fn set_header(&self, header: &Block) -> Result<()> {
        let mut data = self.data.write();
        if data.variants.is_some() {
            return Ok(());
        }

        let mut data_types = Vec::with_capacity(header.num_columns());
        for column in header.columns() {
            let mut data_type = column.data_type.remove_low_cardinality();
            if !self.transform_null_in {
                data_type = data_type.remove_nullable();
            }
            data_types.push(data_type);
        }

        let kind = SetVariantKind::choose(&data_types);
        if self.fill_elements {
            data.set_elements = data_types.iter().map(DataType::create_column).collect();
        }
        data.set_elements_types = data_types.clone();
        data.header = header.schema();
        data.variants = Some(SetVariants::new(kind));

        tracing::debug!(
            variant = kind.name(),
            keys = data_types.len(),
            transform_null_in = self.transform_null_in,
            "IN-set key variant chosen"
        );
        data.data_types = data_types;
        Ok(())
    }

    /// Inserts every key tuple of `block`.
    ///
    /// Returns `false` once the accumulated rows or bytes exceed the limits; the
    /// inserts of this call are kept. Use [`Set::check_limits`] to escalate.
    pub fn insert_from_block(&self, block: &Block) -> Result<bool> {
        let mut guard = self.data.write();
        let data = &mut *guard;
        let Some(variants) = data.variants.as_mut() else {
            return Err(Error::Logical(
                "Set::set_header must be called before Set::insert_from_block".to_string(),
            ));
        };

        let (columns, skip) = self.prepare_keys(block, &data.data_types)?;
        let keys = KeyColumns::new(&columns)?;
        let rows = keys.rows();

        let mut filter = vec![false; rows];
        let mut scratch = Vec::new();
        let mut inserted = 0usize;
        for (row, slot) in filter.iter_mut().enumerate() {
            if skip.as_ref().is_some_and(|m| m[row]) {
                continue;
            }
            *slot = variants.emplace(&keys, row, &mut scratch);
            inserted += usize::from(*slot);
        }

        // NULL components only survive here when their stored type is Nullable,
        // so new rows are appended with their real values.
        if self.fill_elements {
            for (element, column) in data.set_elements.iter_mut().zip(&columns) {
                element.extend_from(&column.filter(&filter))?;
            }
        }

        let total_rows = data.total_row_count() as u64;
        let total_bytes = data.total_byte_count() as u64;
        tracing::trace!(rows, inserted, total_rows, "IN-set block inserted");

        let within = self.limits.soft_check(total_rows, total_bytes);
        if !within {
            tracing::warn!(
                total_rows,
                total_bytes,
                max_rows = self.limits.max_rows,
                max_bytes = self.limits.max_bytes,
                "IN-set size limit exceeded"
            );
        }
        Ok(within)
    }

    /// Inserts the keys of `block` and marks the rows that added a new key.
    ///
    /// Unlike [`Set::insert_from_block`] the element projection is left alone and
    /// no limit is checked.
    pub fn mark_distinct_block(&self, block: &Block) -> Result<Vec<bool>> {
        let mut guard = self.data.write();
        let data = &mut *guard;
        let Some(variants) = data.variants.as_mut() else {
            return Err(Error::Logical(
                "Set::set_header must be called before Set::mark_distinct_block".to_string(),
            ));
        };

        let (columns, skip) = self.prepare_keys(block, &data.data_types)?;
        let keys = KeyColumns::new(&columns)?;

        let mut scratch = Vec::new();
        let mut result = vec![false; keys.rows()];
        for (row, slot) in result.iter_mut().enumerate() {
            if skip.as_ref().is_some_and(|m| m[row]) {
                continue;
            }
            *slot = variants.emplace(&keys, row, &mut scratch);
        }
        tracing::trace!(
            rows = result.len(),
            total_rows = variants.len(),
            "IN-set distinct rows marked"
        );
        Ok(result)
    }

    /// Tests every row of `block` for membership.
    ///
    /// Each result is `negative XOR found`. Rows with an unrepresentable or (unless
    /// NULL is a value) NULL key component are not found.
    pub fn execute(&self, block: &Block, negative: bool) -> Result<Vec<bool>> {
        let num_key_columns = block.num_columns();
        if num_key_columns == 0 {
            return Err(Error::Logical(
                "no columns passed to Set::execute".to_string(),
            ));
        }
        let rows = block.safe_get_by_position(0)?.column.len();
        if rows == 0 {
            return Ok(Vec::new());
        }

        let data = self.data.read();
        if data.data_types.is_empty() {
            return Ok(vec![negative; rows]);
        }
        check_columns_number(&data, num_key_columns)?;

        let mut columns = Vec::with_capacity(num_key_columns);
        for (i, stored) in data.data_types.iter().enumerate() {
            let source = block.safe_get_by_position(i)?;
            let source_nullable = source.data_type.remove_low_cardinality().is_nullable();
            let column = if !self.transform_null_in && stored.can_be_inside_nullable() {
                cast_accurate_or_null(source, stored)?
            } else if source_nullable && !stored.is_nullable() {
                cast_accurate(source, &DataType::nullable(stored.clone()))?
            } else {
                cast_accurate(source, stored)?
            };
            columns.push(column);
        }
        let skip = self.split_null_map(&mut columns, &data.data_types);

        let Some(variants) = data.variants.as_ref() else {
            return Ok(vec![negative; rows]);
        };
        let keys = KeyColumns::new(&columns)?;
        let mut scratch = Vec::new();
        Ok((0..keys.rows())
            .map(|row| {
                if skip.as_ref().is_some_and(|m| m[row]) {
                    negative
                } else {
                    negative ^ variants.find(&keys, row, &mut scratch)
                }
            })
            .collect())
    }

    /// Returns true if the set has no key columns (or no header has been set).
    ///
    /// A set with key columns but no rows is not empty; see [`Set::total_row_count`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match &self.data.read().variants {
            Some(variants) => variants.kind() == SetVariantKind::Empty,
            None => true,
        }
    }

    /// Chosen hash-table variant, `None` before the header is set.
    #[must_use]
    pub fn variant_kind(&self) -> Option<SetVariantKind> {
        self.data.read().variants.as_ref().map(SetVariants::kind)
    }

    /// Number of distinct stored keys.
    #[must_use]
    pub fn total_row_count(&self) -> usize {
        self.data.read().total_row_count()
    }

    /// Approximate memory held by the hash table.
    #[must_use]
    pub fn total_byte_count(&self) -> usize {
        self.data.read().total_byte_count()
    }

    /// Fails with `NumberOfColumnsDoesntMatch` unless the set has `num_key_columns` keys.
    pub fn check_columns_number(&self, num_key_columns: usize) -> Result<()> {
        check_columns_number(&self.data.read(), num_key_columns)
    }

    /// Compares a candidate type with stored key type `set_type_idx`, ignoring
    /// Nullable and dictionary encoding.
    #[must_use]
    pub fn are_types_equal(&self, set_type_idx: usize, other_type: &DataType) -> bool {
        self.data
            .read()
            .data_types
            .get(set_type_idx)
            .is_some_and(|stored| normalized(stored) == normalized(other_type))
    }

    /// Like [`Set::are_types_equal`] but fails with `TypeMismatch`.
    pub fn check_types_equal(&self, set_type_idx: usize, other_type: &DataType) -> Result<()> {
        let data = self.data.read();
        let stored = data.data_types.get(set_type_idx).ok_or_else(|| {
            Error::Logical(format!(
                "set has no column {set_type_idx}, it has {} columns",
                data.data_types.len()
            ))
        })?;
        if normalized(stored) == normalized(other_type) {
            return Ok(());
        }
        Err(Error::TypeMismatch {
            column: set_type_idx + 1,
            left: other_type.name(),
            right: stored.name(),
        })
    }

    /// Marks the set as fully built.
    pub fn finish_insert(&self) {
        self.is_created.store(true, Ordering::Release);
    }

    /// Returns true once [`Set::finish_insert`] has been called.
    #[must_use]
    pub fn is_created(&self) -> bool {
        self.is_created.load(Ordering::Acquire)
    }

    /// Distinct key components accepted so far, one column per key.
    #[must_use]
    pub fn get_set_elements(&self) -> Vec<Column> {
        self.data.read().set_elements.clone()
    }

    /// Types of the element columns.
    #[must_use]
    pub fn get_elements_types(&self) -> Vec<DataType> {
        self.data.read().set_elements_types.clone()
    }

    /// Returns true if the element projection is available.
    #[must_use]
    pub fn has_explicit_set_elements(&self) -> bool {
        self.fill_elements && self.data.read().elements_complete
    }

    /// Stored key types.
    #[must_use]
    pub fn get_data_types(&self) -> Vec<DataType> {
        self.data.read().data_types.clone()
    }

    /// Escalating size check over the current totals (see [`SizeLimits::check`]).
    pub fn check_limits(&self) -> Result<bool> {
        let data = self.data.read();
        self.limits.check(
            data.total_row_count() as u64,
            data.total_byte_count() as u64,
            SET_LIMIT_LABEL,
        )
    }

    /// Builds a range index over the element projection.
    pub fn build_range_index(&self, mapping: Vec<KeyTuplePositionMapping>) -> Result<RangeIndex> {
        let data = self.data.read();
        if !self.fill_elements || !data.elements_complete {
            return Err(Error::Logical(
                "set elements are not available for building a range index".to_string(),
            ));
        }
        RangeIndex::new(&data.set_elements, mapping)
    }

    /// Writes the whole set.
    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        let data = self.data.read();
        codec::write_bincode(writer, &self.limits)?;
        codec::write_bool(writer, self.fill_elements)?;
        codec::write_bool(writer, self.transform_null_in)?;
        codec::write_bincode(writer, &data.header)?;
        if let Some(variants) = &data.variants {
            variants.write(writer)?;
        }
        codec::write_bool(writer, self.is_created())?;

        tracing::debug!(
            keys = data.total_row_count(),
            columns = data.header.len(),
            "IN-set serialized"
        );
        Ok(())
    }

    /// Reads a set written by [`Set::serialize`].
    ///
    /// The element projection is not part of the payload: a non-empty set read with
    /// `fill_elements` reports no explicit elements.
    pub fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        let limits: SizeLimits = codec::read_bincode(reader)?;
        let fill_elements = codec::read_bool(reader)?;
        let transform_null_in = codec::read_bool(reader)?;
        let set = Self::new(limits, fill_elements, transform_null_in);

        let header: Vec<(String, DataType)> = codec::read_bincode(reader)?;
        set.set_header(&Block::header(&header))?;
        {
            let mut data = set.data.write();
            let kind = data
                .variants
                .as_ref()
                .map_or(SetVariantKind::Empty, SetVariants::kind);
            let variants = SetVariants::read(kind, reader)?;
            if fill_elements && !variants.is_empty() {
                data.elements_complete = false;
            }
            tracing::debug!(
                variant = kind.name(),
                keys = variants.len(),
                "IN-set deserialized"
            );
            data.variants = Some(variants);
        }
        if codec::read_bool(reader)? {
            set.finish_insert();
        }
        Ok(set)
    }

    /// Materializes and conforms the key columns of `block` to the stored types.
    /// Returns the columns and the rows to skip.
    fn prepare_keys(
        &self,
        block: &Block,
        data_types: &[DataType],
    ) -> Result<(Vec<Column>, Option<Vec<bool>>)> {
        let mut columns = Vec::with_capacity(data_types.len());
        for (i, stored) in data_types.iter().enumerate() {
            columns.push(conform_column(block.safe_get_by_position(i)?, stored)?);
        }
        let skip = self.split_null_map(&mut columns, data_types);
        Ok((columns, skip))
    }

    /// Strips Nullable wrappers that cannot be stored and returns the rows whose key
    /// holds such a NULL. Without `transform_null_in` that is every NULL.
    fn split_null_map(&self, columns: &mut [Column], data_types: &[DataType]) -> Option<Vec<bool>> {
        if !self.transform_null_in {
            return extract_nested_columns_and_null_map(columns);
        }

        let mut skip: Option<Vec<bool>> = None;
        for (column, stored) in columns.iter_mut().zip(data_types) {
            if stored.is_nullable() || !column.is_nullable() {
                continue;
            }
            let taken = std::mem::replace(column, stored.create_column());
            let (nested, null_map) = taken.into_nested_and_null_map();
            *column = nested;
            if let Some(null_map) = null_map {
                match skip.as_mut() {
                    None => skip = Some(null_map),
                    Some(acc) => acc.iter_mut().zip(null_map).for_each(|(a, n)| *a |= n),
                }
            }
        }
        skip
    }
}

fn check_columns_number(data: &SetData, num_key_columns: usize) -> Result<()> {
    if data.data_types.len() != num_key_columns {
        return Err(Error::NumberOfColumnsDoesntMatch {
            left: num_key_columns,
            right: data.data_types.len(),
        });
    }
    Ok(())
}

fn normalized(data_type: &DataType) -> DataType {
    data_type.remove_low_cardinality().remove_nullable()
}

/// Materializes a build-side column and casts it to the stored type when the
/// physical types differ. Nullability of the source is kept.
fn conform_column(source: &ColumnWithTypeAndName, stored: &DataType) -> Result<Column> {
    let source_type = source.data_type.remove_low_cardinality();
    if source_type.remove_nullable() == stored.remove_nullable() {
        return Ok(source.column.materialize().into_owned());
    }
    let target = if source_type.is_nullable() && !stored.is_nullable() {
        DataType::nullable(stored.clone())
    } else {
        stored.clone()
    };
    cast_accurate(source, &target)
}
