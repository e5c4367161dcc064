//! Key extraction from materialized key columns.
//!
//! Packed layouts (little-endian):
//!
//! ```text
//! fixed:       [null bitmap: ceil(n/8) bytes, only if nullable][key 0][key 1]...  zero padded
//! serialized:  per column [null flag: 1B] then, if not null,
//!              fixed-width key bytes or [len: u64][utf-8 bytes]
//! ```

use crate::column::{Column, TypedColumn};
use crate::error::{Error, Result};

/// Borrowed view over the key columns of one block.
#[derive(Debug)]
pub(crate) struct KeyColumns<'a> {
    columns: Vec<&'a TypedColumn>,
    null_maps: Vec<Option<&'a [bool]>>,
    rows: usize,
}

impl<'a> KeyColumns<'a> {
    /// Wraps materialized (full or nullable) columns.
    pub(crate) fn new(columns: &'a [Column]) -> Result<Self> {
        let mut typed = Vec::with_capacity(columns.len());
        let mut null_maps = Vec::with_capacity(columns.len());
        for column in columns {
            let nested = column.nested().ok_or_else(|| {
                Error::Logical("key columns must be materialized before hashing".to_string())
            })?;
            typed.push(nested);
            null_maps.push(column.null_map());
        }
        let rows = typed.first().map_or(0, |c| c.len());
        if typed.iter().any(|c| c.len() != rows) {
            return Err(Error::Logical("key columns have different sizes".to_string()));
        }
        Ok(Self {
            columns: typed,
            null_maps,
            rows,
        })
    }

    pub(crate) fn rows(&self) -> usize {
        self.rows
    }

    fn is_null(&self, column: usize, row: usize) -> bool {
        self.null_maps[column].is_some_and(|m| m[row])
    }

    /// Value of the single key column as zero-extended bits.
    pub(crate) fn single_bits(&self, row: usize) -> u64 {
        self.columns[0].key_bits_at(row).unwrap_or_default()
    }

    /// Bytes of the single string key column.
    pub(crate) fn single_bytes(&self, row: usize) -> &'a [u8] {
        let column: &'a TypedColumn = self.columns[0];
        column.bytes_at(row).unwrap_or_default()
    }

    /// Packs all fixed-width components of `row` into `out`.
    pub(crate) fn pack_fixed(&self, row: usize, null_bitmap: bool, out: &mut Vec<u8>) {
        out.clear();
        if null_bitmap {
            out.resize(self.columns.len().div_ceil(8), 0);
            for i in 0..self.columns.len() {
                if self.is_null(i, row) {
                    out[i / 8] |= 1 << (i % 8);
                }
            }
        }
        for (i, column) in self.columns.iter().enumerate() {
            if self.is_null(i, row) {
                out.resize(out.len() + column.key_width().unwrap_or(0), 0);
            } else {
                column.write_key_bytes(row, out);
            }
        }
    }

    /// Packs `row` into a 128-bit key.
    pub(crate) fn packed128(&self, row: usize, null_bitmap: bool, scratch: &mut Vec<u8>) -> u128 {
        self.pack_fixed(row, null_bitmap, scratch);
        let mut bytes = [0u8; 16];
        let n = scratch.len().min(bytes.len());
        bytes[..n].copy_from_slice(&scratch[..n]);
        u128::from_le_bytes(bytes)
    }

    /// Packs `row` into a 256-bit key.
    pub(crate) fn packed256(
        &self,
        row: usize,
        null_bitmap: bool,
        scratch: &mut Vec<u8>,
    ) -> [u8; 32] {
        self.pack_fixed(row, null_bitmap, scratch);
        let mut bytes = [0u8; 32];
        let n = scratch.len().min(bytes.len());
        bytes[..n].copy_from_slice(&scratch[..n]);
        bytes
    }

    /// Serializes the whole tuple of `row` into `out`.
    pub(crate) fn serialize_row(&self, row: usize, out: &mut Vec<u8>) {
        out.clear();
        for (i, column) in self.columns.iter().enumerate() {
            if self.is_null(i, row) {
                out.push(1);
                continue;
            }
            out.push(0);
            if let TypedColumn::String(values) = column {
                out.extend_from_slice(&(values[row].len() as u64).to_le_bytes());
            }
            column.write_key_bytes(row, out);
        }
    }
}

/// Total packed width of fixed-width key types, including the null bitmap.
pub(crate) fn packed_width(widths: &[usize], null_bitmap: bool) -> usize {
    let bitmap = if null_bitmap {
        widths.len().div_ceil(8)
    } else {
        0
    };
    bitmap + widths.iter().sum::<usize>()
}
