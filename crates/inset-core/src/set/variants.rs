//! Hash-table strategies for IN-set keys and the selector that picks one.
//!
//! The strategy is a pure function of the key types and is fixed when the set header
//! is set:
//!
//! | keys                                         | variant      |
//! |----------------------------------------------|--------------|
//! | none                                         | `Empty`      |
//! | one non-nullable number of 1/2/4/8 bytes     | `Key8..64`   |
//! | fixed-width keys packing into <= 16 bytes    | `Keys128`    |
//! | fixed-width keys packing into <= 32 bytes    | `Keys256`    |
//! | one non-nullable `String`/`FixedString`      | `KeyString`  |
//! | anything else                                | `Serialized` |
//!
//! Nullable components add a leading null bitmap to packed keys.

use std::hash::{Hash, Hasher};
use std::io::{Read, Write};
use std::mem::size_of;

use rustc_hash::{FxHashMap, FxHashSet, FxHasher};
use smallvec::SmallVec;

use super::arena::{Arena, ArenaRef};
use super::codec;
use super::key::{packed_width, KeyColumns};
use crate::column::DataType;
use crate::error::{Error, Result};

/// Initial capacity cap used while reading a payload, so a corrupted count
/// cannot trigger a huge allocation.
const MAX_PREALLOCATED_KEYS: usize = 1 << 16;

/// Hash-table strategy identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetVariantKind {
    /// Zero key columns
    Empty,
    /// One 1-byte key
    Key8,
    /// One 2-byte key
    Key16,
    /// One 4-byte key
    Key32,
    /// One 8-byte key
    Key64,
    /// Fixed-width keys packed into 128 bits
    Keys128 {
        /// Packed key starts with a null bitmap
        null_bitmap: bool,
    },
    /// Fixed-width keys packed into 256 bits
    Keys256 {
        /// Packed key starts with a null bitmap
        null_bitmap: bool,
    },
    /// One string key
    KeyString,
    /// Whole tuple serialized into arena bytes
    Serialized,
}

impl SetVariantKind {
    /// Picks the strategy for the given key types.
    ///
    /// Nullable types are expected only when NULL is stored as a regular key value.
    #[must_use]
    pub fn choose(types: &[DataType]) -> Self {
        if types.is_empty() {
            return Self::Empty;
        }

        let null_bitmap = types.iter().any(DataType::is_nullable);
        let nested: Vec<DataType> = types
            .iter()
            .map(|t| t.remove_low_cardinality().remove_nullable())
            .collect();

        if !null_bitmap && nested.len() == 1 {
            match nested[0].value_width() {
                Some(1) => return Self::Key8,
                Some(2) => return Self::Key16,
                Some(4) => return Self::Key32,
                Some(8) => return Self::Key64,
                _ => {}
            }
        }

        let widths: Option<Vec<usize>> = nested.iter().map(DataType::fixed_width).collect();
        if let Some(widths) = widths {
            let total = packed_width(&widths, null_bitmap);
            if total <= 16 {
                return Self::Keys128 { null_bitmap };
            }
            if total <= 32 {
                return Self::Keys256 { null_bitmap };
            }
        }

        if !null_bitmap
            && nested.len() == 1
            && matches!(nested[0], DataType::String | DataType::FixedString(_))
        {
            return Self::KeyString;
        }

        Self::Serialized
    }

    /// Short name used in logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Key8 => "key8",
            Self::Key16 => "key16",
            Self::Key32 => "key32",
            Self::Key64 => "key64",
            Self::Keys128 { null_bitmap: false } => "keys128",
            Self::Keys128 { null_bitmap: true } => "nullable_keys128",
            Self::Keys256 { null_bitmap: false } => "keys256",
            Self::Keys256 { null_bitmap: true } => "nullable_keys256",
            Self::KeyString => "key_string",
            Self::Serialized => "serialized",
        }
    }
}

fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = FxHasher::default();
    bytes.hash(&mut hasher);
    hasher.finish()
}

/// Set of byte strings stored in an arena, bucketed by hash.
#[derive(Debug, Default)]
pub(crate) struct ByteKeySet {
    arena: Arena,
    buckets: FxHashMap<u64, SmallVec<[ArenaRef; 1]>>,
    len: usize,
}

impl ByteKeySet {
    /// Inserts `key`; returns true if it was not present.
    pub(crate) fn insert(&mut self, key: &[u8]) -> bool {
        let bucket = self.buckets.entry(hash_bytes(key)).or_default();
        if bucket.iter().any(|r| r.len() == key.len() && self.arena.get(*r) == key) {
            return false;
        }
        bucket.push(self.arena.alloc(key));
        self.len += 1;
        true
    }

    pub(crate) fn contains(&self, key: &[u8]) -> bool {
        self.buckets
            .get(&hash_bytes(key))
            .is_some_and(|bucket| bucket.iter().any(|r| self.arena.get(*r) == key))
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.buckets
            .values()
            .flat_map(|bucket| bucket.iter())
            .map(|r| self.arena.get(*r))
    }

    fn byte_size(&self) -> usize {
        self.arena.allocated_bytes()
            + self.buckets.capacity()
                * (size_of::<u64>() + size_of::<SmallVec<[ArenaRef; 1]>>() + 1)
    }
}

fn set_byte_size<T>(set: &FxHashSet<T>) -> usize {
    set.capacity() * (size_of::<T>() + 1)
}

/// One concrete hash table, chosen once per set.
#[derive(Debug)]
pub(crate) enum SetVariants {
    /// No key columns
    Empty,
    /// One 1-byte key
    Key8(FxHashSet<u8>),
    /// One 2-byte key
    Key16(FxHashSet<u16>),
    /// One 4-byte key
    Key32(FxHashSet<u32>),
    /// One 8-byte key
    Key64(FxHashSet<u64>),
    /// Packed fixed keys up to 16 bytes
    Keys128 {
        /// Packed key starts with a null bitmap
        null_bitmap: bool,
        /// Stored keys
        keys: FxHashSet<u128>,
    },
    /// Packed fixed keys up to 32 bytes
    Keys256 {
        /// Packed key starts with a null bitmap
        null_bitmap: bool,
        /// Stored keys
        keys: FxHashSet<[u8; 32]>,
    },
    /// One string key
    KeyString(ByteKeySet),
    /// Serialized tuples
    Serialized(ByteKeySet),
}

impl SetVariants {
    /// Creates an empty table of the given kind.
    #[must_use]
    pub fn new(kind: SetVariantKind) -> Self {
        match kind {
            SetVariantKind::Empty => Self::Empty,
            SetVariantKind::Key8 => Self::Key8(FxHashSet::default()),
            SetVariantKind::Key16 => Self::Key16(FxHashSet::default()),
            SetVariantKind::Key32 => Self::Key32(FxHashSet::default()),
            SetVariantKind::Key64 => Self::Key64(FxHashSet::default()),
            SetVariantKind::Keys128 { null_bitmap } => Self::Keys128 {
                null_bitmap,
                keys: FxHashSet::default(),
            },
            SetVariantKind::Keys256 { null_bitmap } => Self::Keys256 {
                null_bitmap,
                keys: FxHashSet::default(),
            },
            SetVariantKind::KeyString => Self::KeyString(ByteKeySet::default()),
            SetVariantKind::Serialized => Self::Serialized(ByteKeySet::default()),
        }
    }

    /// Strategy of this table.
    #[must_use]
    pub fn kind(&self) -> SetVariantKind {
        match self {
            Self::Empty => SetVariantKind::Empty,
            Self::Key8(_) => SetVariantKind::Key8,
            Self::Key16(_) => SetVariantKind::Key16,
            Self::Key32(_) => SetVariantKind::Key32,
            Self::Key64(_) => SetVariantKind::Key64,
            Self::Keys128 { null_bitmap, .. } => SetVariantKind::Keys128 {
                null_bitmap: *null_bitmap,
            },
            Self::Keys256 { null_bitmap, .. } => SetVariantKind::Keys256 {
                null_bitmap: *null_bitmap,
            },
            Self::KeyString(_) => SetVariantKind::KeyString,
            Self::Serialized(_) => SetVariantKind::Serialized,
        }
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Key8(set) => set.len(),
            Self::Key16(set) => set.len(),
            Self::Key32(set) => set.len(),
            Self::Key64(set) => set.len(),
            Self::Keys128 { keys, .. } => keys.len(),
            Self::Keys256 { keys, .. } => keys.len(),
            Self::KeyString(set) | Self::Serialized(set) => set.len(),
        }
    }

    /// Returns true if no key is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Approximate memory held by the table, arena included.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Key8(set) => set_byte_size(set),
            Self::Key16(set) => set_byte_size(set),
            Self::Key32(set) => set_byte_size(set),
            Self::Key64(set) => set_byte_size(set),
            Self::Keys128 { keys, .. } => set_byte_size(keys),
            Self::Keys256 { keys, .. } => set_byte_size(keys),
            Self::KeyString(set) | Self::Serialized(set) => set.byte_size(),
        }
    }

    /// Inserts the key of `row`; returns true if it was not present.
    // Reason: single numeric keys are zero-extended, truncation restores the original width.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn emplace(
        &mut self,
        keys: &KeyColumns<'_>,
        row: usize,
        scratch: &mut Vec<u8>,
    ) -> bool {
        match self {
            Self::Empty => false,
            Self::Key8(set) => set.insert(keys.single_bits(row) as u8),
            Self::Key16(set) => set.insert(keys.single_bits(row) as u16),
            Self::Key32(set) => set.insert(keys.single_bits(row) as u32),
            Self::Key64(set) => set.insert(keys.single_bits(row)),
            Self::Keys128 { null_bitmap, keys: set } => {
                set.insert(keys.packed128(row, *null_bitmap, scratch))
            }
            Self::Keys256 { null_bitmap, keys: set } => {
                set.insert(keys.packed256(row, *null_bitmap, scratch))
            }
            Self::KeyString(set) => set.insert(keys.single_bytes(row)),
            Self::Serialized(set) => {
                keys.serialize_row(row, scratch);
                set.insert(scratch)
            }
        }
    }

    /// Returns true if the key of `row` is stored.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn find(&self, keys: &KeyColumns<'_>, row: usize, scratch: &mut Vec<u8>) -> bool {
        match self {
            Self::Empty => false,
            Self::Key8(set) => set.contains(&(keys.single_bits(row) as u8)),
            Self::Key16(set) => set.contains(&(keys.single_bits(row) as u16)),
            Self::Key32(set) => set.contains(&(keys.single_bits(row) as u32)),
            Self::Key64(set) => set.contains(&keys.single_bits(row)),
            Self::Keys128 { null_bitmap, keys: set } => {
                set.contains(&keys.packed128(row, *null_bitmap, scratch))
            }
            Self::Keys256 { null_bitmap, keys: set } => {
                set.contains(&keys.packed256(row, *null_bitmap, scratch))
            }
            Self::KeyString(set) => set.contains(keys.single_bytes(row)),
            Self::Serialized(set) => {
                keys.serialize_row(row, scratch);
                set.contains(scratch)
            }
        }
    }

    /// Writes `[count: u64]` followed by every key.
    pub(crate) fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        if matches!(self, Self::Empty) {
            return Ok(());
        }
        codec::write_u64(writer, self.len() as u64)?;
        match self {
            Self::Empty => {}
            Self::Key8(set) => {
                for key in set {
                    writer.write_all(&[*key])?;
                }
            }
            Self::Key16(set) => {
                for key in set {
                    writer.write_all(&key.to_le_bytes())?;
                }
            }
            Self::Key32(set) => {
                for key in set {
                    writer.write_all(&key.to_le_bytes())?;
                }
            }
            Self::Key64(set) => {
                for key in set {
                    codec::write_u64(writer, *key)?;
                }
            }
            Self::Keys128 { keys, .. } => {
                for key in keys {
                    codec::write_u128(writer, *key)?;
                }
            }
            Self::Keys256 { keys, .. } => {
                for key in keys {
                    writer.write_all(key)?;
                }
            }
            Self::KeyString(set) | Self::Serialized(set) => {
                for key in set.iter() {
                    codec::write_bytes(writer, key)?;
                }
            }
        }
        Ok(())
    }

    /// Reads a payload written by [`SetVariants::write`] into a fresh table of `kind`.
    pub(crate) fn read<R: Read>(kind: SetVariantKind, reader: &mut R) -> Result<Self> {
        let mut variants = Self::new(kind);
        if kind == SetVariantKind::Empty {
            return Ok(variants);
        }
        let count = codec::read_len(reader)?;
        let capacity = count.min(MAX_PREALLOCATED_KEYS);

        let inserted = match &mut variants {
            Self::Empty => 0,
            Self::Key8(set) => read_fixed(reader, count, set, capacity, |b: [u8; 1]| b[0])?,
            Self::Key16(set) => read_fixed(reader, count, set, capacity, u16::from_le_bytes)?,
            Self::Key32(set) => read_fixed(reader, count, set, capacity, u32::from_le_bytes)?,
            Self::Key64(set) => read_fixed(reader, count, set, capacity, u64::from_le_bytes)?,
            Self::Keys128 { keys, .. } => {
                read_fixed(reader, count, keys, capacity, u128::from_le_bytes)?
            }
            Self::Keys256 { keys, .. } => {
                read_fixed(reader, count, keys, capacity, |b: [u8; 32]| b)?
            }
            Self::KeyString(set) | Self::Serialized(set) => {
                let mut inserted = 0;
                for _ in 0..count {
                    if set.insert(&codec::read_bytes(reader)?) {
                        inserted += 1;
                    }
                }
                inserted
            }
        };

        if inserted != count {
            return Err(Error::CorruptedData(format!(
                "set payload declares {count} keys but holds {inserted} distinct keys"
            )));
        }
        Ok(variants)
    }
}

fn read_fixed<R, T, const N: usize>(
    reader: &mut R,
    count: usize,
    set: &mut FxHashSet<T>,
    capacity: usize,
    decode: impl Fn([u8; N]) -> T,
) -> Result<usize>
where
    R: Read,
    T: Eq + Hash,
{
    set.reserve(capacity);
    let mut inserted = 0;
    let mut buf = [0u8; N];
    for _ in 0..count {
        reader.read_exact(&mut buf)?;
        if set.insert(decode(buf)) {
            inserted += 1;
        }
    }
    Ok(inserted)
}
