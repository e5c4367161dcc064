//! Bump allocator for variable-length key bytes.
//!
//! Keys are appended to one growing buffer and addressed by offset. Nothing is ever
//! freed individually; the whole arena is dropped with its owner.

/// Location of one allocation inside an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ArenaRef {
    offset: usize,
    len: usize,
}

impl ArenaRef {
    /// Length of the referenced bytes.
    #[must_use]
    pub(crate) fn len(self) -> usize {
        self.len
    }
}

/// Append-only byte arena.
#[derive(Debug, Default)]
pub(crate) struct Arena {
    buf: Vec<u8>,
}

impl Arena {
    /// Copies `bytes` into the arena.
    pub(crate) fn alloc(&mut self, bytes: &[u8]) -> ArenaRef {
        let offset = self.buf.len();
        self.buf.extend_from_slice(bytes);
        ArenaRef {
            offset,
            len: bytes.len(),
        }
    }

    /// Returns the bytes behind `r`.
    ///
    /// `r` must come from this arena.
    #[must_use]
    pub(crate) fn get(&self, r: ArenaRef) -> &[u8] {
        &self.buf[r.offset..r.offset + r.len]
    }

    /// Bytes reserved by the backing buffer.
    #[must_use]
    pub(crate) fn allocated_bytes(&self) -> usize {
        self.buf.capacity()
    }
}
