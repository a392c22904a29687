//! Single-region bump allocator backing all decoded data of one tile load.
//!
//! The arena hands out [`Region`] handles instead of references. A region is
//! validated against the arena on every access: it must belong to the current
//! generation (no [`Arena::reset`] happened since it was allocated) and it
//! must lie below the cursor.

use crate::error::{MapError, Result};

use byteorder::{ByteOrder, LittleEndian};

use std::ops::Range;

/// Size of a region handle stored inside the arena itself.
pub(crate) const REGION_BYTES: usize = 8;

/// Handle to a contiguous byte range allocated from an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Region {
    offset: usize,
    len: usize,
    generation: u32,
}

impl Region {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }

    /// Stores offset and length as little-endian `u32`s. The generation is
    /// implied by the arena the handle is read back from.
    pub(crate) fn write_to(&self, out: &mut [u8]) {
        LittleEndian::write_u32(&mut out[0..4], self.offset as u32);
        LittleEndian::write_u32(&mut out[4..8], self.len as u32);
    }
}

#[derive(Debug)]
pub struct Arena {
    data: Box<[u8]>,
    cursor: usize,
    generation: u32,
}

impl Arena {
    /// Largest capacity; region handles store offsets as `u32`.
    pub const MAX_CAPACITY: usize = u32::MAX as usize;

    /// Creates an arena with a fixed capacity of at most
    /// [`MAX_CAPACITY`](Self::MAX_CAPACITY) bytes. This is the only heap
    /// allocation the arena ever performs.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity.min(Self::MAX_CAPACITY)].into_boxed_slice(),
            cursor: 0,
            generation: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn used(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }

    /// Bumps the cursor by `size` bytes and returns the region in between.
    ///
    /// A request exceeding the remaining capacity fails without moving the
    /// cursor, so earlier allocations stay intact.
    pub fn allocate(&mut self, size: usize) -> Result<Region> {
        if size > self.remaining() {
            log::warn!(
                "Arena overflow: requested {} bytes with {}/{} in use",
                size,
                self.cursor,
                self.capacity()
            );
            return Err(MapError::ArenaOverflow {
                requested: size,
                remaining: self.remaining(),
                capacity: self.capacity(),
            });
        }
        let region = Region {
            offset: self.cursor,
            len: size,
            generation: self.generation,
        };
        self.cursor += size;
        Ok(region)
    }

    /// Releases all allocations at once and returns the number of bytes that
    /// were in use. Every region handed out before becomes stale.
    pub fn reset(&mut self) -> usize {
        let used = self.cursor;
        self.cursor = 0;
        self.generation = self.generation.wrapping_add(1);
        used
    }

    pub fn get(&self, region: Region) -> Result<&[u8]> {
        let range = self.check(region)?;
        Ok(&self.data[range])
    }

    pub fn get_mut(&mut self, region: Region) -> Result<&mut [u8]> {
        let range = self.check(region)?;
        Ok(&mut self.data[range])
    }

    /// Reads back a handle stored with [`Region::write_to`]. It is checked
    /// like any other region on access.
    pub(crate) fn read_region(&self, bytes: &[u8]) -> Region {
        Region {
            offset: LittleEndian::read_u32(&bytes[0..4]) as usize,
            len: LittleEndian::read_u32(&bytes[4..8]) as usize,
            generation: self.generation,
        }
    }

    fn check(&self, region: Region) -> Result<Range<usize>> {
        if region.generation != self.generation || region.offset + region.len > self.cursor {
            return Err(MapError::StaleRegion);
        }
        Ok(region.range())
    }
}
