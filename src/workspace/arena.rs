//! Offset-based region allocator

use crate::error::{Error, Result};
use std::ops::Range;

/// A sub-range of a scratch buffer, resolved against the buffer at use time
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Region {
    /// First element of the region
    pub offset: usize,
    /// Number of elements
    pub len: usize,
}

impl Region {
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }

    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Monotonic region allocator with a fixed capacity
///
/// Offsets advance in registration order; regions never overlap.
#[derive(Clone, Debug)]
pub struct RegionArena {
    pool: &'static str,
    capacity: usize,
    offset: usize,
}

impl RegionArena {
    pub fn new(pool: &'static str, capacity: usize) -> Self {
        Self {
            pool,
            capacity,
            offset: 0,
        }
    }

    /// Allocate the next `len` elements
    pub fn alloc(&mut self, len: usize) -> Result<Region> {
        let available = self.capacity - self.offset;
        if len > available {
            return Err(Error::ScratchOverrun {
                pool: self.pool,
                requested: len,
                available,
            });
        }
        let region = Region {
            offset: self.offset,
            len,
        };
        self.offset += len;
        Ok(region)
    }

    #[inline]
    pub fn used(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn pool(&self) -> &'static str {
        self.pool
    }

    /// Forget all regions; the buffer can be reused by the next batch
    pub fn reset(&mut self) {
        self.offset = 0;
    }
}
