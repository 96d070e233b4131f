//! Memory accounting with a managed-memory fallback
//!
//! Allocators do not hand out memory themselves; [`DeviceMemory`] owns the
//! storage and asks its allocator to account for it. A device allocation
//! that does not fit may fall back once to managed (unified) memory.
//!
//! [`DeviceMemory`]: super::DeviceMemory

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;

/// Where an allocation lives
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MemoryKind {
    /// Regular device memory
    Device,
    /// Unified memory migrated on demand; slower but larger
    Managed,
}

/// Memory allocator trait for runtime backends
pub trait Allocator: Clone + Send + Sync {
    /// Account for `size_bytes` of `kind` memory
    ///
    /// Returns `Error::OutOfMemory` if the pool cannot satisfy the request.
    fn reserve(&self, size_bytes: usize, kind: MemoryKind) -> Result<()>;

    /// Return a previous reservation
    fn release(&self, size_bytes: usize, kind: MemoryKind);

    /// Get the total allocated bytes
    fn allocated_bytes(&self) -> usize {
        0 // Default: tracking not supported
    }
}

#[derive(Debug, Default)]
struct AllocatorState {
    device_limit: Option<usize>,
    managed_limit: Option<usize>,
    device_bytes: usize,
    managed_bytes: usize,
    peak_bytes: usize,
}

/// Byte-counting allocator with optional per-kind limits
///
/// Clones share the same counters.
#[derive(Clone, Debug, Default)]
pub struct DefaultAllocator {
    state: Arc<Mutex<AllocatorState>>,
}

impl DefaultAllocator {
    /// Unlimited allocator
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocator whose device and managed pools are capped in bytes
    pub fn with_limits(device: Option<usize>, managed: Option<usize>) -> Self {
        Self {
            state: Arc::new(Mutex::new(AllocatorState {
                device_limit: device,
                managed_limit: managed,
                ..Default::default()
            })),
        }
    }

    /// Bytes currently reserved of `kind`
    pub fn bytes(&self, kind: MemoryKind) -> usize {
        let state = self.state.lock();
        match kind {
            MemoryKind::Device => state.device_bytes,
            MemoryKind::Managed => state.managed_bytes,
        }
    }

    /// High-water mark over both kinds
    pub fn peak_bytes(&self) -> usize {
        self.state.lock().peak_bytes
    }
}

impl Allocator for DefaultAllocator {
    fn reserve(&self, size_bytes: usize, kind: MemoryKind) -> Result<()> {
        let mut state = self.state.lock();
        let (used, limit) = match kind {
            MemoryKind::Device => (state.device_bytes, state.device_limit),
            MemoryKind::Managed => (state.managed_bytes, state.managed_limit),
        };
        let total = used
            .checked_add(size_bytes)
            .ok_or(Error::OutOfMemory { size: size_bytes })?;
        if limit.is_some_and(|limit| total > limit) {
            return Err(Error::OutOfMemory { size: size_bytes });
        }
        match kind {
            MemoryKind::Device => state.device_bytes = total,
            MemoryKind::Managed => state.managed_bytes = total,
        }
        let in_use = state.device_bytes + state.managed_bytes;
        state.peak_bytes = state.peak_bytes.max(in_use);
        Ok(())
    }

    fn release(&self, size_bytes: usize, kind: MemoryKind) {
        let mut state = self.state.lock();
        match kind {
            MemoryKind::Device => state.device_bytes = state.device_bytes.saturating_sub(size_bytes),
            MemoryKind::Managed => {
                state.managed_bytes = state.managed_bytes.saturating_sub(size_bytes)
            }
        }
    }

    fn allocated_bytes(&self) -> usize {
        let state = self.state.lock();
        state.device_bytes + state.managed_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_allocator_trait_bounds() {
        fn assert_allocator<A: Allocator>() {}
        assert_allocator::<DefaultAllocator>();
    }

    #[test]
    fn test_limits_and_release() {
        let alloc = DefaultAllocator::with_limits(Some(100), None);
        alloc.reserve(60, MemoryKind::Device).unwrap();
        assert!(alloc.reserve(60, MemoryKind::Device).is_err());
        alloc.reserve(60, MemoryKind::Managed).unwrap();
        assert_eq!(alloc.allocated_bytes(), 120);
        alloc.release(60, MemoryKind::Device);
        assert_eq!(alloc.bytes(MemoryKind::Device), 0);
        assert_eq!(alloc.peak_bytes(), 120);
    }
}
