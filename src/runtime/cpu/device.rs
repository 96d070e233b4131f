//! CPU device implementation

use crate::error::Result;
use crate::runtime::{DefaultAllocator, Device};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// CPU device (there's only one: the host CPU)
///
/// Clones share memory accounting and synchronization counters.
#[derive(Clone, Debug, Default)]
pub struct CpuDevice {
    id: usize,
    allocator: DefaultAllocator,
    syncs: Arc<AtomicUsize>,
    next_stream: Arc<AtomicUsize>,
}

impl CpuDevice {
    /// Create a new CPU device
    pub fn new() -> Self {
        Self::default()
    }

    /// Device whose regular memory pool is capped at `bytes`
    ///
    /// Allocations beyond the cap fall back to managed memory.
    pub fn with_memory_limit(bytes: usize) -> Self {
        Self::with_memory_limits(Some(bytes), None)
    }

    /// Device with caps on both the regular and the managed pool
    pub fn with_memory_limits(device: Option<usize>, managed: Option<usize>) -> Self {
        Self {
            allocator: DefaultAllocator::with_limits(device, managed),
            ..Self::default()
        }
    }

    pub fn allocator(&self) -> &DefaultAllocator {
        &self.allocator
    }

    /// Number of full-device synchronizations so far
    pub fn sync_count(&self) -> usize {
        self.syncs.load(Ordering::Relaxed)
    }

    pub(super) fn next_stream_id(&self) -> usize {
        self.next_stream.fetch_add(1, Ordering::Relaxed)
    }
}

impl Device for CpuDevice {
    fn id(&self) -> usize {
        self.id
    }

    fn name(&self) -> String {
        "cpu".to_string()
    }

    fn synchronize(&self) -> Result<()> {
        self.syncs.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
