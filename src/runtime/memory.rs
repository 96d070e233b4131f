//! Typed device and host buffers

use super::allocator::{Allocator, MemoryKind};
use crate::dtype::Element;
use crate::error::{Error, Result};
use std::ops::{Deref, DerefMut};

/// Size-tracked device buffer, released on drop
///
/// Allocation first tries device memory; if that pool is exhausted it falls
/// back once to managed memory. Failure of the fallback is
/// `Error::OutOfMemory`.
#[derive(Debug)]
pub struct DeviceMemory<T, A: Allocator> {
    data: Vec<T>,
    size_bytes: usize,
    kind: MemoryKind,
    allocator: A,
}

impl<T: Element, A: Allocator> DeviceMemory<T, A> {
    /// Allocate `len` zeroed elements
    pub fn zeroed(allocator: &A, len: usize) -> Result<Self> {
        let size_bytes = len
            .checked_mul(std::mem::size_of::<T>())
            .ok_or(Error::OutOfMemory { size: usize::MAX })?;

        let kind = match allocator.reserve(size_bytes, MemoryKind::Device) {
            Ok(()) => MemoryKind::Device,
            Err(Error::OutOfMemory { .. }) => {
                log::warn!(
                    "device allocation of {} bytes failed, falling back to managed memory",
                    size_bytes
                );
                allocator.reserve(size_bytes, MemoryKind::Managed)?;
                MemoryKind::Managed
            }
            Err(e) => return Err(e),
        };

        let mut data = Vec::new();
        if data.try_reserve_exact(len).is_err() {
            allocator.release(size_bytes, kind);
            return Err(Error::OutOfMemory { size: size_bytes });
        }
        data.resize(len, T::zero());

        Ok(Self {
            data,
            size_bytes,
            kind,
            allocator: allocator.clone(),
        })
    }

    /// Pool this buffer was served from
    pub fn kind(&self) -> MemoryKind {
        self.kind
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }
}

impl<T, A: Allocator> Deref for DeviceMemory<T, A> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T, A: Allocator> DerefMut for DeviceMemory<T, A> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T, A: Allocator> Drop for DeviceMemory<T, A> {
    fn drop(&mut self) {
        self.allocator.release(self.size_bytes, self.kind);
    }
}

/// Pinned host staging buffer
#[derive(Debug, Default)]
pub struct HostMemory<T> {
    data: Vec<T>,
}

impl<T: Element> HostMemory<T> {
    /// Allocate `len` zeroed elements
    pub fn zeroed(len: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|_| Error::OutOfMemory {
            size: len.saturating_mul(std::mem::size_of::<T>()),
        })?;
        data.resize(len, T::zero());
        Ok(Self { data })
    }
}

impl<T> Deref for HostMemory<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T> DerefMut for HostMemory<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::DefaultAllocator;

    #[test]
    fn test_device_memory_released_on_drop() {
        let alloc = DefaultAllocator::new();
        {
            let buf = DeviceMemory::<f64, _>::zeroed(&alloc, 16).unwrap();
            assert_eq!(buf.len(), 16);
            assert_eq!(buf.kind(), MemoryKind::Device);
            assert_eq!(alloc.allocated_bytes(), 128);
        }
        assert_eq!(alloc.allocated_bytes(), 0);
    }

    #[test]
    fn test_managed_fallback() {
        let alloc = DefaultAllocator::with_limits(Some(64), None);
        let buf = DeviceMemory::<f64, _>::zeroed(&alloc, 16).unwrap();
        assert_eq!(buf.kind(), MemoryKind::Managed);
        assert_eq!(alloc.bytes(MemoryKind::Managed), 128);
    }

    #[test]
    fn test_fallback_exhausted() {
        let alloc = DefaultAllocator::with_limits(Some(64), Some(64));
        let err = DeviceMemory::<f64, _>::zeroed(&alloc, 16).unwrap_err();
        assert!(matches!(err, Error::OutOfMemory { size: 128 }));
        assert_eq!(alloc.allocated_bytes(), 0);
    }
}
