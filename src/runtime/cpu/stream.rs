//! CPU stream implementation

use super::device::CpuDevice;
use super::runtime::CpuRuntime;
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::runtime::Stream;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// CPU execution queue
///
/// Work runs at submission time, in the caller's thread.
#[derive(Clone, Debug)]
pub struct CpuStream {
    device: CpuDevice,
    id: usize,
    syncs: Arc<AtomicUsize>,
}

impl CpuStream {
    pub fn new(device: CpuDevice) -> Self {
        let id = device.next_stream_id();
        Self {
            device,
            id,
            syncs: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Number of times this stream was synchronized
    pub fn sync_count(&self) -> usize {
        self.syncs.load(Ordering::Relaxed)
    }
}

impl Stream<CpuRuntime> for CpuStream {
    fn device(&self) -> &CpuDevice {
        &self.device
    }

    fn synchronize(&self) -> Result<()> {
        // CPU operations are synchronous, nothing to wait for
        self.syncs.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn copy_to_host<T: Element>(&self, src: &[T], dst: &mut [T]) -> Result<()> {
        if dst.len() < src.len() {
            return Err(Error::shape_mismatch(&[src.len()], &[dst.len()]));
        }
        // Plain byte copy, as a device-to-host memcpy would be
        let dst: &mut [u8] = bytemuck::cast_slice_mut(&mut dst[..src.len()]);
        dst.copy_from_slice(bytemuck::cast_slice(src));
        Ok(())
    }
}
