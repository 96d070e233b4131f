//! CPU runtime implementation

use super::device::CpuDevice;
use super::handles::{CpuBlas, CpuSolver};
use super::stream::CpuStream;
use crate::error::Result;
use crate::runtime::{DefaultAllocator, Runtime};

/// CPU compute runtime
///
/// Works on any platform. Device memory is heap memory accounted by the
/// device's [`DefaultAllocator`].
#[derive(Clone, Debug, Default)]
pub struct CpuRuntime;

impl Runtime for CpuRuntime {
    type Device = CpuDevice;
    type Stream = CpuStream;
    type Allocator = DefaultAllocator;
    type Blas = CpuBlas;
    type Solver = CpuSolver;

    fn name() -> &'static str {
        "cpu"
    }

    fn default_device() -> Self::Device {
        CpuDevice::new()
    }

    fn allocator(device: &Self::Device) -> Self::Allocator {
        device.allocator().clone()
    }

    fn create_stream(device: &Self::Device) -> Result<Self::Stream> {
        Ok(CpuStream::new(device.clone()))
    }

    fn create_blas(stream: &Self::Stream) -> Result<Self::Blas> {
        Ok(CpuBlas::new(stream.clone()))
    }

    fn create_solver(stream: &Self::Stream) -> Result<Self::Solver> {
        Ok(CpuSolver::new(stream.clone()))
    }
}
