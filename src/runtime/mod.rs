//! Device/host resource layer
//!
//! The factorization driver never touches a vendor API directly. It is
//! written against the capability traits in this module, and each backend
//! provides concrete types for them.
//!
//! # Architecture
//!
//! ```text
//! Runtime (backend identity)
//! ├── Device     (identifies a compute unit, owns its memory accounting)
//! ├── Stream     (ordered execution queue: compute or copy)
//! ├── Allocator  (byte accounting with managed-memory fallback)
//! ├── Blas       (gemm / trsm / laswp / dgmm bound to a stream)
//! └── Solver     (getrf / gesvdj / geqrf bound to a stream)
//! ```
//!
//! [`FactorContext`] bundles the two streams and both handles that one
//! factorization call needs.

mod allocator;
pub mod cpu;
mod memory;

pub use allocator::{Allocator, DefaultAllocator, MemoryKind};
pub use memory::{DeviceMemory, HostMemory};

use crate::dense::{Diag, MatMut, MatRef, Side, UpLo};
use crate::dtype::{Element, LinalgElement};
use crate::error::Result;

/// Core trait for compute backends
///
/// Uses static dispatch via generics; the driver is monomorphized per
/// backend.
///
/// ```ignore
/// use blrfront::runtime::{FactorContext, Runtime, cpu::CpuRuntime};
///
/// let device = CpuRuntime::default_device();
/// let ctx = FactorContext::<CpuRuntime>::new(&device)?;
/// ```
pub trait Runtime: Clone + Send + Sync + 'static {
    /// Device identifier type
    type Device: Device;

    /// Ordered execution queue
    type Stream: Stream<Self>;

    /// Memory accounting for device allocations
    type Allocator: Allocator;

    /// BLAS-like compute handle
    type Blas: BlasOps<Self>;

    /// Dense solver handle
    type Solver: SolverOps<Self>;

    /// Human-readable name of this runtime
    fn name() -> &'static str;

    /// Get the default device
    fn default_device() -> Self::Device;

    /// Allocator accounting for memory on `device`
    fn allocator(device: &Self::Device) -> Self::Allocator;

    /// Create a new stream on `device`
    fn create_stream(device: &Self::Device) -> Result<Self::Stream>;

    /// Create a compute handle bound to `stream`
    fn create_blas(stream: &Self::Stream) -> Result<Self::Blas>;

    /// Create a solver handle bound to `stream`
    fn create_solver(stream: &Self::Stream) -> Result<Self::Solver>;
}

/// Trait for device identification
pub trait Device: Clone + Send + Sync + 'static {
    /// Unique identifier for this device
    fn id(&self) -> usize;

    /// Check if two devices are the same
    fn is_same(&self, other: &Self) -> bool {
        self.id() == other.id()
    }

    /// Human-readable name
    fn name(&self) -> String {
        format!("Device({})", self.id())
    }

    /// Wait for all work on every stream of this device
    fn synchronize(&self) -> Result<()>;
}

/// Ordered asynchronous execution queue
///
/// Work submitted to one stream executes in submission order. Work on
/// different streams is unordered until a synchronization point.
pub trait Stream<R: Runtime>: Clone + Send + Sync {
    /// Device this stream executes on
    fn device(&self) -> &R::Device;

    /// Block until all work submitted so far has completed
    fn synchronize(&self) -> Result<()>;

    /// Enqueue a device-to-host copy into `dst`
    fn copy_to_host<T: Element>(&self, src: &[T], dst: &mut [T]) -> Result<()>;
}

/// BLAS-like operations bound to a stream
pub trait BlasOps<R: Runtime>: Send + Sync {
    /// Stream this handle submits to
    fn stream(&self) -> &R::Stream;

    /// `C = alpha * A * B + beta * C`
    fn gemm<T: LinalgElement>(
        &self,
        alpha: T,
        a: MatRef<'_, T>,
        b: MatRef<'_, T>,
        beta: T,
        c: MatMut<'_, T>,
    ) -> Result<()>;

    /// Triangular solve with multiple right-hand sides, in place
    fn trsm<T: LinalgElement>(
        &self,
        side: Side,
        uplo: UpLo,
        diag: Diag,
        a: MatRef<'_, T>,
        b: MatMut<'_, T>,
    ) -> Result<()>;

    /// Apply sequential row interchanges
    fn laswp<T: LinalgElement>(&self, a: MatMut<'_, T>, piv: &[usize], forward: bool) -> Result<()>;

    /// Scale rows (`Side::Left`) or columns (`Side::Right`) by `d`
    fn dgmm<T: LinalgElement>(&self, side: Side, a: MatMut<'_, T>, d: &[T]) -> Result<()>;
}

/// Dense factorizations bound to a stream
pub trait SolverOps<R: Runtime>: Send + Sync {
    /// Stream this handle submits to
    fn stream(&self) -> &R::Stream;

    /// Partial-pivoted LU in place; returns the 1-based index of the first
    /// zero pivot, or 0
    fn getrf<T: LinalgElement>(&self, a: MatMut<'_, T>, piv: &mut [usize]) -> Result<usize>;

    /// Workspace elements required by [`SolverOps::gesvdj`] for an `m x n` input
    fn gesvdj_buffer_size<T: LinalgElement>(&self, m: usize, n: usize) -> usize;

    /// Thin SVD `A = U * diag(S) * Vt`, singular values descending
    fn gesvdj<T: LinalgElement>(
        &self,
        a: MatRef<'_, T>,
        s: &mut [T],
        u: MatMut<'_, T>,
        vt: MatMut<'_, T>,
        work: &mut [T],
    ) -> Result<()>;

    /// Workspace elements required by [`SolverOps::geqrf_thin`]
    fn geqrf_buffer_size<T: LinalgElement>(&self, m: usize, n: usize) -> usize;

    /// Thin QR of a tall matrix; `a` is overwritten
    fn geqrf_thin<T: LinalgElement>(
        &self,
        a: MatMut<'_, T>,
        q: MatMut<'_, T>,
        r: MatMut<'_, T>,
        work: &mut [T],
    ) -> Result<()>;
}

/// Streams and handles used by one factorization call
///
/// The BLAS and solver handles are bound to the compute stream; the copy
/// stream carries device-to-host tile migration.
pub struct FactorContext<R: Runtime> {
    device: R::Device,
    comp: R::Stream,
    copy: R::Stream,
    blas: R::Blas,
    solver: R::Solver,
}

impl<R: Runtime> FactorContext<R> {
    /// Create both streams and both handles on `device`
    pub fn new(device: &R::Device) -> Result<Self> {
        let comp = R::create_stream(device)?;
        let copy = R::create_stream(device)?;
        let blas = R::create_blas(&comp)?;
        let solver = R::create_solver(&comp)?;
        Ok(Self {
            device: device.clone(),
            comp,
            copy,
            blas,
            solver,
        })
    }

    pub fn device(&self) -> &R::Device {
        &self.device
    }

    /// Compute stream
    pub fn comp_stream(&self) -> &R::Stream {
        &self.comp
    }

    /// Copy stream
    pub fn copy_stream(&self) -> &R::Stream {
        &self.copy
    }

    pub fn blas(&self) -> &R::Blas {
        &self.blas
    }

    pub fn solver(&self) -> &R::Solver {
        &self.solver
    }

    /// Allocator for device scratch
    pub fn allocator(&self) -> R::Allocator {
        R::allocator(&self.device)
    }
}

impl<R: Runtime> std::fmt::Debug for FactorContext<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactorContext")
            .field("runtime", &R::name())
            .field("device", &self.device.name())
            .finish()
    }
}
