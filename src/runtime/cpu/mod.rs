//! CPU reference runtime
//!
//! Streams execute work eagerly at submission, so submission order is
//! execution order and `synchronize` is a barrier that only records that it
//! was reached. Kernels are the reference implementations in
//! [`crate::dense::kernels`].

mod device;
mod handles;
mod runtime;
mod stream;

pub use device::CpuDevice;
pub use handles::{CpuBlas, CpuSolver};
pub use runtime::CpuRuntime;
pub use stream::CpuStream;
