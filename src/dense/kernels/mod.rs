//! Dense kernels used by tile compression and factorization
//!
//! These are the reference implementations behind the CPU runtime's BLAS
//! and solver handles. All kernels work on row-major strided views and take
//! caller-provided workspace where they need any, so they never allocate.

mod gemm;
pub mod jacobi;
mod lu;
mod qr;
mod svd;
mod trsm;

pub use gemm::{dgmm, gemm};
pub use lu::{getrf, laswp};
pub use qr::{geqrf_thin, geqrf_thin_work_len};
pub use svd::{gesvdj, gesvdj_work_len};
pub use trsm::trsm;

/// Which side a triangular or diagonal operand is applied from
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    /// `op(A) * B`
    Left,
    /// `B * op(A)`
    Right,
}

/// Which triangle of a square operand is referenced
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UpLo {
    Lower,
    Upper,
}

/// Whether the triangular operand has an implicit unit diagonal
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Diag {
    Unit,
    NonUnit,
}
