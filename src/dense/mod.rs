//! Row-major dense storage and the kernels that operate on it
//!
//! `DenseMatrix` owns its elements; `MatRef`/`MatMut` are strided views
//! (row stride `ld`, in elements) used to address sub-blocks of a front
//! or a scratch region without copying.

pub mod kernels;
mod matrix;
mod view;

pub use kernels::{Diag, Side, UpLo};
pub use matrix::{DenseMatrix, Location};
pub use view::{MatMut, MatRef, required_len};
