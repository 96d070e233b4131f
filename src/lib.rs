//! # blrfront
//!
//! **Block low-rank construction and partial LU factorization of
//! multifrontal fronts.**
//!
//! A front of a sparse direct solver is split into the quadrants
//! `F11, F12, F21, F22`. blrfront tiles the first three into block low-rank
//! matrices, compresses admissible tiles with a rank-revealing backend,
//! eliminates `F11` block by block and subtracts the Schur complement from
//! `F22`, batching the tile products of every elimination step.
//!
//! ## Features
//!
//! - **Tiles**: dense or `U * V`, compressed only when that saves storage
//! - **Compression backends**: one-sided Jacobi SVD, QR followed by SVD of
//!   the small factor, adaptive randomized range finding
//! - **Batched updates**: `C -= A * B` over mixed tile kinds in three
//!   batched GEMM groups with exactly sized scratch
//! - **Runtime abstraction**: streams, BLAS and solver handles behind traits,
//!   with a CPU reference runtime
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use blrfront::prelude::*;
//!
//! let opts = BlrOptions::default().with_leaf_size(256);
//! let mut front = Front::from_dense(a.as_ref(), d1)?;
//! let tiles1 = opts.tiling(d1);
//! let tiles2 = opts.tiling(a.rows() - d1);
//! let admissible = Admissibility::weak(tiles1.len());
//! let factors = factor_front(&mut front, &tiles1, &tiles2, &admissible, &opts)?;
//! let x = factors.solve(&b)?;
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod blr;
pub mod dense;
pub mod dtype;
pub mod error;
pub mod runtime;
pub mod workspace;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::blr::{
        Admissibility, BlrFactors, BlrMatrix, BlrOptions, CompressionAlgorithm, Compressor, Front,
        Tile, compressor_for, construct_and_partial_factor, factor_front, uniform_tiles,
    };
    pub use crate::dense::{DenseMatrix, MatMut, MatRef};
    pub use crate::dtype::{DType, Element, LinalgElement};
    pub use crate::error::{Error, Result};
    pub use crate::runtime::cpu::CpuRuntime;
    pub use crate::runtime::{Device, FactorContext, Runtime};
}
