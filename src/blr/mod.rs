//! Block low-rank fronts
//!
//! A [`BlrMatrix`] tiles a dense block into a grid of [`Tile`]s, each dense
//! or compressed to `U * V`. [`construct_and_partial_factor`] builds the
//! tiles of a front, compresses them with a [`Compressor`] and eliminates
//! the leading block, using [`MultiplyBatch`] for the trailing updates.

pub mod admissibility;
pub mod batch;
pub mod compress;
pub mod factor;
pub mod matrix;
pub mod options;
mod solve;
pub mod tile;

pub use admissibility::{Admissibility, uniform_tiles};
pub use batch::{MultiplyBatch, WorkSize, multiply_inc_work_size};
pub use compress::{
    AdaptiveRandomized, Compression, Compressor, JacobiSvd, QrSvd, compressor_for, is_profitable,
    truncation_rank,
};
pub use factor::{BlrFactors, Front, construct_and_partial_factor, factor_front};
pub use matrix::BlrMatrix;
pub use options::{AraOptions, BlrOptions, CompressionAlgorithm};
pub use tile::{Factor, Tile};
