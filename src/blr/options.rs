//! Configuration for BLR compression and factorization

use super::admissibility::uniform_tiles;
use crate::error::{Error, Result};

/// Default relative compression tolerance
pub const DEFAULT_REL_TOL: f64 = 1e-4;
/// Default absolute compression tolerance
pub const DEFAULT_ABS_TOL: f64 = 1e-10;
/// Default tile size used by [`BlrOptions::tiling`]
pub const DEFAULT_LEAF_SIZE: usize = 256;

/// Rank-revealing algorithm used for tile compression
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum CompressionAlgorithm {
    /// Full thin SVD by one-sided Jacobi
    #[default]
    JacobiSvd,
    /// Householder QR followed by an SVD of the triangular factor
    QrSvd,
    /// Adaptive randomized range finder followed by a small SVD
    AdaptiveRandomized,
}

/// Parameters of the adaptive randomized compressor
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AraOptions {
    /// Number of random samples drawn per step
    pub block_size: usize,
    /// Consecutive negligible samples required to stop
    pub oversampling: usize,
    /// Tiles with fewer rows or columns are left dense
    pub min_dim: usize,
    /// Seed of the sketch generator
    pub seed: u64,
}

impl Default for AraOptions {
    fn default() -> Self {
        Self {
            block_size: 32,
            oversampling: 10,
            min_dim: 16,
            seed: 0x5eed,
        }
    }
}

/// Options for BLR construction and partial factorization
///
/// ```ignore
/// let opts = BlrOptions::default()
///     .with_rel_tol(1e-8)
///     .with_compression(CompressionAlgorithm::QrSvd);
/// opts.validate()?;
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BlrOptions {
    /// Singular values below `rel_tol * sigma_max` are truncated
    ///
    /// The tolerance is relative to the largest singular value of each
    /// tile. A tolerance tuned for a plain `sigma >= tol` cut has to be
    /// divided by the expected `sigma_max`, or expressed through
    /// `abs_tol` instead.
    pub rel_tol: f64,
    /// Singular values below `abs_tol` are truncated
    pub abs_tol: f64,
    pub compression: CompressionAlgorithm,
    /// Largest tile size produced by [`BlrOptions::tiling`]
    pub leaf_size: usize,
    pub ara: AraOptions,
}

impl Default for BlrOptions {
    fn default() -> Self {
        Self {
            rel_tol: DEFAULT_REL_TOL,
            abs_tol: DEFAULT_ABS_TOL,
            compression: CompressionAlgorithm::default(),
            leaf_size: DEFAULT_LEAF_SIZE,
            ara: AraOptions::default(),
        }
    }
}

impl BlrOptions {
    pub fn with_rel_tol(mut self, rel_tol: f64) -> Self {
        self.rel_tol = rel_tol;
        self
    }

    pub fn with_abs_tol(mut self, abs_tol: f64) -> Self {
        self.abs_tol = abs_tol;
        self
    }

    pub fn with_compression(mut self, compression: CompressionAlgorithm) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_leaf_size(mut self, leaf_size: usize) -> Self {
        self.leaf_size = leaf_size;
        self
    }

    pub fn with_ara(mut self, ara: AraOptions) -> Self {
        self.ara = ara;
        self
    }

    /// Block sizes for a dimension of `n`, at most `leaf_size` each
    pub fn tiling(&self, n: usize) -> Vec<usize> {
        uniform_tiles(n, self.leaf_size)
    }

    /// Keep threshold for singular values given the largest one
    pub fn threshold(&self, sigma_max: f64) -> f64 {
        (self.rel_tol * sigma_max).max(self.abs_tol)
    }

    /// Reject tolerances and sizes the compressors cannot work with
    pub fn validate(&self) -> Result<()> {
        if !self.rel_tol.is_finite() || self.rel_tol <= 0.0 || self.rel_tol >= 1.0 {
            return Err(Error::invalid_argument(
                "rel_tol",
                format!("must lie in (0, 1), got {}", self.rel_tol),
            ));
        }
        if !self.abs_tol.is_finite() || self.abs_tol <= 0.0 {
            return Err(Error::invalid_argument(
                "abs_tol",
                format!("must be positive and finite, got {}", self.abs_tol),
            ));
        }
        if self.leaf_size == 0 {
            return Err(Error::invalid_argument("leaf_size", "must be positive"));
        }
        if self.ara.block_size == 0 {
            return Err(Error::invalid_argument("ara.block_size", "must be positive"));
        }
        if self.ara.oversampling == 0 {
            return Err(Error::invalid_argument("ara.oversampling", "must be positive"));
        }
        Ok(())
    }
}
