//! Rank-revealing tile compression
//!
//! A [`Compressor`] turns a dense tile into `U * V` when that is cheaper to
//! store. All backends follow the same contract:
//!
//! 1. compute singular values `S` in descending order with matching
//!    singular vectors,
//! 2. keep the leading values `>= max(rel_tol * S[0], abs_tol)`, stopping at
//!    the first one below the threshold,
//! 3. accept only if `rank * (rows + cols) < rows * cols`,
//! 4. on acceptance store `U` with orthonormal columns and `V = diag(S) * Vt`.
//!
//! Backends never allocate; the caller hands them a scratch buffer of at
//! least [`Compressor::workspace_len`] elements and reuses it across tiles.

mod ara;
mod jacobi;
mod qr_svd;

pub use ara::AdaptiveRandomized;
pub use jacobi::JacobiSvd;
pub use qr_svd::QrSvd;

use super::options::{BlrOptions, CompressionAlgorithm};
use super::tile::Tile;
use crate::dense::{DenseMatrix, MatRef, Side};
use crate::dtype::LinalgElement;
use crate::error::Result;
use crate::runtime::{BlasOps, FactorContext, Runtime};

/// Outcome of one compression attempt
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Compression {
    /// Whether the tile was rewritten as low-rank
    pub accepted: bool,
    /// Numerical rank found; `min(rows, cols)` when the backend skipped the tile
    pub rank: usize,
}

/// Strategy interface over the rank-revealing backends
pub trait Compressor<R: Runtime, T: LinalgElement>: Send + Sync {
    fn algorithm(&self) -> CompressionAlgorithm;

    /// Scratch elements needed for any tile with both dimensions at most
    /// `max_dim` and at most `max_mn` elements
    fn workspace_len(&self, ctx: &FactorContext<R>, max_dim: usize, max_mn: usize) -> usize;

    /// Try to compress a dense tile in place
    ///
    /// A zero-sized tile is left untouched and reported as not accepted.
    fn compress(
        &self,
        ctx: &FactorContext<R>,
        tile: &mut Tile<T>,
        opts: &BlrOptions,
        work: &mut [T],
    ) -> Result<Compression>;
}

/// Backend selected by `opts.compression`
pub fn compressor_for<R: Runtime, T: LinalgElement>(opts: &BlrOptions) -> Box<dyn Compressor<R, T>> {
    match opts.compression {
        CompressionAlgorithm::JacobiSvd => Box::new(JacobiSvd),
        CompressionAlgorithm::QrSvd => Box::new(QrSvd),
        CompressionAlgorithm::AdaptiveRandomized => Box::new(AdaptiveRandomized::new(opts.ara)),
    }
}

/// Storing `U * V` beats storing the dense block
#[inline]
pub fn is_profitable(rank: usize, rows: usize, cols: usize) -> bool {
    rank * (rows + cols) < rows * cols
}

/// Number of leading singular values kept under `opts`
///
/// `s` must be sorted descending. Values after the first dropped one are
/// ignored; if one of them would have been kept a warning is logged.
pub fn truncation_rank<T: LinalgElement>(s: &[T], opts: &BlrOptions) -> usize {
    let Some(first) = s.first() else {
        return 0;
    };
    let threshold = opts.threshold(first.to_f64());
    let rank = s
        .iter()
        .position(|x| x.to_f64() < threshold)
        .unwrap_or(s.len());
    if s[rank..].iter().any(|x| x.to_f64() >= threshold) {
        log::warn!(
            "singular values not monotone: value above threshold {:e} after truncation at rank {}",
            threshold,
            rank
        );
    }
    rank
}

/// Shape of the largest square with at most `max_mn` elements and side at
/// most `max_dim`; bounds `min(m, n)` of any admissible tile
#[inline]
pub(crate) fn max_rank_bound(max_dim: usize, max_mn: usize) -> usize {
    max_dim.min(max_mn.isqrt())
}

/// Truncate a computed SVD and rewrite `tile` if that pays off
///
/// `u` holds at least `rank` left singular vectors as columns and `vt` at
/// least `rank` right singular vectors as rows.
pub(crate) fn finish<R: Runtime, T: LinalgElement>(
    ctx: &FactorContext<R>,
    tile: &mut Tile<T>,
    s: &[T],
    u: MatRef<'_, T>,
    vt: MatRef<'_, T>,
    opts: &BlrOptions,
    algorithm: CompressionAlgorithm,
) -> Result<Compression> {
    let (m, n) = (tile.rows(), tile.cols());
    let rank = truncation_rank(s, opts);
    let accepted = is_profitable(rank, m, n);
    log::trace!(
        "{:?}: {}x{} tile has rank {} (accepted: {})",
        algorithm,
        m,
        n,
        rank,
        accepted
    );
    if accepted {
        let u_new = DenseMatrix::from_view(u.submatrix(0, 0, m, rank)?);
        let mut v_new = DenseMatrix::from_view(vt.submatrix(0, 0, rank, n)?);
        ctx.blas().dgmm(Side::Left, v_new.as_mut(), &s[..rank])?;
        *tile = Tile::low_rank(u_new, v_new)?;
    }
    Ok(Compression { accepted, rank })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncation_rank() {
        let opts = BlrOptions::default().with_rel_tol(1e-3).with_abs_tol(1e-12);
        assert_eq!(truncation_rank(&[10.0f64, 1.0, 0.011, 0.009, 0.0], &opts), 3);
        assert_eq!(truncation_rank(&[1.0f64, 1.0], &opts), 2);
        assert_eq!(truncation_rank::<f64>(&[], &opts), 0);
        assert_eq!(truncation_rank(&[0.0f64, 0.0], &opts), 0);
    }

    #[test]
    fn test_truncation_stops_at_first_small_value() {
        let opts = BlrOptions::default().with_rel_tol(1e-3);
        assert_eq!(truncation_rank(&[1.0f64, 1e-6, 0.5], &opts), 1);
    }

    #[test]
    fn test_profitability() {
        assert!(is_profitable(1, 4, 4));
        assert!(!is_profitable(2, 4, 4));
        assert!(is_profitable(0, 1, 1));
        assert!(!is_profitable(1, 1, 8));
    }

    #[test]
    fn test_max_rank_bound() {
        assert_eq!(max_rank_bound(100, 100), 10);
        assert_eq!(max_rank_bound(4, 100), 4);
    }
}
