//! Compression by QR followed by an SVD of the small triangular factor

use super::{Compression, Compressor, finish, max_rank_bound};
use crate::blr::options::{BlrOptions, CompressionAlgorithm};
use crate::blr::tile::Tile;
use crate::dense::{MatMut, MatRef};
use crate::dtype::LinalgElement;
use crate::error::Result;
use crate::runtime::{BlasOps, FactorContext, Runtime, SolverOps};
use crate::workspace::ScratchStack;

/// Householder QR of the tile (or its transpose), then a `k x k` SVD
///
/// Cheaper than [`super::JacobiSvd`] for strongly rectangular tiles since
/// the Jacobi sweeps only see the triangular factor.
#[derive(Copy, Clone, Debug, Default)]
pub struct QrSvd;

impl<R: Runtime, T: LinalgElement> Compressor<R, T> for QrSvd {
    fn algorithm(&self) -> CompressionAlgorithm {
        CompressionAlgorithm::QrSvd
    }

    fn workspace_len(&self, ctx: &FactorContext<R>, max_dim: usize, max_mn: usize) -> usize {
        let kmax = max_rank_bound(max_dim, max_mn);
        4 * max_mn
            + 4 * kmax * kmax
            + kmax
            + ctx.solver().geqrf_buffer_size::<T>(max_dim, kmax)
            + ctx.solver().gesvdj_buffer_size::<T>(kmax, kmax)
    }

    fn compress(
        &self,
        ctx: &FactorContext<R>,
        tile: &mut Tile<T>,
        opts: &BlrOptions,
        work: &mut [T],
    ) -> Result<Compression> {
        let (m, n) = (tile.rows(), tile.cols());
        if m == 0 || n == 0 {
            return Ok(Compression::default());
        }
        let k = m.min(n);
        let (tall_m, tall_n) = (m.max(n), k);
        let mut stack = ScratchStack::new(work, "qr_svd");

        // Tall copy: A itself or A^T
        let mut a = stack.take_mat(tall_m, tall_n)?;
        {
            let src = tile.dense()?.as_ref();
            for i in 0..m {
                for j in 0..n {
                    if m >= n {
                        a.set(i, j, src.at(i, j));
                    } else {
                        a.set(j, i, src.at(i, j));
                    }
                }
            }
        }
        let mut q = stack.take_mat(tall_m, k)?;
        let mut r = stack.take_mat(k, k)?;
        let qr_work = stack.take(ctx.solver().geqrf_buffer_size::<T>(tall_m, tall_n))?;
        ctx.solver().geqrf_thin(a.rb_mut(), q.rb_mut(), r.rb_mut(), qr_work)?;

        let s = stack.take(k)?;
        let mut ur = stack.take_mat(k, k)?;
        let mut vtr = stack.take_mat(k, k)?;
        let svd_work = stack.take(ctx.solver().gesvdj_buffer_size::<T>(k, k))?;

        if m >= n {
            // A = Q R = (Q Ur) S Vtr
            ctx.solver()
                .gesvdj(r.rb(), s, ur.rb_mut(), vtr.rb_mut(), svd_work)?;
            let mut u = stack.take_mat(m, k)?;
            ctx.blas()
                .gemm(T::one(), q.rb(), ur.rb(), T::zero(), u.rb_mut())?;
            finish(ctx, tile, s, u.rb(), vtr.rb(), opts, CompressionAlgorithm::QrSvd)
        } else {
            // A^T = Q R, so A = R^T Q^T = Ur S (Vtr Q^T)
            let mut rt = stack.take_mat(k, k)?;
            transpose_into(r.rb(), rt.rb_mut());
            ctx.solver()
                .gesvdj(rt.rb(), s, ur.rb_mut(), vtr.rb_mut(), svd_work)?;
            let mut qt = stack.take_mat(k, n)?;
            transpose_into(q.rb(), qt.rb_mut());
            let mut vt = stack.take_mat(k, n)?;
            ctx.blas()
                .gemm(T::one(), vtr.rb(), qt.rb(), T::zero(), vt.rb_mut())?;
            finish(ctx, tile, s, ur.rb(), vt.rb(), opts, CompressionAlgorithm::QrSvd)
        }
    }
}

fn transpose_into<T: LinalgElement>(src: MatRef<'_, T>, mut dst: MatMut<'_, T>) {
    for i in 0..src.rows() {
        for j in 0..src.cols() {
            dst.set(j, i, src.at(i, j));
        }
    }
}
