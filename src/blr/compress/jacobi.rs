//! Compression by a full thin SVD

use super::{Compression, Compressor, finish, max_rank_bound};
use crate::blr::options::{BlrOptions, CompressionAlgorithm};
use crate::blr::tile::Tile;
use crate::dtype::LinalgElement;
use crate::error::Result;
use crate::runtime::{FactorContext, Runtime, SolverOps};
use crate::workspace::ScratchStack;

/// One-sided Jacobi SVD of the whole tile
///
/// Exact up to rounding; the most expensive backend.
#[derive(Copy, Clone, Debug, Default)]
pub struct JacobiSvd;

impl<R: Runtime, T: LinalgElement> Compressor<R, T> for JacobiSvd {
    fn algorithm(&self) -> CompressionAlgorithm {
        CompressionAlgorithm::JacobiSvd
    }

    fn workspace_len(&self, ctx: &FactorContext<R>, max_dim: usize, max_mn: usize) -> usize {
        let kmax = max_rank_bound(max_dim, max_mn);
        kmax + 2 * max_mn + ctx.solver().gesvdj_buffer_size::<T>(max_dim, kmax)
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
        let mut stack = ScratchStack::new(work, "svd");
        let s = stack.take(k)?;
        let mut u = stack.take_mat(m, k)?;
        let mut vt = stack.take_mat(k, n)?;
        let svd_work = stack.take(ctx.solver().gesvdj_buffer_size::<T>(m, n))?;

        ctx.solver()
            .gesvdj(tile.dense()?.as_ref(), s, u.rb_mut(), vt.rb_mut(), svd_work)?;
        finish(
            ctx,
            tile,
            s,
            u.rb(),
            vt.rb(),
            opts,
            CompressionAlgorithm::JacobiSvd,
        )
    }
}
