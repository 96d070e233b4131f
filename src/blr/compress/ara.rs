//! Compression by an adaptive randomized range finder

use super::{Compression, Compressor, finish, max_rank_bound};
use crate::blr::options::{AraOptions, BlrOptions, CompressionAlgorithm};
use crate::blr::tile::Tile;
use crate::dense::{MatMut, MatRef};
use crate::dtype::LinalgElement;
use crate::error::Result;
use crate::runtime::{BlasOps, FactorContext, Runtime, SolverOps};
use crate::workspace::ScratchStack;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Adaptive randomized approximation (ARA)
///
/// Grows an orthonormal basis `Q` of the range of `A` from Gaussian samples
/// `A * omega`, `block_size` at a time, until `oversampling` consecutive
/// samples have a negligible component outside `Q`. The singular values
/// then come from an exact SVD of the small projection `Q^T * A`, so they
/// are sorted even though the basis is random.
///
/// Tiles with fewer than `min_dim` rows or columns are left dense.
#[derive(Debug)]
pub struct AdaptiveRandomized {
    opts: AraOptions,
    rng: Mutex<StdRng>,
}

impl AdaptiveRandomized {
    pub fn new(opts: AraOptions) -> Self {
        Self {
            opts,
            rng: Mutex::new(StdRng::seed_from_u64(opts.seed)),
        }
    }

    pub fn options(&self) -> &AraOptions {
        &self.opts
    }
}

impl Default for AdaptiveRandomized {
    fn default() -> Self {
        Self::new(AraOptions::default())
    }
}

impl<R: Runtime, T: LinalgElement> Compressor<R, T> for AdaptiveRandomized {
    fn algorithm(&self) -> CompressionAlgorithm {
        CompressionAlgorithm::AdaptiveRandomized
    }

    fn workspace_len(&self, ctx: &FactorContext<R>, max_dim: usize, max_mn: usize) -> usize {
        let kmax = max_rank_bound(max_dim, max_mn);
        let b = self.opts.block_size;
        5 * max_mn
            + 2 * b * max_dim
            + kmax
            + kmax * kmax
            + ctx.solver().gesvdj_buffer_size::<T>(max_dim, kmax)
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
        if m < self.opts.min_dim || n < self.opts.min_dim {
            log::trace!("ara: {}x{} tile below minimum dimension, kept dense", m, n);
            return Ok(Compression {
                accepted: false,
                rank: m.min(n),
            });
        }

        let kmax = m.min(n);
        let b = self.opts.block_size;
        let mut stack = ScratchStack::new(work, "ara");
        let q = stack.take(m * kmax)?;
        let omega = stack.take(n * b)?;
        let y = stack.take(m * b)?;

        let a = tile.dense()?;
        // ||A||_F / sqrt(k) never exceeds the largest singular value
        let sigma_lb = a.frobenius_norm() / (kmax as f64).sqrt();
        let tol = 0.1 * opts.threshold(sigma_lb);
        let rank = self.range_finder(ctx, a.as_ref(), q, omega, y, tol)?;

        // B = Q^T A, then B = Ub S Vt and U = Q Ub
        let q = MatRef::new(q, m, rank, kmax)?;
        let mut qt = stack.take_mat(rank, m)?;
        for i in 0..m {
            for l in 0..rank {
                qt.set(l, i, q.at(i, l));
            }
        }
        let mut bmat = stack.take_mat(rank, n)?;
        ctx.blas()
            .gemm(T::one(), qt.rb(), a.as_ref(), T::zero(), bmat.rb_mut())?;

        let s = stack.take(rank)?;
        let mut ub = stack.take_mat(rank, rank)?;
        let mut vt = stack.take_mat(rank, n)?;
        let svd_work = stack.take(ctx.solver().gesvdj_buffer_size::<T>(rank, n))?;
        ctx.solver()
            .gesvdj(bmat.rb(), s, ub.rb_mut(), vt.rb_mut(), svd_work)?;
        let mut u = stack.take_mat(m, rank)?;
        ctx.blas().gemm(T::one(), q, ub.rb(), T::zero(), u.rb_mut())?;

        finish(
            ctx,
            tile,
            s,
            u.rb(),
            vt.rb(),
            opts,
            CompressionAlgorithm::AdaptiveRandomized,
        )
    }
}

impl AdaptiveRandomized {
    /// Fill the leading columns of `q` (`m x kmax`, row stride `kmax`) with
    /// an orthonormal basis of the numerical range of `a`; returns its size
    fn range_finder<R: Runtime, T: LinalgElement>(
        &self,
        ctx: &FactorContext<R>,
        a: MatRef<'_, T>,
        q: &mut [T],
        omega: &mut [T],
        y: &mut [T],
        tol: f64,
    ) -> Result<usize> {
        let (m, n) = (a.rows(), a.cols());
        let kmax = m.min(n);
        let mut rank = 0;
        let mut small = 0;
        let mut rng = self.rng.lock();

        while rank < kmax && small < self.opts.oversampling {
            let bs = self.opts.block_size.min(kmax - rank);
            for x in omega[..n * bs].iter_mut() {
                *x = T::from_f64(rng.sample(StandardNormal));
            }
            let omega_mat = MatRef::from_slice(&omega[..n * bs], n, bs)?;
            let mut samples = MatMut::from_slice(&mut y[..m * bs], m, bs)?;
            ctx.blas()
                .gemm(T::one(), a, omega_mat, T::zero(), samples.rb_mut())?;

            for c in 0..bs {
                // Two passes of Gram-Schmidt against the current basis
                for _ in 0..2 {
                    for l in 0..rank {
                        let mut dot = T::zero();
                        for i in 0..m {
                            dot = dot + q[i * kmax + l] * samples.at(i, c);
                        }
                        for i in 0..m {
                            let v = samples.at(i, c) - dot * q[i * kmax + l];
                            samples.set(i, c, v);
                        }
                    }
                }
                let norm = (0..m)
                    .map(|i| samples.at(i, c).to_f64().powi(2))
                    .sum::<f64>()
                    .sqrt();
                if norm > tol && rank < kmax {
                    let inv = T::from_f64(1.0 / norm);
                    for i in 0..m {
                        q[i * kmax + rank] = samples.at(i, c) * inv;
                    }
                    rank += 1;
                    small = 0;
                } else {
                    small += 1;
                    if small >= self.opts.oversampling {
                        break;
                    }
                }
            }
        }
        Ok(rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dense::DenseMatrix;
    use crate::runtime::cpu::CpuRuntime;

    /// Sum of `sigma[i] * x_i * y_i^T` over random unit vectors
    fn synthetic_low_rank(m: usize, n: usize, sigma: &[f64], seed: u64) -> DenseMatrix<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut out = DenseMatrix::zeros(m, n);
        for &s in sigma {
            let x: Vec<f64> = (0..m).map(|_| rng.sample(StandardNormal)).collect();
            let y: Vec<f64> = (0..n).map(|_| rng.sample(StandardNormal)).collect();
            let nx = x.iter().map(|v| v * v).sum::<f64>().sqrt();
            let ny = y.iter().map(|v| v * v).sum::<f64>().sqrt();
            for i in 0..m {
                for j in 0..n {
                    let v = out.get(i, j) + s * x[i] * y[j] / (nx * ny);
                    out.set(i, j, v);
                }
            }
        }
        out
    }

    fn ctx() -> FactorContext<CpuRuntime> {
        FactorContext::new(&CpuRuntime::default_device()).unwrap()
    }

    #[test]
    fn test_small_tile_skipped() {
        let ctx = ctx();
        let ara = AdaptiveRandomized::default();
        let mut tile = Tile::Dense(DenseMatrix::<f64>::zeros(8, 40));
        let mut work = vec![0.0; 4096];
        let c = Compressor::<CpuRuntime, f64>::compress(
            &ara,
            &ctx,
            &mut tile,
            &BlrOptions::default(),
            &mut work,
        )
        .unwrap();
        assert!(!c.accepted);
        assert!(!tile.is_low_rank());
    }

    #[test]
    fn test_recovers_rank() {
        let ctx = ctx();
        let ara = AdaptiveRandomized::default();
        let a = synthetic_low_rank(40, 30, &[5.0, 2.0, 1.0], 7);
        let mut tile = Tile::Dense(a.clone());
        let opts = BlrOptions::default().with_rel_tol(1e-8);
        let len = Compressor::<CpuRuntime, f64>::workspace_len(&ara, &ctx, 40, 1200);
        let mut work = vec![0.0; len];
        let c = ara.compress(&ctx, &mut tile, &opts, &mut work).unwrap();
        assert!(c.accepted);
        assert_eq!(c.rank, 3);
        let err = tile.to_dense().unwrap().frobenius_distance(&a).unwrap();
        assert!(err <= 1e-8 * a.frobenius_norm());
    }

    #[test]
    fn test_zero_tile_rank_zero() {
        let ctx = ctx();
        let ara = AdaptiveRandomized::default();
        let mut tile = Tile::Dense(DenseMatrix::<f64>::zeros(20, 20));
        let len = Compressor::<CpuRuntime, f64>::workspace_len(&ara, &ctx, 20, 400);
        let mut work = vec![0.0; len];
        let c = ara
            .compress(&ctx, &mut tile, &BlrOptions::default(), &mut work)
            .unwrap();
        assert!(c.accepted);
        assert_eq!(c.rank, 0);
        assert_eq!(tile.nonzeros(), 0);
    }
}
