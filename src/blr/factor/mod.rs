//! Construction and partial LU factorization of a BLR front
//!
//! A front is split into four dense quadrants
//!
//! ```text
//!     [ F11  F12 ]   d1
//!     [ F21  F22 ]   d2
//!       d1   d2
//! ```
//!
//! [`construct_and_partial_factor`] tiles F11, F12 and F21 into the BLR
//! matrices B11, B12 and B21, eliminates B11 block by block with partial
//! pivoting inside each diagonal tile, compresses the off-diagonal tiles
//! as they become final, and subtracts the Schur complement `B21 * B12`
//! from F22.
//!
//! Per diagonal block `i`:
//!
//! 1. `getrf` on the dense tile `B11(i, i)`,
//! 2. for `j > i`: compress `B11(i, j)` if admissible, permute it by the
//!    block pivots and solve with the unit lower factor,
//! 3. for `j > i`: compress `B11(j, i)` if admissible and solve with the
//!    upper factor from the right,
//! 4. the same for every tile of block row `i` of B12 and block column `i`
//!    of B21, which are always offered to the compressor,
//! 5. one batched multiply-accumulate over the trailing tiles.

mod schedule;
mod schur;

use super::admissibility::Admissibility;
use super::batch::{BatchOperands, MultiplyBatch};
use super::compress::{Compressor, compressor_for};
use super::matrix::BlrMatrix;
use super::options::BlrOptions;
use crate::dense::{DenseMatrix, Diag, MatRef, Side, UpLo};
use crate::dtype::LinalgElement;
use crate::error::{Error, Result};
use crate::runtime::cpu::CpuRuntime;
use crate::runtime::{Device, DeviceMemory, FactorContext, HostMemory, Runtime, SolverOps, Stream};
use schedule::{B11, B12, B21};

/// Dense quadrants of a front
///
/// F11 is `d1 x d1`, F12 `d1 x d2`, F21 `d2 x d1` and F22 `d2 x d2`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Front<T> {
    pub f11: DenseMatrix<T>,
    pub f12: DenseMatrix<T>,
    pub f21: DenseMatrix<T>,
    pub f22: DenseMatrix<T>,
}

impl<T: LinalgElement> Front<T> {
    pub fn new(
        f11: DenseMatrix<T>,
        f12: DenseMatrix<T>,
        f21: DenseMatrix<T>,
        f22: DenseMatrix<T>,
    ) -> Result<Self> {
        let (d1, d2) = (f11.rows(), f22.rows());
        let expected = [[d1, d1], [d1, d2], [d2, d1], [d2, d2]];
        for (m, shape) in [&f11, &f12, &f21, &f22].into_iter().zip(expected) {
            if m.shape() != shape {
                return Err(Error::shape_mismatch(&shape, &m.shape()));
            }
        }
        Ok(Self { f11, f12, f21, f22 })
    }

    /// Split a square matrix after its first `d1` rows and columns
    pub fn from_dense(a: MatRef<'_, T>, d1: usize) -> Result<Self> {
        let n = a.rows();
        if a.cols() != n || d1 > n {
            return Err(Error::invalid_argument(
                "d1",
                format!("cannot split a {}x{} matrix at {}", n, a.cols(), d1),
            ));
        }
        let d2 = n - d1;
        Self::new(
            DenseMatrix::from_view(a.submatrix(0, 0, d1, d1)?),
            DenseMatrix::from_view(a.submatrix(0, d1, d1, d2)?),
            DenseMatrix::from_view(a.submatrix(d1, 0, d2, d1)?),
            DenseMatrix::from_view(a.submatrix(d1, d1, d2, d2)?),
        )
    }

    pub fn d1(&self) -> usize {
        self.f11.rows()
    }

    /// Order of the update block
    pub fn d2(&self) -> usize {
        self.f22.rows()
    }
}

/// Factors retained from a partially factored front
///
/// B11 holds `L` and `U` of the eliminated block (unit lower part below the
/// diagonal of each diagonal tile), B12 holds `L^-1 * P * F12` and B21 holds
/// `F21 * U^-1`. `piv` lists the sequential row interchanges of each
/// diagonal tile, offset to front-local rows.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlrFactors<T> {
    pub b11: BlrMatrix<T>,
    pub b12: BlrMatrix<T>,
    pub b21: BlrMatrix<T>,
    pub piv: Vec<usize>,
}

impl<T: LinalgElement> BlrFactors<T> {
    /// Stored elements of all retained tiles
    pub fn nonzeros(&self) -> usize {
        self.b11.nonzeros() + self.b12.nonzeros() + self.b21.nonzeros()
    }

    /// Number of tiles kept as low-rank
    pub fn low_rank_tiles(&self) -> usize {
        self.b11.low_rank_tiles() + self.b12.low_rank_tiles() + self.b21.low_rank_tiles()
    }

    pub fn max_rank(&self) -> usize {
        self.b11
            .max_rank()
            .max(self.b12.max_rank())
            .max(self.b21.max_rank())
    }
}

fn check_tiles(name: &'static str, tiles: &[usize], n: usize) -> Result<()> {
    let total: usize = tiles.iter().sum();
    if total != n {
        return Err(Error::invalid_argument(
            name,
            format!("block sizes sum to {}, expected {}", total, n),
        ));
    }
    if tiles.contains(&0) {
        return Err(Error::invalid_argument(name, "empty block"));
    }
    Ok(())
}

/// Tile the front into BLR matrices, factor B11 and update F22
///
/// `tiles1` partitions the `d1` eliminated rows and columns, `tiles2` the
/// `d2` rows and columns of the update block. `admissible` is a
/// `tiles1.len() x tiles1.len()` grid selecting the B11 tiles that may be
/// compressed.
///
/// On return F11 is released, as are F12 and F21 when `d2 > 0`; F22 holds
/// the updated Schur complement. All retained tiles have been migrated to
/// host. Any failure aborts the call and drops the partially built factors.
pub fn construct_and_partial_factor<R, T, C>(
    ctx: &FactorContext<R>,
    compressor: &C,
    front: &mut Front<T>,
    tiles1: &[usize],
    tiles2: &[usize],
    admissible: &Admissibility,
    opts: &BlrOptions,
) -> Result<BlrFactors<T>>
where
    R: Runtime,
    T: LinalgElement,
    C: Compressor<R, T> + ?Sized,
{
    opts.validate()?;
    let (d1, d2) = (front.d1(), front.d2());
    check_tiles("tiles1", tiles1, d1)?;
    check_tiles("tiles2", tiles2, d2)?;
    let (rb, rb2) = (tiles1.len(), tiles2.len());
    if admissible.rows() != rb || admissible.cols() != rb {
        return Err(Error::shape_mismatch(
            &[rb, rb],
            &[admissible.rows(), admissible.cols()],
        ));
    }

    let mut b11 = BlrMatrix::from_dense(front.f11.as_ref(), tiles1, tiles1)?;
    let mut b12 = BlrMatrix::from_dense(front.f12.as_ref(), tiles1, tiles2)?;
    let mut b21 = BlrMatrix::from_dense(front.f21.as_ref(), tiles2, tiles1)?;

    let max1 = tiles1.iter().copied().max().unwrap_or(0);
    let max2 = tiles2.iter().copied().max().unwrap_or(0);
    let max_dim = max1.max(max2);
    let max_mn = max1 * max_dim;

    let allocator = ctx.allocator();
    let work_len = compressor.workspace_len(ctx, max_dim, max_mn);
    let mut work = DeviceMemory::<T, _>::zeroed(&allocator, work_len)?;
    let mut piv = vec![0usize; d1];
    log::debug!(
        "partial factor: d1={} d2={} blocks={}+{} {:?} workspace={}",
        d1,
        d2,
        rb,
        rb2,
        compressor.algorithm(),
        work_len
    );

    for i in 0..rb {
        let (r0, r1) = (b11.tileroff(i), b11.tileroff(i + 1));
        let block_piv = &mut piv[r0..r1];
        let info = ctx
            .solver()
            .getrf(b11.tile_mut(i, i)?.dense_mut()?.as_mut(), block_piv)?;
        if info > 0 {
            log::warn!("zero pivot at front row {} in diagonal block {}", r0 + info - 1, i);
        }
        let block_piv = &piv[r0..r1];

        for j in i + 1..rb {
            if admissible.get(i, j) {
                compressor.compress(ctx, b11.tile_mut(i, j)?, opts, &mut work)?;
            }
            let (diag, tile) = b11.tile_pair_mut((i, i), (i, j))?;
            tile.laswp(ctx, block_piv, true)?;
            tile.trsm(ctx, Side::Left, UpLo::Lower, Diag::Unit, diag)?;
        }
        for j in i + 1..rb {
            if admissible.get(j, i) {
                compressor.compress(ctx, b11.tile_mut(j, i)?, opts, &mut work)?;
            }
            let (diag, tile) = b11.tile_pair_mut((i, i), (j, i))?;
            tile.trsm(ctx, Side::Right, UpLo::Upper, Diag::NonUnit, diag)?;
        }
        for j in 0..rb2 {
            let tile = b12.tile_mut(i, j)?;
            compressor.compress(ctx, tile, opts, &mut work)?;
            tile.laswp(ctx, block_piv, true)?;
            tile.trsm(ctx, Side::Left, UpLo::Lower, Diag::Unit, b11.tile(i, i)?)?;

            let tile = b21.tile_mut(j, i)?;
            compressor.compress(ctx, tile, opts, &mut work)?;
            tile.trsm(ctx, Side::Right, UpLo::Upper, Diag::NonUnit, b11.tile(i, i)?)?;
        }

        let triples = schedule::trailing(i, rb, rb2);
        if triples.is_empty() {
            continue;
        }
        let sizes = schedule::size(&[&b11, &b12, &b21], &triples)?;
        let mut vu = DeviceMemory::<T, _>::zeroed(&allocator, sizes.vu)?;
        let mut uvu = DeviceMemory::<T, _>::zeroed(&allocator, sizes.uvu)?;
        let mut batch = MultiplyBatch::new(&sizes);
        schedule::populate(&[&b11, &b12, &b21], &triples, &mut batch)?;
        log::trace!(
            "trailing update {}: {} products, {} flops",
            i,
            batch.len(),
            batch.flops()
        );

        let mut matrices = Vec::with_capacity(3);
        matrices.insert(B11, &mut b11);
        matrices.insert(B12, &mut b12);
        matrices.insert(B21, &mut b21);
        batch.run(
            ctx,
            &mut BatchOperands {
                matrices,
                front: None,
                vu: &mut vu[..],
                uvu: &mut uvu[..],
            },
        )?;
        ctx.comp_stream().synchronize()?;
    }

    log::debug!(
        "partial factor: B11 has {} low-rank tiles, max rank {}",
        b11.low_rank_tiles(),
        b11.max_rank()
    );
    ctx.device().synchronize()?;

    let staging_len = b11
        .max_factor_len()
        .max(b12.max_factor_len())
        .max(b21.max_factor_len());
    let mut staging = HostMemory::zeroed(staging_len)?;
    if rb2 > 0 {
        schur::update(ctx, &mut b11, &mut b12, &mut b21, &mut front.f22, &mut staging)?;
    } else {
        b11.move_to_host(ctx, &mut staging)?;
    }
    ctx.device().synchronize()?;

    for i in 0..rb {
        let off = b11.tileroff(i);
        for p in &mut piv[off..b11.tileroff(i + 1)] {
            *p += off;
        }
    }
    b12.move_to_host(ctx, &mut staging)?;
    b21.move_to_host(ctx, &mut staging)?;
    ctx.device().synchronize()?;

    front.f11.clear();
    if d2 > 0 {
        front.f12.clear();
        front.f21.clear();
    }

    let factors = BlrFactors { b11, b12, b21, piv };
    let dense_len = d1 * d1 + 2 * d1 * d2;
    log::debug!(
        "partial factor done: {} low-rank tiles, max rank {}, {} of {} entries stored",
        factors.low_rank_tiles(),
        factors.max_rank(),
        factors.nonzeros(),
        dense_len
    );
    Ok(factors)
}

/// [`construct_and_partial_factor`] on the default CPU device with the
/// backend selected by `opts.compression`
pub fn factor_front<T: LinalgElement>(
    front: &mut Front<T>,
    tiles1: &[usize],
    tiles2: &[usize],
    admissible: &Admissibility,
    opts: &BlrOptions,
) -> Result<BlrFactors<T>> {
    let device = CpuRuntime::default_device();
    let ctx = FactorContext::<CpuRuntime>::new(&device)?;
    let compressor = compressor_for::<CpuRuntime, T>(opts);
    construct_and_partial_factor(&ctx, compressor.as_ref(), front, tiles1, tiles2, admissible, opts)
}
