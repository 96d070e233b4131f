//! Variable-size batched GEMM

use crate::blr::matrix::BlrMatrix;
use crate::blr::tile::{Factor, Tile};
use crate::dense::{DenseMatrix, MatMut, MatRef};
use crate::dtype::LinalgElement;
use crate::error::{Error, Result};
use crate::runtime::{BlasOps, FactorContext, Runtime};
use crate::workspace::Region;
use rayon::prelude::*;

/// Scratch pools of a multiply batch
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Pool {
    /// First-stage products (`V * U`, `V * D`, `D * U`)
    Vu,
    /// Second-stage products of low-rank pairs
    Uvu,
}

impl Pool {
    pub fn name(self) -> &'static str {
        match self {
            Pool::Vu => "vu",
            Pool::Uvu => "uvu",
        }
    }
}

/// Tile `(row, col)` of the matrix at index `matrix` in [`BatchOperands`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TileKey {
    pub matrix: usize,
    pub row: usize,
    pub col: usize,
}

impl TileKey {
    pub fn new(matrix: usize, row: usize, col: usize) -> Self {
        Self { matrix, row, col }
    }
}

/// Input of a batched product
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    Tile(TileKey, Factor),
    Scratch(Pool, Region),
}

/// Output of a batched product
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Scratch(Pool, Region),
    /// Dense tile of a BLR matrix
    Tile(TileKey),
    /// Block of the dense update matrix starting at `(row, col)`
    Front { row: usize, col: usize },
}

/// One `C = alpha * A * B + beta * C` with `A: m x k`, `B: k x n`
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GemmOp {
    pub m: usize,
    pub n: usize,
    pub k: usize,
    pub a: Operand,
    pub b: Operand,
    pub c: Target,
}

/// Everything a batch may read or write while running
pub struct BatchOperands<'a, T> {
    pub matrices: Vec<&'a mut BlrMatrix<T>>,
    pub front: Option<&'a mut DenseMatrix<T>>,
    pub vu: &'a mut [T],
    pub uvu: &'a mut [T],
}

fn scratch<'s, T: LinalgElement>(
    buf: &'s [T],
    pool: Pool,
    region: Region,
    rows: usize,
    cols: usize,
) -> Result<MatRef<'s, T>> {
    let data = buf.get(region.range()).ok_or(Error::ScratchOverrun {
        pool: pool.name(),
        requested: region.end(),
        available: buf.len(),
    })?;
    MatRef::from_slice(data, rows, cols)
}

fn resolve<'s, T: LinalgElement>(
    matrices: &'s [&mut BlrMatrix<T>],
    vu: &'s [T],
    uvu: &'s [T],
    operand: Operand,
    rows: usize,
    cols: usize,
) -> Result<MatRef<'s, T>> {
    match operand {
        Operand::Tile(key, factor) => {
            let m: &'s BlrMatrix<T> = matrices
                .get(key.matrix)
                .ok_or_else(|| missing_matrix(key.matrix))?;
            let tile: &'s Tile<T> = m.tile(key.row, key.col)?;
            Ok(tile.factor(factor)?.as_ref())
        }
        Operand::Scratch(Pool::Vu, region) => scratch(vu, Pool::Vu, region, rows, cols),
        Operand::Scratch(Pool::Uvu, region) => scratch(uvu, Pool::Uvu, region, rows, cols),
    }
}

/// Split `buf` into the disjoint regions of `ops`' scratch targets
///
/// Regions must be registered in increasing offset order.
fn split_targets<'s, T>(
    mut buf: &'s mut [T],
    pool: Pool,
    ops: &[GemmOp],
) -> Result<Vec<&'s mut [T]>> {
    let mut out = Vec::with_capacity(ops.len());
    let mut consumed = 0;
    for op in ops {
        let region = match op.c {
            Target::Scratch(p, region) if p == pool => region,
            other => {
                return Err(Error::Internal(format!(
                    "{:?} in a batch writing to the {} pool",
                    other,
                    pool.name()
                )));
            }
        };
        if region.offset < consumed {
            return Err(Error::Internal(format!(
                "overlapping {} regions at offset {}",
                pool.name(),
                region.offset
            )));
        }
        if region.end() - consumed > buf.len() {
            return Err(Error::ScratchOverrun {
                pool: pool.name(),
                requested: region.end(),
                available: consumed + buf.len(),
            });
        }
        let rest = std::mem::take(&mut buf);
        let (_, rest) = rest.split_at_mut(region.offset - consumed);
        let (head, rest) = rest.split_at_mut(region.len);
        buf = rest;
        consumed = region.end();
        out.push(head);
    }
    Ok(out)
}

/// A group of independent multiplies issued as one call
#[derive(Clone, Debug, Default)]
pub struct VBatchedGemm {
    ops: Vec<GemmOp>,
}

impl VBatchedGemm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ops: Vec::with_capacity(capacity),
        }
    }

    pub fn add(&mut self, m: usize, n: usize, k: usize, a: Operand, b: Operand, c: Target) {
        self.ops.push(GemmOp { m, n, k, a, b, c });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[GemmOp] {
        &self.ops
    }

    /// Multiply-add count of the whole group
    pub fn flops(&self) -> usize {
        self.ops.iter().map(|op| 2 * op.m * op.n * op.k).sum()
    }

    /// Run a group whose outputs all live in scratch pool `pool`
    ///
    /// Operands may read tiles and the other pool. Products are independent
    /// and run in parallel.
    pub fn run_into_scratch<R: Runtime, T: LinalgElement>(
        &self,
        ctx: &FactorContext<R>,
        alpha: T,
        beta: T,
        matrices: &[&mut BlrMatrix<T>],
        pool: Pool,
        out: &mut [T],
        other: &[T],
    ) -> Result<()> {
        let targets = split_targets(out, pool, &self.ops)?;
        let (vu, uvu): (&[T], &[T]) = match pool {
            Pool::Vu => (&[], other),
            Pool::Uvu => (other, &[]),
        };
        self.ops
            .par_iter()
            .zip(targets)
            .try_for_each(|(op, c)| {
                let a = resolve(matrices, vu, uvu, op.a, op.m, op.k)?;
                let b = resolve(matrices, vu, uvu, op.b, op.k, op.n)?;
                let c = MatMut::from_slice(c, op.m, op.n)?;
                ctx.blas().gemm(alpha, a, b, beta, c)
            })
    }

    /// Run a group whose outputs are dense tiles or blocks of the front
    ///
    /// Products run in registration order, so several of them may
    /// accumulate into the same output.
    pub fn run_into_tiles<R: Runtime, T: LinalgElement>(
        &self,
        ctx: &FactorContext<R>,
        alpha: T,
        beta: T,
        operands: &mut BatchOperands<'_, T>,
    ) -> Result<()> {
        for op in &self.ops {
            match op.c {
                Target::Tile(key) => {
                    // Take the output tile out of its grid so the operands
                    // can borrow the same matrix
                    let matrix = operands
                        .matrices
                        .get_mut(key.matrix)
                        .ok_or_else(|| missing_matrix(key.matrix))?;
                    let mut c_tile = std::mem::take(matrix.tile_mut(key.row, key.col)?);
                    let res = c_tile
                        .dense_mut()
                        .and_then(|c| gemm_into(ctx, alpha, beta, op, &*operands, c.as_mut()));
                    *operands.matrices[key.matrix].tile_mut(key.row, key.col)? = c_tile;
                    res?;
                }
                Target::Front { row, col } => {
                    let front = operands
                        .front
                        .take()
                        .ok_or_else(|| Error::Internal("batch has no front target".into()))?;
                    let res = front
                        .block_mut(row, col, op.m, op.n)
                        .and_then(|c| gemm_into(ctx, alpha, beta, op, &*operands, c));
                    operands.front = Some(front);
                    res?;
                }
                Target::Scratch(pool, _) => {
                    return Err(Error::Internal(format!(
                        "scratch target in the {} pool of an accumulating group",
                        pool.name()
                    )));
                }
            }
        }
        Ok(())
    }
}

fn missing_matrix(index: usize) -> Error {
    Error::Internal(format!("no matrix {} in batch", index))
}

fn gemm_into<R: Runtime, T: LinalgElement>(
    ctx: &FactorContext<R>,
    alpha: T,
    beta: T,
    op: &GemmOp,
    operands: &BatchOperands<'_, T>,
    c: MatMut<'_, T>,
) -> Result<()> {
    let a = resolve(&operands.matrices, &*operands.vu, &*operands.uvu, op.a, op.m, op.k)?;
    let b = resolve(&operands.matrices, &*operands.vu, &*operands.uvu, op.b, op.k, op.n)?;
    ctx.blas().gemm(alpha, a, b, beta, c)
}
