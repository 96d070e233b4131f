//! Batched multiply-accumulate over mixed dense/low-rank tiles
//!
//! Updates of the form `C -= A * B` over many independent tile triples are
//! staged through three batched GEMM groups:
//!
//! | pair        | group 1 (into `vu`)  | group 2 (into `uvu`)    | group 3 (into `C`)   |
//! |-------------|----------------------|-------------------------|----------------------|
//! | `D * D`     |                      |                         | `C -= D_A * D_B`     |
//! | `D * UV`    | `W = D_A * U_B`      |                         | `C -= W * V_B`       |
//! | `UV * D`    | `W = V_A * D_B`      |                         | `C -= U_A * W`       |
//! | `UV * UV`   | `W = V_A * U_B`      | `U_A * W` or `W * V_B`  | `C -= ... * V_B` or `U_A * ...` |
//!
//! For a low-rank pair the second stage keeps whichever intermediate is
//! smaller: `U_A * W` (`rows(A) x rank(B)`) when `rank(B) < rank(A)`,
//! otherwise `W * V_B` (`rank(A) x cols(B)`).
//!
//! Scratch is sized exactly by a first pass ([`multiply_inc_work_size`])
//! and carved by a second pass ([`MultiplyBatch::add_tile_mult`]). Both
//! passes must visit the pairs in the same order; debug builds record the
//! per-pair increments of the first pass and reject a second pass that
//! diverges from it.

mod vbatched;

pub use vbatched::{BatchOperands, GemmOp, Operand, Pool, Target, TileKey, VBatchedGemm};

use super::tile::{Factor, Tile};
use crate::dtype::{Element, LinalgElement};
use crate::error::{Error, Result};
use crate::runtime::{FactorContext, Runtime};
use crate::workspace::RegionArena;

/// Scratch sizes of one batch, accumulated pair by pair
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkSize {
    /// Elements of first-stage products
    pub vu: usize,
    /// Elements of second-stage products
    pub uvu: usize,
    /// Products queued in groups 1, 2 and 3
    pub ops: [usize; 3],
    #[cfg(debug_assertions)]
    ledger: Vec<(usize, usize)>,
}

impl WorkSize {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total scratch elements
    pub fn total(&self) -> usize {
        self.vu + self.uvu
    }

    /// Number of pairs sized so far
    #[cfg(debug_assertions)]
    pub fn pairs(&self) -> usize {
        self.ledger.len()
    }

    /// Element-wise maximum capacity over several batches
    pub fn max_capacity<'a>(sizes: impl IntoIterator<Item = &'a WorkSize>) -> (usize, usize) {
        sizes
            .into_iter()
            .fold((0, 0), |(vu, uvu), w| (vu.max(w.vu), uvu.max(w.uvu)))
    }
}

/// Scratch increments of `A * B`: `(vu, uvu)`
fn increments<T: Element>(a: &Tile<T>, b: &Tile<T>) -> (usize, usize) {
    match (a.is_low_rank(), b.is_low_rank()) {
        (true, true) => {
            let (ra, rb) = (a.rank(), b.rank());
            let second = if rb < ra { a.rows() * rb } else { ra * b.cols() };
            (ra * rb, second)
        }
        (true, false) => (a.rank() * b.cols(), 0),
        (false, true) => (a.rows() * b.rank(), 0),
        (false, false) => (0, 0),
    }
}

/// Sizing pass: add the scratch needed by `A * B` to `work`
pub fn multiply_inc_work_size<T: Element>(a: &Tile<T>, b: &Tile<T>, work: &mut WorkSize) {
    let (vu, uvu) = increments(a, b);
    work.vu += vu;
    work.uvu += uvu;
    let low_rank = usize::from(a.is_low_rank()) + usize::from(b.is_low_rank());
    work.ops[0] += usize::from(low_rank > 0);
    work.ops[1] += usize::from(low_rank == 2);
    work.ops[2] += 1;
    #[cfg(debug_assertions)]
    work.ledger.push((vu, uvu));
}

/// The three groups of one multiply-accumulate batch and their scratch
#[derive(Clone, Debug)]
pub struct MultiplyBatch {
    g1: VBatchedGemm,
    g2: VBatchedGemm,
    g3: VBatchedGemm,
    vu: RegionArena,
    uvu: RegionArena,
    registered: usize,
    #[cfg(debug_assertions)]
    expected: Vec<(usize, usize)>,
}

impl MultiplyBatch {
    /// Batch whose scratch is exactly `work`
    pub fn new(work: &WorkSize) -> Self {
        Self::with_capacity(work, work.vu, work.uvu)
    }

    /// Batch following the schedule of `work` inside larger scratch pools
    pub fn with_capacity(work: &WorkSize, vu_capacity: usize, uvu_capacity: usize) -> Self {
        Self {
            g1: VBatchedGemm::with_capacity(work.ops[0]),
            g2: VBatchedGemm::with_capacity(work.ops[1]),
            g3: VBatchedGemm::with_capacity(work.ops[2]),
            vu: RegionArena::new(Pool::Vu.name(), vu_capacity),
            uvu: RegionArena::new(Pool::Uvu.name(), uvu_capacity),
            registered: 0,
            #[cfg(debug_assertions)]
            expected: work.ledger.clone(),
        }
    }

    /// Number of registered pairs
    pub fn len(&self) -> usize {
        self.registered
    }

    pub fn is_empty(&self) -> bool {
        self.registered == 0
    }

    /// Groups 1, 2 and 3
    pub fn groups(&self) -> [&VBatchedGemm; 3] {
        [&self.g1, &self.g2, &self.g3]
    }

    /// Floating point operations of all three groups
    pub fn flops(&self) -> usize {
        self.groups().iter().map(|g| g.flops()).sum()
    }

    /// Scratch elements used so far: `(vu, uvu)`
    pub fn used(&self) -> (usize, usize) {
        (self.vu.used(), self.uvu.used())
    }

    /// Populate pass: register `C -= A * B`
    ///
    /// `a` and `b` are only inspected for their kind and shape; the products
    /// read them through their keys when the batch runs.
    pub fn add_tile_mult<T: Element>(
        &mut self,
        a: &Tile<T>,
        a_key: TileKey,
        b: &Tile<T>,
        b_key: TileKey,
        c: Target,
    ) -> Result<()> {
        if a.cols() != b.rows() {
            return Err(Error::shape_mismatch(&[a.cols(), b.cols()], &[b.rows(), b.cols()]));
        }
        let inc = increments(a, b);
        #[cfg(debug_assertions)]
        {
            let expected = self.expected.get(self.registered).copied();
            if expected != Some(inc) {
                return Err(Error::ScheduleMismatch {
                    index: self.registered,
                    expected: expected.unwrap_or_default(),
                    got: inc,
                });
            }
        }

        let (m, n) = (a.rows(), b.cols());
        let tile = |key, factor| Operand::Tile(key, factor);
        match (a.is_low_rank(), b.is_low_rank()) {
            (true, true) => {
                let (ra, rb) = (a.rank(), b.rank());
                let d1 = self.vu.alloc(ra * rb)?;
                let w1 = Operand::Scratch(Pool::Vu, d1);
                self.g1.add(
                    ra,
                    rb,
                    a.cols(),
                    tile(a_key, Factor::V),
                    tile(b_key, Factor::U),
                    Target::Scratch(Pool::Vu, d1),
                );
                if rb < ra {
                    let d2 = self.uvu.alloc(m * rb)?;
                    self.g2.add(m, rb, ra, tile(a_key, Factor::U), w1, Target::Scratch(Pool::Uvu, d2));
                    self.g3.add(m, n, rb, Operand::Scratch(Pool::Uvu, d2), tile(b_key, Factor::V), c);
                } else {
                    let d2 = self.uvu.alloc(ra * n)?;
                    self.g2.add(ra, n, rb, w1, tile(b_key, Factor::V), Target::Scratch(Pool::Uvu, d2));
                    self.g3.add(m, n, ra, tile(a_key, Factor::U), Operand::Scratch(Pool::Uvu, d2), c);
                }
            }
            (true, false) => {
                let ra = a.rank();
                let d1 = self.vu.alloc(ra * n)?;
                self.g1.add(
                    ra,
                    n,
                    a.cols(),
                    tile(a_key, Factor::V),
                    tile(b_key, Factor::Dense),
                    Target::Scratch(Pool::Vu, d1),
                );
                self.g3.add(m, n, ra, tile(a_key, Factor::U), Operand::Scratch(Pool::Vu, d1), c);
            }
            (false, true) => {
                let rb = b.rank();
                let d1 = self.vu.alloc(m * rb)?;
                self.g1.add(
                    m,
                    rb,
                    a.cols(),
                    tile(a_key, Factor::Dense),
                    tile(b_key, Factor::U),
                    Target::Scratch(Pool::Vu, d1),
                );
                self.g3.add(m, n, rb, Operand::Scratch(Pool::Vu, d1), tile(b_key, Factor::V), c);
            }
            (false, false) => {
                self.g3.add(m, n, a.cols(), tile(a_key, Factor::Dense), tile(b_key, Factor::Dense), c);
            }
        }
        self.registered += 1;
        Ok(())
    }

    /// Execute the three groups: two reductions into scratch, then the
    /// subtractive accumulation into the outputs
    pub fn run<R: Runtime, T: LinalgElement>(
        &self,
        ctx: &FactorContext<R>,
        operands: &mut BatchOperands<'_, T>,
    ) -> Result<()> {
        #[cfg(debug_assertions)]
        if self.registered != self.expected.len() {
            return Err(Error::ScheduleMismatch {
                index: self.registered,
                expected: self.expected.get(self.registered).copied().unwrap_or_default(),
                got: (0, 0),
            });
        }
        self.g1.run_into_scratch(
            ctx,
            T::one(),
            T::zero(),
            &operands.matrices,
            Pool::Vu,
            operands.vu,
            &[],
        )?;
        self.g2.run_into_scratch(
            ctx,
            T::one(),
            T::zero(),
            &operands.matrices,
            Pool::Uvu,
            operands.uvu,
            &*operands.vu,
        )?;
        self.g3.run_into_tiles(ctx, T::one().neg_val(), T::one(), operands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dense::DenseMatrix;

    fn lr(m: usize, n: usize, r: usize) -> Tile<f64> {
        Tile::low_rank(DenseMatrix::zeros(m, r), DenseMatrix::zeros(r, n)).unwrap()
    }

    fn dense(m: usize, n: usize) -> Tile<f64> {
        Tile::Dense(DenseMatrix::zeros(m, n))
    }

    #[test]
    fn test_work_size_cases() {
        let mut w = WorkSize::new();
        multiply_inc_work_size(&dense(4, 5), &dense(5, 6), &mut w);
        assert_eq!((w.vu, w.uvu), (0, 0));
        multiply_inc_work_size(&dense(4, 5), &lr(5, 6, 2), &mut w);
        assert_eq!((w.vu, w.uvu), (8, 0));
        multiply_inc_work_size(&lr(4, 5, 3), &dense(5, 6), &mut w);
        assert_eq!((w.vu, w.uvu), (26, 0));
        // rank(B) < rank(A): U_A * W is rows(A) x rank(B)
        multiply_inc_work_size(&lr(4, 5, 3), &lr(5, 6, 2), &mut w);
        assert_eq!((w.vu, w.uvu), (32, 8));
        // rank(B) >= rank(A): W * V_B is rank(A) x cols(B)
        multiply_inc_work_size(&lr(4, 5, 2), &lr(5, 6, 2), &mut w);
        assert_eq!((w.vu, w.uvu), (36, 20));
        assert_eq!(w.total(), 56);
        assert_eq!(w.ops, [4, 2, 5]);
    }

    #[test]
    fn test_flops_count_every_group() {
        let (a, b) = (lr(4, 5, 3), lr(5, 6, 2));
        let mut w = WorkSize::new();
        multiply_inc_work_size(&a, &b, &mut w);
        multiply_inc_work_size(&dense(4, 5), &dense(5, 6), &mut w);
        let mut batch = MultiplyBatch::new(&w);
        let key = TileKey::new(0, 0, 0);
        let target = Target::Front { row: 0, col: 0 };
        batch.add_tile_mult(&a, key, &b, key, target).unwrap();
        batch.add_tile_mult(&dense(4, 5), key, &dense(5, 6), key, target).unwrap();
        // V_A U_B: 3x2x5, U_A W: 4x2x3, then 4x6x2 and the dense 4x6x5
        assert_eq!(batch.flops(), 2 * (30 + 24 + 48 + 120));
        let [g1, g2, g3] = batch.groups();
        assert_eq!([g1.len(), g2.len(), g3.len()], w.ops);
    }

    #[test]
    fn test_populate_uses_exact_scratch() {
        let pairs = [
            (lr(4, 5, 3), lr(5, 6, 2)),
            (dense(4, 5), lr(5, 6, 1)),
            (lr(4, 5, 1), dense(5, 6)),
            (dense(4, 5), dense(5, 6)),
        ];
        let mut w = WorkSize::new();
        for (a, b) in &pairs {
            multiply_inc_work_size(a, b, &mut w);
        }
        let mut batch = MultiplyBatch::new(&w);
        for (idx, (a, b)) in pairs.iter().enumerate() {
            let key = TileKey::new(0, idx, 0);
            batch
                .add_tile_mult(a, key, b, key, Target::Tile(TileKey::new(1, idx, 0)))
                .unwrap();
        }
        assert_eq!(batch.used(), (w.vu, w.uvu));
        let [g1, g2, g3] = batch.groups();
        assert_eq!((g1.len(), g2.len(), g3.len()), (3, 1, 4));
    }

    #[test]
    fn test_undersized_pool_overruns() {
        let w = WorkSize::new();
        let mut batch = MultiplyBatch::with_capacity(&w, 0, 0);
        let key = TileKey::new(0, 0, 0);
        let err = batch
            .add_tile_mult(&lr(4, 5, 2), key, &dense(5, 6), key, Target::Front { row: 0, col: 0 })
            .unwrap_err();
        if cfg!(debug_assertions) {
            assert!(matches!(err, Error::ScheduleMismatch { index: 0, .. }));
        } else {
            assert!(matches!(err, Error::ScratchOverrun { pool: "vu", .. }));
        }
    }
}
