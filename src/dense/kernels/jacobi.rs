//! Plane rotations for the one-sided Jacobi SVD
//!
//! Each rotation acts on a pair of columns of a strided view. Gram sums are
//! accumulated in `f64` regardless of the element type so that `f32` tiles
//! see the same convergence test as `f64` ones.

use crate::dense::{MatMut, MatRef};
use crate::dtype::LinalgElement;

/// Entries of the 2x2 Gram matrix of a column pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnGram {
    pub pp: f64,
    pub qq: f64,
    pub pq: f64,
}

impl ColumnGram {
    /// Gram entries of columns `p` and `q` of `a`
    pub fn of<T: LinalgElement>(a: MatRef<'_, T>, p: usize, q: usize) -> Self {
        let mut g = Self {
            pp: 0.0,
            qq: 0.0,
            pq: 0.0,
        };
        for i in 0..a.rows() {
            let row = a.row(i);
            let (x, y) = (row[p].to_f64(), row[q].to_f64());
            g.pp += x * x;
            g.qq += y * y;
            g.pq += x * y;
        }
        g
    }

    /// True once the pair is orthogonal relative to `tol`, or one column
    /// has dropped below `floor`
    #[inline]
    pub fn is_settled(&self, tol: f64, floor: f64) -> bool {
        self.pp.min(self.qq) <= floor || self.pq.abs() <= tol * (self.pp * self.qq).sqrt()
    }
}

/// Plane rotation `[c s; -s c]` applied from the right to a column pair
#[derive(Debug, Clone, Copy)]
pub struct Rotation {
    pub c: f64,
    pub s: f64,
}

impl Rotation {
    /// Rotation that annihilates `gram.pq`
    ///
    /// With `zeta = (qq - pp) / (2 pq)` the smaller root
    /// `t = sign(zeta) / (|zeta| + sqrt(1 + zeta^2))` keeps the angle below
    /// pi/4, which is what makes the sweep converge.
    pub fn annihilating(gram: &ColumnGram) -> Self {
        if gram.pq == 0.0 {
            return Self { c: 1.0, s: 0.0 };
        }
        let zeta = (gram.qq - gram.pp) / (2.0 * gram.pq);
        let t = zeta.signum() / (zeta.abs() + zeta.hypot(1.0));
        let c = 1.0 / t.hypot(1.0);
        Self { c, s: t * c }
    }

    /// `[a_p, a_q] <- [c a_p - s a_q, s a_p + c a_q]`
    pub fn apply<T: LinalgElement>(&self, a: &mut MatMut<'_, T>, p: usize, q: usize) {
        let c = T::from_f64(self.c);
        let s = T::from_f64(self.s);
        for i in 0..a.rows() {
            let row = a.row_mut(i);
            let (x, y) = (row[p], row[q]);
            row[p] = c * x - s * y;
            row[q] = s * x + c * y;
        }
    }
}

/// Exchange columns `p` and `q`
pub fn swap_cols<T: LinalgElement>(a: &mut MatMut<'_, T>, p: usize, q: usize) {
    if p != q {
        for i in 0..a.rows() {
            a.row_mut(i).swap(p, q);
        }
    }
}

/// Store each column's 2-norm in `norms` and scale the column to unit length.
/// Columns whose norm does not exceed `floor` are cleared.
pub fn split_col_norms<T: LinalgElement>(a: &mut MatMut<'_, T>, floor: f64, norms: &mut [T]) {
    let cols = a.cols();
    for (j, norm) in norms.iter_mut().enumerate().take(cols) {
        let sq: f64 = (0..a.rows()).map(|i| a.at(i, j).to_f64().powi(2)).sum();
        let nrm = sq.sqrt();
        *norm = T::from_f64(nrm);
        for i in 0..a.rows() {
            let x = if nrm > floor { a.at(i, j) / *norm } else { T::zero() };
            a.set(i, j, x);
        }
    }
}
