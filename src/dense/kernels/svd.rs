//! Singular Value Decomposition using the One-Sided Jacobi algorithm

use super::jacobi::{ColumnGram, Rotation, split_col_norms, swap_cols};
use crate::dense::{MatMut, MatRef};
use crate::dtype::LinalgElement;
use crate::error::{Error, Result};

const MAX_SWEEPS: usize = 30;

/// Workspace length (in elements) needed by [`gesvdj`] for an `m x n` input
pub fn gesvdj_work_len(m: usize, n: usize) -> usize {
    let k = m.min(n);
    m.max(n) * k + k * k
}

/// Thin SVD `A = U * diag(S) * Vt` using One-Sided Jacobi
///
/// Algorithm: One-Sided Jacobi SVD
/// 1. If m < n: work on A^T and swap U↔V^T at the end
/// 2. Initialize: B = A (working copy), V = I
/// 3. REPEAT (max 30 sweeps):
///    FOR each pair (p, q) where p < q:
///      - Compute Gram elements: a_pp, a_qq, a_pq = B[:,p]·B[:,q]
///      - If |a_pq| > tol·sqrt(a_pp·a_qq): rotate B and V columns
///    Converged once a full sweep applies no rotation
/// 4. Extract: S[j] = ||B[:,j]||, U[:,j] = B[:,j]/S[j]
/// 5. Sort S descending, reorder U and V columns accordingly
///
/// # Arguments
/// * `a` - `m x n` input, not modified
/// * `s` - at least `k = min(m, n)` singular values, descending on return
/// * `u` - `m x k` left singular vectors
/// * `vt` - `k x n` right singular vectors (transposed)
/// * `work` - at least [`gesvdj_work_len`] elements
///
/// # Errors
/// `NumericalFailure` if the sweeps do not converge.
pub fn gesvdj<T: LinalgElement>(
    a: MatRef<'_, T>,
    s: &mut [T],
    mut u: MatMut<'_, T>,
    mut vt: MatMut<'_, T>,
    work: &mut [T],
) -> Result<()> {
    let (m, n) = (a.rows(), a.cols());
    let k = m.min(n);
    if u.shape() != [m, k] {
        return Err(Error::shape_mismatch(&[m, k], &u.shape()));
    }
    if vt.shape() != [k, n] {
        return Err(Error::shape_mismatch(&[k, n], &vt.shape()));
    }
    if s.len() < k {
        return Err(Error::shape_mismatch(&[k], &[s.len()]));
    }
    let needed = gesvdj_work_len(m, n);
    if work.len() < needed {
        return Err(Error::ScratchOverrun {
            pool: "gesvdj",
            requested: needed,
            available: work.len(),
        });
    }
    if k == 0 {
        return Ok(());
    }

    // Wide inputs are factored through A^T
    let transpose = m < n;
    let wm = m.max(n);
    let (bbuf, rest) = work.split_at_mut(wm * k);
    let mut b = MatMut::from_slice(bbuf, wm, k)?;
    let mut v = MatMut::from_slice(&mut rest[..k * k], k, k)?;

    for i in 0..m {
        for (j, &x) in a.row(i).iter().enumerate() {
            if transpose {
                b.set(j, i, x);
            } else {
                b.set(i, j, x);
            }
        }
    }
    v.fill(T::zero());
    for i in 0..k {
        v.set(i, i, T::one());
    }

    let eps = T::epsilon_val();
    let tol = wm as f64 * eps;
    // Columns below this squared norm carry only rounding noise
    let fro_sq: f64 = (0..wm)
        .map(|i| b.row(i).iter().map(|x| x.to_f64().powi(2)).sum::<f64>())
        .sum();
    let floor = eps * eps * fro_sq;

    let mut sweeps = 0;
    loop {
        if sweeps == MAX_SWEEPS {
            return Err(Error::numerical("gesvdj", MAX_SWEEPS as i64));
        }
        sweeps += 1;
        let mut rotated = false;
        for p in 0..k {
            for q in (p + 1)..k {
                let gram = ColumnGram::of(b.rb(), p, q);
                if gram.is_settled(tol, floor) {
                    continue;
                }
                let rot = Rotation::annihilating(&gram);
                rot.apply(&mut b, p, q);
                rot.apply(&mut v, p, q);
                rotated = true;
            }
        }
        if !rotated {
            break;
        }
    }

    split_col_norms(&mut b, eps * eps, &mut s[..k]);

    // Selection sort on S, descending, permuting B and V columns along
    for j in 0..k {
        let best = (j..k).fold(j, |best, l| if s[l] > s[best] { l } else { best });
        if best != j {
            s.swap(j, best);
            swap_cols(&mut b, j, best);
            swap_cols(&mut v, j, best);
        }
    }

    // A^T = B S V^T gives A = V S B^T
    let (left, right) = if transpose { (&v, &b) } else { (&b, &v) };
    u.copy_from(left.rb())?;
    for i in 0..k {
        for (j, x) in vt.row_mut(i).iter_mut().enumerate() {
            *x = right.at(j, i);
        }
    }
    Ok(())
}
