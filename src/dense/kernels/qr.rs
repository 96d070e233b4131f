//! Thin QR decomposition using Householder reflections

use crate::dense::MatMut;
use crate::dtype::LinalgElement;
use crate::error::{Error, Result};

/// Workspace length (in elements) needed by [`geqrf_thin`]
pub fn geqrf_thin_work_len(_m: usize, n: usize) -> usize {
    n
}

/// Thin QR `A = Q * R` of a tall `m x n` matrix (`m >= n`)
///
/// `a` is overwritten with the normalized Householder vectors (column `c`
/// holds `v_c` in rows `c..m`). `q` receives the `m x n` orthonormal factor
/// and `r` the `n x n` upper triangular factor.
pub fn geqrf_thin<T: LinalgElement>(
    mut a: MatMut<'_, T>,
    mut q: MatMut<'_, T>,
    mut r: MatMut<'_, T>,
    work: &mut [T],
) -> Result<()> {
    let (m, n) = (a.rows(), a.cols());
    if m < n {
        return Err(Error::invalid_argument(
            "a",
            format!("thin QR needs rows >= cols, got {}x{}", m, n),
        ));
    }
    if q.shape() != [m, n] {
        return Err(Error::shape_mismatch(&[m, n], &q.shape()));
    }
    if r.shape() != [n, n] {
        return Err(Error::shape_mismatch(&[n, n], &r.shape()));
    }
    if work.len() < geqrf_thin_work_len(m, n) {
        return Err(Error::ScratchOverrun {
            pool: "geqrf",
            requested: n,
            available: work.len(),
        });
    }
    // work[c] = 1 if reflector c is active, 0 if column c was already zero
    let active = &mut work[..n];
    r.fill(T::zero());
    let two = T::from_f64(2.0);

    for col in 0..n {
        // Compute norm of x = A[col:m, col]
        let mut norm_sq = T::zero();
        for i in col..m {
            let val = a.at(i, col);
            norm_sq = norm_sq + val * val;
        }
        let norm_x = norm_sq.sqrt_val();

        if norm_x.to_f64() == 0.0 {
            active[col] = T::zero();
            for j in (col + 1)..n {
                r.set(col, j, a.at(col, j));
            }
            continue;
        }

        // alpha = -sign(x[0]) * ||x||, v = x - alpha * e_0
        let x0 = a.at(col, col);
        let alpha = if x0.to_f64() >= 0.0 {
            norm_x.neg_val()
        } else {
            norm_x
        };
        a.set(col, col, x0 - alpha);

        let mut v_norm_sq = T::zero();
        for i in col..m {
            let val = a.at(i, col);
            v_norm_sq = v_norm_sq + val * val;
        }
        let v_norm = v_norm_sq.sqrt_val();
        for i in col..m {
            let val = a.at(i, col);
            a.set(i, col, val / v_norm);
        }
        active[col] = T::one();
        r.set(col, col, alpha);

        // A[col:m, col+1:n] -= 2 * v @ (v^T @ A[col:m, col+1:n])
        for j in (col + 1)..n {
            let mut w = T::zero();
            for i in col..m {
                w = w + a.at(i, col) * a.at(i, j);
            }
            let w2 = two * w;
            for i in col..m {
                let val = a.at(i, j) - w2 * a.at(i, col);
                a.set(i, j, val);
            }
            r.set(col, j, a.at(col, j));
        }
    }

    // Q = H_0 H_1 ... H_{n-1} [I_n; 0], accumulated right to left
    q.fill(T::zero());
    for i in 0..n {
        q.set(i, i, T::one());
    }
    for col in (0..n).rev() {
        if active[col].to_f64() == 0.0 {
            continue;
        }
        for j in 0..n {
            let mut w = T::zero();
            for i in col..m {
                w = w + a.at(i, col) * q.at(i, j);
            }
            if w.to_f64() == 0.0 {
                continue;
            }
            let w2 = two * w;
            for i in col..m {
                let val = q.at(i, j) - w2 * a.at(i, col);
                q.set(i, j, val);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dense::DenseMatrix;

    #[test]
    fn test_geqrf_thin_reconstructs() {
        let a = DenseMatrix::from_fn(5, 3, |i, j| 1.0 / ((i + j + 1) as f64) + (i == j) as u8 as f64);
        let mut h = a.clone();
        let mut q = DenseMatrix::zeros(5, 3);
        let mut r = DenseMatrix::zeros(3, 3);
        let mut work = vec![0.0; 3];
        geqrf_thin(h.as_mut(), q.as_mut(), r.as_mut(), &mut work).unwrap();

        let back = q.matmul(&r).unwrap();
        assert!(back.frobenius_distance(&a).unwrap() < 1e-12);

        let qtq = q.transpose().matmul(&q).unwrap();
        assert!(qtq.frobenius_distance(&DenseMatrix::identity(3)).unwrap() < 1e-12);
        for i in 0..3 {
            for j in 0..i {
                assert_eq!(r.get(i, j), 0.0);
            }
        }
    }

    #[test]
    fn test_geqrf_thin_zero_column() {
        let a = DenseMatrix::from_vec(3, 2, vec![0.0, 1.0, 0.0, 2.0, 0.0, 2.0]).unwrap();
        let mut h = a.clone();
        let mut q = DenseMatrix::zeros(3, 2);
        let mut r = DenseMatrix::zeros(2, 2);
        let mut work = vec![0.0; 2];
        geqrf_thin(h.as_mut(), q.as_mut(), r.as_mut(), &mut work).unwrap();
        let back = q.matmul(&r).unwrap();
        assert!(back.frobenius_distance(&a).unwrap() < 1e-12);
    }

    #[test]
    fn test_geqrf_thin_rejects_wide() {
        let mut h = DenseMatrix::<f64>::zeros(2, 3);
        let mut q = DenseMatrix::zeros(2, 3);
        let mut r = DenseMatrix::zeros(3, 3);
        let mut work = vec![0.0; 3];
        assert!(geqrf_thin(h.as_mut(), q.as_mut(), r.as_mut(), &mut work).is_err());
    }
}
