//! Triangular solves with multiple right-hand sides

use super::{Diag, Side, UpLo};
use crate::dense::{MatMut, MatRef};
use crate::dtype::LinalgElement;
use crate::error::{Error, Result};

/// Solve `op(A) * X = B` (`Side::Left`) or `X * op(A) = B` (`Side::Right`)
/// in place, overwriting `B` with `X`
///
/// `A` is square and only the triangle selected by `uplo` is referenced.
/// With `Diag::Unit` the diagonal of `A` is assumed to be one.
pub fn trsm<T: LinalgElement>(
    side: Side,
    uplo: UpLo,
    diag: Diag,
    a: MatRef<'_, T>,
    mut b: MatMut<'_, T>,
) -> Result<()> {
    let n = a.rows();
    if a.cols() != n {
        return Err(Error::shape_mismatch(&[n, n], &a.shape()));
    }
    let inner = match side {
        Side::Left => b.rows(),
        Side::Right => b.cols(),
    };
    if inner != n {
        return Err(Error::shape_mismatch(&[n], &[inner]));
    }
    let unit = diag == Diag::Unit;

    match (side, uplo) {
        // Forward substitution: row i of X depends on rows 0..i
        (Side::Left, UpLo::Lower) => {
            for i in 0..n {
                for k in 0..i {
                    let l_ik = a.at(i, k);
                    if l_ik.to_f64() == 0.0 {
                        continue;
                    }
                    let (src, dst) = b.two_rows_mut(k, i);
                    for (x, &y) in dst.iter_mut().zip(src.iter()) {
                        *x = *x - l_ik * y;
                    }
                }
                if !unit {
                    scale_row(b.row_mut(i), a.at(i, i));
                }
            }
        }
        // Backward substitution: row i of X depends on rows i+1..n
        (Side::Left, UpLo::Upper) => {
            for i in (0..n).rev() {
                for k in (i + 1)..n {
                    let u_ik = a.at(i, k);
                    if u_ik.to_f64() == 0.0 {
                        continue;
                    }
                    let (src, dst) = b.two_rows_mut(k, i);
                    for (x, &y) in dst.iter_mut().zip(src.iter()) {
                        *x = *x - u_ik * y;
                    }
                }
                if !unit {
                    scale_row(b.row_mut(i), a.at(i, i));
                }
            }
        }
        // X * U = B, each row of B independently, columns left to right
        (Side::Right, UpLo::Upper) => {
            for r in 0..b.rows() {
                let row = b.row_mut(r);
                for j in 0..n {
                    if !unit {
                        row[j] = row[j] / a.at(j, j);
                    }
                    let x_j = row[j];
                    if x_j.to_f64() == 0.0 {
                        continue;
                    }
                    let u_row = a.row(j);
                    for l in (j + 1)..n {
                        row[l] = row[l] - x_j * u_row[l];
                    }
                }
            }
        }
        // X * L = B, each row of B independently, columns right to left
        (Side::Right, UpLo::Lower) => {
            for r in 0..b.rows() {
                let row = b.row_mut(r);
                for j in (0..n).rev() {
                    if !unit {
                        row[j] = row[j] / a.at(j, j);
                    }
                    let x_j = row[j];
                    if x_j.to_f64() == 0.0 {
                        continue;
                    }
                    let l_row = a.row(j);
                    for l in 0..j {
                        row[l] = row[l] - x_j * l_row[l];
                    }
                }
            }
        }
    }
    Ok(())
}

#[inline]
fn scale_row<T: LinalgElement>(row: &mut [T], d: T) {
    for x in row.iter_mut() {
        *x = *x / d;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dense::DenseMatrix;

    fn lower() -> DenseMatrix<f64> {
        DenseMatrix::from_vec(3, 3, vec![2.0, 0.0, 0.0, 1.0, 3.0, 0.0, -1.0, 2.0, 4.0]).unwrap()
    }

    fn rhs() -> DenseMatrix<f64> {
        DenseMatrix::from_fn(3, 2, |i, j| (i + 1) as f64 - j as f64 * 0.5)
    }

    #[test]
    fn test_trsm_left_lower_nonunit() {
        let l = lower();
        let b = rhs();
        let mut x = b.clone();
        trsm(Side::Left, UpLo::Lower, Diag::NonUnit, l.as_ref(), x.as_mut()).unwrap();
        let back = l.matmul(&x).unwrap();
        assert!(back.frobenius_distance(&b).unwrap() < 1e-12);
    }

    #[test]
    fn test_trsm_left_upper_nonunit() {
        let u = lower().transpose();
        let b = rhs();
        let mut x = b.clone();
        trsm(Side::Left, UpLo::Upper, Diag::NonUnit, u.as_ref(), x.as_mut()).unwrap();
        let back = u.matmul(&x).unwrap();
        assert!(back.frobenius_distance(&b).unwrap() < 1e-12);
    }

    #[test]
    fn test_trsm_right_upper_nonunit() {
        let u = lower().transpose();
        let b = rhs().transpose();
        let mut x = b.clone();
        trsm(Side::Right, UpLo::Upper, Diag::NonUnit, u.as_ref(), x.as_mut()).unwrap();
        let back = x.matmul(&u).unwrap();
        assert!(back.frobenius_distance(&b).unwrap() < 1e-12);
    }

    #[test]
    fn test_trsm_right_lower_unit_ignores_diagonal() {
        let l = lower();
        let unit_l = DenseMatrix::from_fn(3, 3, |i, j| if i == j { 1.0 } else { l.get(i, j) });
        let b = rhs().transpose();
        let mut x = b.clone();
        trsm(Side::Right, UpLo::Lower, Diag::Unit, l.as_ref(), x.as_mut()).unwrap();
        let back = x.matmul(&unit_l).unwrap();
        assert!(back.frobenius_distance(&b).unwrap() < 1e-12);
    }
}
