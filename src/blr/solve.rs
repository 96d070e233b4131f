//! Forward and backward substitution with the retained B11 factors

use super::factor::BlrFactors;
use crate::dense::kernels;
use crate::dense::{DenseMatrix, Diag, MatMut, Side, UpLo};
use crate::dtype::LinalgElement;
use crate::error::{Error, Result};

impl<T: LinalgElement> BlrFactors<T> {
    /// Solve `F11 * X = B` in place, `B` being `d1 x nrhs`
    ///
    /// Runs on the host against the migrated tiles. Low-rank tiles are
    /// applied as `U * (V * X)`.
    pub fn solve_in_place(&self, mut b: MatMut<'_, T>) -> Result<()> {
        let l = &self.b11;
        let n = l.rows();
        if b.rows() != n {
            return Err(Error::shape_mismatch(&[n, b.cols()], &b.shape()));
        }
        let nrhs = b.cols();
        let rb = l.rowblocks();

        // L * Z = P * B, one block row at a time
        for i in 0..rb {
            let (r0, m) = (l.tileroff(i), l.tilerows(i));
            for k in 0..i {
                let zk = DenseMatrix::from_view(b.rb().submatrix(l.tileroff(k), 0, l.tilerows(k), nrhs)?);
                let bi = b.rb_mut().submatrix_mut(r0, 0, m, nrhs)?;
                l.tile(i, k)?.apply(T::one().neg_val(), zk.as_ref(), T::one(), bi)?;
            }
            let local = self.piv[r0..r0 + m]
                .iter()
                .map(|&p| {
                    p.checked_sub(r0).ok_or_else(|| {
                        Error::invalid_argument("piv", format!("pivot {} outside block at row {}", p, r0))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let mut bi = b.rb_mut().submatrix_mut(r0, 0, m, nrhs)?;
            kernels::laswp(bi.rb_mut(), &local, true)?;
            kernels::trsm(Side::Left, UpLo::Lower, Diag::Unit, l.tile(i, i)?.dense()?.as_ref(), bi)?;
        }

        // U * X = Z
        for i in (0..rb).rev() {
            let (r0, m) = (l.tileroff(i), l.tilerows(i));
            for j in i + 1..rb {
                let xj = DenseMatrix::from_view(b.rb().submatrix(l.tileroff(j), 0, l.tilerows(j), nrhs)?);
                let bi = b.rb_mut().submatrix_mut(r0, 0, m, nrhs)?;
                l.tile(i, j)?.apply(T::one().neg_val(), xj.as_ref(), T::one(), bi)?;
            }
            let bi = b.rb_mut().submatrix_mut(r0, 0, m, nrhs)?;
            kernels::trsm(Side::Left, UpLo::Upper, Diag::NonUnit, l.tile(i, i)?.dense()?.as_ref(), bi)?;
        }
        Ok(())
    }

    /// Solve `F11 * x = b` for a single right-hand side
    pub fn solve(&self, b: &[T]) -> Result<Vec<T>> {
        let mut x = b.to_vec();
        let n = x.len();
        self.solve_in_place(MatMut::from_slice(&mut x, n, 1)?)?;
        Ok(x)
    }
}

#[cfg(test)]
mod tests {
    use crate::blr::admissibility::Admissibility;
    use crate::blr::factor::{Front, factor_front};
    use crate::blr::options::BlrOptions;
    use crate::dense::DenseMatrix;

    #[test]
    fn test_solve_with_pivoting() {
        // Off-diagonal entries dominate inside each diagonal tile, forcing swaps
        let n = 6;
        let a = DenseMatrix::from_fn(n, n, |i, j| {
            if i / 3 == j / 3 {
                if (i + 1) % 3 == j % 3 { 10.0 } else { 1.0 + (i * n + j) as f64 * 0.01 }
            } else {
                0.1 / (1.0 + i as f64 + j as f64)
            }
        });
        let x: Vec<f64> = (0..n).map(|i| 1.0 + i as f64).collect();
        let mut b = DenseMatrix::zeros(n, 1);
        crate::dense::kernels::gemm(1.0, a.as_ref(), DenseMatrix::from_vec(n, 1, x.clone()).unwrap().as_ref(), 0.0, b.as_mut())
            .unwrap();

        let mut front = Front::from_dense(a.as_ref(), n).unwrap();
        let opts = BlrOptions::default().with_rel_tol(1e-12).with_abs_tol(1e-14);
        let factors = factor_front(&mut front, &[3, 3], &[], &Admissibility::none(2, 2), &opts).unwrap();
        assert!(factors.piv.iter().enumerate().any(|(l, &p)| p != l));

        let got = factors.solve(b.data()).unwrap();
        for (g, e) in got.iter().zip(&x) {
            assert!((g - e).abs() < 1e-9, "{} vs {}", g, e);
        }
    }

    #[test]
    fn test_solve_checks_rows() {
        let a = DenseMatrix::<f64>::identity(4);
        let mut front = Front::from_dense(a.as_ref(), 4).unwrap();
        let factors =
            factor_front(&mut front, &[2, 2], &[], &Admissibility::all(2, 2), &BlrOptions::default()).unwrap();
        assert!(factors.solve(&[1.0; 3]).is_err());
        assert_eq!(factors.solve(&[1.0, 2.0, 3.0, 4.0]).unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
    }
}
