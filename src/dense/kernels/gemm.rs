//! General matrix multiply and diagonal scaling

use super::Side;
use crate::dense::{MatMut, MatRef};
use crate::dtype::Element;
use crate::error::{Error, Result};

/// `C = beta * C + alpha * A * B`
///
/// When `beta` is zero the previous contents of `C` are ignored, so `C` may
/// hold uninitialized scratch values.
///
/// # Arguments
/// * `a` - `m x k` operand
/// * `b` - `k x n` operand
/// * `c` - `m x n` output
pub fn gemm<T: Element>(
    alpha: T,
    a: MatRef<'_, T>,
    b: MatRef<'_, T>,
    beta: T,
    mut c: MatMut<'_, T>,
) -> Result<()> {
    let (m, k, n) = (a.rows(), a.cols(), b.cols());
    if b.rows() != k {
        return Err(Error::shape_mismatch(&[k, n], &b.shape()));
    }
    if c.shape() != [m, n] {
        return Err(Error::shape_mismatch(&[m, n], &c.shape()));
    }

    let beta_zero = beta.to_f64() == 0.0;
    let beta_one = beta.to_f64() == 1.0;
    for i in 0..m {
        let c_row = c.row_mut(i);
        if beta_zero {
            c_row.fill(T::zero());
        } else if !beta_one {
            for x in c_row.iter_mut() {
                *x = beta * *x;
            }
        }

        // ikj order: better cache locality for B
        let a_row = a.row(i);
        for (kk, &a_val) in a_row.iter().enumerate() {
            let scaled = alpha * a_val;
            if scaled.to_f64() == 0.0 {
                continue;
            }
            let b_row = b.row(kk);
            for (out, &b_val) in c_row.iter_mut().zip(b_row.iter()) {
                *out = *out + scaled * b_val;
            }
        }
    }
    Ok(())
}

/// Scale rows (`Side::Left`) or columns (`Side::Right`) of `A` by `d`
pub fn dgmm<T: Element>(side: Side, mut a: MatMut<'_, T>, d: &[T]) -> Result<()> {
    let expected = match side {
        Side::Left => a.rows(),
        Side::Right => a.cols(),
    };
    if d.len() < expected {
        return Err(Error::shape_mismatch(&[expected], &[d.len()]));
    }
    for i in 0..a.rows() {
        let row = a.row_mut(i);
        match side {
            Side::Left => {
                let s = d[i];
                for x in row.iter_mut() {
                    *x = s * *x;
                }
            }
            Side::Right => {
                for (x, &s) in row.iter_mut().zip(d.iter()) {
                    *x = s * *x;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemm_accumulate_subtract() {
        // A = [[1, 2], [3, 4]], B = [[5, 6], [7, 8]], C = ones
        let a = [1.0f64, 2.0, 3.0, 4.0];
        let b = [5.0f64, 6.0, 7.0, 8.0];
        let mut c = [1.0f64; 4];
        gemm(
            -1.0,
            MatRef::from_slice(&a, 2, 2).unwrap(),
            MatRef::from_slice(&b, 2, 2).unwrap(),
            1.0,
            MatMut::from_slice(&mut c, 2, 2).unwrap(),
        )
        .unwrap();
        assert_eq!(c, [-18.0, -21.0, -42.0, -49.0]);
    }

    #[test]
    fn test_gemm_beta_zero_ignores_garbage() {
        let a = [1.0f64, 0.0, 0.0, 1.0];
        let b = [2.0f64, 3.0, 4.0, 5.0];
        let mut c = [f64::NAN; 4];
        gemm(
            1.0,
            MatRef::from_slice(&a, 2, 2).unwrap(),
            MatRef::from_slice(&b, 2, 2).unwrap(),
            0.0,
            MatMut::from_slice(&mut c, 2, 2).unwrap(),
        )
        .unwrap();
        assert_eq!(c, b);
    }

    #[test]
    fn test_gemm_inner_dimension_zero() {
        let a: [f64; 0] = [];
        let b: [f64; 0] = [];
        let mut c = [3.0f64; 6];
        gemm(
            -1.0,
            MatRef::from_slice(&a, 2, 0).unwrap(),
            MatRef::from_slice(&b, 0, 3).unwrap(),
            1.0,
            MatMut::from_slice(&mut c, 2, 3).unwrap(),
        )
        .unwrap();
        assert_eq!(c, [3.0; 6]);
    }

    #[test]
    fn test_gemm_shape_mismatch() {
        let a = [1.0f64; 6];
        let b = [1.0f64; 6];
        let mut c = [0.0f64; 4];
        let res = gemm(
            1.0,
            MatRef::from_slice(&a, 2, 3).unwrap(),
            MatRef::from_slice(&b, 2, 3).unwrap(),
            0.0,
            MatMut::from_slice(&mut c, 2, 2).unwrap(),
        );
        assert!(res.is_err());
    }

    #[test]
    fn test_dgmm_left_right() {
        let mut a = [1.0f64, 1.0, 1.0, 1.0, 1.0, 1.0];
        dgmm(Side::Left, MatMut::from_slice(&mut a, 2, 3).unwrap(), &[2.0, 3.0]).unwrap();
        assert_eq!(a, [2.0, 2.0, 2.0, 3.0, 3.0, 3.0]);
        dgmm(Side::Right, MatMut::from_slice(&mut a, 2, 3).unwrap(), &[1.0, 0.0, -1.0]).unwrap();
        assert_eq!(a, [2.0, 0.0, -2.0, 3.0, 0.0, -3.0]);
    }
}
