//! LU factorization with partial pivoting and row interchanges

use crate::dense::MatMut;
use crate::dtype::LinalgElement;
use crate::error::{Error, Result};

/// In-place LU decomposition with partial pivoting (Doolittle algorithm)
///
/// On return `A` holds `L` (unit diagonal, strictly below) and `U` (on and
/// above the diagonal) such that `P * A = L * U`. `piv[c]` is the row that was
/// interchanged with row `c` at step `c` (0-based, sequential interchanges).
///
/// Returns `info`: 0 on success, or `c + 1` where `c` is the first column with
/// an exactly zero pivot. Elimination continues past zero pivots (the column
/// is left unscaled), so the caller decides whether that is fatal.
pub fn getrf<T: LinalgElement>(mut a: MatMut<'_, T>, piv: &mut [usize]) -> Result<usize> {
    let (m, n) = (a.rows(), a.cols());
    let k = m.min(n);
    if piv.len() < k {
        return Err(Error::shape_mismatch(&[k], &[piv.len()]));
    }
    let mut info = 0usize;

    for col in 0..k {
        // Find pivot: max absolute value in column col, rows col..m
        let mut pivot_row = col;
        let mut max_val = a.at(col, col).abs_val();
        for row in (col + 1)..m {
            let val = a.at(row, col).abs_val();
            if val > max_val {
                max_val = val;
                pivot_row = row;
            }
        }
        piv[col] = pivot_row;

        if pivot_row != col {
            let (r0, r1) = a.two_rows_mut(col, pivot_row);
            r0.swap_with_slice(r1);
        }

        let pivot = a.at(col, col);
        if pivot.to_f64() == 0.0 {
            if info == 0 {
                info = col + 1;
            }
            continue;
        }

        // Compute multipliers (L column) and update the trailing submatrix
        for row in (col + 1)..m {
            let (prow, trow) = a.two_rows_mut(col, row);
            let multiplier = trow[col] / pivot;
            trow[col] = multiplier;
            if multiplier.to_f64() == 0.0 {
                continue;
            }
            for j in (col + 1)..n {
                trow[j] = trow[j] - multiplier * prow[j];
            }
        }
    }
    Ok(info)
}

/// Apply the row interchanges recorded by [`getrf`]
///
/// With `forward` the interchanges are applied in order `0..piv.len()`
/// (computing `P * A`), otherwise in reverse (computing `P^T * A`).
pub fn laswp<T: LinalgElement>(mut a: MatMut<'_, T>, piv: &[usize], forward: bool) -> Result<()> {
    let m = a.rows();
    if let Some(&bad) = piv.iter().find(|&&p| p >= m) {
        return Err(Error::invalid_argument(
            "piv",
            format!("pivot row {} out of range for {} rows", bad, m),
        ));
    }
    if piv.len() > m {
        return Err(Error::shape_mismatch(&[m], &[piv.len()]));
    }
    let mut swap = |i: usize, p: usize| {
        if p != i {
            let (r0, r1) = a.two_rows_mut(i, p);
            r0.swap_with_slice(r1);
        }
    };
    if forward {
        for (i, &p) in piv.iter().enumerate() {
            swap(i, p);
        }
    } else {
        for (i, &p) in piv.iter().enumerate().rev() {
            swap(i, p);
        }
    }
    Ok(())
}
