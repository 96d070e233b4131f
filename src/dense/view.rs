//! Strided matrix views

use crate::dtype::Element;
use crate::error::{Error, Result};

/// Number of elements a `rows x cols` view with row stride `ld` spans
#[inline]
pub fn required_len(rows: usize, cols: usize, ld: usize) -> usize {
    if rows == 0 || cols == 0 {
        0
    } else {
        (rows - 1) * ld + cols
    }
}

/// Immutable row-major view
#[derive(Clone, Copy, Debug)]
pub struct MatRef<'a, T> {
    data: &'a [T],
    rows: usize,
    cols: usize,
    ld: usize,
}

/// Mutable row-major view
#[derive(Debug)]
pub struct MatMut<'a, T> {
    data: &'a mut [T],
    rows: usize,
    cols: usize,
    ld: usize,
}

fn check_view(len: usize, rows: usize, cols: usize, ld: usize) -> Result<()> {
    if cols > ld && rows > 1 {
        return Err(Error::invalid_argument(
            "ld",
            format!("row stride {} is smaller than {} columns", ld, cols),
        ));
    }
    let needed = required_len(rows, cols, ld);
    if needed > len {
        return Err(Error::shape_mismatch(&[needed], &[len]));
    }
    Ok(())
}

impl<'a, T: Element> MatRef<'a, T> {
    /// Create a view over `data` with the given shape and row stride
    pub fn new(data: &'a [T], rows: usize, cols: usize, ld: usize) -> Result<Self> {
        check_view(data.len(), rows, cols, ld)?;
        Ok(Self {
            data,
            rows,
            cols,
            ld,
        })
    }

    /// Contiguous view (`ld == cols`)
    pub fn from_slice(data: &'a [T], rows: usize, cols: usize) -> Result<Self> {
        Self::new(data, rows, cols, cols.max(1))
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn ld(&self) -> usize {
        self.ld
    }

    #[inline]
    pub fn shape(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    /// Element at (i, j)
    #[inline]
    pub fn at(&self, i: usize, j: usize) -> T {
        self.data[i * self.ld + j]
    }

    /// Row `i` as a contiguous slice of `cols` elements
    #[inline]
    pub fn row(&self, i: usize) -> &'a [T] {
        if self.cols == 0 {
            return &[];
        }
        let start = i * self.ld;
        &self.data[start..start + self.cols]
    }

    /// Sub-block starting at (r0, c0)
    pub fn submatrix(self, r0: usize, c0: usize, rows: usize, cols: usize) -> Result<Self> {
        if r0 + rows > self.rows || c0 + cols > self.cols {
            return Err(Error::shape_mismatch(
                &[self.rows, self.cols],
                &[r0 + rows, c0 + cols],
            ));
        }
        if rows == 0 || cols == 0 {
            return Ok(Self {
                data: &[],
                rows,
                cols,
                ld: self.ld,
            });
        }
        let start = r0 * self.ld + c0;
        Ok(Self {
            data: &self.data[start..start + required_len(rows, cols, self.ld)],
            rows,
            cols,
            ld: self.ld,
        })
    }
}

impl<'a, T: Element> MatMut<'a, T> {
    /// Create a mutable view over `data` with the given shape and row stride
    pub fn new(data: &'a mut [T], rows: usize, cols: usize, ld: usize) -> Result<Self> {
        check_view(data.len(), rows, cols, ld)?;
        Ok(Self {
            data,
            rows,
            cols,
            ld,
        })
    }

    /// Contiguous mutable view (`ld == cols`)
    pub fn from_slice(data: &'a mut [T], rows: usize, cols: usize) -> Result<Self> {
        Self::new(data, rows, cols, cols.max(1))
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn ld(&self) -> usize {
        self.ld
    }

    #[inline]
    pub fn shape(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    #[inline]
    pub fn at(&self, i: usize, j: usize) -> T {
        self.data[i * self.ld + j]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: T) {
        self.data[i * self.ld + j] = value;
    }

    #[inline]
    pub fn row(&self, i: usize) -> &[T] {
        if self.cols == 0 {
            return &[];
        }
        let start = i * self.ld;
        &self.data[start..start + self.cols]
    }

    #[inline]
    pub fn row_mut(&mut self, i: usize) -> &mut [T] {
        if self.cols == 0 {
            return &mut [];
        }
        let start = i * self.ld;
        &mut self.data[start..start + self.cols]
    }

    /// Two distinct rows, mutably
    pub fn two_rows_mut(&mut self, i: usize, j: usize) -> (&mut [T], &mut [T]) {
        debug_assert!(i != j);
        if self.cols == 0 {
            return (&mut [], &mut []);
        }
        let (lo, hi, swapped) = if i < j { (i, j, false) } else { (j, i, true) };
        let ld = self.ld;
        let cols = self.cols;
        let (head, tail) = self.data.split_at_mut(hi * ld);
        let a = &mut head[lo * ld..lo * ld + cols];
        let b = &mut tail[..cols];
        if swapped { (b, a) } else { (a, b) }
    }

    /// Immutable reborrow
    #[inline]
    pub fn rb(&self) -> MatRef<'_, T> {
        MatRef {
            data: &*self.data,
            rows: self.rows,
            cols: self.cols,
            ld: self.ld,
        }
    }

    /// Mutable reborrow
    #[inline]
    pub fn rb_mut(&mut self) -> MatMut<'_, T> {
        MatMut {
            data: &mut *self.data,
            rows: self.rows,
            cols: self.cols,
            ld: self.ld,
        }
    }

    /// Mutable sub-block starting at (r0, c0)
    pub fn submatrix_mut(self, r0: usize, c0: usize, rows: usize, cols: usize) -> Result<Self> {
        if r0 + rows > self.rows || c0 + cols > self.cols {
            return Err(Error::shape_mismatch(
                &[self.rows, self.cols],
                &[r0 + rows, c0 + cols],
            ));
        }
        let ld = self.ld;
        if rows == 0 || cols == 0 {
            return Ok(Self {
                data: &mut [],
                rows,
                cols,
                ld,
            });
        }
        let start = r0 * ld + c0;
        let len = required_len(rows, cols, ld);
        let data = self.data;
        Ok(Self {
            data: &mut data[start..start + len],
            rows,
            cols,
            ld,
        })
    }

    /// Fill the viewed block with `value`
    pub fn fill(&mut self, value: T) {
        for i in 0..self.rows {
            self.row_mut(i).fill(value);
        }
    }

    /// Copy `src` (same shape) into the viewed block
    pub fn copy_from(&mut self, src: MatRef<'_, T>) -> Result<()> {
        if src.shape() != self.shape() {
            return Err(Error::shape_mismatch(&self.shape(), &src.shape()));
        }
        for i in 0..self.rows {
            self.row_mut(i).copy_from_slice(src.row(i));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_len() {
        assert_eq!(required_len(0, 5, 5), 0);
        assert_eq!(required_len(3, 2, 4), 10);
    }

    #[test]
    fn test_submatrix_strided() {
        let data: Vec<f64> = (0..12).map(|x| x as f64).collect();
        let a = MatRef::from_slice(&data, 3, 4).unwrap();
        let s = a.submatrix(1, 1, 2, 2).unwrap();
        assert_eq!(s.at(0, 0), 5.0);
        assert_eq!(s.at(1, 1), 10.0);
        assert_eq!(s.row(1), &[9.0, 10.0]);
    }

    #[test]
    fn test_view_too_short() {
        let data = vec![0.0f64; 5];
        assert!(MatRef::from_slice(&data, 2, 3).is_err());
    }

    #[test]
    fn test_two_rows_mut() {
        let mut data = vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut m = MatMut::from_slice(&mut data, 3, 2).unwrap();
        let (a, b) = m.two_rows_mut(2, 0);
        a.swap_with_slice(b);
        assert_eq!(data, vec![5.0, 6.0, 3.0, 4.0, 1.0, 2.0]);
    }
}
