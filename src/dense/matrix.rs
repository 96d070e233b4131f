//! Owned row-major dense matrix

use super::kernels;
use super::view::{MatMut, MatRef};
use crate::dtype::{Element, LinalgElement};
use crate::error::{Error, Result};

/// Where the storage of a matrix currently lives
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Location {
    /// Resident on the compute device
    #[default]
    Device,
    /// Migrated to host memory
    Host,
}

/// Dense matrix stored row-major with `ld == cols`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DenseMatrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
    location: Location,
}

impl<T: Element> DenseMatrix<T> {
    /// Zero-initialized `rows x cols` matrix
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![T::zero(); rows * cols],
            location: Location::Device,
        }
    }

    /// Wrap an existing row-major buffer
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::shape_mismatch(&[rows * cols], &[data.len()]));
        }
        Ok(Self {
            rows,
            cols,
            data,
            location: Location::Device,
        })
    }

    /// Build a matrix from a closure over (row, col)
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Self {
            rows,
            cols,
            data,
            location: Location::Device,
        }
    }

    /// Identity matrix of order `n`
    pub fn identity(n: usize) -> Self {
        Self::from_fn(n, n, |i, j| if i == j { T::one() } else { T::zero() })
    }

    /// Copy of a strided view
    pub fn from_view(src: MatRef<'_, T>) -> Self {
        let mut data = Vec::with_capacity(src.rows() * src.cols());
        for i in 0..src.rows() {
            data.extend_from_slice(src.row(i));
        }
        Self {
            rows: src.rows(),
            cols: src.cols(),
            data,
            location: Location::Device,
        }
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
    pub fn shape(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    /// Number of stored elements
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Consume the matrix and return its storage
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> T {
        self.data[i * self.cols + j]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: T) {
        self.data[i * self.cols + j] = value;
    }

    #[inline]
    pub fn location(&self) -> Location {
        self.location
    }

    #[inline]
    pub fn set_location(&mut self, location: Location) {
        self.location = location;
    }

    /// Release the storage, leaving a 0x0 matrix
    pub fn clear(&mut self) {
        self.rows = 0;
        self.cols = 0;
        self.data = Vec::new();
    }

    pub fn as_ref(&self) -> MatRef<'_, T> {
        MatRef::new(&self.data, self.rows, self.cols, self.cols.max(1))
            .expect("dense matrix storage matches its shape")
    }

    pub fn as_mut(&mut self) -> MatMut<'_, T> {
        let ld = self.cols.max(1);
        MatMut::new(&mut self.data, self.rows, self.cols, ld)
            .expect("dense matrix storage matches its shape")
    }

    /// Copy of the block at (r0, c0) of size `rows x cols`
    pub fn copy_block(&self, r0: usize, c0: usize, rows: usize, cols: usize) -> Result<Self> {
        Ok(Self::from_view(self.as_ref().submatrix(r0, c0, rows, cols)?))
    }

    /// Mutable view of the block at (r0, c0)
    pub fn block_mut(
        &mut self,
        r0: usize,
        c0: usize,
        rows: usize,
        cols: usize,
    ) -> Result<MatMut<'_, T>> {
        self.as_mut().submatrix_mut(r0, c0, rows, cols)
    }

    /// Transposed copy
    pub fn transpose(&self) -> Self {
        Self::from_fn(self.cols, self.rows, |i, j| self.get(j, i))
    }
}

impl<T: LinalgElement> DenseMatrix<T> {
    /// Frobenius norm
    pub fn frobenius_norm(&self) -> f64 {
        self.data
            .iter()
            .map(|&x| {
                let v = x.to_f64();
                v * v
            })
            .sum::<f64>()
            .sqrt()
    }

    /// Frobenius norm of `self - other`
    pub fn frobenius_distance(&self, other: &Self) -> Result<f64> {
        if self.shape() != other.shape() {
            return Err(Error::shape_mismatch(&self.shape(), &other.shape()));
        }
        Ok(self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| {
                let d = (a - b).to_f64();
                d * d
            })
            .sum::<f64>()
            .sqrt())
    }

    /// Matrix product `self * rhs`
    pub fn matmul(&self, rhs: &Self) -> Result<Self> {
        let mut out = Self::zeros(self.rows, rhs.cols);
        kernels::gemm(T::one(), self.as_ref(), rhs.as_ref(), T::zero(), out.as_mut())?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec_shape_check() {
        assert!(DenseMatrix::<f64>::from_vec(2, 2, vec![1.0; 3]).is_err());
        let m = DenseMatrix::<f64>::from_vec(2, 3, vec![1.0; 6]).unwrap();
        assert_eq!(m.shape(), [2, 3]);
    }

    #[test]
    fn test_copy_block_and_transpose() {
        let m = DenseMatrix::<f64>::from_fn(3, 4, |i, j| (i * 4 + j) as f64);
        let b = m.copy_block(1, 2, 2, 2).unwrap();
        assert_eq!(b.data(), &[6.0, 7.0, 10.0, 11.0]);
        let t = b.transpose();
        assert_eq!(t.data(), &[6.0, 10.0, 7.0, 11.0]);
    }

    #[test]
    fn test_clear_releases_storage() {
        let mut m = DenseMatrix::<f32>::identity(4);
        m.clear();
        assert_eq!(m.shape(), [0, 0]);
        assert!(m.is_empty());
    }

    #[test]
    fn test_matmul_identity() {
        let a = DenseMatrix::<f64>::from_fn(3, 3, |i, j| (i + 2 * j) as f64);
        let p = a.matmul(&DenseMatrix::identity(3)).unwrap();
        assert_eq!(p, a);
    }
}
