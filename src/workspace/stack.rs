//! Borrowing bump allocator over a caller-owned buffer

use crate::dense::MatMut;
use crate::dtype::Element;
use crate::error::{Error, Result};

/// Splits one mutable buffer into disjoint typed sub-slices
///
/// ```ignore
/// let mut buf = vec![0.0f64; 64];
/// let mut stack = ScratchStack::new(&mut buf, "svd");
/// let s = stack.take(8)?;
/// let u = stack.take_mat(8, 4)?;
/// ```
#[derive(Debug)]
pub struct ScratchStack<'a, T> {
    rest: &'a mut [T],
    pool: &'static str,
}

impl<'a, T> ScratchStack<'a, T> {
    /// Wrap `buf`; `pool` names the buffer in overrun errors
    pub fn new(buf: &'a mut [T], pool: &'static str) -> Self {
        Self { rest: buf, pool }
    }

    /// Elements still available
    #[inline]
    pub fn remaining(&self) -> usize {
        self.rest.len()
    }

    /// Take the next `len` elements
    pub fn take(&mut self, len: usize) -> Result<&'a mut [T]> {
        if len > self.rest.len() {
            return Err(Error::ScratchOverrun {
                pool: self.pool,
                requested: len,
                available: self.rest.len(),
            });
        }
        let rest = std::mem::take(&mut self.rest);
        let (head, tail) = rest.split_at_mut(len);
        self.rest = tail;
        Ok(head)
    }
}

impl<'a, T: Element> ScratchStack<'a, T> {
    /// Take a contiguous `rows x cols` matrix view
    pub fn take_mat(&mut self, rows: usize, cols: usize) -> Result<MatMut<'a, T>> {
        let data = self.take(rows * cols)?;
        MatMut::from_slice(data, rows, cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_disjoint() {
        let mut buf = vec![0.0f64; 10];
        let mut stack = ScratchStack::new(&mut buf, "test");
        let a = stack.take(4).unwrap();
        let b = stack.take(6).unwrap();
        a.fill(1.0);
        b.fill(2.0);
        assert_eq!(stack.remaining(), 0);
        assert_eq!(&buf[..4], &[1.0; 4]);
        assert_eq!(&buf[4..], &[2.0; 6]);
    }

    #[test]
    fn test_take_overrun() {
        let mut buf = vec![0.0f64; 3];
        let mut stack = ScratchStack::new(&mut buf, "test");
        let err = stack.take_mat(2, 2).unwrap_err();
        assert!(matches!(
            err,
            Error::ScratchOverrun {
                requested: 4,
                available: 3,
                ..
            }
        ));
    }
}
