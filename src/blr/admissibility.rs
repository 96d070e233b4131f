//! Admissibility grids and tilings

/// Boolean grid marking which tile pairs may be compressed
///
/// Diagonal tiles of a square grid are factored densely regardless of their
/// flag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Admissibility {
    rows: usize,
    cols: usize,
    flags: Vec<bool>,
}

impl Admissibility {
    /// Every pair admissible
    pub fn all(rows: usize, cols: usize) -> Self {
        Self::from_fn(rows, cols, |_, _| true)
    }

    /// No pair admissible; the BLR matrix stays dense
    pub fn none(rows: usize, cols: usize) -> Self {
        Self::from_fn(rows, cols, |_, _| false)
    }

    /// Weak admissibility: every off-diagonal pair
    pub fn weak(n: usize) -> Self {
        Self::from_fn(n, n, |i, j| i != j)
    }

    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let mut flags = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                flags.push(f(i, j));
            }
        }
        Self { rows, cols, flags }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Flag for `(i, j)`; out-of-range pairs are not admissible
    pub fn get(&self, i: usize, j: usize) -> bool {
        i < self.rows && j < self.cols && self.flags[i * self.cols + j]
    }

    pub fn set(&mut self, i: usize, j: usize, admissible: bool) {
        self.flags[i * self.cols + j] = admissible;
    }
}

/// Split `n` into blocks of at most `leaf` with sizes differing by at most one
///
/// Returns an empty tiling for `n == 0`.
pub fn uniform_tiles(n: usize, leaf: usize) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }
    let leaf = leaf.max(1);
    let blocks = n.div_ceil(leaf);
    let base = n / blocks;
    let extra = n % blocks;
    (0..blocks).map(|b| base + usize::from(b < extra)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weak() {
        let a = Admissibility::weak(3);
        assert!(!a.get(1, 1));
        assert!(a.get(0, 2));
        assert!(!a.get(3, 0));
    }

    #[test]
    fn test_uniform_tiles() {
        assert_eq!(uniform_tiles(8, 4), vec![4, 4]);
        assert_eq!(uniform_tiles(10, 4), vec![4, 3, 3]);
        assert_eq!(uniform_tiles(3, 256), vec![3]);
        assert!(uniform_tiles(0, 4).is_empty());
        assert_eq!(uniform_tiles(10, 4).iter().sum::<usize>(), 10);
    }
}
