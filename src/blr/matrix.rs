//! Tile grid of a BLR matrix

use super::tile::Tile;
use crate::dense::{DenseMatrix, MatRef};
use crate::dtype::{Element, LinalgElement};
use crate::error::{Error, Result};
use crate::runtime::{FactorContext, HostMemory, Runtime};

/// Matrix partitioned into a grid of dense or low-rank tiles
///
/// Row block `i` spans rows `tileroff(i)..tileroff(i + 1)`; column blocks
/// likewise. Every slot holds exactly one tile once constructed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlrMatrix<T> {
    roff: Vec<usize>,
    coff: Vec<usize>,
    tiles: Vec<Tile<T>>,
}

fn offsets(sizes: &[usize]) -> Vec<usize> {
    let mut off = Vec::with_capacity(sizes.len() + 1);
    let mut acc = 0;
    off.push(0);
    for &s in sizes {
        acc += s;
        off.push(acc);
    }
    off
}

impl<T: Element> BlrMatrix<T> {
    /// Grid with the given block sizes, every slot an empty placeholder
    pub fn new(row_tiles: &[usize], col_tiles: &[usize]) -> Self {
        Self {
            roff: offsets(row_tiles),
            coff: offsets(col_tiles),
            tiles: vec![Tile::default(); row_tiles.len() * col_tiles.len()],
        }
    }

    /// Dense tiles copied from `src`
    pub fn from_dense(src: MatRef<'_, T>, row_tiles: &[usize], col_tiles: &[usize]) -> Result<Self> {
        let mut m = Self::new(row_tiles, col_tiles);
        if src.shape() != [m.rows(), m.cols()] {
            return Err(Error::shape_mismatch(&[m.rows(), m.cols()], &src.shape()));
        }
        for i in 0..m.rowblocks() {
            for j in 0..m.colblocks() {
                let block = src.submatrix(m.tileroff(i), m.tilecoff(j), m.tilerows(i), m.tilecols(j))?;
                m.tiles[i * col_tiles.len() + j] = Tile::Dense(DenseMatrix::from_view(block));
            }
        }
        Ok(m)
    }

    pub fn rows(&self) -> usize {
        self.roff.last().copied().unwrap_or(0)
    }

    pub fn cols(&self) -> usize {
        self.coff.last().copied().unwrap_or(0)
    }

    pub fn rowblocks(&self) -> usize {
        self.roff.len().saturating_sub(1)
    }

    pub fn colblocks(&self) -> usize {
        self.coff.len().saturating_sub(1)
    }

    #[inline]
    pub fn tilerows(&self, i: usize) -> usize {
        self.roff[i + 1] - self.roff[i]
    }

    #[inline]
    pub fn tilecols(&self, j: usize) -> usize {
        self.coff[j + 1] - self.coff[j]
    }

    /// First row of row block `i`
    #[inline]
    pub fn tileroff(&self, i: usize) -> usize {
        self.roff[i]
    }

    /// First column of column block `j`
    #[inline]
    pub fn tilecoff(&self, j: usize) -> usize {
        self.coff[j]
    }

    fn index(&self, i: usize, j: usize) -> Result<usize> {
        if i >= self.rowblocks() || j >= self.colblocks() {
            return Err(Error::invalid_argument(
                "tile",
                format!(
                    "({}, {}) outside a {}x{} tile grid",
                    i,
                    j,
                    self.rowblocks(),
                    self.colblocks()
                ),
            ));
        }
        Ok(i * self.colblocks() + j)
    }

    pub fn tile(&self, i: usize, j: usize) -> Result<&Tile<T>> {
        let idx = self.index(i, j)?;
        Ok(&self.tiles[idx])
    }

    pub fn tile_mut(&mut self, i: usize, j: usize) -> Result<&mut Tile<T>> {
        let idx = self.index(i, j)?;
        Ok(&mut self.tiles[idx])
    }

    /// Shared reference to tile `a` and exclusive reference to tile `b`
    pub fn tile_pair_mut(
        &mut self,
        a: (usize, usize),
        b: (usize, usize),
    ) -> Result<(&Tile<T>, &mut Tile<T>)> {
        let ia = self.index(a.0, a.1)?;
        let ib = self.index(b.0, b.1)?;
        if ia == ib {
            return Err(Error::invalid_argument("tile", "aliasing tile pair"));
        }
        if ia < ib {
            let (head, tail) = self.tiles.split_at_mut(ib);
            Ok((&head[ia], &mut tail[0]))
        } else {
            let (head, tail) = self.tiles.split_at_mut(ia);
            Ok((&tail[0], &mut head[ib]))
        }
    }

    /// Replace a tile, returning the previous one
    pub fn replace_tile(&mut self, i: usize, j: usize, tile: Tile<T>) -> Result<Tile<T>> {
        let idx = self.index(i, j)?;
        if tile.rows() != self.tilerows(i) || tile.cols() != self.tilecols(j) {
            return Err(Error::shape_mismatch(
                &[self.tilerows(i), self.tilecols(j)],
                &[tile.rows(), tile.cols()],
            ));
        }
        Ok(std::mem::replace(&mut self.tiles[idx], tile))
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile<T>> {
        self.tiles.iter()
    }

    /// Number of stored elements over all tiles
    pub fn nonzeros(&self) -> usize {
        self.tiles.iter().map(Tile::nonzeros).sum()
    }

    /// Largest rank among low-rank tiles, 0 if there are none
    pub fn max_rank(&self) -> usize {
        self.tiles
            .iter()
            .filter(|t| t.is_low_rank())
            .map(Tile::rank)
            .max()
            .unwrap_or(0)
    }

    pub fn low_rank_tiles(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_low_rank()).count()
    }

    /// Largest single factor of any tile, in elements
    pub fn max_factor_len(&self) -> usize {
        self.tiles
            .iter()
            .map(|t| match t {
                Tile::Dense(d) => d.len(),
                Tile::LowRank { u, v } => u.len().max(v.len()),
            })
            .max()
            .unwrap_or(0)
    }

    /// Migrate every tile to host through `staging`
    pub fn move_to_host<R: Runtime>(
        &mut self,
        ctx: &FactorContext<R>,
        staging: &mut HostMemory<T>,
    ) -> Result<()> {
        for tile in &mut self.tiles {
            tile.move_to_host::<R>(ctx.copy_stream(), staging)?;
        }
        Ok(())
    }
}

impl<T: LinalgElement> BlrMatrix<T> {
    /// Densified copy of the whole matrix
    pub fn to_dense(&self) -> Result<DenseMatrix<T>> {
        let mut out = DenseMatrix::zeros(self.rows(), self.cols());
        for i in 0..self.rowblocks() {
            for j in 0..self.colblocks() {
                let tile = self.tile(i, j)?.to_dense()?;
                out.block_mut(self.tileroff(i), self.tilecoff(j), tile.rows(), tile.cols())?
                    .copy_from(tile.as_ref())?;
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DenseMatrix<f64> {
        DenseMatrix::from_fn(5, 4, |i, j| (i * 4 + j) as f64)
    }

    #[test]
    fn test_offsets_and_roundtrip() {
        let a = sample();
        let m = BlrMatrix::from_dense(a.as_ref(), &[2, 3], &[1, 3]).unwrap();
        assert_eq!((m.rows(), m.cols()), (5, 4));
        assert_eq!((m.rowblocks(), m.colblocks()), (2, 2));
        assert_eq!(m.tileroff(1), 2);
        assert_eq!(m.tilecoff(1), 1);
        assert_eq!(m.tile(1, 1).unwrap().dense().unwrap().get(0, 0), 9.0);
        assert_eq!(m.to_dense().unwrap(), a);
        assert_eq!(m.nonzeros(), 20);
        assert_eq!(m.max_rank(), 0);
    }

    #[test]
    fn test_shape_checks() {
        let a = sample();
        assert!(BlrMatrix::from_dense(a.as_ref(), &[2, 2], &[4]).is_err());
        let mut m = BlrMatrix::from_dense(a.as_ref(), &[5], &[4]).unwrap();
        assert!(m.tile(1, 0).is_err());
        let wrong = Tile::Dense(DenseMatrix::zeros(2, 2));
        assert!(m.replace_tile(0, 0, wrong).is_err());
    }

    #[test]
    fn test_tile_pair_mut() {
        let a = sample();
        let mut m = BlrMatrix::from_dense(a.as_ref(), &[2, 3], &[2, 2]).unwrap();
        let (d, t) = m.tile_pair_mut((1, 1), (0, 1)).unwrap();
        assert_eq!(d.rows(), 3);
        t.dense_mut().unwrap().set(0, 0, -1.0);
        assert_eq!(m.tile(0, 1).unwrap().dense().unwrap().get(0, 0), -1.0);
        assert!(m.tile_pair_mut((0, 0), (0, 0)).is_err());
    }

    #[test]
    fn test_empty_grid() {
        let m = BlrMatrix::<f64>::new(&[3], &[]);
        assert_eq!((m.rows(), m.cols(), m.colblocks()), (3, 0, 0));
        assert_eq!(m.to_dense().unwrap().shape(), [3, 0]);
    }
}
