//! Tiles of a BLR matrix

use crate::dense::{DenseMatrix, Diag, Location, MatMut, MatRef, Side, UpLo, kernels};
use crate::dtype::{Element, LinalgElement};
use crate::error::{Error, Result};
use crate::runtime::{BlasOps, FactorContext, HostMemory, Runtime, Stream};

/// One block of a BLR matrix
///
/// A low-rank tile represents `U * V` with `U` of shape `rows x rank` and
/// `V` of shape `rank x cols`. Compression is only applied when
/// `rank * (rows + cols) < rows * cols`.
#[derive(Clone, Debug, PartialEq)]
pub enum Tile<T> {
    /// Full `rows x cols` storage
    Dense(DenseMatrix<T>),
    /// Rank-revealing factorization `U * V`
    LowRank {
        /// Left factor, `rows x rank`
        u: DenseMatrix<T>,
        /// Right factor, `rank x cols`
        v: DenseMatrix<T>,
    },
}

/// Which storage array of a tile an operation reads
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Factor {
    /// The dense array of a dense tile
    Dense,
    /// `U` of a low-rank tile
    U,
    /// `V` of a low-rank tile
    V,
}

impl<T: Element> Default for Tile<T> {
    fn default() -> Self {
        Tile::Dense(DenseMatrix::default())
    }
}

impl<T: Element> Tile<T> {
    /// Low-rank tile from its factors
    pub fn low_rank(u: DenseMatrix<T>, v: DenseMatrix<T>) -> Result<Self> {
        if u.cols() != v.rows() {
            // U must have one column per row of V
            return Err(Error::shape_mismatch(&[u.rows(), v.rows()], &[u.rows(), u.cols()]));
        }
        Ok(Tile::LowRank { u, v })
    }

    pub fn rows(&self) -> usize {
        match self {
            Tile::Dense(d) => d.rows(),
            Tile::LowRank { u, .. } => u.rows(),
        }
    }

    pub fn cols(&self) -> usize {
        match self {
            Tile::Dense(d) => d.cols(),
            Tile::LowRank { v, .. } => v.cols(),
        }
    }

    /// Rank of the representation; `min(rows, cols)` for dense tiles
    pub fn rank(&self) -> usize {
        match self {
            Tile::Dense(d) => d.rows().min(d.cols()),
            Tile::LowRank { u, .. } => u.cols(),
        }
    }

    #[inline]
    pub fn is_low_rank(&self) -> bool {
        matches!(self, Tile::LowRank { .. })
    }

    /// Number of stored elements
    pub fn nonzeros(&self) -> usize {
        match self {
            Tile::Dense(d) => d.len(),
            Tile::LowRank { u, v } => u.len() + v.len(),
        }
    }

    pub fn location(&self) -> Location {
        match self {
            Tile::Dense(d) => d.location(),
            Tile::LowRank { u, .. } => u.location(),
        }
    }

    pub fn dense(&self) -> Result<&DenseMatrix<T>> {
        match self {
            Tile::Dense(d) => Ok(d),
            Tile::LowRank { .. } => Err(Error::TileKind {
                op: "dense",
                expected: "dense",
            }),
        }
    }

    pub fn dense_mut(&mut self) -> Result<&mut DenseMatrix<T>> {
        match self {
            Tile::Dense(d) => Ok(d),
            Tile::LowRank { .. } => Err(Error::TileKind {
                op: "dense_mut",
                expected: "dense",
            }),
        }
    }

    pub fn u(&self) -> Result<&DenseMatrix<T>> {
        match self {
            Tile::LowRank { u, .. } => Ok(u),
            Tile::Dense(_) => Err(Error::TileKind {
                op: "u",
                expected: "low-rank",
            }),
        }
    }

    pub fn v(&self) -> Result<&DenseMatrix<T>> {
        match self {
            Tile::LowRank { v, .. } => Ok(v),
            Tile::Dense(_) => Err(Error::TileKind {
                op: "v",
                expected: "low-rank",
            }),
        }
    }

    /// Storage array selected by `factor`
    pub fn factor(&self, factor: Factor) -> Result<&DenseMatrix<T>> {
        match factor {
            Factor::Dense => self.dense(),
            Factor::U => self.u(),
            Factor::V => self.v(),
        }
    }

    /// Copy the tile's storage to host through `staging`
    ///
    /// `staging` must hold the largest factor of the tile.
    pub fn move_to_host<R: Runtime>(
        &mut self,
        stream: &R::Stream,
        staging: &mut HostMemory<T>,
    ) -> Result<()> {
        match self {
            Tile::Dense(d) => migrate::<R, T>(d, stream, staging),
            Tile::LowRank { u, v } => {
                migrate::<R, T>(u, stream, staging)?;
                migrate::<R, T>(v, stream, staging)
            }
        }
    }
}

fn migrate<R: Runtime, T: Element>(
    m: &mut DenseMatrix<T>,
    stream: &R::Stream,
    staging: &mut HostMemory<T>,
) -> Result<()> {
    if m.location() == Location::Host {
        return Ok(());
    }
    let len = m.len();
    stream.copy_to_host(m.data(), &mut staging[..])?;
    let mut host = DenseMatrix::from_vec(m.rows(), m.cols(), staging[..len].to_vec())?;
    host.set_location(Location::Host);
    *m = host;
    Ok(())
}

impl<T: LinalgElement> Tile<T> {
    /// Densified copy (`U * V` for low-rank tiles)
    pub fn to_dense(&self) -> Result<DenseMatrix<T>> {
        match self {
            Tile::Dense(d) => Ok(d.clone()),
            Tile::LowRank { u, v } => u.matmul(v),
        }
    }

    /// Apply row interchanges; on a low-rank tile they act on `U`
    pub fn laswp<R: Runtime>(
        &mut self,
        ctx: &FactorContext<R>,
        piv: &[usize],
        forward: bool,
    ) -> Result<()> {
        let target = match self {
            Tile::Dense(d) => d,
            Tile::LowRank { u, .. } => u,
        };
        ctx.blas().laswp(target.as_mut(), piv, forward)
    }

    /// Triangular solve against the dense tile `a`
    ///
    /// From the left this updates `D` or `U`, from the right `D` or `V`.
    pub fn trsm<R: Runtime>(
        &mut self,
        ctx: &FactorContext<R>,
        side: Side,
        uplo: UpLo,
        diag: Diag,
        a: &Tile<T>,
    ) -> Result<()> {
        let a = a.dense()?.as_ref();
        let target = match (self, side) {
            (Tile::Dense(d), _) => d,
            (Tile::LowRank { u, .. }, Side::Left) => u,
            (Tile::LowRank { v, .. }, Side::Right) => v,
        };
        ctx.blas().trsm(side, uplo, diag, a, target.as_mut())
    }

    /// `y = alpha * self * x + beta * y` on the host
    pub fn apply(&self, alpha: T, x: MatRef<'_, T>, beta: T, y: MatMut<'_, T>) -> Result<()> {
        match self {
            Tile::Dense(d) => kernels::gemm(alpha, d.as_ref(), x, beta, y),
            Tile::LowRank { u, v } => {
                let mut vx = DenseMatrix::zeros(v.rows(), x.cols());
                kernels::gemm(T::one(), v.as_ref(), x, T::zero(), vx.as_mut())?;
                kernels::gemm(alpha, u.as_ref(), vx.as_ref(), beta, y)
            }
        }
    }
}
