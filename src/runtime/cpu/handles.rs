//! CPU BLAS and solver handles

use super::runtime::CpuRuntime;
use super::stream::CpuStream;
use crate::dense::kernels;
use crate::dense::{Diag, MatMut, MatRef, Side, UpLo};
use crate::dtype::LinalgElement;
use crate::error::Result;
use crate::runtime::{BlasOps, SolverOps};

/// BLAS handle bound to a CPU stream
#[derive(Clone, Debug)]
pub struct CpuBlas {
    stream: CpuStream,
}

impl CpuBlas {
    pub fn new(stream: CpuStream) -> Self {
        Self { stream }
    }
}

impl BlasOps<CpuRuntime> for CpuBlas {
    fn stream(&self) -> &CpuStream {
        &self.stream
    }

    fn gemm<T: LinalgElement>(
        &self,
        alpha: T,
        a: MatRef<'_, T>,
        b: MatRef<'_, T>,
        beta: T,
        c: MatMut<'_, T>,
    ) -> Result<()> {
        kernels::gemm(alpha, a, b, beta, c)
    }

    fn trsm<T: LinalgElement>(
        &self,
        side: Side,
        uplo: UpLo,
        diag: Diag,
        a: MatRef<'_, T>,
        b: MatMut<'_, T>,
    ) -> Result<()> {
        kernels::trsm(side, uplo, diag, a, b)
    }

    fn laswp<T: LinalgElement>(&self, a: MatMut<'_, T>, piv: &[usize], forward: bool) -> Result<()> {
        kernels::laswp(a, piv, forward)
    }

    fn dgmm<T: LinalgElement>(&self, side: Side, a: MatMut<'_, T>, d: &[T]) -> Result<()> {
        kernels::dgmm(side, a, d)
    }
}

/// Dense solver handle bound to a CPU stream
#[derive(Clone, Debug)]
pub struct CpuSolver {
    stream: CpuStream,
}

impl CpuSolver {
    pub fn new(stream: CpuStream) -> Self {
        Self { stream }
    }
}

impl SolverOps<CpuRuntime> for CpuSolver {
    fn stream(&self) -> &CpuStream {
        &self.stream
    }

    fn getrf<T: LinalgElement>(&self, a: MatMut<'_, T>, piv: &mut [usize]) -> Result<usize> {
        kernels::getrf(a, piv)
    }

    fn gesvdj_buffer_size<T: LinalgElement>(&self, m: usize, n: usize) -> usize {
        kernels::gesvdj_work_len(m, n)
    }

    fn gesvdj<T: LinalgElement>(
        &self,
        a: MatRef<'_, T>,
        s: &mut [T],
        u: MatMut<'_, T>,
        vt: MatMut<'_, T>,
        work: &mut [T],
    ) -> Result<()> {
        kernels::gesvdj(a, s, u, vt, work)
    }

    fn geqrf_buffer_size<T: LinalgElement>(&self, m: usize, n: usize) -> usize {
        kernels::geqrf_thin_work_len(m, n)
    }

    fn geqrf_thin<T: LinalgElement>(
        &self,
        a: MatMut<'_, T>,
        q: MatMut<'_, T>,
        r: MatMut<'_, T>,
        work: &mut [T],
    ) -> Result<()> {
        kernels::geqrf_thin(a, q, r, work)
    }
}
