//! Common test utilities
#![allow(dead_code)]

use blrfront::dense::DenseMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Assert two f64 slices are close within tolerance
///
/// Uses the formula: |a - b| <= atol + rtol * |b|
pub fn assert_allclose_f64(a: &[f64], b: &[f64], rtol: f64, atol: f64, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// Uniform random matrix in [-1, 1) from a fixed seed
pub fn random_matrix(rows: usize, cols: usize, seed: u64) -> DenseMatrix<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    DenseMatrix::from_fn(rows, cols, |_, _| rng.random_range(-1.0..1.0))
}

/// Random matrix of exact rank `rank`
pub fn random_low_rank(rows: usize, cols: usize, rank: usize, seed: u64) -> DenseMatrix<f64> {
    let u = random_matrix(rows, rank, seed);
    let v = random_matrix(rank, cols, seed.wrapping_add(1));
    u.matmul(&v).unwrap()
}

/// Random matrix with `n` added to the diagonal
pub fn diagonally_dominant(n: usize, seed: u64) -> DenseMatrix<f64> {
    let mut a = random_matrix(n, n, seed);
    for i in 0..n {
        a.set(i, i, a.get(i, i) + n as f64);
    }
    a
}

/// `a * x` for a vector `x`
pub fn matvec(a: &DenseMatrix<f64>, x: &[f64]) -> Vec<f64> {
    (0..a.rows())
        .map(|i| (0..a.cols()).map(|j| a.get(i, j) * x[j]).sum())
        .collect()
}

/// Relative Frobenius error of `approx` against `exact`
pub fn relative_error(approx: &DenseMatrix<f64>, exact: &DenseMatrix<f64>) -> f64 {
    approx.frobenius_distance(exact).unwrap() / exact.frobenius_norm().max(f64::MIN_POSITIVE)
}
