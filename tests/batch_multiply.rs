//! Integration tests for the batched multiply-accumulate scheduler

mod common;

use blrfront::blr::batch::{
    BatchOperands, MultiplyBatch, Target, TileKey, WorkSize, multiply_inc_work_size,
};
use blrfront::blr::{BlrMatrix, Tile};
use blrfront::dense::{DenseMatrix, kernels};
use blrfront::error::Error;
use blrfront::runtime::FactorContext;
use blrfront::runtime::cpu::{CpuDevice, CpuRuntime};
use common::{assert_allclose_f64, random_matrix};

fn context() -> FactorContext<CpuRuntime> {
    FactorContext::new(&CpuDevice::new()).unwrap()
}

fn dense(rows: usize, cols: usize, seed: u64) -> Tile<f64> {
    Tile::Dense(random_matrix(rows, cols, seed))
}

fn low_rank(rows: usize, cols: usize, rank: usize, seed: u64) -> Tile<f64> {
    Tile::low_rank(
        random_matrix(rows, rank, seed),
        random_matrix(rank, cols, seed + 100),
    )
    .unwrap()
}

fn single(tile: Tile<f64>) -> BlrMatrix<f64> {
    let mut m = BlrMatrix::new(&[tile.rows()], &[tile.cols()]);
    m.replace_tile(0, 0, tile).unwrap();
    m
}

/// `C -= A * B` through a one-pair batch, checked against dense products
fn check_pair(a: Tile<f64>, b: Tile<f64>) -> MultiplyBatch {
    let ctx = context();
    let c0 = random_matrix(a.rows(), b.cols(), 99);
    let mut expected = c0.clone();
    kernels::gemm(
        -1.0,
        a.to_dense().unwrap().as_ref(),
        b.to_dense().unwrap().as_ref(),
        1.0,
        expected.as_mut(),
    )
    .unwrap();

    let mut work = WorkSize::new();
    multiply_inc_work_size(&a, &b, &mut work);
    let mut ma = single(a);
    let mut mb = single(b);
    let mut mc = single(Tile::Dense(c0));

    let mut batch = MultiplyBatch::new(&work);
    batch
        .add_tile_mult(
            ma.tile(0, 0).unwrap(),
            TileKey::new(0, 0, 0),
            mb.tile(0, 0).unwrap(),
            TileKey::new(1, 0, 0),
            Target::Tile(TileKey::new(2, 0, 0)),
        )
        .unwrap();
    assert_eq!(batch.used(), (work.vu, work.uvu));

    let mut vu = vec![0.0; work.vu];
    let mut uvu = vec![0.0; work.uvu];
    let mut operands = BatchOperands {
        matrices: vec![&mut ma, &mut mb, &mut mc],
        front: None,
        vu: &mut vu,
        uvu: &mut uvu,
    };
    batch.run(&ctx, &mut operands).unwrap();

    let got = mc.tile(0, 0).unwrap().dense().unwrap();
    assert_allclose_f64(got.data(), expected.data(), 1e-12, 1e-12, "C -= A * B");
    batch
}

#[test]
fn test_dense_dense() {
    let batch = check_pair(dense(6, 5, 1), dense(5, 7, 2));
    let [g1, g2, g3] = batch.groups();
    assert_eq!((g1.len(), g2.len(), g3.len()), (0, 0, 1));
}

#[test]
fn test_dense_low_rank() {
    let batch = check_pair(dense(6, 5, 3), low_rank(5, 7, 2, 4));
    let [g1, g2, g3] = batch.groups();
    assert_eq!((g1.len(), g2.len(), g3.len()), (1, 0, 1));
    assert_eq!((g1.ops()[0].m, g1.ops()[0].n), (6, 2));
}

#[test]
fn test_low_rank_dense() {
    let batch = check_pair(low_rank(6, 5, 2, 5), dense(5, 7, 6));
    let [g1, g2, g3] = batch.groups();
    assert_eq!((g1.len(), g2.len(), g3.len()), (1, 0, 1));
    assert_eq!((g1.ops()[0].m, g1.ops()[0].n), (2, 7));
}

#[test]
fn test_low_rank_low_rank_left_rank_smaller() {
    // p < q: the second stage forms (V_A * U_B) * V_B, p x cols(B)
    let batch = check_pair(low_rank(9, 8, 2, 7), low_rank(8, 10, 5, 8));
    let [g1, g2, g3] = batch.groups();
    assert_eq!((g1.len(), g2.len(), g3.len()), (1, 1, 1));
    assert_eq!((g1.ops()[0].m, g1.ops()[0].n), (2, 5));
    assert_eq!((g2.ops()[0].m, g2.ops()[0].n), (2, 10));
    assert_eq!(g3.ops()[0].k, 2);
}

#[test]
fn test_low_rank_low_rank_right_rank_smaller() {
    // p > q: the second stage forms U_A * (V_A * U_B), rows(A) x q
    let batch = check_pair(low_rank(9, 8, 5, 9), low_rank(8, 10, 2, 10));
    let [g1, g2, g3] = batch.groups();
    assert_eq!((g2.ops()[0].m, g2.ops()[0].n), (9, 2));
    assert_eq!(g3.ops()[0].k, 2);
    assert_eq!(g1.len() + g2.len() + g3.len(), 3);
}

#[test]
fn test_low_rank_low_rank_equal_ranks() {
    let batch = check_pair(low_rank(9, 8, 3, 11), low_rank(8, 10, 3, 12));
    let [_, g2, _] = batch.groups();
    assert_eq!((g2.ops()[0].m, g2.ops()[0].n), (3, 10));
}

#[test]
fn test_rank_zero_operand() {
    let a = Tile::low_rank(DenseMatrix::zeros(6, 0), DenseMatrix::zeros(0, 5)).unwrap();
    check_pair(a, low_rank(5, 7, 2, 13));
}

#[test]
fn test_many_pairs_accumulate_into_front() {
    let ctx = context();
    // Column of A tiles times a row of B tiles, all kinds mixed
    let a_tiles = [dense(4, 6, 20), low_rank(5, 6, 2, 21), low_rank(3, 6, 4, 22)];
    let b_tiles = [low_rank(6, 4, 3, 23), dense(6, 5, 24)];
    let mut ma = BlrMatrix::new(&[4, 5, 3], &[6]);
    for (k, t) in a_tiles.into_iter().enumerate() {
        ma.replace_tile(k, 0, t).unwrap();
    }
    let mut mb = BlrMatrix::new(&[6], &[4, 5]);
    for (j, t) in b_tiles.into_iter().enumerate() {
        mb.replace_tile(0, j, t).unwrap();
    }

    let f0 = random_matrix(12, 9, 25);
    let mut expected = f0.clone();
    kernels::gemm(
        -1.0,
        ma.to_dense().unwrap().as_ref(),
        mb.to_dense().unwrap().as_ref(),
        1.0,
        expected.as_mut(),
    )
    .unwrap();

    let pairs: Vec<(usize, usize)> = (0..2).flat_map(|j| (0..3).map(move |k| (k, j))).collect();
    let mut work = WorkSize::new();
    for &(k, j) in &pairs {
        multiply_inc_work_size(ma.tile(k, 0).unwrap(), mb.tile(0, j).unwrap(), &mut work);
    }
    let mut batch = MultiplyBatch::new(&work);
    for &(k, j) in &pairs {
        batch
            .add_tile_mult(
                ma.tile(k, 0).unwrap(),
                TileKey::new(0, k, 0),
                mb.tile(0, j).unwrap(),
                TileKey::new(1, 0, j),
                Target::Front {
                    row: ma.tileroff(k),
                    col: mb.tilecoff(j),
                },
            )
            .unwrap();
    }
    assert_eq!(batch.len(), 6);

    let mut front = f0.clone();
    let mut vu = vec![0.0; work.vu];
    let mut uvu = vec![0.0; work.uvu];
    let mut operands = BatchOperands {
        matrices: vec![&mut ma, &mut mb],
        front: Some(&mut front),
        vu: &mut vu,
        uvu: &mut uvu,
    };
    batch.run(&ctx, &mut operands).unwrap();
    assert_allclose_f64(front.data(), expected.data(), 1e-12, 1e-12, "front update");
}

#[test]
fn test_target_must_be_dense() {
    let ctx = context();
    let a = dense(4, 4, 30);
    let b = dense(4, 4, 31);
    let mut work = WorkSize::new();
    multiply_inc_work_size(&a, &b, &mut work);
    let mut ma = single(a);
    let mut mb = single(b);
    let mut mc = single(low_rank(4, 4, 1, 32));
    let mut batch = MultiplyBatch::new(&work);
    batch
        .add_tile_mult(
            ma.tile(0, 0).unwrap(),
            TileKey::new(0, 0, 0),
            mb.tile(0, 0).unwrap(),
            TileKey::new(1, 0, 0),
            Target::Tile(TileKey::new(2, 0, 0)),
        )
        .unwrap();
    let mut operands = BatchOperands {
        matrices: vec![&mut ma, &mut mb, &mut mc],
        front: None,
        vu: &mut [],
        uvu: &mut [],
    };
    assert!(matches!(
        batch.run(&ctx, &mut operands),
        Err(Error::TileKind { .. })
    ));
    // The output tile is put back even when the product fails
    assert!(mc.tile(0, 0).unwrap().is_low_rank());
}

#[test]
fn test_incompatible_shapes_rejected() {
    let mut batch = MultiplyBatch::new(&WorkSize::new());
    let key = TileKey::new(0, 0, 0);
    assert!(matches!(
        batch.add_tile_mult(&dense(4, 3, 1), key, &dense(4, 3, 2), key, Target::Front { row: 0, col: 0 }),
        Err(Error::ShapeMismatch { .. })
    ));
}

#[cfg(debug_assertions)]
#[test]
fn test_shuffled_populate_is_detected() {
    let pairs = [
        (low_rank(8, 6, 3, 40), low_rank(6, 8, 2, 41)),
        (dense(8, 6, 42), low_rank(6, 8, 1, 43)),
        (low_rank(8, 6, 2, 44), dense(6, 8, 45)),
    ];
    let mut work = WorkSize::new();
    for (a, b) in &pairs {
        multiply_inc_work_size(a, b, &mut work);
    }

    let mut batch = MultiplyBatch::new(&work);
    let key = TileKey::new(0, 0, 0);
    let target = Target::Front { row: 0, col: 0 };
    let (a, b) = &pairs[2];
    match batch.add_tile_mult(a, key, b, key, target) {
        Err(Error::ScheduleMismatch {
            index,
            expected,
            got,
        }) => {
            assert_eq!(index, 0);
            assert_eq!(expected, (6, 16));
            assert_eq!(got, (16, 0));
        }
        other => panic!("shuffled populate accepted: {:?}", other),
    }
}

#[cfg(debug_assertions)]
#[test]
fn test_incomplete_populate_is_detected() {
    let ctx = context();
    let pairs = [(dense(4, 4, 50), dense(4, 4, 51)), (dense(4, 4, 52), dense(4, 4, 53))];
    let mut work = WorkSize::new();
    for (a, b) in &pairs {
        multiply_inc_work_size(a, b, &mut work);
    }
    let mut ma = single(pairs[0].0.clone());
    let mut mb = single(pairs[0].1.clone());
    let mut front = DenseMatrix::zeros(4, 4);
    let mut batch = MultiplyBatch::new(&work);
    batch
        .add_tile_mult(
            ma.tile(0, 0).unwrap(),
            TileKey::new(0, 0, 0),
            mb.tile(0, 0).unwrap(),
            TileKey::new(1, 0, 0),
            Target::Front { row: 0, col: 0 },
        )
        .unwrap();
    let mut operands = BatchOperands {
        matrices: vec![&mut ma, &mut mb],
        front: Some(&mut front),
        vu: &mut [],
        uvu: &mut [],
    };
    assert!(matches!(
        batch.run(&ctx, &mut operands),
        Err(Error::ScheduleMismatch { index: 1, .. })
    ));
}
