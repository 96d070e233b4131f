//! Tile triples of the batched updates and their two-pass registration

use crate::blr::batch::{MultiplyBatch, Target, TileKey, WorkSize, multiply_inc_work_size};
use crate::blr::matrix::BlrMatrix;
use crate::blr::tile::Tile;
use crate::dtype::Element;
use crate::error::{Error, Result};

/// Matrix slots of the trailing-update batches
pub(super) const B11: usize = 0;
pub(super) const B12: usize = 1;
pub(super) const B21: usize = 2;

/// Matrix slots of the Schur batches, which never read B11
pub(super) const SCHUR_B12: usize = 0;
pub(super) const SCHUR_B21: usize = 1;

/// `C -= A * B`
pub(super) type Triple = (TileKey, TileKey, Target);

/// Updates of B11, B12 and B21 after eliminating block `i`
pub(super) fn trailing(i: usize, rb: usize, rb2: usize) -> Vec<Triple> {
    let mut out = Vec::new();
    for j in i + 1..rb {
        for k in i + 1..rb {
            out.push((
                TileKey::new(B11, k, i),
                TileKey::new(B11, i, j),
                Target::Tile(TileKey::new(B11, k, j)),
            ));
        }
        for k in 0..rb2 {
            out.push((
                TileKey::new(B11, j, i),
                TileKey::new(B12, i, k),
                Target::Tile(TileKey::new(B12, j, k)),
            ));
            out.push((
                TileKey::new(B21, k, i),
                TileKey::new(B11, i, j),
                Target::Tile(TileKey::new(B21, k, j)),
            ));
        }
    }
    out
}

/// Contribution of block `i` to the dense update block `F22`
pub(super) fn schur<T: Element>(i: usize, b12: &BlrMatrix<T>, b21: &BlrMatrix<T>) -> Vec<Triple> {
    let rb2 = b12.colblocks();
    let mut out = Vec::with_capacity(rb2 * rb2);
    for j in 0..rb2 {
        for k in 0..rb2 {
            out.push((
                TileKey::new(SCHUR_B21, k, i),
                TileKey::new(SCHUR_B12, i, j),
                Target::Front {
                    row: b21.tileroff(k),
                    col: b12.tilecoff(j),
                },
            ));
        }
    }
    out
}

fn lookup<'m, T: Element>(mats: &[&'m BlrMatrix<T>], key: TileKey) -> Result<&'m Tile<T>> {
    mats.get(key.matrix)
        .ok_or_else(|| Error::Internal(format!("no matrix {} in schedule", key.matrix)))?
        .tile(key.row, key.col)
}

/// Sizing pass
pub(super) fn size<T: Element>(mats: &[&BlrMatrix<T>], triples: &[Triple]) -> Result<WorkSize> {
    let mut work = WorkSize::new();
    for &(a, b, _) in triples {
        multiply_inc_work_size(lookup(mats, a)?, lookup(mats, b)?, &mut work);
    }
    Ok(work)
}

/// Populate pass, in the order of the sizing pass
pub(super) fn populate<T: Element>(
    mats: &[&BlrMatrix<T>],
    triples: &[Triple],
    batch: &mut MultiplyBatch,
) -> Result<()> {
    for &(a, b, c) in triples {
        batch.add_tile_mult(lookup(mats, a)?, a, lookup(mats, b)?, b, c)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_counts() {
        // (rb - i - 1)^2 B11 updates plus 2 * (rb - i - 1) * rb2 cross terms
        assert_eq!(trailing(0, 3, 2).len(), 4 + 8);
        assert!(trailing(2, 3, 2).is_empty());
        let t = trailing(0, 2, 1);
        assert_eq!(t[0].2, Target::Tile(TileKey::new(B11, 1, 1)));
        assert_eq!(t[1].2, Target::Tile(TileKey::new(B12, 1, 0)));
        assert_eq!(t[2].2, Target::Tile(TileKey::new(B21, 0, 1)));
    }

    #[test]
    fn test_schur_targets() {
        let b12 = BlrMatrix::<f64>::new(&[2, 2], &[3, 1]);
        let b21 = BlrMatrix::<f64>::new(&[3, 1], &[2, 2]);
        let t = schur(1, &b12, &b21);
        assert_eq!(t.len(), 4);
        assert_eq!(t[1].2, Target::Front { row: 3, col: 0 });
        assert_eq!(t[2].2, Target::Front { row: 0, col: 3 });
        assert_eq!(t[3].0, TileKey::new(SCHUR_B21, 1, 1));
    }
}
