//! Schur complement of the eliminated block into the dense update block

use super::schedule::{self, SCHUR_B12, SCHUR_B21};
use crate::blr::batch::{BatchOperands, MultiplyBatch, WorkSize};
use crate::blr::matrix::BlrMatrix;
use crate::dense::DenseMatrix;
use crate::dtype::LinalgElement;
use crate::error::Result;
use crate::runtime::{DeviceMemory, FactorContext, HostMemory, Runtime, Stream};

/// `F22 -= B21 * B12`, one batch per block row of B12
///
/// Scratch is allocated once for the largest batch. The first batch runs
/// alongside the migration of the finished B11 tiles to host; the two touch
/// disjoint tiles.
pub(super) fn update<R: Runtime, T: LinalgElement>(
    ctx: &FactorContext<R>,
    b11: &mut BlrMatrix<T>,
    b12: &mut BlrMatrix<T>,
    b21: &mut BlrMatrix<T>,
    f22: &mut DenseMatrix<T>,
    staging: &mut HostMemory<T>,
) -> Result<()> {
    let rb = b11.rowblocks();
    let schedules: Vec<_> = (0..rb).map(|i| schedule::schur(i, b12, b21)).collect();
    let sizes = schedules
        .iter()
        .map(|triples| schedule::size(&[&*b12, &*b21], triples))
        .collect::<Result<Vec<WorkSize>>>()?;
    let (vu_len, uvu_len) = WorkSize::max_capacity(&sizes);
    log::debug!(
        "schur update: {} batches, scratch vu={} uvu={}",
        rb,
        vu_len,
        uvu_len
    );

    let allocator = ctx.allocator();
    let mut vu = DeviceMemory::<T, _>::zeroed(&allocator, vu_len)?;
    let mut uvu = DeviceMemory::<T, _>::zeroed(&allocator, uvu_len)?;

    for (i, (triples, work)) in schedules.iter().zip(&sizes).enumerate() {
        let mut batch = MultiplyBatch::with_capacity(work, vu_len, uvu_len);
        schedule::populate(&[&*b12, &*b21], triples, &mut batch)?;
        log::trace!("schur batch {}: {} products, {} flops", i, batch.len(), batch.flops());

        let mut matrices = Vec::with_capacity(2);
        matrices.insert(SCHUR_B12, &mut *b12);
        matrices.insert(SCHUR_B21, &mut *b21);
        let mut operands = BatchOperands {
            matrices,
            front: Some(&mut *f22),
            vu: &mut vu[..],
            uvu: &mut uvu[..],
        };

        if i == 0 {
            let (moved, updated) = rayon::join(
                || b11.move_to_host(ctx, staging),
                || batch.run(ctx, &mut operands),
            );
            moved?;
            updated?;
        } else {
            batch.run(ctx, &mut operands)?;
        }
        ctx.comp_stream().synchronize()?;
    }
    Ok(())
}
