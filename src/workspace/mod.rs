//! Scratch memory partitioning
//!
//! Scratch buffers are allocated once per factorization call, sized exactly
//! from a pre-pass over tile shapes, then carved into typed sub-regions.
//! Two carving styles are provided:
//!
//! - [`ScratchStack`]: borrows disjoint mutable slices from one buffer, for
//!   kernels that need several work arrays at once.
//! - [`RegionArena`]: hands out `(offset, len)` regions that are resolved
//!   against the buffer later, for batched multiplies that are registered
//!   first and executed afterwards.
//!
//! Both check every sub-allocation against the remaining capacity.

mod arena;
mod stack;

pub use arena::{Region, RegionArena};
pub use stack::ScratchStack;
