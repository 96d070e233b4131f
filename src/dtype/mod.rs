//! Data types supported by BLR tiles
//!
//! Tiles are stored as real floating point values. `DType` is the runtime
//! tag used in diagnostics and byte accounting; `Element` and
//! `LinalgElement` connect it to the Rust types used by the kernels.

mod element;

pub use element::{Element, LinalgElement};

use std::fmt;

/// Element type of a dense block or low-rank factor
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    /// 64-bit IEEE float
    F64,
    /// 32-bit IEEE float
    F32,
}

impl DType {
    /// Size of one element in bytes
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            Self::F64 => 8,
            Self::F32 => 4,
        }
    }

    /// Short lowercase name, as used in log output
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::F64 => "f64",
            Self::F32 => "f32",
        }
    }

    /// Machine epsilon for this type
    pub const fn epsilon(self) -> f64 {
        match self {
            Self::F64 => f64::EPSILON,
            Self::F32 => f32::EPSILON as f64,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}
