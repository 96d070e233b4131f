//! Error type shared by the kernels, the runtime and the BLR driver

use thiserror::Error;

/// Result alias used throughout blrfront
pub type Result<T> = std::result::Result<T, Error>;

/// Failures raised while compressing, multiplying or factoring BLR tiles
#[derive(Error, Debug)]
pub enum Error {
    /// Operand dimensions do not line up
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },

    /// A caller-supplied parameter is out of range
    #[error("invalid argument '{arg}': {reason}")]
    InvalidArgument { arg: &'static str, reason: String },

    /// Neither device nor managed memory could satisfy a request
    #[error("out of memory allocating {size} bytes")]
    OutOfMemory {
        /// Requested size in bytes
        size: usize,
    },

    /// A dense routine reported failure, e.g. a Jacobi sweep that did not
    /// converge or a zero pivot
    #[error("{routine} failed (info = {info})")]
    NumericalFailure { routine: &'static str, info: i64 },

    /// A sub-allocation did not fit in what is left of its scratch pool
    #[error("scratch pool '{pool}' overrun: requested {requested}, {available} left")]
    ScratchOverrun {
        pool: &'static str,
        /// Elements requested
        requested: usize,
        /// Elements still free
        available: usize,
    },

    /// The populate pass of a batched multiply diverged from its sizing pass
    #[error("multiply schedule mismatch at pair {index}: sized {expected:?}, registered {got:?}")]
    ScheduleMismatch {
        /// Position of the offending tile pair
        index: usize,
        /// `(vu, uvu)` increments recorded while sizing
        expected: (usize, usize),
        /// `(vu, uvu)` increments seen while registering
        got: (usize, usize),
    },

    /// The operation needs a tile of the other representation
    #[error("'{op}' needs a {expected} tile")]
    TileKind {
        op: &'static str,
        expected: &'static str,
    },

    /// Broken internal bookkeeping
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn shape_mismatch(expected: &[usize], got: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }

    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }

    pub fn numerical(routine: &'static str, info: i64) -> Self {
        Self::NumericalFailure { routine, info }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_failure() {
        let e = Error::ScratchOverrun {
            pool: "vu",
            requested: 12,
            available: 4,
        };
        assert_eq!(e.to_string(), "scratch pool 'vu' overrun: requested 12, 4 left");
        assert_eq!(Error::numerical("getrf", 3).to_string(), "getrf failed (info = 3)");
    }
}
