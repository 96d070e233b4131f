//! Scalar traits tying `f32` and `f64` to their `DType` tag

use super::DType;
use bytemuck::{Pod, Zeroable};
use std::fmt::Debug;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A value that can live in a tile
///
/// `Pod` lets host staging copies go through `bytemuck` as plain bytes;
/// `Send + Sync + 'static` lets tiles cross streams and rayon tasks.
pub trait Element:
    Copy
    + Debug
    + Default
    + Send
    + Sync
    + Pod
    + Zeroable
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + PartialOrd
{
    const DTYPE: DType;

    fn to_f64(self) -> f64;

    fn from_f64(v: f64) -> Self;

    fn zero() -> Self;

    fn one() -> Self;
}

/// Scalars the LU, QR and SVD kernels can factor
pub trait LinalgElement: Element + Neg<Output = Self> {
    /// Unit roundoff of the type, widened to `f64`
    fn epsilon_val() -> f64 {
        Self::DTYPE.epsilon()
    }

    fn abs_val(&self) -> Self;

    fn sqrt_val(&self) -> Self;

    #[inline]
    fn neg_val(&self) -> Self {
        -*self
    }
}

macro_rules! impl_float {
    ($t:ty, $tag:ident) => {
        impl Element for $t {
            const DTYPE: DType = DType::$tag;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(v: f64) -> Self {
                v as $t
            }

            #[inline]
            fn zero() -> Self {
                0.0
            }

            #[inline]
            fn one() -> Self {
                1.0
            }
        }

        impl LinalgElement for $t {
            #[inline]
            fn abs_val(&self) -> Self {
                self.abs()
            }

            #[inline]
            fn sqrt_val(&self) -> Self {
                self.sqrt()
            }
        }
    };
}

impl_float!(f64, F64);
impl_float!(f32, F32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epsilon_follows_dtype() {
        assert_eq!(f64::epsilon_val(), f64::EPSILON);
        assert_eq!(f32::epsilon_val(), f32::EPSILON as f64);
    }

    #[test]
    fn test_f32_round_trips_through_f64() {
        assert_eq!(f32::from_f64(0.5).to_f64(), 0.5);
        assert_eq!(2.0f32.neg_val(), -2.0);
    }
}
