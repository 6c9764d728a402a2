//! Exact integer arithmetic over the coefficient types used by the constraint representations.
//!
//! Every coefficient type is a signed integer; the fixed-width ones additionally advertise how
//! many magnitude bits they can hold, which is what the width selection of
//! [`ConstrExp`](crate::constraints::ConstrExp) is based on.
use std::fmt::Debug;
use std::fmt::Display;
use std::hash::Hash;

use num::BigInt;
use num::FromPrimitive;
use num::Integer;
use num::One;
use num::Signed;
use num::ToPrimitive;
use num::Zero;

/// A signed integer type which can be used as a coefficient or degree of a linear constraint.
pub trait Coefficient:
    Clone
    + Debug
    + Display
    + Default
    + Hash
    + Ord
    + Integer
    + Signed
    + ToPrimitive
    + FromPrimitive
    + 'static
{
    /// The number of magnitude bits the type can hold, or [`None`] if it is unbounded.
    const MAGNITUDE_BITS: Option<u32>;

    /// Converts a big integer into this type, if it fits.
    fn from_big(value: &BigInt) -> Option<Self>;

    /// Converts this value into a big integer.
    fn to_big(&self) -> BigInt;

    /// The number of bits required to represent the magnitude of the value.
    fn num_bits(&self) -> u32;
}

macro_rules! impl_fixed_width_coefficient {
    ($type:ty, $to:ident) => {
        impl Coefficient for $type {
            const MAGNITUDE_BITS: Option<u32> = Some(<$type>::BITS - 1);

            fn from_big(value: &BigInt) -> Option<Self> {
                value.$to()
            }

            fn to_big(&self) -> BigInt {
                BigInt::from(*self)
            }

            fn num_bits(&self) -> u32 {
                <$type>::BITS - self.unsigned_abs().leading_zeros()
            }
        }
    };
}

impl_fixed_width_coefficient!(i32, to_i32);
impl_fixed_width_coefficient!(i64, to_i64);
impl_fixed_width_coefficient!(i128, to_i128);

impl Coefficient for BigInt {
    const MAGNITUDE_BITS: Option<u32> = None;

    fn from_big(value: &BigInt) -> Option<Self> {
        Some(value.clone())
    }

    fn to_big(&self) -> BigInt {
        self.clone()
    }

    fn num_bits(&self) -> u32 {
        // constraints never get anywhere near 2^32 bits
        u32::try_from(self.bits()).unwrap_or(u32::MAX)
    }
}

/// The largest number of magnitude bits a coefficient or degree of a constraint over `Small`
/// coefficients and `Large` sums may have.
///
/// The bound leaves one bit of headroom in `Small` for adding two coefficients, and enough
/// headroom in `Large` to sum 2^32 maximal coefficients without overflow.
pub(crate) fn bit_limit<Small: Coefficient, Large: Coefficient>() -> Option<u32> {
    match (Small::MAGNITUDE_BITS, Large::MAGNITUDE_BITS) {
        (None, _) => None,
        (Some(small), None) => Some(small - 1),
        (Some(small), Some(large)) => Some((small - 1).min(large - 33)),
    }
}

/// Converts between coefficient types.
///
/// # Panics
/// If the value does not fit in the target type. Callers establish through the bit limits that
/// this cannot happen.
pub(crate) fn convert<From: Coefficient, To: Coefficient>(value: &From) -> To {
    if let Some(converted) = value.to_i128().and_then(To::from_i128) {
        return converted;
    }

    To::from_big(&value.to_big()).unwrap_or_else(|| {
        panic!(
            "{value} does not fit into {}",
            std::any::type_name::<To>()
        )
    })
}

/// Converts between coefficient types, returning [`None`] if the value does not fit.
#[cfg(test)]
pub(crate) fn try_convert<From: Coefficient, To: Coefficient>(value: &From) -> Option<To> {
    value
        .to_i128()
        .and_then(To::from_i128)
        .or_else(|| To::from_big(&value.to_big()))
}

/// Computes `⌈numerator / denominator⌉` for a positive denominator.
pub(crate) fn ceil_div<C: Coefficient>(numerator: &C, denominator: &C) -> C {
    let negated = -numerator.clone();
    -negated.div_floor(denominator)
}

/// Computes `2^exponent` in the given coefficient type.
pub(crate) fn power_of_two<C: Coefficient>(exponent: u32) -> C {
    convert::<BigInt, C>(&(BigInt::one() << exponent))
}

/// The negative part of a value, `max(0, -value)`.
pub(crate) fn negative_part<C: Coefficient>(value: &C) -> C {
    if value.is_negative() {
        -value.clone()
    } else {
        C::zero()
    }
}

/// Returns the smallest divisor of `value` which is strictly larger than `lower`, looking at most
/// `window` candidates past `lower`.
pub(crate) fn smallest_divisor_above(value: &BigInt, lower: &BigInt, window: u32) -> Option<BigInt> {
    if !value.is_positive() {
        return None;
    }

    let mut candidate = if lower.is_negative() {
        BigInt::one()
    } else {
        lower + 1
    };
    for _ in 0..window {
        if &candidate > value {
            return None;
        }
        if (value % &candidate).is_zero() {
            return Some(candidate);
        }
        candidate += 1;
    }
    None
}
