//! Element types accepted by the kernels.
//!
//! The scalar operations on [`Element`] mirror what one lane of the matching
//! vector instruction computes, so the portable kernels can serve as the
//! reference for every accelerated variant:
//!
//! - integer `+ - *` wrap (two's complement), division by zero yields 0 and
//!   `MIN / -1` wraps to `MIN`
//! - float operations are plain IEEE-754
//! - `elem_min(a, b)` is `if a < b { a } else { b }` and `elem_max(a, b)` is
//!   `if a > b { a } else { b }`, the exact semantics of `minps`/`maxps`
//!   (the second operand wins on NaN).

use std::fmt::Debug;

use num_traits::{Bounded, NumCast, One, WrappingAdd, WrappingMul, WrappingSub, Zero};

/// Numeric element of a dense container.
pub trait Element:
    Copy + Default + PartialOrd + Debug + Send + Sync + Zero + One + Bounded + NumCast + 'static
{
    /// Accumulator used by sum reductions.
    type Acc: Element;

    /// Short type name used in diagnostics.
    const NAME: &'static str;

    /// `true` for `f32` and `f64`.
    const IS_FLOAT: bool;

    fn elem_add(self, rhs: Self) -> Self;
    fn elem_sub(self, rhs: Self) -> Self;
    fn elem_mul(self, rhs: Self) -> Self;
    fn elem_div(self, rhs: Self) -> Self;

    #[inline(always)]
    fn elem_min(self, rhs: Self) -> Self {
        if self < rhs {
            self
        } else {
            rhs
        }
    }

    #[inline(always)]
    fn elem_max(self, rhs: Self) -> Self {
        if self > rhs {
            self
        } else {
            rhs
        }
    }

    /// Identity of `min`: the type maximum, `+inf` for floats.
    #[inline(always)]
    fn highest() -> Self {
        Self::max_value()
    }

    /// Identity of `max`: the type minimum, `-inf` for floats.
    #[inline(always)]
    fn lowest() -> Self {
        Self::min_value()
    }

    /// Lossless conversion into the accumulator type.
    fn widen(self) -> Self::Acc;

    /// Element count converted to this type, saturating at the type maximum.
    #[inline]
    fn from_count(count: usize) -> Self {
        <Self as NumCast>::from(count).unwrap_or_else(Self::max_value)
    }
}

macro_rules! impl_int_element {
    ($($t:ty => $acc:ty),* $(,)?) => {
        $(
            impl Element for $t {
                type Acc = $acc;
                const NAME: &'static str = stringify!($t);
                const IS_FLOAT: bool = false;

                #[inline(always)]
                fn elem_add(self, rhs: Self) -> Self {
                    WrappingAdd::wrapping_add(&self, &rhs)
                }

                #[inline(always)]
                fn elem_sub(self, rhs: Self) -> Self {
                    WrappingSub::wrapping_sub(&self, &rhs)
                }

                #[inline(always)]
                fn elem_mul(self, rhs: Self) -> Self {
                    WrappingMul::wrapping_mul(&self, &rhs)
                }

                #[inline(always)]
                fn elem_div(self, rhs: Self) -> Self {
                    if rhs == 0 {
                        0
                    } else {
                        self.wrapping_div(rhs)
                    }
                }

                #[inline(always)]
                fn widen(self) -> $acc {
                    self as $acc
                }
            }
        )*
    };
}

impl_int_element!(
    i8 => i64,
    i16 => i64,
    i32 => i64,
    i64 => i64,
    u8 => u64,
    u16 => u64,
    u32 => u64,
    u64 => u64,
);

macro_rules! impl_float_element {
    ($($t:ty),*) => {
        $(
            impl Element for $t {
                type Acc = $t;
                const NAME: &'static str = stringify!($t);
                const IS_FLOAT: bool = true;

                #[inline(always)]
                fn elem_add(self, rhs: Self) -> Self {
                    self + rhs
                }

                #[inline(always)]
                fn elem_sub(self, rhs: Self) -> Self {
                    self - rhs
                }

                #[inline(always)]
                fn elem_mul(self, rhs: Self) -> Self {
                    self * rhs
                }

                #[inline(always)]
                fn elem_div(self, rhs: Self) -> Self {
                    self / rhs
                }

                #[inline(always)]
                fn highest() -> Self {
                    <$t>::INFINITY
                }

                #[inline(always)]
                fn lowest() -> Self {
                    <$t>::NEG_INFINITY
                }

                #[inline(always)]
                fn widen(self) -> $t {
                    self
                }
            }
        )*
    };
}

impl_float_element!(f32, f64);
