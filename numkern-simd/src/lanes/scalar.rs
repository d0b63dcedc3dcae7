//! One-element lanes for the portable variant and the scalar tails.

use numkern_traits::{Element, Float};

use super::{FloatLanes, Lanes};
use crate::isa::Scalar;

unsafe impl<T: Element> Lanes<T> for Scalar {
    type V = T;
    const WIDTH: usize = 1;

    #[inline(always)]
    unsafe fn splat(x: T) -> T {
        x
    }

    #[inline(always)]
    unsafe fn load(ptr: *const T) -> T {
        *ptr
    }

    #[inline(always)]
    unsafe fn store(ptr: *mut T, v: T) {
        *ptr = v;
    }

    #[inline(always)]
    unsafe fn add(a: T, b: T) -> T {
        a.elem_add(b)
    }

    #[inline(always)]
    unsafe fn sub(a: T, b: T) -> T {
        a.elem_sub(b)
    }

    #[inline(always)]
    unsafe fn mul(a: T, b: T) -> T {
        a.elem_mul(b)
    }

    #[inline(always)]
    unsafe fn div(a: T, b: T) -> T {
        a.elem_div(b)
    }

    #[inline(always)]
    unsafe fn min(a: T, b: T) -> T {
        a.elem_min(b)
    }

    #[inline(always)]
    unsafe fn max(a: T, b: T) -> T {
        a.elem_max(b)
    }

    #[inline(always)]
    unsafe fn reduce_sum(v: T) -> T {
        v
    }

    #[inline(always)]
    unsafe fn reduce_min(v: T) -> T {
        v
    }

    #[inline(always)]
    unsafe fn reduce_max(v: T) -> T {
        v
    }
}

macro_rules! impl_scalar_float {
    (
        $t:ty, $bits:ty, $ibits:ty,
        mantissa_bits = $mant:expr, bias = $bias:expr, one = $one:expr
    ) => {
        unsafe impl FloatLanes<$t> for Scalar {
            #[inline(always)]
            unsafe fn round(a: $t) -> $t {
                Float::round_even(a)
            }

            #[inline(always)]
            unsafe fn cmp_gt(a: $t, b: $t) -> $t {
                if a > b {
                    <$t>::from_bits(!0)
                } else {
                    0.0
                }
            }

            #[inline(always)]
            unsafe fn and(a: $t, b: $t) -> $t {
                <$t>::from_bits(a.to_bits() & b.to_bits())
            }

            #[inline(always)]
            unsafe fn or(a: $t, b: $t) -> $t {
                <$t>::from_bits(a.to_bits() | b.to_bits())
            }

            #[inline(always)]
            unsafe fn andnot(a: $t, b: $t) -> $t {
                <$t>::from_bits(!a.to_bits() & b.to_bits())
            }

            #[inline(always)]
            unsafe fn pow2i(r: $t) -> $t {
                let biased = (r + $bias as $t) as $ibits as $bits;
                <$t>::from_bits(biased << $mant)
            }

            #[inline(always)]
            unsafe fn exponent(x: $t) -> $t {
                let field = (x.to_bits() >> $mant) & ((1 << (<$bits>::BITS - 1 - $mant)) - 1);
                field as $t - $bias as $t
            }

            #[inline(always)]
            unsafe fn mantissa(x: $t) -> $t {
                let frac = x.to_bits() & ((1 << $mant) - 1);
                <$t>::from_bits(frac | $one)
            }
        }
    };
}

impl_scalar_float!(f32, u32, i32, mantissa_bits = 23, bias = 127, one = 0x3f80_0000);
impl_scalar_float!(f64, u64, i64, mantissa_bits = 52, bias = 1023, one = 0x3ff0_0000_0000_0000);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_bits() {
        unsafe {
            assert_eq!(<Scalar as FloatLanes<f32>>::pow2i(-3.0), 0.125);
            assert_eq!(<Scalar as FloatLanes<f64>>::pow2i(10.0), 1024.0);
            assert_eq!(<Scalar as FloatLanes<f32>>::exponent(12.0), 3.0);
            assert_eq!(<Scalar as FloatLanes<f64>>::exponent(0.375), -2.0);
            assert_eq!(<Scalar as FloatLanes<f32>>::mantissa(12.0), 1.5);
            assert_eq!(<Scalar as FloatLanes<f64>>::mantissa(0.375), 1.5);
            assert_eq!(<Scalar as FloatLanes<f64>>::round(2.5), 2.0);
            assert_eq!(<Scalar as FloatLanes<f32>>::round(-3.5), -4.0);
        }
    }

    #[test]
    fn test_masks() {
        unsafe {
            let m = <Scalar as FloatLanes<f32>>::cmp_gt(2.0, 1.0);
            assert_eq!(<Scalar as FloatLanes<f32>>::and(m, 1.0), 1.0);
            let none = <Scalar as FloatLanes<f32>>::cmp_gt(1.0, f32::NAN);
            assert_eq!(<Scalar as FloatLanes<f32>>::and(none, 1.0), 0.0);
            assert_eq!(<Scalar as FloatLanes<f64>>::andnot(none as f64, 4.0), 4.0);
        }
    }
}
