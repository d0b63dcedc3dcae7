//! Exponential and natural logarithm.
//!
//! The vector bodies are generic over [`FloatLanes`]; the scalar tail of every
//! variant runs the same body on [`Scalar`] lanes, so one element gives the
//! same bits whether it lands in a vector group or in the tail. The portable
//! variant calls the standard library behind the same clamp and NaN rules.

use numkern_traits::Float;

use crate::isa::Scalar;
use crate::lanes::{FloatLanes, Lanes};

/// `exp` of one register.
#[inline(always)]
pub unsafe fn exp_lanes<T: Float, L: FloatLanes<T>>(x: L::V) -> L::V {
    // max/min return their second operand on NaN, so NaN passes the clamp.
    let x = L::min(L::splat(T::EXP_MAX), L::max(L::splat(T::EXP_MIN), x));
    let t = L::mul(x, L::splat(T::LOG2E));
    let mut r = L::round(t);
    r = L::sub(r, L::and(L::cmp_gt(r, t), L::splat(T::one())));
    let hi = L::mul(r, L::splat(T::LN2_HI));
    let lo = L::mul(r, L::splat(T::LN2_LO));
    let x = L::sub(L::sub(x, hi), lo);
    let p = horner::<T, L>(T::EXP_POLY, x);
    L::mul(p, L::pow2i(r))
}

/// `ln` of one register.
#[inline(always)]
pub unsafe fn log_lanes<T: Float, L: FloatLanes<T>>(x: L::V) -> L::V {
    let one = L::splat(T::one());
    // Subnormals are scaled into the normal range before the exponent is read.
    let tiny = L::cmp_gt(L::splat(T::MIN_POSITIVE), x);
    let xs = L::or(L::andnot(tiny, x), L::and(tiny, L::mul(x, L::splat(T::SUBNORMAL_SCALE))));
    let xc = L::max(xs, L::splat(T::MIN_POSITIVE));
    let mut e = L::sub(L::exponent(xc), L::and(tiny, L::splat(T::SUBNORMAL_SHIFT)));
    let mut m = L::mantissa(xc);

    // Fold m into [sqrt(2)/2, sqrt(2)].
    let above = L::cmp_gt(m, L::splat(T::SQRT2));
    m = L::sub(m, L::and(above, L::mul(m, L::splat(T::HALF))));
    e = L::add(e, L::and(above, one));

    let t = L::div(L::sub(m, one), L::add(m, one));
    let p = horner::<T, L>(T::LOG_POLY, L::mul(t, t));
    let tail = L::mul_add(L::add(t, t), p, L::mul(e, L::splat(T::LN2_LO)));
    let ln = L::add(L::mul(e, L::splat(T::LN2_HI)), tail);

    let invalid = L::andnot(L::cmp_gt(x, L::splat(T::zero())), L::splat(T::NAN));
    let ln = L::or(ln, invalid);
    let inf = L::cmp_gt(x, L::splat(T::MAX_FINITE));
    L::or(L::andnot(inf, ln), L::and(inf, L::splat(T::INFINITY)))
}

#[inline(always)]
unsafe fn horner<T: Float, L: Lanes<T>>(poly: &[T], x: L::V) -> L::V {
    let mut iter = poly.iter().rev();
    let mut acc = match iter.next() {
        Some(&c) => L::splat(c),
        None => return L::splat(T::zero()),
    };
    for &c in iter {
        acc = L::mul_add(acc, x, L::splat(c));
    }
    acc
}

macro_rules! unary_kernel {
    ($(#[$doc:meta])* $name:ident, $body:ident) => {
        $(#[$doc])*
        ///
        /// # Safety
        /// `dst` must be valid for `n` writes and `src` for `n` reads.
        #[inline(always)]
        pub unsafe fn $name<T: Float, L: FloatLanes<T>>(dst: *mut T, src: *const T, n: usize)
        where
            Scalar: FloatLanes<T> + Lanes<T, V = T>,
        {
            let w = L::WIDTH;
            let mut i = 0;
            while i + 4 * w <= n {
                let r0 = $body::<T, L>(L::load(src.add(i)));
                let r1 = $body::<T, L>(L::load(src.add(i + w)));
                let r2 = $body::<T, L>(L::load(src.add(i + 2 * w)));
                let r3 = $body::<T, L>(L::load(src.add(i + 3 * w)));
                L::store(dst.add(i), r0);
                L::store(dst.add(i + w), r1);
                L::store(dst.add(i + 2 * w), r2);
                L::store(dst.add(i + 3 * w), r3);
                i += 4 * w;
            }
            while i + w <= n {
                L::store(dst.add(i), $body::<T, L>(L::load(src.add(i))));
                i += w;
            }
            while i < n {
                *dst.add(i) = $body::<T, Scalar>(*src.add(i));
                i += 1;
            }
        }
    };
}

unary_kernel!(
    /// `dst[i] = exp(src[i])`.
    exp,
    exp_lanes
);
unary_kernel!(
    /// `dst[i] = ln(src[i])`.
    log,
    log_lanes
);

/// Standard library `exp` behind the kernel clamp.
#[inline]
pub fn exp_portable_one<T: Float>(x: T) -> T {
    T::EXP_MAX.elem_min(T::EXP_MIN.elem_max(x)).std_exp()
}

/// Standard library `ln` with the kernel's domain rules.
#[inline]
pub fn log_portable_one<T: Float>(x: T) -> T {
    if x > T::zero() {
        x.std_ln()
    } else {
        T::NAN
    }
}

/// # Safety
/// `dst` must be valid for `n` writes and `src` for `n` reads.
pub unsafe fn exp_portable<T: Float>(dst: *mut T, src: *const T, n: usize) {
    for i in 0..n {
        *dst.add(i) = exp_portable_one(*src.add(i));
    }
}

/// # Safety
/// `dst` must be valid for `n` writes and `src` for `n` reads.
pub unsafe fn log_portable<T: Float>(dst: *mut T, src: *const T, n: usize) {
    for i in 0..n {
        *dst.add(i) = log_portable_one(*src.add(i));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn scalar_exp(x: f64) -> f64 {
        unsafe { exp_lanes::<f64, Scalar>(x) }
    }

    fn scalar_log(x: f32) -> f32 {
        unsafe { log_lanes::<f32, Scalar>(x) }
    }

    #[test]
    fn test_exp_identities() {
        assert_eq!(scalar_exp(0.0), 1.0);
        assert_eq!(unsafe { exp_lanes::<f32, Scalar>(0.0) }, 1.0);
        assert_relative_eq!(scalar_exp(1.0), std::f64::consts::E, max_relative = 1e-15);
        assert!(scalar_exp(f64::NAN).is_nan());
    }

    #[test]
    fn test_exp_saturates_like_portable() {
        assert_eq!(scalar_exp(-1.0e4), scalar_exp(f64::EXP_MIN));
        assert_relative_eq!(scalar_exp(1.0e4), exp_portable_one(1.0e4), max_relative = 1e-14);
        assert_relative_eq!(scalar_exp(f64::NEG_INFINITY), exp_portable_one(f64::NEG_INFINITY), max_relative = 1e-14);
        assert!(scalar_exp(f64::INFINITY).is_finite());
    }

    #[test]
    fn test_log_special_values() {
        assert_eq!(scalar_log(1.0), 0.0);
        assert!(scalar_log(0.0).is_nan());
        assert!(scalar_log(-2.0).is_nan());
        assert!(scalar_log(f32::NAN).is_nan());
        assert_eq!(scalar_log(f32::INFINITY), f32::INFINITY);
        assert!(log_portable_one(0.0f32).is_nan());
        assert!(log_portable_one(f64::NEG_INFINITY).is_nan());
    }

    #[test]
    fn test_log_matches_std() {
        let mut x = 1.0e-30f32;
        while x < 1.0e30 {
            assert_relative_eq!(scalar_log(x), x.ln(), max_relative = 1e-6, epsilon = 1e-6);
            x *= 3.7;
        }
        for i in 1..2000 {
            let x = i as f64 * 0.013;
            let got = unsafe { log_lanes::<f64, Scalar>(x) };
            assert_relative_eq!(got, x.ln(), max_relative = 1e-14, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_log_of_subnormals() {
        for x in [1.0e-40f32, 1.0e-45, f32::MIN_POSITIVE / 3.0] {
            assert_relative_eq!(scalar_log(x), x.ln(), max_relative = 1e-6);
            assert_eq!(log_portable_one(x), x.ln());
        }
        for x in [1.0e-310f64, 5.0e-324, f64::MIN_POSITIVE * 0.75] {
            let got = unsafe { log_lanes::<f64, Scalar>(x) };
            assert_relative_eq!(got, x.ln(), max_relative = 1e-14);
            assert_eq!(log_portable_one(x), x.ln());
        }
        assert!((scalar_log(1.0e-40) + 92.103_4).abs() < 1e-3);
    }

    #[test]
    fn test_log_of_exp_round_trips() {
        for i in -50..=50 {
            let x = i as f64 * 0.4;
            let y = unsafe { log_lanes::<f64, Scalar>(scalar_exp(x)) };
            assert_relative_eq!(y, x, max_relative = 1e-13, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_tail_uses_kernel_polynomial() {
        let src: Vec<f32> = (0..7).map(|i| i as f32 * 0.9 - 3.0).collect();
        let mut dst = vec![0.0f32; 7];
        unsafe { exp::<f32, Scalar>(dst.as_mut_ptr(), src.as_ptr(), 7) };
        for (d, s) in dst.iter().zip(&src) {
            assert_eq!(*d, unsafe { exp_lanes::<f32, Scalar>(*s) });
        }
    }
}
