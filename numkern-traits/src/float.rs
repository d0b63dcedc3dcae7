//! Floating point element types and the constants of the exp/log kernels.
//!
//! # Exponential
//!
//! ```text
//! x  = clamp(x, EXP_MIN, EXP_MAX)
//! r  = round(x * LOG2E);  if r > x * LOG2E { r -= 1 }
//! x' = x - r * LN2_HI - r * LN2_LO          x' in [0, ln 2)
//! exp(x) = P(x') * 2^r                      P from EXP_POLY (Horner)
//! ```
//!
//! `EXP_POLY` is a Chebyshev fit of `exp` on `[-0.02, 0.71]` expressed in the
//! monomial basis (degree 7 for `f32`, degree 13 for `f64`); its truncation
//! error is far below one unit in the last place, so the result error is
//! dominated by rounding in Horner's scheme. The clamp bounds keep `2^r` a
//! normal number: values outside saturate to `exp(EXP_MIN)` / `exp(EXP_MAX)`.
//!
//! # Logarithm
//!
//! ```text
//! if x subnormal { x *= SUBNORMAL_SCALE; e0 = -SUBNORMAL_SHIFT } else { e0 = 0 }
//! x = m * 2^e,  e += e0,  m in [1, 2);  if m > SQRT2 { m /= 2; e += 1 }
//! t = (m - 1) / (m + 1)
//! ln(x) = e * LN2_HI + (2t * P(t^2) + e * LN2_LO)
//! ```
//!
//! `LOG_POLY` holds `1 / (2k + 1)`, the Maclaurin series of
//! `ln((1 + t) / (1 - t)) / 2t`, truncated where `|t| <= 0.1716` makes the
//! next term negligible.

use crate::element::Element;

/// Floating point element with the exp/log approximation constants.
pub trait Float:
    Element<Acc = Self>
    + std::ops::Sub<Output = Self>
    + std::ops::Div<Output = Self>
    + std::ops::Neg<Output = Self>
{
    /// Lower clamp of the exponential input.
    const EXP_MIN: Self;
    /// Upper clamp of the exponential input.
    const EXP_MAX: Self;
    const LOG2E: Self;
    /// High part of ln 2 with trailing zero bits so `r * LN2_HI` is exact.
    const LN2_HI: Self;
    const LN2_LO: Self;
    const SQRT2: Self;
    const HALF: Self;
    const TWO: Self;
    /// Smallest positive normal value.
    const MIN_POSITIVE: Self;
    /// Power of two that lifts every subnormal into the normal range.
    const SUBNORMAL_SCALE: Self;
    /// `log2(SUBNORMAL_SCALE)`.
    const SUBNORMAL_SHIFT: Self;
    const MAX_FINITE: Self;
    const NAN: Self;
    const INFINITY: Self;
    /// Exponential polynomial coefficients, lowest degree first.
    const EXP_POLY: &'static [Self];
    /// Logarithm series coefficients in `t^2`, lowest degree first.
    const LOG_POLY: &'static [Self];

    /// Round half to even.
    fn round_even(self) -> Self;

    /// Standard library exponential.
    fn std_exp(self) -> Self;

    /// Standard library natural logarithm.
    fn std_ln(self) -> Self;

    /// Evaluate `poly` at `x` with Horner's method.
    #[inline]
    fn horner(poly: &[Self], x: Self) -> Self {
        let mut iter = poly.iter().rev();
        let mut acc = match iter.next() {
            Some(&c) => c,
            None => return Self::zero(),
        };
        for &c in iter {
            acc = acc * x + c;
        }
        acc
    }
}

impl Float for f32 {
    const EXP_MIN: f32 = -87.3;
    const EXP_MAX: f32 = 88.376_26;
    const LOG2E: f32 = std::f32::consts::LOG2_E;
    const LN2_HI: f32 = 0.693_359_375;
    const LN2_LO: f32 = -2.121_944_4e-4;
    const SQRT2: f32 = std::f32::consts::SQRT_2;
    const HALF: f32 = 0.5;
    const TWO: f32 = 2.0;
    const MIN_POSITIVE: f32 = f32::MIN_POSITIVE;
    const SUBNORMAL_SCALE: f32 = 16_777_216.0;
    const SUBNORMAL_SHIFT: f32 = 24.0;
    const MAX_FINITE: f32 = f32::MAX;
    const NAN: f32 = f32::NAN;
    const INFINITY: f32 = f32::INFINITY;
    const EXP_POLY: &'static [f32] = &[
        1.0,
        1.0,
        4.999_997_9e-1,
        1.666_695_3e-1,
        4.164_877_5e-2,
        8.390_525e-3,
        1.291_360_6e-3,
        2.811_952_4e-4,
    ];
    const LOG_POLY: &'static [f32] = &[
        1.0,
        1.0 / 3.0,
        1.0 / 5.0,
        1.0 / 7.0,
        1.0 / 9.0,
        1.0 / 11.0,
    ];

    #[inline(always)]
    fn round_even(self) -> f32 {
        f32::round_ties_even(self)
    }

    #[inline]
    fn std_exp(self) -> f32 {
        f32::exp(self)
    }

    #[inline]
    fn std_ln(self) -> f32 {
        f32::ln(self)
    }
}

impl Float for f64 {
    const EXP_MIN: f64 = -708.39;
    const EXP_MAX: f64 = 709.436_139_303_102;
    const LOG2E: f64 = std::f64::consts::LOG2_E;
    const LN2_HI: f64 = 6.931_457_519_531_25e-1;
    const LN2_LO: f64 = 1.428_606_820_309_417_2e-6;
    const SQRT2: f64 = std::f64::consts::SQRT_2;
    const HALF: f64 = 0.5;
    const TWO: f64 = 2.0;
    const MIN_POSITIVE: f64 = f64::MIN_POSITIVE;
    const SUBNORMAL_SCALE: f64 = 18_014_398_509_481_984.0;
    const SUBNORMAL_SHIFT: f64 = 54.0;
    const MAX_FINITE: f64 = f64::MAX;
    const NAN: f64 = f64::NAN;
    const INFINITY: f64 = f64::INFINITY;
    const EXP_POLY: &'static [f64] = &[
        1.000_000_000_000_000_0,
        1.0,
        5.000_000_000_000_000e-1,
        1.666_666_666_666_670_2e-1,
        4.166_666_666_665_434_8e-2,
        8.333_333_333_521_246e-3,
        1.388_888_887_238_350_1e-3,
        1.984_127_076_805_592e-4,
        2.480_155_231_838_792_8e-5,
        2.755_822_704_958_669_3e-6,
        2.754_109_304_070_776_5e-7,
        2.524_796_608_713_808_6e-8,
        1.936_094_661_232_661_2e-9,
        2.272_560_886_478_083_6e-10,
    ];
    const LOG_POLY: &'static [f64] = &[
        1.0,
        1.0 / 3.0,
        1.0 / 5.0,
        1.0 / 7.0,
        1.0 / 9.0,
        1.0 / 11.0,
        1.0 / 13.0,
        1.0 / 15.0,
        1.0 / 17.0,
        1.0 / 19.0,
        1.0 / 21.0,
    ];

    #[inline(always)]
    fn round_even(self) -> f64 {
        f64::round_ties_even(self)
    }

    #[inline]
    fn std_exp(self) -> f64 {
        f64::exp(self)
    }

    #[inline]
    fn std_ln(self) -> f64 {
        f64::ln(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reference_exp<T: Float>(x: T) -> T {
        let t = x * T::LOG2E;
        let mut r = t.round_even();
        if r > t {
            r = r - T::one();
        }
        let reduced = x - r * T::LN2_HI - r * T::LN2_LO;
        let p = T::horner(T::EXP_POLY, reduced);
        let steps = num_traits::ToPrimitive::to_i32(&r).unwrap_or(0).unsigned_abs();
        let scale = (0..steps).fold(T::one(), |acc, _| acc * T::TWO);
        if r < T::zero() {
            p / scale
        } else {
            p * scale
        }
    }

    #[test]
    fn test_exp_polynomial_matches_std_f32() {
        for i in -80..=80 {
            let x = i as f32 * 0.37;
            assert_relative_eq!(reference_exp(x), x.exp(), max_relative = 1e-6);
        }
    }

    #[test]
    fn test_exp_polynomial_matches_std_f64() {
        for i in -700..=700 {
            let x = i as f64 * 0.731;
            assert_relative_eq!(reference_exp(x), x.exp(), max_relative = 1e-14);
        }
    }

    #[test]
    fn test_ln2_split_sums_to_ln2() {
        assert_relative_eq!(
            f64::from(f32::LN2_HI) + f64::from(f32::LN2_LO),
            std::f64::consts::LN_2,
            max_relative = 1e-9
        );
        assert_relative_eq!(f64::LN2_HI + f64::LN2_LO, std::f64::consts::LN_2, max_relative = 1e-15);
    }

    #[test]
    fn test_exp_clamp_keeps_exponent_normal() {
        assert!(f32::EXP_MIN.exp() >= f32::MIN_POSITIVE);
        assert!(f32::EXP_MAX.exp().is_finite());
        assert!(f64::EXP_MIN.exp() >= f64::MIN_POSITIVE);
        assert!(f64::EXP_MAX.exp().is_finite());
    }

    #[test]
    fn test_subnormal_scale_reaches_normal_range() {
        assert_eq!(f32::SUBNORMAL_SCALE, 2f32.powf(f32::SUBNORMAL_SHIFT));
        assert_eq!(f64::SUBNORMAL_SCALE, 2f64.powf(f64::SUBNORMAL_SHIFT));
        assert!(f32::from_bits(1) * f32::SUBNORMAL_SCALE >= f32::MIN_POSITIVE);
        assert!(f64::from_bits(1) * f64::SUBNORMAL_SCALE >= f64::MIN_POSITIVE);
    }

    #[test]
    fn test_horner() {
        // 1 + 2x + 3x^2 at x = 2
        assert_eq!(f64::horner(&[1.0, 2.0, 3.0], 2.0), 17.0);
        assert_eq!(f32::horner(&[], 2.0), 0.0);
    }
}
