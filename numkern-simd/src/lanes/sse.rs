//! 128-bit lanes: SSE, SSE2, SSE3 and SSE4.1.
//!
//! Integer operations without a packed SSE2 instruction (8-bit multiply,
//! 32-bit multiply and min/max, every division) use the lanewise defaults;
//! the SSE4.1 tag replaces the ones SSE4.1 added.

use std::arch::x86_64::*;

use super::{impl_lanes, FloatLanes};
use crate::isa::{Sse, Sse2, Sse3, Sse41};

/// Round-to-nearest-even rounding control without exception reporting.
pub(super) const ROUND_NEAREST: i32 = _MM_FROUND_TO_NEAREST_INT | _MM_FROUND_NO_EXC;

/// `2^52`: adding it to a small non-negative integer in an `f64` places the
/// integer in the low mantissa bits.
pub(super) const F64_MAGIC: f64 = 4_503_599_627_370_496.0;
pub(super) const F64_MAGIC_BITS: i64 = 0x4330_0000_0000_0000;

#[inline(always)]
pub(super) unsafe fn hsum_ps(v: __m128) -> f32 {
    let hi = _mm_movehl_ps(v, v);
    let s = _mm_add_ps(v, hi);
    let s = _mm_add_ss(s, _mm_shuffle_ps::<0b01>(s, s));
    _mm_cvtss_f32(s)
}

#[inline(always)]
unsafe fn hsum_ps_sse3(v: __m128) -> f32 {
    let s = _mm_hadd_ps(v, v);
    _mm_cvtss_f32(_mm_hadd_ps(s, s))
}

#[inline(always)]
pub(super) unsafe fn hsum_pd(v: __m128d) -> f64 {
    let hi = _mm_unpackhi_pd(v, v);
    _mm_cvtsd_f64(_mm_add_sd(v, hi))
}

#[inline(always)]
unsafe fn hsum_pd_sse3(v: __m128d) -> f64 {
    _mm_cvtsd_f64(_mm_hadd_pd(v, v))
}

#[inline(always)]
unsafe fn round_ps_cvt(a: __m128) -> __m128 {
    // cvtps2dq honours MXCSR, which defaults to nearest-even.
    _mm_cvtepi32_ps(_mm_cvtps_epi32(a))
}

#[inline(always)]
unsafe fn round_ps_sse41(a: __m128) -> __m128 {
    _mm_round_ps::<ROUND_NEAREST>(a)
}

#[inline(always)]
unsafe fn round_pd_magic(a: __m128d) -> __m128d {
    // Exact for |a| < 2^51.
    let m = _mm_set1_pd(1.5 * F64_MAGIC);
    _mm_sub_pd(_mm_add_pd(a, m), m)
}

#[inline(always)]
unsafe fn round_pd_sse41(a: __m128d) -> __m128d {
    _mm_round_pd::<ROUND_NEAREST>(a)
}

macro_rules! f32x4 {
    ($tag:ty, $hsum:path) => {
        impl_lanes!(
            $tag, f32, __m128, 4,
            splat = _mm_set1_ps, load = _mm_loadu_ps, store = _mm_storeu_ps,
            reduce_sum = $hsum;
            add = _mm_add_ps, sub = _mm_sub_ps, mul = _mm_mul_ps, div = _mm_div_ps,
            min = _mm_min_ps, max = _mm_max_ps,
        );
    };
}

macro_rules! f64x2 {
    ($tag:ty, $hsum:path) => {
        impl_lanes!(
            $tag, f64, __m128d, 2,
            splat = _mm_set1_pd, load = _mm_loadu_pd, store = _mm_storeu_pd,
            reduce_sum = $hsum;
            add = _mm_add_pd, sub = _mm_sub_pd, mul = _mm_mul_pd, div = _mm_div_pd,
            min = _mm_min_pd, max = _mm_max_pd,
        );
    };
}

f32x4!(Sse, hsum_ps);
f32x4!(Sse2, hsum_ps);
f32x4!(Sse3, hsum_ps_sse3);
f32x4!(Sse41, hsum_ps);

f64x2!(Sse2, hsum_pd);
f64x2!(Sse3, hsum_pd_sse3);
f64x2!(Sse41, hsum_pd);

macro_rules! f32x4_float {
    ($tag:ty, $round:path) => {
        unsafe impl FloatLanes<f32> for $tag {
            #[inline(always)]
            unsafe fn round(a: __m128) -> __m128 {
                $round(a)
            }

            #[inline(always)]
            unsafe fn cmp_gt(a: __m128, b: __m128) -> __m128 {
                _mm_cmpgt_ps(a, b)
            }

            #[inline(always)]
            unsafe fn and(a: __m128, b: __m128) -> __m128 {
                _mm_and_ps(a, b)
            }

            #[inline(always)]
            unsafe fn or(a: __m128, b: __m128) -> __m128 {
                _mm_or_ps(a, b)
            }

            #[inline(always)]
            unsafe fn andnot(a: __m128, b: __m128) -> __m128 {
                _mm_andnot_ps(a, b)
            }

            #[inline(always)]
            unsafe fn pow2i(r: __m128) -> __m128 {
                let biased = _mm_cvtps_epi32(_mm_add_ps(r, _mm_set1_ps(127.0)));
                _mm_castsi128_ps(_mm_slli_epi32::<23>(biased))
            }

            #[inline(always)]
            unsafe fn exponent(x: __m128) -> __m128 {
                let field = _mm_srli_epi32::<23>(_mm_castps_si128(x));
                _mm_sub_ps(_mm_cvtepi32_ps(field), _mm_set1_ps(127.0))
            }

            #[inline(always)]
            unsafe fn mantissa(x: __m128) -> __m128 {
                let frac = _mm_castsi128_ps(_mm_set1_epi32(0x007f_ffff));
                _mm_or_ps(_mm_and_ps(x, frac), _mm_set1_ps(1.0))
            }
        }
    };
}

macro_rules! f64x2_float {
    ($tag:ty, $round:path) => {
        unsafe impl FloatLanes<f64> for $tag {
            #[inline(always)]
            unsafe fn round(a: __m128d) -> __m128d {
                $round(a)
            }

            #[inline(always)]
            unsafe fn cmp_gt(a: __m128d, b: __m128d) -> __m128d {
                _mm_cmpgt_pd(a, b)
            }

            #[inline(always)]
            unsafe fn and(a: __m128d, b: __m128d) -> __m128d {
                _mm_and_pd(a, b)
            }

            #[inline(always)]
            unsafe fn or(a: __m128d, b: __m128d) -> __m128d {
                _mm_or_pd(a, b)
            }

            #[inline(always)]
            unsafe fn andnot(a: __m128d, b: __m128d) -> __m128d {
                _mm_andnot_pd(a, b)
            }

            #[inline(always)]
            unsafe fn pow2i(r: __m128d) -> __m128d {
                let t = _mm_add_pd(r, _mm_set1_pd(F64_MAGIC + 1023.0));
                _mm_castsi128_pd(_mm_slli_epi64::<52>(_mm_castpd_si128(t)))
            }

            #[inline(always)]
            unsafe fn exponent(x: __m128d) -> __m128d {
                let field = _mm_srli_epi64::<52>(_mm_castpd_si128(x));
                let biased = _mm_castsi128_pd(_mm_or_si128(field, _mm_set1_epi64x(F64_MAGIC_BITS)));
                _mm_sub_pd(biased, _mm_set1_pd(F64_MAGIC + 1023.0))
            }

            #[inline(always)]
            unsafe fn mantissa(x: __m128d) -> __m128d {
                let frac = _mm_castsi128_pd(_mm_set1_epi64x(0x000f_ffff_ffff_ffff));
                _mm_or_pd(_mm_and_pd(x, frac), _mm_set1_pd(1.0))
            }
        }
    };
}

f32x4_float!(Sse2, round_ps_cvt);
f32x4_float!(Sse41, round_ps_sse41);
f64x2_float!(Sse2, round_pd_magic);
f64x2_float!(Sse41, round_pd_sse41);

macro_rules! int_lanes {
    ($tag:ty: $($t:ty, $width:expr, $splat:ident; $($op:ident = $f:ident),*;)*) => {
        $(
            impl_lanes!(
                $tag, $t, __m128i, $width,
                splat = $splat, load = _mm_loadu_si128, store = _mm_storeu_si128;
                $($op = $f),*
            );
        )*
    };
}

int_lanes!(Sse2:
    i8, 16, _mm_set1_epi8; add = _mm_add_epi8, sub = _mm_sub_epi8;
    u8, 16, _mm_set1_epi8; add = _mm_add_epi8, sub = _mm_sub_epi8,
        min = _mm_min_epu8, max = _mm_max_epu8;
    i16, 8, _mm_set1_epi16; add = _mm_add_epi16, sub = _mm_sub_epi16, mul = _mm_mullo_epi16,
        min = _mm_min_epi16, max = _mm_max_epi16;
    u16, 8, _mm_set1_epi16; add = _mm_add_epi16, sub = _mm_sub_epi16, mul = _mm_mullo_epi16;
    i32, 4, _mm_set1_epi32; add = _mm_add_epi32, sub = _mm_sub_epi32;
    u32, 4, _mm_set1_epi32; add = _mm_add_epi32, sub = _mm_sub_epi32;
    i64, 2, _mm_set1_epi64x; add = _mm_add_epi64, sub = _mm_sub_epi64;
    u64, 2, _mm_set1_epi64x; add = _mm_add_epi64, sub = _mm_sub_epi64;
);

int_lanes!(Sse41:
    i8, 16, _mm_set1_epi8; add = _mm_add_epi8, sub = _mm_sub_epi8,
        min = _mm_min_epi8, max = _mm_max_epi8;
    u8, 16, _mm_set1_epi8; add = _mm_add_epi8, sub = _mm_sub_epi8,
        min = _mm_min_epu8, max = _mm_max_epu8;
    i16, 8, _mm_set1_epi16; add = _mm_add_epi16, sub = _mm_sub_epi16, mul = _mm_mullo_epi16,
        min = _mm_min_epi16, max = _mm_max_epi16;
    u16, 8, _mm_set1_epi16; add = _mm_add_epi16, sub = _mm_sub_epi16, mul = _mm_mullo_epi16,
        min = _mm_min_epu16, max = _mm_max_epu16;
    i32, 4, _mm_set1_epi32; add = _mm_add_epi32, sub = _mm_sub_epi32, mul = _mm_mullo_epi32,
        min = _mm_min_epi32, max = _mm_max_epi32;
    u32, 4, _mm_set1_epi32; add = _mm_add_epi32, sub = _mm_sub_epi32, mul = _mm_mullo_epi32,
        min = _mm_min_epu32, max = _mm_max_epu32;
    i64, 2, _mm_set1_epi64x; add = _mm_add_epi64, sub = _mm_sub_epi64;
    u64, 2, _mm_set1_epi64x; add = _mm_add_epi64, sub = _mm_sub_epi64;
);
