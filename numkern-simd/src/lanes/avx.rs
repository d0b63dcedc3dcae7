//! 256-bit lanes: AVX (floats) and AVX2 (floats and integers).
//!
//! AVX has no 256-bit integer shifts, so the exponent-field manipulation of
//! the AVX float lanes runs on the two 128-bit halves.

use std::arch::x86_64::*;

use super::sse::{hsum_pd, hsum_ps, F64_MAGIC, F64_MAGIC_BITS, ROUND_NEAREST};
use super::{impl_lanes, FloatLanes};
use crate::isa::{Avx, Avx2};

#[inline(always)]
unsafe fn hsum256_ps(v: __m256) -> f32 {
    let lo = _mm256_castps256_ps128(v);
    let hi = _mm256_extractf128_ps::<1>(v);
    hsum_ps(_mm_add_ps(lo, hi))
}

#[inline(always)]
unsafe fn hsum256_pd(v: __m256d) -> f64 {
    let lo = _mm256_castpd256_pd128(v);
    let hi = _mm256_extractf128_pd::<1>(v);
    hsum_pd(_mm_add_pd(lo, hi))
}

#[inline(always)]
unsafe fn split(a: __m256i) -> (__m128i, __m128i) {
    (_mm256_castsi256_si128(a), _mm256_extractf128_si256::<1>(a))
}

#[inline(always)]
unsafe fn join(lo: __m128i, hi: __m128i) -> __m256i {
    _mm256_insertf128_si256::<1>(_mm256_castsi128_si256(lo), hi)
}

#[inline(always)]
unsafe fn avx_slli_epi32<const N: i32>(a: __m256i) -> __m256i {
    let (lo, hi) = split(a);
    join(_mm_slli_epi32::<N>(lo), _mm_slli_epi32::<N>(hi))
}

#[inline(always)]
unsafe fn avx_srli_epi32<const N: i32>(a: __m256i) -> __m256i {
    let (lo, hi) = split(a);
    join(_mm_srli_epi32::<N>(lo), _mm_srli_epi32::<N>(hi))
}

#[inline(always)]
unsafe fn avx_slli_epi64<const N: i32>(a: __m256i) -> __m256i {
    let (lo, hi) = split(a);
    join(_mm_slli_epi64::<N>(lo), _mm_slli_epi64::<N>(hi))
}

#[inline(always)]
unsafe fn avx_srli_epi64<const N: i32>(a: __m256i) -> __m256i {
    let (lo, hi) = split(a);
    join(_mm_srli_epi64::<N>(lo), _mm_srli_epi64::<N>(hi))
}

#[inline(always)]
unsafe fn avx2_slli_epi32<const N: i32>(a: __m256i) -> __m256i {
    _mm256_slli_epi32::<N>(a)
}

#[inline(always)]
unsafe fn avx2_srli_epi32<const N: i32>(a: __m256i) -> __m256i {
    _mm256_srli_epi32::<N>(a)
}

#[inline(always)]
unsafe fn avx2_slli_epi64<const N: i32>(a: __m256i) -> __m256i {
    _mm256_slli_epi64::<N>(a)
}

#[inline(always)]
unsafe fn avx2_srli_epi64<const N: i32>(a: __m256i) -> __m256i {
    _mm256_srli_epi64::<N>(a)
}

macro_rules! float_lanes_256 {
    ($tag:ty, shl32 = $shl32:ident, shr32 = $shr32:ident, shl64 = $shl64:ident, shr64 = $shr64:ident) => {
        impl_lanes!(
            $tag, f32, __m256, 8,
            splat = _mm256_set1_ps, load = _mm256_loadu_ps, store = _mm256_storeu_ps,
            reduce_sum = hsum256_ps;
            add = _mm256_add_ps, sub = _mm256_sub_ps, mul = _mm256_mul_ps, div = _mm256_div_ps,
            min = _mm256_min_ps, max = _mm256_max_ps,
        );

        impl_lanes!(
            $tag, f64, __m256d, 4,
            splat = _mm256_set1_pd, load = _mm256_loadu_pd, store = _mm256_storeu_pd,
            reduce_sum = hsum256_pd;
            add = _mm256_add_pd, sub = _mm256_sub_pd, mul = _mm256_mul_pd, div = _mm256_div_pd,
            min = _mm256_min_pd, max = _mm256_max_pd,
        );

        unsafe impl FloatLanes<f32> for $tag {
            #[inline(always)]
            unsafe fn round(a: __m256) -> __m256 {
                _mm256_round_ps::<ROUND_NEAREST>(a)
            }

            #[inline(always)]
            unsafe fn cmp_gt(a: __m256, b: __m256) -> __m256 {
                _mm256_cmp_ps::<_CMP_GT_OQ>(a, b)
            }

            #[inline(always)]
            unsafe fn and(a: __m256, b: __m256) -> __m256 {
                _mm256_and_ps(a, b)
            }

            #[inline(always)]
            unsafe fn or(a: __m256, b: __m256) -> __m256 {
                _mm256_or_ps(a, b)
            }

            #[inline(always)]
            unsafe fn andnot(a: __m256, b: __m256) -> __m256 {
                _mm256_andnot_ps(a, b)
            }

            #[inline(always)]
            unsafe fn pow2i(r: __m256) -> __m256 {
                let biased = _mm256_cvtps_epi32(_mm256_add_ps(r, _mm256_set1_ps(127.0)));
                _mm256_castsi256_ps($shl32::<23>(biased))
            }

            #[inline(always)]
            unsafe fn exponent(x: __m256) -> __m256 {
                let field = $shr32::<23>(_mm256_castps_si256(x));
                _mm256_sub_ps(_mm256_cvtepi32_ps(field), _mm256_set1_ps(127.0))
            }

            #[inline(always)]
            unsafe fn mantissa(x: __m256) -> __m256 {
                let frac = _mm256_castsi256_ps(_mm256_set1_epi32(0x007f_ffff));
                _mm256_or_ps(_mm256_and_ps(x, frac), _mm256_set1_ps(1.0))
            }
        }

        unsafe impl FloatLanes<f64> for $tag {
            #[inline(always)]
            unsafe fn round(a: __m256d) -> __m256d {
                _mm256_round_pd::<ROUND_NEAREST>(a)
            }

            #[inline(always)]
            unsafe fn cmp_gt(a: __m256d, b: __m256d) -> __m256d {
                _mm256_cmp_pd::<_CMP_GT_OQ>(a, b)
            }

            #[inline(always)]
            unsafe fn and(a: __m256d, b: __m256d) -> __m256d {
                _mm256_and_pd(a, b)
            }

            #[inline(always)]
            unsafe fn or(a: __m256d, b: __m256d) -> __m256d {
                _mm256_or_pd(a, b)
            }

            #[inline(always)]
            unsafe fn andnot(a: __m256d, b: __m256d) -> __m256d {
                _mm256_andnot_pd(a, b)
            }

            #[inline(always)]
            unsafe fn pow2i(r: __m256d) -> __m256d {
                let t = _mm256_add_pd(r, _mm256_set1_pd(F64_MAGIC + 1023.0));
                _mm256_castsi256_pd($shl64::<52>(_mm256_castpd_si256(t)))
            }

            #[inline(always)]
            unsafe fn exponent(x: __m256d) -> __m256d {
                let field = _mm256_castsi256_pd($shr64::<52>(_mm256_castpd_si256(x)));
                let magic = _mm256_castsi256_pd(_mm256_set1_epi64x(F64_MAGIC_BITS));
                _mm256_sub_pd(_mm256_or_pd(field, magic), _mm256_set1_pd(F64_MAGIC + 1023.0))
            }

            #[inline(always)]
            unsafe fn mantissa(x: __m256d) -> __m256d {
                let frac = _mm256_castsi256_pd(_mm256_set1_epi64x(0x000f_ffff_ffff_ffff));
                _mm256_or_pd(_mm256_and_pd(x, frac), _mm256_set1_pd(1.0))
            }
        }
    };
}

float_lanes_256!(
    Avx,
    shl32 = avx_slli_epi32,
    shr32 = avx_srli_epi32,
    shl64 = avx_slli_epi64,
    shr64 = avx_srli_epi64
);
float_lanes_256!(
    Avx2,
    shl32 = avx2_slli_epi32,
    shr32 = avx2_srli_epi32,
    shl64 = avx2_slli_epi64,
    shr64 = avx2_srli_epi64
);

macro_rules! int_lanes_256 {
    ($($t:ty, $width:expr, $splat:ident; $($op:ident = $f:ident),*;)*) => {
        $(
            impl_lanes!(
                Avx2, $t, __m256i, $width,
                splat = $splat, load = _mm256_loadu_si256, store = _mm256_storeu_si256;
                $($op = $f),*
            );
        )*
    };
}

int_lanes_256!(
    i8, 32, _mm256_set1_epi8; add = _mm256_add_epi8, sub = _mm256_sub_epi8,
        min = _mm256_min_epi8, max = _mm256_max_epi8;
    u8, 32, _mm256_set1_epi8; add = _mm256_add_epi8, sub = _mm256_sub_epi8,
        min = _mm256_min_epu8, max = _mm256_max_epu8;
    i16, 16, _mm256_set1_epi16; add = _mm256_add_epi16, sub = _mm256_sub_epi16,
        mul = _mm256_mullo_epi16, min = _mm256_min_epi16, max = _mm256_max_epi16;
    u16, 16, _mm256_set1_epi16; add = _mm256_add_epi16, sub = _mm256_sub_epi16,
        mul = _mm256_mullo_epi16, min = _mm256_min_epu16, max = _mm256_max_epu16;
    i32, 8, _mm256_set1_epi32; add = _mm256_add_epi32, sub = _mm256_sub_epi32,
        mul = _mm256_mullo_epi32, min = _mm256_min_epi32, max = _mm256_max_epi32;
    u32, 8, _mm256_set1_epi32; add = _mm256_add_epi32, sub = _mm256_sub_epi32,
        mul = _mm256_mullo_epi32, min = _mm256_min_epu32, max = _mm256_max_epu32;
    i64, 4, _mm256_set1_epi64x; add = _mm256_add_epi64, sub = _mm256_sub_epi64;
    u64, 4, _mm256_set1_epi64x; add = _mm256_add_epi64, sub = _mm256_sub_epi64;
);
