//! FMA variants: the float lanes of the base tag with a fused `mul_add`.

use std::arch::x86_64::*;

use super::{FloatLanes, Lanes};
use crate::isa::{Avx, Avx2, Avx2Fma, AvxFma, Sse41, Sse41Fma};

macro_rules! delegate {
    ($base:ty, $t:ty: $($name:ident($($arg:ident),*) -> $ret:ty;)*) => {
        $(
            #[inline(always)]
            unsafe fn $name($($arg: Self::V),*) -> $ret {
                <$base as Lanes<$t>>::$name($($arg),*)
            }
        )*
    };
}

macro_rules! delegate_float {
    ($base:ty, $t:ty: $($name:ident($($arg:ident),*);)*) => {
        $(
            #[inline(always)]
            unsafe fn $name($($arg: Self::V),*) -> Self::V {
                <$base as FloatLanes<$t>>::$name($($arg),*)
            }
        )*
    };
}

macro_rules! impl_fma {
    ($tag:ty => $base:ty: $($t:ty = $fmadd:ident),*) => {
        $(
            unsafe impl Lanes<$t> for $tag {
                type V = <$base as Lanes<$t>>::V;
                const WIDTH: usize = <$base as Lanes<$t>>::WIDTH;

                #[inline(always)]
                unsafe fn splat(x: $t) -> Self::V {
                    <$base as Lanes<$t>>::splat(x)
                }

                #[inline(always)]
                unsafe fn load(ptr: *const $t) -> Self::V {
                    <$base as Lanes<$t>>::load(ptr)
                }

                #[inline(always)]
                unsafe fn store(ptr: *mut $t, v: Self::V) {
                    <$base as Lanes<$t>>::store(ptr, v)
                }

                delegate!($base, $t:
                    add(a, b) -> Self::V;
                    sub(a, b) -> Self::V;
                    mul(a, b) -> Self::V;
                    div(a, b) -> Self::V;
                    min(a, b) -> Self::V;
                    max(a, b) -> Self::V;
                    reduce_sum(v) -> $t;
                    reduce_min(v) -> $t;
                    reduce_max(v) -> $t;
                );

                #[inline(always)]
                unsafe fn mul_add(a: Self::V, b: Self::V, c: Self::V) -> Self::V {
                    $fmadd(a, b, c)
                }
            }

            unsafe impl FloatLanes<$t> for $tag {
                delegate_float!($base, $t:
                    round(a);
                    cmp_gt(a, b);
                    and(a, b);
                    or(a, b);
                    andnot(a, b);
                    pow2i(r);
                    exponent(x);
                    mantissa(x);
                );
            }
        )*
    };
}

impl_fma!(Sse41Fma => Sse41: f32 = _mm_fmadd_ps, f64 = _mm_fmadd_pd);
impl_fma!(AvxFma => Avx: f32 = _mm256_fmadd_ps, f64 = _mm256_fmadd_pd);
impl_fma!(Avx2Fma => Avx2: f32 = _mm256_fmadd_ps, f64 = _mm256_fmadd_pd);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CpuFeatures;
    use crate::isa::{Isa, IsaTag};

    #[test]
    fn test_fused_mul_add_rounds_once() {
        if !CpuFeatures::host().supports(Isa::Sse41Fma) {
            return;
        }
        // (1 + 2^-23)(1 - 2^-23) - 1 = -2^-46 exactly, lost without fusion.
        let e = f32::EPSILON;
        let mut out = [0.0f32; 4];
        unsafe {
            Sse41Fma::vectorize(|| {
                let v = <Sse41Fma as Lanes<f32>>::mul_add(
                    <Sse41Fma as Lanes<f32>>::splat(1.0 + e),
                    <Sse41Fma as Lanes<f32>>::splat(1.0 - e),
                    <Sse41Fma as Lanes<f32>>::splat(-1.0),
                );
                <Sse41Fma as Lanes<f32>>::store(out.as_mut_ptr(), v);
            })
        }
        assert_eq!(out, [-e * e; 4]);
    }
}
