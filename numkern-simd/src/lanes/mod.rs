//! Lane abstraction over the instruction sets.
//!
//! A [`Lanes<T>`] implementation describes a register holding `WIDTH`
//! elements of `T` and the operations a kernel may apply to it. Operations the
//! instruction set has no packed instruction for fall back to a lanewise loop
//! through a stack buffer, so every implementation computes exactly what the
//! scalar [`Element`] operations compute.
//!
//! All methods are `unsafe`: they may only be called from a context where the
//! tag's instruction set is available (see [`IsaTag::vectorize`]), and the
//! pointer methods read or write `WIDTH` elements without bounds checks.

use numkern_traits::{Element, Float};

use crate::isa::IsaTag;

mod scalar;

#[cfg(all(target_arch = "x86_64", feature = "simd"))]
mod avx;
#[cfg(all(target_arch = "x86_64", feature = "simd"))]
mod fma;
#[cfg(all(target_arch = "x86_64", feature = "simd"))]
mod sse;

/// Widest register in elements (`i8`/`u8` on 256-bit lanes).
pub const MAX_LANES: usize = 32;

/// Packed register of `T` for one instruction set.
///
/// # Safety
/// `WIDTH` must not exceed [`MAX_LANES`], and `load`/`store` must access
/// exactly `WIDTH` consecutive elements.
pub unsafe trait Lanes<T: Element>: IsaTag {
    type V: Copy;
    const WIDTH: usize;

    unsafe fn splat(x: T) -> Self::V;
    /// Unaligned load of `WIDTH` elements.
    unsafe fn load(ptr: *const T) -> Self::V;
    /// Unaligned store of `WIDTH` elements.
    unsafe fn store(ptr: *mut T, v: Self::V);
    unsafe fn add(a: Self::V, b: Self::V) -> Self::V;
    unsafe fn sub(a: Self::V, b: Self::V) -> Self::V;

    #[inline(always)]
    unsafe fn mul(a: Self::V, b: Self::V) -> Self::V {
        lanewise::<T, Self>(a, b, T::elem_mul)
    }

    #[inline(always)]
    unsafe fn div(a: Self::V, b: Self::V) -> Self::V {
        lanewise::<T, Self>(a, b, T::elem_div)
    }

    /// `a < b ? a : b` per lane.
    #[inline(always)]
    unsafe fn min(a: Self::V, b: Self::V) -> Self::V {
        lanewise::<T, Self>(a, b, T::elem_min)
    }

    /// `a > b ? a : b` per lane.
    #[inline(always)]
    unsafe fn max(a: Self::V, b: Self::V) -> Self::V {
        lanewise::<T, Self>(a, b, T::elem_max)
    }

    /// `a * b + c`, fused on FMA tags.
    #[inline(always)]
    unsafe fn mul_add(a: Self::V, b: Self::V, c: Self::V) -> Self::V {
        Self::add(Self::mul(a, b), c)
    }

    #[inline(always)]
    unsafe fn reduce_sum(v: Self::V) -> T {
        horizontal::<T, Self>(v, T::elem_add)
    }

    #[inline(always)]
    unsafe fn reduce_min(v: Self::V) -> T {
        horizontal::<T, Self>(v, T::elem_min)
    }

    #[inline(always)]
    unsafe fn reduce_max(v: Self::V) -> T {
        horizontal::<T, Self>(v, T::elem_max)
    }
}

/// Float lanes with the bit-level operations of the exp/log kernels.
///
/// Masks are all-ones / all-zeros lanes as produced by packed compares.
///
/// # Safety
/// Same contract as [`Lanes`].
pub unsafe trait FloatLanes<T: Float>: Lanes<T> {
    /// Round half to even. Valid for `|a| < 2^31`.
    unsafe fn round(a: Self::V) -> Self::V;
    /// Mask of lanes where `a > b` (ordered, false on NaN).
    unsafe fn cmp_gt(a: Self::V, b: Self::V) -> Self::V;
    unsafe fn and(a: Self::V, b: Self::V) -> Self::V;
    unsafe fn or(a: Self::V, b: Self::V) -> Self::V;
    /// `!a & b`.
    unsafe fn andnot(a: Self::V, b: Self::V) -> Self::V;
    /// `2^r` for integral `r` in the normal exponent range.
    unsafe fn pow2i(r: Self::V) -> Self::V;
    /// Unbiased exponent of a positive normal `x`, as a float.
    unsafe fn exponent(x: Self::V) -> Self::V;
    /// Significand of `x` scaled into `[1, 2)`.
    unsafe fn mantissa(x: Self::V) -> Self::V;
}

/// Loads of `Self` widened into accumulator lanes of `A`.
pub trait WidenTo<A: Element>: Element {
    fn widen_one(self) -> A;

    /// Load `L::WIDTH` elements and widen each into `A`.
    ///
    /// # Safety
    /// `ptr` must be valid for `L::WIDTH` reads.
    #[inline(always)]
    unsafe fn load_widened<L: Lanes<A>>(ptr: *const Self) -> L::V {
        let mut buf = [A::zero(); MAX_LANES];
        for (i, slot) in buf.iter_mut().take(L::WIDTH).enumerate() {
            *slot = (*ptr.add(i)).widen_one();
        }
        L::load(buf.as_ptr())
    }
}

macro_rules! impl_widen_identity {
    ($($t:ty),*) => {
        $(
            impl WidenTo<$t> for $t {
                #[inline(always)]
                fn widen_one(self) -> $t {
                    self
                }

                #[inline(always)]
                unsafe fn load_widened<L: Lanes<$t>>(ptr: *const $t) -> L::V {
                    L::load(ptr)
                }
            }
        )*
    };
}

impl_widen_identity!(i8, u8, i16, u16, i32, u32, i64, u64, f32, f64);

macro_rules! impl_widen {
    ($($t:ty => $acc:ty),*) => {
        $(
            impl WidenTo<$acc> for $t {
                #[inline(always)]
                fn widen_one(self) -> $acc {
                    self as $acc
                }
            }
        )*
    };
}

impl_widen!(i8 => i64, i16 => i64, i32 => i64, u8 => u64, u16 => u64, u32 => u64);

/// Apply `f` lane by lane.
#[inline(always)]
pub(crate) unsafe fn lanewise<T: Element, L: Lanes<T>>(
    a: L::V,
    b: L::V,
    f: impl Fn(T, T) -> T,
) -> L::V {
    let mut x = [T::zero(); MAX_LANES];
    let mut y = [T::zero(); MAX_LANES];
    L::store(x.as_mut_ptr(), a);
    L::store(y.as_mut_ptr(), b);
    for (xi, &yi) in x.iter_mut().zip(y.iter()).take(L::WIDTH) {
        *xi = f(*xi, yi);
    }
    L::load(x.as_ptr())
}

/// Fold the lanes of `v` left to right with `f`.
#[inline(always)]
pub(crate) unsafe fn horizontal<T: Element, L: Lanes<T>>(v: L::V, f: impl Fn(T, T) -> T) -> T {
    let mut x = [T::zero(); MAX_LANES];
    L::store(x.as_mut_ptr(), v);
    x[1..L::WIDTH].iter().fold(x[0], |acc, &e| f(acc, e))
}

/// Build a lane implementation from packed intrinsics.
///
/// `splat`, `load` and `store` name the intrinsics; the list after `;` maps
/// binary lane methods (`add`, `sub`, and optionally `mul`, `div`, `min`,
/// `max`) to packed intrinsics. Methods left out use the lanewise defaults.
#[cfg(all(target_arch = "x86_64", feature = "simd"))]
macro_rules! impl_lanes {
    (
        $tag:ty, $t:ty, $vec:ty, $width:expr,
        splat = $splat:ident, load = $load:ident, store = $store:ident
        $(, reduce_sum = $hsum:path)?
        ; $($op:ident = $f:ident),* $(,)?
    ) => {
        unsafe impl $crate::lanes::Lanes<$t> for $tag {
            type V = $vec;
            const WIDTH: usize = $width;

            #[inline(always)]
            unsafe fn splat(x: $t) -> $vec {
                $splat(x as _)
            }

            #[inline(always)]
            unsafe fn load(ptr: *const $t) -> $vec {
                $load(ptr.cast())
            }

            #[inline(always)]
            unsafe fn store(ptr: *mut $t, v: $vec) {
                $store(ptr.cast(), v)
            }

            $(
                #[inline(always)]
                unsafe fn reduce_sum(v: $vec) -> $t {
                    $hsum(v)
                }
            )?

            $(
                #[inline(always)]
                unsafe fn $op(a: $vec, b: $vec) -> $vec {
                    $f(a, b)
                }
            )*
        }
    };
}

#[cfg(all(target_arch = "x86_64", feature = "simd"))]
pub(crate) use impl_lanes;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::Scalar;

    #[test]
    fn test_scalar_lanes_match_element_ops() {
        unsafe {
            assert_eq!(<Scalar as Lanes<i8>>::add(127, 1), -128);
            assert_eq!(<Scalar as Lanes<u16>>::div(9, 0), 0);
            assert_eq!(<Scalar as Lanes<f32>>::mul_add(2.0, 3.0, 1.0), 7.0);
            assert_eq!(<Scalar as Lanes<i32>>::reduce_sum(5), 5);
        }
    }

    #[test]
    fn test_widened_load() {
        let src: [i8; 4] = [-1, 2, -3, 4];
        let v = unsafe { <i8 as WidenTo<i64>>::load_widened::<Scalar>(src.as_ptr().add(2)) };
        assert_eq!(v, -3i64);
        let u: [u32; 1] = [u32::MAX];
        let w = unsafe { <u32 as WidenTo<u64>>::load_widened::<Scalar>(u.as_ptr()) };
        assert_eq!(w, u32::MAX as u64);
    }
}
