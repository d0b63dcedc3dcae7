//! Runtime selection of kernel variants.
//!
//! Each element type declares, per [`OpClass`], a priority chain of
//! instruction sets. [`Dispatcher::select`] walks the chain and returns the
//! first entry the capability snapshot supports, or [`Isa::None`]. The
//! [`KernelElement`] methods then `match` on that [`Isa`] and run the generic
//! kernel instantiated with the matching tag inside its `vectorize` frame.

use numkern_traits::{Element, Float};

use crate::cpu::CpuFeatures;
use crate::isa::Isa;
use crate::kernels::{arith, linalg, reduce, transcend};
use crate::kernels::{AddOp, DivOp, MaxOp, MinOp, MulOp, SubOp, SumOp};

/// Operation families with their own priority chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpClass {
    Arith,
    Reduce,
    Transcendental,
    Linalg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Picks kernel variants from a capability snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatcher {
    features: CpuFeatures,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::host()
    }
}

impl Dispatcher {
    /// Dispatcher over the process-wide detected features.
    pub fn host() -> Self {
        Self::new(*CpuFeatures::host())
    }

    /// Dispatcher over an explicit snapshot, restricted to what the host
    /// actually supports.
    pub fn new(features: CpuFeatures) -> Self {
        Self {
            features: features.intersect(*CpuFeatures::host()),
        }
    }

    /// Dispatcher over `features` as given.
    ///
    /// # Safety
    /// Kernels selected by this dispatcher run with every instruction set in
    /// `features`; the host must support all of them before any kernel call.
    /// Pure selection (`select`, `select_for`) is always fine.
    pub const unsafe fn new_unchecked(features: CpuFeatures) -> Self {
        Self { features }
    }

    pub const fn features(&self) -> CpuFeatures {
        self.features
    }

    /// First entry of `chain` whose features are all present.
    pub fn select(&self, chain: &[Isa]) -> Isa {
        chain
            .iter()
            .copied()
            .find(|&isa| self.features.supports(isa))
            .unwrap_or(Isa::None)
    }

    /// Variant for element type `T` and operation family `class`.
    pub fn select_for<T: KernelElement>(&self, class: OpClass) -> Isa {
        let isa = self.select(T::chain(class));
        tracing::trace!(element = T::NAME, ?class, %isa, "selected kernel variant");
        isa
    }
}

/// Run `$body` with the type alias `$L` bound to the tag of `$isa`.
///
/// Only the listed tags are instantiated; anything else runs `portable`
/// (by default `$body` on scalar lanes).
macro_rules! dispatch {
    ($isa:expr, [$($tag:ident),*], |$L:ident| $body:expr, portable = $portable:expr) => {
        match $isa {
            $(
                #[cfg(all(target_arch = "x86_64", feature = "simd"))]
                Isa::$tag => {
                    type $L = crate::isa::$tag;
                    <$L as crate::isa::IsaTag>::vectorize(|| $body)
                }
            )*
            _ => $portable,
        }
    };
    ($isa:expr, [$($tag:ident),*], |$L:ident| $body:expr) => {
        dispatch!($isa, [$($tag),*], |$L| $body, portable = {
            type $L = crate::isa::Scalar;
            $body
        })
    };
}

macro_rules! with_binary {
    ($op:expr, |$O:ident| $body:expr) => {
        match $op {
            BinaryOp::Add => {
                type $O = AddOp;
                $body
            }
            BinaryOp::Sub => {
                type $O = SubOp;
                $body
            }
            BinaryOp::Mul => {
                type $O = MulOp;
                $body
            }
            BinaryOp::Div => {
                type $O = DivOp;
                $body
            }
        }
    };
}

/// Element type with dispatched kernels.
///
/// Implemented for every [`Element`]; the methods are the raw entry points
/// used by the `numkern` wrappers.
///
/// # Safety
/// Every method is `unsafe`: `isa` must be supported by the running CPU
/// (use [`Dispatcher::select_for`]) and the pointers must satisfy the
/// contract of the kernel it forwards to.
#[allow(clippy::too_many_arguments)]
pub trait KernelElement: Element {
    /// Priority chain for `class`, best first.
    fn chain(class: OpClass) -> &'static [Isa];

    unsafe fn binary_value(isa: Isa, op: BinaryOp, dst: *mut Self, a: *const Self, value: Self, n: usize);

    unsafe fn binary(isa: Isa, op: BinaryOp, dst: *mut Self, a: *const Self, b: *const Self, n: usize);

    unsafe fn binary_broadcast(
        isa: Isa,
        op: BinaryOp,
        dst: *mut Self,
        dst_ld: usize,
        a: *const Self,
        a_ld: usize,
        b: *const Self,
        rows: usize,
        n: usize,
    );

    unsafe fn sum_rows(
        isa: Isa,
        src: *const Self,
        ld: usize,
        rows: usize,
        n: usize,
        out: *mut Self::Acc,
        out_stride: usize,
    );

    unsafe fn min_rows(isa: Isa, src: *const Self, ld: usize, rows: usize, n: usize, out: *mut Self, out_stride: usize);

    unsafe fn max_rows(isa: Isa, src: *const Self, ld: usize, rows: usize, n: usize, out: *mut Self, out_stride: usize);

    unsafe fn sum_cols(isa: Isa, src: *const Self, ld: usize, rows: usize, n: usize, acc: *mut Self::Acc);

    unsafe fn min_cols(isa: Isa, src: *const Self, ld: usize, rows: usize, n: usize, acc: *mut Self);

    unsafe fn max_cols(isa: Isa, src: *const Self, ld: usize, rows: usize, n: usize, acc: *mut Self);

    unsafe fn gemm(
        isa: Isa,
        m: usize,
        n: usize,
        k: usize,
        a: *const Self,
        lda: usize,
        b: *const Self,
        ldb: usize,
        c: *mut Self,
        ldc: usize,
    );

    unsafe fn outer(isa: Isa, m: usize, n: usize, a: *const Self, b: *const Self, c: *mut Self, ldc: usize);

    unsafe fn dot(isa: Isa, a: *const Self, b: *const Self, n: usize) -> Self;
}

/// Float element with dispatched `exp` and `log`.
///
/// # Safety
/// Same contract as [`KernelElement`].
pub trait FloatKernel: KernelElement + Float {
    unsafe fn exp(isa: Isa, dst: *mut Self, src: *const Self, n: usize);

    unsafe fn log(isa: Isa, dst: *mut Self, src: *const Self, n: usize);
}

macro_rules! impl_kernel_element {
    ($($t:ty {
        arith: [$($ar:ident),*],
        transcend: [$($tr:ident),*],
        linalg: [$($li:ident),*] $(,)?
    })*) => {
        $(
            impl KernelElement for $t {
                fn chain(class: OpClass) -> &'static [Isa] {
                    match class {
                        OpClass::Arith | OpClass::Reduce => &[$(Isa::$ar),*],
                        OpClass::Transcendental => &[$(Isa::$tr),*],
                        OpClass::Linalg => &[$(Isa::$li),*],
                    }
                }

                unsafe fn binary_value(isa: Isa, op: BinaryOp, dst: *mut $t, a: *const $t, value: $t, n: usize) {
                    dispatch!(isa, [$($ar),*], |L| with_binary!(op, |O| {
                        arith::binary_value::<$t, L, O>(dst, a, value, n)
                    }))
                }

                unsafe fn binary(isa: Isa, op: BinaryOp, dst: *mut $t, a: *const $t, b: *const $t, n: usize) {
                    dispatch!(isa, [$($ar),*], |L| with_binary!(op, |O| {
                        arith::binary::<$t, L, O>(dst, a, b, n)
                    }))
                }

                unsafe fn binary_broadcast(
                    isa: Isa,
                    op: BinaryOp,
                    dst: *mut $t,
                    dst_ld: usize,
                    a: *const $t,
                    a_ld: usize,
                    b: *const $t,
                    rows: usize,
                    n: usize,
                ) {
                    dispatch!(isa, [$($ar),*], |L| with_binary!(op, |O| {
                        arith::binary_broadcast::<$t, L, O>(dst, dst_ld, a, a_ld, b, rows, n)
                    }))
                }

                unsafe fn sum_rows(
                    isa: Isa,
                    src: *const $t,
                    ld: usize,
                    rows: usize,
                    n: usize,
                    out: *mut <$t as Element>::Acc,
                    out_stride: usize,
                ) {
                    dispatch!(isa, [$($ar),*], |L| {
                        reduce::reduce_rows::<$t, <$t as Element>::Acc, L, SumOp>(src, ld, rows, n, out, out_stride)
                    })
                }

                unsafe fn min_rows(isa: Isa, src: *const $t, ld: usize, rows: usize, n: usize, out: *mut $t, out_stride: usize) {
                    dispatch!(isa, [$($ar),*], |L| {
                        reduce::reduce_rows::<$t, $t, L, MinOp>(src, ld, rows, n, out, out_stride)
                    })
                }

                unsafe fn max_rows(isa: Isa, src: *const $t, ld: usize, rows: usize, n: usize, out: *mut $t, out_stride: usize) {
                    dispatch!(isa, [$($ar),*], |L| {
                        reduce::reduce_rows::<$t, $t, L, MaxOp>(src, ld, rows, n, out, out_stride)
                    })
                }

                unsafe fn sum_cols(isa: Isa, src: *const $t, ld: usize, rows: usize, n: usize, acc: *mut <$t as Element>::Acc) {
                    dispatch!(isa, [$($ar),*], |L| {
                        reduce::reduce_cols::<$t, <$t as Element>::Acc, L, SumOp>(src, ld, rows, n, acc)
                    })
                }

                unsafe fn min_cols(isa: Isa, src: *const $t, ld: usize, rows: usize, n: usize, acc: *mut $t) {
                    dispatch!(isa, [$($ar),*], |L| {
                        reduce::reduce_cols::<$t, $t, L, MinOp>(src, ld, rows, n, acc)
                    })
                }

                unsafe fn max_cols(isa: Isa, src: *const $t, ld: usize, rows: usize, n: usize, acc: *mut $t) {
                    dispatch!(isa, [$($ar),*], |L| {
                        reduce::reduce_cols::<$t, $t, L, MaxOp>(src, ld, rows, n, acc)
                    })
                }

                unsafe fn gemm(
                    isa: Isa,
                    m: usize,
                    n: usize,
                    k: usize,
                    a: *const $t,
                    lda: usize,
                    b: *const $t,
                    ldb: usize,
                    c: *mut $t,
                    ldc: usize,
                ) {
                    dispatch!(isa, [$($li),*], |L| linalg::gemm::<$t, L>(m, n, k, a, lda, b, ldb, c, ldc))
                }

                unsafe fn outer(isa: Isa, m: usize, n: usize, a: *const $t, b: *const $t, c: *mut $t, ldc: usize) {
                    dispatch!(isa, [$($li),*], |L| linalg::outer::<$t, L>(m, n, a, b, c, ldc))
                }

                unsafe fn dot(isa: Isa, a: *const $t, b: *const $t, n: usize) -> $t {
                    dispatch!(isa, [$($li),*], |L| linalg::dot::<$t, L>(a, b, n))
                }
            }
        )*
    };
}

impl_kernel_element! {
    f32 {
        arith: [Avx, Sse3, Sse2, Sse],
        transcend: [Avx2Fma, Avx2, Sse41Fma, Sse41, Sse2],
        linalg: [Avx2Fma, AvxFma, Avx, Sse41Fma, Sse2],
    }
    f64 {
        arith: [Avx, Sse3, Sse2],
        transcend: [Avx2Fma, AvxFma, Avx, Sse41Fma, Sse41, Sse2],
        linalg: [Avx2Fma, AvxFma, Avx, Sse41Fma, Sse2],
    }
    i8 { arith: [Avx2, Sse41, Sse2], transcend: [], linalg: [Avx2, Sse41, Sse2] }
    u8 { arith: [Avx2, Sse41, Sse2], transcend: [], linalg: [Avx2, Sse41, Sse2] }
    i16 { arith: [Avx2, Sse41, Sse2], transcend: [], linalg: [Avx2, Sse41, Sse2] }
    u16 { arith: [Avx2, Sse41, Sse2], transcend: [], linalg: [Avx2, Sse41, Sse2] }
    i32 { arith: [Avx2, Sse41, Sse2], transcend: [], linalg: [Avx2, Sse41, Sse2] }
    u32 { arith: [Avx2, Sse41, Sse2], transcend: [], linalg: [Avx2, Sse41, Sse2] }
    i64 { arith: [Avx2, Sse2], transcend: [], linalg: [Avx2, Sse2] }
    u64 { arith: [Avx2, Sse2], transcend: [], linalg: [Avx2, Sse2] }
}

macro_rules! impl_float_kernel {
    ($($t:ty),*) => {
        $(
            impl FloatKernel for $t {
                unsafe fn exp(isa: Isa, dst: *mut $t, src: *const $t, n: usize) {
                    dispatch!(
                        isa,
                        [Avx2Fma, Avx2, AvxFma, Avx, Sse41Fma, Sse41, Sse2],
                        |L| transcend::exp::<$t, L>(dst, src, n),
                        portable = transcend::exp_portable::<$t>(dst, src, n)
                    )
                }

                unsafe fn log(isa: Isa, dst: *mut $t, src: *const $t, n: usize) {
                    dispatch!(
                        isa,
                        [Avx2Fma, Avx2, AvxFma, Avx, Sse41Fma, Sse41, Sse2],
                        |L| transcend::log::<$t, L>(dst, src, n),
                        portable = transcend::log_portable::<$t>(dst, src, n)
                    )
                }
            }
        )*
    };
}

impl_float_kernel!(f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    fn unchecked(features: CpuFeatures) -> Dispatcher {
        unsafe { Dispatcher::new_unchecked(features) }
    }

    #[test]
    fn test_select_walks_chain_in_order() {
        let full = unchecked(CpuFeatures::from_isa(Isa::Avx2Fma));
        assert_eq!(full.select_for::<f32>(OpClass::Arith), Isa::Avx);
        assert_eq!(full.select_for::<f32>(OpClass::Transcendental), Isa::Avx2Fma);
        assert_eq!(full.select_for::<i16>(OpClass::Reduce), Isa::Avx2);
        assert_eq!(full.select_for::<u64>(OpClass::Linalg), Isa::Avx2);
    }

    #[test]
    fn test_select_cascades_down() {
        let sse41 = unchecked(CpuFeatures::from_isa(Isa::Sse41));
        assert_eq!(sse41.select_for::<f32>(OpClass::Arith), Isa::Sse3);
        assert_eq!(sse41.select_for::<f64>(OpClass::Transcendental), Isa::Sse41);
        assert_eq!(sse41.select_for::<f64>(OpClass::Linalg), Isa::Sse2);
        assert_eq!(sse41.select_for::<i64>(OpClass::Arith), Isa::Sse2);
        assert_eq!(sse41.select_for::<u8>(OpClass::Arith), Isa::Sse41);

        let avx_fma = unchecked(CpuFeatures::from_isa(Isa::AvxFma));
        assert_eq!(avx_fma.select_for::<f32>(OpClass::Transcendental), Isa::Sse41Fma);
        assert_eq!(avx_fma.select_for::<f64>(OpClass::Transcendental), Isa::AvxFma);
        assert_eq!(avx_fma.select_for::<i32>(OpClass::Arith), Isa::Sse41);

        let sse = unchecked(CpuFeatures::from_isa(Isa::Sse));
        assert_eq!(sse.select_for::<f32>(OpClass::Arith), Isa::Sse);
        assert_eq!(sse.select_for::<f64>(OpClass::Arith), Isa::None);
        assert_eq!(sse.select_for::<i8>(OpClass::Linalg), Isa::None);
    }

    #[test]
    fn test_no_features_selects_portable() {
        let none = Dispatcher::new(CpuFeatures::none());
        for class in [OpClass::Arith, OpClass::Reduce, OpClass::Transcendental, OpClass::Linalg] {
            assert_eq!(none.select_for::<f32>(class), Isa::None);
            assert_eq!(none.select_for::<u16>(class), Isa::None);
        }
        // Integers have no transcendental chain.
        let full = unchecked(CpuFeatures::from_isa(Isa::Avx2Fma));
        assert_eq!(full.select_for::<i32>(OpClass::Transcendental), Isa::None);
    }

    #[test]
    fn test_new_never_exceeds_host() {
        let host = *CpuFeatures::host();
        let d = Dispatcher::new(CpuFeatures::from_isa(Isa::Avx2Fma));
        assert!(host.contains(d.features()));
        assert_eq!(Dispatcher::new(CpuFeatures::none()).features(), CpuFeatures::none());
    }

    #[test]
    fn test_portable_entry_points() {
        let a = [1.0f32, 2.0, 3.0];
        let b = [4.0f32, 5.0, 6.0];
        let mut out = [0.0f32; 3];
        unsafe {
            f32::binary(Isa::None, BinaryOp::Add, out.as_mut_ptr(), a.as_ptr(), b.as_ptr(), 3);
            assert_eq!(out, [5.0, 7.0, 9.0]);
            assert_eq!(f32::dot(Isa::None, a.as_ptr(), b.as_ptr(), 3), 32.0);
            <f32 as FloatKernel>::log(Isa::None, out.as_mut_ptr(), a.as_ptr(), 1);
            assert_eq!(out[0], 0.0);
        }
    }
}
