//! Generic kernels written against [`Lanes`](crate::lanes::Lanes).
//!
//! Every kernel is `#[inline(always)]` so that it is compiled inside the
//! `vectorize` frame of the tag it is instantiated with. Kernels take raw
//! pointers, never allocate and do no validation.

pub mod arith;
pub mod linalg;
pub mod reduce;
pub mod transcend;

use numkern_traits::Element;

use crate::lanes::Lanes;

/// Lanewise binary operation usable by the arithmetic kernels.
pub trait BinaryKernel: Copy + Default {
    fn scalar<T: Element>(a: T, b: T) -> T;

    /// # Safety
    /// Must be called where `L`'s instruction set is available.
    unsafe fn vector<T: Element, L: Lanes<T>>(a: L::V, b: L::V) -> L::V;
}

macro_rules! binary_kernel {
    ($($(#[$doc:meta])* $name:ident => $scalar:ident, $vector:ident;)*) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, Default)]
            pub struct $name;

            impl BinaryKernel for $name {
                #[inline(always)]
                fn scalar<T: Element>(a: T, b: T) -> T {
                    a.$scalar(b)
                }

                #[inline(always)]
                unsafe fn vector<T: Element, L: Lanes<T>>(a: L::V, b: L::V) -> L::V {
                    L::$vector(a, b)
                }
            }
        )*
    };
}

binary_kernel! {
    AddOp => elem_add, add;
    SubOp => elem_sub, sub;
    MulOp => elem_mul, mul;
    /// Integer division by zero yields zero.
    DivOp => elem_div, div;
}

/// Associative reduction with an identity element.
pub trait ReduceKernel: Copy + Default {
    fn identity<A: Element>() -> A;

    fn scalar<A: Element>(acc: A, x: A) -> A;

    /// # Safety
    /// Must be called where `L`'s instruction set is available.
    unsafe fn vector<A: Element, L: Lanes<A>>(acc: L::V, x: L::V) -> L::V;

    /// Fold the lanes of `v` into one value.
    ///
    /// # Safety
    /// Must be called where `L`'s instruction set is available.
    unsafe fn horizontal<A: Element, L: Lanes<A>>(v: L::V) -> A;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SumOp;

#[derive(Debug, Clone, Copy, Default)]
pub struct MinOp;

#[derive(Debug, Clone, Copy, Default)]
pub struct MaxOp;

impl ReduceKernel for SumOp {
    #[inline(always)]
    fn identity<A: Element>() -> A {
        A::zero()
    }

    #[inline(always)]
    fn scalar<A: Element>(acc: A, x: A) -> A {
        acc.elem_add(x)
    }

    #[inline(always)]
    unsafe fn vector<A: Element, L: Lanes<A>>(acc: L::V, x: L::V) -> L::V {
        L::add(acc, x)
    }

    #[inline(always)]
    unsafe fn horizontal<A: Element, L: Lanes<A>>(v: L::V) -> A {
        L::reduce_sum(v)
    }
}

impl ReduceKernel for MinOp {
    #[inline(always)]
    fn identity<A: Element>() -> A {
        A::highest()
    }

    #[inline(always)]
    fn scalar<A: Element>(acc: A, x: A) -> A {
        acc.elem_min(x)
    }

    #[inline(always)]
    unsafe fn vector<A: Element, L: Lanes<A>>(acc: L::V, x: L::V) -> L::V {
        L::min(acc, x)
    }

    #[inline(always)]
    unsafe fn horizontal<A: Element, L: Lanes<A>>(v: L::V) -> A {
        L::reduce_min(v)
    }
}

impl ReduceKernel for MaxOp {
    #[inline(always)]
    fn identity<A: Element>() -> A {
        A::lowest()
    }

    #[inline(always)]
    fn scalar<A: Element>(acc: A, x: A) -> A {
        acc.elem_max(x)
    }

    #[inline(always)]
    unsafe fn vector<A: Element, L: Lanes<A>>(acc: L::V, x: L::V) -> L::V {
        L::max(acc, x)
    }

    #[inline(always)]
    unsafe fn horizontal<A: Element, L: Lanes<A>>(v: L::V) -> A {
        L::reduce_max(v)
    }
}
