//! Row (horizontal) and column (vertical) reductions.
//!
//! Both kernels fold into a caller-initialised output, so a reduction over
//! several strided slabs is a sequence of calls on the same output.
//!
//! The column range `[0, n)` is split at `n_main = n - n % block_n` with
//! `block_n = 2 * WIDTH`:
//!
//! ```text
//!            0            n_main        n
//!   row 0   +-------------+-------------+
//!     ...   |   block     |             |
//!   row 3   |  (4 rows)   |   common    |
//!     ...   +-------------+  (scalar)   |
//!   rows%4  |   rows      |             |
//!           +-------------+-------------+
//! ```
//!
//! so every source element is read exactly once.

use numkern_traits::Element;

use super::ReduceKernel;
use crate::lanes::{Lanes, WidenTo};

/// `out[i * out_stride] = out[i * out_stride] op (op_j src[i * ld + j])`.
///
/// With `out_stride == 0` all rows fold into `out[0]`.
///
/// # Safety
/// `src` must be valid for `rows` rows of `n` elements at stride `ld`, and
/// `out` for every addressed element.
#[inline(always)]
pub unsafe fn reduce_rows<T, A, L, O>(
    src: *const T,
    ld: usize,
    rows: usize,
    n: usize,
    out: *mut A,
    out_stride: usize,
) where
    T: WidenTo<A>,
    A: Element,
    L: Lanes<A>,
    O: ReduceKernel,
{
    let block_n = 2 * L::WIDTH;
    let n_main = n - n % block_n;
    let mut r = 0;
    if n_main > 0 {
        while r + 4 <= rows {
            rows_block::<T, A, L, O>(src.add(r * ld), ld, n_main, out.add(r * out_stride), out_stride);
            r += 4;
        }
        while r < rows {
            rows_single::<T, A, L, O>(src.add(r * ld), n_main, out.add(r * out_stride));
            r += 1;
        }
    }
    if n_main < n {
        for r in 0..rows {
            let dst = out.add(r * out_stride);
            *dst = common::<T, A, O>(src.add(r * ld), n_main, n, *dst);
        }
    }
}

/// Four rows, eight accumulators: two registers per row.
#[inline(always)]
unsafe fn rows_block<T, A, L, O>(src: *const T, ld: usize, n_main: usize, out: *mut A, out_stride: usize)
where
    T: WidenTo<A>,
    A: Element,
    L: Lanes<A>,
    O: ReduceKernel,
{
    let w = L::WIDTH;
    let id = L::splat(O::identity::<A>());
    let (mut a00, mut a01, mut a10, mut a11) = (id, id, id, id);
    let (mut a20, mut a21, mut a30, mut a31) = (id, id, id, id);
    let (p0, p1, p2, p3) = (src, src.add(ld), src.add(2 * ld), src.add(3 * ld));
    let mut j = 0;
    while j < n_main {
        a00 = O::vector::<A, L>(a00, T::load_widened::<L>(p0.add(j)));
        a01 = O::vector::<A, L>(a01, T::load_widened::<L>(p0.add(j + w)));
        a10 = O::vector::<A, L>(a10, T::load_widened::<L>(p1.add(j)));
        a11 = O::vector::<A, L>(a11, T::load_widened::<L>(p1.add(j + w)));
        a20 = O::vector::<A, L>(a20, T::load_widened::<L>(p2.add(j)));
        a21 = O::vector::<A, L>(a21, T::load_widened::<L>(p2.add(j + w)));
        a30 = O::vector::<A, L>(a30, T::load_widened::<L>(p3.add(j)));
        a31 = O::vector::<A, L>(a31, T::load_widened::<L>(p3.add(j + w)));
        j += 2 * w;
    }
    let sums = [
        O::horizontal::<A, L>(O::vector::<A, L>(a00, a01)),
        O::horizontal::<A, L>(O::vector::<A, L>(a10, a11)),
        O::horizontal::<A, L>(O::vector::<A, L>(a20, a21)),
        O::horizontal::<A, L>(O::vector::<A, L>(a30, a31)),
    ];
    for (k, s) in sums.into_iter().enumerate() {
        let dst = out.add(k * out_stride);
        *dst = O::scalar(*dst, s);
    }
}

/// One row, two accumulators.
#[inline(always)]
unsafe fn rows_single<T, A, L, O>(src: *const T, n_main: usize, out: *mut A)
where
    T: WidenTo<A>,
    A: Element,
    L: Lanes<A>,
    O: ReduceKernel,
{
    let w = L::WIDTH;
    let mut a0 = L::splat(O::identity::<A>());
    let mut a1 = a0;
    let mut j = 0;
    while j < n_main {
        a0 = O::vector::<A, L>(a0, T::load_widened::<L>(src.add(j)));
        a1 = O::vector::<A, L>(a1, T::load_widened::<L>(src.add(j + w)));
        j += 2 * w;
    }
    *out = O::scalar(*out, O::horizontal::<A, L>(O::vector::<A, L>(a0, a1)));
}

/// Leftover columns `[from, n)` of one row, folded into `acc`.
#[inline(always)]
unsafe fn common<T, A, O>(src: *const T, from: usize, n: usize, mut acc: A) -> A
where
    T: WidenTo<A>,
    A: Element,
    O: ReduceKernel,
{
    for j in from..n {
        acc = O::scalar(acc, (*src.add(j)).widen_one());
    }
    acc
}

/// `acc[j] = acc[j] op (op_i src[i * ld + j])` for `j < n`.
///
/// Each lane accumulates its column top to bottom, the same order as a
/// scalar loop.
///
/// # Safety
/// `src` must be valid for `rows` rows of `n` elements at stride `ld`, and
/// `acc` for `n` reads and writes.
#[inline(always)]
pub unsafe fn reduce_cols<T, A, L, O>(src: *const T, ld: usize, rows: usize, n: usize, acc: *mut A)
where
    T: WidenTo<A>,
    A: Element,
    L: Lanes<A>,
    O: ReduceKernel,
{
    let w = L::WIDTH;
    let block_n = 2 * w;
    let n_main = n - n % block_n;
    let mut j = 0;
    while j < n_main {
        let mut a0 = L::load(acc.add(j));
        let mut a1 = L::load(acc.add(j + w));
        let mut i = 0;
        while i + 4 <= rows {
            cols_block::<T, A, L, O>(src.add(i * ld + j), ld, &mut a0, &mut a1);
            i += 4;
        }
        while i < rows {
            let p = src.add(i * ld + j);
            a0 = O::vector::<A, L>(a0, T::load_widened::<L>(p));
            a1 = O::vector::<A, L>(a1, T::load_widened::<L>(p.add(w)));
            i += 1;
        }
        L::store(acc.add(j), a0);
        L::store(acc.add(j + w), a1);
        j += block_n;
    }
    for j in n_main..n {
        let mut a = *acc.add(j);
        for i in 0..rows {
            a = O::scalar(a, (*src.add(i * ld + j)).widen_one());
        }
        *acc.add(j) = a;
    }
}

/// Four rows of one `2 * WIDTH` column block.
#[inline(always)]
unsafe fn cols_block<T, A, L, O>(src: *const T, ld: usize, a0: &mut L::V, a1: &mut L::V)
where
    T: WidenTo<A>,
    A: Element,
    L: Lanes<A>,
    O: ReduceKernel,
{
    let w = L::WIDTH;
    for k in 0..4 {
        let p = src.add(k * ld);
        *a0 = O::vector::<A, L>(*a0, T::load_widened::<L>(p));
        *a1 = O::vector::<A, L>(*a1, T::load_widened::<L>(p.add(w)));
    }
}
