//! Element-wise arithmetic kernels.
//!
//! Each kernel walks its row in groups of `4 * WIDTH`, then single `WIDTH`
//! groups, then finishes the remainder with scalar lanes.

use numkern_traits::Element;

use super::BinaryKernel;
use crate::lanes::Lanes;

/// `dst[i] = a[i] op value` for `i < n`.
///
/// # Safety
/// `dst` must be valid for `n` writes and `a` for `n` reads.
#[inline(always)]
pub unsafe fn binary_value<T: Element, L: Lanes<T>, O: BinaryKernel>(
    dst: *mut T,
    a: *const T,
    value: T,
    n: usize,
) {
    let w = L::WIDTH;
    let v = L::splat(value);
    let mut i = 0;
    while i + 4 * w <= n {
        let a0 = L::load(a.add(i));
        let a1 = L::load(a.add(i + w));
        let a2 = L::load(a.add(i + 2 * w));
        let a3 = L::load(a.add(i + 3 * w));
        L::store(dst.add(i), O::vector::<T, L>(a0, v));
        L::store(dst.add(i + w), O::vector::<T, L>(a1, v));
        L::store(dst.add(i + 2 * w), O::vector::<T, L>(a2, v));
        L::store(dst.add(i + 3 * w), O::vector::<T, L>(a3, v));
        i += 4 * w;
    }
    while i + w <= n {
        L::store(dst.add(i), O::vector::<T, L>(L::load(a.add(i)), v));
        i += w;
    }
    while i < n {
        *dst.add(i) = O::scalar(*a.add(i), value);
        i += 1;
    }
}

/// `dst[i] = a[i] op b[i]` for `i < n`.
///
/// # Safety
/// `dst` must be valid for `n` writes, `a` and `b` for `n` reads.
#[inline(always)]
pub unsafe fn binary<T: Element, L: Lanes<T>, O: BinaryKernel>(
    dst: *mut T,
    a: *const T,
    b: *const T,
    n: usize,
) {
    let w = L::WIDTH;
    let mut i = 0;
    while i + 4 * w <= n {
        let r0 = O::vector::<T, L>(L::load(a.add(i)), L::load(b.add(i)));
        let r1 = O::vector::<T, L>(L::load(a.add(i + w)), L::load(b.add(i + w)));
        let r2 = O::vector::<T, L>(L::load(a.add(i + 2 * w)), L::load(b.add(i + 2 * w)));
        let r3 = O::vector::<T, L>(L::load(a.add(i + 3 * w)), L::load(b.add(i + 3 * w)));
        L::store(dst.add(i), r0);
        L::store(dst.add(i + w), r1);
        L::store(dst.add(i + 2 * w), r2);
        L::store(dst.add(i + 3 * w), r3);
        i += 4 * w;
    }
    while i + w <= n {
        L::store(dst.add(i), O::vector::<T, L>(L::load(a.add(i)), L::load(b.add(i))));
        i += w;
    }
    tail::<T, O>(dst, a, b, i, n);
}

/// `dst[r * dst_ld + j] = a[r * a_ld + j] op b[j]` for `r < rows`, `j < n`.
///
/// The row `b` is loaded once per column group and reused across rows.
///
/// # Safety
/// Every addressed element must be valid; `dst` rows must not overlap `b`.
#[inline(always)]
#[allow(clippy::too_many_arguments)]
pub unsafe fn binary_broadcast<T: Element, L: Lanes<T>, O: BinaryKernel>(
    dst: *mut T,
    dst_ld: usize,
    a: *const T,
    a_ld: usize,
    b: *const T,
    rows: usize,
    n: usize,
) {
    let w = L::WIDTH;
    let mut j = 0;
    while j + 4 * w <= n {
        let b0 = L::load(b.add(j));
        let b1 = L::load(b.add(j + w));
        let b2 = L::load(b.add(j + 2 * w));
        let b3 = L::load(b.add(j + 3 * w));
        for r in 0..rows {
            let src = a.add(r * a_ld + j);
            let out = dst.add(r * dst_ld + j);
            L::store(out, O::vector::<T, L>(L::load(src), b0));
            L::store(out.add(w), O::vector::<T, L>(L::load(src.add(w)), b1));
            L::store(out.add(2 * w), O::vector::<T, L>(L::load(src.add(2 * w)), b2));
            L::store(out.add(3 * w), O::vector::<T, L>(L::load(src.add(3 * w)), b3));
        }
        j += 4 * w;
    }
    while j + w <= n {
        let b0 = L::load(b.add(j));
        for r in 0..rows {
            let out = dst.add(r * dst_ld + j);
            L::store(out, O::vector::<T, L>(L::load(a.add(r * a_ld + j)), b0));
        }
        j += w;
    }
    if j < n {
        for r in 0..rows {
            tail::<T, O>(dst.add(r * dst_ld), a.add(r * a_ld), b, j, n);
        }
    }
}

#[inline(always)]
unsafe fn tail<T: Element, O: BinaryKernel>(
    dst: *mut T,
    a: *const T,
    b: *const T,
    from: usize,
    n: usize,
) {
    for i in from..n {
        *dst.add(i) = O::scalar(*a.add(i), *b.add(i));
    }
}
