//! Dense linear algebra on row-major strided operands.

use numkern_traits::Element;

use super::{arith, MulOp};
use crate::lanes::Lanes;

/// Columns of `B` and `C` kept hot per panel.
pub const NC: usize = 256;
/// Depth of one panel of `A` columns / `B` rows.
pub const KC: usize = 128;

/// `y[j] += alpha * x[j]` for `j < n`.
///
/// # Safety
/// `y` must be valid for `n` reads and writes, `x` for `n` reads.
#[inline(always)]
pub unsafe fn axpy<T: Element, L: Lanes<T>>(y: *mut T, x: *const T, alpha: T, n: usize) {
    let w = L::WIDTH;
    let va = L::splat(alpha);
    let mut j = 0;
    while j + 4 * w <= n {
        let y0 = L::mul_add(va, L::load(x.add(j)), L::load(y.add(j)));
        let y1 = L::mul_add(va, L::load(x.add(j + w)), L::load(y.add(j + w)));
        let y2 = L::mul_add(va, L::load(x.add(j + 2 * w)), L::load(y.add(j + 2 * w)));
        let y3 = L::mul_add(va, L::load(x.add(j + 3 * w)), L::load(y.add(j + 3 * w)));
        L::store(y.add(j), y0);
        L::store(y.add(j + w), y1);
        L::store(y.add(j + 2 * w), y2);
        L::store(y.add(j + 3 * w), y3);
        j += 4 * w;
    }
    while j + w <= n {
        L::store(y.add(j), L::mul_add(va, L::load(x.add(j)), L::load(y.add(j))));
        j += w;
    }
    while j < n {
        *y.add(j) = (*y.add(j)).elem_add(alpha.elem_mul(*x.add(j)));
        j += 1;
    }
}

/// `C += A * B` with `A: m x k`, `B: k x n`, `C: m x n`.
///
/// Blocked over `NC` columns and `KC` depth; each step is a row update
/// `C[i, jc..] += A[i, p] * B[p, jc..]`.
///
/// # Safety
/// All operands must be valid for their extents and leading dimensions, and
/// `C` must not overlap `A` or `B`.
#[inline(always)]
#[allow(clippy::too_many_arguments)]
pub unsafe fn gemm<T: Element, L: Lanes<T>>(
    m: usize,
    n: usize,
    k: usize,
    a: *const T,
    lda: usize,
    b: *const T,
    ldb: usize,
    c: *mut T,
    ldc: usize,
) {
    let mut jc = 0;
    while jc < n {
        let nb = NC.min(n - jc);
        let mut pc = 0;
        while pc < k {
            let kb = KC.min(k - pc);
            for i in 0..m {
                let c_row = c.add(i * ldc + jc);
                let a_row = a.add(i * lda);
                for p in pc..pc + kb {
                    axpy::<T, L>(c_row, b.add(p * ldb + jc), *a_row.add(p), nb);
                }
            }
            pc += kb;
        }
        jc += nb;
    }
}

/// `C[i, j] = a[i] * b[j]`.
///
/// # Safety
/// `a` valid for `m` reads, `b` for `n` reads, `C` for `m` rows of `n` at
/// stride `ldc`.
#[inline(always)]
pub unsafe fn outer<T: Element, L: Lanes<T>>(
    m: usize,
    n: usize,
    a: *const T,
    b: *const T,
    c: *mut T,
    ldc: usize,
) {
    for i in 0..m {
        arith::binary_value::<T, L, MulOp>(c.add(i * ldc), b, *a.add(i), n);
    }
}

/// `sum_i a[i] * b[i]` with four independent accumulators.
///
/// # Safety
/// `a` and `b` must be valid for `n` reads.
#[inline(always)]
pub unsafe fn dot<T: Element, L: Lanes<T>>(a: *const T, b: *const T, n: usize) -> T {
    let w = L::WIDTH;
    let zero = L::splat(T::zero());
    let (mut s0, mut s1, mut s2, mut s3) = (zero, zero, zero, zero);
    let mut i = 0;
    while i + 4 * w <= n {
        s0 = L::mul_add(L::load(a.add(i)), L::load(b.add(i)), s0);
        s1 = L::mul_add(L::load(a.add(i + w)), L::load(b.add(i + w)), s1);
        s2 = L::mul_add(L::load(a.add(i + 2 * w)), L::load(b.add(i + 2 * w)), s2);
        s3 = L::mul_add(L::load(a.add(i + 3 * w)), L::load(b.add(i + 3 * w)), s3);
        i += 4 * w;
    }
    while i + w <= n {
        s0 = L::mul_add(L::load(a.add(i)), L::load(b.add(i)), s0);
        i += w;
    }
    let mut sum = L::reduce_sum(L::add(L::add(s0, s1), L::add(s2, s3)));
    while i < n {
        sum = sum.elem_add((*a.add(i)).elem_mul(*b.add(i)));
        i += 1;
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::Scalar;

    fn naive(m: usize, n: usize, k: usize, a: &[f64], b: &[f64]) -> Vec<f64> {
        let mut c = vec![0.0; m * n];
        for i in 0..m {
            for j in 0..n {
                c[i * n + j] = (0..k).map(|p| a[i * k + p] * b[p * n + j]).sum();
            }
        }
        c
    }

    #[test]
    fn test_gemm_spans_panels() {
        let (m, n, k) = (3, NC + 5, KC + 3);
        let a: Vec<f64> = (0..m * k).map(|i| (i % 7) as f64 - 3.0).collect();
        let b: Vec<f64> = (0..k * n).map(|i| (i % 5) as f64 * 0.5).collect();
        let mut c = vec![0.0; m * n];
        unsafe { gemm::<f64, Scalar>(m, n, k, a.as_ptr(), k, b.as_ptr(), n, c.as_mut_ptr(), n) };
        assert_eq!(c, naive(m, n, k, &a, &b));
    }

    #[test]
    fn test_dot_and_outer() {
        let a = [1i32, 2, 3, 4, 5];
        let b = [5i32, 4, 3, 2, 1];
        assert_eq!(unsafe { dot::<i32, Scalar>(a.as_ptr(), b.as_ptr(), 5) }, 35);

        let mut c = [0i32; 10];
        unsafe { outer::<i32, Scalar>(2, 5, a.as_ptr(), b.as_ptr(), c.as_mut_ptr(), 5) };
        assert_eq!(c, [5, 4, 3, 2, 1, 10, 8, 6, 4, 2]);
    }
}
