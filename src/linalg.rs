//! Matrix product, outer product and dot product.
//!
//! All three require single-channel operands (`dimension == 1`); matrices may
//! carry padded rows.

use numkern_simd::{Dispatcher, KernelElement, OpClass};

use crate::container::{Dense, Matrix, Vector};
use crate::{ensure_initialized, ensure_same_shape, KernelError, Result};

fn ensure_single_channel<C: Dense>(c: &C) -> Result<()> {
    let shape = c.shape();
    if shape.last() != Some(&1) {
        let mut expected = shape.to_vec();
        if let Some(last) = expected.last_mut() {
            *last = 1;
        }
        return Err(KernelError::InvalidShape {
            expected,
            actual: shape.to_vec(),
        });
    }
    Ok(())
}

fn ensure_shape(expected: &[usize], actual: &[usize]) -> Result<()> {
    if expected != actual {
        return Err(KernelError::InvalidShape {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        });
    }
    Ok(())
}

/// `out = a * b` for `a: m x k`, `b: k x n`.
///
/// # Errors
/// [`KernelError::NotInitialized`] for an empty operand,
/// [`KernelError::InvalidShape`] when an operand has more than one channel,
/// when `a.columns() != b.rows()`, or when `out` is not `a.rows() x b.columns()`.
pub fn matmul<'a, T: KernelElement>(out: &'a mut Matrix<T>, a: &Matrix<T>, b: &Matrix<T>) -> Result<&'a mut Matrix<T>> {
    matmul_with(&Dispatcher::host(), out, a, b)
}

pub fn matmul_with<'a, T: KernelElement>(
    d: &Dispatcher,
    out: &'a mut Matrix<T>,
    a: &Matrix<T>,
    b: &Matrix<T>,
) -> Result<&'a mut Matrix<T>> {
    ensure_initialized(&[out.is_empty(), a.is_empty(), b.is_empty()])?;
    ensure_single_channel(a)?;
    ensure_single_channel(b)?;
    ensure_shape(&[a.columns(), b.columns(), 1], &[b.rows(), b.columns(), 1])?;
    ensure_shape(&[a.rows(), b.columns(), 1], &out.shape())?;

    let (m, n, k) = (a.rows(), b.columns(), a.columns());
    let isa = d.select_for::<T>(OpClass::Linalg);
    tracing::trace!(m, n, k, "matmul");
    out.fill(T::zero());
    // SAFETY: the extents and row strides come from the validated operands,
    // and `out` is a distinct allocation from `a` and `b`.
    unsafe {
        <T as KernelElement>::gemm(
            isa,
            m,
            n,
            k,
            a.as_slice().as_ptr(),
            a.row_stride(),
            b.as_slice().as_ptr(),
            b.row_stride(),
            out.as_mut_slice().as_mut_ptr(),
            out.row_stride(),
        )
    };
    Ok(out)
}

/// `out[i, j] = a[i] * b[j]`.
///
/// # Errors
/// [`KernelError::NotInitialized`] for an empty operand,
/// [`KernelError::InvalidShape`] when an operand has more than one channel
/// or `out` is not `a.length() x b.length()`.
pub fn outer<'a, T: KernelElement>(out: &'a mut Matrix<T>, a: &Vector<T>, b: &Vector<T>) -> Result<&'a mut Matrix<T>> {
    outer_with(&Dispatcher::host(), out, a, b)
}

pub fn outer_with<'a, T: KernelElement>(
    d: &Dispatcher,
    out: &'a mut Matrix<T>,
    a: &Vector<T>,
    b: &Vector<T>,
) -> Result<&'a mut Matrix<T>> {
    ensure_initialized(&[out.is_empty(), a.is_empty(), b.is_empty()])?;
    ensure_single_channel(a)?;
    ensure_single_channel(b)?;
    ensure_shape(&[a.length(), b.length(), 1], &out.shape())?;

    let isa = d.select_for::<T>(OpClass::Linalg);
    // SAFETY: `out` holds `a.length()` rows of at least `b.length()` elements.
    unsafe {
        <T as KernelElement>::outer(
            isa,
            a.length(),
            b.length(),
            a.as_slice().as_ptr(),
            b.as_slice().as_ptr(),
            out.as_mut_slice().as_mut_ptr(),
            out.row_stride(),
        )
    };
    Ok(out)
}

/// `sum_i a[i] * b[i]`.
///
/// Integer products wrap like the element arithmetic does; the float sum is
/// taken over four interleaved partial sums, so its rounding can differ from
/// a sequential loop.
pub fn dot<T: KernelElement>(a: &Vector<T>, b: &Vector<T>) -> Result<T> {
    dot_with(&Dispatcher::host(), a, b)
}

pub fn dot_with<T: KernelElement>(d: &Dispatcher, a: &Vector<T>, b: &Vector<T>) -> Result<T> {
    ensure_initialized(&[a.is_empty(), b.is_empty()])?;
    ensure_same_shape(&a.shape(), &b.shape())?;

    let isa = d.select_for::<T>(OpClass::Linalg);
    // SAFETY: both vectors are packed and hold `size` elements.
    Ok(unsafe { <T as KernelElement>::dot(isa, a.as_slice().as_ptr(), b.as_slice().as_ptr(), a.size()) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CpuFeatures;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn naive(a: &Matrix<f64>, b: &Matrix<f64>) -> Vec<f64> {
        let mut c = Vec::with_capacity(a.rows() * b.columns());
        for i in 0..a.rows() {
            for j in 0..b.columns() {
                c.push((0..a.columns()).map(|p| a[[i, p, 0]] * b[[p, j, 0]]).sum());
            }
        }
        c
    }

    #[test]
    fn test_matmul_small() {
        let a = Matrix::from_vec(vec![1i32, 2, 3, 4, 5, 6], 2, 3, 1).unwrap();
        let b = Matrix::from_vec(vec![7i32, 8, 9, 10, 11, 12], 3, 2, 1).unwrap();
        let mut c = Matrix::filled(2, 2, 1, 99);
        matmul(&mut c, &a, &b).unwrap();
        assert_eq!(c.as_slice(), &[58, 64, 139, 154]);
    }

    #[test]
    fn test_matmul_padded_matches_naive() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut a = Matrix::with_row_stride(9, 37, 1, 40).unwrap();
        let mut b = Matrix::with_row_stride(37, 21, 1, 24).unwrap();
        for i in 0..9 {
            for p in 0..37 {
                a[[i, p, 0]] = rng.gen_range(-4..=4) as f64;
            }
        }
        for p in 0..37 {
            for j in 0..21 {
                b[[p, j, 0]] = rng.gen_range(-4..=4) as f64 * 0.5;
            }
        }
        let mut c = Matrix::with_row_stride(9, 21, 1, 32).unwrap();
        matmul(&mut c, &a, &b).unwrap();
        assert_eq!(c.to_packed(), naive(&a, &b));

        let mut portable = Matrix::new(9, 21, 1);
        matmul_with(&Dispatcher::new(CpuFeatures::none()), &mut portable, &a, &b).unwrap();
        assert_eq!(portable.to_packed(), c.to_packed());
    }

    #[test]
    fn test_matmul_shape_errors() {
        let a = Matrix::<f32>::new(2, 3, 1);
        let b = Matrix::<f32>::new(4, 2, 1);
        let mut c = Matrix::new(2, 2, 1);
        assert_eq!(
            matmul(&mut c, &a, &b).unwrap_err(),
            KernelError::InvalidShape {
                expected: vec![3, 2, 1],
                actual: vec![4, 2, 1],
            }
        );

        let b = Matrix::<f32>::new(3, 2, 1);
        let mut wrong = Matrix::new(3, 2, 1);
        assert_eq!(
            matmul(&mut wrong, &a, &b).unwrap_err(),
            KernelError::InvalidShape {
                expected: vec![2, 2, 1],
                actual: vec![3, 2, 1],
            }
        );

        let two = Matrix::<f32>::new(2, 3, 2);
        assert!(matches!(
            matmul(&mut c, &two, &b),
            Err(KernelError::InvalidShape { .. })
        ));
        assert_eq!(
            matmul(&mut Matrix::default(), &a, &b).unwrap_err(),
            KernelError::NotInitialized
        );
    }

    #[test]
    fn test_outer_into_padded_output() {
        let a = Vector::from_vec(vec![1.0f32, -2.0, 0.5], 3, 1).unwrap();
        let b = Vector::from_fn(11, 1, |i, _| i as f32);
        let mut c = Matrix::with_row_stride(3, 11, 1, 16).unwrap();
        outer(&mut c, &a, &b).unwrap();
        for i in 0..3 {
            for j in 0..11 {
                assert_eq!(c[[i, j, 0]], a[[i, 0]] * j as f32);
            }
        }
        assert!(c.as_slice()[11..16].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_dot() {
        let a = Vector::from_fn(103, 1, |i, _| (i % 9) as f64 - 4.0);
        let b = Vector::from_fn(103, 1, |i, _| (i % 5) as f64 * 0.25);
        let expected: f64 = (0..103).map(|i| a[[i, 0]] * b[[i, 0]]).sum();
        assert_relative_eq!(dot(&a, &b).unwrap(), expected, epsilon = 1e-12);

        let ints = Vector::from_vec(vec![1u16, 2, 3], 3, 1).unwrap();
        assert_eq!(dot(&ints, &ints).unwrap(), 14);

        let short = Vector::<f64>::new(5, 1);
        assert_eq!(
            dot(&a, &short).unwrap_err(),
            KernelError::InvalidSize { expected: 103, actual: 5 }
        );
    }
}
