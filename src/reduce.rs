//! Axis reductions: sum, min, max and mean.
//!
//! The input is planned into a fused iteration space in which every axis is
//! either kept or reduced. When the innermost contiguous run is reduced the
//! row kernel folds each run horizontally into one output element; when it
//! is kept the column kernel folds whole runs vertically into an output row.
//! Any remaining axes are walked outside the kernel, folding into the same
//! output, so the output is set to the identity of the fold first.

use numkern_simd::{BinaryOp, Dispatcher, Isa, KernelElement, OpClass};
use numkern_traits::Element;
use smallvec::{smallvec, SmallVec};

use crate::arith::value_in_place;
use crate::axis::Axis;
use crate::container::{Dense, Dims};
use crate::plan::{self, Plan};
use crate::{ensure_initialized, KernelError, Result};

type RowsKernel<T, A> = unsafe fn(Isa, *const T, usize, usize, usize, *mut A, usize);
type ColsKernel<T, A> = unsafe fn(Isa, *const T, usize, usize, usize, *mut A);

/// Validate `out` against `a` reduced along `axis` and plan the sweep.
fn prepare<C: Dense, O: Dense>(out: &O, a: &C, axis: Axis) -> Result<Plan<2>> {
    ensure_initialized(&[out.is_empty(), a.is_empty()])?;
    let rank = C::RANK;
    let positions = axis.positions(rank).ok_or(KernelError::InvalidAxis { axis, rank })?;

    let shape = a.shape();
    let mut reduced: SmallVec<[bool; 4]> = smallvec![false; shape.len()];
    for p in positions {
        reduced[p] = true;
    }
    let expected: Dims = shape
        .iter()
        .zip(&reduced)
        .filter(|&(_, &r)| !r)
        .map(|(&x, _)| x)
        .collect();
    let actual = out.shape();
    if actual != expected {
        return Err(KernelError::InvalidShape {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        });
    }

    // Output strides laid over the input axes, 0 where the axis collapses.
    let kept = out.strides();
    let mut kept = kept.iter();
    let out_strides: Dims = reduced
        .iter()
        .map(|&r| if r { 0 } else { kept.next().copied().unwrap_or(0) })
        .collect();
    Ok(plan::reduction(&shape, &a.strides(), &out_strides, &reduced))
}

/// Drive the row or column kernel over `plan`.
///
/// # Safety
/// `plan` must come from [`prepare`] for the containers behind `src` and
/// `out`, and `isa` must be supported by the CPU.
unsafe fn run<T, A>(
    plan: &Plan<2>,
    isa: Isa,
    src: *const T,
    out: *mut A,
    rows_kernel: RowsKernel<T, A>,
    cols_kernel: ColsKernel<T, A>,
) {
    let m = plan.dims.len();
    let n = plan.dims[m - 1];
    let (si, so) = (&plan.strides[0], &plan.strides[1]);

    if plan.reduced[m - 1] {
        let (rows, ld, os, outer) = if m >= 2 {
            (plan.dims[m - 2], si[m - 2], so[m - 2], m - 2)
        } else {
            (1, n, 0, 0)
        };
        tracing::trace!(rows, n, outer, "horizontal reduction");
        plan::for_each_offset(&plan.dims[..outer], [&si[..outer], &so[..outer]], |[i, o]| unsafe {
            rows_kernel(isa, src.add(i), ld, rows, n, out.add(o), os)
        });
    } else {
        let row_axis = (0..m - 1).rev().find(|&k| plan.reduced[k]);
        let (rows, ld) = match row_axis {
            Some(k) => (plan.dims[k], si[k]),
            None => (1, n),
        };
        let outer: SmallVec<[usize; 4]> = (0..m - 1).filter(|&k| Some(k) != row_axis).collect();
        let dims: Dims = outer.iter().map(|&k| plan.dims[k]).collect();
        let in_strides: Dims = outer.iter().map(|&k| si[k]).collect();
        let out_strides: Dims = outer.iter().map(|&k| so[k]).collect();
        tracing::trace!(rows, n, outer = outer.len(), "vertical reduction");
        plan::for_each_offset(&dims, [in_strides.as_slice(), out_strides.as_slice()], |[i, o]| unsafe {
            cols_kernel(isa, src.add(i), ld, rows, n, out.add(o))
        });
    }
}

fn fold_impl<'a, C, O>(
    d: &Dispatcher,
    out: &'a mut O,
    a: &C,
    axis: Axis,
    identity: O::Elem,
    rows_kernel: RowsKernel<C::Elem, O::Elem>,
    cols_kernel: ColsKernel<C::Elem, O::Elem>,
) -> Result<&'a mut O>
where
    C: Dense,
    C::Elem: KernelElement,
    O: Dense,
{
    let plan = prepare(out, a, axis)?;
    out.fill(identity);
    let isa = d.select_for::<C::Elem>(OpClass::Reduce);
    let (src, dst) = (a.as_ptr(), out.as_mut_ptr());
    // SAFETY: the plan was built from these two validated containers.
    unsafe { run(&plan, isa, src, dst, rows_kernel, cols_kernel) };
    Ok(out)
}

/// Sum of `a` along `axis` into `out`.
///
/// Integer sums accumulate in the widened type (`i8`/`i16`/`i32` into `i64`,
/// unsigned into `u64`); floats accumulate in kind. `out` must have exactly
/// the shape of `a` with the reduced axes removed, e.g. a vector of `columns`
/// entries for a matrix reduced along [`Axis::Y`].
///
/// # Errors
/// [`KernelError::NotInitialized`] for an empty operand,
/// [`KernelError::InvalidAxis`] when `axis` does not exist for the rank of
/// `a`, [`KernelError::InvalidShape`] when `out` has the wrong shape.
pub fn reduce_sum<'a, C, O>(out: &'a mut O, a: &C, axis: Axis) -> Result<&'a mut O>
where
    C: Dense,
    C::Elem: KernelElement,
    O: Dense<Elem = <C::Elem as Element>::Acc>,
{
    reduce_sum_with(&Dispatcher::host(), out, a, axis)
}

pub fn reduce_sum_with<'a, C, O>(d: &Dispatcher, out: &'a mut O, a: &C, axis: Axis) -> Result<&'a mut O>
where
    C: Dense,
    C::Elem: KernelElement,
    O: Dense<Elem = <C::Elem as Element>::Acc>,
{
    fold_impl(
        d,
        out,
        a,
        axis,
        num_traits::Zero::zero(),
        <C::Elem as KernelElement>::sum_rows,
        <C::Elem as KernelElement>::sum_cols,
    )
}

/// Minimum of `a` along `axis`; same shape rules as [`reduce_sum`].
///
/// Float comparisons follow `minps`: a NaN element is skipped unless it is
/// the last one compared.
pub fn reduce_min<'a, C, O>(out: &'a mut O, a: &C, axis: Axis) -> Result<&'a mut O>
where
    C: Dense,
    C::Elem: KernelElement,
    O: Dense<Elem = C::Elem>,
{
    reduce_min_with(&Dispatcher::host(), out, a, axis)
}

pub fn reduce_min_with<'a, C, O>(d: &Dispatcher, out: &'a mut O, a: &C, axis: Axis) -> Result<&'a mut O>
where
    C: Dense,
    C::Elem: KernelElement,
    O: Dense<Elem = C::Elem>,
{
    fold_impl(
        d,
        out,
        a,
        axis,
        <C::Elem as Element>::highest(),
        <C::Elem as KernelElement>::min_rows,
        <C::Elem as KernelElement>::min_cols,
    )
}

/// Maximum of `a` along `axis`; same shape rules as [`reduce_sum`].
pub fn reduce_max<'a, C, O>(out: &'a mut O, a: &C, axis: Axis) -> Result<&'a mut O>
where
    C: Dense,
    C::Elem: KernelElement,
    O: Dense<Elem = C::Elem>,
{
    reduce_max_with(&Dispatcher::host(), out, a, axis)
}

pub fn reduce_max_with<'a, C, O>(d: &Dispatcher, out: &'a mut O, a: &C, axis: Axis) -> Result<&'a mut O>
where
    C: Dense,
    C::Elem: KernelElement,
    O: Dense<Elem = C::Elem>,
{
    fold_impl(
        d,
        out,
        a,
        axis,
        <C::Elem as Element>::lowest(),
        <C::Elem as KernelElement>::max_rows,
        <C::Elem as KernelElement>::max_cols,
    )
}

/// Mean of `a` along `axis`, in the sum accumulator type.
///
/// Computed as [`reduce_sum`] followed by a separate scaling pass: float
/// sums are multiplied by `1 / count`, integer sums divided (truncating) by
/// `count`.
pub fn reduce_mean<'a, C, O>(out: &'a mut O, a: &C, axis: Axis) -> Result<&'a mut O>
where
    C: Dense,
    C::Elem: KernelElement,
    <C::Elem as Element>::Acc: KernelElement,
    O: Dense<Elem = <C::Elem as Element>::Acc>,
{
    reduce_mean_with(&Dispatcher::host(), out, a, axis)
}

pub fn reduce_mean_with<'a, C, O>(d: &Dispatcher, out: &'a mut O, a: &C, axis: Axis) -> Result<&'a mut O>
where
    C: Dense,
    C::Elem: KernelElement,
    <C::Elem as Element>::Acc: KernelElement,
    O: Dense<Elem = <C::Elem as Element>::Acc>,
{
    let out = reduce_sum_with(d, out, a, axis)?;
    let count = a.size() / out.size();
    let scale = <O::Elem as Element>::from_count(count);
    if <O::Elem as Element>::IS_FLOAT {
        let recip = <O::Elem as num_traits::One>::one().elem_div(scale);
        value_in_place(d, BinaryOp::Mul, &mut *out, recip);
    } else {
        value_in_place(d, BinaryOp::Div, &mut *out, scale);
    }
    Ok(out)
}
