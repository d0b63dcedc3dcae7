//! Element-wise exponential and natural logarithm.

use numkern_simd::{Dispatcher, FloatKernel, Isa, OpClass};

use crate::container::Dense;
use crate::{ensure_initialized, ensure_same_shape, plan, Result};

type UnaryKernel<T> = unsafe fn(Isa, *mut T, *const T, usize);

fn unary_impl<'a, C>(d: &Dispatcher, kernel: UnaryKernel<C::Elem>, out: &'a mut C, a: &C) -> Result<&'a mut C>
where
    C: Dense,
    C::Elem: FloatKernel,
{
    ensure_initialized(&[out.is_empty(), a.is_empty()])?;
    let shape = out.shape();
    ensure_same_shape(&shape, &a.shape())?;

    let isa = d.select_for::<C::Elem>(OpClass::Transcendental);
    let (so, sa) = (out.strides(), a.strides());
    let plan = plan::elementwise(&shape, [so.as_slice(), sa.as_slice()]);
    let n = plan.inner();
    let (dst, src) = (out.as_mut_ptr(), a.as_ptr());
    // SAFETY: both operands share the validated shape; `isa` comes from the
    // dispatcher.
    plan.for_each_outer(|[o, i]| unsafe { kernel(isa, dst.add(o), src.add(i), n) });
    Ok(out)
}

/// `out = exp(a)` element-wise.
///
/// Inputs are clamped to the representable range of the result, so large
/// arguments saturate instead of overflowing; NaN propagates.
pub fn exp<'a, C>(out: &'a mut C, a: &C) -> Result<&'a mut C>
where
    C: Dense,
    C::Elem: FloatKernel,
{
    exp_with(&Dispatcher::host(), out, a)
}

pub fn exp_with<'a, C>(d: &Dispatcher, out: &'a mut C, a: &C) -> Result<&'a mut C>
where
    C: Dense,
    C::Elem: FloatKernel,
{
    unary_impl(d, <C::Elem as FloatKernel>::exp, out, a)
}

/// `out = ln(a)` element-wise.
///
/// Zero, negative and NaN inputs give NaN; `+inf` gives `+inf`.
pub fn log<'a, C>(out: &'a mut C, a: &C) -> Result<&'a mut C>
where
    C: Dense,
    C::Elem: FloatKernel,
{
    log_with(&Dispatcher::host(), out, a)
}

pub fn log_with<'a, C>(d: &Dispatcher, out: &'a mut C, a: &C) -> Result<&'a mut C>
where
    C: Dense,
    C::Elem: FloatKernel,
{
    unary_impl(d, <C::Elem as FloatKernel>::log, out, a)
}
