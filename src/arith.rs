//! Element-wise arithmetic: buffer op buffer, buffer op value, and buffer op
//! broadcast operand.

use numkern_simd::{BinaryOp, Dispatcher, KernelElement, OpClass};

use crate::container::{Dense, Dims};
use crate::{ensure_initialized, ensure_same_shape, plan, KernelError, Result};

fn binary_impl<'a, C>(d: &Dispatcher, op: BinaryOp, out: &'a mut C, a: &C, b: &C) -> Result<&'a mut C>
where
    C: Dense,
    C::Elem: KernelElement,
{
    ensure_initialized(&[out.is_empty(), a.is_empty(), b.is_empty()])?;
    let shape = out.shape();
    ensure_same_shape(&shape, &a.shape())?;
    ensure_same_shape(&shape, &b.shape())?;

    let isa = d.select_for::<C::Elem>(OpClass::Arith);
    let (so, sa, sb) = (out.strides(), a.strides(), b.strides());
    let plan = plan::elementwise(&shape, [so.as_slice(), sa.as_slice(), sb.as_slice()]);
    let n = plan.inner();
    let (dst, pa, pb) = (out.as_mut_ptr(), a.as_ptr(), b.as_ptr());
    // SAFETY: the plan addresses only logical elements of operands that were
    // checked to share one shape; `isa` comes from the dispatcher.
    plan.for_each_outer(|[o, i, j]| unsafe {
        <C::Elem as KernelElement>::binary(isa, op, dst.add(o), pa.add(i), pb.add(j), n);
    });
    Ok(out)
}

fn value_impl<'a, C>(d: &Dispatcher, op: BinaryOp, out: &'a mut C, a: &C, value: C::Elem) -> Result<&'a mut C>
where
    C: Dense,
    C::Elem: KernelElement,
{
    ensure_initialized(&[out.is_empty(), a.is_empty()])?;
    let shape = out.shape();
    ensure_same_shape(&shape, &a.shape())?;

    let isa = d.select_for::<C::Elem>(OpClass::Arith);
    let (so, sa) = (out.strides(), a.strides());
    let plan = plan::elementwise(&shape, [so.as_slice(), sa.as_slice()]);
    let n = plan.inner();
    let (dst, pa) = (out.as_mut_ptr(), a.as_ptr());
    // SAFETY: see `binary_impl`.
    plan.for_each_outer(|[o, i]| unsafe {
        <C::Elem as KernelElement>::binary_value(isa, op, dst.add(o), pa.add(i), value, n);
    });
    Ok(out)
}

/// `out op= value` over the logical elements of `out`.
pub(crate) fn value_in_place<C>(d: &Dispatcher, op: BinaryOp, out: &mut C, value: C::Elem)
where
    C: Dense,
    C::Elem: KernelElement,
{
    if out.is_empty() {
        return;
    }
    let isa = d.select_for::<C::Elem>(OpClass::Arith);
    let (shape, so) = (out.shape(), out.strides());
    let plan = plan::elementwise(&shape, [so.as_slice()]);
    let n = plan.inner();
    let dst = out.as_mut_ptr();
    // SAFETY: in-place use is fine: each lane is loaded before it is stored.
    plan.for_each_outer(|[o]| unsafe {
        <C::Elem as KernelElement>::binary_value(isa, op, dst.add(o), dst.add(o), value, n);
    });
}

fn broadcast_impl<'a, C, B>(d: &Dispatcher, op: BinaryOp, out: &'a mut C, a: &C, b: &B) -> Result<&'a mut C>
where
    C: Dense,
    B: Dense<Elem = C::Elem>,
    C::Elem: KernelElement,
{
    ensure_initialized(&[out.is_empty(), a.is_empty(), b.is_empty()])?;
    let shape = out.shape();
    ensure_same_shape(&shape, &a.shape())?;
    let b_shape = b.shape();
    if b_shape.len() >= shape.len() || !shape.ends_with(&b_shape) {
        let keep = b_shape.len().min(shape.len() - 1);
        return Err(KernelError::InvalidShape {
            expected: shape[shape.len() - keep..].to_vec(),
            actual: b_shape.to_vec(),
        });
    }
    if b.size() == 1 {
        return value_impl(d, op, out, a, b.as_slice()[0]);
    }

    // `b` repeats along the leading axes it does not have.
    let lead = shape.len() - b_shape.len();
    let mut sb: Dims = Dims::from_elem(0, lead);
    sb.extend_from_slice(&b.strides());

    let isa = d.select_for::<C::Elem>(OpClass::Arith);
    let (so, sa) = (out.strides(), a.strides());
    let plan = plan::elementwise(&shape, [so.as_slice(), sa.as_slice(), sb.as_slice()]);
    let n = plan.inner();
    let m = plan.dims.len();
    let (dst, pa, pb) = (out.as_mut_ptr(), a.as_ptr(), b.as_ptr());

    if m >= 2 && plan.strides[2][m - 2] == 0 {
        // The axis just outside the run repeats `b`: hand it to the broadcast
        // kernel as its row axis.
        let rows = plan.dims[m - 2];
        let (dst_ld, a_ld) = (plan.strides[0][m - 2], plan.strides[1][m - 2]);
        let outer = m - 2;
        plan::for_each_offset(
            &plan.dims[..outer],
            [&plan.strides[0][..outer], &plan.strides[1][..outer], &plan.strides[2][..outer]],
            // SAFETY: see `binary_impl`; `b` offsets stay within its shape.
            |[o, i, j]| unsafe {
                <C::Elem as KernelElement>::binary_broadcast(isa, op, dst.add(o), dst_ld, pa.add(i), a_ld, pb.add(j), rows, n);
            },
        );
    } else {
        plan.for_each_outer(|[o, i, j]| unsafe {
            <C::Elem as KernelElement>::binary(isa, op, dst.add(o), pa.add(i), pb.add(j), n);
        });
    }
    Ok(out)
}

macro_rules! binary_ops {
    ($(
        $op:ident: $name:ident, $name_with:ident, $value:ident, $value_with:ident,
        $broadcast:ident, $broadcast_with:ident, $sym:literal;
    )*) => {
        $(
            #[doc = concat!("`out = a ", $sym, " b` element-wise.")]
            ///
            /// # Errors
            /// [`KernelError::NotInitialized`] for an empty operand,
            /// [`KernelError::InvalidSize`] when element counts differ and
            /// [`KernelError::InvalidShape`] when only the shapes differ.
            pub fn $name<'a, C>(out: &'a mut C, a: &C, b: &C) -> Result<&'a mut C>
            where
                C: Dense,
                C::Elem: KernelElement,
            {
                binary_impl(&Dispatcher::host(), BinaryOp::$op, out, a, b)
            }

            #[doc = concat!("[`", stringify!($name), "`] with an explicit dispatcher.")]
            pub fn $name_with<'a, C>(d: &Dispatcher, out: &'a mut C, a: &C, b: &C) -> Result<&'a mut C>
            where
                C: Dense,
                C::Elem: KernelElement,
            {
                binary_impl(d, BinaryOp::$op, out, a, b)
            }

            #[doc = concat!("`out = a ", $sym, " value` element-wise.")]
            pub fn $value<'a, C>(out: &'a mut C, a: &C, value: C::Elem) -> Result<&'a mut C>
            where
                C: Dense,
                C::Elem: KernelElement,
            {
                value_impl(&Dispatcher::host(), BinaryOp::$op, out, a, value)
            }

            #[doc = concat!("[`", stringify!($value), "`] with an explicit dispatcher.")]
            pub fn $value_with<'a, C>(d: &Dispatcher, out: &'a mut C, a: &C, value: C::Elem) -> Result<&'a mut C>
            where
                C: Dense,
                C::Elem: KernelElement,
            {
                value_impl(d, BinaryOp::$op, out, a, value)
            }

            #[doc = concat!("`out = a ", $sym, " b` with `b` repeated along the leading axes of `a`.")]
            ///
            /// The shape of `b` must equal a strict trailing suffix of the
            /// shape of `a`, e.g. a vector of `columns` entries against a
            /// matrix, or a matrix against every plane of a tensor. Violations
            /// raise [`KernelError::InvalidShape`].
            pub fn $broadcast<'a, C, B>(out: &'a mut C, a: &C, b: &B) -> Result<&'a mut C>
            where
                C: Dense,
                B: Dense<Elem = C::Elem>,
                C::Elem: KernelElement,
            {
                broadcast_impl(&Dispatcher::host(), BinaryOp::$op, out, a, b)
            }

            #[doc = concat!("[`", stringify!($broadcast), "`] with an explicit dispatcher.")]
            pub fn $broadcast_with<'a, C, B>(d: &Dispatcher, out: &'a mut C, a: &C, b: &B) -> Result<&'a mut C>
            where
                C: Dense,
                B: Dense<Elem = C::Elem>,
                C::Elem: KernelElement,
            {
                broadcast_impl(d, BinaryOp::$op, out, a, b)
            }
        )*
    };
}

binary_ops! {
    Add: add, add_with, add_value, add_value_with, add_broadcast, add_broadcast_with, "+";
    Sub: sub, sub_with, sub_value, sub_value_with, sub_broadcast, sub_broadcast_with, "-";
    Mul: mul, mul_with, mul_value, mul_value_with, mul_broadcast, mul_broadcast_with, "*";
    Div: div, div_with, div_value, div_value_with, div_broadcast, div_broadcast_with, "/";
}
