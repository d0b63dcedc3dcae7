//! Stride planning.
//!
//! A container operation is lowered to a set of contiguous inner runs that the
//! kernels consume directly. Planning squeezes extent-1 axes, then fuses each
//! axis into its inner neighbour whenever every operand is contiguous across
//! the pair (`stride[i] == dims[i + 1] * stride[i + 1]`), so a packed matrix
//! becomes one run of `rows * columns * dimension` elements and only padding
//! or broadcasting leaves outer loops behind.

use smallvec::{smallvec, SmallVec};

use crate::container::Dims;

/// Fused iteration space shared by `K` operands.
///
/// `dims` is outermost first; `reduced` marks the axes a reduction collapses
/// (all `false` for elementwise plans). Axes are only fused within the same
/// class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Plan<const K: usize> {
    pub(crate) dims: Dims,
    pub(crate) strides: [Dims; K],
    pub(crate) reduced: SmallVec<[bool; 4]>,
}

impl<const K: usize> Plan<K> {
    /// Length of the innermost run.
    pub(crate) fn inner(&self) -> usize {
        self.dims.last().copied().unwrap_or(1)
    }

    /// Visit the start offsets of every innermost run.
    pub(crate) fn for_each_outer(&self, f: impl FnMut([usize; K])) {
        let depth = self.dims.len().saturating_sub(1);
        for_each_offset(
            &self.dims[..depth],
            std::array::from_fn(|k| &self.strides[k][..depth]),
            f,
        );
    }

    fn push_unit(&mut self) {
        self.dims.push(1);
        for s in &mut self.strides {
            s.push(1);
        }
        self.reduced.push(false);
    }
}

/// Squeeze extent-1 axes and fuse contiguous neighbours of the same class.
fn fuse<const K: usize>(shape: &[usize], strides: [&[usize]; K], class: &[bool]) -> Plan<K> {
    let keep: SmallVec<[usize; 4]> = (0..shape.len()).filter(|&i| shape[i] != 1).collect();
    let mut dims: Dims = keep.iter().map(|&i| shape[i]).collect();
    let st: [Dims; K] = std::array::from_fn(|k| keep.iter().map(|&i| strides[k][i]).collect());
    let cls: SmallVec<[bool; 4]> = keep.iter().map(|&i| class[i]).collect();

    // Outermost first: a fused block keeps the stride of its inner axis, so
    // it can be fused again into the next one.
    let mut merged: SmallVec<[bool; 4]> = smallvec![false; dims.len()];
    for i in 0..dims.len().saturating_sub(1) {
        let j = i + 1;
        let contiguous = cls[i] == cls[j] && st.iter().all(|s| s[i] == dims[j] * s[j]);
        if contiguous {
            dims[j] *= dims[i];
            merged[i] = true;
        }
    }

    let live = |v: &[usize]| -> Dims {
        v.iter()
            .zip(&merged)
            .filter(|&(_, &m)| !m)
            .map(|(&x, _)| x)
            .collect()
    };
    Plan {
        dims: live(dims.as_slice()),
        strides: std::array::from_fn(|k| live(st[k].as_slice())),
        reduced: cls.iter().zip(&merged).filter(|&(_, &m)| !m).map(|(&c, _)| c).collect(),
    }
}

/// Plan for operands of one common shape, ending in a run that is
/// contiguous in every operand.
///
/// An operand may carry stride 0 on outer axes (broadcast).
pub(crate) fn elementwise<const K: usize>(shape: &[usize], strides: [&[usize]; K]) -> Plan<K> {
    let class: SmallVec<[bool; 4]> = smallvec![false; shape.len()];
    let mut plan = fuse(shape, strides, &class);
    let unit = !plan.dims.is_empty() && plan.strides.iter().all(|s| s.last() == Some(&1));
    if !unit {
        plan.push_unit();
    }
    plan
}

/// Plan for a reduction of `shape` into an output addressed by `out_strides`
/// (0 on every reduced axis).
///
/// The innermost run is contiguous in the input and, when kept, in the
/// output.
pub(crate) fn reduction(shape: &[usize], in_strides: &[usize], out_strides: &[usize], reduced: &[bool]) -> Plan<2> {
    let mut plan = fuse(shape, [in_strides, out_strides], reduced);
    let unit = match (plan.strides[0].last(), plan.strides[1].last(), plan.reduced.last()) {
        (Some(&1), _, Some(&true)) => true,
        (Some(&1), Some(&1), Some(&false)) => true,
        _ => false,
    };
    if !unit {
        plan.push_unit();
    }
    plan
}

/// Call `f` with the offsets of every index of `dims`, last axis fastest.
pub(crate) fn for_each_offset<const K: usize>(
    dims: &[usize],
    strides: [&[usize]; K],
    mut f: impl FnMut([usize; K]),
) {
    if dims.contains(&0) {
        return;
    }
    let mut index: Dims = smallvec![0; dims.len()];
    let mut offsets = [0usize; K];
    loop {
        f(offsets);
        let mut level = dims.len();
        loop {
            if level == 0 {
                return;
            }
            level -= 1;
            index[level] += 1;
            for (off, s) in offsets.iter_mut().zip(&strides) {
                *off += s[level];
            }
            if index[level] < dims[level] {
                break;
            }
            for (off, s) in offsets.iter_mut().zip(&strides) {
                *off -= dims[level] * s[level];
            }
            index[level] = 0;
        }
    }
}
