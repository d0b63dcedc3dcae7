//! Dense owning containers.
//!
//! All four shapes share one memory model: the `dimension` channel is the
//! innermost axis and is contiguous, a row of `columns * dimension` elements
//! is contiguous, and rows (matrices, tensors) and planes (tensors) sit at a
//! stride that may include padding:
//!
//! ```text
//! Tensor (batch, rows, columns, dimension)
//!
//!   plane 0  | r0: c0d0 c0d1 .. c{C-1}d{D-1} pad.. |  <- row_stride
//!            | r1: ...                             |
//!            | pad..                               |  <- plane_stride
//!   plane 1  | ...
//! ```
//!
//! A container with zero elements owns no buffer and is "empty"; every
//! operation rejects empty operands with [`KernelError::NotInitialized`].

use std::ops::{Index, IndexMut};

use numkern_traits::Element;
use smallvec::{smallvec, SmallVec};

use crate::{plan, KernelError, Result};

/// Shape or stride list, outermost axis first, the dimension channel last.
pub type Dims = SmallVec<[usize; 4]>;

mod sealed {
    pub trait Sealed {}
}

/// Shape and layout contract of a dense container.
///
/// `shape()` lists the spatial axes outermost first followed by the
/// dimension channel; `strides()` gives the element stride of each entry,
/// the last one always 1.
pub trait Dense: sealed::Sealed {
    type Elem: Element;

    /// Number of spatial axes: 0 scalar, 1 vector, 2 matrix, 3 tensor.
    const RANK: usize;

    fn shape(&self) -> Dims;

    fn strides(&self) -> Dims;

    /// The whole buffer, padding included.
    fn as_slice(&self) -> &[Self::Elem];

    fn as_mut_slice(&mut self) -> &mut [Self::Elem];

    /// Logical element count, the product of the shape.
    fn size(&self) -> usize {
        self.shape().iter().product()
    }

    /// `true` exactly when the container owns no buffer.
    fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    fn as_ptr(&self) -> *const Self::Elem {
        self.as_slice().as_ptr()
    }

    fn as_mut_ptr(&mut self) -> *mut Self::Elem {
        self.as_mut_slice().as_mut_ptr()
    }

    /// Logical elements in row-major order, padding skipped.
    fn to_packed(&self) -> Vec<Self::Elem> {
        let mut out = Vec::with_capacity(self.size());
        if self.is_empty() {
            return out;
        }
        let (shape, strides) = (self.shape(), self.strides());
        let plan = plan::elementwise(&shape, [strides.as_slice()]);
        let n = plan.inner();
        let data = self.as_slice();
        plan.for_each_outer(|[off]| out.extend_from_slice(&data[off..off + n]));
        out
    }

    /// Set every logical element to `value`, leaving padding untouched.
    fn fill(&mut self, value: Self::Elem) {
        if self.is_empty() {
            return;
        }
        let (shape, strides) = (self.shape(), self.strides());
        let plan = plan::elementwise(&shape, [strides.as_slice()]);
        let n = plan.inner();
        let data = self.as_mut_slice();
        plan.for_each_outer(|[off]| data[off..off + n].fill(value));
    }
}

/// Buffer length for `outer` blocks at `stride`, zero when nothing is stored.
fn buffer_len(size: usize, outer: usize, stride: usize) -> usize {
    if size == 0 {
        0
    } else {
        outer * stride
    }
}

fn check_stride(stride: usize, extent: usize) -> Result<()> {
    if stride < extent {
        return Err(KernelError::InvalidStride { stride, extent });
    }
    Ok(())
}

fn check_len(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(KernelError::InvalidSize { expected, actual });
    }
    Ok(())
}

macro_rules! impl_dense {
    ($name:ident, $rank:expr, $n:literal) => {
        impl<T: Element> sealed::Sealed for $name<T> {}

        impl<T: Element> Dense for $name<T> {
            type Elem = T;
            const RANK: usize = $rank;

            fn shape(&self) -> Dims {
                self.shape_dims()
            }

            fn strides(&self) -> Dims {
                self.stride_dims()
            }

            fn as_slice(&self) -> &[T] {
                &self.data
            }

            fn as_mut_slice(&mut self) -> &mut [T] {
                &mut self.data
            }
        }

        impl<T: Element> $name<T> {
            /// Element at `index` (outermost axis first, channel last).
            pub fn get(&self, index: [usize; $n]) -> Option<&T> {
                self.offset(index).map(|o| &self.data[o])
            }

            pub fn get_mut(&mut self, index: [usize; $n]) -> Option<&mut T> {
                self.offset(index).map(move |o| &mut self.data[o])
            }

            /// The whole buffer, padding included.
            pub fn as_slice(&self) -> &[T] {
                &self.data
            }

            pub fn as_mut_slice(&mut self) -> &mut [T] {
                &mut self.data
            }

            /// Hand the buffer back to the caller.
            pub fn into_vec(self) -> Vec<T> {
                self.data
            }

            pub fn size(&self) -> usize {
                Dense::size(self)
            }

            pub fn is_empty(&self) -> bool {
                self.data.is_empty()
            }

            fn offset(&self, index: [usize; $n]) -> Option<usize> {
                let shape = self.shape_dims();
                let strides = self.stride_dims();
                let mut off = 0;
                for ((&i, &extent), &stride) in index.iter().zip(&shape).zip(&strides) {
                    if i >= extent {
                        return None;
                    }
                    off += i * stride;
                }
                Some(off)
            }
        }

        impl<T: Element> Index<[usize; $n]> for $name<T> {
            type Output = T;

            fn index(&self, index: [usize; $n]) -> &T {
                match self.offset(index) {
                    Some(o) => &self.data[o],
                    None => panic!("index {:?} out of bounds for shape {:?}", index, self.shape_dims()),
                }
            }
        }

        impl<T: Element> IndexMut<[usize; $n]> for $name<T> {
            fn index_mut(&mut self, index: [usize; $n]) -> &mut T {
                match self.offset(index) {
                    Some(o) => &mut self.data[o],
                    None => panic!("index {:?} out of bounds for shape {:?}", index, self.shape_dims()),
                }
            }
        }
    };
}

// ============================================================================
// Scalar
// ============================================================================

/// One `dimension`-channel value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scalar<T> {
    data: Vec<T>,
    dimension: usize,
}

impl<T: Element> Scalar<T> {
    pub fn new(dimension: usize) -> Self {
        Self::filled(dimension, T::zero())
    }

    pub fn filled(dimension: usize, value: T) -> Self {
        Self {
            data: vec![value; dimension],
            dimension,
        }
    }

    /// Adopt `data` as the channel values.
    pub fn from_vec(data: Vec<T>) -> Self {
        let dimension = data.len();
        Self { data, dimension }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn shape_dims(&self) -> Dims {
        smallvec![self.dimension]
    }

    fn stride_dims(&self) -> Dims {
        smallvec![1]
    }
}

impl_dense!(Scalar, 0, 1);

// ============================================================================
// Vector
// ============================================================================

/// `length` entries of `dimension` channels, packed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vector<T> {
    data: Vec<T>,
    length: usize,
    dimension: usize,
}

impl<T: Element> Vector<T> {
    pub fn new(length: usize, dimension: usize) -> Self {
        Self::filled(length, dimension, T::zero())
    }

    pub fn filled(length: usize, dimension: usize, value: T) -> Self {
        Self {
            data: vec![value; length * dimension],
            length,
            dimension,
        }
    }

    pub fn from_vec(data: Vec<T>, length: usize, dimension: usize) -> Result<Self> {
        check_len(length * dimension, data.len())?;
        Ok(Self {
            data,
            length,
            dimension,
        })
    }

    /// `f(i, d)` for every entry `i` and channel `d`.
    pub fn from_fn(length: usize, dimension: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(length * dimension);
        for i in 0..length {
            for d in 0..dimension {
                data.push(f(i, d));
            }
        }
        Self {
            data,
            length,
            dimension,
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn shape_dims(&self) -> Dims {
        smallvec![self.length, self.dimension]
    }

    fn stride_dims(&self) -> Dims {
        smallvec![self.dimension, 1]
    }
}

impl_dense!(Vector, 1, 2);

// ============================================================================
// Matrix
// ============================================================================

/// `rows x columns` entries of `dimension` channels; rows start every
/// `row_stride` elements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Matrix<T> {
    data: Vec<T>,
    rows: usize,
    columns: usize,
    dimension: usize,
    row_stride: usize,
}

impl<T: Element> Matrix<T> {
    pub fn new(rows: usize, columns: usize, dimension: usize) -> Self {
        Self::filled(rows, columns, dimension, T::zero())
    }

    pub fn filled(rows: usize, columns: usize, dimension: usize, value: T) -> Self {
        let row_stride = columns * dimension;
        Self {
            data: vec![value; rows * row_stride],
            rows,
            columns,
            dimension,
            row_stride,
        }
    }

    /// Zeroed matrix whose rows are padded to `row_stride` elements.
    pub fn with_row_stride(rows: usize, columns: usize, dimension: usize, row_stride: usize) -> Result<Self> {
        check_stride(row_stride, columns * dimension)?;
        let len = buffer_len(rows * columns * dimension, rows, row_stride);
        Ok(Self {
            data: vec![T::zero(); len],
            rows,
            columns,
            dimension,
            row_stride,
        })
    }

    pub fn from_vec(data: Vec<T>, rows: usize, columns: usize, dimension: usize) -> Result<Self> {
        Self::from_vec_strided(data, rows, columns, dimension, columns * dimension)
    }

    /// Adopt `data` holding `rows` rows of `row_stride` elements.
    pub fn from_vec_strided(
        data: Vec<T>,
        rows: usize,
        columns: usize,
        dimension: usize,
        row_stride: usize,
    ) -> Result<Self> {
        check_stride(row_stride, columns * dimension)?;
        check_len(buffer_len(rows * columns * dimension, rows, row_stride), data.len())?;
        Ok(Self {
            data,
            rows,
            columns,
            dimension,
            row_stride,
        })
    }

    /// `f(r, c, d)` for every row, column and channel.
    pub fn from_fn(rows: usize, columns: usize, dimension: usize, mut f: impl FnMut(usize, usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(rows * columns * dimension);
        for r in 0..rows {
            for c in 0..columns {
                for d in 0..dimension {
                    data.push(f(r, c, d));
                }
            }
        }
        Self {
            data,
            rows,
            columns,
            dimension,
            row_stride: columns * dimension,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    fn shape_dims(&self) -> Dims {
        smallvec![self.rows, self.columns, self.dimension]
    }

    fn stride_dims(&self) -> Dims {
        smallvec![self.row_stride, self.dimension, 1]
    }
}

impl_dense!(Matrix, 2, 3);

// ============================================================================
// Tensor
// ============================================================================

/// `batch` planes of `rows x columns` entries of `dimension` channels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tensor<T> {
    data: Vec<T>,
    batch: usize,
    rows: usize,
    columns: usize,
    dimension: usize,
    row_stride: usize,
    plane_stride: usize,
}

impl<T: Element> Tensor<T> {
    pub fn new(batch: usize, rows: usize, columns: usize, dimension: usize) -> Self {
        Self::filled(batch, rows, columns, dimension, T::zero())
    }

    pub fn filled(batch: usize, rows: usize, columns: usize, dimension: usize, value: T) -> Self {
        let row_stride = columns * dimension;
        let plane_stride = rows * row_stride;
        Self {
            data: vec![value; batch * plane_stride],
            batch,
            rows,
            columns,
            dimension,
            row_stride,
            plane_stride,
        }
    }

    /// Zeroed tensor with padded rows and planes.
    pub fn with_strides(
        batch: usize,
        rows: usize,
        columns: usize,
        dimension: usize,
        row_stride: usize,
        plane_stride: usize,
    ) -> Result<Self> {
        check_stride(row_stride, columns * dimension)?;
        check_stride(plane_stride, rows * row_stride)?;
        let len = buffer_len(batch * rows * columns * dimension, batch, plane_stride);
        Ok(Self {
            data: vec![T::zero(); len],
            batch,
            rows,
            columns,
            dimension,
            row_stride,
            plane_stride,
        })
    }

    pub fn from_vec(data: Vec<T>, batch: usize, rows: usize, columns: usize, dimension: usize) -> Result<Self> {
        let row_stride = columns * dimension;
        Self::from_vec_strided(data, batch, rows, columns, dimension, row_stride, rows * row_stride)
    }

    /// Adopt `data` holding `batch` planes of `plane_stride` elements.
    #[allow(clippy::too_many_arguments)]
    pub fn from_vec_strided(
        data: Vec<T>,
        batch: usize,
        rows: usize,
        columns: usize,
        dimension: usize,
        row_stride: usize,
        plane_stride: usize,
    ) -> Result<Self> {
        check_stride(row_stride, columns * dimension)?;
        check_stride(plane_stride, rows * row_stride)?;
        check_len(
            buffer_len(batch * rows * columns * dimension, batch, plane_stride),
            data.len(),
        )?;
        Ok(Self {
            data,
            batch,
            rows,
            columns,
            dimension,
            row_stride,
            plane_stride,
        })
    }

    /// `f(b, r, c, d)` for every plane, row, column and channel.
    pub fn from_fn(
        batch: usize,
        rows: usize,
        columns: usize,
        dimension: usize,
        mut f: impl FnMut(usize, usize, usize, usize) -> T,
    ) -> Self {
        let mut data = Vec::with_capacity(batch * rows * columns * dimension);
        for b in 0..batch {
            for r in 0..rows {
                for c in 0..columns {
                    for d in 0..dimension {
                        data.push(f(b, r, c, d));
                    }
                }
            }
        }
        let row_stride = columns * dimension;
        Self {
            data,
            batch,
            rows,
            columns,
            dimension,
            row_stride,
            plane_stride: rows * row_stride,
        }
    }

    pub fn batch(&self) -> usize {
        self.batch
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    pub fn plane_stride(&self) -> usize {
        self.plane_stride
    }

    fn shape_dims(&self) -> Dims {
        smallvec![self.batch, self.rows, self.columns, self.dimension]
    }

    fn stride_dims(&self) -> Dims {
        smallvec![self.plane_stride, self.row_stride, self.dimension, 1]
    }
}

impl_dense!(Tensor, 3, 4);
