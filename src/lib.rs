//! CPU-dispatched SIMD kernels over dense scalar, vector, matrix and tensor
//! containers.
//!
//! Every public operation validates its operands, asks a [`Dispatcher`] for
//! the best kernel variant the CPU supports, and runs it over the raw buffers.
//! The selection happens on every call; there is no cached plan and no
//! internal mutable state apart from the once-detected [`CpuFeatures`].
//!
//! # Core Types
//!
//! - [`Scalar`], [`Vector`], [`Matrix`], [`Tensor`]: owning dense containers.
//!   The innermost `dimension` channel is contiguous; matrices and tensors
//!   may pad their rows and planes.
//! - [`Dense`]: the shape/stride contract the operations consume.
//! - [`Axis`]: which axes a reduction collapses.
//!
//! # Operations
//!
//! - Arithmetic: [`add`], [`sub`], [`mul`], [`div`], the `*_value` forms with
//!   one scalar operand, and the `*_broadcast` forms whose right operand's
//!   shape is a trailing suffix of the output shape.
//! - Transcendental: [`exp`], [`log`].
//! - Reductions: [`reduce_sum`], [`reduce_min`], [`reduce_max`],
//!   [`reduce_mean`].
//! - Linear algebra: [`matmul`], [`outer`], [`dot`].
//!
//! Each operation has a `*_with` twin taking an explicit [`Dispatcher`], which
//! is how a restricted capability set is injected:
//!
//! ```rust
//! use numkern::{reduce_sum, reduce_sum_with, Axis, CpuFeatures, Dispatcher, Isa, Matrix, Vector};
//!
//! let m = Matrix::filled(4, 8, 1, 2.0f32);
//! let mut rows = Vector::new(4, 1);
//! reduce_sum(&mut rows, &m, Axis::X).unwrap();
//! assert_eq!(rows.as_slice(), &[16.0; 4]);
//!
//! let sse2 = Dispatcher::new(CpuFeatures::from_isa(Isa::Sse2));
//! let mut cols = Vector::new(8, 1);
//! reduce_sum_with(&sse2, &mut cols, &m, Axis::Y).unwrap();
//! assert_eq!(cols.as_slice(), &[8.0; 8]);
//! ```
//!
//! # Cargo features
//!
//! - `simd` (default): compile the x86_64 kernel variants. Without it every
//!   call runs the portable variant.

mod arith;
mod axis;
mod container;
mod linalg;
mod plan;
mod reduce;
mod transcend;

pub use arith::{
    add, add_broadcast, add_broadcast_with, add_value, add_value_with, add_with, div,
    div_broadcast, div_broadcast_with, div_value, div_value_with, div_with, mul, mul_broadcast,
    mul_broadcast_with, mul_value, mul_value_with, mul_with, sub, sub_broadcast,
    sub_broadcast_with, sub_value, sub_value_with, sub_with,
};
pub use axis::Axis;
pub use container::{Dense, Dims, Matrix, Scalar, Tensor, Vector};
pub use linalg::{dot, dot_with, matmul, matmul_with, outer, outer_with};
pub use reduce::{
    reduce_max, reduce_max_with, reduce_mean, reduce_mean_with, reduce_min, reduce_min_with,
    reduce_sum, reduce_sum_with,
};
pub use transcend::{exp, exp_with, log, log_with};

pub use numkern_simd::{BinaryOp, CpuFeatures, Dispatcher, FloatKernel, Isa, KernelElement, OpClass};
pub use numkern_traits::{Element, Float};

// ============================================================================
// Error types
// ============================================================================

/// Argument validation failures, raised before any kernel runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KernelError {
    /// An input or output container has no buffer.
    #[error("container is not initialized")]
    NotInitialized,

    /// Element counts that must match differ.
    #[error("invalid size: expected {expected} elements, got {actual}")]
    InvalidSize { expected: usize, actual: usize },

    /// A broadcast, matrix product or reduction shape rule is violated.
    #[error("invalid shape: expected {expected:?}, got {actual:?}")]
    InvalidShape {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// The axis selector is not valid for the container's rank.
    #[error("axis {axis} is not valid for rank {rank}")]
    InvalidAxis { axis: Axis, rank: usize },

    /// A row or plane stride is smaller than the extent it has to hold.
    #[error("stride {stride} is smaller than the packed extent {extent}")]
    InvalidStride { stride: usize, extent: usize },
}

/// Result type for kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;

/// Fail with [`KernelError::NotInitialized`] if any container is empty.
pub(crate) fn ensure_initialized(empty: &[bool]) -> Result<()> {
    if empty.iter().any(|&e| e) {
        return Err(KernelError::NotInitialized);
    }
    Ok(())
}

pub(crate) fn ensure_same_shape(expected: &[usize], actual: &[usize]) -> Result<()> {
    let (e, a) = (expected.iter().product::<usize>(), actual.iter().product::<usize>());
    if e != a {
        return Err(KernelError::InvalidSize {
            expected: e,
            actual: a,
        });
    }
    if expected != actual {
        return Err(KernelError::InvalidShape {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        });
    }
    Ok(())
}
