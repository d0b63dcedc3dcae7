//! CPU-dispatched SIMD kernels for the numkern crates.
//!
//! The crate is organised bottom-up:
//!
//! - [`cpu`]: the capability probe ([`CpuFeatures`]), detected once per process.
//! - [`isa`]: the runtime instruction-set enum [`Isa`] and the zero-sized tag
//!   types that select a lane implementation at compile time.
//! - [`lanes`]: the [`Lanes`] / [`FloatLanes`] abstraction, implemented once per
//!   instruction set. Only this module and [`kernels`] touch `std::arch`.
//! - [`kernels`]: generic arithmetic, transcendental, reduction and linear
//!   algebra kernels written against [`Lanes`].
//! - [`dispatch`]: [`Dispatcher`] and the per-element-type priority chains that
//!   turn a runtime [`Isa`] into a monomorphised kernel call.
//!
//! Every kernel works on raw pointers and performs no validation; the safe,
//! shape-checked API lives in the `numkern` crate.
//!
//! # Cargo features
//!
//! - `simd` (default): compile the x86_64 lane implementations. Without it,
//!   or on other architectures, every call runs the portable variant.

pub mod cpu;
pub mod dispatch;
pub mod isa;
pub mod kernels;
pub mod lanes;

pub use cpu::CpuFeatures;
pub use dispatch::{BinaryOp, Dispatcher, FloatKernel, KernelElement, OpClass};
pub use isa::{Isa, IsaTag};
pub use lanes::{FloatLanes, Lanes, WidenTo};
