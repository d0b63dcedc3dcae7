//! Shared element-type contracts for the numkern crates.
//!
//! This crate provides the trait definitions that are shared between
//! `numkern-simd` (the dispatched kernels) and `numkern` (the containers and
//! the validated API):
//!
//! - [`Element`]: every type a kernel can operate on, with the wrapping
//!   integer / IEEE float arithmetic the SIMD instructions implement and the
//!   widened accumulator type used by sum reductions.
//! - [`Float`]: the two floating point precisions, carrying the constants of
//!   the exponential and logarithm approximations.

pub mod element;
pub mod float;

pub use element::Element;
pub use float::Float;
