//! Finite-difference Jacobians for non-linear least squares.
//!
//! This crate estimates the Jacobian of a black-box residual function with
//! respect to one parameter block at a time. It is meant to sit inside a larger
//! solver that cannot differentiate its residuals analytically:
//! - the [`perturbation`] controller picks a step per component, perturbs the
//!   caller's parameters in place and always restores them,
//! - the [`jacobian`] assembler turns the evaluations into normalized columns
//!   written in row-major order (`i * block_size + j`),
//! - [`compute_jacobian_block`] is the entry point used by solvers, with a
//!   statically sized variant [`compute_jacobian_block_fixed`].
//!
//! Failed residual evaluations are reported as [`NumericDiffError`]. Misuse
//! (zero-size blocks, non-positive steps, mismatched declared sizes) panics.

pub mod cost_function;
pub mod error;
pub mod evaluator;
pub mod jacobian;
pub mod math;
pub mod numeric_diff;
pub mod options;
pub mod perturbation;
pub mod types;

pub use cost_function::NumericDiffCostFunction;
pub use error::{NumericDiffError, StepDirection};
pub use evaluator::{CostFunction, CostFunctionEvaluator, ResidualEvaluator};
pub use jacobian::JacobianBlockMut;
pub use math::*;
pub use numeric_diff::{compute_jacobian_block, compute_jacobian_block_fixed, jacobian_dense};
pub use options::NumericDiffOptions;
pub use types::{BlockSpec, DiffMethod, Dim};
