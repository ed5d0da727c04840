//! Residual evaluation capabilities consumed by the differentiation routines.
//!
//! Two shapes of residual function are supported:
//! - plain callables `Fn(&[&[Real]], &mut [Real]) -> bool`, which implement
//!   [`ResidualEvaluator`] directly,
//! - cost objects implementing [`CostFunction`], which can also produce their
//!   own Jacobians and are adapted through [`CostFunctionEvaluator`].
//!
//! Evaluators must be deterministic and must not keep references to the
//! buffers they are given.

use crate::math::Real;

/// Computes residuals for the current values of all parameter blocks.
pub trait ResidualEvaluator {
    /// Fill `residuals` from `parameters`, one slice per block.
    ///
    /// Returns `false` if the residuals cannot be computed at this point,
    /// e.g. outside the function's domain.
    fn evaluate(&self, parameters: &[&[Real]], residuals: &mut [Real]) -> bool;
}

impl<F> ResidualEvaluator for F
where
    F: Fn(&[&[Real]], &mut [Real]) -> bool,
{
    fn evaluate(&self, parameters: &[&[Real]], residuals: &mut [Real]) -> bool {
        self(parameters, residuals)
    }
}

/// A residual block that knows its sizes and may supply Jacobians.
///
/// Jacobian `k`, when requested, is a row-major `num_residuals x block_size_k`
/// buffer.
pub trait CostFunction {
    /// Number of residuals produced.
    fn num_residuals(&self) -> usize;
    /// Size of each parameter block, in order.
    fn parameter_block_sizes(&self) -> &[usize];

    /// Evaluate residuals and, for every `Some` slot, the Jacobian of that block.
    fn evaluate(
        &self,
        parameters: &[&[Real]],
        residuals: &mut [Real],
        jacobians: Option<&mut [Option<&mut [Real]>]>,
    ) -> bool;
}

/// Residual-only view of a [`CostFunction`].
#[derive(Debug, Clone, Copy)]
pub struct CostFunctionEvaluator<'a, C: ?Sized>(pub &'a C);

impl<C: CostFunction + ?Sized> ResidualEvaluator for CostFunctionEvaluator<'_, C> {
    fn evaluate(&self, parameters: &[&[Real]], residuals: &mut [Real]) -> bool {
        self.0.evaluate(parameters, residuals, None)
    }
}
