//! Cost function whose Jacobians come from finite differences.
//!
//! Wraps any [`ResidualEvaluator`] into a [`CostFunction`]: residuals are
//! evaluated once at the given parameters, then every requested Jacobian block
//! is computed by [`compute_jacobian_block`] with those residuals as the
//! forward-difference baseline. Perturbations happen on a private copy of the
//! parameters, so callers only ever hand out shared references.

use crate::error::NumericDiffError;
use crate::evaluator::{CostFunction, ResidualEvaluator};
use crate::math::Real;
use crate::numeric_diff::compute_jacobian_block;
use crate::options::NumericDiffOptions;
use crate::types::{BlockSpec, Dim};
use log::debug;

/// Numerically differentiated cost function.
///
/// # Example
///
/// ```
/// use numeric_diff::{CostFunction, Dim, NumericDiffCostFunction, NumericDiffOptions, Real};
///
/// // r = [x0 + x1, x0 - x1] with two scalar blocks.
/// let cost = NumericDiffCostFunction::new(
///     |p: &[&[Real]], r: &mut [Real]| {
///         r[0] = p[0][0] + p[1][0];
///         r[1] = p[0][0] - p[1][0];
///         true
///     },
///     Dim::Fixed(2),
///     vec![1, 1],
///     NumericDiffOptions::central(),
/// );
///
/// let mut residuals = [0.0; 2];
/// let mut j0 = [0.0; 2];
/// let mut j1 = [0.0; 2];
/// let mut jacobians = [Some(&mut j0[..]), Some(&mut j1[..])];
/// assert!(cost.evaluate(&[&[3.0], &[1.0]], &mut residuals, Some(&mut jacobians[..])));
/// assert_eq!(residuals, [4.0, 2.0]);
/// assert!((j1[1] + 1.0).abs() < 1e-8);
/// ```
#[derive(Debug, Clone)]
pub struct NumericDiffCostFunction<F> {
    functor: F,
    num_residuals: Dim,
    parameter_block_sizes: Vec<usize>,
    options: NumericDiffOptions,
}

impl<F: ResidualEvaluator> NumericDiffCostFunction<F> {
    /// Wrap `functor`, declaring its residual count and parameter block sizes.
    ///
    /// A `Dim::Dynamic` residual count must be set with
    /// [`set_num_residuals`](Self::set_num_residuals) before evaluating.
    ///
    /// # Panics
    ///
    /// Panics if there are no parameter blocks, a block has size zero, or the
    /// options carry an invalid relative step.
    pub fn new(
        functor: F,
        num_residuals: Dim,
        parameter_block_sizes: Vec<usize>,
        options: NumericDiffOptions,
    ) -> Self {
        assert!(
            !parameter_block_sizes.is_empty(),
            "a cost function needs at least one parameter block"
        );
        if let Some(k) = parameter_block_sizes.iter().position(|&n| n == 0) {
            panic!("zero-size parameter block {k}: nothing to differentiate");
        }
        if let Err(err) = options.validate() {
            panic!("invalid numeric diff options: {err}");
        }
        Self {
            functor,
            num_residuals,
            parameter_block_sizes,
            options,
        }
    }

    /// Resolve a dynamic residual count.
    ///
    /// # Panics
    ///
    /// Panics if the residual count was declared fixed to a different value.
    pub fn set_num_residuals(&mut self, num_residuals: usize) {
        self.num_residuals.resolve(num_residuals, "residuals");
        self.num_residuals = Dim::Fixed(num_residuals);
    }

    pub fn options(&self) -> &NumericDiffOptions {
        &self.options
    }

    pub fn functor(&self) -> &F {
        &self.functor
    }

    /// Residuals and requested Jacobians, reporting which evaluation failed.
    ///
    /// `jacobians[k]`, when `Some`, receives the row-major
    /// `num_residuals x parameter_block_sizes[k]` block.
    pub fn try_evaluate(
        &self,
        parameters: &[&[Real]],
        residuals: &mut [Real],
        jacobians: Option<&mut [Option<&mut [Real]>]>,
    ) -> Result<(), NumericDiffError> {
        let num_residuals = self.num_residuals();
        assert_eq!(
            parameters.len(),
            self.parameter_block_sizes.len(),
            "expected {} parameter blocks, got {}",
            self.parameter_block_sizes.len(),
            parameters.len()
        );
        assert_eq!(
            residuals.len(),
            num_residuals,
            "residual buffer holds {} entries, expected {}",
            residuals.len(),
            num_residuals
        );
        for (k, (block, &size)) in parameters.iter().zip(&self.parameter_block_sizes).enumerate() {
            assert_eq!(
                block.len(),
                size,
                "parameter block {k} has {} entries, declared {size}",
                block.len()
            );
        }

        if !self.functor.evaluate(parameters, residuals) {
            return Err(NumericDiffError::BaselineEvaluationFailed);
        }

        let Some(jacobians) = jacobians else {
            return Ok(());
        };
        assert_eq!(
            jacobians.len(),
            self.parameter_block_sizes.len(),
            "expected {} jacobian slots, got {}",
            self.parameter_block_sizes.len(),
            jacobians.len()
        );
        if jacobians.iter().all(Option::is_none) {
            return Ok(());
        }

        // Differentiate on a private copy; the caller's blocks stay untouched.
        let mut owned: Vec<Vec<Real>> = parameters.iter().map(|block| block.to_vec()).collect();
        let mut blocks: Vec<&mut [Real]> = owned.iter_mut().map(Vec::as_mut_slice).collect();

        for (block_index, slot) in jacobians.iter_mut().enumerate() {
            let Some(jacobian) = slot.as_deref_mut() else {
                continue;
            };
            let spec = BlockSpec::fixed(
                block_index,
                num_residuals,
                self.parameter_block_sizes[block_index],
            );
            compute_jacobian_block(
                &self.functor,
                &self.options,
                spec,
                residuals,
                &mut blocks,
                jacobian,
            )?;
        }
        Ok(())
    }
}

impl<F: ResidualEvaluator> CostFunction for NumericDiffCostFunction<F> {
    /// # Panics
    ///
    /// Panics if the residual count is still [`Dim::Dynamic`].
    fn num_residuals(&self) -> usize {
        match self.num_residuals {
            Dim::Fixed(n) => n,
            Dim::Dynamic => panic!("residual count is dynamic and was never set"),
        }
    }

    fn parameter_block_sizes(&self) -> &[usize] {
        &self.parameter_block_sizes
    }

    fn evaluate(
        &self,
        parameters: &[&[Real]],
        residuals: &mut [Real],
        jacobians: Option<&mut [Option<&mut [Real]>]>,
    ) -> bool {
        match self.try_evaluate(parameters, residuals, jacobians) {
            Ok(()) => true,
            Err(err) => {
                debug!("numeric diff cost function: {}", err);
                false
            }
        }
    }
}
