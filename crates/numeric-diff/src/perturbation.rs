//! Perturbation controller: steps one parameter component at a time.
//!
//! The caller's parameter blocks are mutated in place. Access to the mutated
//! component is scoped by [`PerturbedComponent`], which puts the original value
//! back when it goes out of scope, so the parameters are bit-identical after
//! every exit path including early returns on failed evaluations.

use crate::error::{NumericDiffError, StepDirection};
use crate::evaluator::ResidualEvaluator;
use crate::jacobian::JacobianBlockMut;
use crate::math::{step_size, Real};
use crate::types::{DiffMethod, ResolvedBlock};
use log::{debug, trace};

/// Exclusive handle on one component of one parameter block.
pub struct PerturbedComponent<'p, 'b> {
    parameters: &'p mut [&'b mut [Real]],
    block: usize,
    component: usize,
    original: Real,
}

impl<'p, 'b> PerturbedComponent<'p, 'b> {
    /// Take hold of `parameters[block][component]`, remembering its value.
    pub fn acquire(parameters: &'p mut [&'b mut [Real]], block: usize, component: usize) -> Self {
        let original = parameters[block][component];
        Self {
            parameters,
            block,
            component,
            original,
        }
    }

    /// Value of the component when it was acquired.
    pub fn original(&self) -> Real {
        self.original
    }

    /// Set the component to `original + delta`.
    pub fn perturb(&mut self, delta: Real) {
        self.parameters[self.block][self.component] = self.original + delta;
    }

    /// Evaluate the residuals at the current (perturbed) state of all blocks.
    pub fn evaluate<E>(&self, evaluator: &E, residuals: &mut [Real]) -> bool
    where
        E: ResidualEvaluator + ?Sized,
    {
        let view: Vec<&[Real]> = self.parameters.iter().map(|block| &**block).collect();
        evaluator.evaluate(&view, residuals)
    }
}

impl Drop for PerturbedComponent<'_, '_> {
    fn drop(&mut self) {
        self.parameters[self.block][self.component] = self.original;
    }
}

/// Differentiate one resolved block, writing every column of `jacobian`.
///
/// `scratch` holds one residual vector; `residuals_at_eval_point` is only read
/// for forward differences.
#[allow(clippy::too_many_arguments)]
pub(crate) fn differentiate_block<E>(
    evaluator: &E,
    method: DiffMethod,
    relative_step_size: Real,
    block: ResolvedBlock,
    residuals_at_eval_point: &[Real],
    parameters: &mut [&mut [Real]],
    jacobian: &mut JacobianBlockMut<'_>,
    scratch: &mut [Real],
) -> Result<(), NumericDiffError>
where
    E: ResidualEvaluator + ?Sized,
{
    debug_assert_eq!(scratch.len(), block.num_residuals);
    debug!(
        "numeric diff: block {} ({} x {}), {:?}, {} evaluations",
        block.block_index,
        block.num_residuals,
        block.block_size,
        method,
        block.block_size * method.evaluations_per_component()
    );

    for j in 0..block.block_size {
        let mut x_j = PerturbedComponent::acquire(parameters, block.block_index, j);
        let step = step_size(x_j.original(), relative_step_size);
        trace!(
            "block {} component {}: x = {}, step = {:e}",
            block.block_index,
            j,
            x_j.original(),
            step
        );

        x_j.perturb(step);
        if !x_j.evaluate(evaluator, scratch) {
            return Err(evaluation_failed(block.block_index, j, StepDirection::Forward));
        }
        jacobian.set_column(j, scratch);

        match method {
            DiffMethod::Forward => jacobian.sub_column(j, residuals_at_eval_point),
            DiffMethod::Central => {
                x_j.perturb(-step);
                if !x_j.evaluate(evaluator, scratch) {
                    return Err(evaluation_failed(block.block_index, j, StepDirection::Backward));
                }
                jacobian.sub_column(j, scratch);
            }
        }
        drop(x_j);

        jacobian.scale_column(j, method.normalization(step));
    }
    Ok(())
}

fn evaluation_failed(block: usize, component: usize, direction: StepDirection) -> NumericDiffError {
    debug!(
        "numeric diff: {} evaluation failed for block {} component {}",
        direction, block, component
    );
    NumericDiffError::EvaluationFailed {
        block,
        component,
        direction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_restores_on_drop() {
        let mut a = [1.0, 2.0];
        let mut b: [Real; 1] = [0.1 + 0.2];
        let before = b[0].to_bits();
        {
            let mut params: Vec<&mut [Real]> = vec![&mut a[..], &mut b[..]];
            let mut guard = PerturbedComponent::acquire(&mut params, 1, 0);
            guard.perturb(1e-7);
            guard.perturb(-1e-7);
        }
        assert_eq!(b[0].to_bits(), before);
        assert_eq!(a, [1.0, 2.0]);
    }

    #[test]
    fn evaluator_sees_only_one_component_moved() {
        let mut a = [1.0, 2.0, 3.0];
        let mut params: Vec<&mut [Real]> = vec![&mut a[..]];
        let mut guard = PerturbedComponent::acquire(&mut params, 0, 1);
        guard.perturb(0.5);
        let seen = |p: &[&[Real]], r: &mut [Real]| {
            r.copy_from_slice(p[0]);
            true
        };
        let mut r = [0.0; 3];
        assert!(guard.evaluate(&seen, &mut r));
        assert_eq!(r, [1.0, 2.5, 3.0]);
    }

    #[test]
    fn evaluation_count_matches_scheme() {
        use std::cell::Cell;

        for method in [DiffMethod::Forward, DiffMethod::Central] {
            let calls = Cell::new(0usize);
            let counted = |p: &[&[Real]], r: &mut [Real]| {
                calls.set(calls.get() + 1);
                r[0] = p[0][0] - p[0][1] + p[0][2];
                true
            };
            let mut a = [1.0, 2.0, 3.0];
            let mut params: Vec<&mut [Real]> = vec![&mut a[..]];
            let block = ResolvedBlock {
                block_index: 0,
                num_residuals: 1,
                block_size: 3,
            };
            let mut data = [0.0; 3];
            let mut jacobian = JacobianBlockMut::new(&mut data, 1, 3);
            let mut scratch = [0.0];
            differentiate_block(
                &counted,
                method,
                1e-6,
                block,
                &[2.0],
                &mut params,
                &mut jacobian,
                &mut scratch,
            )
            .unwrap();
            assert_eq!(calls.get(), 3 * method.evaluations_per_component());
            assert_eq!(a, [1.0, 2.0, 3.0]);
        }
    }
}
