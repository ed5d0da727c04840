//! Entry points: one Jacobian block per call, or all blocks into a dense matrix.
//!
//! The solver supplies the residuals already computed at the current
//! parameters. Forward differences reuse them as the baseline; central
//! differences evaluate on both sides of every component instead.

use crate::error::NumericDiffError;
use crate::evaluator::ResidualEvaluator;
use crate::jacobian::{scatter_block, JacobianBlockMut};
use crate::math::Real;
use crate::options::NumericDiffOptions;
use crate::perturbation::differentiate_block;
use crate::types::{BlockSpec, ResolvedBlock};
use nalgebra::{DMatrix, DVector, SVector};

/// Check the call against its declaration and resolve the block sizes.
///
/// Every failed check here is a programming error and panics.
fn resolve_block(
    options: &NumericDiffOptions,
    spec: BlockSpec,
    residuals_at_eval_point: &[Real],
    parameters: &[&mut [Real]],
) -> ResolvedBlock {
    assert!(
        options.relative_step_size.is_finite() && options.relative_step_size > 0.0,
        "relative_step_size must be finite and positive, got {}",
        options.relative_step_size
    );
    assert!(
        spec.block_index < parameters.len(),
        "parameter block index {} out of range for {} blocks",
        spec.block_index,
        parameters.len()
    );

    let block_size = spec
        .block_size
        .resolve(parameters[spec.block_index].len(), "parameter block");
    assert!(
        block_size > 0,
        "zero-size parameter block {}: nothing to differentiate",
        spec.block_index
    );
    let num_residuals = spec
        .num_residuals
        .resolve(residuals_at_eval_point.len(), "residuals");

    ResolvedBlock {
        block_index: spec.block_index,
        num_residuals,
        block_size,
    }
}

/// Finite-difference Jacobian of the residuals with respect to one parameter block.
///
/// `parameters` holds every block of the residual function; only
/// `parameters[spec.block_index]` is perturbed, one component at a time, and
/// it is restored before returning. `jacobian` receives the
/// `num_residuals x block_size` block in row-major order.
///
/// # Errors
///
/// Returns [`NumericDiffError::EvaluationFailed`] as soon as the evaluator
/// fails at a perturbed point. The contents of `jacobian` are then undefined.
///
/// # Panics
///
/// Panics on contract violations: a zero-size block, a block index out of
/// range, a non-positive or non-finite relative step, declared sizes that do
/// not match the buffers, or a `jacobian` of the wrong length.
///
/// # Example
///
/// ```
/// use numeric_diff::{compute_jacobian_block, BlockSpec, NumericDiffOptions, Real};
///
/// let square = |p: &[&[Real]], r: &mut [Real]| {
///     r[0] = p[0][0] * p[0][0];
///     true
/// };
/// let mut x = [2.0];
/// let mut params: Vec<&mut [Real]> = vec![&mut x[..]];
/// let mut jac = [0.0];
/// compute_jacobian_block(
///     &square,
///     &NumericDiffOptions::central(),
///     BlockSpec::dynamic(0),
///     &[4.0],
///     &mut params,
///     &mut jac,
/// )
/// .unwrap();
/// assert!((jac[0] - 4.0).abs() < 1e-6);
/// ```
pub fn compute_jacobian_block<E>(
    evaluator: &E,
    options: &NumericDiffOptions,
    spec: BlockSpec,
    residuals_at_eval_point: &[Real],
    parameters: &mut [&mut [Real]],
    jacobian: &mut [Real],
) -> Result<(), NumericDiffError>
where
    E: ResidualEvaluator + ?Sized,
{
    let block = resolve_block(options, spec, residuals_at_eval_point, parameters);
    let mut scratch = DVector::<Real>::zeros(block.num_residuals);
    let mut jacobian = JacobianBlockMut::new(jacobian, block.num_residuals, block.block_size);
    differentiate_block(
        evaluator,
        options.method,
        options.relative_step_size,
        block,
        residuals_at_eval_point,
        parameters,
        &mut jacobian,
        scratch.as_mut_slice(),
    )
}

/// [`compute_jacobian_block`] for sizes known at compile time.
///
/// `NUM_RESIDUALS` and `BLOCK_SIZE` must match the buffers; the residual
/// scratch vector lives on the stack. Results are identical to the dynamic
/// path.
pub fn compute_jacobian_block_fixed<const NUM_RESIDUALS: usize, const BLOCK_SIZE: usize, E>(
    evaluator: &E,
    options: &NumericDiffOptions,
    block_index: usize,
    residuals_at_eval_point: &[Real],
    parameters: &mut [&mut [Real]],
    jacobian: &mut [Real],
) -> Result<(), NumericDiffError>
where
    E: ResidualEvaluator + ?Sized,
{
    let spec = BlockSpec::fixed(block_index, NUM_RESIDUALS, BLOCK_SIZE);
    let block = resolve_block(options, spec, residuals_at_eval_point, parameters);
    let mut scratch = SVector::<Real, NUM_RESIDUALS>::zeros();
    let mut jacobian = JacobianBlockMut::new(jacobian, NUM_RESIDUALS, BLOCK_SIZE);
    differentiate_block(
        evaluator,
        options.method,
        options.relative_step_size,
        block,
        residuals_at_eval_point,
        parameters,
        &mut jacobian,
        scratch.as_mut_slice(),
    )
}

/// Jacobian with respect to all parameter blocks, columns in block order.
///
/// Each block is differentiated in turn with [`compute_jacobian_block`] and
/// scattered into a `num_residuals x sum(block sizes)` matrix.
pub fn jacobian_dense<E>(
    evaluator: &E,
    options: &NumericDiffOptions,
    residuals_at_eval_point: &[Real],
    parameters: &mut [&mut [Real]],
) -> Result<DMatrix<Real>, NumericDiffError>
where
    E: ResidualEvaluator + ?Sized,
{
    let m = residuals_at_eval_point.len();
    let n: usize = parameters.iter().map(|block| block.len()).sum();
    let mut j_global = DMatrix::zeros(m, n);

    let mut block_jacobian = Vec::new();
    let mut col_offset = 0;
    for block_index in 0..parameters.len() {
        let block_size = parameters[block_index].len();
        block_jacobian.clear();
        block_jacobian.resize(m * block_size, 0.0);
        compute_jacobian_block(
            evaluator,
            options,
            BlockSpec::dynamic(block_index),
            residuals_at_eval_point,
            parameters,
            &mut block_jacobian,
        )?;
        scatter_block(&mut j_global, &block_jacobian, block_size, col_offset);
        col_offset += block_size;
    }

    debug_assert_eq!(col_offset, n);
    Ok(j_global)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Dim;

    fn approx_eq(a: Real, b: Real, tol: Real) {
        assert!(
            (a - b).abs() <= tol,
            "values differ: {} vs {} (tol={})",
            a,
            b,
            tol
        );
    }

    // r = [x0 * y0, x1 + y0^2], blocks x (size 2) and y (size 1).
    fn product(p: &[&[Real]], r: &mut [Real]) -> bool {
        r[0] = p[0][0] * p[1][0];
        r[1] = p[0][1] + p[1][0] * p[1][0];
        true
    }

    #[test]
    fn dense_jacobian_concatenates_blocks() {
        let mut x = [2.0, -1.0];
        let mut y = [3.0];
        let mut params: Vec<&mut [Real]> = vec![&mut x[..], &mut y[..]];
        let baseline = [6.0, 8.0];

        let j = jacobian_dense(&product, &NumericDiffOptions::central(), &baseline, &mut params)
            .unwrap();

        assert_eq!((j.nrows(), j.ncols()), (2, 3));
        let expected = [[3.0, 0.0, 2.0], [0.0, 1.0, 6.0]];
        for (r, row) in expected.iter().enumerate() {
            for (c, &value) in row.iter().enumerate() {
                approx_eq(j[(r, c)], value, 1e-6);
            }
        }
    }

    #[test]
    fn fixed_and_dynamic_paths_agree_bitwise() {
        let opts = NumericDiffOptions::forward().with_relative_step_size(1e-5);
        let baseline = [6.0, 8.0];

        let mut x = [2.0, -1.0];
        let mut y = [3.0];
        let mut dynamic = [0.0; 4];
        let mut params: Vec<&mut [Real]> = vec![&mut x[..], &mut y[..]];
        compute_jacobian_block(&product, &opts, BlockSpec::dynamic(0), &baseline, &mut params, &mut dynamic)
            .unwrap();

        let mut fixed = [0.0; 4];
        compute_jacobian_block_fixed::<2, 2, _>(&product, &opts, 0, &baseline, &mut params, &mut fixed)
            .unwrap();

        for (a, b) in dynamic.iter().zip(fixed.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn declared_residual_count_is_checked_against_baseline() {
        let mut x = [1.0];
        let mut params: Vec<&mut [Real]> = vec![&mut x[..]];
        let spec = BlockSpec {
            block_index: 0,
            num_residuals: Dim::Fixed(1),
            block_size: Dim::Dynamic,
        };
        let mut jac = [0.0];
        let id = |p: &[&[Real]], r: &mut [Real]| {
            r[0] = p[0][0];
            true
        };
        compute_jacobian_block(&id, &NumericDiffOptions::forward(), spec, &[1.0], &mut params, &mut jac)
            .unwrap();
        approx_eq(jac[0], 1.0, 1e-9);
    }

    #[test]
    #[should_panic(expected = "parameter block: declared size 3 does not match actual size 2")]
    fn fixed_block_size_mismatch_panics() {
        let mut x = [1.0, 2.0];
        let mut params: Vec<&mut [Real]> = vec![&mut x[..]];
        let mut jac = [0.0; 6];
        let _ = compute_jacobian_block_fixed::<2, 3, _>(
            &product,
            &NumericDiffOptions::central(),
            0,
            &[0.0, 0.0],
            &mut params,
            &mut jac,
        );
    }

    #[test]
    #[should_panic(expected = "relative_step_size must be finite and positive")]
    fn negative_step_panics() {
        let mut x = [1.0];
        let mut params: Vec<&mut [Real]> = vec![&mut x[..]];
        let mut jac = [0.0];
        let opts = NumericDiffOptions::forward().with_relative_step_size(-1e-6);
        let _ = compute_jacobian_block(&product, &opts, BlockSpec::dynamic(0), &[0.0], &mut params, &mut jac);
    }

    #[test]
    #[should_panic(expected = "parameter block index 2 out of range")]
    fn block_index_out_of_range_panics() {
        let mut x = [1.0];
        let mut params: Vec<&mut [Real]> = vec![&mut x[..]];
        let mut jac = [0.0];
        let _ = compute_jacobian_block(
            &product,
            &NumericDiffOptions::forward(),
            BlockSpec::dynamic(2),
            &[0.0],
            &mut params,
            &mut jac,
        );
    }

    #[test]
    #[should_panic(expected = "residuals: declared size 2 does not match actual size 1")]
    fn declared_residual_count_mismatch_panics() {
        let mut x = [1.0];
        let mut params: Vec<&mut [Real]> = vec![&mut x[..]];
        let spec = BlockSpec {
            block_index: 0,
            num_residuals: Dim::Fixed(2),
            block_size: Dim::Dynamic,
        };
        let mut jac = [0.0; 2];
        let _ = compute_jacobian_block(
            &product,
            &NumericDiffOptions::forward(),
            spec,
            &[1.0],
            &mut params,
            &mut jac,
        );
    }
}
