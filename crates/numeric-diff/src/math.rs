//! Scalar type and step-size arithmetic.

/// Scalar type used for parameters, residuals and Jacobian entries.
pub type Real = f64;

/// Smallest step ever taken when perturbing a parameter.
///
/// Steps below `sqrt(epsilon)` are dominated by round-off once the residual
/// difference is divided by the step.
pub fn min_step_size() -> Real {
    Real::EPSILON.sqrt()
}

/// Step used for a parameter of value `x`.
///
/// The step scales with `|x|` and is floored by [`min_step_size`], so a
/// parameter at exactly zero still gets a usable perturbation.
pub fn step_size(x: Real, relative_step_size: Real) -> Real {
    min_step_size().max(x.abs() * relative_step_size)
}
