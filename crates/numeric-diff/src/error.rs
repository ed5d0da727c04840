//! Recoverable failures of numeric differentiation.
//!
//! Only evaluator failures are reported here. Contract violations such as a
//! zero-size parameter block panic instead, since no caller can recover a
//! meaningful Jacobian from them.

use std::fmt;
use thiserror::Error;

/// Side of the parameter on which an evaluation was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepDirection {
    /// `x_j + step`.
    Forward,
    /// `x_j - step` (central differences only).
    Backward,
}

impl fmt::Display for StepDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepDirection::Forward => f.write_str("forward"),
            StepDirection::Backward => f.write_str("backward"),
        }
    }
}

/// Errors reported by the Jacobian routines.
///
/// After any of these the Jacobian buffer may be partially written and must
/// not be used. Parameters are always restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NumericDiffError {
    /// The residual function failed at a perturbed point.
    #[error("residual evaluation failed at {direction} step of block {block}, component {component}")]
    EvaluationFailed {
        block: usize,
        component: usize,
        direction: StepDirection,
    },
    /// The residual function failed at the unperturbed point.
    #[error("residual evaluation failed at the unperturbed parameters")]
    BaselineEvaluationFailed,
}
