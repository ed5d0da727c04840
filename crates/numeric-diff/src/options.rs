//! Configuration for numeric differentiation.

use crate::math::Real;
use crate::types::DiffMethod;
use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// Options shared by every Jacobian block computed for a residual function.
///
/// # Example
///
/// ```
/// use numeric_diff::{DiffMethod, NumericDiffOptions};
///
/// let opts = NumericDiffOptions::forward().with_relative_step_size(1e-4);
/// assert_eq!(opts.method, DiffMethod::Forward);
/// assert!(opts.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericDiffOptions {
    /// Differencing scheme.
    pub method: DiffMethod,
    /// Fraction of `|x_j|` used as the step for component `j`.
    ///
    /// The effective step is never smaller than `sqrt(f64::EPSILON)`.
    pub relative_step_size: Real,
}

impl Default for NumericDiffOptions {
    fn default() -> Self {
        Self {
            method: DiffMethod::Central,
            relative_step_size: 1e-6,
        }
    }
}

impl NumericDiffOptions {
    /// Forward differences with the default relative step.
    pub fn forward() -> Self {
        Self {
            method: DiffMethod::Forward,
            ..Self::default()
        }
    }

    /// Central differences with the default relative step.
    pub fn central() -> Self {
        Self {
            method: DiffMethod::Central,
            ..Self::default()
        }
    }

    pub fn with_relative_step_size(mut self, relative_step_size: Real) -> Self {
        self.relative_step_size = relative_step_size;
        self
    }

    /// Check options loaded from configuration before handing them to a solver.
    ///
    /// The differentiation routines treat an invalid step as a programming
    /// error and panic; this gives callers a recoverable check up front.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.relative_step_size.is_finite(),
            "relative_step_size must be finite, got {}",
            self.relative_step_size
        );
        ensure!(
            self.relative_step_size > 0.0,
            "relative_step_size must be positive, got {}",
            self.relative_step_size
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_central_one_in_a_million() {
        let opts = NumericDiffOptions::default();
        assert_eq!(opts.method, DiffMethod::Central);
        assert_eq!(opts.relative_step_size, 1e-6);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_steps() {
        for bad in [0.0, -1e-6, Real::NAN, Real::INFINITY] {
            let opts = NumericDiffOptions::central().with_relative_step_size(bad);
            assert!(opts.validate().is_err(), "step {} should be rejected", bad);
        }
    }

    #[test]
    fn json_config_fills_missing_fields() {
        let opts: NumericDiffOptions = serde_json::from_str(r#"{ "method": "Forward" }"#).unwrap();
        assert_eq!(opts.method, DiffMethod::Forward);
        assert_eq!(opts.relative_step_size, 1e-6);

        let json = serde_json::to_string(&NumericDiffOptions::central()).unwrap();
        let back: NumericDiffOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, NumericDiffOptions::central());
    }
}
