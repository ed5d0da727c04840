//! Size descriptors and the differencing scheme.

use crate::math::Real;
use serde::{Deserialize, Serialize};

/// Declared size of a residual vector or a parameter block.
///
/// `Fixed` sizes are known when the problem is built and are checked against
/// the actual data; `Dynamic` sizes are taken from the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Dim {
    /// Size known up front.
    Fixed(usize),
    /// Size determined from the buffers at call time.
    #[default]
    Dynamic,
}

impl Dim {
    /// Resolve the declared size against the observed one.
    ///
    /// # Panics
    ///
    /// Panics if a fixed size disagrees with `observed`.
    pub fn resolve(self, observed: usize, what: &str) -> usize {
        match self {
            Dim::Fixed(n) => {
                assert_eq!(
                    n, observed,
                    "{what}: declared size {n} does not match actual size {observed}"
                );
                n
            }
            Dim::Dynamic => observed,
        }
    }
}

impl From<usize> for Dim {
    fn from(n: usize) -> Self {
        Dim::Fixed(n)
    }
}

/// Finite-difference scheme, fixed for a whole call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DiffMethod {
    /// `(r(x + h e_j) - r(x)) / h`, reusing the residuals at `x`.
    Forward,
    /// `(r(x + h e_j) - r(x - h e_j)) / 2h`.
    #[default]
    Central,
}

impl DiffMethod {
    /// Residual evaluations performed per parameter component.
    pub fn evaluations_per_component(self) -> usize {
        match self {
            DiffMethod::Forward => 1,
            DiffMethod::Central => 2,
        }
    }

    /// Factor applied to a residual difference taken with step `step`.
    pub fn normalization(self, step: Real) -> Real {
        match self {
            DiffMethod::Forward => 1.0 / step,
            DiffMethod::Central => 0.5 / step,
        }
    }
}

/// Which parameter block to differentiate and the sizes it was declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpec {
    /// Index of the block within the parameter list.
    pub block_index: usize,
    /// Declared residual count.
    pub num_residuals: Dim,
    /// Declared size of the block.
    pub block_size: Dim,
}

impl BlockSpec {
    /// Block whose sizes are both taken from the data.
    pub fn dynamic(block_index: usize) -> Self {
        Self {
            block_index,
            num_residuals: Dim::Dynamic,
            block_size: Dim::Dynamic,
        }
    }

    /// Block with both sizes declared up front.
    pub fn fixed(block_index: usize, num_residuals: usize, block_size: usize) -> Self {
        Self {
            block_index,
            num_residuals: Dim::Fixed(num_residuals),
            block_size: Dim::Fixed(block_size),
        }
    }
}

/// Sizes of a block after checking the declaration against the buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResolvedBlock {
    pub block_index: usize,
    pub num_residuals: usize,
    pub block_size: usize,
}
