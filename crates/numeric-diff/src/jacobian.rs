//! Difference assembler: Jacobian block storage and column arithmetic.
//!
//! A block for `m` residuals and a parameter block of size `n` is stored
//! row-major, entry `(i, j)` at offset `i * n + j`. With `n == 1` this is the
//! plain column `0..m`, so no separate single-column layout is needed.

use crate::math::Real;
use nalgebra::DMatrix;

/// Mutable row-major view over a caller-owned Jacobian block.
#[derive(Debug)]
pub struct JacobianBlockMut<'a> {
    data: &'a mut [Real],
    num_residuals: usize,
    block_size: usize,
}

impl<'a> JacobianBlockMut<'a> {
    /// Wrap `data` as a `num_residuals x block_size` block.
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != num_residuals * block_size`.
    pub fn new(data: &'a mut [Real], num_residuals: usize, block_size: usize) -> Self {
        assert_eq!(
            data.len(),
            num_residuals * block_size,
            "jacobian buffer holds {} entries, expected {} x {}",
            data.len(),
            num_residuals,
            block_size
        );
        Self {
            data,
            num_residuals,
            block_size,
        }
    }

    pub fn num_residuals(&self) -> usize {
        self.num_residuals
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Offset of entry `(residual, component)` in the underlying buffer.
    #[inline]
    pub fn offset(&self, residual: usize, component: usize) -> usize {
        debug_assert!(residual < self.num_residuals && component < self.block_size);
        residual * self.block_size + component
    }

    pub fn get(&self, residual: usize, component: usize) -> Real {
        self.data[self.offset(residual, component)]
    }

    /// Overwrite column `j` with `values`.
    pub fn set_column(&mut self, j: usize, values: &[Real]) {
        self.zip_column(j, values, |entry, v| *entry = v);
    }

    /// Subtract `values` from column `j`.
    pub fn sub_column(&mut self, j: usize, values: &[Real]) {
        self.zip_column(j, values, |entry, v| *entry -= v);
    }

    /// Multiply column `j` by `factor`.
    pub fn scale_column(&mut self, j: usize, factor: Real) {
        assert!(j < self.block_size, "column {j} out of range");
        for entry in self.data.iter_mut().skip(j).step_by(self.block_size) {
            *entry *= factor;
        }
    }

    fn zip_column(&mut self, j: usize, values: &[Real], mut op: impl FnMut(&mut Real, Real)) {
        assert!(j < self.block_size, "column {j} out of range");
        assert_eq!(
            values.len(),
            self.num_residuals,
            "residual vector has {} entries, expected {}",
            values.len(),
            self.num_residuals
        );
        let column = self.data.iter_mut().skip(j).step_by(self.block_size);
        for (entry, &v) in column.zip(values) {
            op(entry, v);
        }
    }

    /// Copy the block into a dense matrix.
    pub fn to_matrix(&self) -> DMatrix<Real> {
        DMatrix::from_row_slice(self.num_residuals, self.block_size, &self.data[..])
    }
}

/// Copy a row-major block into `j_global` starting at column `col_offset`.
pub fn scatter_block(
    j_global: &mut DMatrix<Real>,
    block: &[Real],
    block_size: usize,
    col_offset: usize,
) {
    debug_assert_eq!(block.len(), j_global.nrows() * block_size);
    for (r, row) in block.chunks_exact(block_size).enumerate() {
        for (k, &value) in row.iter().enumerate() {
            j_global[(r, col_offset + k)] = value;
        }
    }
}
