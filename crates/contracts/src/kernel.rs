//! DewarpKernel trait - the warp stage consuming one rotation per scanline.

use nalgebra::Matrix3;

use crate::{ContractError, DistortionCoeffs, ImageData, Intrinsics};

/// Per-row corrective rotations, `rows * 9` floats, each matrix row-major
///
/// This is the exact layout uploaded to the warp kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct RowRotations {
    rows: u32,
    data: Vec<f32>,
}

impl RowRotations {
    /// Buffer of `rows` identity rotations
    pub fn identity(rows: u32) -> Self {
        let mut data = Vec::with_capacity(rows as usize * 9);
        for _ in 0..rows {
            data.extend_from_slice(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        }
        Self { rows, data }
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Store the rotation for `row`. Out-of-range rows are ignored.
    pub fn set(&mut self, row: u32, matrix: &Matrix3<f32>) {
        if row >= self.rows {
            return;
        }
        let base = row as usize * 9;
        for r in 0..3 {
            for c in 0..3 {
                self.data[base + r * 3 + c] = matrix[(r, c)];
            }
        }
    }

    /// Rotation stored for `row`
    pub fn get(&self, row: u32) -> Option<Matrix3<f32>> {
        if row >= self.rows {
            return None;
        }
        let base = row as usize * 9;
        Some(Matrix3::from_row_slice(&self.data[base..base + 9]))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Raw bytes for device upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}

/// Everything one kernel invocation needs
#[derive(Debug, Clone, Copy)]
pub struct DewarpRequest<'a> {
    pub source: &'a ImageData,
    pub rotations: &'a RowRotations,
    pub zoom: f32,
    pub distortion: DistortionCoeffs,
    pub intrinsics: Intrinsics,
}

/// Warp stage
///
/// Invoked once per accepted frame with a complete per-row rotation buffer.
/// A failure only costs the current frame.
pub trait DewarpKernel: Send {
    /// Kernel name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Produce the stabilized image
    ///
    /// # Errors
    /// Returns kernel failure (should include context)
    fn dewarp(&mut self, request: &DewarpRequest<'_>) -> Result<ImageData, ContractError>;
}

impl<K: DewarpKernel + ?Sized> DewarpKernel for Box<K> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn dewarp(&mut self, request: &DewarpRequest<'_>) -> Result<ImageData, ContractError> {
        (**self).dewarp(request)
    }
}
