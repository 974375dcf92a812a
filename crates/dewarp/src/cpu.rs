//! CPU reference kernel: rotation-only pinhole reprojection.

use bytes::Bytes;
use contracts::{ContractError, DewarpKernel, DewarpRequest, ImageData};
use nalgebra::Vector3;
use tracing::trace;

use crate::check_request;

/// Row-wise reprojection with nearest-neighbour sampling
///
/// For destination pixel `(u, v)` the viewing ray
/// `((u - cx) / (fx * zoom), (v - cy) / (fy * zoom), 1)` is rotated by the
/// rotation of row `v` and projected back into the source image. Rays landing
/// outside the source (or behind the camera) produce black pixels.
///
/// Lens distortion is not inverted.
#[derive(Debug, Default)]
pub struct CpuDewarpKernel {
    /// Reused output buffer
    scratch: Vec<u8>,
}

impl CpuDewarpKernel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DewarpKernel for CpuDewarpKernel {
    fn name(&self) -> &str {
        "cpu"
    }

    fn dewarp(&mut self, request: &DewarpRequest<'_>) -> Result<ImageData, ContractError> {
        check_request(self.name(), request)?;

        let zoom = request.zoom as f64;
        if !(zoom.is_finite() && zoom > 0.0) {
            return Err(ContractError::kernel_failed(
                self.name(),
                format!("zoom must be positive, got {zoom}"),
            ));
        }

        let source = request.source;
        let k = request.intrinsics;
        let width = source.width as usize;
        let height = source.height as usize;
        let bpp = source.format.bytes_per_pixel();
        let stride = width * bpp;

        self.scratch.clear();
        self.scratch.resize(source.data.len(), 0);

        for v in 0..height {
            let Some(rotation) = request.rotations.get(v as u32) else {
                continue;
            };
            let rotation = rotation.cast::<f64>();
            let y = (v as f64 - k.cy) / (k.fy * zoom);

            for u in 0..width {
                let ray = Vector3::new((u as f64 - k.cx) / (k.fx * zoom), y, 1.0);
                let p = rotation * ray;
                if p.z <= f64::EPSILON {
                    continue;
                }

                let su = (k.fx * p.x / p.z + k.cx).round();
                let sv = (k.fy * p.y / p.z + k.cy).round();
                if su < 0.0 || sv < 0.0 || su >= width as f64 || sv >= height as f64 {
                    continue;
                }

                let src = sv as usize * stride + su as usize * bpp;
                let dst = v * stride + u * bpp;
                self.scratch[dst..dst + bpp].copy_from_slice(&source.data[src..src + bpp]);
            }
        }

        trace!(width, height, zoom, "cpu dewarp done");

        Ok(ImageData {
            width: source.width,
            height: source.height,
            format: source.format,
            data: Bytes::copy_from_slice(&self.scratch),
        })
    }
}
