//! # Dewarp
//!
//! Warp kernels consuming the per-row rotation buffer.
//!
//! - `CpuDewarpKernel`: reference reprojection on the CPU
//! - `PassthroughKernel`: returns the source image untouched

mod cpu;
mod passthrough;

pub use cpu::CpuDewarpKernel;
pub use passthrough::PassthroughKernel;

use contracts::{ContractError, DewarpKernel, DewarpRequest, KernelKind};

/// Build the kernel selected in config
pub fn create_kernel(kind: KernelKind) -> Box<dyn DewarpKernel> {
    match kind {
        KernelKind::Cpu => Box::new(CpuDewarpKernel::new()),
        KernelKind::Passthrough => Box::new(PassthroughKernel),
    }
}

/// Shared request checks: valid image and one rotation per row
pub(crate) fn check_request(kernel: &str, request: &DewarpRequest<'_>) -> Result<(), ContractError> {
    request
        .source
        .validate()
        .map_err(|e| ContractError::kernel_failed(kernel, e.to_string()))?;

    if request.rotations.rows() != request.source.height {
        return Err(ContractError::kernel_failed(
            kernel,
            format!(
                "rotation buffer has {} rows, image has {}",
                request.rotations.rows(),
                request.source.height
            ),
        ));
    }
    Ok(())
}
