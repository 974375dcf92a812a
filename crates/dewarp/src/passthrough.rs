use contracts::{ContractError, DewarpKernel, DewarpRequest, ImageData};

use crate::check_request;

/// Hands the source image back unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughKernel;

impl DewarpKernel for PassthroughKernel {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn dewarp(&mut self, request: &DewarpRequest<'_>) -> Result<ImageData, ContractError> {
        check_request(self.name(), request)?;
        Ok(request.source.clone())
    }
}
