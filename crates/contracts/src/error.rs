//! Errors shared across crates: config, input validation, warp kernels, sinks

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContractError {
    // ----- config -----
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// `field` is the dotted config path, e.g. `camera.zoom`
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ----- input -----
    /// Calibration message cannot describe a usable camera
    #[error("invalid calibration: {message}")]
    InvalidCalibration { message: String },

    /// Image buffer does not match its declared layout
    #[error("invalid image: {message}")]
    InvalidImage { message: String },

    // ----- output -----
    #[error("kernel '{kernel}' failed: {message}")]
    KernelFailed { kernel: String, message: String },

    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_calibration(message: impl Into<String>) -> Self {
        Self::InvalidCalibration {
            message: message.into(),
        }
    }

    pub fn invalid_image(message: impl Into<String>) -> Self {
        Self::InvalidImage {
            message: message.into(),
        }
    }

    pub fn kernel_failed(kernel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::KernelFailed {
            kernel: kernel.into(),
            message: message.into(),
        }
    }

    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}
