//! Camera stream types - frames, calibration and fixed session geometry.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Image buffer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    /// Image width (pixels)
    pub width: u32,

    /// Image height (rows)
    pub height: u32,

    /// Pixel layout
    pub format: ImageFormat,

    /// Tightly packed pixel rows
    pub data: Bytes,
}

/// Pixel layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    Gray8,
    Rgb8,
    Rgba8,
    Bgra8,
}

impl ImageFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            ImageFormat::Gray8 => 1,
            ImageFormat::Rgb8 => 3,
            ImageFormat::Rgba8 | ImageFormat::Bgra8 => 4,
        }
    }
}

impl ImageData {
    /// Expected buffer length for the declared size and format
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    /// Check that the buffer is non-empty and matches its layout
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.is_empty() {
            return Err(ContractError::invalid_image("image is empty"));
        }
        if self.data.len() != self.expected_len() {
            return Err(ContractError::invalid_image(format!(
                "buffer holds {} bytes, {}x{} {:?} needs {}",
                self.data.len(),
                self.width,
                self.height,
                self.format,
                self.expected_len()
            )));
        }
        Ok(())
    }
}

/// Pinhole intrinsics (pixels)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

/// Brown-Conrady distortion (radial k1, k2 and tangential p1, p2)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DistortionCoeffs {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
}

/// Calibration carried alongside every camera frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraCalibration {
    pub width: u32,
    pub height: u32,
    pub intrinsics: Intrinsics,
    #[serde(default)]
    pub distortion: DistortionCoeffs,
}

/// One camera callback: image plus the calibration it was published with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraFrame {
    /// Frame reference timestamp (seconds)
    pub timestamp: f64,

    /// Optional sequence number (diagnostics only)
    pub seq: Option<u64>,

    pub image: ImageData,

    pub calibration: CameraCalibration,
}

/// Camera geometry fixed for the session
///
/// Built once from the first calibration message; later calibrations are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraGeometry {
    pub width: u32,
    pub height: u32,

    /// Time between consecutive row captures (seconds). The sign encodes readout
    /// direction: positive means row 0 is read first.
    pub line_delay: f64,

    pub intrinsics: Intrinsics,
    pub distortion: DistortionCoeffs,
}

impl CameraGeometry {
    /// Combine a calibration message with the configured line delay
    pub fn from_calibration(
        calibration: &CameraCalibration,
        line_delay: f64,
    ) -> Result<Self, ContractError> {
        if calibration.width == 0 || calibration.height == 0 {
            return Err(ContractError::invalid_calibration(format!(
                "image size {}x{} is empty",
                calibration.width, calibration.height
            )));
        }
        let k = &calibration.intrinsics;
        if !(k.fx.is_finite() && k.fy.is_finite() && k.fx > 0.0 && k.fy > 0.0) {
            return Err(ContractError::invalid_calibration(format!(
                "focal lengths must be positive, got fx={} fy={}",
                k.fx, k.fy
            )));
        }
        if !(k.cx.is_finite() && k.cy.is_finite()) {
            return Err(ContractError::invalid_calibration("principal point is not finite"));
        }
        if !line_delay.is_finite() {
            return Err(ContractError::invalid_calibration(format!(
                "line delay must be finite, got {line_delay}"
            )));
        }

        Ok(Self {
            width: calibration.width,
            height: calibration.height,
            line_delay,
            intrinsics: calibration.intrinsics,
            distortion: calibration.distortion,
        })
    }
}
