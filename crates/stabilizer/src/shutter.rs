//! Rolling-shutter timing model.

use contracts::CameraGeometry;

/// Maps a frame reference timestamp and a scanline to that row's capture time
///
/// The reference timestamp belongs to the middle row. A negative line delay
/// means the sensor reads out bottom-up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingShutterModel {
    height: u32,
    line_delay: f64,
}

impl RollingShutterModel {
    pub fn new(height: u32, line_delay: f64) -> Self {
        Self { height, line_delay }
    }

    pub fn from_geometry(geometry: &CameraGeometry) -> Self {
        Self::new(geometry.height, geometry.line_delay)
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn line_delay(&self) -> f64 {
        self.line_delay
    }

    #[inline]
    pub fn row_time(&self, timestamp: f64, row: u32) -> f64 {
        timestamp + self.line_delay * (row as f64 - self.height as f64 / 2.0)
    }

    fn last_row(&self) -> u32 {
        self.height.saturating_sub(1)
    }

    /// Capture time of the row read first
    pub fn frame_begin_time(&self, timestamp: f64) -> f64 {
        if self.line_delay >= 0.0 {
            self.row_time(timestamp, 0)
        } else {
            self.row_time(timestamp, self.last_row())
        }
    }

    /// Capture time of the row read last
    pub fn frame_end_time(&self, timestamp: f64) -> f64 {
        if self.line_delay >= 0.0 {
            self.row_time(timestamp, self.last_row())
        } else {
            self.row_time(timestamp, 0)
        }
    }
}
