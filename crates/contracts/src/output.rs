//! StabilizedFrame - scheduler output, plus per-tick diagnostics.

use serde::{Deserialize, Serialize};

use crate::{ImageData, OrientationUpdate, Quaternion};

/// Dewarped frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilizedFrame {
    /// Sequence number (monotonically increasing over accepted frames)
    pub frame_id: u64,

    /// Reference timestamp of the source frame (seconds)
    pub timestamp: f64,

    /// Warped image
    pub image: ImageData,

    /// Stabilization metadata
    pub meta: StabilizationMeta,
}

/// Stabilization metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StabilizationMeta {
    /// Capture time of the earliest row
    pub frame_begin: f64,

    /// Capture time of the latest row
    pub frame_end: f64,

    /// Rows in the rotation buffer
    pub rows: u32,

    /// Kernel that produced the image
    pub kernel: String,

    /// Rows whose orientation lookup fell outside the history
    pub row_timing_errors: u32,

    /// Correction applied at the middle row
    pub center_correction: Quaternion,

    /// Angle of the middle-row correction (radians)
    pub correction_angle: f64,
}

/// Message fanned out by the dispatcher
#[derive(Debug, Clone)]
pub enum StabilizerOutput {
    Frame(StabilizedFrame),
    Orientation(OrientationUpdate),
}

impl StabilizerOutput {
    /// Timestamp of the frame or of the orientation sample
    pub fn timestamp(&self) -> f64 {
        match self {
            StabilizerOutput::Frame(frame) => frame.timestamp,
            StabilizerOutput::Orientation(update) => update.raw.timestamp,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StabilizerOutput::Frame(_) => "frame",
            StabilizerOutput::Orientation(_) => "orientation",
        }
    }
}

/// Counters for one scheduler tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickStats {
    pub frames_stabilized: u32,
    pub frames_discarded: u32,
    pub kernel_failures: u32,
    pub row_timing_errors: u32,

    /// Tick ended with a frame waiting for orientation data
    pub waiting: bool,
}

impl TickStats {
    pub fn merge(&mut self, other: &TickStats) {
        self.frames_stabilized += other.frames_stabilized;
        self.frames_discarded += other.frames_discarded;
        self.kernel_failures += other.kernel_failures;
        self.row_timing_errors += other.row_timing_errors;
        self.waiting = other.waiting;
    }
}

/// Buffer occupancy snapshot (for diagnostics)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferStats {
    pub raw_history_len: usize,
    pub filtered_history_len: usize,
    pub frame_queue_len: usize,

    /// Entries evicted by capacity limits since start
    pub history_dropped: u64,
    pub frames_dropped: u64,

    /// Stream resets since start
    pub imu_resets: u64,
    pub frame_resets: u64,
}
