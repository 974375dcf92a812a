//! Stabilizer error types

use thiserror::Error;

/// Rotation codec errors
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CodecError {
    /// Scalar part above one: the quaternion was not normalized
    #[error("quaternion scalar part {w} exceeds 1, normalize before converting")]
    ScalarOutOfRange { w: f64 },

    #[error("quaternion has non-finite components")]
    NonFinite,
}

/// Time-indexed history errors
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum HistoryError {
    /// Timestamp precedes the newest stored entry
    #[error("timestamp {timestamp} precedes newest entry at {back}")]
    OutOfOrder { timestamp: f64, back: f64 },

    #[error("timestamp is not finite")]
    NonFiniteTimestamp,
}
