//! InboundSource trait - sensor stream abstraction
//!
//! Decouples the ingestion adapters from whatever produces gyro samples and
//! camera frames (transport subscriber or mock generator).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{CameraFrame, ImuSample};

/// One inbound message, in arrival order
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Imu(ImuSample),
    Frame(CameraFrame),
}

impl InboundEvent {
    pub fn kind(&self) -> SourceKind {
        match self {
            InboundEvent::Imu(_) => SourceKind::Imu,
            InboundEvent::Frame(_) => SourceKind::Camera,
        }
    }

    /// Capture timestamp carried by the event (seconds)
    pub fn timestamp(&self) -> f64 {
        match self {
            InboundEvent::Imu(sample) => sample.timestamp,
            InboundEvent::Frame(frame) => frame.timestamp,
        }
    }
}

/// Stream kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Imu,
    Camera,
}

impl SourceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            SourceKind::Imu => "imu",
            SourceKind::Camera => "camera",
        }
    }
}

/// Data callback type
///
/// Uses `Arc` so the callback can be shared with a producer thread.
pub type InboundCallback = Arc<dyn Fn(InboundEvent) + Send + Sync>;

/// Inbound data source
///
/// Mock and transport-backed sources use the same callback API.
pub trait InboundSource: Send + Sync {
    /// Source ID
    fn source_id(&self) -> &str;

    fn kind(&self) -> SourceKind;

    /// Register data callback
    ///
    /// Repeated calls while already listening are ignored.
    fn listen(&self, callback: InboundCallback);

    /// Stop producing data
    fn stop(&self);

    fn is_listening(&self) -> bool;
}
