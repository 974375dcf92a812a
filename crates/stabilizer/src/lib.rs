//! # Stabilizer
//!
//! 卷帘快门视频稳像核心。
//!
//! 负责：
//! - 陀螺仪积分与姿态跟踪滤波 (`OrientationTracker`)
//! - 按时间插值查询的姿态历史 (`TimeIndexedHistory`)
//! - 行曝光时间模型 (`RollingShutterModel`)
//! - 帧队列调度与逐行校正旋转 (`Stabilizer::tick`)
//!
//! ## 使用示例
//!
//! ```ignore
//! use stabilizer::Stabilizer;
//!
//! let mut stabilizer = Stabilizer::new(blueprint.to_stabilizer_config());
//!
//! // Feed inbound events as they arrive
//! stabilizer.on_imu(&sample);
//! stabilizer.on_frame(frame)?;
//!
//! // Drain ready frames once per tick
//! let report = stabilizer.tick(&mut kernel);
//! ```

mod engine;
mod error;
mod frame_queue;
mod history;
pub mod rotation;
mod shutter;
mod tracker;

pub use engine::{Stabilizer, TickReport};
pub use error::{CodecError, HistoryError};
pub use frame_queue::{FrameQueue, PushOutcome};
pub use history::{Interpolate, Lookup, LookupStatus, TimeIndexedHistory};
pub use shutter::RollingShutterModel;
pub use tracker::{OrientationTracker, TrackerEvent, DEFAULT_DECAY};

// Re-export contracts types
pub use contracts::{BufferStats, StabilizedFrame, StabilizerConfig, TickStats};
