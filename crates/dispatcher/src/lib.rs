//! # Dispatcher
//!
//! 输出分发模块。
//!
//! 负责：
//! - 消费 `StabilizerOutput`（稳定帧与姿态事件）
//! - Fan-out 到多个 sinks
//! - 隔离慢 sink，不阻塞调度循环

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use contracts::{DataSink, StabilizerOutput};
pub use dispatcher::{create_dispatcher, Dispatcher};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{FileSink, FileSinkConfig, LogSink};
