//! Output side of the pipeline: anything that consumes stabilized frames
//! and the orientation stream.

use crate::{ContractError, OrientationUpdate, StabilizedFrame};

/// Implemented by log and file sinks. Each sink runs on its own worker
/// task, so methods may block on I/O without stalling the scheduler.
///
/// `DataSink` is the `Send` variant generated by `trait_variant`.
#[trait_variant::make(DataSink: Send)]
pub trait LocalDataSink {
    /// Stable identifier used in logs and metric labels
    fn name(&self) -> &str;

    async fn write(&mut self, frame: &StabilizedFrame) -> Result<(), ContractError>;

    /// One raw/filtered pair per gyro sample
    async fn write_orientation(&mut self, update: &OrientationUpdate)
        -> Result<(), ContractError>;

    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Called once after the last write; flushes first where the sink buffers
    async fn close(&mut self) -> Result<(), ContractError>;
}
