//! LogSink - logs frame and orientation summaries via tracing

use contracts::{ContractError, DataSink, OrientationUpdate, StabilizedFrame};
use tracing::{debug, info, instrument, trace};

/// Sink that logs output summaries for debugging
pub struct LogSink {
    name: String,
    frames: u64,
    orientations: u64,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frames: 0,
            orientations: 0,
        }
    }

    fn log_frame_summary(&self, frame: &StabilizedFrame) {
        let meta = &frame.meta;
        info!(
            sink = %self.name,
            frame_id = frame.frame_id,
            timestamp = frame.timestamp,
            begin = meta.frame_begin,
            end = meta.frame_end,
            rows = meta.rows,
            kernel = %meta.kernel,
            correction_deg = meta.correction_angle.to_degrees(),
            row_timing_errors = meta.row_timing_errors,
            "StabilizedFrame received"
        );
    }
}

impl DataSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, frame),
        fields(sink = %self.name, frame_id = frame.frame_id)
    )]
    async fn write(&mut self, frame: &StabilizedFrame) -> Result<(), ContractError> {
        self.frames += 1;
        self.log_frame_summary(frame);
        Ok(())
    }

    async fn write_orientation(
        &mut self,
        update: &OrientationUpdate,
    ) -> Result<(), ContractError> {
        self.orientations += 1;
        let (raw, filtered) = (&update.raw.orientation, &update.filtered.orientation);
        trace!(
            sink = %self.name,
            timestamp = update.raw.timestamp,
            raw = ?[raw.w, raw.x, raw.y, raw.z],
            filtered = ?[filtered.w, filtered.x, filtered.y, filtered.z],
            "orientation"
        );
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // Nothing to flush for log sink
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(
            sink = %self.name,
            frames = self.frames,
            orientations = self.orientations,
            "LogSink closed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::tests::{frame, orientation};
    use contracts::StabilizerOutput;

    #[tokio::test]
    async fn test_log_sink_write() {
        let mut sink = LogSink::new("test_log");
        let StabilizerOutput::Frame(f) = frame(1) else {
            unreachable!()
        };
        let StabilizerOutput::Orientation(o) = orientation(0.1) else {
            unreachable!()
        };

        assert!(sink.write(&f).await.is_ok());
        assert!(sink.write_orientation(&o).await.is_ok());
        assert_eq!(sink.frames, 1);
        assert_eq!(sink.orientations, 1);
    }

    #[tokio::test]
    async fn test_log_sink_name() {
        let sink = LogSink::new("my_logger");
        assert_eq!(sink.name(), "my_logger");
    }
}
