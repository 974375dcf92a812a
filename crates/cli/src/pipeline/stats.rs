//! Pipeline statistics and metrics.

use std::time::Duration;

use ingestion::MetricsSnapshot as IngestionSnapshot;
use observability::StabilizerMetricsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Frames produced by the warp kernel
    pub frames_stabilized: u64,

    /// Frames discarded as too old for the orientation history
    pub frames_discarded: u64,

    /// Frames rejected on arrival (bad image / calibration)
    pub frames_rejected: u64,

    /// Orientation updates forwarded to sinks
    pub orientation_updates: u64,

    /// Scheduler ticks executed
    pub ticks: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Number of sinks that received data
    pub active_sinks: usize,

    /// Inbound counters at shutdown
    pub ingestion: IngestionSnapshot,

    /// Stabilizer metrics aggregator
    pub stabilizer_metrics: StabilizerMetricsAggregator,
}

impl PipelineStats {
    /// Stabilized frames per second
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.frames_stabilized as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Pipeline Statistics ===\n");

        println!("Overview");
        println!("  Duration: {:.2}s", self.duration.as_secs_f64());
        println!("  Ticks: {}", self.ticks);
        println!("  Frames stabilized: {}", self.frames_stabilized);
        println!("  Frames discarded: {}", self.frames_discarded);
        println!("  Frames rejected: {}", self.frames_rejected);
        println!("  Orientation updates: {}", self.orientation_updates);
        println!("  FPS: {:.2}", self.fps());
        println!("  Active sinks: {}", self.active_sinks);

        println!("\nIngestion");
        println!("  Gyro samples: {}", self.ingestion.imu_received);
        println!("  Camera frames: {}", self.ingestion.frames_received);
        println!("  Dropped (backpressure): {}", self.ingestion.events_dropped);

        println!("\n{}", self.stabilizer_metrics.summary());
    }
}
