//! Pipeline orchestrator - coordinates all components.
//!
//! Mock sources feed one inbound channel; a fixed-rate loop drains it into
//! the stabilizer, runs one scheduler tick and forwards outputs to the
//! dispatcher.

use std::future::Future;
use std::time::{Duration, Instant};

use contracts::{DewarpKernel, InboundEvent, StabilizerBlueprint, StabilizerOutput};
use dispatcher::create_dispatcher;
use ingestion::IngestionPipeline;
use stabilizer::Stabilizer;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::PipelineStats;
use crate::error::{CliError, Result};

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated configuration
    pub blueprint: StabilizerBlueprint,

    /// Stop after this many stabilized frames (None = unlimited)
    pub max_frames: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Scheduler -> dispatcher channel size
    pub buffer_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Stabilizer plus kernel, driven one event / one tick at a time
pub struct StabilizationLoop {
    stabilizer: Stabilizer,
    kernel: Box<dyn DewarpKernel>,
    imu_source: String,
    camera_source: String,
    stats: PipelineStats,
}

impl StabilizationLoop {
    pub fn new(blueprint: &StabilizerBlueprint) -> Self {
        Self {
            stabilizer: Stabilizer::new(blueprint.to_stabilizer_config()),
            kernel: dewarp::create_kernel(blueprint.kernel.kind),
            imu_source: blueprint.sources.imu.id.clone(),
            camera_source: blueprint.sources.camera.id.clone(),
            stats: PipelineStats {
                active_sinks: blueprint.sinks.len(),
                ..Default::default()
            },
        }
    }

    /// Feed one inbound event; returns the orientation update to publish
    pub fn handle_event(&mut self, event: InboundEvent) -> Option<StabilizerOutput> {
        match event {
            InboundEvent::Imu(sample) => {
                observability::record_event_received(&self.imu_source, "imu");
                let update = self.stabilizer.on_imu(&sample)?;
                self.stats.orientation_updates += 1;
                Some(StabilizerOutput::Orientation(update))
            }
            InboundEvent::Frame(frame) => {
                observability::record_event_received(&self.camera_source, "camera");
                if self.stabilizer.on_frame(frame).is_err() {
                    self.stats.frames_rejected += 1;
                }
                None
            }
        }
    }

    /// Run one scheduler tick; returns the stabilized frames to publish
    pub fn tick(&mut self) -> Vec<StabilizerOutput> {
        let report = self.stabilizer.tick(self.kernel.as_mut());

        self.stats.ticks += 1;
        self.stats.frames_discarded += report.stats.frames_discarded as u64;
        self.stats.stabilizer_metrics.record_tick(&report.stats);

        report
            .stabilized
            .into_iter()
            .map(|frame| {
                self.stats.frames_stabilized += 1;
                self.stats.stabilizer_metrics.update(&frame.meta);
                StabilizerOutput::Frame(frame)
            })
            .collect()
    }

    pub fn stabilizer(&self) -> &Stabilizer {
        &self.stabilizer
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn into_stats(self) -> PipelineStats {
        self.stats
    }
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline until max frames, timeout or `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<PipelineStats>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Ingestion
        let mut ingestion = IngestionPipeline::with_mock_sources(&blueprint.sources, start_time)?;
        let inbound = ingestion
            .take_receiver()
            .ok_or_else(|| anyhow::anyhow!("ingestion receiver already taken"))?;

        info!(
            imu = %blueprint.sources.imu.id,
            imu_hz = blueprint.sources.imu.frequency_hz,
            camera = %blueprint.sources.camera.id,
            camera_hz = blueprint.sources.camera.frequency_hz,
            "Ingestion pipeline configured"
        );

        // Dispatcher
        let (out_tx, out_rx) = mpsc::channel::<StabilizerOutput>(self.config.buffer_size.max(1));
        if blueprint.sinks.is_empty() {
            warn!("No sinks configured - stabilized frames will be dropped");
        }
        let dispatcher = create_dispatcher(blueprint.sinks.clone(), out_rx).await?;
        let dispatcher_handle = dispatcher.spawn();
        info!(active_sinks = blueprint.sinks.len(), "Dispatcher started");

        // Scheduler
        let mut core = StabilizationLoop::new(blueprint);
        let tick_period = Duration::from_secs_f64(blueprint.tick_period_secs());
        let mut ticker = tokio::time::interval(tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let publish_statistics = blueprint.scheduler.publish_statistics;
        let mut statistics = tokio::time::interval(Duration::from_millis(
            blueprint.scheduler.statistics_interval_ms.max(1),
        ));

        let timeout = self.config.timeout;
        let deadline = async move {
            match timeout {
                Some(t) => tokio::time::sleep(t).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);
        tokio::pin!(shutdown);

        let max_frames = self.config.max_frames;
        info!(
            max_frames = ?max_frames,
            tick_hz = blueprint.scheduler.tick_hz,
            kernel = ?blueprint.kernel.kind,
            line_delay = blueprint.camera.line_delay_s,
            "Pipeline running"
        );

        ingestion.start_all();

        'run: loop {
            tokio::select! {
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping pipeline...");
                    break 'run;
                }
                _ = &mut deadline => {
                    warn!(timeout_secs = ?timeout.map(|t| t.as_secs_f64()), "Pipeline timed out");
                    break 'run;
                }
                _ = statistics.tick(), if publish_statistics => {
                    let buffers = core.stabilizer().buffer_stats();
                    observability::record_buffer_stats(&buffers);
                    info!(
                        raw_history = buffers.raw_history_len,
                        filtered_history = buffers.filtered_history_len,
                        queued_frames = buffers.frame_queue_len,
                        history_dropped = buffers.history_dropped,
                        frames_dropped = buffers.frames_dropped,
                        "Buffer statistics"
                    );
                }
                _ = ticker.tick() => {
                    let mut outputs = Vec::new();
                    while let Ok(event) = inbound.try_recv() {
                        outputs.extend(core.handle_event(event));
                    }
                    outputs.extend(core.tick());

                    for output in outputs {
                        if out_tx.send(output).await.is_err() {
                            warn!("Dispatcher channel closed");
                            break 'run;
                        }
                    }

                    if let Some(max) = max_frames {
                        if core.stats().frames_stabilized >= max {
                            info!(frames = core.stats().frames_stabilized, "Reached max frames limit");
                            break 'run;
                        }
                    }
                }
            }
        }

        // Shutdown
        info!("Shutting down pipeline...");
        ingestion.stop_all();
        let ingestion_snapshot = ingestion.metrics().snapshot();
        debug!(pending = inbound.len(), "Inbound events left unprocessed");

        drop(out_tx);
        if tokio::time::timeout(Duration::from_secs(5), dispatcher_handle)
            .await
            .is_err()
        {
            return Err(CliError::shutdown("dispatcher did not drain within 5s"));
        }

        let mut stats = core.into_stats();
        stats.ingestion = ingestion_snapshot;
        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            fps = format!("{:.2}", stats.fps()),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{SinkConfig, SinkType};

    fn blueprint() -> StabilizerBlueprint {
        let mut blueprint: StabilizerBlueprint = serde_json::from_str(
            r#"{ "camera": { "line_delay_s": 0.0001 } }"#,
        )
        .unwrap();
        blueprint.sources.imu.frequency_hz = 400.0;
        blueprint.sources.camera.frequency_hz = 50.0;
        blueprint.sources.camera.width = 32;
        blueprint.sources.camera.height = 16;
        blueprint.scheduler.tick_hz = 200.0;
        blueprint.scheduler.publish_statistics = true;
        blueprint.scheduler.statistics_interval_ms = 20;
        blueprint
    }

    #[tokio::test]
    async fn test_pipeline_stops_at_max_frames() {
        let mut blueprint = blueprint();
        blueprint.sinks = vec![SinkConfig {
            name: "log".into(),
            sink_type: SinkType::Log,
            queue_capacity: 64,
            params: Default::default(),
        }];

        let pipeline = Pipeline::new(PipelineConfig {
            blueprint,
            max_frames: Some(3),
            timeout: Some(Duration::from_secs(10)),
            buffer_size: 64,
            metrics_port: None,
        });

        let stats = pipeline.run(std::future::pending()).await.unwrap();
        assert!(stats.frames_stabilized >= 3);
        assert!(stats.orientation_updates > 0);
        assert!(stats.ingestion.imu_received > 0);
        assert_eq!(stats.frames_rejected, 0);
    }

    #[tokio::test]
    async fn test_pipeline_stops_on_shutdown() {
        let pipeline = Pipeline::new(PipelineConfig {
            blueprint: blueprint(),
            max_frames: None,
            timeout: None,
            buffer_size: 16,
            metrics_port: None,
        });

        let shutdown = tokio::time::sleep(Duration::from_millis(100));
        let stats = pipeline.run(shutdown).await.unwrap();
        assert!(stats.ticks > 0);
        assert!(stats.duration >= Duration::from_millis(50));
    }
}
