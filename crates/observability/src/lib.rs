//! # Observability
//!
//! 日志与指标初始化，以及稳像引擎的指标记录函数。
//!
//! - `tracing` 订阅器：JSON / Pretty / Compact 三种输出，`RUST_LOG` 优先
//! - Prometheus exporter：可选，端口由 `run --metrics-port` 给出
//! - `metrics` 模块：在调度循环中调用的 `record_*` 函数与内存聚合器
//!
//! ```ignore
//! observability::init_with_config(ObservabilityConfig {
//!     log_format: LogFormat::Compact,
//!     metrics_port: None,
//!     default_log_level: "info".into(),
//! })?;
//!
//! let report = stabilizer.tick(&mut kernel);
//! for frame in &report.stabilized {
//!     observability::record_frame_stabilized(&frame.meta, frame.frame_id);
//! }
//! ```

pub mod metrics;

use ::metrics::{describe_counter, describe_gauge, describe_histogram};
use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::Subscriber;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt, EnvFilter, Layer,
};

pub use crate::metrics::{
    record_buffer_stats, record_event_received, record_frame_discarded, record_frame_stabilized,
    record_kernel_failure, record_output_dispatched, record_sample_rejected, record_stream_reset,
    MetricsSummary, RunningStats, StabilizerMetricsAggregator, StatsSummary,
};

#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Prometheus 监听端口，`None` 不启动 exporter
    pub metrics_port: Option<u16>,
    /// `RUST_LOG` 未设置时使用
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Compact,
            metrics_port: None,
            default_log_level: "info".to_string(),
        }
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// 结构化，附带文件与行号
    Json,
    Pretty,
    /// 单行，适合终端
    #[default]
    Compact,
}

fn fmt_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    }
}

/// 初始化 tracing；`metrics_port` 有值时同时安装 Prometheus exporter
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer(config.log_format))
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::debug!(log_format = ?config.log_format, "Logging initialized");
    Ok(())
}

/// 仅安装 Prometheus exporter，tracing 需已初始化
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .with_context(|| format!("Failed to install Prometheus recorder on port {port}"))?;

    describe_stabilizer_metrics();
    tracing::info!(port, "Prometheus metrics endpoint initialized");
    Ok(())
}

/// 为 `record_*` 写出的指标注册 HELP 文本
fn describe_stabilizer_metrics() {
    describe_counter!(
        "vgimbal_frames_stabilized_total",
        "Frames warped and emitted, by kernel"
    );
    describe_counter!(
        "vgimbal_frames_discarded_total",
        "Frames whose readout began before the orientation history"
    );
    describe_counter!("vgimbal_kernel_failures_total", "Warp kernel errors");
    describe_counter!(
        "vgimbal_row_timing_errors_total",
        "Rows whose readout time fell outside the orientation history"
    );
    describe_counter!(
        "vgimbal_ingest_dropped_total",
        "Events dropped by ingestion backpressure"
    );
    describe_counter!(
        "vgimbal_stream_resets_total",
        "Backwards timestamp jumps, by stream"
    );
    describe_counter!(
        "vgimbal_samples_rejected_total",
        "Gyro or frame samples dropped as malformed"
    );
    describe_counter!("vgimbal_events_received_total", "Inbound source events");
    describe_counter!(
        "vgimbal_outputs_dispatched_total",
        "Sink writes, by sink and status"
    );
    describe_gauge!("vgimbal_last_frame_id", "Id of the last stabilized frame");
    describe_gauge!("vgimbal_history_len", "Orientation samples held, raw and filtered");
    describe_gauge!("vgimbal_frame_queue_len", "Frames waiting for gyro coverage");
    describe_histogram!(
        "vgimbal_correction_angle_deg",
        "Middle-row correction angle in degrees"
    );
    describe_histogram!(
        "vgimbal_frame_readout_ms",
        "Rolling shutter readout duration"
    );
}
