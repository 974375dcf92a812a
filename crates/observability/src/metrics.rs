//! Stabilizer 指标收集模块
//!
//! 基于 StabilizationMeta / TickStats 收集和统计稳像引擎的运行指标。

use contracts::{BufferStats, StabilizationMeta, TickStats};
use metrics::{counter, gauge, histogram};

/// 从 StabilizationMeta 记录指标
///
/// 每次产生 StabilizedFrame 时调用。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_frame_stabilized;
///
/// for frame in &report.stabilized {
///     record_frame_stabilized(&frame.meta, frame.frame_id);
/// }
/// ```
pub fn record_frame_stabilized(meta: &StabilizationMeta, frame_id: u64) {
    counter!("vgimbal_frames_stabilized_total", "kernel" => meta.kernel.clone()).increment(1);

    gauge!("vgimbal_last_frame_id").set(frame_id as f64);

    // 中间行校正角 (弧度 -> 度)
    histogram!("vgimbal_correction_angle_deg").record(meta.correction_angle.to_degrees());

    // 帧读出时长 (毫秒)
    histogram!("vgimbal_frame_readout_ms").record((meta.frame_end - meta.frame_begin) * 1000.0);

    if meta.row_timing_errors > 0 {
        counter!("vgimbal_row_timing_errors_total").increment(meta.row_timing_errors as u64);
    }
}

/// 记录过期帧丢弃
pub fn record_frame_discarded(count: u32) {
    if count > 0 {
        counter!("vgimbal_frames_discarded_total").increment(count as u64);
    }
}

/// 记录 kernel 失败
pub fn record_kernel_failure(kernel: &str) {
    counter!(
        "vgimbal_kernel_failures_total",
        "kernel" => kernel.to_string()
    )
    .increment(1);
}

/// 记录数据流重置 (时间戳回退)
pub fn record_stream_reset(stream: &str) {
    counter!(
        "vgimbal_stream_resets_total",
        "stream" => stream.to_string()
    )
    .increment(1);
}

/// 记录非法输入样本
pub fn record_sample_rejected(stream: &str) {
    counter!(
        "vgimbal_samples_rejected_total",
        "stream" => stream.to_string()
    )
    .increment(1);
}

/// 记录入站事件
pub fn record_event_received(source_id: &str, kind: &str) {
    counter!(
        "vgimbal_events_received_total",
        "source_id" => source_id.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// 记录输出分发
pub fn record_output_dispatched(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "vgimbal_outputs_dispatched_total",
        "sink" => sink_name.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录缓冲区占用
pub fn record_buffer_stats(stats: &BufferStats) {
    gauge!("vgimbal_history_len", "stream" => "raw").set(stats.raw_history_len as f64);
    gauge!("vgimbal_history_len", "stream" => "filtered").set(stats.filtered_history_len as f64);
    gauge!("vgimbal_frame_queue_len").set(stats.frame_queue_len as f64);
}

/// 稳像指标聚合器
///
/// 在内存中聚合指标，便于输出运行摘要。
#[derive(Debug, Clone, Default)]
pub struct StabilizerMetricsAggregator {
    /// 稳像帧数
    pub total_frames: u64,

    /// 过期丢弃帧数
    pub total_discarded: u64,

    /// kernel 失败次数
    pub kernel_failures: u64,

    /// 行时间不一致次数
    pub row_timing_errors: u64,

    /// 以等待结束的 tick 数
    pub waiting_ticks: u64,

    /// 校正角统计 (度)
    pub correction_stats: RunningStats,

    /// 读出时长统计 (毫秒)
    pub readout_stats: RunningStats,
}

impl StabilizerMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新单帧统计
    pub fn update(&mut self, meta: &StabilizationMeta) {
        self.total_frames += 1;
        self.correction_stats.push(meta.correction_angle.to_degrees());
        self.readout_stats
            .push((meta.frame_end - meta.frame_begin) * 1000.0);
    }

    /// 更新 tick 统计
    pub fn record_tick(&mut self, stats: &TickStats) {
        self.total_discarded += stats.frames_discarded as u64;
        self.kernel_failures += stats.kernel_failures as u64;
        self.row_timing_errors += stats.row_timing_errors as u64;
        if stats.waiting {
            self.waiting_ticks += 1;
        }
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let attempted = self.total_frames + self.total_discarded + self.kernel_failures;
        MetricsSummary {
            total_frames: self.total_frames,
            total_discarded: self.total_discarded,
            kernel_failures: self.kernel_failures,
            row_timing_errors: self.row_timing_errors,
            waiting_ticks: self.waiting_ticks,
            discard_rate: if attempted > 0 {
                self.total_discarded as f64 / attempted as f64 * 100.0
            } else {
                0.0
            },
            correction_deg: StatsSummary::from(&self.correction_stats),
            readout_ms: StatsSummary::from(&self.readout_stats),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub total_discarded: u64,
    pub kernel_failures: u64,
    pub row_timing_errors: u64,
    pub waiting_ticks: u64,
    pub discard_rate: f64,
    pub correction_deg: StatsSummary,
    pub readout_ms: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Stabilizer Metrics Summary ===")?;
        writeln!(f, "Stabilized frames: {}", self.total_frames)?;
        writeln!(
            f,
            "Discarded frames: {} ({:.2}%)",
            self.total_discarded, self.discard_rate
        )?;
        writeln!(f, "Kernel failures: {}", self.kernel_failures)?;
        writeln!(f, "Row timing errors: {}", self.row_timing_errors)?;
        writeln!(f, "Ticks spent waiting: {}", self.waiting_ticks)?;
        writeln!(f, "Correction angle (deg): {}", self.correction_deg)?;
        writeln!(f, "Readout span (ms): {}", self.readout_ms)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Quaternion;

    fn sample_meta(angle: f64) -> StabilizationMeta {
        StabilizationMeta {
            frame_begin: 9.8,
            frame_end: 10.1,
            rows: 4,
            kernel: "cpu".to_string(),
            row_timing_errors: 0,
            center_correction: Quaternion::IDENTITY,
            correction_angle: angle,
        }
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = StabilizerMetricsAggregator::new();

        aggregator.update(&sample_meta(std::f64::consts::PI / 180.0));
        aggregator.record_tick(&TickStats {
            frames_stabilized: 1,
            frames_discarded: 1,
            kernel_failures: 0,
            row_timing_errors: 2,
            waiting: true,
        });

        assert_eq!(aggregator.total_frames, 1);
        assert_eq!(aggregator.total_discarded, 1);
        assert_eq!(aggregator.row_timing_errors, 2);
        assert_eq!(aggregator.waiting_ticks, 1);
        assert!((aggregator.correction_stats.mean() - 1.0).abs() < 1e-9);
        assert!((aggregator.readout_stats.mean() - 300.0).abs() < 1e-6);

        let summary = aggregator.summary();
        assert!((summary.discard_rate - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_display() {
        let summary = MetricsSummary {
            total_frames: 100,
            total_discarded: 5,
            discard_rate: 5.0,
            correction_deg: StatsSummary {
                count: 100,
                min: 0.1,
                max: 3.0,
                mean: 1.2,
                std_dev: 0.4,
            },
            ..Default::default()
        };

        let output = format!("{}", summary);
        assert!(output.contains("Stabilized frames: 100"));
        assert!(output.contains("5.00%"));
        assert!(output.contains("Readout span (ms): N/A"));
    }
}
