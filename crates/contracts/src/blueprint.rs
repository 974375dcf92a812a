//! StabilizerBlueprint - Config Loader 输出
//!
//! 描述完整的运行配置：相机、滤波器、调度、warp kernel、输入源、输出路由。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{CameraCalibration, DistortionCoeffs, Intrinsics};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的配置蓝图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilizerBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 相机 / 卷帘快门参数
    pub camera: CameraSettings,

    /// 跟踪滤波器参数
    #[serde(default)]
    pub filter: FilterSettings,

    /// 调度循环参数
    #[serde(default)]
    pub scheduler: SchedulerSettings,

    /// Warp kernel 选择
    #[serde(default)]
    pub kernel: KernelSettings,

    /// 输入源配置
    #[serde(default)]
    pub sources: SourcesConfig,

    /// 输出路由配置
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

/// 相机配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraSettings {
    /// 行延迟 (秒)，符号表示读出方向
    pub line_delay_s: f64,

    /// 输出缩放系数，必须 > 0
    #[serde(default = "default_zoom")]
    pub zoom: f64,

    /// 帧队列上限，满时丢弃最旧帧
    #[serde(default = "default_max_queued_frames")]
    pub max_queued_frames: usize,
}

fn default_zoom() -> f64 {
    1.0
}

fn default_max_queued_frames() -> usize {
    8
}

/// 滤波器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterSettings {
    /// 每个样本的误差衰减系数，取值 (0, 1]
    #[serde(default = "default_decay")]
    pub decay: f64,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            decay: default_decay(),
        }
    }
}

fn default_decay() -> f64 {
    0.995
}

/// 调度配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// 轮询频率 (Hz)
    #[serde(default = "default_tick_hz")]
    pub tick_hz: f64,

    /// 每条姿态历史的最大长度
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// 是否周期性发布缓冲区统计
    #[serde(default)]
    pub publish_statistics: bool,

    /// 统计发布间隔 (毫秒)
    #[serde(default = "default_statistics_interval_ms")]
    pub statistics_interval_ms: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
            history_capacity: default_history_capacity(),
            publish_statistics: false,
            statistics_interval_ms: default_statistics_interval_ms(),
        }
    }
}

fn default_tick_hz() -> f64 {
    120.0
}

fn default_history_capacity() -> usize {
    4096
}

fn default_statistics_interval_ms() -> u64 {
    1000
}

/// Kernel 配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KernelSettings {
    #[serde(default)]
    pub kind: KernelKind,
}

/// Kernel 类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelKind {
    /// CPU 参考实现
    #[default]
    Cpu,
    /// 原样输出
    Passthrough,
}

/// 输入源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// 入站通道容量
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// 丢包策略
    #[serde(default)]
    pub drop_policy: DropPolicy,

    #[serde(default)]
    pub imu: ImuSourceConfig,

    #[serde(default)]
    pub camera: CameraSourceConfig,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            drop_policy: DropPolicy::default(),
            imu: ImuSourceConfig::default(),
            camera: CameraSourceConfig::default(),
        }
    }
}

fn default_channel_capacity() -> usize {
    1024
}

/// 模拟陀螺仪配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImuSourceConfig {
    pub id: String,

    /// 采样频率 (Hz)，必须 > 0
    pub frequency_hz: f64,

    /// 有意的匀速平移 (rad/s，绕 y 轴)
    pub pan_rate_rad_s: f64,

    /// 抖动幅度 (rad/s)
    pub shake_amplitude_rad_s: f64,

    /// 抖动频率 (Hz)
    pub shake_frequency_hz: f64,

    /// 投递延迟 (毫秒)，样本时间戳早于投递时间
    pub latency_ms: u64,
}

impl Default for ImuSourceConfig {
    fn default() -> Self {
        Self {
            id: "gyro".to_string(),
            frequency_hz: 200.0,
            pan_rate_rad_s: 0.1,
            shake_amplitude_rad_s: 0.4,
            shake_frequency_hz: 3.0,
            latency_ms: 0,
        }
    }
}

/// 模拟相机配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSourceConfig {
    pub id: String,

    /// 帧率 (Hz)，必须 > 0
    pub frequency_hz: f64,

    pub width: u32,
    pub height: u32,

    /// 焦距 (像素)，缺省为图像宽度
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fx: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fy: Option<f64>,

    /// 主点，缺省为图像中心
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cx: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cy: Option<f64>,

    pub distortion: DistortionCoeffs,
}

impl Default for CameraSourceConfig {
    fn default() -> Self {
        Self {
            id: "camera".to_string(),
            frequency_hz: 30.0,
            width: 320,
            height: 240,
            fx: None,
            fy: None,
            cx: None,
            cy: None,
            distortion: DistortionCoeffs::default(),
        }
    }
}

impl CameraSourceConfig {
    /// Calibration message published with every mock frame
    pub fn calibration(&self) -> CameraCalibration {
        let width = self.width as f64;
        let height = self.height as f64;
        CameraCalibration {
            width: self.width,
            height: self.height,
            intrinsics: Intrinsics {
                fx: self.fx.unwrap_or(width),
                fy: self.fy.unwrap_or(width),
                cx: self.cx.unwrap_or(width / 2.0),
                cy: self.cy.unwrap_or(height / 2.0),
            },
            distortion: self.distortion,
        }
    }
}

/// 丢包策略 (背压满时)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPolicy {
    /// 丢弃最旧的包
    #[default]
    DropOldest,
    /// 丢弃最新的包
    DropNewest,
}

/// Sink 输出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink 名称
    pub name: String,

    /// Sink 类型
    pub sink_type: SinkType,

    /// 队列容量
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// 日志输出
    Log,
    /// 文件输出
    File,
}

/// Runtime settings for the stabilizer context
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilizerConfig {
    /// Signed line delay (seconds)
    pub line_delay: f64,
    pub zoom: f32,
    pub decay: f64,
    pub history_capacity: usize,
    pub max_queued_frames: usize,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            line_delay: 0.0,
            zoom: 1.0,
            decay: default_decay(),
            history_capacity: default_history_capacity(),
            max_queued_frames: default_max_queued_frames(),
        }
    }
}

impl StabilizerBlueprint {
    /// Build the stabilizer runtime settings
    pub fn to_stabilizer_config(&self) -> StabilizerConfig {
        StabilizerConfig {
            line_delay: self.camera.line_delay_s,
            zoom: self.camera.zoom as f32,
            decay: self.filter.decay,
            history_capacity: self.scheduler.history_capacity,
            max_queued_frames: self.camera.max_queued_frames,
        }
    }

    /// Scheduler tick period (seconds)
    pub fn tick_period_secs(&self) -> f64 {
        1.0 / self.scheduler.tick_hz
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stabilizer_config_from_blueprint() {
        let blueprint: StabilizerBlueprint = serde_json::from_str(
            r#"{
                "camera": { "line_delay_s": -0.00003, "zoom": 0.9 },
                "filter": { "decay": 0.99 },
                "sinks": []
            }"#,
        )
        .unwrap();

        let config = blueprint.to_stabilizer_config();
        assert_eq!(config.line_delay, -0.00003);
        assert_eq!(config.zoom, 0.9);
        assert_eq!(config.decay, 0.99);
        assert_eq!(config.history_capacity, 4096);
        assert_eq!(config.max_queued_frames, 8);
        assert_eq!(blueprint.kernel.kind, KernelKind::Cpu);
        assert!((blueprint.tick_period_secs() - 1.0 / 120.0).abs() < 1e-12);
    }

    #[test]
    fn mock_camera_calibration_defaults() {
        let camera = CameraSourceConfig {
            width: 640,
            height: 480,
            ..Default::default()
        };
        let calibration = camera.calibration();
        assert_eq!(calibration.intrinsics.fx, 640.0);
        assert_eq!(calibration.intrinsics.cx, 320.0);
        assert_eq!(calibration.intrinsics.cy, 240.0);
    }
}
