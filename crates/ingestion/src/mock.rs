//! Mock 输入源
//!
//! 无真实传感器时使用：陀螺仪输出缓慢平移叠加正弦抖动，
//! 相机输出带标定信息的合成棋盘图。两者共享同一个采集时钟。

use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{
    CameraCalibration, CameraFrame, CameraSourceConfig, ImageData, ImageFormat, ImuSample,
    ImuSourceConfig, InboundCallback, InboundEvent, InboundSource, SourceKind, Vector3,
};
use tracing::{debug, trace};

use crate::adapters::common::pod_slice_to_bytes;
use crate::error::{IngestionError, Result};

/// Checker square size (pixels)
const CHECKER: u32 = 16;

fn check_frequency(source_id: &str, frequency_hz: f64) -> Result<Duration> {
    if !(frequency_hz.is_finite() && frequency_hz > 0.0) {
        return Err(IngestionError::InvalidSource {
            source_id: source_id.to_string(),
            message: format!("frequency must be > 0, got {frequency_hz}"),
        });
    }
    Ok(Duration::from_secs_f64(1.0 / frequency_hz))
}

/// Run `emit` at a fixed rate on a producer thread until `running` clears
fn spawn_producer<F>(source_id: String, interval: Duration, running: Arc<AtomicBool>, mut emit: F)
where
    F: FnMut(u64) + Send + 'static,
{
    std::thread::spawn(move || {
        debug!(source_id = %source_id, ?interval, "mock source started");
        let mut seq = 0u64;
        let mut next = Instant::now();
        while running.load(Ordering::Relaxed) {
            seq += 1;
            emit(seq);

            next += interval;
            let now = Instant::now();
            if next > now {
                std::thread::sleep(next - now);
            } else {
                next = now;
            }
        }
        debug!(source_id = %source_id, "mock source stopped");
    });
}

/// Angular velocity of the simulated rig at capture time `t`
///
/// A constant pan about y plus a shake on x and y.
pub fn angular_velocity(config: &ImuSourceConfig, t: f64) -> Vector3 {
    let phase = TAU * config.shake_frequency_hz * t;
    let amplitude = config.shake_amplitude_rad_s;
    Vector3::new(
        amplitude * phase.sin(),
        config.pan_rate_rad_s + 0.5 * amplitude * phase.cos(),
        0.0,
    )
}

/// Mock 陀螺仪
pub struct MockImuSource {
    config: ImuSourceConfig,
    epoch: Instant,
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl MockImuSource {
    /// 创建陀螺仪源，时间戳相对 `epoch` 计算
    pub fn new(config: ImuSourceConfig, epoch: Instant) -> Result<Self> {
        let interval = check_frequency(&config.id, config.frequency_hz)?;
        Ok(Self {
            config,
            epoch,
            interval,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Sample for capture time `t`
    pub fn sample_at(config: &ImuSourceConfig, t: f64, seq: u64) -> ImuSample {
        ImuSample {
            timestamp: t,
            angular_velocity: angular_velocity(config, t),
            seq: Some(seq),
        }
    }
}

impl InboundSource for MockImuSource {
    fn source_id(&self) -> &str {
        &self.config.id
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Imu
    }

    fn listen(&self, callback: InboundCallback) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let config = self.config.clone();
        let epoch = self.epoch;
        let latency = Duration::from_millis(config.latency_ms).as_secs_f64();

        spawn_producer(
            config.id.clone(),
            self.interval,
            self.running.clone(),
            move |seq| {
                // delivered `latency` after capture
                let t = epoch.elapsed().as_secs_f64() - latency;
                trace!(source_id = %config.id, seq, t, "mock gyro sample");
                callback(InboundEvent::Imu(Self::sample_at(&config, t, seq)));
            },
        );
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

/// Checkerboard whose phase advances with `seq`, RGB8
pub fn synthetic_image(width: u32, height: u32, seq: u64) -> ImageData {
    let shift = (seq % CHECKER as u64) as u32;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for v in 0..height {
        for u in 0..width {
            let dark = ((u + shift) / CHECKER + v / CHECKER) % 2 == 0;
            let base = if dark { 40u8 } else { 215u8 };
            let tint = (u * 255 / width.max(1)) as u8;
            pixels.push([base, base / 2 + tint / 2, base]);
        }
    }

    ImageData {
        width,
        height,
        format: ImageFormat::Rgb8,
        data: pod_slice_to_bytes(&pixels),
    }
}

/// Mock 相机
pub struct MockCameraSource {
    config: CameraSourceConfig,
    calibration: CameraCalibration,
    epoch: Instant,
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl MockCameraSource {
    /// 创建相机源，时间戳相对 `epoch` 计算
    pub fn new(config: CameraSourceConfig, epoch: Instant) -> Result<Self> {
        let interval = check_frequency(&config.id, config.frequency_hz)?;
        if config.width == 0 || config.height == 0 {
            return Err(IngestionError::InvalidSource {
                source_id: config.id.clone(),
                message: format!("image size {}x{} is empty", config.width, config.height),
            });
        }
        Ok(Self {
            calibration: config.calibration(),
            config,
            epoch,
            interval,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn calibration(&self) -> &CameraCalibration {
        &self.calibration
    }
}

impl InboundSource for MockCameraSource {
    fn source_id(&self) -> &str {
        &self.config.id
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Camera
    }

    fn listen(&self, callback: InboundCallback) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let source_id = self.config.id.clone();
        let (width, height) = (self.config.width, self.config.height);
        let calibration = self.calibration;
        let epoch = self.epoch;

        spawn_producer(
            source_id.clone(),
            self.interval,
            self.running.clone(),
            move |seq| {
                let timestamp = epoch.elapsed().as_secs_f64();
                trace!(source_id = %source_id, seq, timestamp, "mock camera frame");
                callback(InboundEvent::Frame(CameraFrame {
                    timestamp,
                    seq: Some(seq),
                    image: synthetic_image(width, height, seq),
                    calibration,
                }));
            },
        );
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}
