//! Stabilizer context: owns all core state and runs the scheduler tick.

use contracts::{
    BufferStats, CameraFrame, CameraGeometry, ContractError, DewarpKernel, DewarpRequest,
    ImuSample, OrientationUpdate, RowRotations, StabilizationMeta, StabilizedFrame,
    StabilizerConfig, TickStats,
};
use nalgebra::UnitQuaternion;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::frame_queue::{FrameQueue, PushOutcome};
use crate::history::{LookupStatus, TimeIndexedHistory};
use crate::shutter::RollingShutterModel;
use crate::tracker::{OrientationTracker, TrackerEvent};

type OrientationHistory = TimeIndexedHistory<UnitQuaternion<f64>>;

/// Side effects of one tick
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub stats: TickStats,
    pub stabilized: Vec<StabilizedFrame>,
}

/// Per-row rotations for one frame
struct RowCorrections {
    rotations: RowRotations,
    timing_errors: u32,
    center: UnitQuaternion<f64>,
}

/// Rolling-shutter stabilizer
///
/// Gyro samples feed the tracker and the raw/filtered histories; camera frames
/// wait in a bounded queue until both histories cover their readout span.
/// Everything runs on the caller's task, nothing here blocks.
#[derive(Debug)]
pub struct Stabilizer {
    config: StabilizerConfig,
    tracker: OrientationTracker,
    raw_history: OrientationHistory,
    filtered_history: OrientationHistory,
    frames: FrameQueue,
    /// Fixed by the first valid calibration
    geometry: Option<CameraGeometry>,
    frame_counter: u64,
    imu_resets: u64,
}

impl Stabilizer {
    pub fn new(config: StabilizerConfig) -> Self {
        Self {
            tracker: OrientationTracker::new(config.decay),
            raw_history: TimeIndexedHistory::with_capacity(config.history_capacity),
            filtered_history: TimeIndexedHistory::with_capacity(config.history_capacity),
            frames: FrameQueue::new(config.max_queued_frames),
            geometry: None,
            frame_counter: 0,
            imu_resets: 0,
            config,
        }
    }

    /// Feed one gyro sample
    ///
    /// Returns the raw/filtered pair when the sample was integrated.
    #[instrument(
        level = "trace",
        name = "stabilizer_on_imu",
        skip(self, sample),
        fields(timestamp = sample.timestamp)
    )]
    pub fn on_imu(&mut self, sample: &ImuSample) -> Option<OrientationUpdate> {
        match self
            .tracker
            .on_sample(sample.timestamp, &sample.angular_velocity.into())
        {
            TrackerEvent::Orientation(update) => {
                self.record_orientation(&update);
                Some(update)
            }
            TrackerEvent::Discontinuity { .. } => {
                self.raw_history.clear();
                self.filtered_history.clear();
                self.imu_resets += 1;
                observability::record_stream_reset("imu");
                None
            }
            TrackerEvent::Rejected => {
                observability::record_sample_rejected("imu");
                None
            }
            TrackerEvent::Initialized => None,
        }
    }

    fn record_orientation(&mut self, update: &OrientationUpdate) {
        // capacity eviction must not strand the frame waiting at the head of the queue
        let retain_from = self.pending_frame_begin();
        self.raw_history.set_retain_from(retain_from);
        self.filtered_history.set_retain_from(retain_from);

        let raw = self
            .raw_history
            .push_back(update.raw.timestamp, update.raw.orientation.into());
        let filtered = self
            .filtered_history
            .push_back(update.filtered.timestamp, update.filtered.orientation.into());
        if let Err(e) = raw.and(filtered) {
            warn!(error = %e, "orientation sample dropped from history");
        }
    }

    /// Readout start of the oldest queued frame
    fn pending_frame_begin(&self) -> Option<f64> {
        let geometry = self.geometry.as_ref()?;
        let frame = self.frames.front()?;
        Some(RollingShutterModel::from_geometry(geometry).frame_begin_time(frame.timestamp))
    }

    /// Queue one camera frame
    ///
    /// The first valid frame fixes the camera geometry for the session.
    ///
    /// # Errors
    /// Invalid frames are dropped without touching any state.
    #[instrument(
        level = "trace",
        name = "stabilizer_on_frame",
        skip(self, frame),
        fields(timestamp = frame.timestamp)
    )]
    pub fn on_frame(&mut self, frame: CameraFrame) -> Result<PushOutcome, ContractError> {
        if let Err(e) = self.check_frame(&frame) {
            warn!(timestamp = frame.timestamp, error = %e, "camera frame dropped");
            observability::record_sample_rejected("camera");
            return Err(e);
        }

        let outcome = self.frames.push(frame);
        match outcome {
            PushOutcome::Reset { cleared, previous } => {
                warn!(previous, cleared, "camera timestamp jumped backwards, frame queue cleared");
                observability::record_stream_reset("camera");
            }
            PushOutcome::DroppedOldest { timestamp } => {
                warn!(
                    dropped = timestamp,
                    capacity = self.frames.capacity(),
                    "frame queue full, oldest frame dropped"
                );
            }
            PushOutcome::Queued => {}
        }
        Ok(outcome)
    }

    fn check_frame(&mut self, frame: &CameraFrame) -> Result<(), ContractError> {
        if !frame.timestamp.is_finite() {
            return Err(ContractError::invalid_image(format!(
                "frame timestamp {} is not finite",
                frame.timestamp
            )));
        }
        frame.image.validate()?;

        let (geometry, first) = match self.geometry {
            Some(geometry) => (geometry, false),
            None => (
                CameraGeometry::from_calibration(&frame.calibration, self.config.line_delay)?,
                true,
            ),
        };

        if frame.image.height != geometry.height || frame.image.width != geometry.width {
            return Err(ContractError::invalid_image(format!(
                "image is {}x{}, calibrated size is {}x{}",
                frame.image.width, frame.image.height, geometry.width, geometry.height
            )));
        }

        if first {
            info!(
                width = geometry.width,
                height = geometry.height,
                line_delay = geometry.line_delay,
                fx = geometry.intrinsics.fx,
                fy = geometry.intrinsics.fy,
                "camera calibration accepted"
            );
            self.geometry = Some(geometry);
        }
        Ok(())
    }

    /// Run one scheduler step over every ready frame
    ///
    /// Stale frames are discarded, the first frame whose readout is not yet
    /// covered by orientation data ends the tick.
    #[instrument(
        level = "debug",
        name = "stabilizer_tick",
        skip(self, kernel),
        fields(kernel = kernel.name())
    )]
    pub fn tick<K: DewarpKernel + ?Sized>(&mut self, kernel: &mut K) -> TickReport {
        let mut report = TickReport::default();

        let Some(geometry) = self.geometry else {
            return report;
        };
        let shutter = RollingShutterModel::from_geometry(&geometry);

        while let Some(timestamp) = self.frames.front().map(|frame| frame.timestamp) {
            if self.raw_history.is_empty() || self.filtered_history.is_empty() {
                debug!(timestamp, "waiting for orientation data");
                report.stats.waiting = true;
                break;
            }

            let begin = shutter.frame_begin_time(timestamp);
            if self.is_before_history(begin) {
                warn!(
                    timestamp,
                    frame_begin = begin,
                    history_front = ?self.raw_history.front().map(|(t, _)| t),
                    "frame older than orientation history, discarded"
                );
                self.frames.pop_front();
                report.stats.frames_discarded += 1;
                continue;
            }

            let end = shutter.frame_end_time(timestamp);
            if self.is_after_history(end) {
                debug!(
                    timestamp,
                    frame_end = end,
                    history_back = ?self.raw_history.back().map(|(t, _)| t),
                    "waiting for orientation data"
                );
                report.stats.waiting = true;
                break;
            }

            let Some(frame) = self.frames.pop_front() else {
                break;
            };
            self.process_frame(frame, &geometry, &shutter, kernel, &mut report);
        }

        observability::record_frame_discarded(report.stats.frames_discarded);
        report
    }

    fn is_before_history(&self, t: f64) -> bool {
        self.raw_history.get(t).status == LookupStatus::EarlierThanFront
            || self.filtered_history.get(t).status == LookupStatus::EarlierThanFront
    }

    fn is_after_history(&self, t: f64) -> bool {
        self.raw_history.get(t).status == LookupStatus::LaterThanBack
            || self.filtered_history.get(t).status == LookupStatus::LaterThanBack
    }

    fn process_frame<K: DewarpKernel + ?Sized>(
        &mut self,
        frame: CameraFrame,
        geometry: &CameraGeometry,
        shutter: &RollingShutterModel,
        kernel: &mut K,
        report: &mut TickReport,
    ) {
        let corrections = self.row_corrections(frame.timestamp, shutter);
        report.stats.row_timing_errors += corrections.timing_errors;

        let frame_begin = shutter.frame_begin_time(frame.timestamp);
        let frame_end = shutter.frame_end_time(frame.timestamp);
        let raw_removed = self.raw_history.discard_before(frame_end);
        let filtered_removed = self.filtered_history.discard_before(frame_end);
        trace!(raw_removed, filtered_removed, "orientation history trimmed");

        let request = DewarpRequest {
            source: &frame.image,
            rotations: &corrections.rotations,
            zoom: self.config.zoom,
            distortion: geometry.distortion,
            intrinsics: geometry.intrinsics,
        };

        match kernel.dewarp(&request) {
            Ok(image) => {
                let frame_id = self.frame_counter;
                self.frame_counter += 1;

                let meta = StabilizationMeta {
                    frame_begin,
                    frame_end,
                    rows: corrections.rotations.rows(),
                    kernel: kernel.name().to_string(),
                    row_timing_errors: corrections.timing_errors,
                    center_correction: corrections.center.into(),
                    correction_angle: corrections.center.angle(),
                };
                observability::record_frame_stabilized(&meta, frame_id);
                debug!(
                    frame_id,
                    timestamp = frame.timestamp,
                    correction_deg = meta.correction_angle.to_degrees(),
                    "frame stabilized"
                );

                report.stats.frames_stabilized += 1;
                report.stabilized.push(StabilizedFrame {
                    frame_id,
                    timestamp: frame.timestamp,
                    image,
                    meta,
                });
            }
            Err(e) => {
                error!(
                    kernel = kernel.name(),
                    timestamp = frame.timestamp,
                    error = %e,
                    "dewarp kernel failed, frame dropped"
                );
                observability::record_kernel_failure(kernel.name());
                report.stats.kernel_failures += 1;
            }
        }
    }

    /// `R[row] = raw(row) * conj(filtered(row))` at each row's capture time
    fn row_corrections(&self, timestamp: f64, shutter: &RollingShutterModel) -> RowCorrections {
        let height = shutter.height();
        let middle = height / 2;
        let mut rotations = RowRotations::identity(height);
        let mut timing_errors = 0u32;
        let mut center = UnitQuaternion::identity();

        for row in 0..height {
            let t = shutter.row_time(timestamp, row);
            let raw = self.raw_history.get(t);
            let filtered = self.filtered_history.get(t);
            if !raw.is_good() || !filtered.is_good() {
                timing_errors += 1;
            }

            let (Some(raw), Some(filtered)) = (raw.value, filtered.value) else {
                continue;
            };
            let mut correction = raw * filtered.conjugate();
            correction.renormalize();

            let matrix = correction.to_rotation_matrix().into_inner().cast::<f32>();
            rotations.set(row, &matrix);
            if row == middle {
                center = correction;
            }
        }

        if timing_errors > 0 {
            warn!(
                timestamp,
                rows = timing_errors,
                "row timing inconsistency, using nearest orientation"
            );
        }

        RowCorrections {
            rotations,
            timing_errors,
            center,
        }
    }

    /// Buffer occupancy snapshot
    pub fn buffer_stats(&self) -> BufferStats {
        BufferStats {
            raw_history_len: self.raw_history.len(),
            filtered_history_len: self.filtered_history.len(),
            frame_queue_len: self.frames.len(),
            history_dropped: self.raw_history.dropped_count()
                + self.filtered_history.dropped_count(),
            frames_dropped: self.frames.dropped_count(),
            imu_resets: self.imu_resets,
            frame_resets: self.frames.reset_count(),
        }
    }

    pub fn geometry(&self) -> Option<&CameraGeometry> {
        self.geometry.as_ref()
    }

    pub fn tracker(&self) -> &OrientationTracker {
        &self.tracker
    }

    pub fn raw_history(&self) -> &OrientationHistory {
        &self.raw_history
    }

    pub fn filtered_history(&self) -> &OrientationHistory {
        &self.filtered_history
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    /// Frames handed out so far
    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    pub fn config(&self) -> &StabilizerConfig {
        &self.config
    }
}
