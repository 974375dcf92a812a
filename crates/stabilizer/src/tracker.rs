//! Orientation tracker
//!
//! Integrates gyro samples into a drifting raw orientation and follows it with
//! a leaky filter. The filter works on the rotation-vector error between raw
//! and filtered, shrinking it by `decay` once per sample, so intentional slow
//! motion passes through while shake is cancelled.

use contracts::{OrientationSample, OrientationUpdate};
use nalgebra::{UnitQuaternion, Vector3};
use tracing::{instrument, warn};

use crate::rotation::{to_quaternion, to_vector_continuous};

/// Default per-sample error decay
pub const DEFAULT_DECAY: f64 = 0.995;

/// Result of feeding one sample
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    /// First sample after start or reset, only its timestamp was recorded
    Initialized,

    /// Sample integrated
    Orientation(OrientationUpdate),

    /// Timestamp went backwards. Filter state was reset and the sample became
    /// the new reference.
    Discontinuity { previous: f64, timestamp: f64 },

    /// Non-finite input, ignored without touching state
    Rejected,
}

/// Raw/filtered orientation state
#[derive(Debug, Clone)]
pub struct OrientationTracker {
    raw: UnitQuaternion<f64>,
    filtered: UnitQuaternion<f64>,
    last_error: Vector3<f64>,
    previous_timestamp: Option<f64>,
    decay: f64,
}

impl Default for OrientationTracker {
    fn default() -> Self {
        Self::new(DEFAULT_DECAY)
    }
}

impl OrientationTracker {
    pub fn new(decay: f64) -> Self {
        Self {
            raw: UnitQuaternion::identity(),
            filtered: UnitQuaternion::identity(),
            last_error: Vector3::zeros(),
            previous_timestamp: None,
            decay,
        }
    }

    /// Feed one angular velocity sample (rad/s) captured at `timestamp` (s)
    #[instrument(level = "trace", name = "tracker_on_sample", skip(self, angular_velocity))]
    pub fn on_sample(&mut self, timestamp: f64, angular_velocity: &Vector3<f64>) -> TrackerEvent {
        if !timestamp.is_finite() || !angular_velocity.iter().all(|c| c.is_finite()) {
            warn!(timestamp, "angular velocity or timestamp is not finite, sample skipped");
            return TrackerEvent::Rejected;
        }

        let Some(previous) = self.previous_timestamp else {
            self.previous_timestamp = Some(timestamp);
            return TrackerEvent::Initialized;
        };

        if timestamp < previous {
            warn!(previous, timestamp, "gyro timestamp jumped backwards, resetting tracker");
            self.reset();
            self.previous_timestamp = Some(timestamp);
            return TrackerEvent::Discontinuity {
                previous,
                timestamp,
            };
        }

        let dt = timestamp - previous;
        let mut raw = self.raw * to_quaternion(&(angular_velocity * dt));
        raw.renormalize();

        let mut offset = raw.conjugate() * self.filtered;
        offset.renormalize();
        let error = match to_vector_continuous(offset.quaternion(), &self.last_error) {
            Ok(v) => v * self.decay,
            Err(e) => {
                warn!(timestamp, error = %e, "tracking error not representable, sample skipped");
                return TrackerEvent::Rejected;
            }
        };

        let mut filtered = raw * to_quaternion(&error);
        filtered.renormalize();

        self.raw = raw;
        self.filtered = filtered;
        self.last_error = error;
        self.previous_timestamp = Some(timestamp);

        TrackerEvent::Orientation(OrientationUpdate {
            raw: OrientationSample {
                timestamp,
                orientation: raw.into(),
            },
            filtered: OrientationSample {
                timestamp,
                orientation: filtered.into(),
            },
        })
    }

    /// Clear filter state and forget the previous timestamp
    pub fn reset(&mut self) {
        self.raw = UnitQuaternion::identity();
        self.filtered = UnitQuaternion::identity();
        self.last_error = Vector3::zeros();
        self.previous_timestamp = None;
    }

    pub fn raw(&self) -> &UnitQuaternion<f64> {
        &self.raw
    }

    pub fn filtered(&self) -> &UnitQuaternion<f64> {
        &self.filtered
    }

    /// Last decayed rotation-vector error
    pub fn last_error(&self) -> &Vector3<f64> {
        &self.last_error
    }

    pub fn previous_timestamp(&self) -> Option<f64> {
        self.previous_timestamp
    }

    pub fn decay(&self) -> f64 {
        self.decay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orientation(event: TrackerEvent) -> OrientationUpdate {
        match event {
            TrackerEvent::Orientation(update) => update,
            other => panic!("expected orientation, got {other:?}"),
        }
    }

    #[test]
    fn test_first_sample_only_records_timestamp() {
        let mut tracker = OrientationTracker::default();
        let event = tracker.on_sample(1.0, &Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(event, TrackerEvent::Initialized);
        assert_eq!(tracker.previous_timestamp(), Some(1.0));
        assert_eq!(*tracker.raw(), UnitQuaternion::identity());
    }

    #[test]
    fn test_integrates_constant_rate() {
        let mut tracker = OrientationTracker::default();
        let omega = Vector3::new(0.0, 0.0, 0.5);
        tracker.on_sample(0.0, &omega);
        for i in 1..=100 {
            tracker.on_sample(i as f64 * 0.01, &omega);
        }

        // 0.5 rad/s for 1 s
        assert!((tracker.raw().angle() - 0.5).abs() < 1e-9);
        assert!((tracker.raw().norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_filtered_lags_raw_and_converges() {
        let mut tracker = OrientationTracker::new(0.9);
        tracker.on_sample(0.0, &Vector3::zeros());

        // short burst then hold still
        let update = orientation(tracker.on_sample(0.1, &Vector3::new(1.0, 0.0, 0.0)));
        let raw: UnitQuaternion<f64> = update.raw.orientation.into();
        let filtered: UnitQuaternion<f64> = update.filtered.orientation.into();
        let lag = raw.angle_to(&filtered);
        assert!(lag > 0.05, "filtered should lag the jump, lag={lag}");

        for i in 2..200 {
            tracker.on_sample(i as f64 * 0.05, &Vector3::zeros());
        }
        assert!(tracker.raw().angle_to(tracker.filtered()) < 1e-6);
    }

    #[test]
    fn test_decay_one_keeps_filtered_fixed() {
        let mut tracker = OrientationTracker::new(1.0);
        tracker.on_sample(0.0, &Vector3::zeros());
        for i in 1..10 {
            tracker.on_sample(i as f64 * 0.01, &Vector3::new(0.0, 1.0, 0.0));
        }
        assert!(tracker.filtered().angle() < 1e-9);
    }

    #[test]
    fn test_rejects_non_finite_without_mutation() {
        let mut tracker = OrientationTracker::default();
        tracker.on_sample(0.0, &Vector3::zeros());
        tracker.on_sample(0.01, &Vector3::new(0.3, 0.0, 0.0));
        let before = tracker.clone();

        assert_eq!(
            tracker.on_sample(0.02, &Vector3::new(f64::NAN, 0.0, 0.0)),
            TrackerEvent::Rejected
        );
        assert_eq!(
            tracker.on_sample(f64::INFINITY, &Vector3::zeros()),
            TrackerEvent::Rejected
        );
        assert_eq!(tracker.raw(), before.raw());
        assert_eq!(tracker.previous_timestamp(), before.previous_timestamp());
    }

    #[test]
    fn test_backwards_timestamp_resets() {
        let mut tracker = OrientationTracker::default();
        tracker.on_sample(0.0, &Vector3::zeros());
        tracker.on_sample(1.0, &Vector3::new(0.1, 0.0, 0.0));
        tracker.on_sample(2.0, &Vector3::new(0.1, 0.0, 0.0));

        let event = tracker.on_sample(1.5, &Vector3::new(0.1, 0.0, 0.0));
        assert_eq!(
            event,
            TrackerEvent::Discontinuity {
                previous: 2.0,
                timestamp: 1.5
            }
        );
        assert_eq!(*tracker.raw(), UnitQuaternion::identity());
        assert_eq!(*tracker.last_error(), Vector3::zeros());
        assert_eq!(tracker.previous_timestamp(), Some(1.5));

        // next sample integrates from the new reference
        let update = orientation(tracker.on_sample(1.6, &Vector3::new(1.0, 0.0, 0.0)));
        assert_eq!(update.raw.timestamp, 1.6);
        assert!((tracker.raw().angle() - 0.1).abs() < 1e-9);
    }
}
