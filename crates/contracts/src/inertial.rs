//! Inertial stream types - ingestion input and tracker output.

use nalgebra::{Quaternion as NaQuaternion, UnitQuaternion, Vector3 as NaVector3};
use serde::{Deserialize, Serialize};

/// 3D vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// True when every component is finite
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<Vector3> for NaVector3<f64> {
    fn from(v: Vector3) -> Self {
        NaVector3::new(v.x, v.y, v.z)
    }
}

impl From<NaVector3<f64>> for Vector3 {
    fn from(v: NaVector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// Orientation quaternion in (w, x, y, z) order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quaternion {
    pub const IDENTITY: Self = Self {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
}

impl From<Quaternion> for UnitQuaternion<f64> {
    fn from(q: Quaternion) -> Self {
        UnitQuaternion::from_quaternion(NaQuaternion::new(q.w, q.x, q.y, q.z))
    }
}

impl From<UnitQuaternion<f64>> for Quaternion {
    fn from(q: UnitQuaternion<f64>) -> Self {
        Self {
            w: q.w,
            x: q.i,
            y: q.j,
            z: q.k,
        }
    }
}

/// Angular velocity sample from the gyro
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ImuSample {
    /// Capture timestamp (seconds)
    pub timestamp: f64,

    /// Angular velocity (rad/s), camera frame
    pub angular_velocity: Vector3,

    /// Optional sequence number (diagnostics only)
    pub seq: Option<u64>,
}

/// Orientation at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientationSample {
    pub timestamp: f64,
    pub orientation: Quaternion,
}

/// Pair of orientation events emitted once per integrated gyro sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientationUpdate {
    /// Integrated (drifting) orientation
    pub raw: OrientationSample,

    /// Low-pass tracked orientation
    pub filtered: OrientationSample,
}
