//! Rotation codec: quaternion log map (to rotation vector) and exp map back.
//!
//! A rotation vector points along the rotation axis with length equal to the
//! angle in radians.

use std::f64::consts::TAU;

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use crate::CodecError;

/// Angle below which `to_quaternion` switches to the first-order expansion
pub const SMALL_ANGLE: f64 = 1e-4;

/// Imaginary part and its norm, after input checks
fn split(q: &Quaternion<f64>) -> Result<(Vector3<f64>, f64), CodecError> {
    if !(q.w.is_finite() && q.i.is_finite() && q.j.is_finite() && q.k.is_finite()) {
        return Err(CodecError::NonFinite);
    }
    if q.w - 1.0 > f64::EPSILON {
        return Err(CodecError::ScalarOutOfRange { w: q.w });
    }
    let imag = q.imag();
    let denom = imag.norm();
    Ok((imag, denom))
}

/// Log map
///
/// Returns the zero vector when the imaginary part vanishes.
pub fn to_vector(q: &Quaternion<f64>) -> Result<Vector3<f64>, CodecError> {
    let (imag, denom) = split(q)?;
    if denom < f64::EPSILON {
        return Ok(Vector3::zeros());
    }
    Ok(imag * (2.0 * denom.atan2(q.w) / denom))
}

/// Log map with the half angle unwrapped to the 2π branch nearest `previous`
///
/// Keeps a slowly varying rotation from jumping by a full turn between calls.
pub fn to_vector_continuous(
    q: &Quaternion<f64>,
    previous: &Vector3<f64>,
) -> Result<Vector3<f64>, CodecError> {
    let (imag, denom) = split(q)?;
    if denom < f64::EPSILON {
        return Ok(Vector3::zeros());
    }

    let mut half = denom.atan2(q.w);
    let previous_half = previous.norm() / 2.0;
    let turns = ((half - previous_half) / TAU + 0.5).floor();
    if turns != 0.0 {
        tracing::trace!(turns, "unwrapping rotation vector");
    }
    half -= TAU * turns;

    Ok(imag * (2.0 * half / denom))
}

/// Exp map, always returns a normalized quaternion
pub fn to_quaternion(v: &Vector3<f64>) -> UnitQuaternion<f64> {
    let theta = v.norm();
    let q = if theta > SMALL_ANGLE {
        let half = theta * 0.5;
        let n = v * (half.sin() / theta);
        Quaternion::new(half.cos(), n.x, n.y, n.z)
    } else {
        Quaternion::new(1.0, 0.5 * v.x, 0.5 * v.y, 0.5 * v.z)
    };
    UnitQuaternion::from_quaternion(q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::f64::consts::PI;

    fn same_rotation(a: &UnitQuaternion<f64>, b: &UnitQuaternion<f64>) -> bool {
        (a.coords.dot(&b.coords).abs() - 1.0).abs() < 1e-9
    }

    #[test]
    fn test_identity_maps_to_zero() {
        let v = to_vector(UnitQuaternion::identity().quaternion()).unwrap();
        assert_eq!(v, Vector3::zeros());
    }

    #[test]
    fn test_known_rotation() {
        let q = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), PI / 2.0);
        let v = to_vector(q.quaternion()).unwrap();
        assert!((v - Vector3::new(0.0, 0.0, PI / 2.0)).norm() < 1e-12);
    }

    #[test]
    fn test_rejects_unnormalized_scalar() {
        let q = Quaternion::new(1.5, 0.0, 0.0, 0.0);
        assert_eq!(
            to_vector(&q),
            Err(CodecError::ScalarOutOfRange { w: 1.5 })
        );

        let nan = Quaternion::new(f64::NAN, 0.0, 0.0, 0.0);
        assert_eq!(to_vector(&nan), Err(CodecError::NonFinite));
    }

    #[test]
    fn test_small_angle_branch_is_normalized() {
        let v = Vector3::new(1e-5, -2e-5, 3e-6);
        let q = to_quaternion(&v);
        assert!((q.norm() - 1.0).abs() < 1e-15);
        assert!((to_vector(q.quaternion()).unwrap() - v).norm() < 1e-12);

        assert_eq!(to_quaternion(&Vector3::zeros()), UnitQuaternion::identity());
    }

    #[test]
    fn test_random_round_trip() {
        let mut rng = rand::rng();
        for _ in 0..500 {
            let axis = Vector3::new(
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
            );
            if axis.norm() < 1e-3 {
                continue;
            }
            let angle = rng.random_range(0.0..PI - 1e-6);
            let q = UnitQuaternion::from_scaled_axis(axis.normalize() * angle);

            let back = to_quaternion(&to_vector(q.quaternion()).unwrap());
            assert!(same_rotation(&q, &back), "angle {angle} failed");
        }
    }

    #[test]
    fn test_continuous_magnitude_has_no_jumps() {
        let mut previous = Vector3::zeros();
        let mut angle: f64 = 0.0;
        while angle < 3.0 * PI {
            let q = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), angle);
            let v = to_vector_continuous(q.quaternion(), &previous).unwrap();
            assert!(
                (v.norm() - previous.norm()).abs() < PI,
                "magnitude jump at angle {angle}"
            );
            previous = v;
            angle += 0.05;
        }
    }

    #[test]
    fn test_continuous_matches_plain_for_small_rotations() {
        let q = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.3);
        let previous = Vector3::new(0.25, 0.0, 0.0);
        let plain = to_vector(q.quaternion()).unwrap();
        let continuous = to_vector_continuous(q.quaternion(), &previous).unwrap();
        assert!((plain - continuous).norm() < 1e-12);
    }
}
