//! Conversions between wire arrays and `nalgebra` types, plus the quaternion
//! interpolation used for remote playback.

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

pub type Vec3 = Vector3<f32>;
pub type Quat = UnitQuaternion<f32>;

pub fn vec3_from_array(a: [f32; 3]) -> Vec3 {
    Vec3::new(a[0], a[1], a[2])
}

pub fn vec3_to_array(v: &Vec3) -> [f32; 3] {
    [v.x, v.y, v.z]
}

/// Builds a unit quaternion from `[x, y, z, w]`.
///
/// Returns `None` for non-finite or near-zero input so callers can keep
/// whatever orientation they already had.
pub fn quat_from_array(a: [f32; 4]) -> Option<Quat> {
    if a.iter().any(|c| !c.is_finite()) {
        return None;
    }
    let q = Quaternion::new(a[3], a[0], a[1], a[2]);
    if q.norm() < 1e-6 {
        return None;
    }
    Some(UnitQuaternion::new_normalize(q))
}

pub fn quat_to_array(q: &Quat) -> [f32; 4] {
    [q.i, q.j, q.k, q.w]
}

/// Spherical interpolation along the shorter arc.
///
/// Falls back to normalized lerp when the endpoints are nearly parallel,
/// where the slerp weights lose precision.
pub fn slerp_shortest(a: &Quat, b: &Quat, t: f32) -> Quat {
    let qa = a.coords;
    let mut qb = b.coords;
    let mut dot = qa.dot(&qb);
    if dot < 0.0 {
        qb = -qb;
        dot = -dot;
    }

    if dot > 0.9995 {
        let v = qa.lerp(&qb, t);
        return UnitQuaternion::new_normalize(Quaternion::from_vector(v));
    }

    let theta_0 = dot.min(1.0).acos();
    let theta = theta_0 * t;
    let sin_0 = theta_0.sin();
    let s0 = (theta_0 - theta).sin() / sin_0;
    let s1 = theta.sin() / sin_0;
    UnitQuaternion::new_normalize(Quaternion::from_vector(qa * s0 + qb * s1))
}

/// Heading of `q` around +Y, with -Z as the zero heading.
pub fn yaw_of(q: &Quat) -> f32 {
    let forward = q * Vec3::new(0.0, 0.0, -1.0);
    if forward.x.abs() < 1e-6 && forward.z.abs() < 1e-6 {
        return 0.0;
    }
    (-forward.x).atan2(-forward.z)
}

pub fn yaw_rotation(radians: f32) -> Quat {
    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), radians)
}
