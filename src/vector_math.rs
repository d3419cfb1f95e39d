//! Planar vector helpers for headings and extrapolation.
//! Agents move in the ground plane; z is carried along untouched.
use glam::{DVec2, DVec3};

use crate::HEADING_SPEED_THRESHOLD;

/// Returns the yaw (radians, counter-clockwise from +x) of a planar vector.
///
/// # Examples
/// ```
/// use glam::DVec2;
/// use crowd_bridge::vector_math::yaw_of;
/// let yaw = yaw_of(DVec2::new(0.0, 2.0));
/// assert!((yaw - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
/// ```
#[must_use]
pub fn yaw_of(direction: DVec2) -> f64 {
    direction.y.atan2(direction.x)
}

/// Unit heading vector for a yaw angle.
#[must_use]
pub fn heading_from_yaw(yaw: f64) -> DVec2 {
    DVec2::from_angle(yaw)
}

/// Yaw of the velocity's ground-plane heading, or `None` while the agent is
/// effectively stationary.
///
/// ```
/// use glam::DVec3;
/// use crowd_bridge::vector_math::moving_heading;
/// assert!(moving_heading(DVec3::new(1e-5, 0.0, 0.0)).is_none());
/// assert!(moving_heading(DVec3::new(1.0, 0.0, 0.0)).is_some());
/// ```
#[must_use]
pub fn moving_heading(velocity: DVec3) -> Option<f64> {
    let planar = velocity.truncate();
    if !planar.is_finite() || planar.length() <= HEADING_SPEED_THRESHOLD {
        return None;
    }
    Some(yaw_of(planar))
}

/// Scales `vector` down to `max_length` if it is longer.
#[must_use]
pub fn clamp_length(vector: DVec2, max_length: f64) -> DVec2 {
    vector.clamp_length_max(max_length.max(0.0))
}

/// 2D cross product (z component of the 3D cross product).
#[must_use]
pub fn det(a: DVec2, b: DVec2) -> f64 {
    a.perp_dot(b)
}
