//! Conversion between Bevy transforms and bridge poses.
//!
//! Bevy is Y-up; the bridge is Z-up with yaw about +Z. The mapping is
//! `x = tx`, `y = -tz`, `z = ty`, so a bridge yaw is a rotation about
//! Bevy +Y and a bridge pitch is a rotation about Bevy -Z.

use bevy_math::{EulerRot, Quat, Vec3};
use bevy_transform::components::Transform;

use crate::numeric::f32_from_f64;
use crate::pose::Pose;

/// Bridge pose of a Bevy transform.
#[must_use]
pub fn pose_from_transform(transform: &Transform) -> Pose {
    let t = transform.translation;
    let (yaw, neg_pitch, roll) = transform.rotation.to_euler(EulerRot::YZX);
    Pose::new(
        f64::from(t.x),
        -f64::from(t.z),
        f64::from(t.y),
        -f64::from(neg_pitch),
        f64::from(roll),
        f64::from(yaw),
    )
}

/// Bevy transform of a bridge pose, or `None` if a component does not fit
/// in `f32`.
#[must_use]
pub fn transform_from_pose(pose: &Pose) -> Option<Transform> {
    let translation = Vec3::new(
        f32_from_f64(pose.x)?,
        f32_from_f64(pose.z)?,
        f32_from_f64(-pose.y)?,
    );
    let rotation = Quat::from_euler(
        EulerRot::YZX,
        f32_from_f64(pose.yaw)?,
        f32_from_f64(-pose.pitch)?,
        f32_from_f64(pose.roll)?,
    );
    Some(Transform::from_translation(translation).with_rotation(rotation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    fn bridge_axes_map_onto_bevy_axes() {
        let transform =
            transform_from_pose(&Pose::new(1.0, 2.0, 3.0, 0.0, 0.0, 0.0)).expect("finite pose");
        assert_eq!(transform.translation, Vec3::new(1.0, 3.0, -2.0));
    }

    #[rstest]
    fn positive_yaw_turns_forward_toward_bridge_y() {
        let pose = Pose::new(0.0, 0.0, 0.0, 0.0, 0.0, std::f64::consts::FRAC_PI_2);
        let transform = transform_from_pose(&pose).expect("finite pose");
        // Bridge +x rotated by +90 degrees is bridge +y, which is Bevy -z.
        let forward = transform.rotation * Vec3::X;
        assert_relative_eq!(forward.z, -1.0, epsilon = 1e-6);
        assert_relative_eq!(forward.x, 0.0, epsilon = 1e-6);
    }

    #[rstest]
    #[case(Pose::new(1.5, -2.0, 0.25, 0.1, -0.2, 0.7))]
    #[case(Pose::new(-4.0, 8.0, 0.0, 0.0, 0.0, -2.5))]
    fn transform_and_pose_agree(#[case] pose: Pose) {
        let back = pose_from_transform(&transform_from_pose(&pose).expect("finite pose"));
        assert_relative_eq!(back.x, pose.x, epsilon = 1e-5);
        assert_relative_eq!(back.y, pose.y, epsilon = 1e-5);
        assert_relative_eq!(back.z, pose.z, epsilon = 1e-5);
        assert_relative_eq!(back.pitch, pose.pitch, epsilon = 1e-5);
        assert_relative_eq!(back.roll, pose.roll, epsilon = 1e-5);
        assert_relative_eq!(back.yaw, pose.yaw, epsilon = 1e-5);
    }

    #[rstest]
    fn oversized_pose_is_rejected() {
        assert!(transform_from_pose(&Pose::new(1e300, 0.0, 0.0, 0.0, 0.0, 0.0)).is_none());
    }
}
