//! Systems advancing the bridge and applying its poses to entities.

use bevy_ecs::prelude::*;
use bevy_math::Vec2;
use bevy_time::Time;
use bevy_transform::components::Transform;

use super::frames::transform_from_pose;
use super::{
    AnimationClock, CrowdClock, CrowdModel, CrowdObject, CrowdState, CrowdSyncError,
    CrowdSyncErrorContext, ExternalAgent,
};

type CrowdWriteQuery<'w, 's> = Query<
    'w,
    's,
    (
        &'static CrowdObject,
        &'static mut Transform,
        Option<&'static CrowdModel>,
        Option<&'static mut AnimationClock>,
    ),
    Without<ExternalAgent>,
>;

/// Steps the bridge once when a full timestep of host time has passed.
pub fn step_crowd_system(
    mut commands: Commands,
    time: Res<Time>,
    mut state: ResMut<CrowdState>,
    mut clock: ResMut<CrowdClock>,
) {
    let Ok(timestep) = state.bridge.timestep() else {
        return;
    };
    if !clock.tick(time.delta_secs_f64(), timestep) {
        return;
    }
    if let Err(e) = state.bridge.step_simulation() {
        commands.trigger(CrowdSyncError::new(
            CrowdSyncErrorContext::Step,
            e.to_string(),
        ));
    }
}

/// Writes extrapolated bridge poses to engine-driven entities and advances
/// their walk animation by the distance covered.
pub fn apply_crowd_poses_system(
    mut commands: Commands,
    mut state: ResMut<CrowdState>,
    clock: Res<CrowdClock>,
    mut query: CrowdWriteQuery<'_, '_>,
) {
    for (object, mut transform, model, animation) in &mut query {
        let pose = match state.bridge.pull_object_pose(object.index, clock.since_step()) {
            Ok(pose) => pose,
            Err(e) => {
                commands.trigger(CrowdSyncError::new(
                    CrowdSyncErrorContext::Pull,
                    e.to_string(),
                ));
                continue;
            }
        };
        let Some(next) = transform_from_pose(&pose) else {
            commands.trigger(CrowdSyncError::new(
                CrowdSyncErrorContext::Pull,
                format!("pose of object {} does not fit a transform", object.index),
            ));
            continue;
        };

        if let (Some(model), Some(mut animation)) = (model, animation) {
            let travelled = Vec2::new(
                next.translation.x - transform.translation.x,
                next.translation.z - transform.translation.z,
            )
            .length();
            animation.script_time += f64::from(travelled) * model.animation_speed;
        }
        *transform = next;
    }
}
