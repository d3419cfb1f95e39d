//! Systems feeding host state into the bridge.

use bevy_ecs::prelude::*;
use bevy_transform::components::Transform;
use log::{info, warn};

use super::frames::{pose_from_transform, transform_from_pose};
use super::{
    AnimationClock, CrowdModel, CrowdObject, CrowdState, CrowdSyncError, CrowdSyncErrorContext,
    ExternalAgent,
};

/// Binds configured external models and spawns one entity per engine-driven
/// agent.
///
/// External models are matched by [`Name`] against the configured external
/// agent list and tagged with [`CrowdObject`]. Internal agents get a new
/// entity placed at the bridge's spawn pose.
#[expect(
    clippy::needless_pass_by_value,
    reason = "Bevy systems receive queries by value."
)]
pub fn spawn_crowd_objects_system(
    mut commands: Commands,
    mut state: ResMut<CrowdState>,
    externals: Query<(Entity, &Name), With<ExternalAgent>>,
) {
    let names = state.external_agents.clone();
    if let Err(e) = state.bridge.spawn_objects(&names) {
        commands.trigger(CrowdSyncError::new(
            CrowdSyncErrorContext::Spawn,
            e.to_string(),
        ));
        return;
    }

    let bridge = &state.bridge;
    for (index, record) in bridge.objects() {
        if record.is_external() {
            let entity = externals
                .iter()
                .find(|(_, name)| name.as_str() == record.host_model_name());
            match entity {
                Some((entity, _)) => {
                    commands.entity(entity).insert(CrowdObject { index });
                }
                None => warn!(
                    "external agent `{}` has no host entity yet",
                    record.host_model_name()
                ),
            }
            continue;
        }

        let transform = bridge
            .spawn_pose(index)
            .ok()
            .and_then(|pose| transform_from_pose(&pose));
        let Some(transform) = transform else {
            commands.trigger(CrowdSyncError::new(
                CrowdSyncErrorContext::Spawn,
                format!("object {index} has no representable spawn pose"),
            ));
            continue;
        };
        let mut entity = commands.spawn((
            Name::new(record.host_model_name().to_owned()),
            CrowdObject { index },
            AnimationClock::default(),
            transform,
        ));
        if let Some(definition) = record.definition() {
            entity.insert(CrowdModel::from(definition.as_ref()));
        }
    }

    for (_, name) in &externals {
        if !names.iter().any(|n| n.as_str() == name.as_str()) {
            warn!("`{name}` is marked external but not configured as an external agent");
        }
    }
    info!("crowd spawned with {} objects", bridge.object_count());
}

/// Forwards the transforms of bound external models to the bridge.
#[expect(
    clippy::needless_pass_by_value,
    reason = "Bevy systems receive queries by value."
)]
pub fn push_external_poses_system(
    mut commands: Commands,
    mut state: ResMut<CrowdState>,
    externals: Query<(&CrowdObject, &Transform), With<ExternalAgent>>,
) {
    for (object, transform) in &externals {
        let pose = pose_from_transform(transform);
        if let Err(e) = state.bridge.push_external_pose(object.index, &pose) {
            commands.trigger(CrowdSyncError::new(
                CrowdSyncErrorContext::Push,
                e.to_string(),
            ));
        }
    }
}
