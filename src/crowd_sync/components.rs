//! ECS components attached to crowd-driven and host-driven entities.
use bevy_ecs::prelude::*;
use serde::Serialize;

use crate::registry::AgentTypeDefinition;

/// Links an entity to a bridge object.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CrowdObject {
    /// Object index in the bridge.
    pub index: usize,
}

/// Marks a host-driven model; bound to the bridge through its `Name`.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct ExternalAgent;

/// Visual metadata of an engine-driven agent.
#[derive(Component, Debug, Clone, PartialEq, Serialize)]
pub struct CrowdModel {
    /// Agent type name.
    pub type_name: String,
    /// Visual model reference.
    pub visual: String,
    /// Walk animation reference.
    pub animation: String,
    /// Animation seconds per metre travelled.
    pub animation_speed: f64,
}

impl From<&AgentTypeDefinition> for CrowdModel {
    fn from(definition: &AgentTypeDefinition) -> Self {
        Self {
            type_name: definition.type_name.clone(),
            visual: definition.visual.clone(),
            animation: definition.animation.clone(),
            animation_speed: definition.animation_speed,
        }
    }
}

/// Walk animation position, advanced by distance travelled.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AnimationClock {
    /// Seconds into the walk animation.
    pub script_time: f64,
}
