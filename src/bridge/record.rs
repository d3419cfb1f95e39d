//! Bindings between host models and engine agents.

use std::sync::Arc;

use serde::Serialize;

use crate::engine::AgentHandle;
use crate::pose::Pose;
use crate::registry::AgentTypeDefinition;

/// One bound object: a host model tied to an engine agent.
///
/// The record's position in the bridge is the object's identifier for the
/// life of the process.
#[derive(Debug, Clone)]
pub struct AgentRecord {
    pub(crate) handle: AgentHandle,
    pub(crate) host_model_name: String,
    pub(crate) type_name: String,
    pub(crate) is_external: bool,
    pub(crate) definition: Option<Arc<AgentTypeDefinition>>,
    /// Last pose handed to or received from the host.
    pub(crate) last_pose: Pose,
    /// Engine-frame heading of the last pull; kept while the agent stands.
    pub(crate) heading: f64,
}

impl AgentRecord {
    /// Engine agent behind this object.
    #[must_use]
    pub const fn handle(&self) -> AgentHandle {
        self.handle
    }

    /// Name of the host model bound to this object.
    #[must_use]
    pub fn host_model_name(&self) -> &str {
        &self.host_model_name
    }

    /// Agent type name from the scene.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// `true` when the host drives this object.
    #[must_use]
    pub const fn is_external(&self) -> bool {
        self.is_external
    }

    /// Resolved type definition; always present for internal objects.
    #[must_use]
    pub const fn definition(&self) -> Option<&Arc<AgentTypeDefinition>> {
        self.definition.as_ref()
    }

    /// Most recent pose pushed or pulled for this object.
    #[must_use]
    pub const fn last_pose(&self) -> Pose {
        self.last_pose
    }
}

/// Serialisable view of one object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectSnapshot {
    /// Object index in the bridge.
    pub index: usize,
    /// Bound host model name.
    pub host_model_name: String,
    /// Agent type name.
    pub type_name: String,
    /// `true` when the host drives the object.
    pub is_external: bool,
    /// Last reported pose, host model frame.
    pub pose: Pose,
}

impl ObjectSnapshot {
    pub(crate) fn of(index: usize, record: &AgentRecord) -> Self {
        Self {
            index,
            host_model_name: record.host_model_name.clone(),
            type_name: record.type_name.clone(),
            is_external: record.is_external,
            pose: record.last_pose,
        }
    }
}
