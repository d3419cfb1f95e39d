//! Coordination between host models and the crowd engine.
//!
//! [`CrowdBridge`] owns the object records and the engine handle. A host
//! frame is one push/step/pull cycle:
//!
//! 1. [`CrowdBridge::push_external_pose`] for every host-driven object,
//! 2. [`CrowdBridge::step_simulation`] once per fixed timestep,
//! 3. [`CrowdBridge::pull_object_pose`] for every object.
//!
//! Pushes must all land before the step: internal agents plan against the
//! external positions the engine holds when the step begins.

mod record;

use glam::DVec3;
use hashbrown::HashSet;
use log::{debug, error, info, warn};

pub use record::{AgentRecord, ObjectSnapshot};

use crate::config::CrowdSettings;
use crate::engine::{AgentHandle, AgentState, SimulationEngineHandle};
use crate::error::{CrowdError, Result};
use crate::pose::Pose;
use crate::registry::{AgentTypeDefinition, AgentTypeRegistry};
use crate::vector_math::{moving_heading, yaw_of};
use crate::INTERNAL_MODEL_PREFIX;

/// Lifecycle of a [`CrowdBridge`]. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BridgePhase {
    /// Nothing configured yet.
    Unconfigured,
    /// Type registry and engine are in place.
    Configured,
    /// Objects exist but the engine has not been stepped.
    Spawned,
    /// At least one step has run.
    Running,
    /// Configuration failed; the bridge is unusable.
    Failed,
}

struct Context {
    registry: AgentTypeRegistry,
    engine: SimulationEngineHandle,
}

/// Single point of coordination between host models and the engine.
pub struct CrowdBridge {
    phase: BridgePhase,
    context: Option<Context>,
    records: Vec<AgentRecord>,
}

impl Default for CrowdBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CrowdBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrowdBridge")
            .field("phase", &self.phase)
            .field("objects", &self.records.len())
            .finish_non_exhaustive()
    }
}

impl CrowdBridge {
    /// Unconfigured bridge with no objects.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: BridgePhase::Unconfigured,
            context: None,
            records: Vec::new(),
        }
    }

    /// Builds a configured bridge from validated settings.
    ///
    /// # Errors
    /// Propagates registry and engine construction failures.
    pub fn from_settings(settings: &CrowdSettings) -> Result<Self> {
        let mut bridge = Self::new();
        bridge.configure_from_settings(settings)?;
        Ok(bridge)
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> BridgePhase {
        self.phase
    }

    /// Installs the type registry and the engine.
    ///
    /// # Errors
    /// [`CrowdError::InvalidOperation`] unless the bridge is unconfigured.
    pub fn configure(
        &mut self,
        registry: AgentTypeRegistry,
        engine: SimulationEngineHandle,
    ) -> Result<()> {
        self.require_unconfigured()?;
        info!(
            "crowd bridge configured: {} agent types, {} engine agents",
            registry.count(),
            engine.agent_count()
        );
        self.context = Some(Context { registry, engine });
        self.phase = BridgePhase::Configured;
        Ok(())
    }

    /// Builds the registry and loads the engine named by `settings`.
    ///
    /// A failure leaves the bridge [`BridgePhase::Failed`].
    ///
    /// # Errors
    /// [`CrowdError::DuplicateType`], [`CrowdError::Configuration`] or
    /// [`CrowdError::EngineLoad`] from construction.
    pub fn configure_from_settings(&mut self, settings: &CrowdSettings) -> Result<()> {
        self.require_unconfigured()?;
        let built = settings.registry().and_then(|registry| {
            let engine = SimulationEngineHandle::initialize(
                &settings.resource_path,
                &settings.behavior_file,
                &settings.scene_file,
                settings.update_time_step,
            )?;
            Ok((registry, engine))
        });
        match built {
            Ok((registry, engine)) => self.configure(registry, engine),
            Err(err) => {
                self.phase = BridgePhase::Failed;
                Err(err)
            }
        }
    }

    fn require_unconfigured(&self) -> Result<()> {
        match self.phase {
            BridgePhase::Unconfigured => Ok(()),
            BridgePhase::Failed => Err(CrowdError::NotInitialized),
            other => Err(CrowdError::InvalidOperation(format!(
                "bridge is already configured ({other:?})"
            ))),
        }
    }

    fn context(&self) -> Result<&Context> {
        self.context.as_ref().ok_or(CrowdError::NotInitialized)
    }

    fn context_mut(&mut self) -> Result<&mut Context> {
        self.context.as_mut().ok_or(CrowdError::NotInitialized)
    }

    fn mark_spawned(&mut self) {
        if self.phase == BridgePhase::Configured {
            self.phase = BridgePhase::Spawned;
        }
    }

    /// Appends a record for an existing engine agent and returns its index.
    ///
    /// Internal objects need `type_name` to resolve; external objects keep
    /// the definition only if it happens to exist and are pinned in the
    /// engine at their current position until the host pushes a pose.
    ///
    /// # Errors
    /// [`CrowdError::NotInitialized`] before configuration,
    /// [`CrowdError::InvalidOperation`] for a handle of another engine and
    /// [`CrowdError::TypeNotFound`] for an unresolved internal type.
    pub fn add_object(
        &mut self,
        handle: AgentHandle,
        host_model_name: &str,
        type_name: &str,
        is_external: bool,
    ) -> Result<usize> {
        let context = self.context_mut()?;
        let state = context.engine.agent_state(handle)?;
        let definition = if is_external {
            context.registry.lookup(type_name).ok().cloned()
        } else {
            Some(context.registry.lookup(type_name)?.clone())
        };
        let heading = yaw_of(state.orientation);
        let last_pose = spawn_pose_for(&state, is_external, definition.as_deref());
        if is_external {
            context
                .engine
                .overwrite_agent_state(handle.index(), &last_pose)?;
        }
        self.records.push(AgentRecord {
            handle,
            host_model_name: host_model_name.to_owned(),
            type_name: type_name.to_owned(),
            is_external,
            definition,
            last_pose,
            heading,
        });
        self.mark_spawned();
        let index = self.records.len() - 1;
        debug!("object {index} bound to `{host_model_name}` (external: {is_external})");
        Ok(index)
    }

    /// Creates one record per engine agent and returns the object count.
    ///
    /// The first `external_model_names.len()` engine agents are bound to the
    /// named host models and pinned under host control. Every remaining
    /// agent becomes an internal object whose type is the scene's type tag.
    /// Nothing is recorded unless every agent resolves.
    ///
    /// # Errors
    /// [`CrowdError::Spawn`] if a name repeats or has no engine agent,
    /// [`CrowdError::TypeNotFound`] if an internal agent's type tag is not
    /// registered, [`CrowdError::InvalidOperation`] unless freshly
    /// configured.
    pub fn spawn_objects(&mut self, external_model_names: &[String]) -> Result<usize> {
        match self.phase {
            BridgePhase::Configured => {}
            BridgePhase::Unconfigured | BridgePhase::Failed => {
                return Err(CrowdError::NotInitialized)
            }
            other => {
                return Err(CrowdError::InvalidOperation(format!(
                    "objects are already spawned ({other:?})"
                )))
            }
        }
        let context = self.context_mut()?;
        let count = context.engine.agent_count();

        let mut seen = HashSet::new();
        for (index, name) in external_model_names.iter().enumerate() {
            if !seen.insert(name.as_str()) {
                error!("external agent `{name}` is listed twice; nothing spawned");
                return Err(CrowdError::Spawn(format!(
                    "external agent `{name}` is listed twice"
                )));
            }
            if index >= count {
                error!(
                    "external agent `{name}` has no engine agent (index {index}, scene has {count}); nothing spawned"
                );
                return Err(CrowdError::Spawn(format!(
                    "external agent `{name}` needs engine agent {index}, but the scene has {count}"
                )));
            }
        }

        let mut staged = Vec::with_capacity(count);
        for index in 0..count {
            let handle = context.engine.agent(index)?;
            let state = context.engine.agent_state(handle)?;
            let type_name = context.engine.type_tag(index).unwrap_or_default();
            let record = if let Some(name) = external_model_names.get(index) {
                let definition = context.registry.lookup(&type_name).ok().cloned();
                AgentRecord {
                    handle,
                    host_model_name: name.clone(),
                    last_pose: spawn_pose_for(&state, true, definition.as_deref()),
                    heading: yaw_of(state.orientation),
                    type_name,
                    is_external: true,
                    definition,
                }
            } else {
                let definition = context.registry.lookup(&type_name)?.clone();
                let host_model_name = context
                    .engine
                    .agent_name(index)
                    .unwrap_or_else(|| format!("{INTERNAL_MODEL_PREFIX}{index}"));
                AgentRecord {
                    handle,
                    host_model_name,
                    last_pose: spawn_pose_for(&state, false, Some(definition.as_ref())),
                    heading: yaw_of(state.orientation),
                    type_name,
                    is_external: false,
                    definition: Some(definition),
                }
            };
            staged.push(record);
        }

        for record in staged.iter().filter(|r| r.is_external) {
            context
                .engine
                .overwrite_agent_state(record.handle.index(), &record.last_pose)?;
        }
        info!(
            "spawned {} objects ({} external)",
            staged.len(),
            external_model_names.len()
        );
        self.records = staged;
        self.mark_spawned();
        Ok(self.records.len())
    }

    /// Number of bound objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.records.len()
    }

    /// Record of object `index`.
    ///
    /// # Errors
    /// [`CrowdError::NotInitialized`] before configuration and
    /// [`CrowdError::Index`] out of range.
    pub fn object(&self, index: usize) -> Result<&AgentRecord> {
        self.context()?;
        self.records.get(index).ok_or(CrowdError::Index {
            index,
            count: self.records.len(),
        })
    }

    /// Iterates over `(index, record)` pairs.
    pub fn objects(&self) -> impl Iterator<Item = (usize, &AgentRecord)> {
        self.records.iter().enumerate()
    }

    /// Hands the host's pose of an external object to the engine.
    ///
    /// # Errors
    /// [`CrowdError::InvalidOperation`] for internal objects or non-finite
    /// poses, [`CrowdError::Index`] out of range.
    pub fn push_external_pose(&mut self, index: usize, host_pose: &Pose) -> Result<()> {
        let count = self.records.len();
        let Some(context) = self.context.as_mut() else {
            return Err(CrowdError::NotInitialized);
        };
        let record = self
            .records
            .get_mut(index)
            .ok_or(CrowdError::Index { index, count })?;
        if !record.is_external {
            warn!(
                "pose pushed to engine-driven object {index} (`{}`); ignored",
                record.host_model_name
            );
            return Err(CrowdError::InvalidOperation(format!(
                "object {index} (`{}`) is not externally driven",
                record.host_model_name
            )));
        }
        if !host_pose.is_finite() {
            warn!("non-finite pose pushed to object {index}; ignored");
            return Err(CrowdError::InvalidOperation(format!(
                "pose for object {index} is not finite"
            )));
        }
        context
            .engine
            .overwrite_agent_state(record.handle.index(), host_pose)?;
        record.last_pose = *host_pose;
        Ok(())
    }

    /// Advances the engine by exactly one fixed timestep.
    ///
    /// # Errors
    /// [`CrowdError::NotInitialized`] before configuration and
    /// [`CrowdError::InvalidOperation`] before any object exists.
    pub fn step_simulation(&mut self) -> Result<()> {
        match self.phase {
            BridgePhase::Spawned | BridgePhase::Running => {}
            BridgePhase::Configured => {
                return Err(CrowdError::InvalidOperation(
                    "no objects spawned yet".to_owned(),
                ))
            }
            BridgePhase::Unconfigured | BridgePhase::Failed => {
                return Err(CrowdError::NotInitialized)
            }
        }
        self.context_mut()?.engine.step();
        self.phase = BridgePhase::Running;
        Ok(())
    }

    /// Pose the host should show for object `index`, `elapsed` seconds
    /// after the most recent step.
    ///
    /// Internal objects are extrapolated along their velocity and face
    /// their heading while moving, keeping the previous heading while
    /// stationary. The result is in the host model frame: the type's
    /// spawn offset is composed on every pull exactly as in
    /// [`CrowdBridge::spawn_pose`], so a fresh model does not jump. External
    /// objects return the last pushed pose.
    ///
    /// # Errors
    /// [`CrowdError::Index`] out of range, [`CrowdError::InvalidOperation`]
    /// for a negative or non-finite `elapsed`.
    pub fn pull_object_pose(&mut self, index: usize, elapsed: f64) -> Result<Pose> {
        if !(elapsed.is_finite() && elapsed >= 0.0) {
            return Err(CrowdError::InvalidOperation(format!(
                "elapsed time must be finite and non-negative, got {elapsed}"
            )));
        }
        let count = self.records.len();
        let Some(context) = self.context.as_ref() else {
            return Err(CrowdError::NotInitialized);
        };
        let record = self
            .records
            .get_mut(index)
            .ok_or(CrowdError::Index { index, count })?;
        if record.is_external {
            return Ok(record.last_pose);
        }

        let state = context.engine.agent_state(record.handle)?;
        if let Some(yaw) = moving_heading(state.velocity) {
            record.heading = yaw;
        }
        let position = DVec3::new(
            state.velocity.x.mul_add(elapsed, state.position.x),
            state.velocity.y.mul_add(elapsed, state.position.y),
            state.position.z,
        );
        let engine_pose = Pose::from_position_yaw(position, record.heading);
        let pose = model_pose(&engine_pose, false, record.definition.as_deref());
        record.last_pose = pose;
        Ok(pose)
    }

    /// Pose at which the host should create object `index`, in the same
    /// model frame as [`CrowdBridge::pull_object_pose`].
    ///
    /// # Errors
    /// [`CrowdError::Index`] out of range.
    pub fn spawn_pose(&self, index: usize) -> Result<Pose> {
        let record = self.object(index)?;
        let state = self.context()?.engine.agent_state(record.handle)?;
        Ok(spawn_pose_for(
            &state,
            record.is_external,
            record.definition.as_deref(),
        ))
    }

    /// Engine-side state of the agent behind object `index`.
    ///
    /// # Errors
    /// [`CrowdError::Index`] out of range.
    pub fn agent_state(&self, index: usize) -> Result<AgentState> {
        let record = self.object(index)?;
        self.context()?.engine.agent_state(record.handle)
    }

    /// Simulated seconds elapsed in the engine.
    ///
    /// # Errors
    /// [`CrowdError::NotInitialized`] before configuration.
    pub fn sim_time(&self) -> Result<f64> {
        Ok(self.context()?.engine.sim_time())
    }

    /// The engine's fixed timestep in seconds.
    ///
    /// # Errors
    /// [`CrowdError::NotInitialized`] before configuration.
    pub fn timestep(&self) -> Result<f64> {
        Ok(self.context()?.engine.timestep())
    }

    /// # Errors
    /// [`CrowdError::NotInitialized`] before configuration.
    pub fn registry(&self) -> Result<&AgentTypeRegistry> {
        Ok(&self.context()?.registry)
    }

    /// Last reported pose of every object.
    ///
    /// # Errors
    /// [`CrowdError::NotInitialized`] before configuration.
    pub fn snapshot(&self) -> Result<Vec<ObjectSnapshot>> {
        self.context()?;
        Ok(self
            .objects()
            .map(|(index, record)| ObjectSnapshot::of(index, record))
            .collect())
    }
}

/// Host model pose for an engine pose. External models carry no offset.
fn model_pose(
    engine_pose: &Pose,
    is_external: bool,
    definition: Option<&AgentTypeDefinition>,
) -> Pose {
    match definition {
        Some(definition) if !is_external => engine_pose.offset_by(&definition.spawn_offset),
        _ => *engine_pose,
    }
}

fn spawn_pose_for(
    state: &AgentState,
    is_external: bool,
    definition: Option<&AgentTypeDefinition>,
) -> Pose {
    let engine_pose = Pose::from_position_yaw(state.position, yaw_of(state.orientation));
    model_pose(&engine_pose, is_external, definition)
}
