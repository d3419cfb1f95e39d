use std::fmt;
use std::path::Path;

use glam::DVec2;
use log::{debug, info};

use super::definitions::{BehaviorDefinition, SceneDefinition};
use super::{AgentHandle, AgentState, CrowdEngine, EngineId, OrcaEngine};
use crate::error::{CrowdError, Result};
use crate::pose::Pose;
use crate::vector_math::heading_from_yaw;

/// Exclusive owner of one [`CrowdEngine`], advancing it on a fixed timestep.
///
/// The timestep is fixed at construction. A handle only exists once its
/// engine is fully built, so there is no partially initialised state.
pub struct SimulationEngineHandle {
    id: EngineId,
    engine: Box<dyn CrowdEngine>,
    timestep: f64,
    sim_time: f64,
    steps: u64,
}

impl fmt::Debug for SimulationEngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationEngineHandle")
            .field("id", &self.id)
            .field("agents", &self.engine.agent_count())
            .field("timestep", &self.timestep)
            .field("sim_time", &self.sim_time)
            .finish_non_exhaustive()
    }
}

fn check_timestep(timestep: f64) -> Result<()> {
    if timestep.is_finite() && timestep > 0.0 {
        Ok(())
    } else {
        Err(CrowdError::configuration(
            "update_time_step",
            format!("must be a positive number of seconds, got {timestep}"),
        ))
    }
}

impl SimulationEngineHandle {
    /// Loads the behaviour and scene definitions below `resource_root` and
    /// builds the built-in engine with the scene's population.
    ///
    /// # Errors
    /// [`CrowdError::Configuration`] if `timestep` is not positive;
    /// [`CrowdError::EngineLoad`] if either file is missing, malformed or
    /// the two do not agree.
    pub fn initialize(
        resource_root: &Path,
        behavior_ref: &str,
        scene_ref: &str,
        timestep: f64,
    ) -> Result<Self> {
        check_timestep(timestep)?;
        let behavior_path = resource_root.join(behavior_ref);
        let scene_path = resource_root.join(scene_ref);
        debug!(
            "loading behaviour `{}` and scene `{}`",
            behavior_path.display(),
            scene_path.display()
        );
        let behavior = BehaviorDefinition::load(&behavior_path)?;
        let scene = SceneDefinition::load(&scene_path)?;
        let engine = OrcaEngine::new(&scene, &behavior)
            .map_err(|detail| CrowdError::engine_load(scene_path.display().to_string(), detail))?;
        let handle = Self::with_engine(Box::new(engine), timestep)?;
        info!(
            "crowd engine ready: {} agents, timestep {timestep}s",
            handle.agent_count()
        );
        Ok(handle)
    }

    /// Wraps an already constructed engine.
    ///
    /// # Errors
    /// [`CrowdError::Configuration`] if `timestep` is not positive.
    pub fn with_engine(engine: Box<dyn CrowdEngine>, timestep: f64) -> Result<Self> {
        check_timestep(timestep)?;
        Ok(Self {
            id: EngineId::next(),
            engine,
            timestep,
            sim_time: 0.0,
            steps: 0,
        })
    }

    /// Advances the engine by exactly one timestep.
    pub fn step(&mut self) {
        self.engine.step(self.timestep);
        self.steps += 1;
        // Derived from the step count so the clock does not drift.
        #[expect(clippy::cast_precision_loss, reason = "step counts stay far below 2^52")]
        let steps = self.steps as f64;
        self.sim_time = steps * self.timestep;
    }

    /// Number of engine agents.
    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.engine.agent_count()
    }

    /// Returns a handle for agent `index`.
    ///
    /// # Errors
    /// [`CrowdError::Index`] if `index >= agent_count()`.
    pub fn agent(&self, index: usize) -> Result<AgentHandle> {
        let count = self.agent_count();
        if index < count {
            Ok(AgentHandle::new(self.id, index))
        } else {
            Err(CrowdError::Index { index, count })
        }
    }

    /// Current state of the agent behind `handle`.
    ///
    /// # Errors
    /// [`CrowdError::InvalidOperation`] if the handle came from another
    /// engine; [`CrowdError::Index`] if the engine no longer knows it.
    pub fn agent_state(&self, handle: AgentHandle) -> Result<AgentState> {
        if handle.engine() != self.id {
            return Err(CrowdError::InvalidOperation(format!(
                "agent handle {} belongs to another engine",
                handle.index()
            )));
        }
        self.engine
            .agent_state(handle.index())
            .ok_or(CrowdError::Index {
                index: handle.index(),
                count: self.agent_count(),
            })
    }

    /// Scene type tag of agent `index`.
    #[must_use]
    pub fn type_tag(&self, index: usize) -> Option<String> {
        self.engine.type_tag(index)
    }

    /// Host model name declared by the scene for agent `index`.
    #[must_use]
    pub fn agent_name(&self, index: usize) -> Option<String> {
        self.engine.agent_name(index)
    }

    /// Places agent `index` at `pose` and takes it out of planner control.
    ///
    /// # Errors
    /// [`CrowdError::Index`] for an unknown agent.
    pub fn overwrite_agent_state(&mut self, index: usize, pose: &Pose) -> Result<()> {
        let heading: DVec2 = heading_from_yaw(pose.yaw);
        if self.engine.overwrite_agent(index, pose.position(), heading) {
            Ok(())
        } else {
            Err(CrowdError::Index {
                index,
                count: self.agent_count(),
            })
        }
    }

    /// Hands agent `index` back to the planner.
    ///
    /// # Errors
    /// [`CrowdError::Index`] for an unknown agent.
    pub fn release_agent(&mut self, index: usize) -> Result<()> {
        if self.engine.release_agent(index) {
            Ok(())
        } else {
            Err(CrowdError::Index {
                index,
                count: self.agent_count(),
            })
        }
    }

    /// Fixed step length in seconds.
    #[must_use]
    pub const fn timestep(&self) -> f64 {
        self.timestep
    }

    /// Simulated seconds since construction.
    #[must_use]
    pub const fn sim_time(&self) -> f64 {
        self.sim_time
    }

    /// Identity stamped into every handle this engine issues.
    #[must_use]
    pub const fn id(&self) -> EngineId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MockCrowdEngine;
    use approx::assert_relative_eq;
    use glam::DVec3;
    use mockall::predicate::eq;
    use rstest::rstest;

    fn mock_with_agents(count: usize) -> MockCrowdEngine {
        let mut engine = MockCrowdEngine::new();
        engine.expect_agent_count().return_const(count);
        engine
    }

    #[rstest]
    #[case(0.0)]
    #[case(-0.1)]
    #[case(f64::NAN)]
    fn non_positive_timestep_is_a_configuration_error(#[case] timestep: f64) {
        let err = SimulationEngineHandle::with_engine(Box::new(mock_with_agents(1)), timestep)
            .expect_err("timestep must be rejected");
        assert!(matches!(err, CrowdError::Configuration { ref field, .. } if field == "update_time_step"));
    }

    #[rstest]
    fn step_advances_engine_by_fixed_timestep() {
        let mut engine = mock_with_agents(1);
        engine.expect_step().with(eq(0.25)).times(3).return_const(());
        let mut handle =
            SimulationEngineHandle::with_engine(Box::new(engine), 0.25).expect("valid timestep");
        for _ in 0..3 {
            handle.step();
        }
        assert_relative_eq!(handle.sim_time(), 0.75);
        assert_relative_eq!(handle.timestep(), 0.25);
    }

    #[rstest]
    fn agent_index_is_bounds_checked() {
        let handle = SimulationEngineHandle::with_engine(Box::new(mock_with_agents(2)), 0.1)
            .expect("valid timestep");
        assert_eq!(handle.agent(1).map(|h| h.index()), Ok(1));
        assert_eq!(
            handle.agent(2),
            Err(CrowdError::Index { index: 2, count: 2 })
        );
    }

    #[rstest]
    fn foreign_handles_are_rejected() {
        let first = SimulationEngineHandle::with_engine(Box::new(mock_with_agents(1)), 0.1)
            .expect("valid timestep");
        let second = SimulationEngineHandle::with_engine(Box::new(mock_with_agents(1)), 0.1)
            .expect("valid timestep");
        let foreign = first.agent(0).expect("agent 0");
        assert!(matches!(
            second.agent_state(foreign),
            Err(CrowdError::InvalidOperation(_))
        ));
    }

    #[rstest]
    fn overwrite_forwards_position_and_heading() {
        let mut engine = mock_with_agents(1);
        engine
            .expect_overwrite_agent()
            .withf(|index, position, heading| {
                *index == 0
                    && *position == DVec3::new(1.0, 2.0, 0.5)
                    && (heading.y - 1.0).abs() < 1e-12
            })
            .times(1)
            .return_const(true);
        let mut handle =
            SimulationEngineHandle::with_engine(Box::new(engine), 0.1).expect("valid timestep");
        let pose = Pose::new(1.0, 2.0, 0.5, 0.0, 0.0, std::f64::consts::FRAC_PI_2);
        assert!(handle.overwrite_agent_state(0, &pose).is_ok());
    }

    #[rstest]
    fn overwrite_of_unknown_agent_is_an_index_error() {
        let mut engine = mock_with_agents(1);
        engine.expect_overwrite_agent().return_const(false);
        let mut handle =
            SimulationEngineHandle::with_engine(Box::new(engine), 0.1).expect("valid timestep");
        assert_eq!(
            handle.overwrite_agent_state(5, &Pose::default()),
            Err(CrowdError::Index { index: 5, count: 1 })
        );
    }
}
