//! Pedestrian simulation engine seam.
//!
//! The bridge talks to the planning engine only through [`CrowdEngine`].
//! [`OrcaEngine`] is the engine shipped with the crate; it is built from a
//! scene and a behaviour definition (see [`definitions`]). The engine is
//! owned by exactly one [`SimulationEngineHandle`], which adds the fixed
//! timestep, the simulated clock and handle validation on top.

use std::sync::atomic::{AtomicU64, Ordering};

use glam::{DVec2, DVec3};

pub mod definitions;
mod handle;
mod orca;

pub use definitions::{BehaviorDefinition, SceneDefinition};
pub use handle::SimulationEngineHandle;
pub use orca::OrcaEngine;

/// Kinematic state of one engine agent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AgentState {
    /// Ground-plane position with elevation as `z`.
    pub position: DVec3,
    /// Velocity planned in the last step.
    pub velocity: DVec3,
    /// Unit heading in the ground plane.
    pub orientation: DVec2,
}

/// A pedestrian simulation engine advanced in fixed increments.
///
/// Agent indices are dense (`0..agent_count()`) and fixed for the lifetime
/// of the engine.
#[cfg_attr(test, mockall::automock)]
pub trait CrowdEngine: Send + Sync {
    /// Number of agents; constant after construction.
    fn agent_count(&self) -> usize;

    /// Current kinematic state, or `None` for an unknown index.
    fn agent_state(&self, index: usize) -> Option<AgentState>;

    /// The scene's type tag for the agent, resolved against the type registry.
    fn type_tag(&self, index: usize) -> Option<String>;

    /// Host model name declared by the scene, if any.
    fn agent_name(&self, index: usize) -> Option<String>;

    /// Advances every agent by `dt` seconds.
    fn step(&mut self, dt: f64);

    /// Pins an agent at `position` facing `heading`, outside planner
    /// control, until the next overwrite or [`CrowdEngine::release_agent`].
    ///
    /// Returns `false` for an unknown index.
    fn overwrite_agent(&mut self, index: usize, position: DVec3, heading: DVec2) -> bool;

    /// Returns a pinned agent to planner control.
    fn release_agent(&mut self, index: usize) -> bool;
}

/// Identity of one engine instance, used to reject foreign handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineId(u64);

impl EngineId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Borrowed reference to one agent of a [`SimulationEngineHandle`].
///
/// A handle is only meaningful to the engine handle that produced it and is
/// valid for as long as that engine handle is alive. It carries no
/// ownership: dropping it does nothing to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AgentHandle {
    engine: EngineId,
    index: usize,
}

impl AgentHandle {
    pub(crate) const fn new(engine: EngineId, index: usize) -> Self {
        Self { engine, index }
    }

    /// Index of the agent inside its engine.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Engine that issued the handle.
    #[must_use]
    pub const fn engine(&self) -> EngineId {
        self.engine
    }
}
