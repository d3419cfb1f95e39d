//! Resources shared by the crowd systems.

use bevy_ecs::prelude::*;

use crate::bridge::CrowdBridge;

/// Resource owning the bridge for the lifetime of the app.
#[derive(Resource, Debug)]
pub struct CrowdState {
    pub(crate) bridge: CrowdBridge,
    /// Configured external model names, in binding order.
    pub(crate) external_agents: Vec<String>,
}

impl CrowdState {
    /// Wraps a configured bridge and the external names to bind at startup.
    #[must_use]
    pub const fn new(bridge: CrowdBridge, external_agents: Vec<String>) -> Self {
        Self {
            bridge,
            external_agents,
        }
    }

    /// The bridge driven by the crowd systems.
    #[must_use]
    pub const fn bridge(&self) -> &CrowdBridge {
        &self.bridge
    }

    /// Mutable access to the bridge.
    pub fn bridge_mut(&mut self) -> &mut CrowdBridge {
        &mut self.bridge
    }

    /// Configured external model names, in binding order.
    #[must_use]
    pub fn external_agents(&self) -> &[String] {
        &self.external_agents
    }
}

/// Host time accumulated since the bridge last stepped.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq)]
pub struct CrowdClock {
    pub(crate) since_step: f64,
    pub(crate) steps: u64,
}

impl CrowdClock {
    /// Seconds since the most recent step; the extrapolation horizon.
    #[must_use]
    pub const fn since_step(&self) -> f64 {
        self.since_step
    }

    /// Steps taken by the host loop.
    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Adds `delta` seconds and reports whether a step of `timestep` is due.
    /// When it is, the accumulator restarts from zero.
    ///
    /// Host time past the timestep is discarded rather than carried, so
    /// when frames do not divide the timestep the engine runs slower than
    /// host time: 0.375 s frames against a 0.5 s step give one step per
    /// 0.75 s.
    pub(crate) fn tick(&mut self, delta: f64, timestep: f64) -> bool {
        self.since_step += delta;
        if self.since_step >= timestep {
            self.since_step = 0.0;
            self.steps += 1;
            true
        } else {
            false
        }
    }
}
