//! Bevy plugin wiring the crowd bridge into the schedule.

use bevy_app::prelude::*;
use bevy_ecs::prelude::*;
use bevy_time::Time;
use log::error;
use thiserror::Error;

use crate::bridge::CrowdBridge;
use crate::config::CrowdSettings;

use super::{
    apply_crowd_poses_system, push_external_poses_system, spawn_crowd_objects_system,
    step_crowd_system, CrowdClock, CrowdState,
};

/// Context carried by [`CrowdSyncError`] events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrowdSyncErrorContext {
    /// Building the bridge from settings.
    Init,
    /// Binding objects at startup.
    Spawn,
    /// Forwarding an external pose.
    Push,
    /// Advancing the engine.
    Step,
    /// Reading an object pose back.
    Pull,
}

/// Event raised when crowd synchronisation hits an error path.
#[derive(Event, Debug, Clone, Error)]
#[error("{context:?}: {detail}")]
pub struct CrowdSyncError {
    /// Stage of the frame that failed.
    pub context: CrowdSyncErrorContext,
    /// Human-readable description of the failure.
    pub detail: String,
}

impl CrowdSyncError {
    /// Creates an error event for `context`.
    pub fn new(context: CrowdSyncErrorContext, detail: impl Into<String>) -> Self {
        Self {
            context,
            detail: detail.into(),
        }
    }
}

#[expect(
    clippy::needless_pass_by_value,
    reason = "Observer systems must accept On<T> by value."
)]
fn log_crowd_error(event: On<CrowdSyncError>) {
    let CrowdSyncError { context, detail } = event.event();
    error!("crowd sync error during {context:?}: {detail}");
}

/// Bevy plugin driving a [`CrowdBridge`] from the host frame loop.
#[derive(Debug, Clone)]
pub struct CrowdPlugin {
    settings: CrowdSettings,
}

impl CrowdPlugin {
    /// Plugin that will build its bridge from `settings`.
    #[must_use]
    pub const fn new(settings: CrowdSettings) -> Self {
        Self { settings }
    }
}

impl Plugin for CrowdPlugin {
    fn build(&self, app: &mut App) {
        app.add_observer(log_crowd_error);

        let bridge = match CrowdBridge::from_settings(&self.settings) {
            Ok(bridge) => bridge,
            Err(e) => {
                app.world_mut().trigger(CrowdSyncError::new(
                    CrowdSyncErrorContext::Init,
                    e.to_string(),
                ));
                return;
            }
        };

        if !app.world().contains_resource::<Time>() {
            app.init_resource::<Time>();
        }
        app.insert_resource(CrowdState::new(
            bridge,
            self.settings.external_agents.clone(),
        ));
        app.init_resource::<CrowdClock>();
        app.add_systems(Startup, spawn_crowd_objects_system);
        app.add_systems(
            Update,
            (
                push_external_poses_system,
                step_crowd_system,
                apply_crowd_poses_system,
            )
                .chain(),
        );
    }
}
