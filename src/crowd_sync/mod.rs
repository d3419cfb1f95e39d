//! Bevy host integration for the crowd bridge.
//!
//! [`CrowdPlugin`] builds the bridge from settings and installs a startup
//! system that binds and spawns crowd objects, then an update chain that
//! pushes external transforms, steps the engine on its fixed timestep and
//! applies extrapolated poses to engine-driven entities.

mod components;
pub mod frames;
mod input;
mod output;
mod plugin;
mod state;

pub use components::{AnimationClock, CrowdModel, CrowdObject, ExternalAgent};
pub use input::{push_external_poses_system, spawn_crowd_objects_system};
pub use output::{apply_crowd_poses_system, step_crowd_system};
pub use plugin::{CrowdPlugin, CrowdSyncError, CrowdSyncErrorContext};
pub use state::{CrowdClock, CrowdState};
