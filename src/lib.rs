#![cfg_attr(docsrs, feature(doc_cfg))]
//! Crowd bridge: couples a host simulator's frame loop to a fixed-step
//! pedestrian engine.
//!
//! The host pushes the poses of the models it drives, the bridge steps the
//! engine on its own timestep, and the host pulls extrapolated poses for
//! every engine-driven agent. [`CrowdPlugin`] runs that cycle inside a Bevy
//! app.
pub mod bridge;
pub mod config;
pub mod constants;
pub mod crowd_sync;
pub mod engine;
pub mod error;
pub mod logging;
pub mod numeric;
pub mod pose;
pub mod registry;
pub mod vector_math;
pub use constants::*;

// Re-export commonly used items
pub use bridge::{AgentRecord, BridgePhase, CrowdBridge, ObjectSnapshot};
pub use config::{read_settings, ConfigNode, CrowdSettings, SettingsReport, TomlNode};
pub use crowd_sync::{
    AnimationClock, CrowdClock, CrowdModel, CrowdObject, CrowdPlugin, CrowdState, CrowdSyncError,
    CrowdSyncErrorContext, ExternalAgent,
};
pub use engine::{AgentHandle, AgentState, CrowdEngine, OrcaEngine, SimulationEngineHandle};
pub use error::{CrowdError, PoseParseError};
pub use logging::init as init_logging;
pub use pose::Pose;
pub use registry::{AgentTypeDefinition, AgentTypeRegistry};

pub mod prelude {
    //! Prelude exports used in documentation examples.
    //!
    //! ```rust,no_run
    //! use crowd_bridge::prelude::*;
    //! ```

    pub use crate::CrowdBridge;
    pub use crate::CrowdError;
    pub use crate::CrowdPlugin;
    pub use crate::CrowdSettings;
    pub use crate::Pose;
    pub use crate::SimulationEngineHandle;
    pub use glam::{DVec2, DVec3};
}
