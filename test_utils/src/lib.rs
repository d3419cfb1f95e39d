//! Utility helpers for tests.
//!
//! Scene, behaviour and configuration fixtures written to a temporary
//! resource directory, plus an observer capturing crowd sync errors.

pub mod crowd_sync;

use std::fs;
use std::path::Path;

use crowd_bridge::config::{read_settings, CrowdSettings, TomlNode};
use tempfile::TempDir;

/// Scene with one robot slot followed by three pedestrians.
pub const LOBBY_SCENE: &str = r#"
[[profile]]
name = "robot"
radius = 0.4
max_speed = 1.0
pref_speed = 1.0

[[profile]]
name = "walker"
type_tag = "visitor"
radius = 0.25
max_speed = 1.5
pref_speed = 1.2

[[profile]]
name = "guard"
radius = 0.3

[[agent]]
profile = "robot"
position = [0.0, 0.0]

[[agent]]
profile = "walker"
position = [-4.0, 1.0]
route = "lobby_loop"

[[agent]]
profile = "walker"
position = [4.0, -1.0]
route = "to_exit"

[[agent]]
profile = "guard"
position = [6.0, 6.0]
name = "lobby_guard"
"#;

/// Routes referenced by [`LOBBY_SCENE`].
pub const LOBBY_BEHAVIOR: &str = r#"
[[route]]
name = "lobby_loop"
waypoints = [[-4.0, 1.0], [4.0, 1.0], [4.0, -3.0], [-4.0, -3.0]]

[[route]]
name = "to_exit"
waypoints = [[-6.0, -1.0]]
cyclic = false
"#;

/// Model types for every tag in [`LOBBY_SCENE`] except `robot`.
pub const LOBBY_MODEL_TYPES: &str = r#"
[[model_type]]
typename = "visitor"
filename = "walk.dae"
animation = "walk"
animation_speed = 4.0
initial_pose = "0 0 0.5 0 0 0"

[[model_type]]
typename = "guard"
filename = "guard.dae"
animation = "idle"
animation_speed = 1.0
initial_pose = "0 0 0.5 0 0 0"
"#;

/// Resource directory holding the lobby scene and behaviour.
#[derive(Debug)]
pub struct LobbyResources {
    dir: TempDir,
}

impl LobbyResources {
    /// Writes the lobby fixtures to a fresh temporary directory.
    ///
    /// # Panics
    /// Panics if the directory or files cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temporary resource directory");
        fs::write(dir.path().join("scene.toml"), LOBBY_SCENE).expect("write scene");
        fs::write(dir.path().join("behavior.toml"), LOBBY_BEHAVIOR).expect("write behaviour");
        Self { dir }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Configuration text pointing at this directory.
    #[must_use]
    pub fn config_toml(&self, timestep: f64, external_agents: &[&str]) -> String {
        let externals: Vec<_> = external_agents.iter().map(|n| format!("\"{n}\"")).collect();
        format!(
            "resource_path = {path:?}\nbehavior_file = \"behavior.toml\"\nscene_file = \"scene.toml\"\nupdate_time_step = {timestep:?}\nexternal_agent = [{externals}]\n{LOBBY_MODEL_TYPES}",
            path = self.path().display().to_string(),
            externals = externals.join(", "),
        )
    }

    /// Validated settings for this directory.
    ///
    /// # Panics
    /// Panics if the generated configuration is rejected.
    #[must_use]
    pub fn settings(&self, timestep: f64, external_agents: &[&str]) -> CrowdSettings {
        let document: toml::Value = self
            .config_toml(timestep, external_agents)
            .parse()
            .expect("fixture configuration is valid TOML");
        read_settings(&TomlNode::root(&document), None)
            .expect("fixture configuration is valid")
            .settings
    }
}

impl Default for LobbyResources {
    fn default() -> Self {
        Self::new()
    }
}
