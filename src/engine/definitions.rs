//! Scene and behaviour definitions consumed by [`OrcaEngine`](super::OrcaEngine).
//!
//! Both are TOML documents. The scene declares agent profiles and the
//! initial population in order; the behaviour declares the routes agents
//! walk. Parsing is strict (`deny_unknown_fields`) and is followed by a
//! semantic validation pass, so a loaded pair is always consistent.
//!
//! ```toml
//! # scene
//! [[profile]]
//! name = "walker"
//! max_speed = 1.5
//!
//! [[agent]]
//! profile = "walker"
//! position = [0.0, 0.0]
//! route = "lobby_loop"
//!
//! # behaviour
//! [[route]]
//! name = "lobby_loop"
//! waypoints = [[0.0, 0.0], [8.0, 0.0]]
//! ```

use std::fs;
use std::path::Path;

use hashbrown::{HashMap, HashSet};
use serde::Deserialize;

use crate::error::{CrowdError, Result};
use crate::{
    DEFAULT_AGENT_RADIUS, DEFAULT_ARRIVAL_RADIUS, DEFAULT_MAX_NEIGHBORS, DEFAULT_MAX_SPEED,
    DEFAULT_NEIGHBOR_DIST, DEFAULT_PREF_SPEED, DEFAULT_TIME_HORIZON,
};

/// Planner parameters shared by a group of agents.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    /// Profile name referenced by agents.
    pub name: String,
    /// Type tag resolved against the agent type registry; defaults to `name`.
    #[serde(default)]
    pub type_tag: Option<String>,
    /// Body radius in metres.
    #[serde(default = "default_radius")]
    pub radius: f64,
    /// Speed cap in metres per second.
    #[serde(default = "default_max_speed")]
    pub max_speed: f64,
    /// Walking speed toward a waypoint; at most `max_speed`.
    #[serde(default = "default_pref_speed")]
    pub pref_speed: f64,
    /// Neighbour search range in metres.
    #[serde(default = "default_neighbor_dist")]
    pub neighbor_dist: f64,
    /// Neighbours considered per step.
    #[serde(default = "default_max_neighbors")]
    pub max_neighbors: usize,
    /// Collision look-ahead in seconds.
    #[serde(default = "default_time_horizon")]
    pub time_horizon: f64,
}

impl Profile {
    /// Type tag, falling back to the profile name.
    #[must_use]
    pub fn type_tag(&self) -> &str {
        self.type_tag.as_deref().unwrap_or(&self.name)
    }
}

/// One member of the initial population.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentSpec {
    /// Name of the profile the agent uses.
    pub profile: String,
    /// Initial ground-plane position.
    pub position: [f64; 2],
    /// Height of the agent's floor.
    #[serde(default)]
    pub elevation: f64,
    /// Route to walk; the agent stands still without one.
    #[serde(default)]
    pub route: Option<String>,
    /// Host model name for the agent.
    #[serde(default)]
    pub name: Option<String>,
}

/// Parsed scene document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneDefinition {
    /// Declared profiles; names are unique.
    #[serde(default, rename = "profile")]
    pub profiles: Vec<Profile>,
    /// Initial population; order fixes agent indices.
    #[serde(default, rename = "agent")]
    pub agents: Vec<AgentSpec>,
}

/// A sequence of waypoints an agent walks.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Route {
    /// Route name referenced by agents.
    pub name: String,
    /// Ground-plane waypoints, visited in order.
    pub waypoints: Vec<[f64; 2]>,
    /// Restart from the first waypoint after the last.
    #[serde(default = "default_cyclic")]
    pub cyclic: bool,
    /// Distance at which a waypoint counts as reached.
    #[serde(default = "default_arrival_radius")]
    pub arrival_radius: f64,
}

/// Parsed behaviour document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BehaviorDefinition {
    /// Declared routes; names are unique.
    #[serde(default, rename = "route")]
    pub routes: Vec<Route>,
}

const fn default_radius() -> f64 {
    DEFAULT_AGENT_RADIUS
}
const fn default_max_speed() -> f64 {
    DEFAULT_MAX_SPEED
}
const fn default_pref_speed() -> f64 {
    DEFAULT_PREF_SPEED
}
const fn default_neighbor_dist() -> f64 {
    DEFAULT_NEIGHBOR_DIST
}
const fn default_max_neighbors() -> usize {
    DEFAULT_MAX_NEIGHBORS
}
const fn default_time_horizon() -> f64 {
    DEFAULT_TIME_HORIZON
}
const fn default_cyclic() -> bool {
    true
}
const fn default_arrival_radius() -> f64 {
    DEFAULT_ARRIVAL_RADIUS
}

fn read_document(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(CrowdError::engine_load(
            path.display().to_string(),
            "file does not exist",
        ));
    }
    fs::read_to_string(path)
        .map_err(|e| CrowdError::engine_load(path.display().to_string(), e.to_string()))
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

impl SceneDefinition {
    /// Reads and validates a scene file.
    ///
    /// # Errors
    /// Returns [`CrowdError::EngineLoad`] if the file is missing, is not a
    /// valid scene document, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let text = read_document(path)?;
        Self::parse(&text).map_err(|detail| CrowdError::engine_load(path.display().to_string(), detail))
    }

    /// Parses and validates scene text, returning a description on failure.
    ///
    /// # Errors
    /// Returns the parse or validation failure as text.
    pub fn parse(text: &str) -> Result<Self, String> {
        let scene: Self = toml::from_str(text).map_err(|e| e.to_string())?;
        scene.validate()?;
        Ok(scene)
    }

    fn validate(&self) -> Result<(), String> {
        let mut profiles = HashSet::new();
        for profile in &self.profiles {
            if !profiles.insert(profile.name.as_str()) {
                return Err(format!("profile `{}` declared twice", profile.name));
            }
            let numbers = [
                ("radius", profile.radius),
                ("max_speed", profile.max_speed),
                ("pref_speed", profile.pref_speed),
                ("neighbor_dist", profile.neighbor_dist),
                ("time_horizon", profile.time_horizon),
            ];
            if let Some((field, value)) = numbers.iter().find(|(_, v)| !positive(*v)) {
                return Err(format!(
                    "profile `{}`: {field} must be a positive number, got {value}",
                    profile.name
                ));
            }
            if profile.pref_speed > profile.max_speed {
                return Err(format!(
                    "profile `{}`: pref_speed exceeds max_speed",
                    profile.name
                ));
            }
        }

        if self.agents.is_empty() {
            return Err("scene declares no agents".to_owned());
        }
        for (index, agent) in self.agents.iter().enumerate() {
            if !profiles.contains(agent.profile.as_str()) {
                return Err(format!(
                    "agent {index} references unknown profile `{}`",
                    agent.profile
                ));
            }
            if !agent.position.iter().all(|v| v.is_finite()) || !agent.elevation.is_finite() {
                return Err(format!("agent {index} has a non-finite position"));
            }
        }
        Ok(())
    }

    pub(crate) fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }
}

impl BehaviorDefinition {
    /// Reads and validates a behaviour file.
    ///
    /// # Errors
    /// Returns [`CrowdError::EngineLoad`] if the file is missing, is not a
    /// valid behaviour document, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let text = read_document(path)?;
        Self::parse(&text).map_err(|detail| CrowdError::engine_load(path.display().to_string(), detail))
    }

    /// Parses and validates behaviour text.
    ///
    /// # Errors
    /// Returns the parse or validation failure as text.
    pub fn parse(text: &str) -> Result<Self, String> {
        let behavior: Self = toml::from_str(text).map_err(|e| e.to_string())?;
        behavior.validate()?;
        Ok(behavior)
    }

    fn validate(&self) -> Result<(), String> {
        let mut names = HashSet::new();
        for route in &self.routes {
            if !names.insert(route.name.as_str()) {
                return Err(format!("route `{}` declared twice", route.name));
            }
            if route.waypoints.is_empty() {
                return Err(format!("route `{}` has no waypoints", route.name));
            }
            if !route.waypoints.iter().flatten().all(|v| v.is_finite()) {
                return Err(format!("route `{}` has a non-finite waypoint", route.name));
            }
            if !positive(route.arrival_radius) {
                return Err(format!(
                    "route `{}`: arrival_radius must be a positive number",
                    route.name
                ));
            }
        }
        Ok(())
    }

    /// Index of routes by name.
    pub(crate) fn routes_by_name(&self) -> HashMap<&str, &Route> {
        self.routes.iter().map(|r| (r.name.as_str(), r)).collect()
    }

    /// Checks that every route referenced by the scene exists.
    ///
    /// # Errors
    /// Returns a description of the first dangling reference.
    pub fn check_references(&self, scene: &SceneDefinition) -> Result<(), String> {
        let routes = self.routes_by_name();
        for (index, agent) in scene.agents.iter().enumerate() {
            if let Some(route) = &agent.route {
                if !routes.contains_key(route.as_str()) {
                    return Err(format!("agent {index} references unknown route `{route}`"));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SCENE: &str = r#"
        [[profile]]
        name = "walker"
        type_tag = "visitor"

        [[agent]]
        profile = "walker"
        position = [1.0, 2.0]
        route = "loop"

        [[agent]]
        profile = "walker"
        position = [3.0, 4.0]
        name = "greeter"
    "#;

    const BEHAVIOR: &str = r#"
        [[route]]
        name = "loop"
        waypoints = [[0.0, 0.0], [5.0, 0.0]]
    "#;

    #[rstest]
    fn scene_applies_defaults() {
        let scene = SceneDefinition::parse(SCENE).expect("scene parses");
        let profile = scene.profile("walker").expect("walker profile");
        assert_eq!(profile.type_tag(), "visitor");
        assert!((profile.radius - DEFAULT_AGENT_RADIUS).abs() < f64::EPSILON);
        assert_eq!(scene.agents.len(), 2);
        assert_eq!(scene.agents[1].name.as_deref(), Some("greeter"));
    }

    #[rstest]
    fn behaviour_defaults_to_cyclic_routes() {
        let behavior = BehaviorDefinition::parse(BEHAVIOR).expect("behaviour parses");
        let scene = SceneDefinition::parse(SCENE).expect("scene parses");
        assert!(behavior.routes[0].cyclic);
        assert!(behavior.check_references(&scene).is_ok());
    }

    #[rstest]
    #[case("[[agent]]\nprofile = \"ghost\"\nposition = [0.0, 0.0]", "unknown profile")]
    #[case("[[profile]]\nname = \"w\"\n", "no agents")]
    #[case(
        "[[profile]]\nname = \"w\"\nradius = -1.0\n[[agent]]\nprofile = \"w\"\nposition = [0.0, 0.0]",
        "radius"
    )]
    #[case(
        "[[profile]]\nname = \"w\"\npref_speed = 3.0\nmax_speed = 1.0\n[[agent]]\nprofile = \"w\"\nposition = [0.0, 0.0]",
        "pref_speed"
    )]
    #[case("[[agents]]\nprofile = \"w\"", "unknown field")]
    fn invalid_scenes_are_rejected(#[case] text: &str, #[case] needle: &str) {
        let err = SceneDefinition::parse(text).expect_err("scene must be rejected");
        assert!(err.contains(needle), "`{err}` should mention `{needle}`");
    }

    #[rstest]
    fn dangling_route_reference_is_reported() {
        let scene = SceneDefinition::parse(SCENE).expect("scene parses");
        let behavior = BehaviorDefinition::parse("").expect("empty behaviour parses");
        let err = behavior
            .check_references(&scene)
            .expect_err("route `loop` is missing");
        assert!(err.contains("loop"));
    }

    #[rstest]
    fn empty_route_is_rejected() {
        let err = BehaviorDefinition::parse("[[route]]\nname = \"r\"\nwaypoints = []")
            .expect_err("empty route");
        assert!(err.contains("no waypoints"));
    }

    #[rstest]
    fn missing_file_is_an_engine_load_error() {
        let err = SceneDefinition::load(Path::new("/definitely/not/here.toml"))
            .expect_err("missing file");
        assert!(matches!(err, CrowdError::EngineLoad { .. }));
    }
}
