//! Tunable defaults shared by the engine, the bridge and the host plugin.
//!
//! Planner values mirror common pedestrian parameters (metres, seconds,
//! metres per second) and are only used when a scene leaves them out.

/// Below this speed (m/s) an agent is treated as stationary and keeps its
/// previously reported heading.
pub const HEADING_SPEED_THRESHOLD: f64 = 1e-3;

/// Environment variable the binary consults when `resource_path` is absent.
pub const RESOURCE_PATH_ENV: &str = "CROWD_RESOURCE_PATH";

/// Prefix for host model names of internal agents without a declared name.
pub const INTERNAL_MODEL_PREFIX: &str = "agent";

/// Agent radius in metres.
pub const DEFAULT_AGENT_RADIUS: f64 = 0.25;
/// Speed cap in metres per second.
pub const DEFAULT_MAX_SPEED: f64 = 1.5;
/// Walking speed toward a waypoint.
pub const DEFAULT_PREF_SPEED: f64 = 1.2;
/// Neighbour search range in metres.
pub const DEFAULT_NEIGHBOR_DIST: f64 = 5.0;
/// Neighbours considered per agent.
pub const DEFAULT_MAX_NEIGHBORS: usize = 10;
/// Collision look-ahead in seconds.
pub const DEFAULT_TIME_HORIZON: f64 = 2.0;
/// Distance at which a waypoint counts as reached.
pub const DEFAULT_ARRIVAL_RADIUS: f64 = 0.3;

/// Share of the avoidance effort an agent takes against another planned
/// agent. External agents never react, so internal agents take all of it.
pub const RECIPROCAL_RESPONSIBILITY: f64 = 0.5;

/// Distance over which the preferred speed ramps down when approaching the
/// final waypoint of a non-cyclic route.
pub const ARRIVAL_SLOWDOWN_DISTANCE: f64 = 1.0;
