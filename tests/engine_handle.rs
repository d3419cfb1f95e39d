//! Loading the built-in engine from scene and behaviour files.

use std::fs;

use crowd_bridge::{CrowdError, SimulationEngineHandle};
use rstest::rstest;
use test_utils::{LobbyResources, LOBBY_BEHAVIOR};

#[rstest]
fn lobby_population_matches_the_scene() {
    let resources = LobbyResources::new();
    let handle =
        SimulationEngineHandle::initialize(resources.path(), "behavior.toml", "scene.toml", 0.1)
            .expect("lobby loads");
    assert_eq!(handle.agent_count(), 4);
    assert_eq!(handle.type_tag(0).as_deref(), Some("robot"));
    assert_eq!(handle.type_tag(1).as_deref(), Some("visitor"));
    assert_eq!(handle.agent_name(3).as_deref(), Some("lobby_guard"));
    assert!(handle.agent_name(1).is_none());
    assert!(handle.sim_time().abs() < f64::EPSILON);
}

#[rstest]
#[case("behavior.toml", "absent.toml")]
#[case("absent.toml", "scene.toml")]
fn missing_files_are_engine_load_errors(#[case] behavior: &str, #[case] scene: &str) {
    let resources = LobbyResources::new();
    let err = SimulationEngineHandle::initialize(resources.path(), behavior, scene, 0.1)
        .expect_err("missing file must fail");
    assert!(
        matches!(err, CrowdError::EngineLoad { ref resource, .. } if resource.ends_with("absent.toml")),
        "unexpected error {err:?}"
    );
}

#[rstest]
#[case(0.0)]
#[case(-1.0)]
fn non_positive_timestep_is_rejected_before_loading(#[case] timestep: f64) {
    let resources = LobbyResources::new();
    let err = SimulationEngineHandle::initialize(resources.path(), "nope", "nope", timestep)
        .expect_err("timestep must be rejected");
    assert!(matches!(err, CrowdError::Configuration { .. }));
}

#[rstest]
fn unknown_route_is_an_engine_load_error() {
    let resources = LobbyResources::new();
    let behavior = LOBBY_BEHAVIOR.replace("lobby_loop", "elsewhere");
    fs::write(resources.path().join("behavior.toml"), behavior).expect("rewrite behaviour");
    let err = SimulationEngineHandle::initialize(resources.path(), "behavior.toml", "scene.toml", 0.1)
        .expect_err("dangling route must fail");
    assert!(matches!(err, CrowdError::EngineLoad { .. }));
}

#[rstest]
fn stepping_accumulates_simulated_time() {
    let resources = LobbyResources::new();
    let mut handle =
        SimulationEngineHandle::initialize(resources.path(), "behavior.toml", "scene.toml", 0.05)
            .expect("lobby loads");
    for _ in 0..20 {
        handle.step();
    }
    assert!((handle.sim_time() - 1.0).abs() < 1e-9);
}
