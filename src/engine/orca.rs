//! Built-in reciprocal collision-avoidance engine.
//!
//! Each step every free agent picks a preferred velocity toward its next
//! waypoint, builds one ORCA half-plane per nearby agent and projects the
//! preferred velocity onto the violated half-planes. Pinned agents (those
//! overwritten by the host) are not planned or integrated; their velocity
//! is estimated from how far the host moved them since the previous step.

use glam::{DVec2, DVec3};
use log::trace;

use super::definitions::{BehaviorDefinition, Profile, Route, SceneDefinition};
use super::{AgentState, CrowdEngine};
use crate::numeric::distance_key;
use crate::vector_math::{clamp_length, det, heading_from_yaw, moving_heading};
use crate::{ARRIVAL_SLOWDOWN_DISTANCE, RECIPROCAL_RESPONSIBILITY};

#[derive(Debug, Clone, Copy)]
struct Params {
    radius: f64,
    max_speed: f64,
    pref_speed: f64,
    neighbor_dist: f64,
    max_neighbors: usize,
    time_horizon: f64,
}

impl From<&Profile> for Params {
    fn from(profile: &Profile) -> Self {
        Self {
            radius: profile.radius,
            max_speed: profile.max_speed,
            pref_speed: profile.pref_speed,
            neighbor_dist: profile.neighbor_dist,
            max_neighbors: profile.max_neighbors,
            time_horizon: profile.time_horizon,
        }
    }
}

#[derive(Debug, Clone)]
struct RouteProgress {
    waypoints: Vec<DVec2>,
    cyclic: bool,
    arrival_radius: f64,
    next: usize,
    finished: bool,
}

impl RouteProgress {
    fn new(route: &Route) -> Self {
        Self {
            waypoints: route
                .waypoints
                .iter()
                .map(|&[x, y]| DVec2::new(x, y))
                .collect(),
            cyclic: route.cyclic,
            arrival_radius: route.arrival_radius,
            next: 0,
            finished: false,
        }
    }

    fn is_last(&self) -> bool {
        self.next + 1 >= self.waypoints.len()
    }

    fn advance(&mut self) {
        if !self.is_last() {
            self.next += 1;
        } else if self.cyclic {
            self.next = 0;
        } else {
            self.finished = true;
        }
    }

    /// Velocity toward the current waypoint, skipping waypoints already reached.
    fn preferred_velocity(&mut self, position: DVec2, pref_speed: f64) -> DVec2 {
        // Bounded so a route whose waypoints all lie inside the arrival
        // radius cannot spin forever.
        for _ in 0..=self.waypoints.len() {
            if self.finished {
                return DVec2::ZERO;
            }
            let Some(&target) = self.waypoints.get(self.next) else {
                return DVec2::ZERO;
            };
            let to_target = target - position;
            let distance = to_target.length();
            if distance <= self.arrival_radius {
                self.advance();
                continue;
            }
            let mut speed = pref_speed;
            if !self.cyclic && self.is_last() {
                speed *= (distance / ARRIVAL_SLOWDOWN_DISTANCE).min(1.0);
            }
            return to_target / distance * speed;
        }
        DVec2::ZERO
    }
}

#[derive(Debug, Clone)]
struct OrcaAgent {
    params: Params,
    type_tag: String,
    name: Option<String>,
    position: DVec2,
    elevation: f64,
    velocity: DVec2,
    orientation: DVec2,
    route: Option<RouteProgress>,
    pinned: bool,
    /// Position at the end of the previous step.
    stepped_position: DVec2,
}

impl OrcaAgent {
    fn state(&self) -> AgentState {
        AgentState {
            position: self.position.extend(self.elevation),
            velocity: self.velocity.extend(0.0),
            orientation: self.orientation,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct HalfPlane {
    point: DVec2,
    direction: DVec2,
}

/// ORCA planner over the agents declared by a scene.
#[derive(Debug, Clone)]
pub struct OrcaEngine {
    agents: Vec<OrcaAgent>,
}

impl OrcaEngine {
    /// Builds the initial population from validated definitions.
    ///
    /// # Errors
    /// Returns a description if an agent references an unknown profile or
    /// route.
    pub fn new(scene: &SceneDefinition, behavior: &BehaviorDefinition) -> Result<Self, String> {
        behavior.check_references(scene)?;
        let routes = behavior.routes_by_name();
        let agents = scene
            .agents
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                let profile = scene
                    .profile(&spec.profile)
                    .ok_or_else(|| format!("agent {index}: unknown profile `{}`", spec.profile))?;
                let route = match &spec.route {
                    Some(name) => Some(RouteProgress::new(routes.get(name.as_str()).ok_or_else(
                        || format!("agent {index}: unknown route `{name}`"),
                    )?)),
                    None => None,
                };
                let [x, y] = spec.position;
                let position = DVec2::new(x, y);
                Ok(OrcaAgent {
                    params: Params::from(profile),
                    type_tag: profile.type_tag().to_owned(),
                    name: spec.name.clone(),
                    position,
                    elevation: spec.elevation,
                    velocity: DVec2::ZERO,
                    orientation: DVec2::X,
                    route,
                    pinned: false,
                    stepped_position: position,
                })
            })
            .collect::<Result<Vec<_>, String>>()?;
        Ok(Self { agents })
    }

    fn neighbours(&self, index: usize, agent: &OrcaAgent) -> Vec<usize> {
        let range_sq = agent.params.neighbor_dist * agent.params.neighbor_dist;
        let mut found: Vec<_> = self
            .agents
            .iter()
            .enumerate()
            .filter(|&(other, _)| other != index)
            .map(|(other, neighbour)| {
                (agent.position.distance_squared(neighbour.position), other)
            })
            .filter(|&(dist_sq, _)| dist_sq < range_sq)
            .collect();
        found.sort_by_key(|&(dist_sq, other)| (distance_key(dist_sq), other));
        found.truncate(agent.params.max_neighbors);
        found.into_iter().map(|(_, other)| other).collect()
    }

    fn half_plane(agent: &OrcaAgent, other: &OrcaAgent, dt: f64) -> HalfPlane {
        let rel_pos = other.position - agent.position;
        let rel_vel = agent.velocity - other.velocity;
        let dist_sq = rel_pos.length_squared();
        let combined = agent.params.radius + other.params.radius;
        let combined_sq = combined * combined;
        let inv_horizon = agent.params.time_horizon.recip();

        let (direction, u) = if dist_sq > combined_sq {
            let w = rel_vel - rel_pos * inv_horizon;
            let w_len_sq = w.length_squared();
            let dot = w.dot(rel_pos);
            if dot < 0.0 && dot * dot > combined_sq * w_len_sq {
                // Project on the cut-off circle.
                let w_len = w_len_sq.sqrt();
                let unit_w = w / w_len;
                (
                    DVec2::new(unit_w.y, -unit_w.x),
                    unit_w * (combined * inv_horizon - w_len),
                )
            } else {
                // Project on a leg of the velocity obstacle.
                let leg = (dist_sq - combined_sq).sqrt();
                let direction = if det(rel_pos, w) > 0.0 {
                    DVec2::new(
                        rel_pos.x * leg - rel_pos.y * combined,
                        rel_pos.x * combined + rel_pos.y * leg,
                    ) / dist_sq
                } else {
                    -DVec2::new(
                        rel_pos.x * leg + rel_pos.y * combined,
                        -rel_pos.x * combined + rel_pos.y * leg,
                    ) / dist_sq
                };
                (direction, direction * rel_vel.dot(direction) - rel_vel)
            }
        } else {
            // Already overlapping: resolve within one step.
            let inv_dt = dt.recip();
            let w = rel_vel - rel_pos * inv_dt;
            let w_len = w.length();
            let unit_w = w
                .try_normalize()
                .or_else(|| (-rel_pos).try_normalize())
                .unwrap_or(DVec2::X);
            (
                DVec2::new(unit_w.y, -unit_w.x),
                unit_w * (combined * inv_dt - w_len),
            )
        };

        let responsibility = if other.pinned {
            1.0
        } else {
            RECIPROCAL_RESPONSIBILITY
        };
        HalfPlane {
            point: agent.velocity + u * responsibility,
            direction,
        }
    }

    fn solve(preferred: DVec2, planes: &[HalfPlane], max_speed: f64) -> DVec2 {
        let mut velocity = clamp_length(preferred, max_speed);
        for plane in planes {
            if det(plane.direction, plane.point - velocity) > 0.0 {
                velocity = plane.point + plane.direction * plane.direction.dot(velocity - plane.point);
            }
        }
        clamp_length(velocity, max_speed)
    }
}

impl CrowdEngine for OrcaEngine {
    fn agent_count(&self) -> usize {
        self.agents.len()
    }

    fn agent_state(&self, index: usize) -> Option<AgentState> {
        self.agents.get(index).map(OrcaAgent::state)
    }

    fn type_tag(&self, index: usize) -> Option<String> {
        self.agents.get(index).map(|a| a.type_tag.clone())
    }

    fn agent_name(&self, index: usize) -> Option<String> {
        self.agents.get(index).and_then(|a| a.name.clone())
    }

    fn step(&mut self, dt: f64) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }

        for agent in self.agents.iter_mut().filter(|a| a.pinned) {
            agent.velocity = (agent.position - agent.stepped_position) / dt;
        }

        let mut planned = Vec::with_capacity(self.agents.len());
        for (index, agent) in self.agents.iter().enumerate() {
            if agent.pinned {
                planned.push(None);
                continue;
            }
            let mut route = agent.route.clone();
            let preferred = route.as_mut().map_or(DVec2::ZERO, |r| {
                r.preferred_velocity(agent.position, agent.params.pref_speed)
            });
            let planes: Vec<_> = self
                .neighbours(index, agent)
                .into_iter()
                .filter_map(|other| self.agents.get(other))
                .map(|other| Self::half_plane(agent, other, dt))
                .collect();
            let velocity = Self::solve(preferred, &planes, agent.params.max_speed);
            trace!(
                "agent {index}: preferred {preferred:?}, planned {velocity:?} against {} neighbours",
                planes.len()
            );
            planned.push(Some((velocity, route)));
        }

        for (agent, plan) in self.agents.iter_mut().zip(planned) {
            if let Some((velocity, route)) = plan {
                agent.velocity = velocity;
                agent.route = route;
                agent.position += velocity * dt;
                if let Some(yaw) = moving_heading(velocity.extend(0.0)) {
                    agent.orientation = heading_from_yaw(yaw);
                }
            }
            agent.stepped_position = agent.position;
        }
    }

    fn overwrite_agent(&mut self, index: usize, position: DVec3, heading: DVec2) -> bool {
        let Some(agent) = self.agents.get_mut(index) else {
            return false;
        };
        agent.position = position.truncate();
        agent.elevation = position.z;
        if let Some(unit) = heading.try_normalize() {
            agent.orientation = unit;
        }
        if !agent.pinned {
            // Start velocity estimation from the pinned location.
            agent.stepped_position = agent.position;
            agent.pinned = true;
        }
        true
    }

    fn release_agent(&mut self, index: usize) -> bool {
        let Some(agent) = self.agents.get_mut(index) else {
            return false;
        };
        agent.pinned = false;
        agent.stepped_position = agent.position;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::{fixture, rstest};

    fn engine(scene: &str, behavior: &str) -> OrcaEngine {
        let scene = SceneDefinition::parse(scene).expect("scene parses");
        let behavior = BehaviorDefinition::parse(behavior).expect("behaviour parses");
        OrcaEngine::new(&scene, &behavior).expect("engine builds")
    }

    #[fixture]
    fn walker() -> OrcaEngine {
        engine(
            r#"
            [[profile]]
            name = "walker"
            pref_speed = 1.0
            max_speed = 1.0

            [[agent]]
            profile = "walker"
            position = [0.0, 0.0]
            route = "east"
            "#,
            r#"
            [[route]]
            name = "east"
            waypoints = [[10.0, 0.0]]
            cyclic = false
            "#,
        )
    }

    #[rstest]
    fn free_agent_walks_toward_waypoint(mut walker: OrcaEngine) {
        walker.step(0.5);
        let state = walker.agent_state(0).expect("agent 0");
        assert_relative_eq!(state.position.x, 0.5, epsilon = 1e-9);
        assert_relative_eq!(state.velocity.x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(state.orientation.x, 1.0, epsilon = 1e-9);
    }

    #[rstest]
    fn agent_without_route_holds_position() {
        let mut idle = engine(
            "[[profile]]\nname = \"w\"\n[[agent]]\nprofile = \"w\"\nposition = [2.0, 3.0]",
            "",
        );
        idle.step(0.1);
        let state = idle.agent_state(0).expect("agent 0");
        assert_relative_eq!(state.position.x, 2.0);
        assert_relative_eq!(state.position.y, 3.0);
        assert_eq!(state.velocity, DVec3::ZERO);
    }

    #[rstest]
    fn final_waypoint_is_reached_and_held(mut walker: OrcaEngine) {
        for _ in 0..400 {
            walker.step(0.1);
        }
        let state = walker.agent_state(0).expect("agent 0");
        assert!((state.position.x - 10.0).abs() <= crate::DEFAULT_ARRIVAL_RADIUS + 1e-6);
        assert!(state.velocity.length() < 1e-9);
    }

    #[rstest]
    fn overwritten_agent_is_pinned_and_reports_estimated_velocity(mut walker: OrcaEngine) {
        assert!(walker.overwrite_agent(0, DVec3::new(1.0, 1.0, 0.2), DVec2::Y));
        walker.step(0.5);
        let state = walker.agent_state(0).expect("agent 0");
        assert_eq!(state.position, DVec3::new(1.0, 1.0, 0.2));
        assert_eq!(state.velocity, DVec3::ZERO);
        assert_eq!(state.orientation, DVec2::Y);

        assert!(walker.overwrite_agent(0, DVec3::new(2.0, 1.0, 0.2), DVec2::X));
        walker.step(0.5);
        let state = walker.agent_state(0).expect("agent 0");
        assert_relative_eq!(state.velocity.x, 2.0, epsilon = 1e-9);
    }

    #[rstest]
    fn released_agent_resumes_planning(mut walker: OrcaEngine) {
        walker.overwrite_agent(0, DVec3::new(5.0, 0.0, 0.0), DVec2::X);
        walker.step(0.1);
        assert!(walker.release_agent(0));
        walker.step(0.1);
        let state = walker.agent_state(0).expect("agent 0");
        assert!(state.position.x > 5.0);
    }

    #[rstest]
    fn unknown_indices_are_rejected(mut walker: OrcaEngine) {
        assert!(!walker.overwrite_agent(3, DVec3::ZERO, DVec2::X));
        assert!(!walker.release_agent(3));
        assert!(walker.agent_state(3).is_none());
        assert!(walker.type_tag(3).is_none());
    }

    #[rstest]
    fn head_on_agents_do_not_collide() {
        let mut pair = engine(
            r#"
            [[profile]]
            name = "w"
            radius = 0.3
            pref_speed = 1.0
            max_speed = 1.0

            [[agent]]
            profile = "w"
            position = [-3.0, 0.01]
            route = "east"

            [[agent]]
            profile = "w"
            position = [3.0, -0.01]
            route = "west"
            "#,
            r#"
            [[route]]
            name = "east"
            waypoints = [[3.0, 0.0]]
            cyclic = false

            [[route]]
            name = "west"
            waypoints = [[-3.0, 0.0]]
            cyclic = false
            "#,
        );
        let mut closest = f64::INFINITY;
        for _ in 0..100 {
            pair.step(0.1);
            let a = pair.agent_state(0).expect("a").position;
            let b = pair.agent_state(1).expect("b").position;
            closest = closest.min(a.distance(b));
        }
        assert!(closest > 0.45, "agents came within {closest}");
    }

    #[rstest]
    fn non_positive_dt_is_ignored(mut walker: OrcaEngine) {
        walker.step(0.0);
        walker.step(-1.0);
        let state = walker.agent_state(0).expect("agent 0");
        assert_eq!(state.position, DVec3::ZERO);
    }

    #[rstest]
    fn cyclic_route_wraps_to_first_waypoint() {
        let mut route = RouteProgress::new(&Route {
            name: "r".into(),
            waypoints: vec![[0.0, 0.0], [1.0, 0.0]],
            cyclic: true,
            arrival_radius: 0.1,
        });
        route.advance();
        route.advance();
        assert_eq!(route.next, 0);
        assert!(!route.finished);
    }
}
