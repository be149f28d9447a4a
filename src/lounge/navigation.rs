//! Pathfinding oracle used by the lounge.
//!
//! The lounge only needs to know whether an agent can be sent somewhere,
//! whether its path is still being computed and how far it has left to go.
//! An engine integration implements [`Navigator`] on top of its navigation
//! mesh; [`StraightLineNavigator`] is the headless stand-in.

use glam::Vec3;
use std::collections::HashMap;

use crate::core::types::AgentId;

#[derive(Debug, Clone, PartialEq)]
pub enum NavError {
    /// The navigator has never seen this agent
    UnknownAgent(AgentId),
    /// The agent is not standing on a navigable surface
    OffMesh(AgentId),
}

impl std::fmt::Display for NavError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NavError::UnknownAgent(agent) => write!(f, "Unknown agent {}", agent),
            NavError::OffMesh(agent) => write!(f, "Agent {} is off the navigation mesh", agent),
        }
    }
}

impl std::error::Error for NavError {}

pub trait Navigator {
    /// Register an agent at a position
    fn place(&mut self, agent: AgentId, at: Vec3);

    /// Start (or restart) a path towards `target`
    fn set_destination(&mut self, agent: AgentId, target: Vec3) -> Result<(), NavError>;

    /// True while the path is still being computed
    fn path_pending(&self, agent: AgentId) -> bool;

    /// Distance left along the current path; `None` for unknown agents
    fn remaining_distance(&self, agent: AgentId) -> Option<f32>;

    fn position(&self, agent: AgentId) -> Option<Vec3>;

    /// Teleport without pathing and drop the current destination
    fn warp(&mut self, agent: AgentId, to: Vec3);

    fn remove(&mut self, agent: AgentId);

    /// Move agents along their paths. Engines that move agents themselves
    /// leave this empty.
    fn advance(&mut self, _dt_secs: f32) {}
}

#[derive(Debug, Clone)]
struct Body {
    position: Vec3,
    destination: Option<Vec3>,
    pending_ticks: u32,
    jammed: bool,
    requests: u32,
}

/// Moves agents in a straight line at constant speed.
///
/// Supports scripted failures for exercising the retry and watchdog paths:
/// refusing the next N path requests of an agent, and jamming an agent in
/// place until its path is re-issued.
#[derive(Debug, Clone)]
pub struct StraightLineNavigator {
    speed: f32,
    path_delay_ticks: u32,
    bodies: HashMap<AgentId, Body>,
    refusals: HashMap<AgentId, u32>,
}

impl StraightLineNavigator {
    pub fn new(speed: f32) -> Self {
        Self {
            speed,
            path_delay_ticks: 0,
            bodies: HashMap::new(),
            refusals: HashMap::new(),
        }
    }

    /// Paths stay pending for this many `advance` calls
    pub fn with_path_delay_ticks(mut self, ticks: u32) -> Self {
        self.path_delay_ticks = ticks;
        self
    }

    /// Refuse the next `count` path requests of `agent` as off-mesh
    pub fn refuse_paths(&mut self, agent: AgentId, count: u32) {
        self.refusals.insert(agent, count);
    }

    /// Stop `agent` in place until its destination is set again
    pub fn jam(&mut self, agent: AgentId) {
        if let Some(body) = self.bodies.get_mut(&agent) {
            body.jammed = true;
        }
    }

    /// Successful path requests issued for `agent`
    pub fn requests(&self, agent: AgentId) -> u32 {
        self.bodies.get(&agent).map_or(0, |body| body.requests)
    }

    pub fn agent_count(&self) -> usize {
        self.bodies.len()
    }
}

impl Navigator for StraightLineNavigator {
    fn place(&mut self, agent: AgentId, at: Vec3) {
        self.bodies.insert(
            agent,
            Body {
                position: at,
                destination: None,
                pending_ticks: 0,
                jammed: false,
                requests: 0,
            },
        );
    }

    fn set_destination(&mut self, agent: AgentId, target: Vec3) -> Result<(), NavError> {
        if let Some(remaining) = self.refusals.get_mut(&agent) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(NavError::OffMesh(agent));
            }
        }

        let body = self
            .bodies
            .get_mut(&agent)
            .ok_or(NavError::UnknownAgent(agent))?;
        body.destination = Some(target);
        body.pending_ticks = self.path_delay_ticks;
        body.jammed = false;
        body.requests += 1;
        Ok(())
    }

    fn path_pending(&self, agent: AgentId) -> bool {
        self.bodies
            .get(&agent)
            .map_or(false, |body| body.pending_ticks > 0)
    }

    fn remaining_distance(&self, agent: AgentId) -> Option<f32> {
        self.bodies.get(&agent).map(|body| {
            body.destination
                .map_or(0.0, |destination| body.position.distance(destination))
        })
    }

    fn position(&self, agent: AgentId) -> Option<Vec3> {
        self.bodies.get(&agent).map(|body| body.position)
    }

    fn warp(&mut self, agent: AgentId, to: Vec3) {
        if let Some(body) = self.bodies.get_mut(&agent) {
            body.position = to;
            body.destination = None;
            body.pending_ticks = 0;
        }
    }

    fn remove(&mut self, agent: AgentId) {
        self.bodies.remove(&agent);
        self.refusals.remove(&agent);
    }

    fn advance(&mut self, dt_secs: f32) {
        let step = self.speed * dt_secs.max(0.0);
        for body in self.bodies.values_mut() {
            if body.pending_ticks > 0 {
                body.pending_ticks -= 1;
                continue;
            }
            if body.jammed {
                continue;
            }
            let Some(destination) = body.destination else {
                continue;
            };
            let to_go = destination - body.position;
            let distance = to_go.length();
            if distance <= step {
                body.position = destination;
            } else {
                body.position += to_go / distance * step;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moves_towards_destination() {
        let mut nav = StraightLineNavigator::new(2.0);
        let agent = AgentId(1);
        nav.place(agent, Vec3::ZERO);
        nav.set_destination(agent, Vec3::new(10.0, 0.0, 0.0)).unwrap();

        nav.advance(1.0);
        assert_eq!(nav.position(agent), Some(Vec3::new(2.0, 0.0, 0.0)));
        assert_eq!(nav.remaining_distance(agent), Some(8.0));

        nav.advance(10.0);
        assert_eq!(nav.position(agent), Some(Vec3::new(10.0, 0.0, 0.0)));
        assert_eq!(nav.remaining_distance(agent), Some(0.0));
    }

    #[test]
    fn test_pending_paths_hold_position() {
        let mut nav = StraightLineNavigator::new(1.0).with_path_delay_ticks(2);
        let agent = AgentId(1);
        nav.place(agent, Vec3::ZERO);
        nav.set_destination(agent, Vec3::X * 5.0).unwrap();

        assert!(nav.path_pending(agent));
        nav.advance(1.0);
        nav.advance(1.0);
        assert!(!nav.path_pending(agent));
        assert_eq!(nav.position(agent), Some(Vec3::ZERO));

        nav.advance(1.0);
        assert_eq!(nav.position(agent), Some(Vec3::X));
    }

    #[test]
    fn test_refused_paths_then_success() {
        let mut nav = StraightLineNavigator::new(1.0);
        let agent = AgentId(3);
        nav.place(agent, Vec3::ZERO);
        nav.refuse_paths(agent, 2);

        assert_eq!(nav.set_destination(agent, Vec3::X), Err(NavError::OffMesh(agent)));
        assert_eq!(nav.set_destination(agent, Vec3::X), Err(NavError::OffMesh(agent)));
        assert!(nav.set_destination(agent, Vec3::X).is_ok());
        assert_eq!(nav.requests(agent), 1);
    }

    #[test]
    fn test_unknown_agent() {
        let mut nav = StraightLineNavigator::new(1.0);
        assert_eq!(
            nav.set_destination(AgentId(9), Vec3::X),
            Err(NavError::UnknownAgent(AgentId(9)))
        );
        assert_eq!(nav.remaining_distance(AgentId(9)), None);
    }

    #[test]
    fn test_jam_clears_on_new_destination() {
        let mut nav = StraightLineNavigator::new(1.0);
        let agent = AgentId(1);
        nav.place(agent, Vec3::ZERO);
        nav.set_destination(agent, Vec3::X * 4.0).unwrap();
        nav.jam(agent);

        nav.advance(1.0);
        assert_eq!(nav.position(agent), Some(Vec3::ZERO));

        nav.set_destination(agent, Vec3::X * 4.0).unwrap();
        nav.advance(1.0);
        assert_eq!(nav.position(agent), Some(Vec3::X));
    }

    #[test]
    fn test_warp_drops_destination() {
        let mut nav = StraightLineNavigator::new(1.0);
        let agent = AgentId(1);
        nav.place(agent, Vec3::ZERO);
        nav.set_destination(agent, Vec3::X * 4.0).unwrap();
        nav.warp(agent, Vec3::Z);

        nav.advance(1.0);
        assert_eq!(nav.position(agent), Some(Vec3::Z));
    }
}
