//! Traffic signal logic for the traffic simulation
//!
//! Every intersection carries a two-phase light. Movements are classified as
//! north/south or east/west from the grid coordinates of the edge endpoints.

use std::collections::HashMap;

use super::road_network::RoadNetwork;
use super::types::{Edge, Node, NodeId};
use super::vehicle::EntryGate;

/// The direction currently holding right of way
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    NorthSouth,
    EastWest,
}

impl Phase {
    pub fn flipped(self) -> Self {
        match self {
            Phase::NorthSouth => Phase::EastWest,
            Phase::EastWest => Phase::NorthSouth,
        }
    }
}

/// Phase durations in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseDurations {
    pub north_south: f32,
    pub east_west: f32,
}

impl PhaseDurations {
    pub fn new(north_south: f32, east_west: f32) -> Self {
        Self {
            north_south,
            east_west,
        }
    }

    pub fn for_phase(&self, phase: Phase) -> f32 {
        match phase {
            Phase::NorthSouth => self.north_south,
            Phase::EastWest => self.east_west,
        }
    }
}

/// A two-phase traffic light
#[derive(Debug, Clone)]
pub struct TrafficLight {
    pub phase_durations: PhaseDurations,
    pub current_phase: Phase,
    /// Time spent in the current phase
    pub elapsed: f32,
}

impl TrafficLight {
    pub fn new(phase_durations: PhaseDurations, start_phase: Phase) -> Self {
        Self {
            phase_durations,
            current_phase: start_phase,
            elapsed: 0.0,
        }
    }

    /// Advance the phase clock, flipping once the phase has run its course
    pub fn tick(&mut self, dt: f32) {
        self.elapsed += dt;
        let duration = self.phase_durations.for_phase(self.current_phase);
        if duration <= 0.0 {
            return;
        }
        if self.elapsed >= duration {
            self.elapsed = 0.0;
            self.current_phase = self.current_phase.flipped();
        }
    }

    pub fn allows(&self, orientation: Phase) -> bool {
        self.current_phase == orientation
    }
}

/// Owns one light per network node and answers entry queries
#[derive(Debug, Clone)]
pub struct SignalController {
    lights: HashMap<NodeId, TrafficLight>,
    nodes: HashMap<NodeId, Node>,
}

impl SignalController {
    pub fn new(network: &RoadNetwork, phase_durations: PhaseDurations, start_phase: Phase) -> Self {
        let nodes: HashMap<NodeId, Node> = network
            .nodes()
            .iter()
            .map(|node| (node.id, *node))
            .collect();
        let lights = nodes
            .keys()
            .map(|id| (*id, TrafficLight::new(phase_durations, start_phase)))
            .collect();

        Self { lights, nodes }
    }

    pub fn light(&self, node: NodeId) -> Option<&TrafficLight> {
        self.lights.get(&node)
    }

    pub fn light_mut(&mut self, node: NodeId) -> Option<&mut TrafficLight> {
        self.lights.get_mut(&node)
    }

    pub fn tick(&mut self, dt: f32) {
        for light in self.lights.values_mut() {
            light.tick(dt);
        }
    }

    /// Retime every light; phases and elapsed clocks are kept
    pub fn update_phase_durations(&mut self, phase_durations: PhaseDurations) {
        for light in self.lights.values_mut() {
            light.phase_durations = phase_durations;
        }
    }

    /// Orientation of a movement from `from` to `to`
    ///
    /// Grid row/column are compared first, falling back to y/x for nodes off
    /// the grid. Unknown nodes or identical coordinates count as NS.
    pub fn orientation(&self, from: NodeId, to: NodeId) -> Phase {
        let (Some(from), Some(to)) = (self.nodes.get(&from), self.nodes.get(&to)) else {
            return Phase::NorthSouth;
        };

        let row = |n: &Node| n.row.map_or(n.y, |row| row as f32);
        let col = |n: &Node| n.col.map_or(n.x, |col| col as f32);

        if row(from) != row(to) {
            Phase::NorthSouth
        } else if col(from) != col(to) {
            Phase::EastWest
        } else {
            Phase::NorthSouth
        }
    }

    pub fn can_enter(&self, current: &Edge, _next: &Edge) -> bool {
        match self.lights.get(&current.to) {
            Some(light) => light.allows(self.orientation(current.from, current.to)),
            None => true,
        }
    }
}

impl EntryGate for SignalController {
    fn can_enter(&self, current: &Edge, next: &Edge) -> bool {
        SignalController::can_enter(self, current, next)
    }
}
