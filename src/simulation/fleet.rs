//! Vehicle spawning, gating and retirement
//!
//! The fleet manager owns every live vehicle. Each tick it may spawn one
//! vehicle, orders the fleet per edge, derives which edges are blocked and
//! steps every vehicle leader-first through a composite entry gate.

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

use super::config::{component_rng, FleetConfig};
use super::engine::{Engine, SimulationState};
use super::road_network::RoadNetwork;
use super::signals::SignalController;
use super::spatial_index::{EdgeOrdering, SpatialIndex};
use super::types::{Edge, EdgeId, Node, NodeId, VehicleId};
use super::vehicle::{EntryGate, LeaderState, StepOutcome, Vehicle};

/// Name the fleet registers under with the engine
pub const FLEET_AGENT: &str = "vehicle_spawner";

#[derive(Debug, Error, PartialEq)]
pub enum RouteError {
    #[error("network must contain edges to build a route")]
    EmptyNetwork,
    #[error("network has no nodes to start a route from")]
    NoNodes,
    #[error("no outbound edges from {0} to continue route")]
    DeadEnd(NodeId),
    #[error("route from {start} to {destination} exceeded {limit} steps")]
    StepLimit {
        start: NodeId,
        destination: NodeId,
        limit: usize,
    },
}

/// What happened to the fleet during one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FleetTickReport {
    pub spawned: Option<VehicleId>,
    /// Vehicles that arrived and were removed this tick
    pub arrived: Vec<VehicleId>,
}

/// Entry gate composed from capacity, gridlock, closures and signals
///
/// Built from the fleet's per-tick state; every check must pass.
pub struct FleetGate<'a> {
    pub occupancy: &'a HashMap<EdgeId, usize>,
    pub blocked: &'a HashSet<EdgeId>,
    pub closed: &'a HashSet<EdgeId>,
    pub signals: Option<&'a SignalController>,
}

impl EntryGate for FleetGate<'_> {
    fn can_enter(&self, current: &Edge, next: &Edge) -> bool {
        let occupancy = self.occupancy.get(&next.id).copied().unwrap_or(0);
        if !next.has_room(occupancy) {
            return false;
        }
        if self.blocked.contains(&next.id) || self.closed.contains(&next.id) {
            return false;
        }
        match self.signals {
            Some(signals) => signals.can_enter(current, next),
            None => true,
        }
    }
}

#[derive(Debug)]
pub struct FleetManager {
    config: FleetConfig,
    vehicles: BTreeMap<VehicleId, Vehicle>,
    spatial_index: SpatialIndex,
    /// Occupancy recorded at the start of the most recent tick
    last_queue_lengths: HashMap<EdgeId, usize>,
    rng: StdRng,
    tick_counter: u64,
    next_id: usize,
    total_spawned: usize,
    total_arrived: usize,
}

impl Default for FleetManager {
    fn default() -> Self {
        Self::new(FleetConfig::default())
    }
}

impl FleetManager {
    pub fn new(mut config: FleetConfig) -> Self {
        config.spawn_interval = config.spawn_interval.max(1);
        let rng = component_rng(config.seed);
        Self {
            config,
            vehicles: BTreeMap::new(),
            spatial_index: SpatialIndex::default(),
            last_queue_lengths: HashMap::new(),
            rng,
            tick_counter: 0,
            next_id: 0,
            total_spawned: 0,
            total_arrived: 0,
        }
    }

    /// A fleet that never spawns; vehicles are inserted by hand
    pub fn idle() -> Self {
        Self::new(FleetConfig {
            max_vehicles: 0,
            ..FleetConfig::default()
        })
    }

    pub fn with_spatial_index(mut self, spatial_index: SpatialIndex) -> Self {
        self.spatial_index = spatial_index;
        self
    }

    /// Register the fleet's tick with the engine, every tick from tick 0
    pub fn register(engine: &mut Engine) {
        let dt = engine.config().tick_duration;
        engine.register_agent(
            FLEET_AGENT,
            move |state: &mut SimulationState, tick| {
                let SimulationState {
                    network,
                    fleet,
                    signals,
                    closed_edges,
                    ..
                } = state;
                fleet.tick(network, signals.as_ref(), closed_edges, tick, dt);
                Ok(())
            },
            0,
            1,
        );
    }

    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    pub fn vehicles(&self) -> &BTreeMap<VehicleId, Vehicle> {
        &self.vehicles
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(&id)
    }

    pub fn vehicle_mut(&mut self, id: VehicleId) -> Option<&mut Vehicle> {
        self.vehicles.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn last_queue_lengths(&self) -> &HashMap<EdgeId, usize> {
        &self.last_queue_lengths
    }

    pub fn total_spawned(&self) -> usize {
        self.total_spawned
    }

    pub fn total_arrived(&self) -> usize {
        self.total_arrived
    }

    pub fn spawn_interval(&self) -> u32 {
        self.config.spawn_interval
    }

    /// Returns the interval actually applied (at least 1)
    pub fn set_spawn_interval(&mut self, interval: u32) -> u32 {
        self.config.spawn_interval = interval.max(1);
        self.config.spawn_interval
    }

    /// Add a pre-built vehicle to the fleet, replacing any with the same ID
    pub fn insert_vehicle(&mut self, vehicle: Vehicle) {
        self.next_id = self.next_id.max(vehicle.id.0 + 1);
        self.vehicles.insert(vehicle.id, vehicle);
    }

    fn choose_destination(&mut self, network: &RoadNetwork) -> Option<NodeId> {
        match &self.config.destinations {
            Some(destinations) if !destinations.is_empty() => {
                destinations.choose(&mut self.rng).copied()
            }
            _ => network.nodes().choose(&mut self.rng).map(|node| node.id),
        }
    }

    /// Build a route by a directionally biased greedy walk toward `destination`
    ///
    /// At each node the walk prefers edges that close the column gap, then the
    /// row gap, and otherwise takes any outgoing edge.
    pub fn build_route(
        &mut self,
        network: &RoadNetwork,
        destination: NodeId,
    ) -> Result<Vec<Edge>, RouteError> {
        if network.edge_count() == 0 {
            return Err(RouteError::EmptyNetwork);
        }

        let start = network
            .nodes()
            .choose(&mut self.rng)
            .map(|node| node.id)
            .ok_or(RouteError::NoNodes)?;
        let target = network.node(destination).and_then(Node::grid_coords);

        let mut route = Vec::new();
        let mut current = start;
        while current != destination {
            if route.len() >= self.config.max_route_steps {
                return Err(RouteError::StepLimit {
                    start,
                    destination,
                    limit: self.config.max_route_steps,
                });
            }

            let outgoing = network.outgoing(current);
            let here = network.node(current).and_then(Node::grid_coords);
            let mut options = match (here, target) {
                (Some(here), Some(target)) => directional_options(network, &outgoing, here, target),
                _ => Vec::new(),
            };
            if options.is_empty() {
                options = outgoing;
            }

            let edge = **options
                .choose(&mut self.rng)
                .ok_or(RouteError::DeadEnd(current))?;
            route.push(edge);
            current = edge.to;
        }

        if route.is_empty() {
            let edge = network
                .edges()
                .choose(&mut self.rng)
                .ok_or(RouteError::EmptyNetwork)?;
            route.push(*edge);
        }

        Ok(route)
    }

    /// Spawn one vehicle with a fresh route and random patience
    pub fn spawn_vehicle(&mut self, network: &RoadNetwork) -> Result<VehicleId, RouteError> {
        let destination = self
            .choose_destination(network)
            .ok_or(RouteError::NoNodes)?;
        let route = self.build_route(network, destination)?;

        let (low, high) = self.config.patience_range;
        let patience = if high > low {
            self.rng.random_range(low..=high)
        } else {
            low
        };

        let id = VehicleId(self.next_id);
        self.next_id += 1;
        self.total_spawned += 1;
        debug!(
            "Spawned {} toward {} over {} edges (patience {:.2})",
            id,
            destination,
            route.len(),
            patience
        );
        self.vehicles
            .insert(id, Vehicle::new(id, route, destination, patience));
        Ok(id)
    }

    /// Edges whose exit is obstructed by a vehicle already stuck there
    fn blocked_edges(&self) -> HashSet<EdgeId> {
        self.vehicles
            .values()
            .filter(|vehicle| !vehicle.arrived && vehicle.obstructs_exit())
            .filter_map(Vehicle::current_edge_id)
            .collect()
    }

    /// Spawn, order, gate and step the whole fleet for one tick
    pub fn tick(
        &mut self,
        network: &RoadNetwork,
        signals: Option<&SignalController>,
        closed_edges: &HashSet<EdgeId>,
        tick: u64,
        dt: f32,
    ) -> FleetTickReport {
        let mut report = FleetTickReport::default();

        let spawn_due = self.tick_counter % u64::from(self.config.spawn_interval) == 0;
        if spawn_due && self.vehicles.len() < self.config.max_vehicles {
            match self.spawn_vehicle(network) {
                Ok(id) => report.spawned = Some(id),
                Err(err) => warn!("Spawn skipped at tick {}: {}", tick, err),
            }
        }
        self.tick_counter += 1;

        let EdgeOrdering {
            queues,
            mut occupancy,
        } = self.spatial_index.build(self.vehicles.values());
        self.last_queue_lengths = occupancy.clone();
        let mut blocked = self.blocked_edges();

        for queue in queues.values() {
            let mut leader: Option<LeaderState> = None;
            for id in queue {
                let Some(vehicle) = self.vehicles.get_mut(id) else {
                    continue;
                };

                let before = vehicle.current_edge_id();
                let gate = FleetGate {
                    occupancy: &occupancy,
                    blocked: &blocked,
                    closed: closed_edges,
                    signals,
                };
                let outcome = vehicle.step(dt, leader.as_ref(), Some(&gate));
                let after = vehicle.current_edge_id();

                if let Some(before) = before {
                    if outcome == StepOutcome::Arrived || after != Some(before) {
                        if let Some(count) = occupancy.get_mut(&before) {
                            *count = count.saturating_sub(1);
                        }
                    }
                    if outcome != StepOutcome::Arrived && after != Some(before) {
                        if let Some(after) = after {
                            *occupancy.entry(after).or_insert(0) += 1;
                        }
                    }
                }

                if vehicle.stuck {
                    if let Some(edge) = after {
                        blocked.insert(edge);
                    }
                }

                leader = LeaderState::of(vehicle);
            }
        }

        self.vehicles.retain(|id, vehicle| {
            if vehicle.arrived {
                report.arrived.push(*id);
            }
            !vehicle.arrived
        });
        for id in &report.arrived {
            debug!("{} arrived at tick {}", id, tick);
        }
        self.total_arrived += report.arrived.len();

        report
    }
}

/// Outgoing edges that move one grid step closer to `target`, columns first
fn directional_options<'a>(
    network: &RoadNetwork,
    outgoing: &[&'a Edge],
    (row, col): (i32, i32),
    (target_row, target_col): (i32, i32),
) -> Vec<&'a Edge> {
    let mut wanted = Vec::with_capacity(2);
    if target_col != col {
        wanted.push((row, col + (target_col - col).signum()));
    }
    if target_row != row {
        wanted.push((row + (target_row - row).signum(), col));
    }

    let mut options = Vec::new();
    for coords in wanted {
        for edge in outgoing {
            if network.node(edge.to).and_then(Node::grid_coords) == Some(coords) {
                options.push(*edge);
            }
        }
    }
    options
}
