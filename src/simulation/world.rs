//! Main simulation world that ties everything together
//!
//! Builds the network, signals and fleet from a `SimulationConfig`, registers
//! them with the engine and exposes host-facing controls and snapshots.

use anyhow::{Context, Result};
use log::info;
use std::collections::HashMap;

use super::config::SimulationConfig;
use super::engine::{Engine, SimulationState};
use super::fleet::FleetManager;
use super::grid::generate_grid_network;
use super::road_network::RoadNetwork;
use super::signals::{PhaseDurations, SignalController};
use super::types::{EdgeId, VehicleId};
use super::vehicle::Vehicle;

/// Smallest phase duration accepted from the host
pub const MIN_PHASE_DURATION: f32 = 1.0;

/// Read-only view of a vehicle for presentation
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleView {
    pub id: VehicleId,
    pub edge: Option<EdgeId>,
    pub position: f32,
    pub velocity: f32,
    pub arrived: bool,
    pub stuck: bool,
}

impl From<&Vehicle> for VehicleView {
    fn from(vehicle: &Vehicle) -> Self {
        Self {
            id: vehicle.id,
            edge: vehicle.current_edge_id(),
            position: vehicle.position,
            velocity: vehicle.velocity,
            arrived: vehicle.arrived,
            stuck: vehicle.stuck,
        }
    }
}

/// Immutable copy of the simulation taken between ticks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationSnapshot {
    /// Ticks completed so far
    pub tick: u64,
    pub vehicles: Vec<VehicleView>,
    pub queue_lengths: HashMap<EdgeId, usize>,
    pub closed_edges: Vec<EdgeId>,
    pub total_spawned: usize,
    pub total_arrived: usize,
}

impl SimulationSnapshot {
    pub fn stuck_vehicles(&self) -> usize {
        self.vehicles.iter().filter(|v| v.stuck).count()
    }

    pub fn average_speed(&self) -> f32 {
        if self.vehicles.is_empty() {
            return 0.0;
        }
        self.vehicles.iter().map(|v| v.velocity).sum::<f32>() / self.vehicles.len() as f32
    }
}

/// The main simulation world
pub struct Simulation {
    engine: Engine,
}

impl Simulation {
    /// Generate a grid network from the config and wire up the default agents
    pub fn new(config: SimulationConfig) -> Result<Self> {
        let network =
            generate_grid_network(&config.grid).context("Failed to generate grid network")?;
        Ok(Self::with_network(config, network))
    }

    /// Wire up signals (if configured) and the fleet over an existing network
    ///
    /// Signals are registered before the fleet so vehicles see this tick's phase.
    pub fn with_network(config: SimulationConfig, network: RoadNetwork) -> Self {
        let fleet = FleetManager::new(config.fleet.clone());
        let signals = config
            .signals
            .map(|s| SignalController::new(&network, s.phase_durations, s.start_phase));

        let mut state = SimulationState::new(network, fleet);
        state.signals = signals;

        let mut engine = Engine::new(config, state);
        engine.register_signals();
        engine.register_fleet();
        Self { engine }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn state(&self) -> &SimulationState {
        &self.engine.state
    }

    pub fn state_mut(&mut self) -> &mut SimulationState {
        &mut self.engine.state
    }

    pub fn tick(&self) -> u64 {
        self.engine.tick()
    }

    pub fn advance_tick(&mut self) -> Result<()> {
        self.engine.advance_tick()
    }

    /// Run `ticks` more ticks
    pub fn run_for(&mut self, ticks: u64) -> Result<()> {
        let limit = self.engine.tick() + ticks;
        self.engine.run(limit)
    }

    /// Close an open edge or reopen a closed one; returns whether it is now closed
    pub fn toggle_edge_closure(&mut self, edge: EdgeId) -> bool {
        let closed = &mut self.engine.state.closed_edges;
        if !closed.remove(&edge) {
            closed.insert(edge);
            info!("Closed edge {}", edge);
            true
        } else {
            info!("Reopened edge {}", edge);
            false
        }
    }

    /// Retime every light; durations below one second are raised to one
    pub fn update_signal_timings(&mut self, north_south: f32, east_west: f32) -> PhaseDurations {
        let durations = PhaseDurations::new(
            north_south.max(MIN_PHASE_DURATION),
            east_west.max(MIN_PHASE_DURATION),
        );
        if let Some(signals) = self.engine.state.signals.as_mut() {
            signals.update_phase_durations(durations);
        }
        durations
    }

    pub fn update_spawn_interval(&mut self, interval: u32) -> u32 {
        self.engine.state.fleet.set_spawn_interval(interval)
    }

    pub fn snapshot(&self) -> SimulationSnapshot {
        let state = &self.engine.state;
        let mut closed_edges: Vec<EdgeId> = state.closed_edges.iter().copied().collect();
        closed_edges.sort_unstable();

        SimulationSnapshot {
            tick: self.engine.tick(),
            vehicles: state.fleet.vehicles().values().map(VehicleView::from).collect(),
            queue_lengths: state.fleet.last_queue_lengths().clone(),
            closed_edges,
            total_spawned: state.fleet.total_spawned(),
            total_arrived: state.fleet.total_arrived(),
        }
    }

    pub fn print_summary(&self) {
        let snapshot = self.snapshot();
        let network = &self.engine.state.network;
        let busiest = snapshot.queue_lengths.values().copied().max().unwrap_or(0);

        info!("Tick: {}", snapshot.tick);
        info!("Total vehicles spawned: {}", snapshot.total_spawned);
        info!("Total vehicles arrived: {}", snapshot.total_arrived);
        info!("Active vehicles: {}", snapshot.vehicles.len());
        info!("Stuck vehicles: {}", snapshot.stuck_vehicles());
        info!("Average speed: {:.2}", snapshot.average_speed());
        info!("Longest queue: {}", busiest);
        info!("Total intersections: {}", network.node_count());
        info!("Total roads: {}", network.edge_count());
    }
}
