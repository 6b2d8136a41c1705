//! Configuration for the simulation and its components
//!
//! Defaults suit quick experiments: one-second ticks, an hour of simulated
//! time, and a small 3x3 grid.

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::signals::{Phase, PhaseDurations};
use super::types::NodeId;

/// Top-level configuration for a simulation run
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Seconds of simulated time per tick
    pub tick_duration: f32,
    /// Tick limit used by `run_to_limit`
    pub max_ticks: u64,
    pub grid: GridConfig,
    pub fleet: FleetConfig,
    /// `None` runs without traffic lights
    pub signals: Option<SignalConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_duration: 1.0,
            max_ticks: 3600,
            grid: GridConfig::default(),
            fleet: FleetConfig::default(),
            signals: Some(SignalConfig::default()),
        }
    }
}

/// Shape and road attributes of a generated grid network
#[derive(Debug, Clone)]
pub struct GridConfig {
    pub rows: u32,
    pub cols: u32,
    /// Distance between adjacent intersections
    pub block_length: f32,
    pub lanes_per_road: u32,
    pub speed_limit: f32,
    pub capacity_per_lane: u32,
    pub seed: Option<u64>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: 3,
            cols: 3,
            block_length: 100.0,
            lanes_per_road: 1,
            speed_limit: 13.9, // ~50 km/h
            capacity_per_lane: 30,
            seed: None,
        }
    }
}

impl GridConfig {
    pub fn capacity_for_edge(&self) -> u32 {
        self.capacity_per_lane * self.lanes_per_road
    }
}

/// Spawning and routing parameters for the fleet
#[derive(Debug, Clone)]
pub struct FleetConfig {
    pub max_vehicles: usize,
    /// Inclusive range sampled for each vehicle's patience
    pub patience_range: (f32, f32),
    /// Destination candidates; `None` or an empty list means every network node
    pub destinations: Option<Vec<NodeId>>,
    /// Spawn one vehicle every `spawn_interval` fleet ticks
    pub spawn_interval: u32,
    /// Upper bound on edges in a constructed route
    pub max_route_steps: usize,
    pub seed: Option<u64>,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            max_vehicles: 2000,
            patience_range: (0.8, 1.2),
            destinations: None,
            spawn_interval: 1,
            max_route_steps: 1000,
            seed: None,
        }
    }
}

/// Timing shared by every traffic light in the network
#[derive(Debug, Clone, Copy)]
pub struct SignalConfig {
    pub phase_durations: PhaseDurations,
    pub start_phase: Phase,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            phase_durations: PhaseDurations::new(30.0, 30.0),
            start_phase: Phase::NorthSouth,
        }
    }
}

/// Seeded RNG when a seed is given, otherwise one seeded from the thread RNG
pub fn component_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    }
}
