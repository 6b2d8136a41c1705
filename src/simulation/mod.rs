//! Tick-driven traffic simulation
//!
//! Vehicles follow the Intelligent Driver Model along directed road edges,
//! queue at capacity- and signal-gated intersections and are flagged when
//! they stay put long enough to signal gridlock.

mod config;
mod engine;
mod fleet;
mod grid;
mod road_network;
mod runtime;
mod signals;
mod spatial_index;
mod types;
mod vehicle;
mod world;

pub use config::{component_rng, FleetConfig, GridConfig, SignalConfig, SimulationConfig};
pub use engine::{AgentCallback, Engine, SimulationState, SIGNALS_AGENT};
pub use fleet::{FleetGate, FleetManager, FleetTickReport, RouteError, FLEET_AGENT};
pub use grid::{generate_grid_network, grid_node_id};
pub use road_network::{NetworkError, RoadNetwork};
pub use runtime::{SimulationRuntime, MIN_TICK_PERIOD};
pub use signals::{Phase, PhaseDurations, SignalController, TrafficLight};
pub use spatial_index::{EdgeOrdering, SpatialIndex, DEFAULT_BIN_SIZE};
pub use types::{
    Edge, EdgeId, Node, NodeId, VehicleId, MIN_LEADER_GAP, STATIONARY_SPEED, STUCK_TICKS,
    VEHICLE_LENGTH,
};
pub use vehicle::{DriverParams, EntryGate, LeaderState, StepOutcome, Vehicle};
pub use world::{Simulation, SimulationSnapshot, VehicleView, MIN_PHASE_DURATION};
