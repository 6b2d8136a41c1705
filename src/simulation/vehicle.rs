//! Vehicle movement logic for the traffic simulation
//!
//! Each vehicle follows the Intelligent Driver Model along its route and
//! crosses edges through an entry gate owned by the caller.

use super::types::{
    Edge, EdgeId, NodeId, VehicleId, MIN_LEADER_GAP, STATIONARY_SPEED, STUCK_TICKS, VEHICLE_LENGTH,
};

/// Decides whether a vehicle at the end of `current` may move onto `next`
pub trait EntryGate {
    fn can_enter(&self, current: &Edge, next: &Edge) -> bool;
}

/// Result of a vehicle step indicating what happened this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Vehicle had already arrived; nothing changed
    Idle,
    /// Vehicle moved (possibly by zero) without being refused at an intersection
    Advanced,
    /// Vehicle was held at the end of its edge by the entry gate
    Blocked,
    /// Vehicle left the last edge of its route this tick
    Arrived,
}

/// IDM driver parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverParams {
    /// Desired time headway in seconds
    pub desired_time_headway: f32,
    pub minimum_spacing: f32,
    pub acceleration_max: f32,
    pub deceleration_comfortable: f32,
    pub delta: i32,
}

impl Default for DriverParams {
    fn default() -> Self {
        Self {
            desired_time_headway: 1.5,
            minimum_spacing: 2.0,
            acceleration_max: 1.0,
            deceleration_comfortable: 1.5,
            delta: 4,
        }
    }
}

/// What a follower needs to know about the vehicle ahead of it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeaderState {
    pub edge: EdgeId,
    pub position: f32,
    pub velocity: f32,
    pub length: f32,
}

impl LeaderState {
    /// `None` for vehicles that can no longer lead (arrived or routeless)
    pub fn of(vehicle: &Vehicle) -> Option<Self> {
        if vehicle.arrived {
            return None;
        }
        Some(Self {
            edge: vehicle.current_edge_id()?,
            position: vehicle.position,
            velocity: vehicle.velocity,
            length: vehicle.length,
        })
    }
}

/// A vehicle in the traffic simulation
///
/// Kinematic state is only changed by `step`; the `with_*` builders set up
/// the initial state.
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub(crate) id: VehicleId,
    /// Edges to traverse, in order; copied from the network at spawn
    pub(crate) route: Vec<Edge>,
    pub(crate) destination: NodeId,
    /// Multiplier on the edge speed limit
    pub(crate) patience: f32,
    pub(crate) current_edge_index: usize,
    /// Distance travelled along the current edge
    pub(crate) position: f32,
    pub(crate) velocity: f32,
    pub(crate) acceleration: f32,
    pub(crate) length: f32,
    pub(crate) arrived: bool,
    pub(crate) stationary_ticks: u32,
    pub(crate) stuck: bool,
    pub(crate) params: DriverParams,
}

impl Vehicle {
    pub fn new(id: VehicleId, route: Vec<Edge>, destination: NodeId, patience: f32) -> Self {
        Self {
            id,
            route,
            destination,
            patience,
            current_edge_index: 0,
            position: 0.0,
            velocity: 0.0,
            acceleration: 0.0,
            length: VEHICLE_LENGTH,
            arrived: false,
            stationary_ticks: 0,
            stuck: false,
            params: DriverParams::default(),
        }
    }

    pub fn with_position(mut self, position: f32) -> Self {
        self.position = position;
        self
    }

    pub fn with_velocity(mut self, velocity: f32) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_edge_index(mut self, index: usize) -> Self {
        self.current_edge_index = index;
        self
    }

    /// Start with `ticks` stationary ticks already counted
    pub fn with_stationary_ticks(mut self, ticks: u32) -> Self {
        self.stationary_ticks = ticks;
        self.stuck = ticks >= STUCK_TICKS;
        self
    }

    pub fn with_params(mut self, params: DriverParams) -> Self {
        self.params = params;
        self
    }

    pub fn id(&self) -> VehicleId {
        self.id
    }

    pub fn route(&self) -> &[Edge] {
        &self.route
    }

    pub fn destination(&self) -> NodeId {
        self.destination
    }

    pub fn patience(&self) -> f32 {
        self.patience
    }

    pub fn current_edge_index(&self) -> usize {
        self.current_edge_index
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn acceleration(&self) -> f32 {
        self.acceleration
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn params(&self) -> &DriverParams {
        &self.params
    }

    pub fn is_arrived(&self) -> bool {
        self.arrived
    }

    pub fn stationary_ticks(&self) -> u32 {
        self.stationary_ticks
    }

    /// Stationary for at least `STUCK_TICKS` consecutive ticks
    pub fn is_stuck(&self) -> bool {
        self.stuck
    }

    /// The edge the vehicle is on; the last route edge once it has arrived
    pub fn current_edge(&self) -> Option<&Edge> {
        let last = self.route.len().checked_sub(1)?;
        self.route.get(self.current_edge_index.min(last))
    }

    pub fn current_edge_id(&self) -> Option<EdgeId> {
        self.current_edge().map(|edge| edge.id)
    }

    fn current_length(&self) -> f32 {
        self.current_edge().map_or(0.0, |edge| edge.length)
    }

    /// Distance left to the exit of the current edge
    pub fn edge_remaining(&self) -> f32 {
        (self.current_length() - self.position).max(0.0)
    }

    pub fn desired_speed(&self) -> f32 {
        let speed_limit = self.current_edge().map_or(0.0, Edge::speed_limit_or_zero);
        speed_limit * self.patience
    }

    fn desired_gap(&self, relative_speed: f32) -> f32 {
        let p = &self.params;
        let dynamic = self.velocity * p.desired_time_headway
            + (self.velocity * relative_speed)
                / (2.0 * (p.acceleration_max * p.deceleration_comfortable).sqrt());
        p.minimum_spacing + dynamic.max(0.0)
    }

    /// IDM acceleration given an optional leader
    pub fn compute_acceleration(&self, leader: Option<&LeaderState>) -> f32 {
        let desired = self.desired_speed();
        if desired <= 0.0 {
            return -self.params.deceleration_comfortable;
        }

        let mut gap = f32::INFINITY;
        let mut relative_speed = 0.0;
        if let Some(leader) = leader {
            if Some(leader.edge) == self.current_edge_id() {
                gap = (leader.position - self.position - leader.length).max(MIN_LEADER_GAP);
                relative_speed = self.velocity - leader.velocity;
            }
        }

        let free_flow = (self.velocity / desired).powi(self.params.delta);
        let interaction = if gap.is_finite() {
            (self.desired_gap(relative_speed) / gap).powi(2)
        } else {
            0.0
        };

        self.params.acceleration_max * (1.0 - free_flow - interaction)
    }

    /// Advance the vehicle by one tick
    ///
    /// Travel distance may span several short edges; each crossing asks `gate`
    /// for permission. A refusal parks the vehicle at the end of its edge with
    /// zero velocity for the rest of the tick.
    pub fn step(
        &mut self,
        dt: f32,
        leader: Option<&LeaderState>,
        gate: Option<&dyn EntryGate>,
    ) -> StepOutcome {
        if self.arrived {
            self.acceleration = 0.0;
            self.velocity = 0.0;
            return StepOutcome::Idle;
        }

        self.acceleration = self.compute_acceleration(leader);
        let candidate = (self.velocity + self.acceleration * dt)
            .min(self.desired_speed())
            .max(0.0);
        let mut remaining = (self.velocity * dt + 0.5 * self.acceleration * dt * dt).max(0.0);
        let mut blocked = false;

        while remaining > 0.0 && !self.arrived {
            let to_exit = self.edge_remaining();
            if to_exit > 0.0 && remaining < to_exit {
                self.position += remaining;
                break;
            }
            remaining -= to_exit;

            let refused = match (
                self.current_edge(),
                self.route.get(self.current_edge_index + 1),
            ) {
                (Some(current), Some(next)) => {
                    gate.is_some_and(|gate| !gate.can_enter(current, next))
                }
                _ => false,
            };
            if refused {
                // Queue at the intersection
                self.position = self.current_length();
                blocked = true;
                break;
            }

            self.position = 0.0;
            self.current_edge_index += 1;
            if self.current_edge_index >= self.route.len() {
                self.arrived = true;
            }
        }

        self.velocity = if blocked || self.arrived { 0.0 } else { candidate };
        self.update_stuck_state(blocked);

        if self.arrived {
            StepOutcome::Arrived
        } else if blocked {
            StepOutcome::Blocked
        } else {
            StepOutcome::Advanced
        }
    }

    fn update_stuck_state(&mut self, blocked: bool) {
        let stationary = blocked || self.velocity < STATIONARY_SPEED;
        if stationary && !self.arrived {
            self.stationary_ticks += 1;
        } else {
            self.stationary_ticks = 0;
        }
        self.stuck = self.stationary_ticks >= STUCK_TICKS;
    }

    /// Stuck close enough to the exit that it obstructs the edge
    pub fn obstructs_exit(&self) -> bool {
        self.stuck && self.edge_remaining() < self.length
    }
}
