//! Core types for the traffic simulation
//!
//! Identifiers, road-graph records and driver constants shared by every
//! component of the tick loop.

use std::fmt;

/// A wrapper type for node (intersection) IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// A wrapper type for directed edge (road segment) IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub usize);

/// A wrapper type for vehicle IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "veh{}", self.0)
    }
}

/// An intersection in the road graph
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub id: NodeId,
    /// Grid row, if the node sits on a grid
    pub row: Option<i32>,
    /// Grid column, if the node sits on a grid
    pub col: Option<i32>,
    pub x: f32,
    pub y: f32,
}

impl Node {
    /// A node placed on a grid; x/y are derived from the spacing
    pub fn on_grid(id: NodeId, row: i32, col: i32, spacing: f32) -> Self {
        Self {
            id,
            row: Some(row),
            col: Some(col),
            x: col as f32 * spacing,
            y: row as f32 * spacing,
        }
    }

    /// A node with no grid coordinates
    pub fn bare(id: NodeId) -> Self {
        Self {
            id,
            row: None,
            col: None,
            x: 0.0,
            y: 0.0,
        }
    }

    pub fn grid_coords(&self) -> Option<(i32, i32)> {
        Some((self.row?, self.col?))
    }
}

/// A directed road segment connecting two nodes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub length: f32,
    pub lanes: u32,
    pub speed_limit: Option<f32>,
    pub capacity: Option<u32>,
}

impl Edge {
    pub fn new(id: EdgeId, from: NodeId, to: NodeId, length: f32) -> Self {
        Self {
            id,
            from,
            to,
            length,
            lanes: 1,
            speed_limit: None,
            capacity: None,
        }
    }

    pub fn with_speed_limit(mut self, speed_limit: f32) -> Self {
        self.speed_limit = Some(speed_limit);
        self
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Speed limit, or 0 when the edge carries none
    pub fn speed_limit_or_zero(&self) -> f32 {
        self.speed_limit.unwrap_or(0.0)
    }

    /// Whether `occupancy` vehicles leave room for one more; no capacity means unbounded
    pub fn has_room(&self, occupancy: usize) -> bool {
        match self.capacity {
            Some(capacity) => occupancy < capacity as usize,
            None => true,
        }
    }
}

/// Default vehicle length in world units
pub const VEHICLE_LENGTH: f32 = 4.5;

/// Velocity below which a vehicle counts as stationary
pub const STATIONARY_SPEED: f32 = 0.1;

/// Consecutive stationary ticks before a vehicle is flagged stuck
pub const STUCK_TICKS: u32 = 5;

/// Smallest gap used in the IDM interaction term
pub const MIN_LEADER_GAP: f32 = 0.1;
