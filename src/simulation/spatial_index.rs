//! Per-edge vehicle ordering
//!
//! Rebuilt from scratch every tick. Vehicles are bucketed by position so each
//! edge's queue comes out exit-most first without a full per-edge sort when
//! traffic is sparse.

use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use super::types::{EdgeId, VehicleId};
use super::vehicle::Vehicle;

pub const DEFAULT_BIN_SIZE: f32 = 20.0;

/// Result of indexing the live fleet for one tick
#[derive(Debug, Default, Clone)]
pub struct EdgeOrdering {
    /// Vehicles per edge, leader first
    pub queues: BTreeMap<EdgeId, Vec<VehicleId>>,
    /// Non-arrived vehicles per edge
    pub occupancy: HashMap<EdgeId, usize>,
}

#[derive(Debug, Clone, Copy)]
pub struct SpatialIndex {
    bin_size: f32,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new(DEFAULT_BIN_SIZE)
    }
}

impl SpatialIndex {
    pub fn new(bin_size: f32) -> Self {
        Self { bin_size }
    }

    pub fn bin_size(&self) -> f32 {
        self.bin_size
    }

    pub fn build<'a>(&self, vehicles: impl IntoIterator<Item = &'a Vehicle>) -> EdgeOrdering {
        let mut bins: HashMap<EdgeId, BTreeMap<i64, Vec<&Vehicle>>> = HashMap::new();
        let mut ordering = EdgeOrdering::default();

        for vehicle in vehicles {
            if vehicle.arrived {
                continue;
            }
            let Some(edge) = vehicle.current_edge_id() else {
                continue;
            };
            let bin = (vehicle.position / self.bin_size).floor() as i64;
            bins.entry(edge).or_default().entry(bin).or_default().push(vehicle);
            *ordering.occupancy.entry(edge).or_insert(0) += 1;
        }

        for (edge, edge_bins) in bins {
            let mut queue = Vec::new();
            for (_, mut segment) in edge_bins.into_iter().rev() {
                segment.sort_by_key(|vehicle| Reverse(OrderedFloat(vehicle.position)));
                queue.extend(segment.into_iter().map(|vehicle| vehicle.id));
            }
            ordering.queues.insert(edge, queue);
        }

        ordering
    }
}
