//! Per-edge leader-first ordering

use traffic_flow::simulation::{Edge, EdgeId, NodeId, SpatialIndex, Vehicle, VehicleId};

fn on_edge(id: usize, edge: usize, position: f32) -> Vehicle {
    let route = vec![
        Edge::new(EdgeId(0), NodeId(0), NodeId(1), 100.0),
        Edge::new(EdgeId(1), NodeId(1), NodeId(2), 100.0),
    ];
    Vehicle::new(VehicleId(id), route, NodeId(2), 1.0)
        .with_edge_index(edge)
        .with_position(position)
}

#[test]
fn test_same_bin_orders_by_position() {
    let vehicles = [on_edge(1, 0, 3.0), on_edge(2, 0, 9.0)];
    let ordering = SpatialIndex::new(20.0).build(&vehicles);

    assert_eq!(ordering.queues[&EdgeId(0)], vec![VehicleId(2), VehicleId(1)]);
}

#[test]
fn test_farther_bins_come_first() {
    let vehicles = [on_edge(1, 0, 5.0), on_edge(2, 0, 45.0), on_edge(3, 0, 25.0)];
    let ordering = SpatialIndex::default().build(&vehicles);

    assert_eq!(
        ordering.queues[&EdgeId(0)],
        vec![VehicleId(2), VehicleId(3), VehicleId(1)]
    );
}

#[test]
fn test_occupancy_counts_per_edge() {
    let vehicles = [on_edge(1, 0, 5.0), on_edge(2, 1, 45.0), on_edge(3, 1, 25.0)];
    let ordering = SpatialIndex::default().build(&vehicles);

    assert_eq!(ordering.occupancy[&EdgeId(0)], 1);
    assert_eq!(ordering.occupancy[&EdgeId(1)], 2);
    assert_eq!(ordering.queues[&EdgeId(1)], vec![VehicleId(2), VehicleId(3)]);
}

#[test]
fn test_arrived_vehicles_are_excluded() {
    let mut done = on_edge(1, 1, 99.0).with_velocity(5.0);
    done.step(1.0, None, None);
    assert!(done.is_arrived());
    let vehicles = [done, on_edge(2, 0, 10.0)];
    let ordering = SpatialIndex::default().build(&vehicles);

    assert!(!ordering.queues.contains_key(&EdgeId(1)));
    assert!(!ordering.occupancy.contains_key(&EdgeId(1)));
    assert_eq!(ordering.queues[&EdgeId(0)], vec![VehicleId(2)]);
}
