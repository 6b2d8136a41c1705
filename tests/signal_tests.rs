//! Two-phase traffic lights and movement orientation

use traffic_flow::simulation::{
    Edge, EdgeId, EntryGate, Node, NodeId, Phase, PhaseDurations, RoadNetwork, SignalController,
    TrafficLight,
};

fn grid_network(coords: &[(i32, i32)]) -> RoadNetwork {
    let mut network = RoadNetwork::new();
    for (i, (row, col)) in coords.iter().enumerate() {
        network
            .add_node(Node::on_grid(NodeId(i), *row, *col, 10.0))
            .expect("unique node");
    }
    network
}

fn link(id: usize, from: usize, to: usize) -> Edge {
    Edge::new(EdgeId(id), NodeId(from), NodeId(to), 10.0).with_speed_limit(10.0)
}

#[test]
fn test_traffic_light_cycles_between_phases() {
    let mut light = TrafficLight::new(PhaseDurations::new(1.0, 2.0), Phase::NorthSouth);

    light.tick(0.5);
    assert_eq!(light.current_phase, Phase::NorthSouth);
    light.tick(0.6);
    assert_eq!(light.current_phase, Phase::EastWest);

    light.tick(1.0);
    assert_eq!(light.current_phase, Phase::EastWest);
    light.tick(1.1);
    assert_eq!(light.current_phase, Phase::NorthSouth);
}

#[test]
fn test_phase_overflow_is_discarded() {
    let mut light = TrafficLight::new(PhaseDurations::new(1.0, 1.0), Phase::NorthSouth);

    light.tick(1.5);
    assert_eq!(light.current_phase, Phase::EastWest);
    assert_eq!(light.elapsed, 0.0);

    light.tick(0.9);
    assert_eq!(light.current_phase, Phase::EastWest);
}

#[test]
fn test_zero_duration_holds_phase() {
    let mut light = TrafficLight::new(PhaseDurations::new(0.0, 5.0), Phase::NorthSouth);
    for _ in 0..10 {
        light.tick(1.0);
    }
    assert_eq!(light.current_phase, Phase::NorthSouth);
}

#[test]
fn test_east_west_movement_waits_for_green() {
    let network = grid_network(&[(0, 0), (0, 1), (0, 2)]);
    let mut signals =
        SignalController::new(&network, PhaseDurations::new(1.0, 1.0), Phase::NorthSouth);
    let (current, next) = (link(0, 0, 1), link(1, 1, 2));

    assert_eq!(signals.orientation(NodeId(0), NodeId(1)), Phase::EastWest);
    assert!(!signals.can_enter(&current, &next));

    signals.tick(1.0);
    assert!(signals.can_enter(&current, &next));
    assert!(EntryGate::can_enter(&signals, &current, &next));
}

#[test]
fn test_north_south_movement_uses_row_delta() {
    let network = grid_network(&[(0, 0), (1, 0), (2, 0)]);
    let signals =
        SignalController::new(&network, PhaseDurations::new(30.0, 30.0), Phase::NorthSouth);

    assert_eq!(signals.orientation(NodeId(0), NodeId(1)), Phase::NorthSouth);
    assert!(signals.can_enter(&link(0, 0, 1), &link(1, 1, 2)));
}

#[test]
fn test_degenerate_coordinates_default_to_north_south() {
    let mut network = RoadNetwork::new();
    network.add_node(Node::bare(NodeId(0))).expect("unique node");
    network.add_node(Node::bare(NodeId(1))).expect("unique node");
    let signals =
        SignalController::new(&network, PhaseDurations::new(30.0, 30.0), Phase::EastWest);

    assert_eq!(signals.orientation(NodeId(0), NodeId(1)), Phase::NorthSouth);
    assert_eq!(signals.orientation(NodeId(0), NodeId(42)), Phase::NorthSouth);
    assert!(!signals.can_enter(&link(0, 0, 1), &link(1, 1, 0)));
}

#[test]
fn test_missing_light_always_permits() {
    let network = grid_network(&[(0, 0)]);
    let signals =
        SignalController::new(&network, PhaseDurations::new(30.0, 30.0), Phase::NorthSouth);

    assert!(signals.light(NodeId(1)).is_none());
    assert!(signals.can_enter(&link(0, 0, 1), &link(1, 1, 2)));
}

#[test]
fn test_update_phase_durations_retimes_every_light() {
    let network = grid_network(&[(0, 0), (0, 1)]);
    let mut signals =
        SignalController::new(&network, PhaseDurations::new(30.0, 30.0), Phase::NorthSouth);

    signals.update_phase_durations(PhaseDurations::new(2.0, 3.0));
    signals.tick(2.0);

    for node in [NodeId(0), NodeId(1)] {
        let light = signals.light(node).expect("light per node");
        assert_eq!(light.phase_durations, PhaseDurations::new(2.0, 3.0));
        assert_eq!(light.current_phase, Phase::EastWest);
    }
}
