//! Car-following physics and edge transitions of a single vehicle

use std::cell::RefCell;

use traffic_flow::simulation::{
    Edge, EdgeId, EntryGate, LeaderState, NodeId, StepOutcome, Vehicle, VehicleId,
};

struct AllowAll;

impl EntryGate for AllowAll {
    fn can_enter(&self, _current: &Edge, _next: &Edge) -> bool {
        true
    }
}

struct RefuseAll;

impl EntryGate for RefuseAll {
    fn can_enter(&self, _current: &Edge, _next: &Edge) -> bool {
        false
    }
}

/// Permits everything and remembers each crossing it was asked about
#[derive(Default)]
struct RecordingGate {
    calls: RefCell<Vec<(EdgeId, EdgeId)>>,
}

impl EntryGate for RecordingGate {
    fn can_enter(&self, current: &Edge, next: &Edge) -> bool {
        self.calls.borrow_mut().push((current.id, next.id));
        true
    }
}

fn edge(id: usize, length: f32, speed_limit: f32) -> Edge {
    Edge::new(EdgeId(id), NodeId(id), NodeId(id + 1), length).with_speed_limit(speed_limit)
}

fn vehicle(route: Vec<Edge>) -> Vehicle {
    let destination = route.last().map_or(NodeId(0), |e| e.to);
    Vehicle::new(VehicleId(1), route, destination, 1.0)
}

fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() <= 1e-4 * expected.abs().max(1.0),
        "expected {expected}, got {actual}"
    );
}

#[test]
fn test_idm_acceleration_free_road() {
    let v = vehicle(vec![edge(0, 10.0, 20.0)]).with_velocity(10.0);
    assert_close(v.compute_acceleration(None), 0.9375);
}

#[test]
fn test_idm_acceleration_with_leader() {
    let route = vec![edge(0, 100.0, 20.0)];
    let follower = vehicle(route.clone()).with_position(5.0).with_velocity(10.0);
    let leader = vehicle(route).with_position(20.0).with_velocity(8.0);
    let leader_state = LeaderState::of(&leader).expect("leader is on a route");

    let accel = follower.compute_acceleration(Some(&leader_state));

    let p = *follower.params();
    let gap = (leader.position() - follower.position() - leader.length()).max(0.1);
    let relative_speed = follower.velocity() - leader.velocity();
    let s_star = p.minimum_spacing
        + (follower.velocity() * p.desired_time_headway
            + follower.velocity() * relative_speed
                / (2.0 * (p.acceleration_max * p.deceleration_comfortable).sqrt()))
        .max(0.0);
    let expected = p.acceleration_max
        * (1.0
            - (follower.velocity() / follower.desired_speed()).powi(p.delta)
            - (s_star / gap).powi(2));

    assert_close(accel, expected);
    assert!(accel < 0.0, "a close, slower leader should force braking");
}

#[test]
fn test_leader_on_other_edge_is_ignored() {
    let route = vec![edge(0, 10.0, 20.0), edge(1, 10.0, 20.0)];
    let follower = vehicle(route.clone()).with_velocity(10.0);
    let leader = vehicle(route).with_edge_index(1).with_position(1.0);
    let leader_state = LeaderState::of(&leader).expect("leader is on a route");

    assert_close(follower.compute_acceleration(Some(&leader_state)), 0.9375);
}

#[test]
fn test_non_positive_desired_speed_decelerates() {
    let missing_limit = Edge::new(EdgeId(0), NodeId(0), NodeId(1), 10.0);
    let v = vehicle(vec![missing_limit]).with_velocity(3.0);
    assert_eq!(v.desired_speed(), 0.0);
    assert_close(v.compute_acceleration(None), -1.5);

    let mut reversed = Vehicle::new(VehicleId(1), vec![edge(0, 10.0, 20.0)], NodeId(1), -0.5);
    assert!(reversed.desired_speed() < 0.0);
    assert_close(reversed.compute_acceleration(None), -1.5);

    reversed.step(1.0, None, None);
    assert_eq!(reversed.velocity(), 0.0);
    assert_eq!(reversed.position(), 0.0);
}

#[test]
fn test_crossing_several_edges_in_one_tick() {
    let route = vec![edge(0, 1.0, 20.0), edge(1, 1.0, 20.0), edge(2, 10.0, 20.0)];
    let mut v = vehicle(route).with_velocity(10.0);
    let gate = RecordingGate::default();

    let outcome = v.step(1.0, None, Some(&gate));

    assert_eq!(outcome, StepOutcome::Advanced);
    assert_eq!(v.current_edge_index(), 2);
    // 10 + 0.5 * 0.9375 travelled, 2 of it spent on the short edges
    assert_close(v.position(), 8.46875);
    assert_eq!(
        *gate.calls.borrow(),
        vec![(EdgeId(0), EdgeId(1)), (EdgeId(1), EdgeId(2))]
    );
}

#[test]
fn test_gate_refusal_parks_vehicle_at_edge_end() {
    let route = vec![edge(0, 10.0, 10.0), edge(1, 10.0, 10.0)];
    let mut v = vehicle(route).with_position(9.0).with_velocity(5.0);

    let outcome = v.step(1.0, None, Some(&RefuseAll));

    assert_eq!(outcome, StepOutcome::Blocked);
    assert_eq!(v.current_edge_index(), 0);
    assert_eq!(v.position(), 10.0);
    assert_eq!(v.velocity(), 0.0);
    assert_eq!(v.stationary_ticks(), 1);
}

#[test]
fn test_missing_gate_always_permits() {
    let route = vec![edge(0, 10.0, 10.0), edge(1, 10.0, 10.0)];
    let mut v = vehicle(route).with_position(9.0).with_velocity(5.0);

    v.step(1.0, None, None);

    assert_eq!(v.current_edge_id(), Some(EdgeId(1)));
    assert!(v.velocity() > 0.0);
}

#[test]
fn test_stuck_after_five_stationary_ticks() {
    let route = vec![edge(0, 10.0, 10.0), edge(1, 10.0, 10.0)];
    let mut v = vehicle(route).with_position(9.0).with_velocity(5.0);

    for tick in 1..=4 {
        v.step(1.0, None, Some(&RefuseAll));
        assert_eq!(v.stationary_ticks(), tick);
        assert!(!v.is_stuck(), "stuck too early at tick {tick}");
    }

    v.step(1.0, None, Some(&RefuseAll));
    assert!(v.is_stuck());
    assert!(v.obstructs_exit());

    v.step(1.0, None, Some(&AllowAll));
    assert_eq!(v.current_edge_id(), Some(EdgeId(1)));
    assert!(!v.is_stuck());
    assert_eq!(v.stationary_ticks(), 0);
}

#[test]
fn test_arrival_zeroes_velocity() {
    let mut v = vehicle(vec![edge(0, 5.0, 20.0)])
        .with_position(4.0)
        .with_velocity(5.0);

    assert_eq!(v.step(1.0, None, Some(&RefuseAll)), StepOutcome::Arrived);
    assert!(v.is_arrived());
    assert_eq!(v.velocity(), 0.0);
    assert!(!v.is_stuck());
    assert!(LeaderState::of(&v).is_none());

    assert_eq!(v.step(1.0, None, None), StepOutcome::Idle);
    assert_eq!(v.velocity(), 0.0);
    assert_eq!(v.acceleration(), 0.0);
}

#[test]
fn test_velocity_capped_at_desired_speed() {
    let mut v = vehicle(vec![edge(0, 1000.0, 10.0)]).with_velocity(10.0);
    for _ in 0..10 {
        v.step(1.0, None, None);
        assert!(v.velocity() <= v.desired_speed() + 1e-6);
        assert!(v.position() <= 1000.0);
    }
}
