//! Grid-shaped road network generation
//!
//! Every undirected road is emitted as a pair of directed edges. Edge IDs are
//! assigned in generation order; the order in which edges are inserted into
//! the network is shuffled with the generator's own RNG.

use rand::seq::SliceRandom;

use super::config::{component_rng, GridConfig};
use super::road_network::{NetworkError, RoadNetwork};
use super::types::{Edge, EdgeId, Node, NodeId};

/// Node ID of the intersection at (`row`, `col`) in a grid with `cols` columns
pub fn grid_node_id(row: u32, col: u32, cols: u32) -> NodeId {
    NodeId((row * cols + col) as usize)
}

pub fn generate_grid_network(config: &GridConfig) -> Result<RoadNetwork, NetworkError> {
    let mut rng = component_rng(config.seed);
    let mut network = RoadNetwork::new();

    for row in 0..config.rows {
        for col in 0..config.cols {
            network.add_node(Node::on_grid(
                grid_node_id(row, col, config.cols),
                row as i32,
                col as i32,
                config.block_length,
            ))?;
        }
    }

    let mut edges = Vec::new();
    let mut add_pair = |a: NodeId, b: NodeId| {
        for (from, to) in [(a, b), (b, a)] {
            let mut edge = Edge::new(EdgeId(edges.len()), from, to, config.block_length)
                .with_speed_limit(config.speed_limit)
                .with_capacity(config.capacity_for_edge());
            edge.lanes = config.lanes_per_road;
            edges.push(edge);
        }
    };

    for row in 0..config.rows {
        for col in 0..config.cols {
            let here = grid_node_id(row, col, config.cols);
            if col + 1 < config.cols {
                add_pair(here, grid_node_id(row, col + 1, config.cols));
            }
            if row + 1 < config.rows {
                add_pair(here, grid_node_id(row + 1, col, config.cols));
            }
        }
    }

    edges.shuffle(&mut rng);
    for edge in edges {
        network.add_edge(edge)?;
    }

    Ok(network)
}
