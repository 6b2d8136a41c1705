//! Road network graph
//!
//! Immutable for the duration of a run: the core reads nodes, edges and
//! adjacency but never mutates them.

use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use thiserror::Error;

use super::types::{Edge, EdgeId, Node, NodeId};

#[derive(Debug, Error, PartialEq)]
pub enum NetworkError {
    #[error("node {0} already exists")]
    DuplicateNode(NodeId),
    #[error("edge {0} already exists")]
    DuplicateEdge(EdgeId),
    #[error("edge {edge} references unknown node {node}")]
    UnknownNode { edge: EdgeId, node: NodeId },
}

/// Directed road graph with stable, insertion-ordered node and edge storage
#[derive(Debug, Default, Clone)]
pub struct RoadNetwork {
    /// Adjacency only; edge weights index into `edges`
    graph: DiGraph<NodeId, usize>,
    node_to_index: HashMap<NodeId, NodeIndex>,
    nodes: Vec<Node>,
    node_slots: HashMap<NodeId, usize>,
    edges: Vec<Edge>,
    edge_slots: HashMap<EdgeId, usize>,
}

impl RoadNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node) -> Result<(), NetworkError> {
        if self.node_slots.contains_key(&node.id) {
            return Err(NetworkError::DuplicateNode(node.id));
        }

        let index = self.graph.add_node(node.id);
        self.node_to_index.insert(node.id, index);
        self.node_slots.insert(node.id, self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Adds a directed edge; both endpoints must already exist
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), NetworkError> {
        if self.edge_slots.contains_key(&edge.id) {
            return Err(NetworkError::DuplicateEdge(edge.id));
        }

        let from = self.index_of(edge.id, edge.from)?;
        let to = self.index_of(edge.id, edge.to)?;

        let slot = self.edges.len();
        self.graph.add_edge(from, to, slot);
        self.edge_slots.insert(edge.id, slot);
        self.edges.push(edge);
        Ok(())
    }

    fn index_of(&self, edge: EdgeId, node: NodeId) -> Result<NodeIndex, NetworkError> {
        self.node_to_index
            .get(&node)
            .copied()
            .ok_or(NetworkError::UnknownNode { edge, node })
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.node_slots.get(&id).map(|slot| &self.nodes[*slot])
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edge_slots.get(&id).map(|slot| &self.edges[*slot])
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All edges in insertion order
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Outgoing edges of a node, in insertion order
    pub fn outgoing(&self, node: NodeId) -> Vec<&Edge> {
        let Some(index) = self.node_to_index.get(&node) else {
            return Vec::new();
        };

        let mut slots: Vec<usize> = self
            .graph
            .edges(*index)
            .map(|edge| *edge.weight())
            .collect();
        // petgraph walks adjacency newest-first
        slots.sort_unstable();
        slots.into_iter().map(|slot| &self.edges[slot]).collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
