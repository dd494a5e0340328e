//! Named paths through the graph

use crate::error::{AsmGraphError, Result};
use crate::graph::{AssemblyGraph, NodeId};
use crate::sequence::Sequence;

/// An ordered walk over nodes with its concatenated sequence cached
///
/// Paths reference nodes by handle; they do not own them.
#[derive(Debug, Clone)]
pub struct GraphPath {
    name: String,
    nodes: Vec<NodeId>,
    sequence: Option<Sequence>,
    length: usize,
}

impl GraphPath {
    /// Build a path, checking that every node exists
    pub fn from_ordered_nodes(graph: &AssemblyGraph, name: &str, nodes: Vec<NodeId>) -> Result<Self> {
        if let Some(missing) = nodes.iter().find(|&&id| graph.node(id).is_none()) {
            return Err(AsmGraphError::NotFound(format!(
                "node {:?} in path {}",
                missing, name
            )));
        }
        let sequence = path_sequence(graph, &nodes);
        let length = path_length(graph, &nodes);
        Ok(Self {
            name: name.to_string(),
            nodes,
            sequence,
            length,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// `None` if any node on the path is missing its sequence
    pub fn sequence(&self) -> Option<&Sequence> {
        self.sequence.as_ref()
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }

    /// `A+,B-,C+`
    pub fn node_names(&self, graph: &AssemblyGraph) -> String {
        self.nodes
            .iter()
            .filter_map(|&id| graph.node(id))
            .map(|n| n.name())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Overlap of the edge between two consecutive path nodes, 0 if unlinked
fn step_overlap(graph: &AssemblyGraph, from: NodeId, to: NodeId) -> usize {
    graph
        .edge_between(from, to)
        .map_or(0, |e| graph[e].overlap())
}

/// Concatenate node sequences, trimming each edge's overlap from the
/// downstream node. `None` if a node is missing or has no sequence.
pub fn path_sequence(graph: &AssemblyGraph, nodes: &[NodeId]) -> Option<Sequence> {
    let (&first, rest) = nodes.split_first()?;
    let mut sequence = graph.node(first)?.sequence()?.clone();
    let mut previous = first;
    for &id in rest {
        let next = graph.node(id)?.sequence()?;
        sequence = sequence.concat_with_overlap(next, step_overlap(graph, previous, id));
        previous = id;
    }
    Some(sequence)
}

/// Length of the concatenated sequence, valid even when sequences are
/// missing; stale nodes count as empty
pub fn path_length(graph: &AssemblyGraph, nodes: &[NodeId]) -> usize {
    let mut length = 0;
    for (i, &id) in nodes.iter().enumerate() {
        let node_length = graph.node(id).map_or(0, |n| n.length());
        let trimmed = if i == 0 {
            0
        } else {
            step_overlap(graph, nodes[i - 1], id).min(node_length)
        };
        length += node_length - trimmed;
    }
    length
}
