//! Topology edits that keep every node and edge paired with its complement
//!
//! Each operation either completes or leaves the graph untouched: checks run
//! before the first mutation, and deletions are expanded to cover complements
//! so no half-pair can survive.

use crate::cancel::CancellationToken;
use crate::error::{AsmGraphError, Result};
use crate::graph::{strip_sign, AssemblyGraph, EdgeId, NodeData, NodeId, OverlapType};
use crate::path::{path_length, path_sequence};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info};

/// Where a node can be attached to a partially ordered merge list
enum Placement {
    Front(NodeId),
    Back(NodeId),
}

/// An edge copied onto a new node: the far endpoint plus overlap details
type EdgeTemplate = (NodeId, usize, OverlapType);

impl AssemblyGraph {
    /// Length-weighted mean depth of the given nodes
    ///
    /// A single node gives its own depth; nodes with zero total length give
    /// the plain average. Stale handles are skipped.
    pub fn mean_depth_of(&self, nodes: &[NodeId]) -> f64 {
        let live: Vec<_> = nodes.iter().filter_map(|&id| self.node(id)).collect();
        match live.as_slice() {
            [] => 0.0,
            [only] => only.depth(),
            _ => {
                let total_length: usize = live.iter().map(|n| n.length()).sum();
                if total_length == 0 {
                    live.iter().map(|n| n.depth()).sum::<f64>() / live.len() as f64
                } else {
                    live.iter()
                        .map(|n| n.length() as f64 * n.depth())
                        .sum::<f64>()
                        / total_length as f64
                }
            }
        }
    }

    /// `last` has one leaving edge, `candidate` one entering edge, and they
    /// are the same edge
    fn can_append(&self, last: NodeId, candidate: NodeId) -> bool {
        let leaving = self.leaving_edges(last);
        let entering = self.entering_edges(candidate);
        leaving.len() == 1
            && entering.len() == 1
            && self[leaving[0]].end() == candidate
            && self[entering[0]].start() == last
    }

    fn can_prepend(&self, first: NodeId, candidate: NodeId) -> bool {
        self.can_append(candidate, first)
    }

    /// Order an unordered node set into a simple path, trying each node and
    /// its complement at either end. `None` if some node cannot be placed.
    fn order_merge_list(&self, nodes: &[NodeId]) -> Option<Vec<NodeId>> {
        let (&first, rest) = nodes.split_first()?;
        let mut ordered = VecDeque::from([first]);
        let mut remaining = rest.to_vec();

        while !remaining.is_empty() {
            let placed = remaining.iter().enumerate().find_map(|(i, &candidate)| {
                let front = *ordered.front()?;
                let back = *ordered.back()?;
                let rc = self[candidate].reverse_complement();
                let placement = if self.can_append(back, candidate) {
                    Placement::Back(candidate)
                } else if self.can_prepend(front, candidate) {
                    Placement::Front(candidate)
                } else if self.can_append(back, rc) {
                    Placement::Back(rc)
                } else if self.can_prepend(front, rc) {
                    Placement::Front(rc)
                } else {
                    return None;
                };
                Some((i, placement))
            });

            let (i, placement) = placed?;
            remaining.remove(i);
            match placement {
                Placement::Front(id) => ordered.push_front(id),
                Placement::Back(id) => ordered.push_back(id),
            }
        }
        Some(ordered.into())
    }

    fn check_nodes(&self, nodes: &[NodeId]) -> Result<()> {
        match nodes.iter().find(|&&id| self.node(id).is_none()) {
            Some(stale) => Err(AsmGraphError::NotFound(format!("node {:?}", stale))),
            None => Ok(()),
        }
    }

    /// Merge nodes forming one unbranched path into a single node pair
    ///
    /// The nodes may be given in any order and either orientation. The new
    /// node's sequence is the path sequence with overlaps trimmed, its depth
    /// the length-weighted mean, and it inherits the edges entering the
    /// path's first node and leaving its last. A single node is returned
    /// unchanged. Fails without mutating if the nodes do not form a simple
    /// path.
    pub fn merge_linear_path(&mut self, nodes: &[NodeId]) -> Result<NodeId> {
        self.check_nodes(nodes)?;
        let mut unique = Vec::with_capacity(nodes.len());
        for &id in nodes {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        match unique.as_slice() {
            [] => return Err(AsmGraphError::InvalidInput("no nodes to merge".to_string())),
            [only] => return Ok(*only),
            _ => {}
        }

        let ordered = self.order_merge_list(&unique).ok_or_else(|| {
            AsmGraphError::InvalidInput("nodes do not form a simple unbranched path".to_string())
        })?;
        let (Some(&first), Some(&last)) = (ordered.first(), ordered.last()) else {
            return Err(AsmGraphError::InvalidInput("no nodes to merge".to_string()));
        };
        let rc_ordered: Vec<NodeId> = ordered
            .iter()
            .rev()
            .map(|&id| self[id].reverse_complement())
            .collect();

        let depth = self.mean_depth_of(&ordered);
        let length = path_length(self, &ordered);
        let base_name = ordered
            .iter()
            .map(|&id| self[id].name_without_sign())
            .collect::<Vec<_>>()
            .join("_");
        let base_name = self.unique_base_name(&base_name);

        let positive = NodeData {
            name: format!("{}+", base_name),
            depth,
            sequence: path_sequence(self, &ordered),
            length,
        };
        let negative = NodeData {
            name: format!("{}-", base_name),
            depth,
            sequence: path_sequence(self, &rc_ordered),
            length,
        };

        // On a circular chain the closing edge points back into the path and
        // is deleted along with it, so the merged node gets no self-loop.
        let leaving = self.edge_templates(&self.leaving_edges(last), true);
        let entering = self.edge_templates(&self.entering_edges(first), false);

        let (merged, _) = self.insert_node_pair(positive, negative)?;
        for (end, overlap, overlap_type) in leaving {
            self.create_edge(merged, end, overlap, overlap_type);
        }
        for (start, overlap, overlap_type) in entering {
            self.create_edge(start, merged, overlap, overlap_type);
        }

        self.delete_nodes(&ordered);
        debug!("Merged {} nodes into {}", ordered.len(), self[merged].name());
        Ok(merged)
    }

    /// Far endpoint and overlap of each edge: the end for leaving edges,
    /// the start for entering ones
    fn edge_templates(&self, edges: &[EdgeId], leaving: bool) -> Vec<EdgeTemplate> {
        edges
            .iter()
            .map(|&e| {
                let edge = &self[e];
                let other = if leaving { edge.end() } else { edge.start() };
                (other, edge.overlap(), edge.overlap_type())
            })
            .collect()
    }

    /// Duplicate a node pair, splitting its depth evenly between original
    /// and copy
    ///
    /// The copy is named `<name>_copy` (then `_copy2`, `_copy3`, ...), gets
    /// the same sequences, annotations and a copy of every edge of the
    /// positive node. Returns the positive node of the copy.
    pub fn duplicate_node_pair(&mut self, node: NodeId) -> Result<NodeId> {
        let original = self
            .positive_node(node)
            .ok_or_else(|| AsmGraphError::NotFound(format!("node {:?}", node)))?;
        let original_rc = self[original].reverse_complement();

        let base = format!("{}_copy", self[original].name_without_sign());
        let mut copy_name = base.clone();
        let mut suffix = 1;
        while self.contains_node(&format!("{}+", copy_name)) {
            suffix += 1;
            copy_name = format!("{}{}", base, suffix);
        }

        let depth = self[original].depth() / 2.0;
        let data_for = |graph: &Self, id: NodeId, sign: char| {
            let node = &graph[id];
            NodeData {
                name: format!("{}{}", copy_name, sign),
                depth,
                sequence: node.sequence().cloned(),
                length: node.length(),
            }
        };
        let positive = data_for(self, original, '+');
        let negative = data_for(self, original_rc, '-');

        let leaving = self.edge_templates(&self.leaving_edges(original), true);
        let entering = self.edge_templates(&self.entering_edges(original), false);

        let (copy, copy_rc) = self.insert_node_pair(positive, negative)?;
        self.annotations.copy_node(original, copy);
        self.annotations.copy_node(original_rc, copy_rc);

        for (end, overlap, overlap_type) in leaving {
            self.create_edge(copy, end, overlap, overlap_type);
        }
        for (start, overlap, overlap_type) in entering {
            self.create_edge(start, copy, overlap, overlap_type);
        }

        for id in [original, original_rc] {
            if let Some(node) = self.node_mut(id) {
                node.set_depth(depth);
            }
        }
        Ok(copy)
    }

    /// Delete nodes together with their complements and every incident edge
    ///
    /// Paths through a deleted node are dropped. Stale handles are ignored.
    pub fn delete_nodes(&mut self, nodes: &[NodeId]) {
        let mut doomed: Vec<NodeId> = Vec::new();
        for &id in nodes {
            let Some(node) = self.node(id) else {
                continue;
            };
            for n in [id, node.reverse_complement()] {
                if !doomed.contains(&n) {
                    doomed.push(n);
                }
            }
        }

        let edges: Vec<EdgeId> = doomed
            .iter()
            .flat_map(|&id| self[id].edges().to_vec())
            .collect();
        self.delete_edges(&edges);

        let before = self.paths.len();
        self.paths
            .retain(|_, path| !doomed.iter().any(|&id| path.contains(id)));
        if self.paths.len() < before {
            debug!("Dropped {} paths through deleted nodes", before - self.paths.len());
        }

        for id in doomed {
            self.remove_node(id);
        }
    }

    /// Delete edges together with their complements
    pub fn delete_edges(&mut self, edges: &[EdgeId]) {
        let mut doomed: HashSet<EdgeId> = HashSet::new();
        for &id in edges {
            if let Some(edge) = self.edge(id) {
                doomed.insert(id);
                doomed.insert(edge.reverse_complement());
            }
        }
        for id in doomed {
            self.remove_edge(id);
        }
    }

    /// Follow single-in/single-out links forward then backward from `start`
    fn maximal_chain(&self, start: NodeId, unchecked: &mut HashSet<NodeId>) -> Vec<NodeId> {
        let mut chain = VecDeque::from([start]);
        unchecked.remove(&start);
        unchecked.remove(&self[start].reverse_complement());

        while let Some(&last) = chain.back() {
            let leaving = self.leaving_edges(last);
            let [edge] = leaving.as_slice() else {
                break;
            };
            let next = self[*edge].end();
            if self.entering_edges(next).as_slice() != [*edge]
                || chain.contains(&next)
                || !unchecked.contains(&next)
            {
                break;
            }
            chain.push_back(next);
            unchecked.remove(&next);
            unchecked.remove(&self[next].reverse_complement());
        }

        while let Some(&first) = chain.front() {
            let entering = self.entering_edges(first);
            let [edge] = entering.as_slice() else {
                break;
            };
            let previous = self[*edge].start();
            if self.leaving_edges(previous).as_slice() != [*edge]
                || chain.contains(&previous)
                || !unchecked.contains(&previous)
            {
                break;
            }
            chain.push_front(previous);
            unchecked.remove(&previous);
            unchecked.remove(&self[previous].reverse_complement());
        }

        chain.into()
    }

    /// Merge every maximal unbranched chain in the graph
    ///
    /// Chains are found first, then merged one at a time with a
    /// cancellation check between merges; merges completed before a
    /// cancellation are kept. Returns the number of merges performed.
    pub fn merge_all_possible(&mut self, cancel: &CancellationToken) -> Result<usize> {
        let mut unchecked: HashSet<NodeId> = self.nodes().map(|(id, _)| id).collect();
        let order: Vec<NodeId> = self.nodes().map(|(id, _)| id).collect();

        let mut chains = Vec::new();
        for id in order {
            if unchecked.contains(&id) {
                let chain = self.maximal_chain(id, &mut unchecked);
                if chain.len() > 1 {
                    chains.push(chain);
                }
            }
        }
        debug!("Found {} mergeable chains", chains.len());

        let mut merged = 0;
        for chain in chains {
            cancel.checkpoint()?;
            match self.merge_linear_path(&chain) {
                Ok(_) => merged += 1,
                Err(e) => debug!("Skipped chain of {} nodes: {}", chain.len(), e),
            }
        }
        info!("Performed {} merges", merged);
        Ok(merged)
    }

    /// Rename a node pair; `old_name` may be given with or without its sign
    pub fn rename_node_pair(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        let invalid = |reason| AsmGraphError::InvalidNodeName {
            name: new_name.to_string(),
            reason,
        };
        if new_name.is_empty() {
            return Err(invalid("name is empty"));
        }
        for (symbol, reason) in [
            ('\t', "contains a tab"),
            ('\n', "contains a newline"),
            (',', "contains a comma"),
            (' ', "contains a space"),
        ] {
            if new_name.contains(symbol) {
                return Err(invalid(reason));
            }
        }

        let new_positive = format!("{}+", new_name);
        if self.contains_node(&new_positive) {
            return Err(AsmGraphError::NameCollision(new_positive));
        }

        let old_base = strip_sign(old_name);
        let positive = self
            .node_id(&format!("{}+", old_base))
            .ok_or_else(|| AsmGraphError::NotFound(format!("node {}", old_base)))?;
        let negative = self[positive].reverse_complement();

        self.rekey_node(positive, new_positive);
        self.rekey_node(negative, format!("{}-", new_name));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::Colour;

    fn add(graph: &mut AssemblyGraph, name: &str, depth: f64, seq: &str) -> NodeId {
        graph
            .create_complement_pair(name, depth, Some(seq.parse().unwrap()))
            .unwrap()
            .0
    }

    /// x -> a -> b -> c -> y with 3-base overlaps inside the chain
    fn chain_graph() -> (AssemblyGraph, [NodeId; 5]) {
        let mut graph = AssemblyGraph::new();
        let x = add(&mut graph, "x", 1.0, "TTTT");
        let a = add(&mut graph, "a", 2.0, "AAACCC");
        let b = add(&mut graph, "b", 4.0, "CCCGGG");
        let c = add(&mut graph, "c", 6.0, "GGGTTTTTT");
        let y = add(&mut graph, "y", 1.0, "CCCC");
        graph.create_edge(x, a, 0, OverlapType::ExactMatch);
        graph.create_edge(a, b, 3, OverlapType::ExactMatch);
        graph.create_edge(b, c, 3, OverlapType::ExactMatch);
        graph.create_edge(c, y, 0, OverlapType::ExactMatch);
        (graph, [x, a, b, c, y])
    }

    #[test]
    fn test_merge_three_node_chain() {
        let (mut graph, [x, a, b, c, y]) = chain_graph();
        let merged = graph.merge_linear_path(&[b, c, a]).unwrap();

        let node = &graph[merged];
        assert_eq!(node.name(), "a_b_c+");
        assert_eq!(node.sequence().unwrap().to_string(), "AAACCCGGGTTTTTT");
        assert_eq!(node.length(), 15);
        let expected_depth = (6.0 * 2.0 + 6.0 * 4.0 + 9.0 * 6.0) / 21.0;
        assert!((node.depth() - expected_depth).abs() < 1e-9);

        let rc = node.reverse_complement();
        assert_eq!(graph[rc].name(), "a_b_c-");
        assert_eq!(graph[rc].sequence().unwrap().to_string(), "AAAAAACCCGGGTTT");

        assert_eq!(graph.node_count(), 6);
        assert!(graph.edge_between(x, merged).is_some());
        assert!(graph.edge_between(merged, y).is_some());
        assert!(graph.node(a).is_none());
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_merge_circular_chain_drops_closing_edge() {
        let mut graph = AssemblyGraph::new();
        let a = add(&mut graph, "a", 1.0, "AAACCC");
        let b = add(&mut graph, "b", 1.0, "CCCGGG");
        let c = add(&mut graph, "c", 1.0, "GGGAAA");
        graph.create_edge(a, b, 3, OverlapType::ExactMatch);
        graph.create_edge(b, c, 3, OverlapType::ExactMatch);
        graph.create_edge(c, a, 3, OverlapType::ExactMatch);

        let merged = graph.merge_linear_path(&[a, b, c]).unwrap();
        assert_eq!(graph[merged].sequence().unwrap().to_string(), "AAACCCGGGAAA");
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.edge_between(merged, merged).is_none());
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_merge_accepts_reverse_orientation() {
        let (mut graph, [_, a, b, _, _]) = chain_graph();
        let b_rc = graph[b].reverse_complement();
        let merged = graph.merge_linear_path(&[a, b_rc]).unwrap();
        assert_eq!(graph[merged].sequence().unwrap().to_string(), "AAACCCGGG");
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_merge_branch_fails_without_mutation() {
        let (mut graph, [_, a, b, _, _]) = chain_graph();
        let extra = add(&mut graph, "z", 1.0, "CCCAAA");
        graph.create_edge(a, extra, 3, OverlapType::ExactMatch);

        let nodes_before = graph.node_count();
        let edges_before = graph.edge_count();
        assert!(graph.merge_linear_path(&[a, b]).is_err());
        assert_eq!(graph.node_count(), nodes_before);
        assert_eq!(graph.edge_count(), edges_before);
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_merge_single_node_is_noop() {
        let (mut graph, [_, a, _, _, _]) = chain_graph();
        let count = graph.node_count();
        assert_eq!(graph.merge_linear_path(&[a]).unwrap(), a);
        assert_eq!(graph.node_count(), count);
    }

    #[test]
    fn test_delete_nodes_removes_incident_edges() {
        let (mut graph, [_, a, b, c, _]) = chain_graph();
        graph.add_path("p", vec![a, b, c]).unwrap();
        let b_rc = graph[b].reverse_complement();

        graph.delete_nodes(&[b]);

        assert!(graph.node(b).is_none());
        assert!(graph.node(b_rc).is_none());
        assert_eq!(graph.node_count(), 8);
        assert_eq!(graph.edge_count(), 4);
        assert!(graph.leaving_edges(a).is_empty());
        assert!(graph.entering_edges(c).is_empty());
        assert_eq!(graph.path_count(), 0);
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_delete_edges_removes_complement() {
        let (mut graph, [_, a, b, _, _]) = chain_graph();
        let e = graph.edge_between(a, b).unwrap();
        graph.delete_edges(&[e]);
        assert_eq!(graph.edge_count(), 6);
        let b_rc = graph[b].reverse_complement();
        let a_rc = graph[a].reverse_complement();
        assert!(graph.edge_between(b_rc, a_rc).is_none());
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_duplicate_node_pair() {
        let (mut graph, [x, a, b, _, _]) = chain_graph();
        graph.annotations_mut().set_label(a, "original");
        graph.annotations_mut().set_colour(a, Colour::rgb(1, 2, 3));

        let a_rc = graph[a].reverse_complement();
        let copy = graph.duplicate_node_pair(a_rc).unwrap();

        assert_eq!(graph[copy].name(), "a_copy+");
        assert_eq!(graph[copy].depth(), 1.0);
        assert_eq!(graph[a].depth(), 1.0);
        assert_eq!(graph[a_rc].depth(), 1.0);
        assert_eq!(graph[copy].sequence(), graph[a].sequence());
        assert!(graph.edge_between(x, copy).is_some());
        assert!(graph.edge_between(copy, b).is_some());
        assert_eq!(graph.annotations().label(copy), Some("original"));
        assert_eq!(graph.annotations().colour(copy), Some(Colour::rgb(1, 2, 3)));

        let second = graph.duplicate_node_pair(a).unwrap();
        assert_eq!(graph[second].name(), "a_copy2+");
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_merge_all_possible() {
        let (mut graph, _) = chain_graph();
        let merged = graph.merge_all_possible(&CancellationToken::new()).unwrap();

        assert_eq!(merged, 1);
        assert_eq!(graph.node_count(), 2);
        let (_, node) = graph.positive_nodes().next().unwrap();
        assert_eq!(node.sequence().unwrap().to_string(), "TTTTAAACCCGGGTTTTTTCCCC");
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_merge_all_possible_cancelled() {
        let (mut graph, _) = chain_graph();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let count = graph.node_count();
        assert!(matches!(
            graph.merge_all_possible(&cancel),
            Err(AsmGraphError::Cancelled)
        ));
        assert_eq!(graph.node_count(), count);
    }

    #[test]
    fn test_rename_node_pair() {
        let (mut graph, [x, a, _, _, _]) = chain_graph();
        assert!(matches!(
            graph.rename_node_pair("a", "bad name"),
            Err(AsmGraphError::InvalidNodeName { .. })
        ));
        assert!(matches!(
            graph.rename_node_pair("a", "b"),
            Err(AsmGraphError::NameCollision(_))
        ));
        assert!(matches!(
            graph.rename_node_pair("missing", "m"),
            Err(AsmGraphError::NotFound(_))
        ));

        graph.rename_node_pair("a+", "alpha").unwrap();
        assert_eq!(graph.node_id("alpha+"), Some(a));
        assert!(graph.contains_node("alpha-"));
        assert!(!graph.contains_node("a+"));
        assert!(graph.edge_between(x, a).is_some());
    }
}
