//! Statistics computation for assembly graphs

use crate::formats::GraphFileType;
use crate::graph::{AssemblyGraph, NodeId};
use serde::Serialize;
use std::collections::{HashSet, VecDeque};

/// Summary statistics about an assembly graph
///
/// Counts and lengths refer to positive nodes and positive edges, so each
/// complementary pair is counted once.
#[derive(Debug, Clone, Serialize)]
pub struct GraphStats {
    /// Format the graph was loaded from
    pub file_type: Option<GraphFileType>,
    /// Number of node pairs
    pub node_count: usize,
    /// Number of edge pairs
    pub edge_count: usize,
    /// Number of named paths
    pub path_count: usize,
    /// Sum of positive node lengths
    pub total_length: usize,
    /// Total length with each node's largest edge overlap removed
    pub total_length_minus_overlaps: usize,
    pub shortest_node: usize,
    pub longest_node: usize,
    pub first_quartile_length: usize,
    pub median_length: usize,
    pub third_quartile_length: usize,
    pub n50: usize,
    /// Length-weighted mean depth over all nodes
    pub mean_depth: f64,
    pub first_quartile_depth: f64,
    pub median_depth: f64,
    pub third_quartile_depth: f64,
    /// Depth of the node covering the middle base
    pub median_depth_by_base: f64,
    /// Total length scaled by each node's depth relative to the median
    pub estimated_sequence_length: usize,
    pub connected_components: usize,
    /// Sum of node lengths in the largest component
    pub largest_component_length: usize,
    pub dead_ends: usize,
    /// Total length of nodes with no edges on either side
    pub orphaned_length: usize,
    pub smallest_overlap: usize,
    pub largest_overlap: usize,
}

impl GraphStats {
    /// Compute statistics from an assembly graph
    pub fn from_graph(graph: &AssemblyGraph) -> Self {
        let mut positive_lengths: Vec<usize> =
            graph.positive_nodes().map(|(_, n)| n.length()).collect();
        positive_lengths.sort_unstable();
        let length_quartiles: Vec<f64> = positive_lengths.iter().map(|&l| l as f64).collect();
        let length_at = |fraction: f64| {
            let index = (length_quartiles.len() as f64 - 1.0) * fraction;
            value_at_fractional_index(&length_quartiles, index).round() as usize
        };

        let mut depths: Vec<f64> = graph.nodes().map(|(_, n)| n.depth()).collect();
        depths.sort_unstable_by(f64::total_cmp);
        let depth_at = |fraction: f64| {
            let index = (depths.len() as f64 - 1.0) * fraction;
            value_at_fractional_index(&depths, index)
        };

        let median_by_base = median_depth_by_base(graph);
        let (connected_components, largest_component_length) = connected_components(graph);
        let (smallest_overlap, largest_overlap) = overlap_range(graph);

        GraphStats {
            file_type: graph.file_type,
            node_count: positive_lengths.len(),
            edge_count: graph
                .edges()
                .filter(|&(id, _)| graph.is_positive_edge(id))
                .count(),
            path_count: graph.path_count(),
            total_length: positive_lengths.iter().sum(),
            total_length_minus_overlaps: total_length_minus_overlaps(graph),
            shortest_node: graph.nodes().map(|(_, n)| n.length()).min().unwrap_or(0),
            longest_node: graph.nodes().map(|(_, n)| n.length()).max().unwrap_or(0),
            first_quartile_length: length_at(0.25),
            median_length: length_at(0.5),
            third_quartile_length: length_at(0.75),
            n50: n50(&positive_lengths),
            mean_depth: mean_depth(graph),
            first_quartile_depth: depth_at(0.25),
            median_depth: depth_at(0.5),
            third_quartile_depth: depth_at(0.75),
            median_depth_by_base: median_by_base,
            estimated_sequence_length: estimated_sequence_length(graph, median_by_base),
            connected_components,
            largest_component_length,
            dead_ends: dead_ends(graph),
            orphaned_length: orphaned_length(graph),
            smallest_overlap,
            largest_overlap,
        }
    }

    /// Format statistics as a human-readable string
    pub fn format_summary(&self) -> String {
        let mut output = String::new();
        output.push_str("=== Assembly Graph Statistics ===\n\n");

        if let Some(file_type) = self.file_type {
            output.push_str(&format!("Format:                  {:>12}\n", file_type.as_str()));
        }
        output.push_str(&format!("Nodes:                   {:>12}\n", self.node_count));
        output.push_str(&format!("Edges:                   {:>12}\n", self.edge_count));
        output.push_str(&format!("Paths:                   {:>12}\n", self.path_count));
        output.push_str(&format!(
            "Connected components:    {:>12}\n",
            self.connected_components
        ));
        output.push_str(&format!(
            "Largest component:       {:>12} bp\n",
            self.largest_component_length
        ));
        output.push_str(&format!("Dead ends:               {:>12}\n", self.dead_ends));
        output.push('\n');

        output.push_str("--- Length Statistics ---\n");
        output.push_str(&format!("Total length:            {:>12} bp\n", self.total_length));
        output.push_str(&format!(
            "Total minus overlaps:    {:>12} bp\n",
            self.total_length_minus_overlaps
        ));
        output.push_str(&format!(
            "Estimated sequence:      {:>12} bp\n",
            self.estimated_sequence_length
        ));
        output.push_str(&format!("Shortest node:           {:>12} bp\n", self.shortest_node));
        output.push_str(&format!(
            "Lower quartile node:     {:>12} bp\n",
            self.first_quartile_length
        ));
        output.push_str(&format!("Median node:             {:>12} bp\n", self.median_length));
        output.push_str(&format!(
            "Upper quartile node:     {:>12} bp\n",
            self.third_quartile_length
        ));
        output.push_str(&format!("Longest node:            {:>12} bp\n", self.longest_node));
        output.push_str(&format!("N50:                     {:>12} bp\n", self.n50));
        output.push_str(&format!("Orphaned length:         {:>12} bp\n", self.orphaned_length));
        output.push('\n');

        output.push_str("--- Depth Statistics ---\n");
        output.push_str(&format!("Mean depth:              {:>12.2}x\n", self.mean_depth));
        output.push_str(&format!(
            "Lower quartile depth:    {:>12.2}x\n",
            self.first_quartile_depth
        ));
        output.push_str(&format!("Median depth:            {:>12.2}x\n", self.median_depth));
        output.push_str(&format!(
            "Upper quartile depth:    {:>12.2}x\n",
            self.third_quartile_depth
        ));
        output.push_str(&format!(
            "Median depth by base:    {:>12.2}x\n",
            self.median_depth_by_base
        ));

        if self.edge_count > 0 {
            output.push('\n');
            output.push_str("--- Overlap Statistics ---\n");
            output.push_str(&format!(
                "Overlap range:           {:>12}\n",
                format!("{}-{}", self.smallest_overlap, self.largest_overlap)
            ));
        }

        output
    }

    /// Export statistics as JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Value at a fractional position of a sorted slice, interpolating
/// between neighbours and clamping at both ends
pub fn value_at_fractional_index(sorted: &[f64], index: f64) -> f64 {
    match sorted {
        [] => 0.0,
        [only] => *only,
        _ => {
            let whole = index.floor();
            if whole < 0.0 {
                return sorted[0];
            }
            let w = whole as usize;
            if w >= sorted.len() - 1 {
                return sorted[sorted.len() - 1];
            }
            let fraction = index - whole;
            sorted[w] * (1.0 - fraction) + sorted[w + 1] * fraction
        }
    }
}

/// Length-weighted mean depth over every node, 0 for a graph without bases
pub fn mean_depth(graph: &AssemblyGraph) -> f64 {
    let total_length: usize = graph.nodes().map(|(_, n)| n.length()).sum();
    if total_length == 0 {
        return 0.0;
    }
    graph
        .nodes()
        .map(|(_, n)| n.length() as f64 * n.depth())
        .sum::<f64>()
        / total_length as f64
}

/// The length of the node whose cumulative length, largest first, first
/// reaches half the total
pub fn n50(lengths: &[usize]) -> usize {
    if lengths.is_empty() {
        return 0;
    }

    let mut sorted = lengths.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));

    let half = sorted.iter().sum::<usize>() as f64 / 2.0;
    let mut cumsum = 0;
    for len in sorted {
        cumsum += len;
        if cumsum as f64 >= half {
            return len;
        }
    }
    0
}

/// Median depth where each positive node counts once per base
pub fn median_depth_by_base(graph: &AssemblyGraph) -> f64 {
    let mut nodes: Vec<(usize, f64)> = graph
        .positive_nodes()
        .map(|(_, n)| (n.length(), n.depth()))
        .collect();
    let total: usize = nodes.iter().map(|&(length, _)| length).sum();
    if total == 0 {
        return 0.0;
    }
    if let [(_, depth)] = nodes.as_slice() {
        return *depth;
    }
    nodes.sort_unstable_by(|a, b| a.1.total_cmp(&b.1));

    let depth_at_base = |target: usize| {
        let mut sum = 0;
        for &(length, depth) in &nodes {
            sum += length;
            if sum > target {
                return depth;
            }
        }
        0.0
    };

    if total % 2 == 0 {
        (depth_at_base(total / 2 - 1) + depth_at_base(total / 2)) / 2.0
    } else {
        depth_at_base((total - 1) / 2)
    }
}

/// Number of components and the node length of the largest, treating each
/// complementary pair as one vertex
pub fn connected_components(graph: &AssemblyGraph) -> (usize, usize) {
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut count = 0;
    let mut largest = 0;

    for (start, _) in graph.positive_nodes() {
        if !visited.insert(start) {
            continue;
        }
        count += 1;
        let mut length = 0;
        let mut queue = VecDeque::from([start]);
        while let Some(id) = queue.pop_front() {
            length += graph[id].length();
            for neighbour in graph.connected_positive_nodes(id) {
                if visited.insert(neighbour) {
                    queue.push_back(neighbour);
                }
            }
        }
        largest = largest.max(length);
    }
    (count, largest)
}

pub fn dead_ends(graph: &AssemblyGraph) -> usize {
    graph
        .positive_nodes()
        .map(|(id, _)| graph.dead_end_count(id))
        .sum()
}

/// Total length of positive nodes with no edges at either end
pub fn orphaned_length(graph: &AssemblyGraph) -> usize {
    graph
        .positive_nodes()
        .filter(|&(id, _)| graph.dead_end_count(id) == 2)
        .map(|(_, n)| n.length())
        .sum()
}

/// Sum of positive node lengths, each minus its largest edge overlap
pub fn total_length_minus_overlaps(graph: &AssemblyGraph) -> usize {
    graph
        .positive_nodes()
        .map(|(_, node)| {
            let largest = node
                .edges()
                .iter()
                .map(|&e| graph[e].overlap())
                .max()
                .unwrap_or(0);
            node.length().saturating_sub(largest)
        })
        .sum()
}

/// Sequence length implied by treating each node as present
/// `round(depth / median)` times
///
/// Each node contributes its length minus its largest leaving overlap.
pub fn estimated_sequence_length(graph: &AssemblyGraph, median_depth: f64) -> usize {
    if median_depth == 0.0 {
        return 0;
    }
    graph
        .positive_nodes()
        .map(|(id, node)| {
            let overlap = graph
                .leaving_edges(id)
                .iter()
                .map(|&e| graph[e].overlap())
                .max()
                .unwrap_or(0);
            let copies = (node.depth() / median_depth).round() as usize;
            node.length().saturating_sub(overlap) * copies
        })
        .sum()
}

/// Smallest and largest edge overlap, `(0, 0)` without edges
pub fn overlap_range(graph: &AssemblyGraph) -> (usize, usize) {
    let mut overlaps = graph.edges().map(|(_, e)| e.overlap());
    let Some(first) = overlaps.next() else {
        return (0, 0);
    };
    overlaps.fold((first, first), |(min, max), o| (min.min(o), max.max(o)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::OverlapType;

    fn add(graph: &mut AssemblyGraph, name: &str, depth: f64, seq: &str) -> NodeId {
        graph
            .create_complement_pair(name, depth, Some(seq.parse().unwrap()))
            .unwrap()
            .0
    }

    /// 1 -> 2 -> 3 chained with 2-base overlaps, plus an isolated node 4
    fn create_test_graph() -> AssemblyGraph {
        let mut graph = AssemblyGraph::new();
        let one = add(&mut graph, "1", 2.0, "ACGTACGTAA");
        let two = add(&mut graph, "2", 4.0, "AAGGGGGGGGGGGGGGGGCC");
        let three = add(&mut graph, "3", 2.0, "CCTT");
        add(&mut graph, "4", 8.0, "GGGGGG");
        graph.create_edge(one, two, 2, OverlapType::ExactMatch);
        graph.create_edge(two, three, 2, OverlapType::ExactMatch);
        graph
    }

    #[test]
    fn test_basic_stats() {
        let stats = GraphStats::from_graph(&create_test_graph());
        assert_eq!(stats.node_count, 4);
        assert_eq!(stats.edge_count, 2);
        assert_eq!(stats.total_length, 40);
        assert_eq!(stats.shortest_node, 4);
        assert_eq!(stats.longest_node, 20);
        assert_eq!(stats.n50, 20);
        assert_eq!(stats.connected_components, 2);
        assert_eq!(stats.largest_component_length, 34);
        assert_eq!(stats.dead_ends, 4);
        assert_eq!(stats.orphaned_length, 6);
        assert_eq!((stats.smallest_overlap, stats.largest_overlap), (2, 2));
        assert_eq!(stats.total_length_minus_overlaps, 8 + 18 + 2 + 6);
        assert!((stats.mean_depth - 156.0 / 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_fractional_index() {
        let values = [1.0, 2.0, 4.0, 8.0];
        assert_eq!(value_at_fractional_index(&[], 1.0), 0.0);
        assert_eq!(value_at_fractional_index(&[3.0], 5.0), 3.0);
        assert_eq!(value_at_fractional_index(&values, -0.5), 1.0);
        assert_eq!(value_at_fractional_index(&values, 1.5), 3.0);
        assert_eq!(value_at_fractional_index(&values, 0.75), 1.75);
        assert_eq!(value_at_fractional_index(&values, 3.0), 8.0);
    }

    #[test]
    fn test_quartiles() {
        let stats = GraphStats::from_graph(&create_test_graph());
        // Positive lengths 4, 6, 10, 20
        assert_eq!(stats.first_quartile_length, 6);
        assert_eq!(stats.median_length, 8);
        assert_eq!(stats.third_quartile_length, 13);
        // Depths over both orientations: 2, 2, 2, 2, 4, 4, 8, 8
        assert_eq!(stats.first_quartile_depth, 2.0);
        assert_eq!(stats.median_depth, 3.0);
        assert_eq!(stats.third_quartile_depth, 5.0);
    }

    #[test]
    fn test_n50() {
        assert_eq!(n50(&[]), 0);
        assert_eq!(n50(&[2, 3, 4, 5, 6]), 5);
        assert_eq!(n50(&[100]), 100);
        assert_eq!(n50(&[10, 10]), 10);
    }

    #[test]
    fn test_median_depth_by_base() {
        let mut graph = AssemblyGraph::new();
        assert_eq!(median_depth_by_base(&graph), 0.0);

        add(&mut graph, "a", 2.0, "AAAAAAAAAA");
        assert_eq!(median_depth_by_base(&graph), 2.0);

        add(&mut graph, "b", 4.0, "CCCCCCCCCC");
        assert_eq!(median_depth_by_base(&graph), 3.0);

        add(&mut graph, "c", 6.0, "G".repeat(30).as_str());
        assert_eq!(median_depth_by_base(&graph), 6.0);
    }

    #[test]
    fn test_estimated_sequence_length() {
        let mut graph = AssemblyGraph::new();
        add(&mut graph, "a", 1.0, "AAAAAAAAAA");
        add(&mut graph, "b", 2.0, "CCCCCCCCCC");
        let median = median_depth_by_base(&graph);
        assert_eq!(median, 1.5);
        assert_eq!(estimated_sequence_length(&graph, median), 20);
        assert_eq!(estimated_sequence_length(&graph, 0.0), 0);
    }

    #[test]
    fn test_empty_graph() {
        let stats = GraphStats::from_graph(&AssemblyGraph::new());
        assert_eq!(stats.node_count, 0);
        assert_eq!(stats.n50, 0);
        assert_eq!(stats.mean_depth, 0.0);
        assert_eq!(stats.connected_components, 0);
        assert_eq!((stats.smallest_overlap, stats.largest_overlap), (0, 0));
    }

    #[test]
    fn test_summary_and_json() {
        let stats = GraphStats::from_graph(&create_test_graph());
        let summary = stats.format_summary();
        assert!(summary.contains("N50:"));
        assert!(summary.contains("Overlap range:"));

        let json = stats.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["node_count"], 4);
        assert_eq!(value["n50"], 20);
    }
}
