//! Bidirected assembly graph
//!
//! Nodes and edges live in arenas addressed by stable integer handles
//! ([`NodeId`], [`EdgeId`]). Every node `X+` has a partner `X-` holding the
//! reverse-complement sequence, and every edge `A -> B` has a partner edge
//! `rc(B) -> rc(A)` carrying the same overlap. A handle is invalidated only
//! by an explicit delete; handles are never reused.

use crate::annotations::Annotations;
use crate::error::{AsmGraphError, Result};
use crate::formats::GraphFileType;
use crate::path::GraphPath;
use crate::sequence::Sequence;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::Index;
use std::path::PathBuf;

/// Stable handle to a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Stable handle to an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub(crate) usize);

/// How an edge's overlap length was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlapType {
    Unknown,
    ExactMatch,
    CigarInferred,
}

/// How node depth is written to GFA segment tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DepthTag {
    /// The source format carried no depth information
    #[default]
    None,
    /// `DP:f:` depth as a float
    Dp,
    /// `KC:i:` k-mer count (depth x length)
    Kc,
    /// `RC:i:` read count (depth x length)
    Rc,
    /// `FC:i:` fragment count (depth x length)
    Fc,
}

impl DepthTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepthTag::None => "",
            DepthTag::Dp => "DP",
            DepthTag::Kc => "KC",
            DepthTag::Rc => "RC",
            DepthTag::Fc => "FC",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "DP" => Some(DepthTag::Dp),
            "KC" => Some(DepthTag::Kc),
            "RC" => Some(DepthTag::Rc),
            "FC" => Some(DepthTag::Fc),
            _ => None,
        }
    }
}

impl fmt::Display for DepthTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The name of the other orientation: `5+` <-> `5-`
///
/// Names without a sign are treated as positive.
pub fn opposite_name(name: &str) -> String {
    match name.strip_suffix('-') {
        Some(base) => format!("{}+", base),
        None => format!("{}-", name.strip_suffix('+').unwrap_or(name)),
    }
}

/// A name with its trailing `+`/`-` removed
pub fn strip_sign(name: &str) -> &str {
    name.strip_suffix('+')
        .or_else(|| name.strip_suffix('-'))
        .unwrap_or(name)
}

/// Data needed to create one orientation of a node
#[derive(Debug, Clone)]
pub struct NodeData {
    pub name: String,
    pub depth: f64,
    pub sequence: Option<Sequence>,
    pub length: usize,
}

impl NodeData {
    pub fn new(name: impl Into<String>, depth: f64, sequence: Option<Sequence>) -> Self {
        let length = sequence.as_ref().map_or(0, Sequence::len);
        Self {
            name: name.into(),
            depth,
            sequence,
            length,
        }
    }

    /// A node whose sequence is not known yet, only its length
    pub fn placeholder(name: impl Into<String>, depth: f64, length: usize) -> Self {
        Self {
            name: name.into(),
            depth,
            sequence: None,
            length,
        }
    }

    /// The complementary orientation: reverse-complemented sequence (or a
    /// placeholder of the same length), same depth
    pub fn complement(&self) -> Self {
        Self {
            name: opposite_name(&self.name),
            depth: self.depth,
            sequence: self.sequence.as_ref().map(Sequence::reverse_complement),
            length: self.length,
        }
    }
}

/// One orientation of a contig
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    depth: f64,
    sequence: Option<Sequence>,
    length: usize,
    reverse_complement: NodeId,
    edges: Vec<EdgeId>,
}

impl Node {
    /// Full name including the trailing sign
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn name_without_sign(&self) -> &str {
        strip_sign(&self.name)
    }

    pub fn is_positive(&self) -> bool {
        !self.name.ends_with('-')
    }

    pub fn depth(&self) -> f64 {
        self.depth
    }

    /// `None` while the sequence is missing
    pub fn sequence(&self) -> Option<&Sequence> {
        self.sequence.as_ref()
    }

    pub fn sequence_is_missing(&self) -> bool {
        self.sequence.is_none()
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn reverse_complement(&self) -> NodeId {
        self.reverse_complement
    }

    /// Entering and leaving edges, in insertion order
    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    pub(crate) fn add_edge(&mut self, edge: EdgeId) {
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
    }

    pub(crate) fn remove_edge(&mut self, edge: EdgeId) {
        self.edges.retain(|&e| e != edge);
    }

    pub(crate) fn set_depth(&mut self, depth: f64) {
        self.depth = depth;
    }
}

/// A directed overlap between two nodes
#[derive(Debug, Clone)]
pub struct Edge {
    start: NodeId,
    end: NodeId,
    overlap: usize,
    overlap_type: OverlapType,
    reverse_complement: EdgeId,
}

impl Edge {
    pub fn start(&self) -> NodeId {
        self.start
    }

    pub fn end(&self) -> NodeId {
        self.end
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn overlap_type(&self) -> OverlapType {
        self.overlap_type
    }

    pub fn reverse_complement(&self) -> EdgeId {
        self.reverse_complement
    }
}

/// The graph context object every operation works on
#[derive(Debug, Clone, Default)]
pub struct AssemblyGraph {
    nodes: Vec<Option<Node>>,
    edges: Vec<Option<Edge>>,
    node_index: HashMap<String, NodeId>,
    edge_index: HashMap<(NodeId, NodeId), EdgeId>,
    pub(crate) paths: BTreeMap<String, GraphPath>,
    pub(crate) annotations: Annotations,
    /// Format the graph was loaded from
    pub file_type: Option<GraphFileType>,
    /// Source file, used to find companion sequence files
    pub source_path: Option<PathBuf>,
    /// k-mer size declared by the input, 0 if unknown
    pub kmer: usize,
    /// How depth is written back out
    pub depth_tag: DepthTag,
}

impl Index<NodeId> for AssemblyGraph {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        match self.nodes.get(id.0) {
            Some(Some(node)) => node,
            _ => panic!("stale node handle {:?}", id),
        }
    }
}

impl Index<EdgeId> for AssemblyGraph {
    type Output = Edge;

    fn index(&self, id: EdgeId) -> &Edge {
        match self.edges.get(id.0) {
            Some(Some(edge)) => edge,
            _ => panic!("stale edge handle {:?}", id),
        }
    }
}

impl AssemblyGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.0).and_then(Option::as_ref)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    pub(crate) fn edge_mut(&mut self, id: EdgeId) -> Option<&mut Edge> {
        self.edges.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Look a node up by its signed name
    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.node_index.get(name).copied()
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.node_id(name).map(|id| &self[id])
    }

    pub fn contains_node(&self, name: &str) -> bool {
        self.node_index.contains_key(name)
    }

    /// The edge `start -> end`, if any
    pub fn edge_between(&self, start: NodeId, end: NodeId) -> Option<EdgeId> {
        self.edge_index.get(&(start, end)).copied()
    }

    /// All live nodes in creation order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (NodeId(i), n)))
    }

    /// Positive-orientation nodes in creation order
    pub fn positive_nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes().filter(|(_, n)| n.is_positive())
    }

    /// All live edges in creation order
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (EdgeId(i), e)))
    }

    /// Number of nodes counting both orientations
    pub fn node_count(&self) -> usize {
        self.node_index.len()
    }

    /// Number of edges counting both members of each pair
    pub fn edge_count(&self) -> usize {
        self.edge_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_index.is_empty()
    }

    /// Orientation-flip helper: the positive member of a node's pair
    pub fn positive_node(&self, id: NodeId) -> Option<NodeId> {
        let node = self.node(id)?;
        if node.is_positive() {
            Some(id)
        } else {
            Some(node.reverse_complement)
        }
    }

    /// Edges of a live node that satisfy `keep`; empty for a stale handle
    fn incident_edges(&self, id: NodeId, keep: impl Fn(&Edge) -> bool) -> Vec<EdgeId> {
        let Some(node) = self.node(id) else {
            return Vec::new();
        };
        node.edges
            .iter()
            .copied()
            .filter(|&e| self.edge(e).map_or(false, &keep))
            .collect()
    }

    pub fn leaving_edges(&self, id: NodeId) -> Vec<EdgeId> {
        self.incident_edges(id, |e| e.start == id)
    }

    pub fn entering_edges(&self, id: NodeId) -> Vec<EdgeId> {
        self.incident_edges(id, |e| e.end == id)
    }

    /// Positive nodes adjacent to this node or its complement
    pub fn connected_positive_nodes(&self, id: NodeId) -> Vec<NodeId> {
        let mut connected = Vec::new();
        for e in self.incident_edges(id, |_| true) {
            let edge = &self[e];
            for other in [edge.start, edge.end] {
                if other == id {
                    continue;
                }
                if let Some(positive) = self.positive_node(other) {
                    if !connected.contains(&positive) {
                        connected.push(positive);
                    }
                }
            }
        }
        connected
    }

    /// 0, 1 or 2: one for each of "nothing leaves" and "nothing enters"
    ///
    /// A stale handle counts as 0.
    pub fn dead_end_count(&self, id: NodeId) -> usize {
        if self.node(id).is_none() {
            return 0;
        }
        let leaving = self.leaving_edges(id).is_empty() as usize;
        let entering = self.entering_edges(id).is_empty() as usize;
        leaving + entering
    }

    /// Whether this edge is the representative of its pair
    ///
    /// Own-pair edges and edges between two positive nodes are positive. If
    /// exactly one end is positive, the pair member whose name pair sorts
    /// first is chosen.
    pub fn is_positive_edge(&self, id: EdgeId) -> bool {
        let Some(edge) = self.edge(id) else {
            return false;
        };
        if edge.reverse_complement == id {
            return true;
        }
        let positives =
            self[edge.start].is_positive() as u8 + self[edge.end].is_positive() as u8;
        match positives {
            2 => true,
            0 => false,
            _ => {
                let rc = &self[edge.reverse_complement];
                let this = (self[edge.start].name(), self[edge.end].name());
                let other = (self[rc.start].name(), self[rc.end].name());
                this < other
            }
        }
    }

    /// Register a complementary node pair
    ///
    /// Fails with [`AsmGraphError::NameCollision`] if either name exists.
    pub(crate) fn insert_node_pair(
        &mut self,
        first: NodeData,
        second: NodeData,
    ) -> Result<(NodeId, NodeId)> {
        for name in [&first.name, &second.name] {
            if self.node_index.contains_key(name) {
                return Err(AsmGraphError::NameCollision(name.clone()));
            }
        }
        if first.name == second.name {
            return Err(AsmGraphError::NameCollision(first.name));
        }

        let first_id = NodeId(self.nodes.len());
        let second_id = NodeId(self.nodes.len() + 1);
        for (data, partner) in [(first, second_id), (second, first_id)] {
            self.node_index
                .insert(data.name.clone(), NodeId(self.nodes.len()));
            self.nodes.push(Some(Node {
                name: data.name,
                depth: data.depth,
                sequence: data.sequence,
                length: data.length,
                reverse_complement: partner,
                edges: Vec::new(),
            }));
        }
        Ok((first_id, second_id))
    }

    /// Allocate `name+` and `name-` with mutually reverse-complemented
    /// sequences. Returns the handles of the positive and negative nodes.
    pub fn create_complement_pair(
        &mut self,
        name_without_sign: &str,
        depth: f64,
        sequence: Option<Sequence>,
    ) -> Result<(NodeId, NodeId)> {
        let positive = NodeData::new(format!("{}+", name_without_sign), depth, sequence);
        let negative = positive.complement();
        self.insert_node_pair(positive, negative)
    }

    /// Create an edge and its complement
    ///
    /// Returns `None` without mutating when the edge already exists or
    /// either node handle is stale.
    pub fn create_edge(
        &mut self,
        start: NodeId,
        end: NodeId,
        overlap: usize,
        overlap_type: OverlapType,
    ) -> Option<EdgeId> {
        if self.edge_index.contains_key(&(start, end)) {
            return None;
        }
        let rc_start = self.node(end)?.reverse_complement;
        let rc_end = self.node(start)?.reverse_complement;
        let own_pair = rc_start == start && rc_end == end;

        let forward = EdgeId(self.edges.len());
        let backward = if own_pair {
            forward
        } else {
            EdgeId(self.edges.len() + 1)
        };

        self.edges.push(Some(Edge {
            start,
            end,
            overlap,
            overlap_type,
            reverse_complement: backward,
        }));
        self.edge_index.insert((start, end), forward);
        if !own_pair {
            self.edges.push(Some(Edge {
                start: rc_start,
                end: rc_end,
                overlap,
                overlap_type,
                reverse_complement: forward,
            }));
            self.edge_index.insert((rc_start, rc_end), backward);
        }

        for (edge, a, b) in [(forward, start, end), (backward, rc_start, rc_end)] {
            for id in [a, b] {
                if let Some(node) = self.node_mut(id) {
                    node.add_edge(edge);
                }
            }
        }
        Some(forward)
    }

    /// Create an edge by signed node names, ignoring unknown nodes
    pub fn create_edge_by_name(
        &mut self,
        start: &str,
        end: &str,
        overlap: usize,
        overlap_type: OverlapType,
    ) -> Option<EdgeId> {
        let start = self.node_id(start)?;
        let end = self.node_id(end)?;
        self.create_edge(start, end, overlap, overlap_type)
    }

    /// Set the overlap of an edge and of its complement
    pub fn set_edge_overlap(
        &mut self,
        id: EdgeId,
        overlap: usize,
        overlap_type: OverlapType,
    ) -> Result<()> {
        let rc = self
            .edge(id)
            .ok_or_else(|| AsmGraphError::NotFound(format!("edge {:?}", id)))?
            .reverse_complement;
        for e in [id, rc] {
            if let Some(edge) = self.edge_mut(e) {
                edge.overlap = overlap;
                edge.overlap_type = overlap_type;
            }
        }
        Ok(())
    }

    /// Detach a single edge from both endpoints and the edge map, then drop it
    pub(crate) fn remove_edge(&mut self, id: EdgeId) {
        let Some(edge) = self.edges.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        self.edge_index.remove(&(edge.start, edge.end));
        for node in [edge.start, edge.end] {
            if let Some(node) = self.node_mut(node) {
                node.remove_edge(id);
            }
        }
    }

    /// Drop a node that no longer has edges
    pub(crate) fn remove_node(&mut self, id: NodeId) {
        debug_assert!(self.node(id).map_or(true, |n| n.edges.is_empty()));
        if let Some(node) = self.nodes.get_mut(id.0).and_then(Option::take) {
            self.node_index.remove(&node.name);
            self.annotations.remove_node(id);
        }
    }

    pub(crate) fn rekey_node(&mut self, id: NodeId, new_name: String) {
        if let Some(node) = self.nodes.get_mut(id.0).and_then(Option::as_mut) {
            self.node_index.remove(&node.name);
            node.name = new_name.clone();
            self.node_index.insert(new_name, id);
        }
    }

    /// Give a pair its sequence, deriving the complement strand
    pub fn set_pair_sequence(&mut self, id: NodeId, sequence: Sequence) -> Result<()> {
        let rc = self
            .node(id)
            .ok_or_else(|| AsmGraphError::NotFound(format!("node {:?}", id)))?
            .reverse_complement;
        let rc_sequence = sequence.reverse_complement();
        let length = sequence.len();
        if let Some(node) = self.node_mut(rc) {
            node.sequence = Some(rc_sequence);
            node.length = length;
        }
        if let Some(node) = self.node_mut(id) {
            node.sequence = Some(sequence);
            node.length = length;
        }
        Ok(())
    }

    /// `base` if `base+` is free, otherwise `base_2`, `base_3`, ...
    pub fn unique_base_name(&self, base: &str) -> String {
        if !self.contains_node(&format!("{}+", base)) {
            return base.to_string();
        }
        (2..)
            .map(|suffix| format!("{}_{}", base, suffix))
            .find(|candidate| !self.contains_node(&format!("{}+", candidate)))
            .unwrap_or_else(|| base.to_string())
    }

    /// Sequence slice of a node by signed name, half-open range
    pub fn node_sequence_range(&self, name: &str, start: usize, end: usize) -> Result<Sequence> {
        let node = self
            .node_by_name(name)
            .ok_or_else(|| AsmGraphError::NotFound(format!("node {}", name)))?;
        let sequence = node
            .sequence()
            .ok_or_else(|| AsmGraphError::NotFound(format!("sequence of node {}", name)))?;
        sequence.subsequence(start, end)
    }

    /// Resolve a comma-separated list of node names
    ///
    /// In exact mode a name without a sign selects both orientations; in
    /// partial mode every node whose name contains the query is returned.
    /// The second element lists queries that matched nothing.
    pub fn find_nodes(&self, names: &str, exact: bool) -> (Vec<NodeId>, Vec<String>) {
        let mut found = Vec::new();
        let mut missing = Vec::new();

        for query in names.split(',').map(str::trim).filter(|q| !q.is_empty()) {
            let before = found.len();
            if !exact {
                found.extend(
                    self.nodes()
                        .filter(|(_, n)| n.name.contains(query))
                        .map(|(id, _)| id),
                );
            } else if query.ends_with('+') || query.ends_with('-') {
                found.extend(self.node_id(query));
            } else {
                found.extend(self.node_id(&format!("{}+", query)));
                found.extend(self.node_id(&format!("{}-", query)));
            }
            if found.len() == before {
                missing.push(query.to_string());
            }
        }

        (found, missing)
    }

    /// Nodes whose depth lies within `[min, max]`
    pub fn nodes_in_depth_range(&self, min: f64, max: f64) -> Vec<NodeId> {
        self.nodes()
            .filter(|(_, n)| n.depth >= min && n.depth <= max)
            .map(|(id, _)| id)
            .collect()
    }

    /// Set the depth of the given nodes and their complements
    ///
    /// Nothing changes unless every handle is live.
    pub fn change_node_depth(&mut self, nodes: &[NodeId], depth: f64) -> Result<()> {
        let pairs = nodes
            .iter()
            .map(|&id| {
                self.node(id)
                    .map(|n| (id, n.reverse_complement))
                    .ok_or_else(|| AsmGraphError::NotFound(format!("node {:?}", id)))
            })
            .collect::<Result<Vec<_>>>()?;
        if pairs.is_empty() {
            return Ok(());
        }
        for (id, rc) in pairs {
            for n in [id, rc] {
                if let Some(node) = self.node_mut(n) {
                    node.set_depth(depth);
                }
            }
        }
        if self.depth_tag == DepthTag::None {
            self.depth_tag = DepthTag::Kc;
        }
        Ok(())
    }

    /// Named paths, ordered by name
    pub fn paths(&self) -> impl Iterator<Item = &GraphPath> + '_ {
        self.paths.values()
    }

    pub fn path(&self, name: &str) -> Option<&GraphPath> {
        self.paths.get(name)
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    /// Register a path built from ordered node handles
    pub fn add_path(&mut self, name: &str, nodes: Vec<NodeId>) -> Result<()> {
        let path = GraphPath::from_ordered_nodes(self, name, nodes)?;
        self.paths.insert(name.to_string(), path);
        Ok(())
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }

    /// Check the pairing invariants, describing the first violation found
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (id, node) in self.nodes() {
            let rc = self
                .node(node.reverse_complement)
                .ok_or_else(|| format!("{} has no reverse complement", node.name))?;
            if rc.reverse_complement != id {
                return Err(format!("{} is not its partner's partner", node.name));
            }
            if rc.name != opposite_name(&node.name) {
                return Err(format!("{} is paired with {}", node.name, rc.name));
            }
            if let (Some(a), Some(b)) = (&node.sequence, &rc.sequence) {
                if a.reverse_complement() != *b {
                    return Err(format!("{} sequence is not reverse-complemented", node.name));
                }
            }
            for &e in &node.edges {
                let edge = self
                    .edge(e)
                    .ok_or_else(|| format!("{} references a deleted edge", node.name))?;
                if edge.start != id && edge.end != id {
                    return Err(format!("{} lists an edge it is not part of", node.name));
                }
            }
        }
        for (id, edge) in self.edges() {
            if self.node(edge.start).is_none() || self.node(edge.end).is_none() {
                return Err(format!("edge {:?} references a deleted node", id));
            }
            let rc = self
                .edge(edge.reverse_complement)
                .ok_or_else(|| format!("edge {:?} has no complement", id))?;
            if rc.start != self[edge.end].reverse_complement
                || rc.end != self[edge.start].reverse_complement
            {
                return Err(format!("edge {:?} complement has wrong endpoints", id));
            }
            if rc.overlap != edge.overlap || rc.overlap_type != edge.overlap_type {
                return Err(format!("edge {:?} complement has a different overlap", id));
            }
            if self.edge_index.get(&(edge.start, edge.end)) != Some(&id) {
                return Err(format!("edge {:?} missing from the edge map", id));
            }
        }
        Ok(())
    }
}
