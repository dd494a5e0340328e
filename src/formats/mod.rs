//! Graph file loading
//!
//! The format is sniffed from the first non-empty line, the matching parser
//! fills a [`GraphBuilder`], and the builder materialises complement nodes
//! and resolves deferred edges once every node is known. A load either
//! returns a complete graph or an error; partial graphs never escape.

pub mod asqg;
pub mod fasta;
pub mod fastg;
pub mod gfa;
pub mod lastgraph;
pub mod trinity;

use crate::cancel::CancellationToken;
use crate::config::Settings;
use crate::error::{AsmGraphError, Result};
use crate::graph::{opposite_name, AssemblyGraph, NodeData, OverlapType};
use crate::sequence::Sequence;
use flate2::read::GzDecoder;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info};

/// The input formats understood by the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphFileType {
    /// Velvet LastGraph
    LastGraph,
    /// SPAdes FASTG
    Fastg,
    /// Graphical Fragment Assembly
    Gfa,
    /// Trinity.fasta with `path=[...]` headers
    Trinity,
    /// SGA/String Graph ASQG
    Asqg,
    /// Any other FASTA
    PlainFasta,
}

impl GraphFileType {
    /// Match a single line against the format signatures, most specific first
    pub fn detect_from_line(line: &str) -> Option<Self> {
        static PATTERNS: OnceLock<Vec<(Regex, GraphFileType)>> = OnceLock::new();
        let patterns = PATTERNS.get_or_init(|| {
            [
                (r"^\d+\s+\d+\s+\d+\s+\d+", GraphFileType::LastGraph),
                (r"^>(NODE|EDGE).*;", GraphFileType::Fastg),
                (r"^[SLH]\t", GraphFileType::Gfa),
                (r"path=\[", GraphFileType::Trinity),
                (r"^HT\t", GraphFileType::Asqg),
                (r"^>", GraphFileType::PlainFasta),
            ]
            .into_iter()
            .filter_map(|(pattern, file_type)| Regex::new(pattern).ok().map(|re| (re, file_type)))
            .collect()
        });
        patterns
            .iter()
            .find(|(re, _)| re.is_match(line))
            .map(|(_, file_type)| *file_type)
    }

    /// Sniff the first non-empty line of a reader
    pub fn detect<R: BufRead>(reader: R) -> Result<Self> {
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            return Self::detect_from_line(&line)
                .ok_or_else(|| AsmGraphError::UnknownFormat(truncate(&line, 60)));
        }
        Err(AsmGraphError::UnknownFormat("empty input".to_string()))
    }

    /// Sniff a file on disk
    pub fn detect_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::detect(open_reader(path)?)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GraphFileType::LastGraph => "LastGraph",
            GraphFileType::Fastg => "FASTG",
            GraphFileType::Gfa => "GFA",
            GraphFileType::Trinity => "Trinity.fasta",
            GraphFileType::Asqg => "ASQG",
            GraphFileType::PlainFasta => "FASTA",
        }
    }
}

impl fmt::Display for GraphFileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn truncate(line: &str, max: usize) -> String {
    line.chars().take(max).collect()
}

/// Open a file for buffered reading, decompressing `.gz` transparently
pub fn open_reader<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(AsmGraphError::FileNotFound(path.display().to_string()));
    }
    let file = File::open(path)?;

    if path.extension().map_or(false, |ext| ext == "gz") {
        return Ok(Box::new(BufReader::new(GzDecoder::new(file))));
    }
    Ok(Box::new(BufReader::new(file)))
}

/// Line iterator that numbers lines from 1 and polls for cancellation
/// every `interval` lines
pub(crate) struct CheckpointedLines<'a, R> {
    lines: std::io::Lines<R>,
    line_number: usize,
    interval: usize,
    cancel: &'a CancellationToken,
}

impl<'a, R: BufRead> CheckpointedLines<'a, R> {
    pub(crate) fn new(reader: R, settings: &Settings, cancel: &'a CancellationToken) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
            interval: settings.checkpoint_interval.max(1),
            cancel,
        }
    }

    /// Number of the line most recently returned
    pub(crate) fn line_number(&self) -> usize {
        self.line_number
    }
}

impl<R: BufRead> Iterator for CheckpointedLines<'_, R> {
    type Item = Result<(usize, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.lines.next()?;
        self.line_number += 1;
        if self.line_number % self.interval == 0 {
            if let Err(e) = self.cancel.checkpoint() {
                return Some(Err(e));
            }
        }
        Some(
            line.map(|l| (self.line_number, l.trim_end_matches('\r').to_string()))
                .map_err(AsmGraphError::from),
        )
    }
}

/// Validate raw sequence bytes, reporting the offending line
pub(crate) fn parse_sequence(bases: impl Into<Vec<u8>>, line: usize) -> Result<Sequence> {
    Sequence::new(bases).map_err(|e| AsmGraphError::malformed(line, e.to_string()))
}

/// An edge recorded by name until every node exists
#[derive(Debug, Clone)]
struct PendingEdge {
    start: String,
    end: String,
    overlap: usize,
    overlap_type: OverlapType,
}

/// Staging area between a parser and the finished graph
#[derive(Debug, Default)]
pub(crate) struct GraphBuilder {
    nodes: Vec<NodeData>,
    index: HashMap<String, usize>,
    edges: Vec<PendingEdge>,
}

impl GraphBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Stage one node orientation; duplicate names are refused
    pub(crate) fn add_node(&mut self, data: NodeData) -> Result<()> {
        if self.index.contains_key(&data.name) {
            return Err(AsmGraphError::NameCollision(data.name));
        }
        self.index.insert(data.name.clone(), self.nodes.len());
        self.nodes.push(data);
        Ok(())
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub(crate) fn node_mut(&mut self, name: &str) -> Option<&mut NodeData> {
        let i = *self.index.get(name)?;
        self.nodes.get_mut(i)
    }

    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn add_edge(
        &mut self,
        start: impl Into<String>,
        end: impl Into<String>,
        overlap: usize,
        overlap_type: OverlapType,
    ) {
        self.edges.push(PendingEdge {
            start: start.into(),
            end: end.into(),
            overlap,
            overlap_type,
        });
    }

    /// `base` if `base+` is unused, otherwise `base_2`, `base_3`, ...
    pub(crate) fn unique_base_name(&self, base: &str) -> String {
        if !self.contains(&format!("{}+", base)) {
            return base.to_string();
        }
        (2..)
            .map(|suffix| format!("{}_{}", base, suffix))
            .find(|candidate| !self.contains(&format!("{}+", candidate)))
            .unwrap_or_else(|| base.to_string())
    }

    /// Pair every node with its complement, creating missing ones from the
    /// reverse-complemented sequence, then create the deferred edges
    ///
    /// Edges that name an unknown node are skipped, as are duplicates.
    pub(crate) fn build(self) -> Result<AssemblyGraph> {
        let mut graph = AssemblyGraph::new();
        let index = self.index;
        let mut staged: Vec<Option<NodeData>> = self.nodes.into_iter().map(Some).collect();
        let mut synthesised = 0;

        for i in 0..staged.len() {
            let Some(data) = staged[i].take() else {
                continue;
            };
            let partner = match index.get(&opposite_name(&data.name)) {
                Some(&j) => staged.get_mut(j).and_then(Option::take),
                None => None,
            };
            let partner = partner.unwrap_or_else(|| {
                synthesised += 1;
                data.complement()
            });
            if data.name.ends_with('-') {
                graph.insert_node_pair(partner, data)?;
            } else {
                graph.insert_node_pair(data, partner)?;
            }
        }
        if synthesised > 0 {
            debug!("Created {} missing reverse-complement nodes", synthesised);
        }

        let mut skipped = 0;
        for edge in self.edges {
            if graph
                .create_edge_by_name(&edge.start, &edge.end, edge.overlap, edge.overlap_type)
                .is_none()
            {
                skipped += 1;
            }
        }
        if skipped > 0 {
            debug!("{} edge records were duplicates or referenced unknown nodes", skipped);
        }
        Ok(graph)
    }
}

/// What a single parser produced
#[derive(Debug)]
pub(crate) struct ParseOutcome {
    pub(crate) graph: AssemblyGraph,
    /// Records that were dropped without aborting the load
    pub(crate) bad_edges: usize,
}

impl From<AssemblyGraph> for ParseOutcome {
    fn from(graph: AssemblyGraph) -> Self {
        Self {
            graph,
            bad_edges: 0,
        }
    }
}

/// Summary of a successful load
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub file_type: GraphFileType,
    /// Edges dropped because their overlap geometry was unusable
    pub bad_edges: usize,
    /// Number of node pairs whose sequence came from a companion FASTA
    pub sequences_from_companion: usize,
}

/// Parse a graph of a known format from a reader
pub fn parse_graph<R: BufRead>(
    reader: R,
    file_type: GraphFileType,
    settings: &Settings,
    cancel: &CancellationToken,
) -> Result<(AssemblyGraph, LoadReport)> {
    let outcome = match file_type {
        GraphFileType::LastGraph => lastgraph::parse(reader, settings, cancel)?,
        GraphFileType::Fastg => fastg::parse(reader, settings, cancel)?,
        GraphFileType::Gfa => gfa::parse(reader, settings, cancel)?,
        GraphFileType::Trinity => trinity::parse(reader, settings, cancel)?,
        GraphFileType::Asqg => asqg::parse(reader, settings, cancel)?,
        GraphFileType::PlainFasta => fasta::parse(reader, settings, cancel)?,
    };

    let mut graph = outcome.graph;
    if graph.is_empty() {
        return Err(AsmGraphError::EmptyGraph(file_type.to_string()));
    }
    graph.file_type = Some(file_type);

    let report = LoadReport {
        file_type,
        bad_edges: outcome.bad_edges,
        sequences_from_companion: 0,
    };
    Ok((graph, report))
}

/// Load a graph from disk, sniffing its format
///
/// When some node sequences are missing, a companion FASTA with the same
/// base name (`.fa`, `.fasta` or `.contigs.fasta`) is used to fill them in.
pub fn load_graph<P: AsRef<Path>>(
    path: P,
    settings: &Settings,
    cancel: &CancellationToken,
) -> Result<(AssemblyGraph, LoadReport)> {
    let path = path.as_ref();
    let file_type = GraphFileType::detect_file(path)?;
    info!("Loading {} as {}", path.display(), file_type);

    let (mut graph, mut report) = parse_graph(open_reader(path)?, file_type, settings, cancel)?;
    graph.source_path = Some(path.to_path_buf());

    if graph.nodes().any(|(_, n)| n.sequence_is_missing()) {
        report.sequences_from_companion = fasta::fill_from_companion(&mut graph, path)?;
    }

    info!(
        "Loaded {} nodes and {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    if report.bad_edges > 0 {
        info!("{} edges could not be loaded", report.bad_edges);
    }
    Ok((graph, report))
}

impl AssemblyGraph {
    /// Load a graph with default settings
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        load_graph(path, &Settings::default(), &CancellationToken::new()).map(|(graph, _)| graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_detect_from_line() {
        let cases = [
            ("4 2 21 1", GraphFileType::LastGraph),
            (">EDGE_1_length_5_cov_2.0:EDGE_2_length_5_cov_1.0;", GraphFileType::Fastg),
            ("S\t1\tACGT", GraphFileType::Gfa),
            ("H\tVN:Z:1.0", GraphFileType::Gfa),
            (">c0_g1_i1 len=363 path=[119:0-185]", GraphFileType::Trinity),
            ("HT\tVN:i:1", GraphFileType::Asqg),
            (">contig_1 depth=3.0x", GraphFileType::PlainFasta),
        ];
        for (line, expected) in cases {
            assert_eq!(GraphFileType::detect_from_line(line), Some(expected), "{}", line);
        }
        assert_eq!(GraphFileType::detect_from_line("hello"), None);
    }

    #[test]
    fn test_detect_skips_blank_lines() {
        let input = "\n\n>NODE_1_length_4_cov_2.0;\nACGT\n";
        assert_eq!(
            GraphFileType::detect(Cursor::new(input)).unwrap(),
            GraphFileType::Fastg
        );
        assert!(matches!(
            GraphFileType::detect(Cursor::new("")),
            Err(AsmGraphError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_builder_synthesises_complements() {
        let mut builder = GraphBuilder::new();
        builder
            .add_node(NodeData::new("a+", 2.0, Some("AACC".parse().unwrap())))
            .unwrap();
        builder
            .add_node(NodeData::new("b-", 1.0, Some("GGTT".parse().unwrap())))
            .unwrap();
        builder.add_edge("a+", "b-", 0, OverlapType::ExactMatch);
        builder.add_edge("a+", "zzz+", 0, OverlapType::ExactMatch);
        assert!(builder
            .add_node(NodeData::new("a+", 1.0, None))
            .is_err());

        let graph = builder.build().unwrap();
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(
            graph.node_by_name("b+").unwrap().sequence().unwrap().to_string(),
            "AACC"
        );
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_cancelled_load() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let settings = Settings {
            checkpoint_interval: 1,
            ..Settings::default()
        };
        let input = ">a\nACGT\n>b\nACGT\n";
        let result = parse_graph(Cursor::new(input), GraphFileType::PlainFasta, &settings, &cancel);
        assert!(matches!(result, Err(AsmGraphError::Cancelled)));
    }

    #[test]
    fn test_missing_file() {
        let result = load_graph(
            "/nonexistent/graph.gfa",
            &Settings::default(),
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(AsmGraphError::FileNotFound(_))));
    }
}
