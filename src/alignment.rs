//! Alignment hits against graph nodes
//!
//! Hits are read from 12-column tabular BLAST output (`-outfmt 6`), where
//! the subject column is a node label as written by the FASTA exporter:
//! `NODE_<name>_length_<n>_cov_<d>`.

use crate::error::{AsmGraphError, Result};
use crate::graph::{AssemblyGraph, NodeId};
use crate::sequence::Sequence;
use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use std::io::Read;
use tracing::debug;

/// One forward-strand alignment of a query against a node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignmentHit {
    pub query: String,
    /// Node name decoded from the subject label
    pub node_name: String,
    pub identity: f64,
    pub alignment_length: usize,
    pub mismatches: usize,
    pub gap_opens: usize,
    pub query_start: usize,
    pub query_end: usize,
    /// 1-based, inclusive
    pub node_start: usize,
    pub node_end: usize,
    pub e_value: f64,
    pub bit_score: f64,
}

/// Thresholds a hit must meet to be kept; unset fields are not checked
#[derive(Debug, Clone, Default)]
pub struct HitFilters {
    pub min_alignment_length: Option<usize>,
    pub min_identity: Option<f64>,
    pub max_e_value: Option<f64>,
    pub min_bit_score: Option<f64>,
}

impl HitFilters {
    pub fn accepts(&self, hit: &AlignmentHit) -> bool {
        self.min_alignment_length
            .map_or(true, |min| hit.alignment_length >= min)
            && self.min_identity.map_or(true, |min| hit.identity >= min)
            && self.max_e_value.map_or(true, |max| hit.e_value <= max)
            && self.min_bit_score.map_or(true, |min| hit.bit_score >= min)
    }
}

/// Hits that resolved to a node of the graph
#[derive(Debug, Clone, Default)]
pub struct HitReport {
    pub hits: Vec<(NodeId, AlignmentHit)>,
    /// Forward-strand hits naming a node the graph does not have
    pub unknown_nodes: usize,
    /// Hits dropped by the filters
    pub filtered: usize,
}

/// The node name inside `NODE_<name>_length_<n>_cov_<d>`
///
/// Names may themselves contain underscores.
pub fn node_name_from_label(label: &str) -> Option<String> {
    let parts: Vec<&str> = label.split('_').collect();
    if parts.len() < 6 {
        return None;
    }
    Some(parts[1..parts.len() - 4].join("_"))
}

fn field<T: std::str::FromStr>(record: &StringRecord, index: usize, line: usize) -> Result<T> {
    let value = record.get(index).unwrap_or("").trim();
    value.parse().map_err(|_| {
        AsmGraphError::malformed(line, format!("invalid value {:?} in column {}", value, index + 1))
    })
}

/// Parse one tabular record
///
/// Returns `None` for short records and reverse-strand hits.
pub fn parse_hit(record: &StringRecord, line: usize) -> Result<Option<AlignmentHit>> {
    if record.len() < 12 {
        return Ok(None);
    }
    let node_start: usize = field(record, 8, line)?;
    let node_end: usize = field(record, 9, line)?;
    if node_start > node_end {
        return Ok(None);
    }

    let label = record.get(1).unwrap_or("");
    let node_name = node_name_from_label(label)
        .ok_or_else(|| AsmGraphError::malformed(line, format!("unrecognised node label {}", label)))?;

    Ok(Some(AlignmentHit {
        query: record.get(0).unwrap_or("").to_string(),
        node_name,
        identity: field(record, 2, line)?,
        alignment_length: field(record, 3, line)?,
        mismatches: field(record, 4, line)?,
        gap_opens: field(record, 5, line)?,
        query_start: field(record, 6, line)?,
        query_end: field(record, 7, line)?,
        node_start,
        node_end,
        e_value: field(record, 10, line)?,
        bit_score: field(record, 11, line)?,
    }))
}

/// Read tabular hits and resolve them against the graph
///
/// Lines starting with `#` are skipped, so `-outfmt 7` works too.
pub fn read_hits<R: Read>(reader: R, graph: &AssemblyGraph, filters: &HitFilters) -> Result<HitReport> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut report = HitReport::default();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line() as usize);
        let Some(hit) = parse_hit(&record, line)? else {
            continue;
        };
        let Some(id) = graph.node_id(&hit.node_name) else {
            report.unknown_nodes += 1;
            continue;
        };
        if !filters.accepts(&hit) {
            report.filtered += 1;
            continue;
        }
        report.hits.push((id, hit));
    }

    debug!(
        "Read {} hits ({} unknown nodes, {} filtered)",
        report.hits.len(),
        report.unknown_nodes,
        report.filtered
    );
    Ok(report)
}

impl AlignmentHit {
    /// The aligned stretch of the node's sequence
    pub fn node_sequence(&self, graph: &AssemblyGraph) -> Result<Sequence> {
        if self.node_start == 0 {
            return Err(AsmGraphError::OutOfBounds {
                start: 0,
                end: self.node_end,
                length: graph.node_by_name(&self.node_name).map_or(0, |n| n.length()),
            });
        }
        graph.node_sequence_range(&self.node_name, self.node_start - 1, self.node_end)
    }
}
