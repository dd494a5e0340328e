//! Edge overlap detection
//!
//! Formats such as FASTG do not state how many bases adjacent contigs
//! share. Each edge is tested against candidate lengths by comparing the
//! source's suffix with the target's prefix; a majority vote then moves
//! edges onto the globally common lengths whenever those also match.

use crate::cancel::CancellationToken;
use crate::config::Settings;
use crate::error::Result;
use crate::graph::{AssemblyGraph, EdgeId, OverlapType};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

/// Whether the last `overlap` bases of the source equal the first `overlap`
/// bases of the target
///
/// An overlap of zero always matches. Missing sequences and stale edges
/// never match.
pub fn test_exact_overlap(graph: &AssemblyGraph, edge: EdgeId, overlap: usize) -> bool {
    let Some(edge) = graph.edge(edge) else {
        return false;
    };
    if overlap == 0 {
        return true;
    }
    let (Some(source), Some(target)) = (graph[edge.start()].sequence(), graph[edge.end()].sequence())
    else {
        return false;
    };
    if source.len() < overlap || target.len() < overlap {
        return false;
    }
    source.suffix(overlap) == target.prefix(overlap)
}

/// The largest overlap within the configured range that matches exactly,
/// or 0 when none does
pub fn auto_detect_edge_overlap(graph: &AssemblyGraph, edge: EdgeId, settings: &Settings) -> usize {
    let Some(e) = graph.edge(edge) else {
        return 0;
    };
    let max = settings
        .max_auto_overlap
        .min(graph[e.start()].length())
        .min(graph[e.end()].length());
    let min = settings.min_auto_overlap.max(1);
    if max < min {
        return 0;
    }
    (min..=max)
        .rev()
        .find(|&overlap| test_exact_overlap(graph, edge, overlap))
        .unwrap_or(0)
}

/// Overlap lengths ordered from most to least common, stopping once every
/// edge is accounted for; ties go to the shorter length
fn overlaps_by_frequency(histogram: &BTreeMap<usize, usize>, edge_count: usize) -> Vec<usize> {
    let mut remaining = histogram.clone();
    let mut sorted = Vec::new();
    let mut covered = 0;

    while covered < edge_count {
        let mut best: Option<(usize, usize)> = None;
        for (&overlap, &count) in &remaining {
            if count > best.map_or(0, |(_, c)| c) {
                best = Some((overlap, count));
            }
        }
        let Some((overlap, count)) = best else {
            break;
        };
        sorted.push(overlap);
        covered += count;
        remaining.insert(overlap, 0);
    }
    sorted
}

/// Detect the overlap of every edge, then prefer common overlap lengths
///
/// An edge keeps its own detected length unless a more common length also
/// matches exactly. Cancellation is honoured between edges.
pub fn auto_detect_all_overlaps(
    graph: &mut AssemblyGraph,
    settings: &Settings,
    cancel: &CancellationToken,
) -> Result<()> {
    // One representative per pair; complements always get the same value.
    let representatives: Vec<EdgeId> = graph
        .edges()
        .filter(|(id, e)| *id <= e.reverse_complement())
        .map(|(id, _)| id)
        .collect();
    if representatives.is_empty() {
        return Ok(());
    }
    let interval = settings.checkpoint_interval.max(1);

    for (i, &edge) in representatives.iter().enumerate() {
        if i % interval == 0 {
            cancel.checkpoint()?;
        }
        let overlap = auto_detect_edge_overlap(graph, edge, settings);
        graph.set_edge_overlap(edge, overlap, OverlapType::ExactMatch)?;
    }

    let mut histogram: BTreeMap<usize, usize> = BTreeMap::new();
    for (_, edge) in graph.edges() {
        *histogram.entry(edge.overlap()).or_insert(0) += 1;
    }
    let common = overlaps_by_frequency(&histogram, graph.edge_count());
    debug!("Overlap lengths by frequency: {:?}", common);

    let mut reassigned = 0;
    for &edge in &representatives {
        let current = graph[edge].overlap();
        for &candidate in &common {
            if candidate == current {
                break;
            }
            if test_exact_overlap(graph, edge, candidate) {
                graph.set_edge_overlap(edge, candidate, OverlapType::ExactMatch)?;
                reassigned += 1;
                break;
            }
        }
    }
    if reassigned > 0 {
        debug!("Moved {} edge pairs to a more common overlap", reassigned);
    }
    Ok(())
}

/// `55M`: a CIGAR made of a single match operation
pub fn cigar_is_simple_match(cigar: &str) -> bool {
    cigar.len() > 1
        && cigar.ends_with('M')
        && cigar[..cigar.len() - 1].bytes().all(|b| b.is_ascii_digit())
}

/// Overlap length implied by a CIGAR, relative to the link's target
///
/// Matches, insertions, clips and padding add to the length; deletions and
/// skips subtract from it.
pub fn length_from_cigar(cigar: &str) -> i64 {
    static OPERATION: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = OPERATION
        .get_or_init(|| Regex::new(r"(\d+)([MIDNSHP=X])").ok())
        .as_ref()
    else {
        return 0;
    };

    re.captures_iter(cigar)
        .map(|caps| {
            let count: i64 = caps[1].parse().unwrap_or(0);
            match &caps[2] {
                "D" | "N" => -count,
                _ => count,
            }
        })
        .sum()
}
