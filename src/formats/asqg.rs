//! ASQG (String Graph Assembler) parser
//!
//! `VT` lines carry a read and its sequence, `ED` lines carry an overlap as
//! two coordinate ranges. Only overlaps that span the end of the first
//! sequence and the start of the second, with equal lengths on both sides,
//! can be represented; other edges are dropped and counted.

use super::{parse_sequence, CheckpointedLines, GraphBuilder, ParseOutcome};
use crate::cancel::CancellationToken;
use crate::config::Settings;
use crate::error::{AsmGraphError, Result};
use crate::graph::{DepthTag, NodeData, OverlapType};
use std::io::BufRead;
use tracing::debug;

/// One side of an `ED` record: inclusive overlap range and sequence length
#[derive(Debug, Clone, Copy, PartialEq)]
struct OverlapSide {
    start: i64,
    end: i64,
    length: i64,
}

impl OverlapSide {
    /// The same region seen on the reverse strand
    fn flipped(self) -> Self {
        Self {
            start: self.length - self.end - 1,
            end: self.length - self.start - 1,
            length: self.length,
        }
    }

    fn overlap_length(&self) -> i64 {
        self.end - self.start + 1
    }

    fn touches_end(&self) -> bool {
        self.end == self.length - 1
    }

    fn touches_start(&self) -> bool {
        self.start == 0
    }
}

/// Orient both sides so the overlap sits at the end of the first sequence
/// and the start of the second, then check the geometry
///
/// Returns the signed names and overlap, or
/// [`AsmGraphError::InvalidOverlap`] for an unusable edge.
fn resolve_edge(
    s1: &str,
    side1: OverlapSide,
    s2: &str,
    side2: OverlapSide,
) -> Result<(String, String, usize)> {
    let (s1, side1) = if side1.touches_end() {
        (format!("{}+", s1), side1)
    } else {
        (format!("{}-", s1), side1.flipped())
    };
    let (s2, side2) = if side2.touches_start() {
        (format!("{}+", s2), side2)
    } else {
        (format!("{}-", s2), side2.flipped())
    };

    let overlap = side1.overlap_length();
    if overlap != side2.overlap_length() {
        return Err(AsmGraphError::InvalidOverlap(format!(
            "{} and {} overlap by {} and {} bases",
            s1,
            s2,
            overlap,
            side2.overlap_length()
        )));
    }
    if !side1.touches_end() || !side2.touches_start() {
        return Err(AsmGraphError::InvalidOverlap(format!(
            "{} -> {} overlap is internal to a sequence",
            s1, s2
        )));
    }
    let overlap = usize::try_from(overlap).map_err(|_| {
        AsmGraphError::InvalidOverlap(format!("{} -> {} has a negative overlap", s1, s2))
    })?;
    Ok((s1, s2, overlap))
}

pub(crate) fn parse<R: BufRead>(
    reader: R,
    settings: &Settings,
    cancel: &CancellationToken,
) -> Result<ParseOutcome> {
    let mut builder = GraphBuilder::new();
    let mut bad_edges = 0;

    for entry in CheckpointedLines::new(reader, settings, cancel) {
        let (line_number, line) = entry?;
        let fields: Vec<&str> = line.split('\t').collect();

        match fields[0] {
            "VT" => {
                if fields.len() < 3 {
                    return Err(AsmGraphError::malformed(
                        line_number,
                        "VT record needs a name and a sequence",
                    ));
                }
                let name = if fields[1].is_empty() { "node" } else { fields[1] };
                let sequence = parse_sequence(fields[2].as_bytes(), line_number)?;
                builder.add_node(NodeData::new(format!("{}+", name), 1.0, Some(sequence)))?;
            }
            "ED" => {
                let parts: Vec<&str> = fields
                    .get(1)
                    .map(|f| f.split(' ').collect())
                    .unwrap_or_default();
                if parts.len() < 8 {
                    return Err(AsmGraphError::malformed(
                        line_number,
                        "ED record needs two names and six coordinates",
                    ));
                }
                let mut numbers = [0i64; 6];
                for (slot, field) in numbers.iter_mut().zip(&parts[2..8]) {
                    *slot = field.parse().map_err(|_| {
                        AsmGraphError::malformed(line_number, format!("invalid coordinate {:?}", field))
                    })?;
                }
                let side1 = OverlapSide {
                    start: numbers[0],
                    end: numbers[1],
                    length: numbers[2],
                };
                let side2 = OverlapSide {
                    start: numbers[3],
                    end: numbers[4],
                    length: numbers[5],
                };

                match resolve_edge(parts[0], side1, parts[1], side2) {
                    Ok((start, end, overlap)) => {
                        builder.add_edge(start, end, overlap, OverlapType::ExactMatch)
                    }
                    Err(e) => {
                        debug!("Line {}: {}", line_number, e);
                        bad_edges += 1;
                    }
                }
            }
            _ => {}
        }
    }

    if bad_edges > 0 {
        debug!("Dropped {} ASQG edges with unsupported overlaps", bad_edges);
    }
    let mut graph = builder.build()?;
    graph.depth_tag = DepthTag::None;
    Ok(ParseOutcome { graph, bad_edges })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn load(input: &str) -> Result<ParseOutcome> {
        parse(Cursor::new(input), &Settings::default(), &CancellationToken::new())
    }

    #[test]
    fn test_resolve_edge_orientation() {
        let end = OverlapSide { start: 6, end: 9, length: 10 };
        let start = OverlapSide { start: 0, end: 3, length: 8 };
        assert_eq!(
            resolve_edge("a", end, "b", start).unwrap(),
            ("a+".to_string(), "b+".to_string(), 4)
        );

        // Overlap at the start of `a` means `a-` leads into `b`.
        let a_start = OverlapSide { start: 0, end: 3, length: 10 };
        assert_eq!(
            resolve_edge("a", a_start, "b", start).unwrap(),
            ("a-".to_string(), "b+".to_string(), 4)
        );

        let unequal = OverlapSide { start: 0, end: 4, length: 8 };
        assert!(matches!(
            resolve_edge("a", end, "b", unequal),
            Err(AsmGraphError::InvalidOverlap(_))
        ));

        let internal = OverlapSide { start: 2, end: 5, length: 10 };
        assert!(matches!(
            resolve_edge("a", internal, "b", start),
            Err(AsmGraphError::InvalidOverlap(_))
        ));
    }

    #[test]
    fn test_parse_asqg() {
        let input = "HT\tVN:i:1\n\
                     VT\tr1\tACGTACGTAC\n\
                     VT\tr2\tGTACTTTT\n\
                     VT\t\tCCCC\n\
                     ED\tr1 r2 6 9 10 0 3 8 0 0\n\
                     ED\tr1 r2 2 5 10 0 3 8 0 0\n";
        let outcome = load(input).unwrap();
        let graph = outcome.graph;

        assert_eq!(outcome.bad_edges, 1);
        assert_eq!(graph.node_count(), 6);
        assert!(graph.contains_node("node+"));
        let e = graph
            .edge_between(graph.node_id("r1+").unwrap(), graph.node_id("r2+").unwrap())
            .unwrap();
        assert_eq!(graph[e].overlap(), 4);
        assert_eq!(graph.node_by_name("r2+").unwrap().depth(), 1.0);
    }

    #[test]
    fn test_short_edge_record_is_fatal() {
        let input = "HT\tVN:i:1\nVT\tr1\tACGT\nED\tr1 r2 6 9\n";
        assert!(matches!(
            load(input),
            Err(AsmGraphError::MalformedInput { line: 3, .. })
        ));
    }
}
