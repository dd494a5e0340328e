//! Velvet LastGraph parser
//!
//! ```text
//! 2 8 21 1          <- node count, sequence count, k-mer size, ...
//! NODE 1 10 50      <- id, length, coverage sum
//! ACGTACGTAC        <- sequence
//! GTACGTACGT        <- its reverse complement
//! ARC 1 -2 3        <- edge 1+ -> 2-
//! NR ...            <- read mappings, ignored
//! ```

use super::{parse_sequence, CheckpointedLines, GraphBuilder, ParseOutcome};
use crate::cancel::CancellationToken;
use crate::config::Settings;
use crate::error::{AsmGraphError, Result};
use crate::graph::{DepthTag, NodeData, OverlapType};
use std::io::BufRead;

/// `5` -> `5+`, `-6` -> `6-`
fn signed_node_name(number: &str) -> String {
    match number.strip_prefix('-') {
        Some(id) => format!("{}-", id),
        None => format!("{}+", number),
    }
}

fn parse_field<T: std::str::FromStr>(field: &str, what: &str, line: usize) -> Result<T> {
    field
        .parse()
        .map_err(|_| AsmGraphError::malformed(line, format!("invalid {}: {:?}", what, field)))
}

pub(crate) fn parse<R: BufRead>(
    reader: R,
    settings: &Settings,
    cancel: &CancellationToken,
) -> Result<ParseOutcome> {
    let mut lines = CheckpointedLines::new(reader, settings, cancel);
    let mut builder = GraphBuilder::new();
    let mut kmer = 0;
    let mut first_line = true;

    while let Some(entry) = lines.next() {
        let (line_number, line) = entry?;

        if first_line {
            first_line = false;
            if let Some(k) = line.split_whitespace().nth(2) {
                kmer = parse_field(k, "k-mer size", line_number)?;
            }
            continue;
        }

        if line.starts_with("NODE") {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 {
                return Err(AsmGraphError::malformed(
                    line_number,
                    "NODE record needs an id, a length and a coverage",
                ));
            }
            let name = fields[1];
            let length: usize = parse_field(fields[2], "node length", line_number)?;
            let coverage: f64 = parse_field::<i64>(fields[3], "coverage", line_number)? as f64;
            let depth = if length > 0 {
                coverage / length as f64
            } else {
                coverage
            };

            let mut next_sequence = || -> Result<_> {
                let (n, text) = lines.next().ok_or_else(|| {
                    AsmGraphError::malformed(line_number, format!("node {} is missing its sequences", name))
                })??;
                parse_sequence(text.trim().as_bytes(), n)
            };
            let sequence = next_sequence()?;
            let rc_sequence = next_sequence()?;
            if sequence.reverse_complement() != rc_sequence {
                return Err(AsmGraphError::InconsistentSequence {
                    node: name.to_string(),
                });
            }

            builder.add_node(NodeData::new(format!("{}+", name), depth, Some(sequence)))?;
            builder.add_node(NodeData::new(format!("{}-", name), depth, Some(rc_sequence)))?;
        } else if line.starts_with("ARC") {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 3 {
                return Err(AsmGraphError::malformed(
                    line_number,
                    "ARC record needs two node ids",
                ));
            }
            builder.add_edge(
                signed_node_name(fields[1]),
                signed_node_name(fields[2]),
                0,
                OverlapType::ExactMatch,
            );
        } else if line.starts_with("NR") {
            // Read mappings follow the arcs; nothing left to load.
            break;
        }
    }

    let mut graph = builder.build()?;
    graph.kmer = kmer;
    graph.depth_tag = DepthTag::Kc;
    Ok(graph.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn load(input: &str) -> Result<ParseOutcome> {
        parse(Cursor::new(input), &Settings::default(), &CancellationToken::new())
    }

    #[test]
    fn test_single_node() {
        let input = "1 1 21 1\nNODE 1 10 50\nACGTACGTAA\nTTACGTACGT\n";
        let graph = load(input).unwrap().graph;

        assert_eq!(graph.kmer, 21);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 0);
        let node = graph.node_by_name("1+").unwrap();
        assert_eq!(node.depth(), 5.0);
        assert_eq!(node.length(), 10);
        assert!(graph.contains_node("1-"));
    }

    #[test]
    fn test_arcs() {
        let input = "2 2 21 1\n\
                     NODE 1 4 8\nACGG\nCCGT\n\
                     NODE 2 4 0\nTTTA\nTAAA\n\
                     ARC 1 -2 3\n\
                     NR 1 2\n\
                     ARC 1 2 3\n";
        let graph = load(input).unwrap().graph;

        let one = graph.node_id("1+").unwrap();
        let two_rc = graph.node_id("2-").unwrap();
        let e = graph.edge_between(one, two_rc).unwrap();
        assert_eq!(graph[e].overlap(), 0);
        assert_eq!(graph[e].overlap_type(), OverlapType::ExactMatch);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.node_by_name("2+").unwrap().depth(), 0.0);
    }

    #[test]
    fn test_inconsistent_sequence() {
        let input = "1 1 21 1\nNODE 1 10 50\nACGTACGTAA\nACGTACGTAA\n";
        let err = load(input).unwrap_err();
        assert!(matches!(err, AsmGraphError::InconsistentSequence { .. }));
    }

    #[test]
    fn test_short_node_record() {
        let err = load("1 1 21 1\nNODE 1 10\nA\nT\n").unwrap_err();
        assert!(matches!(err, AsmGraphError::MalformedInput { line: 2, .. }));
    }
}
