//! SPAdes FASTG parser
//!
//! Each header names a node, its depth and the nodes it leads to:
//!
//! ```text
//! >EDGE_1_length_57_cov_12.3:EDGE_2_length_80_cov_4.0',EDGE_3_length_9_cov_1.0;
//! ```
//!
//! A trailing `'` marks the negative orientation. Edges are deferred until
//! every header has been read, and overlaps are detected from the sequences
//! afterwards.

use super::{parse_sequence, CheckpointedLines, GraphBuilder, ParseOutcome};
use crate::cancel::CancellationToken;
use crate::config::Settings;
use crate::error::{AsmGraphError, Result};
use crate::graph::{DepthTag, NodeData, OverlapType};
use crate::overlap;
use std::io::BufRead;

/// `EDGE_5_length_..._cov_...'` -> `5-`
fn signed_name(token: &str, line: usize) -> Result<(String, bool)> {
    let (token, negative) = match token.strip_suffix('\'') {
        Some(stripped) => (stripped, true),
        None => (token, false),
    };
    let id = token
        .split('_')
        .nth(1)
        .ok_or_else(|| AsmGraphError::malformed(line, format!("bad node reference {:?}", token)))?;
    let sign = if negative { '-' } else { '+' };
    Ok((format!("{}{}", id, sign), negative))
}

/// Node being accumulated: its name and the sequence lines seen so far
struct OpenNode {
    name: String,
    line: usize,
    bases: Vec<u8>,
}

fn close_node(builder: &mut GraphBuilder, open: Option<OpenNode>) -> Result<()> {
    let Some(open) = open else {
        return Ok(());
    };
    let sequence = parse_sequence(open.bases, open.line)?;
    if let Some(node) = builder.node_mut(&open.name) {
        node.length = sequence.len();
        node.sequence = Some(sequence);
    }
    Ok(())
}

pub(crate) fn parse<R: BufRead>(
    reader: R,
    settings: &Settings,
    cancel: &CancellationToken,
) -> Result<ParseOutcome> {
    let mut builder = GraphBuilder::new();
    let mut open: Option<OpenNode> = None;

    for entry in CheckpointedLines::new(reader, settings, cancel) {
        let (line_number, line) = entry?;

        let Some(header) = line.strip_prefix('>') else {
            if let Some(node) = open.as_mut() {
                node.bases
                    .extend(line.bytes().filter(|b| !b.is_ascii_whitespace()));
            }
            continue;
        };

        close_node(&mut builder, open.take())?;

        let header = header.trim_end();
        let header = header.strip_suffix(';').unwrap_or(header);
        let mut sections = header.splitn(2, ':');
        let this_node = sections.next().unwrap_or("");

        let parts: Vec<&str> = this_node.split('_').collect();
        if parts.len() < 6 {
            return Err(AsmGraphError::malformed(
                line_number,
                format!("FASTG header {:?} has too few fields", this_node),
            ));
        }
        let (name, negative) = signed_name(this_node, line_number)?;
        if builder.contains(&name) {
            return Err(AsmGraphError::malformed(
                line_number,
                format!("duplicate node {}", name),
            ));
        }

        let depth_field = if negative {
            parts[5].trim_end_matches('\'')
        } else {
            parts[5]
        };
        let depth: f64 = depth_field.parse().map_err(|_| {
            AsmGraphError::malformed(line_number, format!("invalid depth {:?}", depth_field))
        })?;

        builder.add_node(NodeData::new(name.clone(), depth, None))?;

        if let Some(targets) = sections.next().filter(|t| !t.is_empty()) {
            for target in targets.split(',') {
                let (target, _) = signed_name(target.trim(), line_number)?;
                builder.add_edge(name.clone(), target, 0, OverlapType::Unknown);
            }
        }

        open = Some(OpenNode {
            name,
            line: line_number,
            bases: Vec::new(),
        });
    }
    close_node(&mut builder, open)?;

    let mut graph = builder.build()?;
    graph.depth_tag = DepthTag::Kc;
    overlap::auto_detect_all_overlaps(&mut graph, settings, cancel)?;
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
    fn test_pairs_and_edges() {
        let input = ">EDGE_1_length_12_cov_3.5:EDGE_2_length_12_cov_1.0;\n\
                     AAAAACCCCCGG\n\
                     >EDGE_1_length_12_cov_3.5':EDGE_2_length_12_cov_1.0';\n\
                     CCGGGGGTTTTT\n\
                     >EDGE_2_length_12_cov_1.0;\n\
                     TTGCATGCATGC\n";
        let graph = load(input).unwrap().graph;

        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.node_by_name("1-").unwrap().depth(), 3.5);
        assert_eq!(
            graph.node_by_name("2-").unwrap().sequence().unwrap().to_string(),
            "GCATGCATGCAA"
        );
        assert!(graph
            .edge_between(graph.node_id("1+").unwrap(), graph.node_id("2+").unwrap())
            .is_some());
        assert!(graph
            .edge_between(graph.node_id("1-").unwrap(), graph.node_id("2-").unwrap())
            .is_some());
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_overlaps_detected() {
        let a = "ACGTTGCAAGGCTTAGCCTA";
        let b = "GGCTTAGCCTAGGGATTCAT";
        let input = format!(
            ">NODE_1_length_20_cov_1.0:NODE_2_length_20_cov_1.0;\n{}\n>NODE_2_length_20_cov_1.0;\n{}\n",
            a, b
        );
        let graph = load(&input).unwrap().graph;
        let e = graph
            .edge_between(graph.node_id("1+").unwrap(), graph.node_id("2+").unwrap())
            .unwrap();
        assert_eq!(graph[e].overlap(), 11);
        assert_eq!(graph[e].overlap_type(), OverlapType::ExactMatch);
    }

    #[test]
    fn test_duplicate_node_is_fatal() {
        let input = ">EDGE_1_length_4_cov_1.0;\nACGT\n>EDGE_1_length_4_cov_1.0;\nACGT\n";
        assert!(matches!(
            load(input),
            Err(AsmGraphError::MalformedInput { line: 3, .. })
        ));
    }

    #[test]
    fn test_short_header_is_fatal() {
        assert!(load(">EDGE_1_length_4;\nACGT\n").is_err());
    }
}
