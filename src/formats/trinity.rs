//! Trinity.fasta parser
//!
//! Transcript headers describe how graph segments concatenate:
//!
//! ```text
//! >TRINITY_DN31_c1_g1_i1 len=301 path=[279:0-185 43:186-300] [-1, 279, 43, -2]
//! ```
//!
//! Each `id:start-end` segment becomes a node named `<component>_<id>`,
//! sliced from the transcript, and consecutive segments are chained.

use super::fasta::{read_fasta_records, FastaRecord};
use super::{GraphBuilder, ParseOutcome};
use crate::cancel::CancellationToken;
use crate::config::Settings;
use crate::error::{AsmGraphError, Result};
use crate::graph::{DepthTag, NodeData, OverlapType};
use regex::Regex;
use std::io::BufRead;
use std::sync::OnceLock;

/// The component prefix of a header, e.g. `31_c1` or `c0`
fn component_name(header: &str) -> Option<&str> {
    static COMPONENT: OnceLock<Option<Regex>> = OnceLock::new();
    let re = COMPONENT.get_or_init(|| Regex::new(r"c\d+_").ok()).as_ref()?;
    let start = re.find(header)?.start();
    let end = start + header[start..].find('_')?;

    let component = &header[..end];
    let component = ["TRINITY_DN", "TRINITY_GG", "TR", "GG"]
        .iter()
        .find_map(|prefix| component.strip_prefix(prefix))
        .unwrap_or(component);
    (component.len() >= 2).then_some(component)
}

/// The space-separated segments inside `path=[...]`
fn path_segments(header: &str) -> Option<Vec<&str>> {
    let start = header.find("path=[")? + "path=[".len();
    let length = header[start..].find(']')?;
    let path = &header[start..start + length];
    (!path.is_empty()).then(|| path.split(' ').filter(|s| !s.is_empty()).collect())
}

/// `274:0-228` -> (`274`, 0, 228); `@12@!:5-9` -> (`12`, 5, 9)
fn parse_segment(segment: &str) -> Option<(&str, usize, usize)> {
    let (id, range) = segment.split_once(':')?;
    let id = match id.strip_prefix('@') {
        Some(inner) => inner.get(..inner.len().checked_sub(2)?)?,
        None => id,
    };
    let (start, end) = range.split_once('-')?;
    Some((id, start.parse().ok()?, end.parse().ok()?))
}

fn add_transcript(builder: &mut GraphBuilder, record: &FastaRecord) -> Result<()> {
    let malformed = |message: &str| {
        AsmGraphError::malformed(record.line, format!("{}: {}", message, record.header))
    };
    if record.header.len() < 4 {
        return Err(malformed("header too short"));
    }
    let component = component_name(&record.header).ok_or_else(|| malformed("no component id"))?;
    let segments = path_segments(&record.header).ok_or_else(|| malformed("no path"))?;

    let mut previous: Option<String> = None;
    for segment in segments {
        let (id, start, end) = parse_segment(segment).ok_or_else(|| malformed("bad path segment"))?;
        let name = format!("{}_{}+", component, id);

        if !builder.contains(&name) {
            let past_end = end.checked_add(1).ok_or_else(|| malformed("bad path range"))?;
            let sequence = record
                .sequence
                .subsequence(start, past_end)
                .map_err(|e| malformed(&e.to_string()))?;
            builder.add_node(NodeData::new(name.clone(), 1.0, Some(sequence)))?;
        }
        if let Some(previous) = previous.take() {
            builder.add_edge(previous, name.clone(), 0, OverlapType::ExactMatch);
        }
        previous = Some(name);
    }
    Ok(())
}

pub(crate) fn parse<R: BufRead>(
    reader: R,
    settings: &Settings,
    cancel: &CancellationToken,
) -> Result<ParseOutcome> {
    let mut builder = GraphBuilder::new();
    for record in read_fasta_records(reader, settings, cancel)? {
        add_transcript(&mut builder, &record)?;
    }

    let mut graph = builder.build()?;
    graph.depth_tag = DepthTag::None;
    Ok(graph.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_component_name() {
        assert_eq!(component_name("TRINITY_DN31_c1_g1_i1 len=301"), Some("31_c1"));
        assert_eq!(component_name("TR1|c0_g1_i1 len=280"), Some("1|c0"));
        assert_eq!(component_name("c0_g1_i1 len=363"), Some("c0"));
        assert_eq!(component_name("comp0_c0_seq1 len=286"), Some("comp0_c0"));
        assert_eq!(component_name("nothing here"), None);
    }

    #[test]
    fn test_parse_segment() {
        assert_eq!(parse_segment("274:0-228"), Some(("274", 0, 228)));
        assert_eq!(parse_segment("@12@!:5-9"), Some(("12", 5, 9)));
        assert_eq!(parse_segment("274"), None);
    }

    #[test]
    fn test_transcripts_share_segments() {
        let input = ">c0_g1_i1 len=10 path=[1:0-3 2:4-9]\n\
                     ACGTTTGGCC\n\
                     >c0_g1_i2 len=8 path=[1:0-3 3:4-7]\n\
                     ACGTAAAA\n";
        let outcome = parse(Cursor::new(input), &Settings::default(), &CancellationToken::new()).unwrap();
        let graph = outcome.graph;

        assert_eq!(graph.node_count(), 6);
        assert_eq!(
            graph.node_by_name("c0_2+").unwrap().sequence().unwrap().to_string(),
            "TTGGCC"
        );
        let one = graph.node_id("c0_1+").unwrap();
        assert_eq!(graph.leaving_edges(one).len(), 2);
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_missing_path_is_fatal() {
        let input = ">c0_g1_i1 len=10 path=\nACGT\n";
        let result = parse(Cursor::new(input), &Settings::default(), &CancellationToken::new());
        assert!(matches!(result, Err(AsmGraphError::MalformedInput { line: 1, .. })));
    }

    #[test]
    fn test_out_of_range_segment_is_malformed() {
        for header in [
            ">c0_g1_i1 len=4 path=[1:0-18446744073709551615]",
            ">c0_g1_i1 len=4 path=[1:2-9]",
        ] {
            let input = format!("{}\nACGT\n", header);
            let result = parse(Cursor::new(input), &Settings::default(), &CancellationToken::new());
            assert!(matches!(result, Err(AsmGraphError::MalformedInput { line: 1, .. })));
        }
    }
}
