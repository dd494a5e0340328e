//! GFA (Graphical Fragment Assembly) parser
//!
//! Segments become node pairs, links become edge pairs and paths become
//! named [`GraphPath`](crate::path::GraphPath)s. Segment tags carry length
//! (`LN`), depth (`DP`, `KC`, `RC`, `FC`), custom labels (`LB`, `L2`) and
//! custom colours (`CL`, `C2`). A `*` sequence leaves the node waiting for
//! a companion FASTA.

use super::{parse_sequence, CheckpointedLines, GraphBuilder, ParseOutcome};
use crate::annotations::Colour;
use crate::cancel::CancellationToken;
use crate::config::Settings;
use crate::error::{AsmGraphError, Result};
use crate::graph::{AssemblyGraph, DepthTag, NodeData, OverlapType};
use crate::overlap::{cigar_is_simple_match, length_from_cigar};
use std::collections::HashMap;
use std::io::BufRead;
use tracing::{debug, warn};

/// Orientation of a segment in a path or link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Forward,
    Reverse,
}

impl Orientation {
    fn from_field(field: &str, line: usize) -> Result<Self> {
        match field {
            "+" => Ok(Orientation::Forward),
            "-" => Ok(Orientation::Reverse),
            _ => Err(AsmGraphError::malformed(
                line,
                format!("invalid orientation {:?}", field),
            )),
        }
    }

    fn sign(&self) -> char {
        match self {
            Orientation::Forward => '+',
            Orientation::Reverse => '-',
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sign())
    }
}

/// Optional `TAG:TYPE:VALUE` fields of a record
fn parse_tags<'a>(fields: &[&'a str]) -> HashMap<&'a str, &'a str> {
    fields
        .iter()
        .filter_map(|field| {
            let mut parts = field.splitn(3, ':');
            let tag = parts.next()?;
            let _type = parts.next()?;
            Some((tag, parts.next()?))
        })
        .collect()
}

/// Labels and colours to attach once node handles exist
#[derive(Debug, Default)]
struct SegmentExtras {
    labels: Vec<(String, String)>,
    colours: Vec<(String, Colour)>,
}

/// A path recorded by node name until the graph is built
struct PendingPath {
    name: String,
    steps: Vec<String>,
    line: usize,
}

/// Accumulates records as they are read
struct GfaReader {
    builder: GraphBuilder,
    extras: SegmentExtras,
    paths: Vec<PendingPath>,
    depth_tag: Option<DepthTag>,
    inferred_cigars: usize,
}

impl GfaReader {
    fn new() -> Self {
        Self {
            builder: GraphBuilder::new(),
            extras: SegmentExtras::default(),
            paths: Vec::new(),
            depth_tag: None,
            inferred_cigars: 0,
        }
    }

    fn parse_header(&mut self, fields: &[&str]) {
        if let Some(version) = parse_tags(&fields[1..]).get("VN") {
            debug!("GFA version {}", version);
        }
    }

    fn parse_segment(&mut self, fields: &[&str], line: usize) -> Result<()> {
        if fields.len() < 3 {
            return Err(AsmGraphError::malformed(
                line,
                "Segment record requires at least 3 fields",
            ));
        }
        let name = fields[1];
        let tags = parse_tags(&fields[3..]);

        let sequence = match fields[2] {
            "*" => None,
            bases => Some(parse_sequence(bases.as_bytes(), line)?),
        };
        let length = match (&sequence, tags.get("LN")) {
            (Some(seq), _) => seq.len(),
            (None, Some(ln)) => ln.parse().map_err(|_| {
                AsmGraphError::malformed(line, format!("invalid LN tag {:?}", ln))
            })?,
            (None, None) => 0,
        };

        let mut depth = 1.0;
        if let Some(dp) = tags.get("DP").and_then(|v| v.parse::<f64>().ok()) {
            depth = dp;
            self.depth_tag.get_or_insert(DepthTag::Dp);
        } else if let Some((tag, count)) = ["KC", "RC", "FC"]
            .iter()
            .find_map(|&t| tags.get(t).and_then(|v| v.parse::<f64>().ok()).map(|c| (t, c)))
        {
            depth = if length > 0 { count / length as f64 } else { count };
            if let Some(tag) = DepthTag::from_tag(tag) {
                self.depth_tag.get_or_insert(tag);
            }
        }

        let positive = NodeData {
            name: format!("{}+", name),
            depth,
            sequence,
            length,
        };
        let negative = positive.complement();

        for (tag, node) in [("LB", &positive.name), ("L2", &negative.name)] {
            if let Some(label) = tags.get(tag) {
                self.extras.labels.push((node.clone(), label.to_string()));
            }
        }
        for (tag, node) in [("CL", &positive.name), ("C2", &negative.name)] {
            if let Some(colour) = tags.get(tag).and_then(|c| Colour::parse(c)) {
                self.extras.colours.push((node.clone(), colour));
            }
        }

        self.builder.add_node(positive)?;
        self.builder.add_node(negative)
    }

    fn parse_link(&mut self, fields: &[&str], line: usize) -> Result<()> {
        if fields.len() < 6 {
            return Err(AsmGraphError::malformed(
                line,
                "Link record requires at least 6 fields",
            ));
        }
        let from = Orientation::from_field(fields[2], line)?;
        let to = Orientation::from_field(fields[4], line)?;
        let start = format!("{}{}", fields[1], from);
        let end = format!("{}{}", fields[3], to);

        let cigar = fields[5];
        let (overlap, overlap_type) = if cigar == "*" {
            (0, OverlapType::Unknown)
        } else if cigar_is_simple_match(cigar) {
            (length_from_cigar(cigar).max(0) as usize, OverlapType::ExactMatch)
        } else {
            self.inferred_cigars += 1;
            (length_from_cigar(cigar).max(0) as usize, OverlapType::CigarInferred)
        };

        self.builder.add_edge(start, end, overlap, overlap_type);
        Ok(())
    }

    fn parse_path(&mut self, fields: &[&str], line: usize) -> Result<()> {
        if fields.len() < 3 {
            return Err(AsmGraphError::malformed(
                line,
                "Path record requires at least 3 fields",
            ));
        }

        let mut steps = Vec::new();
        for step in fields[2].split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if !(step.ends_with('+') || step.ends_with('-')) {
                return Err(AsmGraphError::malformed(
                    line,
                    format!("Path step missing orientation: {}", step),
                ));
            }
            steps.push(step.to_string());
        }

        self.paths.push(PendingPath {
            name: fields[1].to_string(),
            steps,
            line,
        });
        Ok(())
    }

    fn finish(self) -> Result<AssemblyGraph> {
        let mut graph = self.builder.build()?;
        graph.depth_tag = self.depth_tag.unwrap_or_default();

        for (name, label) in self.extras.labels {
            if let Some(id) = graph.node_id(&name) {
                graph.annotations_mut().set_label(id, &label);
            }
        }
        for (name, colour) in self.extras.colours {
            if let Some(id) = graph.node_id(&name) {
                graph.annotations_mut().set_colour(id, colour);
            }
        }

        for path in self.paths {
            let nodes = path
                .steps
                .iter()
                .map(|step| {
                    graph.node_id(step).ok_or_else(|| {
                        AsmGraphError::malformed(
                            path.line,
                            format!("path {} uses unknown segment {}", path.name, step),
                        )
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            graph.add_path(&path.name, nodes)?;
        }

        if self.inferred_cigars > 0 {
            warn!(
                "{} links use CIGAR strings other than a plain match; overlaps were inferred",
                self.inferred_cigars
            );
        }
        Ok(graph)
    }
}

pub(crate) fn parse<R: BufRead>(
    reader: R,
    settings: &Settings,
    cancel: &CancellationToken,
) -> Result<ParseOutcome> {
    let mut gfa = GfaReader::new();

    for entry in CheckpointedLines::new(reader, settings, cancel) {
        let (line_num, line) = entry?;
        let line = line.trim_end();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        match fields[0] {
            "H" => gfa.parse_header(&fields),
            "S" => gfa.parse_segment(&fields, line_num)?,
            "L" => gfa.parse_link(&fields, line_num)?,
            "P" => gfa.parse_path(&fields, line_num)?,
            _ => {
                // Containments, walks and other records are not represented
            }
        }
    }

    Ok(gfa.finish()?.into())
}
