//! Plain FASTA loading, FASTA/FASTQ record reading and companion files
//!
//! A plain FASTA becomes a graph of unconnected contigs. Common assembler
//! naming conventions are recognised so that depth survives:
//!
//! - SPAdes/Velvet `NODE_5_length_1000_cov_12.5`
//! - SKESA `Contig_5_12.5` and `Contig_5_12.5_Circ`
//! - free-text `depth=12.5x` and `circular=true` anywhere in the header

use super::{open_reader, parse_sequence, CheckpointedLines, GraphBuilder, ParseOutcome};
use crate::cancel::CancellationToken;
use crate::config::Settings;
use crate::error::{AsmGraphError, Result};
use crate::graph::{AssemblyGraph, DepthTag, NodeData, OverlapType};
use crate::sequence::Sequence;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One FASTA or FASTQ entry
#[derive(Debug, Clone)]
pub struct FastaRecord {
    /// Full header without the leading `>` or `@`
    pub header: String,
    pub sequence: Sequence,
    /// Line number of the header
    pub line: usize,
}

impl FastaRecord {
    /// Header text up to the first whitespace
    pub fn id(&self) -> &str {
        self.header.split_whitespace().next().unwrap_or("")
    }
}

/// Read FASTA records, polling for cancellation
///
/// Sequence lines may be wrapped; whitespace inside them is dropped. Records
/// with an empty header are skipped.
pub(crate) fn read_fasta_records<R: BufRead>(
    reader: R,
    settings: &Settings,
    cancel: &CancellationToken,
) -> Result<Vec<FastaRecord>> {
    let mut records = Vec::new();
    let mut current: Option<(String, usize, Vec<u8>)> = None;

    let finish = |current: Option<(String, usize, Vec<u8>)>, records: &mut Vec<FastaRecord>| {
        if let Some((header, line, bases)) = current {
            if !header.is_empty() {
                records.push(FastaRecord {
                    header,
                    sequence: parse_sequence(bases, line)?,
                    line,
                });
            }
        }
        Ok::<_, AsmGraphError>(())
    };

    for entry in CheckpointedLines::new(reader, settings, cancel) {
        let (line_number, line) = entry?;
        if line.is_empty() {
            continue;
        }
        if let Some(header) = line.strip_prefix('>') {
            finish(current.take(), &mut records)?;
            current = Some((header.to_string(), line_number, Vec::new()));
        } else if let Some((_, _, bases)) = current.as_mut() {
            bases.extend(line.bytes().filter(|b| !b.is_ascii_whitespace()));
        }
    }
    finish(current, &mut records)?;
    Ok(records)
}

/// Read every record of a FASTA stream
pub fn read_fasta<R: BufRead>(reader: R) -> Result<Vec<FastaRecord>> {
    read_fasta_records(reader, &Settings::default(), &CancellationToken::new())
}

/// Read every record of a FASTQ stream
///
/// Records are four lines each; entries with an empty name or sequence, or
/// whose name line does not start with `@`, are skipped.
pub fn read_fastq<R: BufRead>(reader: R) -> Result<Vec<FastaRecord>> {
    let mut records = Vec::new();
    let mut lines = reader.lines();
    let mut line_number = 0;

    while let Some(name) = lines.next().transpose()? {
        let header_line = line_number + 1;
        let sequence = lines.next().transpose()?.unwrap_or_default();
        // Separator and quality lines.
        lines.next().transpose()?;
        lines.next().transpose()?;
        line_number += 4;

        let name = name.trim();
        let sequence = sequence.trim();
        let Some(header) = name.strip_prefix('@') else {
            continue;
        };
        if header.is_empty() || sequence.is_empty() {
            continue;
        }
        records.push(FastaRecord {
            header: header.to_string(),
            sequence: parse_sequence(sequence.as_bytes(), header_line + 1)?,
            line: header_line,
        });
    }
    Ok(records)
}

/// Read a FASTA or FASTQ file, chosen by its first character
pub fn read_sequence_file<P: AsRef<Path>>(path: P) -> Result<Vec<FastaRecord>> {
    let path = path.as_ref();
    let mut first_line = String::new();
    open_reader(path)?.read_line(&mut first_line)?;

    match first_line.chars().next() {
        Some('>') => read_fasta(open_reader(path)?),
        Some('@') => read_fastq(open_reader(path)?),
        _ => Err(AsmGraphError::UnknownFormat(format!(
            "{} is neither FASTA nor FASTQ",
            path.display()
        ))),
    }
}

/// Make a header usable as a node name: whitespace becomes `_`, commas and a
/// trailing sign are removed
pub fn clean_node_name(name: &str) -> String {
    let mut cleaned: String = name
        .chars()
        .filter(|&c| c != ',')
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    if cleaned.ends_with('+') || cleaned.ends_with('-') {
        cleaned.pop();
    }
    cleaned
}

/// Name and depth recovered from an assembler's naming convention
struct NamedContig<'a> {
    name: &'a str,
    depth: Option<f64>,
    circular: bool,
}

fn recognise_header(header: &str) -> Option<NamedContig<'_>> {
    let parts: Vec<&str> = header.split('_').collect();
    if parts.len() >= 6 && parts[2] == "length" && parts[4] == "cov" {
        let depth = parts[5].split_whitespace().next().and_then(|d| d.parse().ok());
        return Some(NamedContig {
            name: parts[1],
            depth,
            circular: false,
        });
    }
    if parts.len() >= 3 && parts[0] == "Contig" && parts[1].parse::<i64>().map_or(false, |n| n > 0) {
        return Some(NamedContig {
            name: parts[1],
            depth: parts[2].parse().ok(),
            circular: parts.len() == 4 && parts[3] == "Circ",
        });
    }
    None
}

/// Depth from a free-text `depth=` token: `depth=12.5x` or `depth=12.5`
fn depth_from_tag(lower_header: &str) -> Option<f64> {
    let value = lower_header.split("depth=").nth(1)?;
    let value = if value.contains('x') {
        value.split('x').next()?
    } else {
        value.split(' ').next()?
    };
    value.parse::<f32>().ok().map(f64::from)
}

pub(crate) fn parse<R: BufRead>(
    reader: R,
    settings: &Settings,
    cancel: &CancellationToken,
) -> Result<ParseOutcome> {
    let mut builder = GraphBuilder::new();
    let mut circular = Vec::new();
    let mut depth_tag = DepthTag::None;

    for record in read_fasta_records(reader, settings, cancel)? {
        let lower = record.header.to_lowercase();
        let mut depth = 1.0;
        let mut is_circular = lower.contains("circular=true");

        let base = match recognise_header(&record.header) {
            Some(contig) => {
                depth_tag = DepthTag::Kc;
                if let Some(d) = contig.depth {
                    depth = d;
                }
                is_circular |= contig.circular;
                contig.name
            }
            None => record.header.split(' ').next().unwrap_or(""),
        };

        let base = clean_node_name(base);
        if base.is_empty() {
            return Err(AsmGraphError::malformed(record.line, "empty sequence name"));
        }
        let name = format!("{}+", builder.unique_base_name(&base));

        if let Some(d) = depth_from_tag(&lower) {
            depth = d;
        }
        if is_circular {
            circular.push(name.clone());
        }
        builder.add_node(NodeData::new(name, depth, Some(record.sequence)))?;
    }

    for name in circular {
        builder.add_edge(name.clone(), name, 0, OverlapType::ExactMatch);
    }

    let mut graph = builder.build()?;
    graph.depth_tag = depth_tag;
    Ok(graph.into())
}

/// `tig00000012` -> `12`; other names are returned unchanged
pub fn simplify_canu_name(name: &str) -> &str {
    match name.strip_prefix("tig") {
        Some(number) if !number.is_empty() => {
            let trimmed = number.trim_start_matches('0');
            if trimmed.is_empty() {
                &number[number.len() - 1..]
            } else {
                trimmed
            }
        }
        _ => name,
    }
}

/// Candidate companion files for a graph: same base name with `.fa`,
/// `.fasta` or `.contigs.fasta`
fn companion_paths(graph_path: &Path) -> Vec<PathBuf> {
    let mut stem_source = graph_path.to_path_buf();
    if stem_source.extension().map_or(false, |ext| ext == "gz") {
        stem_source.set_extension("");
    }
    let Some(stem) = stem_source.file_stem().and_then(|s| s.to_str()) else {
        return Vec::new();
    };
    let dir = graph_path.parent().unwrap_or_else(|| Path::new(""));
    [".fa", ".fasta", ".contigs.fasta"]
        .iter()
        .map(|ext| dir.join(format!("{}{}", stem, ext)))
        .collect()
}

/// Fill missing node sequences from a companion FASTA
///
/// Returns the number of node pairs that received a sequence.
pub fn fill_from_companion(graph: &mut AssemblyGraph, graph_path: &Path) -> Result<usize> {
    let Some(fasta_path) = companion_paths(graph_path).into_iter().find(|p| p.exists()) else {
        debug!("No companion FASTA found for {}", graph_path.display());
        return Ok(0);
    };

    let mut filled = 0;
    for record in read_fasta(open_reader(&fasta_path)?)? {
        let name = format!("{}+", simplify_canu_name(record.id()));
        let Some(id) = graph.node_id(&name) else {
            continue;
        };
        if graph[id].sequence_is_missing() {
            graph.set_pair_sequence(id, record.sequence)?;
            filled += 1;
        }
    }
    if filled > 0 {
        info!(
            "Loaded {} node sequences from {}",
            filled,
            fasta_path.display()
        );
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn load(input: &str) -> AssemblyGraph {
        parse(Cursor::new(input), &Settings::default(), &CancellationToken::new())
            .unwrap()
            .graph
    }

    #[test]
    fn test_read_fasta_wrapped() {
        let records = read_fasta(Cursor::new(">a desc\nACGT\nAC GT\n\n>b\nTT\n")).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id(), "a");
        assert_eq!(records[0].sequence.to_string(), "ACGTACGT");
        assert_eq!(records[1].line, 5);
    }

    #[test]
    fn test_read_fastq() {
        let input = "@r1 x\nACGT\n+\nIIII\n@r2\n\n+\n\n";
        let records = read_fastq(Cursor::new(input)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].header, "r1 x");
    }

    #[test]
    fn test_read_sequence_file_dispatch() {
        let dir = tempdir().unwrap();
        let fastq = dir.path().join("reads.fq");
        fs::write(&fastq, "@q1\nACGTT\n+\nIIIII\n").unwrap();
        let records = read_sequence_file(&fastq).unwrap();
        assert_eq!(records[0].id(), "q1");
        assert_eq!(records[0].sequence.len(), 5);

        let other = dir.path().join("notes.txt");
        fs::write(&other, "hello\n").unwrap();
        assert!(matches!(
            read_sequence_file(&other),
            Err(AsmGraphError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_naming_conventions() {
        let graph = load(
            ">NODE_3_length_4_cov_7.5\nACGT\n\
             >Contig_9_2.5_Circ\nAAAA\n\
             >my contig, depth=3.5x circular=true\nCCCC\n\
             >my\nGGGG\n",
        );

        assert_eq!(graph.node_by_name("3+").unwrap().depth(), 7.5);
        assert_eq!(graph.node_by_name("9+").unwrap().depth(), 2.5);
        assert_eq!(graph.node_by_name("my+").unwrap().depth(), 3.5);
        assert!(graph.contains_node("my_2+"));
        assert_eq!(graph.depth_tag, DepthTag::Kc);

        for circular in ["9+", "my+"] {
            let id = graph.node_id(circular).unwrap();
            assert!(graph.edge_between(id, id).is_some(), "{}", circular);
        }
        assert_eq!(graph.edge_count(), 4);
    }

    #[test]
    fn test_clean_node_name() {
        assert_eq!(clean_node_name("a b,c+"), "a_bc");
        assert_eq!(clean_node_name("x\ty-"), "x_y");
    }

    #[test]
    fn test_simplify_canu_name() {
        assert_eq!(simplify_canu_name("tig00000012"), "12");
        assert_eq!(simplify_canu_name("tig0000"), "0");
        assert_eq!(simplify_canu_name("contig_1"), "contig_1");
    }

    #[test]
    fn test_fill_from_companion() {
        let dir = tempdir().unwrap();
        let gfa_path = dir.path().join("asm.gfa");
        fs::write(dir.path().join("asm.fasta"), ">tig0005 len=4\nAACG\n").unwrap();

        let mut graph = AssemblyGraph::new();
        graph
            .insert_node_pair(
                NodeData::placeholder("5+", 1.0, 4),
                NodeData::placeholder("5-", 1.0, 4),
            )
            .unwrap();
        assert_eq!(fill_from_companion(&mut graph, &gfa_path).unwrap(), 1);
        assert_eq!(
            graph.node_by_name("5-").unwrap().sequence().unwrap().to_string(),
            "CGTT"
        );
    }
}
