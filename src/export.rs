//! FASTA and GFA writers

use crate::config::Settings;
use crate::error::Result;
use crate::graph::{AssemblyGraph, DepthTag, EdgeId, Node, NodeId, OverlapType};
use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// Which nodes a FASTA export contains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastaNodes {
    /// Both orientations, headers carry signed names
    All,
    /// One record per pair, headers carry unsigned names
    PositiveOnly,
}

/// Split a sequence into lines of at most `width` bases, each ending in a
/// newline. A width of 0 writes the sequence on one line.
pub fn wrap_sequence(bases: &[u8], width: usize) -> String {
    if bases.is_empty() || width == 0 {
        let mut line = String::from_utf8_lossy(bases).into_owned();
        line.push('\n');
        return line;
    }
    let mut wrapped = String::with_capacity(bases.len() + bases.len() / width + 1);
    for chunk in bases.chunks(width) {
        wrapped.push_str(&String::from_utf8_lossy(chunk));
        wrapped.push('\n');
    }
    wrapped
}

fn fasta_header(node: &Node, signed: bool) -> String {
    let name = if signed {
        node.name()
    } else {
        node.name_without_sign()
    };
    format!(">NODE_{}_length_{}_cov_{}", name, node.length(), node.depth())
}

/// Write nodes as FASTA records, returning how many were written
///
/// Nodes without a sequence are skipped.
pub fn write_fasta<W: Write>(
    graph: &AssemblyGraph,
    writer: &mut W,
    which: FastaNodes,
    line_width: usize,
) -> Result<usize> {
    let mut written = 0;
    let mut skipped = 0;
    for (_, node) in graph.nodes() {
        if which == FastaNodes::PositiveOnly && !node.is_positive() {
            continue;
        }
        let Some(sequence) = node.sequence() else {
            skipped += 1;
            continue;
        };
        writeln!(writer, "{}", fasta_header(node, which == FastaNodes::All))?;
        writer.write_all(wrap_sequence(sequence.as_bytes(), line_width).as_bytes())?;
        written += 1;
    }
    if skipped > 0 {
        debug!("Skipped {} nodes without sequence", skipped);
    }
    Ok(written)
}

/// Order two base names numerically when both are integers
fn natural_cmp(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// Deterministic link order: start name, start sign, end name, end sign
fn compare_edges(graph: &AssemblyGraph, a: EdgeId, b: EdgeId) -> Ordering {
    let key = |id: EdgeId| {
        let edge = &graph[id];
        (&graph[edge.start()], &graph[edge.end()])
    };
    let ((a_start, a_end), (b_start, b_end)) = (key(a), key(b));
    // `+` sorts before `-`
    let sign = |node: &Node| !node.is_positive();

    natural_cmp(a_start.name_without_sign(), b_start.name_without_sign())
        .then_with(|| sign(a_start).cmp(&sign(b_start)))
        .then_with(|| natural_cmp(a_end.name_without_sign(), b_end.name_without_sign()))
        .then_with(|| sign(a_end).cmp(&sign(b_end)))
}

fn segment_line(graph: &AssemblyGraph, id: NodeId) -> String {
    let node = &graph[id];
    let rc = node.reverse_complement();
    let sequence = node
        .sequence()
        .map_or_else(|| "*".to_string(), |s| s.to_string());

    let mut line = format!(
        "S\t{}\t{}\tLN:i:{}",
        node.name_without_sign(),
        sequence,
        node.length()
    );
    match graph.depth_tag {
        DepthTag::None => {}
        DepthTag::Dp => line.push_str(&format!("\tDP:f:{}", node.depth())),
        tag => line.push_str(&format!(
            "\t{}:i:{}",
            tag.as_str(),
            (node.depth() * node.length() as f64).round() as u64
        )),
    }

    let annotations = graph.annotations();
    if let Some(label) = annotations.label(id) {
        line.push_str(&format!("\tLB:z:{}", label));
    }
    if let Some(label) = annotations.label(rc) {
        line.push_str(&format!("\tL2:z:{}", label));
    }
    if let Some(colour) = annotations.colour(id) {
        line.push_str(&format!("\tCL:z:{}", colour.name()));
    }
    if let Some(colour) = annotations.colour(rc) {
        line.push_str(&format!("\tC2:z:{}", colour.name()));
    }
    line
}

fn link_line(graph: &AssemblyGraph, id: EdgeId) -> String {
    let edge = &graph[id];
    let (start, end) = (&graph[edge.start()], &graph[edge.end()]);
    let sign = |node: &Node| if node.is_positive() { '+' } else { '-' };
    let cigar = match edge.overlap_type() {
        OverlapType::Unknown => "*".to_string(),
        _ => format!("{}M", edge.overlap()),
    };
    format!(
        "L\t{}\t{}\t{}\t{}\t{}",
        start.name_without_sign(),
        sign(start),
        end.name_without_sign(),
        sign(end),
        cigar
    )
}

/// Write the whole graph as GFA 1
///
/// Segments come in node order, links for positive edges only in a
/// deterministic order, then one `P` line per named path.
pub fn write_gfa<W: Write>(graph: &AssemblyGraph, writer: &mut W) -> Result<()> {
    writeln!(writer, "H\tVN:Z:1.0")?;

    for (id, _) in graph.positive_nodes() {
        writeln!(writer, "{}", segment_line(graph, id))?;
    }

    let mut links: Vec<EdgeId> = graph
        .edges()
        .map(|(id, _)| id)
        .filter(|&id| graph.is_positive_edge(id))
        .collect();
    links.sort_by(|&a, &b| compare_edges(graph, a, b));
    for id in &links {
        writeln!(writer, "{}", link_line(graph, *id))?;
    }

    for path in graph.paths() {
        writeln!(writer, "P\t{}\t{}\t*", path.name(), path.node_names(graph))?;
    }
    Ok(())
}

/// Write FASTA to a file using the configured line width
pub fn save_fasta<P: AsRef<Path>>(
    graph: &AssemblyGraph,
    path: P,
    which: FastaNodes,
    settings: &Settings,
) -> Result<usize> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    let written = write_fasta(graph, &mut writer, which, settings.fasta_line_width)?;
    writer.flush()?;
    info!("Wrote {} FASTA records to {}", written, path.as_ref().display());
    Ok(written)
}

pub fn save_gfa<P: AsRef<Path>>(graph: &AssemblyGraph, path: P) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    write_gfa(graph, &mut writer)?;
    writer.flush()?;
    info!("Wrote GFA to {}", path.as_ref().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::Colour;
    use crate::formats::{parse_graph, GraphFileType};
    use crate::cancel::CancellationToken;
    use std::io::Cursor;

    fn add(graph: &mut AssemblyGraph, name: &str, depth: f64, seq: &str) -> NodeId {
        graph
            .create_complement_pair(name, depth, Some(seq.parse().unwrap()))
            .unwrap()
            .0
    }

    fn to_string<F: FnOnce(&mut Vec<u8>)>(write: F) -> String {
        let mut buffer = Vec::new();
        write(&mut buffer);
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_wrap_sequence() {
        assert_eq!(wrap_sequence(b"ACGTACGT", 3), "ACG\nTAC\nGT\n");
        assert_eq!(wrap_sequence(b"ACGTAC", 3), "ACG\nTAC\n");
        assert_eq!(wrap_sequence(b"ACGT", 0), "ACGT\n");
        assert_eq!(wrap_sequence(b"", 70), "\n");
    }

    #[test]
    fn test_write_fasta() {
        let mut graph = AssemblyGraph::new();
        add(&mut graph, "1", 2.5, "AACCGGT");

        let all = to_string(|out| {
            assert_eq!(write_fasta(&graph, out, FastaNodes::All, 4).unwrap(), 2);
        });
        assert_eq!(
            all,
            ">NODE_1+_length_7_cov_2.5\nAACC\nGGT\n>NODE_1-_length_7_cov_2.5\nACCG\nGTT\n"
        );

        let positive = to_string(|out| {
            assert_eq!(write_fasta(&graph, out, FastaNodes::PositiveOnly, 70).unwrap(), 1);
        });
        assert_eq!(positive, ">NODE_1_length_7_cov_2.5\nAACCGGT\n");
    }

    #[test]
    fn test_write_gfa() {
        let mut graph = AssemblyGraph::new();
        let ten = add(&mut graph, "10", 2.0, "ACGTA");
        let two = add(&mut graph, "2", 3.0, "TAGG");
        let two_rc = graph[two].reverse_complement();
        graph.create_edge(ten, two, 2, OverlapType::ExactMatch);
        graph.create_edge(two, two_rc, 0, OverlapType::Unknown);
        graph.depth_tag = DepthTag::Kc;
        graph.annotations_mut().set_label(ten, "start");
        graph.annotations_mut().set_colour(two_rc, Colour::rgb(255, 0, 0));

        let gfa = to_string(|out| write_gfa(&graph, out).unwrap());
        let lines: Vec<&str> = gfa.lines().collect();
        assert_eq!(
            lines,
            vec![
                "H\tVN:Z:1.0",
                "S\t10\tACGTA\tLN:i:5\tKC:i:10\tLB:z:start",
                "S\t2\tTAGG\tLN:i:4\tKC:i:12\tC2:z:red",
                "L\t2\t+\t2\t-\t*",
                "L\t10\t+\t2\t+\t2M",
            ]
        );
    }

    #[test]
    fn test_gfa_reparses() {
        let mut graph = AssemblyGraph::new();
        let a = add(&mut graph, "a", 1.5, "ACGTTT");
        let b = add(&mut graph, "b", 4.0, "TTTGCA");
        graph.create_edge(a, b, 3, OverlapType::ExactMatch);
        graph.depth_tag = DepthTag::Dp;
        graph.add_path("ab", vec![a, b]).unwrap();

        let gfa = to_string(|out| write_gfa(&graph, out).unwrap());
        let (reloaded, report) = parse_graph(
            Cursor::new(gfa),
            GraphFileType::Gfa,
            &Settings::default(),
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(report.file_type, GraphFileType::Gfa);
        assert_eq!(reloaded.node_count(), 4);
        assert_eq!(reloaded.node_by_name("b+").unwrap().depth(), 4.0);
        let (a, b) = (reloaded.node_id("a+").unwrap(), reloaded.node_id("b+").unwrap());
        let edge = reloaded.edge_between(a, b).unwrap();
        assert_eq!(reloaded[edge].overlap(), 3);
        assert_eq!(reloaded.path("ab").unwrap().sequence().unwrap().to_string(), "ACGTTTGCA");
    }
}
