use asmgraph::export::{save_fasta, save_gfa, FastaNodes};
use asmgraph::{
    load_graph, AsmGraphError, AssemblyGraph, CancellationToken, GraphFileType, GraphStats,
    Settings,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

fn load(path: &Path) -> asmgraph::Result<AssemblyGraph> {
    load_graph(path, &Settings::default(), &CancellationToken::new()).map(|(graph, _)| graph)
}

/// Positive node name -> sequence
fn positive_sequences(graph: &AssemblyGraph) -> BTreeMap<String, String> {
    graph
        .positive_nodes()
        .map(|(_, n)| {
            let sequence = n.sequence().map(|s| s.to_string()).unwrap_or_default();
            (n.name().to_string(), sequence)
        })
        .collect()
}

/// (start, end) -> overlap for positive edges
fn positive_edges(graph: &AssemblyGraph) -> BTreeMap<(String, String), usize> {
    graph
        .edges()
        .filter(|&(id, _)| graph.is_positive_edge(id))
        .map(|(_, e)| {
            let key = (graph[e.start()].name().to_string(), graph[e.end()].name().to_string());
            (key, e.overlap())
        })
        .collect()
}

#[test]
fn test_lastgraph_single_node() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.LastGraph");
    fs::write(&path, "1\t10\t21\t1\nNODE\t1\t10\t50\nACGTACGTAC\nGTACGTACGT\n").unwrap();

    let (graph, report) = load_graph(&path, &Settings::default(), &CancellationToken::new()).unwrap();
    assert_eq!(report.file_type, GraphFileType::LastGraph);
    assert_eq!(graph.kmer, 21);
    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.edge_count(), 0);
    assert_eq!(graph.node_by_name("1+").unwrap().depth(), 5.0);
    assert_eq!(
        graph.node_by_name("1-").unwrap().sequence().unwrap().to_string(),
        "GTACGTACGT"
    );
}

#[test]
fn test_lastgraph_inconsistent_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.LastGraph");
    fs::write(&path, "1\t10\t21\t1\nNODE\t1\t10\t50\nACGTACGTAC\nACGTACGTAC\n").unwrap();

    assert!(matches!(
        load(&path),
        Err(AsmGraphError::InconsistentSequence { .. })
    ));
}

#[test]
fn test_fastg_to_gfa_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("assembly.fastg");
    let a = "ACGTTGCAAGGCTTAGCCTA";
    let b = "GGCTTAGCCTAGGGATTCAT";
    fs::write(
        &input,
        format!(
            ">EDGE_1_length_20_cov_2.0:EDGE_2_length_20_cov_4.0;\n{}\n>EDGE_2_length_20_cov_4.0;\n{}\n",
            a, b
        ),
    )
    .unwrap();

    let graph = load(&input).unwrap();
    let output = dir.path().join("assembly.gfa");
    save_gfa(&graph, &output).unwrap();

    let reloaded = load(&output).unwrap();
    assert_eq!(reloaded.file_type, Some(GraphFileType::Gfa));
    assert_eq!(positive_sequences(&reloaded), positive_sequences(&graph));
    assert_eq!(positive_edges(&reloaded), positive_edges(&graph));
    assert_eq!(positive_edges(&reloaded).values().copied().collect::<Vec<_>>(), vec![11]);
    assert_eq!(reloaded.node_by_name("2+").unwrap().depth(), 4.0);
    assert!(reloaded.validate().is_ok());
}

#[test]
fn test_gfa_round_trip_after_merge() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("chain.gfa");
    fs::write(
        &input,
        "H\tVN:Z:1.0\n\
         S\t1\tAAACCC\tDP:f:2\n\
         S\t2\tCCCGGG\tDP:f:4\n\
         S\t3\tGGGTTT\tDP:f:6\n\
         S\t4\tTTTAAA\tDP:f:1\n\
         S\t5\tTTTCCC\tDP:f:1\n\
         L\t1\t+\t2\t+\t3M\n\
         L\t2\t+\t3\t+\t3M\n\
         L\t3\t+\t4\t+\t3M\n\
         L\t3\t+\t5\t+\t3M\n",
    )
    .unwrap();

    let mut graph = load(&input).unwrap();
    let merges = graph.merge_all_possible(&CancellationToken::new()).unwrap();
    assert_eq!(merges, 1);
    assert_eq!(graph.node_count(), 6);
    let merged = graph.node_by_name("1_2_3+").unwrap();
    assert_eq!(merged.sequence().unwrap().to_string(), "AAACCCGGGTTT");
    assert!((merged.depth() - 4.0).abs() < 1e-9);

    let output = dir.path().join("merged.gfa");
    save_gfa(&graph, &output).unwrap();
    let reloaded = load(&output).unwrap();

    assert_eq!(positive_sequences(&reloaded), positive_sequences(&graph));
    assert_eq!(positive_edges(&reloaded), positive_edges(&graph));
    assert_eq!(
        GraphStats::from_graph(&reloaded).total_length,
        GraphStats::from_graph(&graph).total_length
    );
}

#[test]
fn test_gzipped_gfa_with_companion_fasta() {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let dir = tempfile::tempdir().unwrap();
    let gfa = dir.path().join("graph.gfa.gz");
    let mut encoder = GzEncoder::new(fs::File::create(&gfa).unwrap(), Compression::default());
    encoder
        .write_all(b"S\tutg1\t*\tLN:i:8\nS\tutg2\t*\tLN:i:4\nL\tutg1\t+\tutg2\t-\t0M\n")
        .unwrap();
    encoder.finish().unwrap();
    fs::write(dir.path().join("graph.fasta"), ">utg1\nACGTACGG\n>utg2\nTTTT\n").unwrap();

    let (graph, report) = load_graph(&gfa, &Settings::default(), &CancellationToken::new()).unwrap();
    assert_eq!(report.sequences_from_companion, 2);
    assert_eq!(
        graph.node_by_name("utg1-").unwrap().sequence().unwrap().to_string(),
        "CCGTACGT"
    );
    assert!(graph.validate().is_ok());
}

#[test]
fn test_fasta_export_reloads_as_plain_fasta() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("graph.gfa");
    fs::write(&input, "S\t7\tACGTACGTACGT\tDP:f:3.5\nS\t8\tGGGG\tDP:f:1\n").unwrap();
    let graph = load(&input).unwrap();

    let fasta = dir.path().join("nodes.fasta");
    let settings = Settings {
        fasta_line_width: 5,
        ..Settings::default()
    };
    assert_eq!(save_fasta(&graph, &fasta, FastaNodes::PositiveOnly, &settings).unwrap(), 2);
    let text = fs::read_to_string(&fasta).unwrap();
    assert!(text.starts_with(">NODE_7_length_12_cov_3.5\nACGTA\nCGTAC\nGT\n"));

    let reloaded = load(&fasta).unwrap();
    assert_eq!(reloaded.file_type, Some(GraphFileType::PlainFasta));
    assert_eq!(reloaded.node_by_name("7+").unwrap().depth(), 3.5);
    assert_eq!(positive_sequences(&reloaded), positive_sequences(&graph));
}
