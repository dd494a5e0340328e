//! Command-line interface for asmgraph

use crate::alignment::{read_hits, HitFilters};
use crate::cancel::CancellationToken;
use crate::config::Settings;
use crate::error::Result;
use crate::export::{save_fasta, save_gfa, FastaNodes};
use crate::formats::{load_graph, GraphFileType, LoadReport};
use crate::graph::AssemblyGraph;
use crate::stats::GraphStats;
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// asmgraph - load, simplify and export genome assembly graphs
#[derive(Parser)]
#[command(name = "asmgraph")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON settings file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Gfa,
    Fasta,
    /// One FASTA record per node pair
    FastaPositive,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Display statistics about an assembly graph
    Info {
        /// Graph file (LastGraph, FASTG, GFA, Trinity, ASQG or FASTA)
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long, value_enum, default_value = "text")]
        format: ReportFormat,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a graph to GFA or FASTA
    Convert {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(short = 't', long = "to", value_enum, default_value = "gfa")]
        to: ExportFormat,
    },

    /// Merge every unbranched chain and write the result as GFA
    Merge {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the detected format of a file
    Detect {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Apply CSV labels and colours, then write GFA
    Annotate {
        #[arg(short, long)]
        input: PathBuf,

        /// CSV or TSV with node names in the first column
        #[arg(long)]
        csv: PathBuf,

        /// Data column (1-based, after the node column) used as the node
        /// label; 0 for none
        #[arg(long, default_value_t = 1)]
        label_column: usize,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print node sequences hit by tabular BLAST output
    Hits {
        #[arg(short, long)]
        input: PathBuf,

        /// BLAST `-outfmt 6` results against the graph's FASTA export
        #[arg(long)]
        hits: PathBuf,

        /// Minimum percent identity
        #[arg(long)]
        min_identity: Option<f64>,

        /// Maximum e-value
        #[arg(long)]
        max_e_value: Option<f64>,
    },
}

/// Run a parsed command line
pub fn run(cli: Cli) -> Result<()> {
    let settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };

    match cli.command {
        Commands::Info {
            input,
            format,
            output,
        } => cmd_info(&input, format, output.as_deref(), &settings),
        Commands::Convert { input, output, to } => cmd_convert(&input, &output, to, &settings),
        Commands::Merge { input, output } => cmd_merge(&input, &output, &settings),
        Commands::Detect { input } => cmd_detect(&input),
        Commands::Annotate {
            input,
            csv,
            label_column,
            output,
        } => cmd_annotate(&input, &csv, label_column, &output, &settings),
        Commands::Hits {
            input,
            hits,
            min_identity,
            max_e_value,
        } => {
            let filters = HitFilters {
                min_identity,
                max_e_value,
                ..HitFilters::default()
            };
            cmd_hits(&input, &hits, &filters, &settings)
        }
    }
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Load with a spinner, reporting anything the loader had to drop
fn load_with_spinner(input: &Path, settings: &Settings) -> Result<(AssemblyGraph, LoadReport)> {
    let spinner = create_spinner("Loading graph...");
    let start = Instant::now();
    let loaded = load_graph(input, settings, &CancellationToken::new());
    match &loaded {
        Ok((graph, report)) => {
            spinner.finish_with_message(format!(
                "Loaded {} as {} ({} nodes) in {:.2?}",
                input.display(),
                report.file_type,
                graph.node_count() / 2,
                start.elapsed()
            ));
            if report.bad_edges > 0 {
                println!("  {} edges could not be loaded", report.bad_edges);
            }
            if report.sequences_from_companion > 0 {
                println!(
                    "  {} sequences filled from a companion FASTA",
                    report.sequences_from_companion
                );
            }
        }
        Err(_) => spinner.finish_and_clear(),
    }
    loaded
}

fn cmd_info(
    input: &Path,
    format: ReportFormat,
    output: Option<&Path>,
    settings: &Settings,
) -> Result<()> {
    let (graph, _) = load_with_spinner(input, settings)?;
    let stats = GraphStats::from_graph(&graph);

    let output_text = match format {
        ReportFormat::Json => stats.to_json()?,
        ReportFormat::Text => stats.format_summary(),
    };

    if let Some(output_path) = output {
        std::fs::write(output_path, &output_text)?;
        println!("Statistics written to: {}", output_path.display());
    } else {
        println!("{}", output_text);
    }
    Ok(())
}

fn export(graph: &AssemblyGraph, output: &Path, to: ExportFormat, settings: &Settings) -> Result<()> {
    match to {
        ExportFormat::Gfa => save_gfa(graph, output)?,
        ExportFormat::Fasta => {
            save_fasta(graph, output, FastaNodes::All, settings)?;
        }
        ExportFormat::FastaPositive => {
            save_fasta(graph, output, FastaNodes::PositiveOnly, settings)?;
        }
    }
    println!("Written to: {}", output.display());
    Ok(())
}

fn cmd_convert(input: &Path, output: &Path, to: ExportFormat, settings: &Settings) -> Result<()> {
    let (graph, _) = load_with_spinner(input, settings)?;
    export(&graph, output, to, settings)
}

fn cmd_merge(input: &Path, output: &Path, settings: &Settings) -> Result<()> {
    let (mut graph, _) = load_with_spinner(input, settings)?;

    let spinner = create_spinner("Merging unbranched chains...");
    let start = Instant::now();
    let before = graph.node_count() / 2;
    let merges = graph.merge_all_possible(&CancellationToken::new())?;
    spinner.finish_with_message(format!(
        "{} merges ({} -> {} nodes) in {:.2?}",
        merges,
        before,
        graph.node_count() / 2,
        start.elapsed()
    ));

    export(&graph, output, ExportFormat::Gfa, settings)
}

fn cmd_detect(input: &Path) -> Result<()> {
    let file_type: GraphFileType = GraphFileType::detect_file(input)?;
    println!("{}", file_type);
    Ok(())
}

fn cmd_annotate(
    input: &Path,
    csv: &Path,
    label_column: usize,
    output: &Path,
    settings: &Settings,
) -> Result<()> {
    let (mut graph, _) = load_with_spinner(input, settings)?;
    let report = graph.load_csv(csv)?;
    println!("Read {} columns", report.columns.len());
    if report.colours_loaded {
        println!("  Node colours taken from the colour column");
    }
    if report.unmatched_rows > 0 {
        println!("  {} rows matched no node", report.unmatched_rows);
    }

    if label_column > 0 {
        let labelled: Vec<_> = graph
            .nodes()
            .filter_map(|(id, _)| {
                let value = graph.annotations().csv_value(id, label_column - 1);
                (!value.is_empty()).then(|| (id, value.to_string()))
            })
            .collect();
        for (id, label) in labelled {
            graph.annotations_mut().set_label(id, &label);
        }
    }

    export(&graph, output, ExportFormat::Gfa, settings)
}

fn cmd_hits(input: &Path, hits: &Path, filters: &HitFilters, settings: &Settings) -> Result<()> {
    let (graph, _) = load_with_spinner(input, settings)?;
    let report = read_hits(File::open(hits)?, &graph, filters)?;

    for (_, hit) in &report.hits {
        let sequence = hit
            .node_sequence(&graph)
            .map_or_else(|e| format!("({})", e), |s| s.to_string());
        println!(
            "{}\t{}\t{}-{}\t{:.1}%\t{}",
            hit.query, hit.node_name, hit.node_start, hit.node_end, hit.identity, sequence
        );
    }
    if report.unknown_nodes > 0 {
        println!("{} hits named nodes not in the graph", report.unknown_nodes);
    }
    Ok(())
}
