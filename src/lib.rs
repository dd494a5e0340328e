//! asmgraph - genome assembly graphs
//!
//! Loads assembler output into a bidirected sequence graph where every node
//! and every edge is paired with its reverse complement, simplifies it, and
//! reports statistics.
//!
//! # Features
//!
//! - Read Velvet LastGraph, SPAdes FASTG, GFA 1, Trinity.fasta, ASQG and
//!   plain FASTA, sniffing the format from the first line
//! - Detect edge overlaps when the input does not state them
//! - Merge unbranched chains, duplicate, delete and rename node pairs
//! - Compute N50, depth and length quartiles, components and dead ends
//! - Write FASTA and GFA, with CSV labels and colours
//!
//! # Example
//!
//! ```no_run
//! use asmgraph::{AssemblyGraph, CancellationToken, GraphStats};
//!
//! let mut graph = AssemblyGraph::from_file("assembly.fastg").unwrap();
//! graph.merge_all_possible(&CancellationToken::new()).unwrap();
//!
//! let stats = GraphStats::from_graph(&graph);
//! println!("{}", stats.format_summary());
//!
//! asmgraph::export::save_gfa(&graph, "assembly.gfa").unwrap();
//! ```

pub mod alignment;
pub mod annotations;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod formats;
pub mod graph;
pub mod mutate;
pub mod overlap;
pub mod path;
pub mod sequence;
pub mod stats;

pub use cancel::CancellationToken;
pub use config::Settings;
pub use error::{AsmGraphError, Result};
pub use formats::{load_graph, GraphFileType, LoadReport};
pub use graph::{AssemblyGraph, DepthTag, EdgeId, NodeId, OverlapType};
pub use path::GraphPath;
pub use sequence::Sequence;
pub use stats::GraphStats;
