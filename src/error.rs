//! Error types for asmgraph

use thiserror::Error;

/// Result type alias for asmgraph operations
pub type Result<T> = std::result::Result<T, AsmGraphError>;

/// Main error type for asmgraph
#[derive(Error, Debug)]
pub enum AsmGraphError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found errors
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// The first line of the input matched none of the known formats
    #[error("Unrecognised graph file format: {0}")]
    UnknownFormat(String),

    /// A required field or pattern is absent; aborts the whole load
    #[error("Malformed input at line {line}: {message}")]
    MalformedInput { line: usize, message: String },

    /// A declared reverse-complement sequence does not match the computed one
    #[error("Invalid reverse-complement sequence for node {node}")]
    InconsistentSequence { node: String },

    /// The input parsed but produced no nodes
    #[error("No nodes could be loaded from {0}")]
    EmptyGraph(String),

    /// Edge overlap geometry does not meet adjacency requirements
    #[error("Invalid overlap: {0}")]
    InvalidOverlap(String),

    /// A node key already exists
    #[error("Node name already in use: {0}")]
    NameCollision(String),

    /// A proposed node name contains a forbidden character
    #[error("Invalid node name {name:?}: {reason}")]
    InvalidNodeName { name: String, reason: &'static str },

    /// Lookup by name or path failed
    #[error("Not found: {0}")]
    NotFound(String),

    /// A byte outside the nucleotide alphabet
    #[error("Invalid sequence symbol {symbol:?} at position {position}")]
    InvalidSequence { symbol: char, position: usize },

    /// Sub-range outside of a sequence
    #[error("Range {start}..{end} is outside sequence of length {length}")]
    OutOfBounds {
        start: usize,
        end: usize,
        length: usize,
    },

    /// A long-running operation observed a cancellation request
    #[error("Operation cancelled")]
    Cancelled,

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AsmGraphError {
    pub(crate) fn malformed(line: usize, message: impl Into<String>) -> Self {
        AsmGraphError::MalformedInput {
            line,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for AsmGraphError {
    fn from(err: serde_json::Error) -> Self {
        AsmGraphError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for AsmGraphError {
    fn from(err: csv::Error) -> Self {
        AsmGraphError::InvalidInput(format!("CSV error: {}", err))
    }
}
