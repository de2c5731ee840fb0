//! Engine error types

use aam_core::{ConnectionError, DirectoryError, ExecutionError, Node};
use aam_protocol::ParseError;
use thiserror::Error;

/// Fatal errors that stop a fleet operation
#[derive(Error, Debug)]
pub enum EngineError {
    /// Cluster inventory or profiles could not be read
    #[error("Failed to read cluster state: {0}")]
    Directory(#[from] DirectoryError),

    /// Session to a node could not be opened
    #[error("Node {node}: {source}")]
    Connection {
        node: String,
        #[source]
        source: ConnectionError,
    },

    /// Transport failure while running commands on a node
    #[error("Node {node}: {source}")]
    Execution {
        node: String,
        #[source]
        source: ExecutionError,
    },

    /// The status query wrote to stderr
    #[error("Node {node}: status query failed: {stderr}")]
    StatusProbe { node: String, stderr: String },

    /// The status query output could not be decoded
    #[error("Node {node}: {source}")]
    Parse {
        node: String,
        #[source]
        source: ParseError,
    },
}

impl EngineError {
    /// Short name of the error class, for operator-facing messages
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Directory(_) => "directory error",
            EngineError::Connection { .. } => "connection error",
            EngineError::Execution { .. } => "execution error",
            EngineError::StatusProbe { .. } => "status error",
            EngineError::Parse { .. } => "parse error",
        }
    }
}

/// A fleet query stopped early.
///
/// Carries the nodes as observed up to the failure so they can still be
/// reported.
#[derive(Error, Debug)]
#[error("Fleet operation aborted ({})", .source.kind())]
pub struct FleetError {
    /// Nodes with whatever state was gathered before the failure
    pub nodes: Vec<Node>,
    /// The failure that stopped the run
    #[source]
    pub source: EngineError,
}

impl FleetError {
    /// Wrap an engine error with the nodes gathered so far
    pub fn new(nodes: Vec<Node>, source: EngineError) -> Self {
        Self { nodes, source }
    }
}

impl From<EngineError> for FleetError {
    fn from(source: EngineError) -> Self {
        Self::new(Vec::new(), source)
    }
}
