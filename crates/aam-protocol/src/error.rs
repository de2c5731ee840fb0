//! Protocol error types

use thiserror::Error;

/// Errors decoding the status payload returned by a worker node
#[derive(Error, Debug)]
pub enum ParseError {
    /// Payload is not the expected JSON document
    #[error("Malformed status payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Payload was empty
    #[error("Empty status payload")]
    Empty,
}
