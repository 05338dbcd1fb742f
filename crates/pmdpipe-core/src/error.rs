//! Unified error types for the pipe
//!
//! Every failure is fatal to a copy run: nothing in the pipe retries or
//! silently recovers. The variants mirror the places a run can go wrong.
//!
//! # Design
//!
//! - **`Configuration`**: unknown strategy identifier, explicit failing strategy,
//!   unusable worker setup
//! - **`StructuralMismatch`**: source and sink disagree on the kind of a node
//! - **`Backend`** / **`Io`**: anything the storage collaborator reports
//! - **`PartitionCompleteness`**: a strategy lost or invented data
//!
//! # Examples
//!
//! ```
//! use pmdpipe_core::error::PipeError;
//!
//! fn pick(name: &str) -> Result<(), PipeError> {
//!     match name {
//!         "roundrobin" => Ok(()),
//!         other => Err(PipeError::Configuration(format!(
//!             "unknown distribution strategy: {other}"
//!         ))),
//!     }
//! }
//!
//! assert!(pick("roundrobin").is_ok());
//! assert!(pick("bogus").is_err());
//! ```

use crate::node::{NodeKind, NodePath};
use thiserror::Error;

/// Top-level error type for all pipe operations
#[derive(Error, Debug)]
pub enum PipeError {
    /// Unsupported or explicitly refused configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Source and destination nodes are of different kinds
    #[error("structural mismatch at {path}: source is {source_kind}, destination is {dest_kind}")]
    StructuralMismatch {
        path: NodePath,
        source_kind: NodeKind,
        dest_kind: NodeKind,
    },

    /// Error reported by a storage backend
    #[error("backend error: {0}")]
    Backend(String),

    /// I/O error from the operating system
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A distribution strategy did not reproduce its input chunk table
    #[error("partition completeness violated: {0}")]
    PartitionCompleteness(String),

    /// Malformed chunk geometry
    #[error("invalid chunk: {0}")]
    InvalidChunk(String),

    /// A path that does not name a node of the series
    #[error("no such node: {0}")]
    UnknownNode(NodePath),
}

impl PipeError {
    /// Shorthand for a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        PipeError::Backend(msg.into())
    }

    /// Shorthand for a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        PipeError::Configuration(msg.into())
    }
}

/// Result alias used throughout the pipe crates
pub type Result<T> = std::result::Result<T, PipeError>;
