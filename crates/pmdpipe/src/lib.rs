//! # pmdpipe - chunked transfer of openPMD series
//!
//! Copies every iteration of a series from a reader to a writer, one record
//! component at a time, with the chunks of each component spread over a
//! group of workers by a configurable distribution strategy.
//!
//! This is the **meta crate** that re-exports the pipe components and ships
//! the `pmdpipe` command line tool.
//!
//! ## Quick Start
//!
//! ```
//! use pmdpipe::prelude::*;
//!
//! let chunks = vec![
//!     Chunk::new(vec![0], vec![10]),
//!     Chunk::new(vec![10], vec![10]),
//! ];
//! let dest: RankTable = [(0, "n0".to_string()), (1, "n1".to_string())].into();
//! let assignment = RoundRobin::default().assign(chunks, &RankTable::new(), &dest)?;
//! assert_eq!(assignment[&0].len(), 1);
//! assert_eq!(assignment[&1].len(), 1);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Components
//!
//! - [`core`]: chunks, node hierarchy, rank tables, backend traits
//! - [`distribution`]: chunk distribution strategies
//! - [`memory`]: in-memory backend with JSON persistence
//! - [`copy`]: hierarchy walker and deferred operation queue
//! - [`pipe`]: one serial file-to-file copy
//! - [`logging`]: tracing subscriber setup

#![deny(warnings)]

pub use pmdpipe_copy as copy;
pub use pmdpipe_core as core;
pub use pmdpipe_distribution as distribution;
pub use pmdpipe_memory as memory;

pub mod logging;
pub mod pipe;

/// Prelude module for convenient imports
pub mod prelude {
    pub use pmdpipe_copy::{Copier, CopyStats, PipeConfig};
    pub use pmdpipe_core::{
        Chunk, ChunkTable, NodeKind, NodePath, PipeError, Rank, RankTable, SeriesReader,
        SeriesWriter,
    };
    pub use pmdpipe_distribution::{
        BinPacking, ByCuboidSlice, ByHostname, RoundRobin, Strategy, StrategyIdentifier,
    };
    pub use pmdpipe_memory::{BackendConfig, MemoryReader, MemoryStore, MemoryWriter};

    pub use crate::pipe::{run, PipeOptions};
}
