//! # pmdpipe-core
//!
//! Data model and collaborator interfaces for pmdpipe, the chunked
//! transfer tool for openPMD-structured series.
//!
//! This crate provides the building blocks every other pmdpipe crate shares:
//!
//! - **Chunk geometry** ([`Chunk`], [`ChunkTable`]): offset/extent regions with
//!   volume, intersection and containment queries
//! - **Hierarchy model** ([`NodeKind`], [`NodePath`]): the closed set of openPMD
//!   node kinds and how they nest
//! - **Attributes and datasets** ([`Attribute`], [`Datatype`], [`Dataset`])
//! - **Topology** ([`RankTable`], [`Communicator`], [`HostInfo`])
//! - **Backend interfaces** ([`SeriesReader`], [`SeriesWriter`], [`WriteSpan`])
//! - **Errors** ([`PipeError`])
//!
//! ## Quick Start
//!
//! ```
//! use pmdpipe_core::{Chunk, NodeKind, NodePath};
//!
//! let chunk = Chunk::new(vec![0, 0], vec![2, 4]);
//! assert_eq!(chunk.volume(), 8);
//!
//! let path = NodePath::iteration(100).child("meshes").child("E");
//! assert_eq!(NodeKind::Iteration.child_kind("meshes"), Some(NodeKind::MeshContainer));
//! assert_eq!(path.iteration_index(), Some(100));
//! ```

#![deny(warnings)]

pub mod backend;
pub mod chunk;
pub mod datatype;
pub mod error;
pub mod node;
pub mod rank;

pub use backend::{Buffer, ComponentInfo, SeriesReader, SeriesWriter, WriteSpan};
pub use chunk::{table_volume, Chunk, ChunkTable, Extent, Offset};
pub use datatype::{Attribute, AttributeValue, Dataset, Datatype};
pub use error::{PipeError, Result};
pub use node::{NodeKind, NodePath, MESHES, PARTICLES, PARTICLE_PATCHES};
pub use rank::{
    identity_rank_table, ranks_by_host, Communicator, HostInfo, Rank, RankTable,
    SerialCommunicator, StaticCommunicator,
};
