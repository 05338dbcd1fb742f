//! # pmdpipe-memory
//!
//! In-memory openPMD series with JSON persistence.
//!
//! This crate provides the reference backend for pmdpipe. It implements the
//! [`SeriesReader`](pmdpipe_core::SeriesReader) and
//! [`SeriesWriter`](pmdpipe_core::SeriesWriter) interfaces over a shared
//! [`MemoryStore`]:
//!
//! - **Storage** ([`MemoryStore`], [`SeriesData`]): a whole series held in
//!   memory, shareable between handles, loadable from and savable to JSON
//! - **Reading** ([`MemoryReader`]): linear, single-pass iteration access
//! - **Writing** ([`MemoryWriter`]): create-mode writes with two-phase chunk
//!   spans and auto-managed structural attributes
//! - **Configuration** ([`BackendConfig`]): JSON configuration blobs
//!
//! ## Quick Start
//!
//! ```
//! use pmdpipe_core::{Chunk, Dataset, Datatype, NodePath, SeriesReader, SeriesWriter};
//! use pmdpipe_memory::{JsonOptions, MemoryReader, MemoryStore, MemoryWriter};
//!
//! let store = MemoryStore::new();
//! let mut writer = MemoryWriter::new(store.clone(), JsonOptions::default());
//! let rho = NodePath::iteration(0).child("meshes").child("rho").child("x");
//!
//! writer.open_iteration(0)?;
//! writer.node(&rho)?;
//! writer.reset_dataset(&rho, Dataset::new(Datatype::UInt8, vec![4]))?;
//! let mut span = writer.store_chunk(&rho, Chunk::whole(&[4]))?;
//! span.buffer_mut().copy_from_slice(&[1, 2, 3, 4]);
//! writer.submit_span(span)?;
//! writer.close_iteration(0)?;
//!
//! let mut reader = MemoryReader::new(store);
//! reader.parse_base()?;
//! assert_eq!(reader.next_iteration()?, Some(0));
//! assert_eq!(reader.load_chunk(&rho, &Chunk::new(vec![2], vec![2]))?.data, vec![3, 4]);
//! # Ok::<(), pmdpipe_core::PipeError>(())
//! ```

#![deny(warnings)]

pub mod config;
pub mod layout;
pub mod reader;
pub mod store;
pub mod writer;

pub use config::{BackendConfig, JsonOptions};
pub use reader::MemoryReader;
pub use store::{DatasetData, MemoryStore, NodeData, SeriesData};
pub use writer::{MemoryWriter, BASE_PATH, ITERATION_ENCODING, ITERATION_FORMAT, OPENPMD_VERSION};
