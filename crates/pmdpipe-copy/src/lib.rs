//! # pmdpipe-copy
//!
//! Chunked, distributed copying of openPMD series.
//!
//! This crate provides:
//! - [`Copier`]: the hierarchy walker mirroring a series from a source to a
//!   sink, one streamed iteration at a time
//! - [`DeferredQueue`]: loads and particle patch stores held back until the
//!   end of an iteration and executed in bulk
//! - [`PipeConfig`]: distribution strategy and per-run switches
//!
//! Every worker of a group runs its own [`Copier`] over the same source and
//! sink. The workers never exchange data; they agree on who moves which chunk
//! because they all run the same deterministic distribution strategy on the
//! same metadata.

#![deny(warnings)]

pub mod config;
pub mod deferred;
pub mod walker;

pub use config::PipeConfig;
pub use deferred::{DeferredLoad, DeferredPatchStore, DeferredQueue, DrainStats};
pub use walker::{Copier, CopyStats};
