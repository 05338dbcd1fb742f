//! # pmdpipe-distribution
//!
//! Chunk distribution strategies for parallel openPMD transfers.
//!
//! Every worker of a transfer reads the same chunk table for a record
//! component and runs the same strategy on it, so all workers agree on who
//! moves which chunk without talking to each other.
//!
//! ## Strategies
//!
//! - [`RoundRobin`]: chunk `i` to rank `i mod n`; equal chunk counts
//! - [`BinPacking`]: largest chunk first to the least loaded rank; balanced volume
//! - [`ByCuboidSlice`]: cut the dataset into one block per rank with a
//!   [`BlockSlicer`] and hand out the parts of the chunks inside each block
//! - [`ByHostname`] + [`FromPartialStrategy`]: distribute within each host
//!   first, place the rest with a fallback strategy
//! - [`FailingStrategy`]: refuse, forcing an explicit choice
//!
//! ## Quick Start
//!
//! ```
//! use pmdpipe_core::{identity_rank_table, Chunk};
//! use pmdpipe_distribution::{verify_partition, StrategyIdentifier};
//!
//! let table = vec![
//!     Chunk::new(vec![0, 0], vec![2, 4]),
//!     Chunk::new(vec![2, 0], vec![2, 4]),
//! ];
//! let ranks = identity_rank_table(2);
//!
//! let strategy = "roundrobin".parse::<StrategyIdentifier>()?.build(&[4, 4]);
//! let assignment = strategy.assign(table.clone(), &ranks, &ranks)?;
//!
//! assert_eq!(assignment[&0], vec![table[0].clone()]);
//! assert_eq!(assignment[&1], vec![table[1].clone()]);
//! verify_partition(&table, &assignment)?;
//! # Ok::<(), pmdpipe_core::PipeError>(())
//! ```
//!
//! ## Selecting a strategy
//!
//! [`StrategyIdentifier`] parses the identifiers accepted in the
//! `OPENPMD_CHUNK_DISTRIBUTION` environment variable; the default is
//! `hostname_binpacking_slicedataset`.

#![deny(warnings)]

pub mod bin_packing;
pub mod cuboid;
pub mod failing;
pub mod hostname;
pub mod identifier;
pub mod round_robin;
pub mod strategy;
pub mod verify;

mod property_tests;

pub use bin_packing::BinPacking;
pub use cuboid::{BlockSlicer, ByCuboidSlice, OneDimensionalBlockSlicer};
pub use failing::FailingStrategy;
pub use hostname::{ByHostname, FromPartialStrategy};
pub use identifier::{StrategyIdentifier, DEFAULT_STRATEGY, STRATEGY_ENV_VAR};
pub use round_robin::RoundRobin;
pub use strategy::{
    assigned_chunk_count, empty_assignment, merge_assignment, Assignment, PartialAssignment,
    PartialStrategy, Strategy,
};
pub use verify::verify_partition;
