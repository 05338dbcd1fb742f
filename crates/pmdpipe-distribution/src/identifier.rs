//! Strategy identifiers
//!
//! A run selects its distribution strategy with a single string, usually
//! taken from the `OPENPMD_CHUNK_DISTRIBUTION` environment variable:
//!
//! - `roundrobin`, `binpacking`, `slicedataset`, `fail`
//! - `hostname_<primary>_<secondary>`: distribute within each host with
//!   `<primary>`, then place the rest with `<secondary>`
//!
//! The composite form splits at the last underscore, so the primary part may
//! itself be composite. Identifiers are case-insensitive.
//!
//! # Example
//!
//! ```
//! use pmdpipe_distribution::StrategyIdentifier;
//!
//! let id: StrategyIdentifier = "hostname_binpacking_slicedataset".parse().unwrap();
//! assert_eq!(id, StrategyIdentifier::default());
//! assert!("bogus".parse::<StrategyIdentifier>().is_err());
//! ```

use crate::cuboid::{ByCuboidSlice, OneDimensionalBlockSlicer};
use crate::hostname::{ByHostname, FromPartialStrategy};
use crate::{BinPacking, FailingStrategy, RoundRobin, Strategy};
use pmdpipe_core::{PipeError, Result};
use std::fmt;
use std::str::FromStr;

/// Environment variable selecting the distribution strategy
pub const STRATEGY_ENV_VAR: &str = "OPENPMD_CHUNK_DISTRIBUTION";

/// Strategy used when none is configured
pub const DEFAULT_STRATEGY: &str = "hostname_binpacking_slicedataset";

const HOSTNAME_PREFIX: &str = "hostname_";

/// Parsed distribution strategy selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyIdentifier {
    RoundRobin,
    BinPacking,
    SliceDataset,
    Fail,
    Hostname {
        within_node: Box<StrategyIdentifier>,
        fallback: Box<StrategyIdentifier>,
    },
}

impl StrategyIdentifier {
    /// Read the identifier from the environment, falling back to the default
    pub fn from_env() -> Result<Self> {
        match std::env::var(STRATEGY_ENV_VAR) {
            Ok(value) if !value.trim().is_empty() => value.parse(),
            _ => DEFAULT_STRATEGY.parse(),
        }
    }

    /// Instantiate the strategy for a dataset of `dataset_extent`
    pub fn build(&self, dataset_extent: &[u64]) -> Box<dyn Strategy> {
        match self {
            StrategyIdentifier::RoundRobin => Box::new(RoundRobin),
            StrategyIdentifier::BinPacking => Box::new(BinPacking),
            StrategyIdentifier::SliceDataset => Box::new(ByCuboidSlice::new(
                Box::new(OneDimensionalBlockSlicer::default()),
                dataset_extent.to_vec(),
            )),
            StrategyIdentifier::Fail => Box::new(FailingStrategy),
            StrategyIdentifier::Hostname {
                within_node,
                fallback,
            } => Box::new(FromPartialStrategy::new(
                Box::new(ByHostname::new(within_node.build(dataset_extent))),
                fallback.build(dataset_extent),
            )),
        }
    }
}

impl Default for StrategyIdentifier {
    fn default() -> Self {
        StrategyIdentifier::Hostname {
            within_node: Box::new(StrategyIdentifier::BinPacking),
            fallback: Box::new(StrategyIdentifier::SliceDataset),
        }
    }
}

impl FromStr for StrategyIdentifier {
    type Err = PipeError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();

        if let Some(rest) = lower.strip_prefix(HOSTNAME_PREFIX) {
            if let Some((primary, secondary)) = rest.rsplit_once('_') {
                return Ok(StrategyIdentifier::Hostname {
                    within_node: Box::new(primary.parse()?),
                    fallback: Box::new(secondary.parse()?),
                });
            }
        }

        match lower.as_str() {
            "roundrobin" => Ok(StrategyIdentifier::RoundRobin),
            "binpacking" => Ok(StrategyIdentifier::BinPacking),
            "slicedataset" => Ok(StrategyIdentifier::SliceDataset),
            "fail" => Ok(StrategyIdentifier::Fail),
            _ => Err(PipeError::configuration(format!(
                "unknown distribution strategy: {s}"
            ))),
        }
    }
}

impl fmt::Display for StrategyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyIdentifier::RoundRobin => f.write_str("roundrobin"),
            StrategyIdentifier::BinPacking => f.write_str("binpacking"),
            StrategyIdentifier::SliceDataset => f.write_str("slicedataset"),
            StrategyIdentifier::Fail => f.write_str("fail"),
            StrategyIdentifier::Hostname {
                within_node,
                fallback,
            } => write!(f, "{HOSTNAME_PREFIX}{within_node}_{fallback}"),
        }
    }
}
