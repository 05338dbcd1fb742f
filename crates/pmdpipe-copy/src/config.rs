//! Transfer configuration

use pmdpipe_core::{Rank, Result};
use pmdpipe_distribution::StrategyIdentifier;

/// Configuration of one copy pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeConfig {
    /// Strategy distributing each record component's chunks among workers
    pub strategy: StrategyIdentifier,
    /// Check every computed assignment for completeness before using it
    pub verify_partitions: bool,
    /// Worker that copies particle patch data
    pub patch_rank: Rank,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyIdentifier::default(),
            verify_partitions: true,
            patch_rank: 0,
        }
    }
}

impl PipeConfig {
    /// Create a default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Default configuration with the strategy taken from `OPENPMD_CHUNK_DISTRIBUTION`
    pub fn from_env() -> Result<Self> {
        Ok(Self::default().strategy(StrategyIdentifier::from_env()?))
    }

    /// Set the distribution strategy
    pub fn strategy(mut self, strategy: StrategyIdentifier) -> Self {
        self.strategy = strategy;
        self
    }

    /// Enable/disable partition verification
    pub fn verify_partitions(mut self, enable: bool) -> Self {
        self.verify_partitions = enable;
        self
    }

    /// Set the worker that copies particle patches
    pub fn patch_rank(mut self, rank: Rank) -> Self {
        self.patch_rank = rank;
        self
    }
}
