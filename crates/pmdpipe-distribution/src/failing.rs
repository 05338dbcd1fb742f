//! Strategy that refuses to distribute anything
//!
//! Selecting it forces an explicit decision: any record component that
//! actually needs distributing aborts the run with a configuration error.

use crate::strategy::{Assignment, Strategy};
use pmdpipe_core::{ChunkTable, PipeError, RankTable, Result};

/// Always fails
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingStrategy;

impl Strategy for FailingStrategy {
    fn assign(
        &self,
        _table: ChunkTable,
        _source_ranks: &RankTable,
        _dest_ranks: &RankTable,
    ) -> Result<Assignment> {
        Err(PipeError::configuration(
            "chunk distribution was explicitly disabled by the 'fail' strategy",
        ))
    }

    fn name(&self) -> &'static str {
        "fail"
    }
}
