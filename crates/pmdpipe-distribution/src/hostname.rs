//! Locality-aware composition
//!
//! [`ByHostname`] keeps transfers on the node that produced the data: a
//! chunk's host is the host of its writer (`source_id` looked up in the source
//! rank table), and it is distributed among the destination ranks on that same
//! host by an inner strategy. Chunks whose host has no destination rank are
//! reported back unplaced. [`FromPartialStrategy`] hands that remainder to a
//! second strategy running over all destination ranks.

use crate::strategy::{
    assigned_chunk_count, empty_assignment, merge_assignment, Assignment, PartialAssignment,
    PartialStrategy, Strategy,
};
use pmdpipe_core::{ranks_by_host, Chunk, ChunkTable, RankTable, Result};
use std::collections::BTreeMap;

/// Distribute within each host, leave cross-host chunks unplaced
#[derive(Debug)]
pub struct ByHostname {
    within_node: Box<dyn Strategy>,
}

impl ByHostname {
    /// Use `within_node` to distribute chunks among the ranks of one host
    pub fn new(within_node: Box<dyn Strategy>) -> Self {
        Self { within_node }
    }
}

impl PartialStrategy for ByHostname {
    fn assign_partial(
        &self,
        table: ChunkTable,
        source_ranks: &RankTable,
        dest_ranks: &RankTable,
    ) -> Result<PartialAssignment> {
        let groups = ranks_by_host(dest_ranks);

        let mut by_host: BTreeMap<&str, Vec<Chunk>> = BTreeMap::new();
        let mut not_assigned = ChunkTable::new();
        for chunk in table {
            match source_ranks.get(&chunk.source_id) {
                Some(host) if groups.contains_key(host) => {
                    by_host.entry(host.as_str()).or_default().push(chunk);
                }
                _ => not_assigned.push(chunk),
            }
        }

        let mut assigned = empty_assignment(dest_ranks);
        for (host, chunks) in by_host {
            let group = &groups[host];
            let local = self.within_node.assign(chunks, source_ranks, group)?;
            tracing::trace!(
                host,
                ranks = group.len(),
                chunks = assigned_chunk_count(&local),
                "distributed chunks within host"
            );
            merge_assignment(&mut assigned, local);
        }

        Ok(PartialAssignment {
            assigned,
            not_assigned,
        })
    }

    fn name(&self) -> &'static str {
        "hostname"
    }
}

/// Run a partial strategy, then place its remainder with a full strategy
#[derive(Debug)]
pub struct FromPartialStrategy {
    primary: Box<dyn PartialStrategy>,
    secondary: Box<dyn Strategy>,
}

impl FromPartialStrategy {
    /// Compose `primary` with the fallback `secondary`
    pub fn new(primary: Box<dyn PartialStrategy>, secondary: Box<dyn Strategy>) -> Self {
        Self { primary, secondary }
    }
}

impl Strategy for FromPartialStrategy {
    fn assign(
        &self,
        table: ChunkTable,
        source_ranks: &RankTable,
        dest_ranks: &RankTable,
    ) -> Result<Assignment> {
        let PartialAssignment {
            mut assigned,
            not_assigned,
        } = self
            .primary
            .assign_partial(table, source_ranks, dest_ranks)?;

        if !not_assigned.is_empty() {
            tracing::debug!(
                primary = self.primary.name(),
                secondary = self.secondary.name(),
                remaining = not_assigned.len(),
                "passing unplaced chunks to secondary strategy"
            );
            let rest = self
                .secondary
                .assign(not_assigned, source_ranks, dest_ranks)?;
            merge_assignment(&mut assigned, rest);
        }
        Ok(assigned)
    }

    fn name(&self) -> &'static str {
        "from_partial"
    }
}
