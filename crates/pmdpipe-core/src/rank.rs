//! Worker ranks, rank tables and host topology
//!
//! A [`RankTable`] maps every worker rank to an opaque locality token, the
//! host name in practice. Locality-aware strategies group ranks that share a
//! token. The table is built collectively through a [`Communicator`].

use crate::error::{PipeError, Result};
use std::collections::BTreeMap;

/// Index of a worker within its group
pub type Rank = u32;

/// Mapping from worker rank to locality token
pub type RankTable = BTreeMap<Rank, String>;

/// Rank table of a non-distributed run: every rank is its own locality
pub fn identity_rank_table(size: u32) -> RankTable {
    (0..size).map(|r| (r, r.to_string())).collect()
}

/// Group ranks by locality token
pub fn ranks_by_host(table: &RankTable) -> BTreeMap<String, RankTable> {
    let mut groups: BTreeMap<String, RankTable> = BTreeMap::new();
    for (rank, host) in table {
        groups
            .entry(host.clone())
            .or_default()
            .insert(*rank, host.clone());
    }
    groups
}

/// Group of cooperating workers
///
/// Collective methods must be called by every rank of the group, in the same
/// order, or the group deadlocks.
pub trait Communicator {
    /// This worker's rank
    fn rank(&self) -> Rank;

    /// Number of workers
    fn size(&self) -> u32;

    /// Collect one string from every rank, indexed by rank
    fn all_gather(&self, local: &str) -> Result<Vec<String>>;
}

/// Communicator of a run without a distributed runtime
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialCommunicator;

impl Communicator for SerialCommunicator {
    fn rank(&self) -> Rank {
        0
    }

    fn size(&self) -> u32 {
        1
    }

    fn all_gather(&self, local: &str) -> Result<Vec<String>> {
        Ok(vec![local.to_string()])
    }
}

/// Communicator for one rank of a group whose topology is known up front
///
/// Lets several workers of a group be emulated inside one process: each
/// worker gets its own instance with its own rank, all sharing the same host
/// list. `all_gather` returns the preset host list.
#[derive(Debug, Clone)]
pub struct StaticCommunicator {
    rank: Rank,
    hosts: Vec<String>,
}

impl StaticCommunicator {
    /// Create the communicator of `rank` within a group laid out as `hosts`
    pub fn new(rank: Rank, hosts: Vec<String>) -> Result<Self> {
        if rank as usize >= hosts.len() {
            return Err(PipeError::configuration(format!(
                "rank {} out of range for a group of {} workers",
                rank,
                hosts.len()
            )));
        }
        Ok(Self { rank, hosts })
    }

    /// Group of `size` workers, each on its own host
    pub fn distinct_hosts(rank: Rank, size: u32) -> Result<Self> {
        Self::new(rank, (0..size).map(|r| format!("host{r}")).collect())
    }
}

impl Communicator for StaticCommunicator {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> u32 {
        self.hosts.len() as u32
    }

    fn all_gather(&self, _local: &str) -> Result<Vec<String>> {
        Ok(self.hosts.clone())
    }
}

/// Method for determining a worker's locality token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostInfo {
    /// The operating system host name
    Hostname,
}

impl HostInfo {
    /// Locality token of this worker
    pub fn local(&self) -> Result<String> {
        match self {
            HostInfo::Hostname => sysinfo::System::host_name()
                .ok_or_else(|| PipeError::backend("could not inquire hostname")),
        }
    }

    /// Rank table of the whole group, gathered collectively
    pub fn rank_table<C: Communicator + ?Sized>(&self, comm: &C) -> Result<RankTable> {
        let local = self.local()?;
        let all = comm.all_gather(&local)?;
        if all.len() != comm.size() as usize {
            return Err(PipeError::backend(format!(
                "gathered {} host names from a group of {}",
                all.len(),
                comm.size()
            )));
        }
        tracing::debug!(rank = comm.rank(), host = %local, "gathered rank table");
        Ok(all
            .into_iter()
            .enumerate()
            .map(|(r, host)| (r as Rank, host))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_table() {
        let t = identity_rank_table(3);
        assert_eq!(t.len(), 3);
        assert_eq!(t[&2], "2");
    }

    #[test]
    fn test_group_by_host() {
        let table: RankTable = [(0, "a"), (1, "b"), (2, "a")]
            .into_iter()
            .map(|(r, h)| (r, h.to_string()))
            .collect();
        let groups = ranks_by_host(&table);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["a"].keys().copied().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(groups["b"].keys().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_static_communicator() {
        let comm = StaticCommunicator::new(1, vec!["n0".into(), "n0".into(), "n1".into()]).unwrap();
        assert_eq!(comm.rank(), 1);
        assert_eq!(comm.size(), 3);
        assert!(StaticCommunicator::new(3, vec!["n0".into()]).is_err());
    }

    #[test]
    fn test_serial_communicator() {
        let comm = SerialCommunicator;
        assert_eq!(comm.rank(), 0);
        assert_eq!(comm.size(), 1);
        assert_eq!(comm.all_gather("me").unwrap(), vec!["me".to_string()]);
    }
}
