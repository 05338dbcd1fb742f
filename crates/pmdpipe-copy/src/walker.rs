//! Hierarchy walker
//!
//! The [`Copier`] mirrors a series from a [`SeriesReader`] onto a
//! [`SeriesWriter`], one iteration at a time, in the order the source stream
//! yields them. Within an iteration it walks the hierarchy depth first:
//!
//! - attributes are copied on every node, except those the sink writes itself
//! - containers recurse into every child under the same name
//! - record components get their dataset declared, then are either left
//!   empty, made constant, or have the chunks assigned to this worker
//!   scheduled as deferred loads
//! - particle patches are loaded eagerly by a single worker and replayed into
//!   the sink when the iteration is drained
//!
//! All bulk data moves in [`DeferredQueue::drain`] at the end of the
//! iteration, after the structural copy is complete and before either side
//! closes the iteration.
//!
//! # Example
//!
//! ```
//! use pmdpipe_copy::{Copier, PipeConfig};
//! use pmdpipe_memory::{JsonOptions, MemoryReader, MemoryStore, MemoryWriter};
//!
//! let source = MemoryStore::new();
//! let sink = MemoryStore::new();
//!
//! let copier = Copier::serial(PipeConfig::new())?;
//! let stats = copier.run(
//!     &mut MemoryReader::new(source),
//!     &mut MemoryWriter::new(sink, JsonOptions::default()),
//! )?;
//! assert_eq!(stats.iterations, 0);
//! # Ok::<(), pmdpipe_core::PipeError>(())
//! ```

use crate::config::PipeConfig;
use crate::deferred::DeferredQueue;
use pmdpipe_core::{
    identity_rank_table, Chunk, Communicator, Dataset, HostInfo, NodeKind, NodePath, PipeError,
    Rank, RankTable, Result, SeriesReader, SeriesWriter, MESHES, PARTICLES, PARTICLE_PATCHES,
};
use pmdpipe_distribution::verify_partition;

/// What a copy run moved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    /// Iterations copied
    pub iterations: usize,
    /// Record components visited
    pub record_components: usize,
    /// Record components copied through their constant value
    pub constant_components: usize,
    /// Record components without elements
    pub empty_components: usize,
    /// Chunks this worker scheduled for transfer
    pub chunks_scheduled: usize,
    /// Bytes this worker read from the source
    pub bytes_loaded: u64,
    /// Particle patch values this worker stored
    pub patch_values: usize,
}

/// Attributes the sink backend writes by itself
fn ignored_attributes(kind: NodeKind, constant: bool) -> &'static [&'static str] {
    match kind {
        NodeKind::Series => &["basePath", "iterationEncoding", "iterationFormat", "openPMD"],
        NodeKind::IndexedIteration | NodeKind::Iteration => &["snapshot"],
        NodeKind::RecordComponent if constant => &["value", "shape"],
        _ => &[],
    }
}

/// Copies series from a source to a sink as one worker of a group
#[derive(Debug, Clone)]
pub struct Copier {
    config: PipeConfig,
    rank: Rank,
    dest_ranks: RankTable,
}

impl Copier {
    /// Create the copier of this worker, gathering the group's rank table
    pub fn new<C: Communicator + ?Sized>(
        config: PipeConfig,
        comm: &C,
        host_info: HostInfo,
    ) -> Result<Self> {
        let dest_ranks = host_info.rank_table(comm)?;
        Self::with_rank_table(config, comm.rank(), dest_ranks)
    }

    /// Create the copier of `rank` within a group described by `dest_ranks`
    pub fn with_rank_table(config: PipeConfig, rank: Rank, dest_ranks: RankTable) -> Result<Self> {
        if !dest_ranks.contains_key(&rank) {
            return Err(PipeError::configuration(format!(
                "rank {rank} is not part of the worker group"
            )));
        }
        if !dest_ranks.contains_key(&config.patch_rank) {
            return Err(PipeError::configuration(format!(
                "particle patch rank {} is not part of the worker group",
                config.patch_rank
            )));
        }
        Ok(Self {
            config,
            rank,
            dest_ranks,
        })
    }

    /// Copier of a run without a distributed runtime
    pub fn serial(config: PipeConfig) -> Result<Self> {
        Self::with_rank_table(config, 0, identity_rank_table(1))
    }

    /// This worker's rank
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Rank table of the writing group
    pub fn dest_ranks(&self) -> &RankTable {
        &self.dest_ranks
    }

    /// Configuration
    pub fn config(&self) -> &PipeConfig {
        &self.config
    }

    /// Copy every iteration of `reader` into `writer`
    pub fn run<R, W>(&self, reader: &mut R, writer: &mut W) -> Result<CopyStats>
    where
        R: SeriesReader + ?Sized,
        W: SeriesWriter + ?Sized,
    {
        tracing::info!(
            rank = self.rank,
            size = self.dest_ranks.len(),
            strategy = %self.config.strategy,
            "starting copy"
        );
        // Linear readers expose series attributes only after this
        reader.parse_base()?;

        let mut pass = Pass {
            copier: self,
            reader,
            writer,
            queue: DeferredQueue::new(),
            source_ranks: RankTable::new(),
            stats: CopyStats::default(),
        };
        pass.copy_series()?;

        let stats = pass.stats;
        tracing::info!(
            rank = self.rank,
            iterations = stats.iterations,
            components = stats.record_components,
            chunks = stats.chunks_scheduled,
            bytes = stats.bytes_loaded,
            "copy finished"
        );
        Ok(stats)
    }
}

/// State of one run over a source/sink pair
struct Pass<'a, R: ?Sized, W: ?Sized> {
    copier: &'a Copier,
    reader: &'a mut R,
    writer: &'a mut W,
    queue: DeferredQueue,
    /// Rank table of the source's writers, refreshed every iteration
    source_ranks: RankTable,
    stats: CopyStats,
}

impl<'a, R, W> Pass<'a, R, W>
where
    R: SeriesReader + ?Sized,
    W: SeriesWriter + ?Sized,
{
    fn copy_series(&mut self) -> Result<()> {
        let root = NodePath::root();
        let kind = self.matching_kind(&root)?;
        self.copy_attributes(&root, kind, false)?;

        while let Some(index) = self.reader.next_iteration()? {
            self.copy_iteration(index)?;
        }
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self), fields(rank = self.copier.rank))]
    fn copy_iteration(&mut self, index: u64) -> Result<()> {
        if self.copier.rank == 0 {
            self.log_summary(index)?;
        }
        // Linear readers only know the source rank table once inside an iteration
        self.source_ranks = self.reader.rank_table(true)?;
        self.writer.open_iteration(index)?;

        self.copy_node(&NodePath::iteration(index))?;

        let drained = self.queue.drain(&mut *self.reader, &mut *self.writer)?;
        self.stats.bytes_loaded += drained.bytes_loaded;
        self.stats.patch_values += drained.patch_values;

        self.reader.close_iteration(index)?;
        self.writer.close_iteration(index)?;
        self.queue.clear();
        self.stats.iterations += 1;
        tracing::debug!(
            iteration = index,
            loads = drained.loads,
            bytes = drained.bytes_loaded,
            "copied iteration"
        );
        Ok(())
    }

    /// Kind of the node at `path`, after checking source and sink agree
    fn matching_kind(&mut self, path: &NodePath) -> Result<NodeKind> {
        let source_kind = self.reader.kind(path)?;
        let dest_kind = self.writer.node(path)?;
        if !source_kind.is_compatible_with(dest_kind) {
            return Err(PipeError::StructuralMismatch {
                path: path.clone(),
                source_kind,
                dest_kind,
            });
        }
        Ok(source_kind)
    }

    fn copy_node(&mut self, path: &NodePath) -> Result<()> {
        let kind = self.matching_kind(path)?;
        match kind {
            NodeKind::Series => Err(PipeError::backend(format!(
                "series node found below the root at {path}"
            ))),
            NodeKind::IndexedIteration | NodeKind::Iteration => {
                self.copy_attributes(path, kind, false)?;
                let children = self.reader.children(path)?;
                for name in &children {
                    if name != MESHES && name != PARTICLES {
                        tracing::warn!(path = %path, child = %name, "skipping unknown iteration member");
                    }
                }
                for container in [MESHES, PARTICLES] {
                    if children.iter().any(|c| c == container) {
                        self.copy_node(&path.child(container))?;
                    }
                }
                Ok(())
            }
            NodeKind::ParticleSpecies => {
                self.copy_attributes(path, kind, false)?;
                let children = self.reader.children(path)?;
                for name in children.iter().filter(|c| *c != PARTICLE_PATCHES) {
                    self.copy_node(&path.child(name.as_str()))?;
                }
                if children.iter().any(|c| c == PARTICLE_PATCHES) {
                    self.copy_node(&path.child(PARTICLE_PATCHES))?;
                }
                Ok(())
            }
            NodeKind::MeshContainer
            | NodeKind::ParticleContainer
            | NodeKind::Mesh
            | NodeKind::Record
            | NodeKind::ParticlePatches
            | NodeKind::PatchRecord => {
                self.copy_attributes(path, kind, false)?;
                for name in self.reader.children(path)? {
                    self.copy_node(&path.child(name))?;
                }
                Ok(())
            }
            NodeKind::RecordComponent => self.copy_component(path),
            NodeKind::PatchRecordComponent => self.copy_patch_component(path),
        }
    }

    fn copy_attributes(&mut self, path: &NodePath, kind: NodeKind, constant: bool) -> Result<()> {
        let ignored = ignored_attributes(kind, constant);
        for name in self.reader.attribute_names(path)? {
            if ignored.contains(&name.as_str()) {
                continue;
            }
            let attribute = self.reader.attribute(path, &name)?;
            self.writer.set_attribute(path, &name, attribute)?;
        }
        Ok(())
    }

    fn copy_component(&mut self, path: &NodePath) -> Result<()> {
        let info = self.reader.component(path)?;
        self.copy_attributes(path, NodeKind::RecordComponent, info.constant)?;
        self.writer
            .reset_dataset(path, Dataset::new(info.dtype, info.shape.clone()))?;
        self.stats.record_components += 1;

        if info.empty {
            // reset_dataset already created the empty dataset
            self.stats.empty_components += 1;
            return Ok(());
        }
        if info.constant {
            let value = self.reader.attribute(path, "value")?;
            self.writer.make_constant(path, value.value)?;
            self.stats.constant_components += 1;
            return Ok(());
        }

        let table = self.reader.available_chunks(path)?;
        let strategy = self.copier.config.strategy.build(&info.shape);
        let mut assignment =
            strategy.assign(table.clone(), &self.source_ranks, &self.copier.dest_ranks)?;
        if self.copier.config.verify_partitions {
            verify_partition(&table, &assignment)?;
        }

        let size = self.copier.dest_ranks.len();
        for chunk in assignment.remove(&self.copier.rank).unwrap_or_default() {
            tracing::trace!(
                path = %path,
                rank = self.copier.rank,
                size,
                offset = ?chunk.offset,
                end = ?chunk.end(),
                "scheduling chunk"
            );
            let span = self.writer.store_chunk(path, chunk)?;
            self.queue.enqueue_load(path.clone(), span);
            self.stats.chunks_scheduled += 1;
        }
        Ok(())
    }

    fn copy_patch_component(&mut self, path: &NodePath) -> Result<()> {
        self.copy_attributes(path, NodeKind::PatchRecordComponent, false)?;
        // TODO: other workers rely on the sink's close being a collective
        // barrier; add an explicit one once a distributed communicator exists.
        if self.copier.rank != self.copier.config.patch_rank {
            return Ok(());
        }

        let info = self.reader.component(path)?;
        let values = if info.empty {
            None
        } else {
            Some(self.reader.load_chunk(path, &Chunk::whole(&info.shape))?)
        };
        self.writer
            .reset_dataset(path, Dataset::new(info.dtype, info.shape))?;
        if let Some(values) = values {
            self.queue.enqueue_patch_store(values, path.clone());
        }
        Ok(())
    }

    fn log_summary(&self, index: u64) -> Result<()> {
        let iteration = NodePath::iteration(index);
        let members = self.reader.children(&iteration)?;
        let children_of = |name: &str| -> Result<Vec<String>> {
            if members.iter().any(|m| m == name) {
                self.reader.children(&iteration.child(name))
            } else {
                Ok(Vec::new())
            }
        };

        let meshes = children_of(MESHES)?;
        tracing::info!(
            iteration = index,
            count = meshes.len(),
            meshes = ?meshes,
            "iteration contains meshes"
        );

        let species = children_of(PARTICLES)?;
        tracing::info!(
            iteration = index,
            count = species.len(),
            species = ?species,
            "iteration contains particle species"
        );
        for name in &species {
            let records: Vec<String> = self
                .reader
                .children(&iteration.child(PARTICLES).child(name.as_str()))?
                .into_iter()
                .filter(|r| r != PARTICLE_PATCHES)
                .collect();
            tracing::info!(iteration = index, species = %name, records = ?records, "particle species records");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmdpipe_distribution::StrategyIdentifier;

    #[test]
    fn test_ignore_lists() {
        assert!(ignored_attributes(NodeKind::Series, false).contains(&"openPMD"));
        assert_eq!(ignored_attributes(NodeKind::IndexedIteration, false), &["snapshot"]);
        assert!(ignored_attributes(NodeKind::RecordComponent, false).is_empty());
        assert_eq!(ignored_attributes(NodeKind::RecordComponent, true), &["value", "shape"]);
        assert!(ignored_attributes(NodeKind::Mesh, true).is_empty());
    }

    #[test]
    fn test_rank_must_belong_to_group() {
        let config = PipeConfig::new().strategy(StrategyIdentifier::RoundRobin);
        assert!(Copier::with_rank_table(config.clone(), 2, identity_rank_table(2)).is_err());
        assert!(Copier::with_rank_table(config.clone().patch_rank(3), 0, identity_rank_table(2)).is_err());
        let copier = Copier::with_rank_table(config, 1, identity_rank_table(2)).unwrap();
        assert_eq!(copier.rank(), 1);
        assert_eq!(copier.dest_ranks().len(), 2);
    }

    #[test]
    fn test_rank_table_from_communicator() {
        // skipped where the host name cannot be inquired
        if HostInfo::Hostname.local().is_err() {
            return;
        }
        let comm = pmdpipe_core::StaticCommunicator::distinct_hosts(2, 3).unwrap();
        let copier = Copier::new(PipeConfig::new(), &comm, HostInfo::Hostname).unwrap();
        assert_eq!(copier.rank(), 2);
        assert_eq!(copier.dest_ranks()[&1], "host1");
    }

    #[test]
    fn test_serial_copier() {
        let copier = Copier::serial(PipeConfig::new()).unwrap();
        assert_eq!(copier.rank(), 0);
        assert_eq!(copier.dest_ranks(), &identity_rank_table(1));
    }

    #[test]
    fn test_serial_copier_needs_patch_rank_zero() {
        let err = Copier::serial(PipeConfig::new().patch_rank(1)).unwrap_err();
        assert!(matches!(err, PipeError::Configuration(_)), "{err}");
    }
}
