//! Write side of the memory backend
//!
//! A [`MemoryWriter`] opens a series in create mode. It writes the structural
//! series attributes itself and the `snapshot` attribute of every iteration it
//! opens. Chunk data arrives in two phases: [`SeriesWriter::store_chunk`]
//! hands out a [`WriteSpan`] and [`SeriesWriter::submit_span`] copies the
//! filled span into the dataset. An iteration cannot be closed while spans
//! for it are still outstanding.

use crate::config::JsonOptions;
use crate::layout::write_region;
use crate::store::{lookup, lookup_mut, DatasetData, MemoryStore, NodeData};
use pmdpipe_core::{
    Attribute, AttributeValue, Chunk, Dataset, Datatype, NodeKind, NodePath, PipeError, Result,
    SeriesWriter, WriteSpan,
};
use std::collections::{BTreeMap, BTreeSet};

/// openPMD standard version written to new series
pub const OPENPMD_VERSION: &str = "1.1.0";
/// Base path written to new series
pub const BASE_PATH: &str = "/data/%T/";
/// Iteration encoding written to new series
pub const ITERATION_ENCODING: &str = "groupBased";
/// Iteration format written to new series
pub const ITERATION_FORMAT: &str = "/data/%T/";

/// Series writer on a [`MemoryStore`]
#[derive(Debug)]
pub struct MemoryWriter {
    store: MemoryStore,
    options: JsonOptions,
    next_ticket: u64,
    /// Outstanding span tickets and the iteration they belong to
    pending: BTreeMap<u64, u64>,
    open: BTreeSet<u64>,
    closed: BTreeSet<u64>,
}

impl MemoryWriter {
    /// Open `store` for writing
    pub fn new(store: MemoryStore, options: JsonOptions) -> Self {
        {
            let mut data = store.write();
            let structural = [
                ("openPMD", OPENPMD_VERSION),
                ("basePath", BASE_PATH),
                ("iterationEncoding", ITERATION_ENCODING),
                ("iterationFormat", ITERATION_FORMAT),
            ];
            for (name, value) in structural {
                data.attributes
                    .insert(name.to_string(), Attribute::string(value));
            }
        }
        Self {
            store,
            options,
            next_ticket: 0,
            pending: BTreeMap::new(),
            open: BTreeSet::new(),
            closed: BTreeSet::new(),
        }
    }

    /// Store this writer writes to
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Number of spans handed out but not yet submitted
    pub fn outstanding_spans(&self) -> usize {
        self.pending.len()
    }

    /// Finish writing and persist the series if it is file-backed
    pub fn finish(self) -> Result<()> {
        if !self.open.is_empty() {
            tracing::warn!(open = ?self.open, "finishing series with open iterations");
        }
        self.store.save(self.options.pretty)
    }

    fn check_open(&self, path: &NodePath) -> Result<u64> {
        let index = path
            .iteration_index()
            .ok_or_else(|| PipeError::UnknownNode(path.clone()))?;
        if !self.open.contains(&index) {
            return Err(PipeError::backend(format!(
                "iteration {index} is not open for writing"
            )));
        }
        Ok(index)
    }

    fn with_dataset<T>(
        &self,
        path: &NodePath,
        f: impl FnOnce(&mut DatasetData) -> Result<T>,
    ) -> Result<T> {
        self.check_open(path)?;
        let mut data = self.store.write();
        let node = lookup_mut(&mut data, path)?;
        let dataset = node.dataset.as_mut().ok_or_else(|| {
            PipeError::backend(format!("no dataset declared at {path}"))
        })?;
        f(dataset)
    }
}

impl SeriesWriter for MemoryWriter {
    fn open_iteration(&mut self, index: u64) -> Result<()> {
        if self.closed.contains(&index) {
            return Err(PipeError::backend(format!(
                "iteration {index} has already been closed"
            )));
        }
        self.store
            .write()
            .iterations
            .entry(index)
            .or_insert_with(|| {
                NodeData::new(NodeKind::Iteration).with_attribute(
                    "snapshot",
                    Attribute::new(AttributeValue::UInt(index), Datatype::UInt64),
                )
            });
        self.open.insert(index);
        tracing::debug!(iteration = index, "opened sink iteration");
        Ok(())
    }

    fn node(&mut self, path: &NodePath) -> Result<NodeKind> {
        if path.is_root() {
            return Ok(NodeKind::Series);
        }
        let index = self.check_open(path)?;
        let mut data = self.store.write();
        let mut node = data
            .iterations
            .get_mut(&index)
            .ok_or_else(|| PipeError::UnknownNode(path.clone()))?;

        for name in &path.segments()[1..] {
            let kind = node.kind.child_kind(name).ok_or_else(|| {
                PipeError::backend(format!(
                    "a {} cannot have a child named {name:?} (at {path})",
                    node.kind
                ))
            })?;
            node = node
                .children
                .entry(name.clone())
                .or_insert_with(|| NodeData::new(kind));
        }
        Ok(node.kind)
    }

    fn set_attribute(&mut self, path: &NodePath, name: &str, attribute: Attribute) -> Result<()> {
        if path.is_root() {
            self.store
                .write()
                .attributes
                .insert(name.to_string(), attribute);
            return Ok(());
        }
        self.check_open(path)?;
        let mut data = self.store.write();
        lookup_mut(&mut data, path)?
            .attributes
            .insert(name.to_string(), attribute);
        Ok(())
    }

    fn reset_dataset(&mut self, path: &NodePath, dataset: Dataset) -> Result<()> {
        self.check_open(path)?;
        let mut data = self.store.write();
        let node = lookup_mut(&mut data, path)?;
        if !node.kind.is_leaf() {
            return Err(PipeError::backend(format!(
                "cannot declare a dataset on a {} (at {path})",
                node.kind
            )));
        }
        // Another worker may already have declared the same dataset and
        // written its share; keep that data.
        if let Some(existing) = &node.dataset {
            if existing.dtype == dataset.dtype && existing.extent == dataset.extent {
                return Ok(());
            }
        }
        node.dataset = Some(DatasetData::zeroed(dataset.dtype, dataset.extent)?);
        Ok(())
    }

    fn make_constant(&mut self, path: &NodePath, value: AttributeValue) -> Result<()> {
        self.check_open(path)?;
        let mut data = self.store.write();
        let node = lookup_mut(&mut data, path)?;
        let dataset = node
            .dataset
            .as_mut()
            .ok_or_else(|| PipeError::backend(format!("no dataset declared at {path}")))?;
        let dtype = dataset.dtype;
        let shape = AttributeValue::UIntVec(dataset.extent.clone());
        dataset.constant = Some(value.clone());
        dataset.data.clear();
        dataset.chunks.clear();
        node.attributes
            .insert("value".to_string(), Attribute::new(value, dtype));
        node.attributes
            .insert("shape".to_string(), Attribute::new(shape, Datatype::VecUInt64));
        Ok(())
    }

    fn store_chunk(&mut self, path: &NodePath, chunk: Chunk) -> Result<WriteSpan> {
        let index = self.check_open(path)?;
        let dtype = {
            let data = self.store.read();
            let dataset = lookup(&data, path)?
                .dataset
                .as_ref()
                .ok_or_else(|| PipeError::backend(format!("no dataset declared at {path}")))?;
            if dataset.constant.is_some() {
                return Err(PipeError::backend(format!(
                    "cannot store chunks into constant component {path}"
                )));
            }
            if !chunk.fits_within(&dataset.extent) {
                return Err(PipeError::InvalidChunk(format!(
                    "chunk {chunk} outside dataset {path} of extent {:?}",
                    dataset.extent
                )));
            }
            dataset.dtype
        };

        let ticket = self.next_ticket;
        let span = WriteSpan::allocate(ticket, path.clone(), chunk, dtype)?;
        self.next_ticket += 1;
        self.pending.insert(ticket, index);
        Ok(span)
    }

    fn submit_span(&mut self, span: WriteSpan) -> Result<()> {
        if self.pending.remove(&span.ticket()).is_none() {
            return Err(PipeError::backend(format!(
                "span {} was not handed out by this writer",
                span.ticket()
            )));
        }
        let path = span.path().clone();
        let chunk = span.chunk().clone().with_source(self.options.source_id);
        let bytes = span.into_buffer();

        self.with_dataset(&path, |dataset| {
            let size = dataset.dtype.element_size().ok_or_else(|| {
                PipeError::backend(format!("dataset {path} has non-scalar type"))
            })?;
            write_region(&mut dataset.data, &dataset.extent, &chunk, size, &bytes)?;
            dataset.chunks.push(chunk);
            Ok(())
        })
    }

    fn store_patch(&mut self, path: &NodePath, index: u64, value: &[u8]) -> Result<()> {
        self.with_dataset(path, |dataset| {
            let size = dataset.dtype.element_size().ok_or_else(|| {
                PipeError::backend(format!("patch component {path} has non-scalar type"))
            })?;
            if dataset.extent.len() != 1 || index >= dataset.extent[0] {
                return Err(PipeError::InvalidChunk(format!(
                    "patch index {index} outside {path} of extent {:?}",
                    dataset.extent
                )));
            }
            if value.len() != size {
                return Err(PipeError::backend(format!(
                    "patch value of {} bytes for element type {}",
                    value.len(),
                    dataset.dtype
                )));
            }
            let slot = usize::try_from(index)
                .ok()
                .and_then(|i| i.checked_mul(size))
                .and_then(|at| dataset.data.get_mut(at..at + size))
                .ok_or_else(|| {
                    PipeError::backend(format!("patch index {index} outside the data of {path}"))
                })?;
            slot.copy_from_slice(value);
            Ok(())
        })
    }

    fn close_iteration(&mut self, index: u64) -> Result<()> {
        let outstanding = self.pending.values().filter(|i| **i == index).count();
        if outstanding > 0 {
            return Err(PipeError::backend(format!(
                "cannot close iteration {index}: {outstanding} spans outstanding"
            )));
        }
        if !self.open.remove(&index) {
            return Err(PipeError::backend(format!(
                "iteration {index} is not open for writing"
            )));
        }
        self.closed.insert(index);
        tracing::debug!(iteration = index, "closed sink iteration");
        Ok(())
    }
}
