//! Series storage shared between writers and readers.
//!
//! A [`MemoryStore`] holds a whole series in memory. Handles are cheap to
//! clone and share one underlying [`SeriesData`], so a writer and a reader (or
//! several emulated workers) can operate on the same series. A store can be
//! bound to a JSON file it is loaded from and saved to.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use pmdpipe_core::{
    Attribute, AttributeValue, ChunkTable, Datatype, Extent, NodeKind, NodePath, PipeError,
    RankTable, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Whole contents of a series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesData {
    /// Series-level attributes
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,
    /// Host of every writer that contributed chunks, keyed by `source_id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank_table: Option<RankTable>,
    /// Iterations by index
    #[serde(default)]
    pub iterations: BTreeMap<u64, NodeData>,
}

/// One node of the hierarchy below an iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub kind: NodeKind,
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,
    #[serde(default)]
    pub children: BTreeMap<String, NodeData>,
    /// Present on record components once a dataset has been declared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<DatasetData>,
}

impl NodeData {
    /// Create an empty node
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            attributes: BTreeMap::new(),
            children: BTreeMap::new(),
            dataset: None,
        }
    }

    /// Add a child, builder style
    pub fn with_child(mut self, name: impl Into<String>, child: NodeData) -> Self {
        self.children.insert(name.into(), child);
        self
    }

    /// Set an attribute, builder style
    pub fn with_attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    /// Attach a dataset, builder style
    pub fn with_dataset(mut self, dataset: DatasetData) -> Self {
        self.dataset = Some(dataset);
        self
    }

    /// Descend along `segments`
    pub fn descend(&self, segments: &[String]) -> Option<&NodeData> {
        segments
            .iter()
            .try_fold(self, |node, name| node.children.get(name))
    }

    /// Descend along `segments`, mutably
    pub fn descend_mut(&mut self, segments: &[String]) -> Option<&mut NodeData> {
        segments
            .iter()
            .try_fold(self, |node, name| node.children.get_mut(name))
    }
}

/// Dataset of a record component
///
/// Data is kept row-major and little-endian. Constant components keep only
/// their value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetData {
    pub dtype: Datatype,
    pub extent: Extent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constant: Option<AttributeValue>,
    /// Regions written so far, in write order
    #[serde(default)]
    pub chunks: ChunkTable,
    #[serde(default)]
    pub data: Vec<u8>,
}

impl DatasetData {
    /// Declare a zero-filled dataset
    pub fn zeroed(dtype: Datatype, extent: Extent) -> Result<Self> {
        let volume: u64 = extent.iter().product();
        let data = match dtype.element_size() {
            Some(size) => {
                let len = usize::try_from(volume)
                    .ok()
                    .and_then(|n| n.checked_mul(size))
                    .ok_or_else(|| {
                        PipeError::backend(format!("dataset of extent {extent:?} too large"))
                    })?;
                vec![0; len]
            }
            None => Vec::new(),
        };
        Ok(Self {
            dtype,
            extent,
            constant: None,
            chunks: ChunkTable::new(),
            data,
        })
    }

    /// Whether the dataset holds no elements
    pub fn is_empty(&self) -> bool {
        self.extent.contains(&0)
    }
}

/// Shared handle to a series held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<SeriesData>>,
    path: Option<PathBuf>,
}

impl MemoryStore {
    /// Create an empty store that is never persisted
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap existing series data
    pub fn from_data(data: SeriesData) -> Self {
        Self {
            inner: Arc::new(RwLock::new(data)),
            path: None,
        }
    }

    /// Load a series from a JSON file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let data: SeriesData = serde_json::from_str(&text).map_err(|e| {
            PipeError::backend(format!("cannot parse series {}: {e}", path.display()))
        })?;
        tracing::debug!(
            path = %path.display(),
            iterations = data.iterations.len(),
            "opened series"
        );
        Ok(Self {
            inner: Arc::new(RwLock::new(data)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Create an empty series that [`MemoryStore::save`] writes to `path`
    pub fn create(path: impl AsRef<Path>) -> Self {
        Self {
            inner: Arc::default(),
            path: Some(path.as_ref().to_path_buf()),
        }
    }

    /// File this store is bound to, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Lock the series for reading
    pub fn read(&self) -> RwLockReadGuard<'_, SeriesData> {
        self.inner.read()
    }

    /// Lock the series for writing
    pub fn write(&self) -> RwLockWriteGuard<'_, SeriesData> {
        self.inner.write()
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> SeriesData {
        self.inner.read().clone()
    }

    /// Record the host of the writer with id `source_id`
    pub fn set_source_host(&self, source_id: u32, host: impl Into<String>) {
        self.inner
            .write()
            .rank_table
            .get_or_insert_with(RankTable::new)
            .insert(source_id, host.into());
    }

    /// Persist to the bound file; no-op for stores without one
    pub fn save(&self, pretty: bool) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let data = self.inner.read();
        let text = if pretty {
            serde_json::to_string_pretty(&*data)
        } else {
            serde_json::to_string(&*data)
        }
        .map_err(|e| PipeError::backend(format!("cannot serialize series: {e}")))?;
        std::fs::write(path, text)?;
        tracing::debug!(path = %path.display(), "saved series");
        Ok(())
    }
}

/// Look up a node below an iteration
pub(crate) fn lookup<'a>(data: &'a SeriesData, path: &NodePath) -> Result<&'a NodeData> {
    let (index, rest) = split_path(path)?;
    data.iterations
        .get(&index)
        .and_then(|it| it.descend(rest))
        .ok_or_else(|| PipeError::UnknownNode(path.clone()))
}

/// Look up a node below an iteration, mutably
pub(crate) fn lookup_mut<'a>(data: &'a mut SeriesData, path: &NodePath) -> Result<&'a mut NodeData> {
    let (index, rest) = split_path(path)?;
    data.iterations
        .get_mut(&index)
        .and_then(|it| it.descend_mut(rest))
        .ok_or_else(|| PipeError::UnknownNode(path.clone()))
}

fn split_path(path: &NodePath) -> Result<(u64, &[String])> {
    let index = path
        .iteration_index()
        .ok_or_else(|| PipeError::UnknownNode(path.clone()))?;
    Ok((index, &path.segments()[1..]))
}
