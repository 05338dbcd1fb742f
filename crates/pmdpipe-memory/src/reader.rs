//! Read side of the memory backend
//!
//! [`MemoryReader`] emulates linear read access: series attributes appear
//! after [`SeriesReader::parse_base`], iterations are handed out in ascending
//! index order exactly once, and only the iteration currently open may be
//! accessed.

use crate::layout::read_region;
use crate::store::{lookup, DatasetData, MemoryStore, NodeData, SeriesData};
use pmdpipe_core::{
    Attribute, Buffer, Chunk, ChunkTable, ComponentInfo, NodeKind, NodePath, PipeError,
    RankTable, Result, SeriesReader,
};
use std::ops::Bound;

/// Series reader on a [`MemoryStore`]
#[derive(Debug)]
pub struct MemoryReader {
    store: MemoryStore,
    parsed: bool,
    current: Option<u64>,
    last: Option<u64>,
}

impl MemoryReader {
    /// Open `store` for linear reading
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store,
            parsed: false,
            current: None,
            last: None,
        }
    }

    /// Iteration currently open, if any
    pub fn current_iteration(&self) -> Option<u64> {
        self.current
    }

    fn check_access(&self, path: &NodePath) -> Result<()> {
        if !self.parsed {
            return Err(PipeError::backend("series accessed before parse_base"));
        }
        match path.iteration_index() {
            None if path.is_root() => Ok(()),
            Some(index) if self.current == Some(index) => Ok(()),
            Some(index) if self.last.is_some_and(|last| index <= last) => Err(
                PipeError::backend(format!("iteration {index} has already been closed")),
            ),
            _ => Err(PipeError::backend(format!(
                "{path} is not part of the open iteration"
            ))),
        }
    }

    fn with_node<T>(&self, path: &NodePath, f: impl FnOnce(&NodeData) -> Result<T>) -> Result<T> {
        self.check_access(path)?;
        let data = self.store.read();
        f(lookup(&data, path)?)
    }

    fn with_dataset<T>(
        &self,
        path: &NodePath,
        f: impl FnOnce(&DatasetData) -> Result<T>,
    ) -> Result<T> {
        self.with_node(path, |node| {
            let dataset = node.dataset.as_ref().ok_or_else(|| {
                PipeError::backend(format!("{path} is not a record component with data"))
            })?;
            f(dataset)
        })
    }

    fn with_series<T>(&self, f: impl FnOnce(&SeriesData) -> T) -> Result<T> {
        if !self.parsed {
            return Err(PipeError::backend("series accessed before parse_base"));
        }
        let data = self.store.read();
        Ok(f(&*data))
    }
}

impl SeriesReader for MemoryReader {
    fn parse_base(&mut self) -> Result<()> {
        self.parsed = true;
        Ok(())
    }

    fn next_iteration(&mut self) -> Result<Option<u64>> {
        if !self.parsed {
            return Err(PipeError::backend("parse_base must be called before reading iterations"));
        }
        if let Some(open) = self.current {
            return Err(PipeError::backend(format!(
                "iteration {open} must be closed before the next one is read"
            )));
        }
        let lower = match self.last {
            Some(last) => Bound::Excluded(last),
            None => Bound::Unbounded,
        };
        let next = self
            .store
            .read()
            .iterations
            .range((lower, Bound::Unbounded))
            .next()
            .map(|(index, _)| *index);
        if let Some(index) = next {
            self.current = Some(index);
            self.last = Some(index);
            tracing::debug!(iteration = index, "opened source iteration");
        }
        Ok(next)
    }

    fn rank_table(&mut self, _collective: bool) -> Result<RankTable> {
        self.with_series(|data| data.rank_table.clone().unwrap_or_default())
    }

    fn kind(&self, path: &NodePath) -> Result<NodeKind> {
        if path.is_root() {
            self.check_access(path)?;
            return Ok(NodeKind::Series);
        }
        self.with_node(path, |node| {
            Ok(match node.kind {
                NodeKind::Iteration => NodeKind::IndexedIteration,
                kind => kind,
            })
        })
    }

    fn children(&self, path: &NodePath) -> Result<Vec<String>> {
        if path.is_root() {
            return self.with_series(|data| {
                data.iterations.keys().map(u64::to_string).collect()
            });
        }
        self.with_node(path, |node| Ok(node.children.keys().cloned().collect()))
    }

    fn attribute_names(&self, path: &NodePath) -> Result<Vec<String>> {
        if path.is_root() {
            return self.with_series(|data| data.attributes.keys().cloned().collect());
        }
        self.with_node(path, |node| Ok(node.attributes.keys().cloned().collect()))
    }

    fn attribute(&self, path: &NodePath, name: &str) -> Result<Attribute> {
        let missing = || PipeError::backend(format!("{path} has no attribute {name:?}"));
        if path.is_root() {
            return self
                .with_series(|data| data.attributes.get(name).cloned())?
                .ok_or_else(missing);
        }
        self.with_node(path, |node| node.attributes.get(name).cloned().ok_or_else(missing))
    }

    fn component(&self, path: &NodePath) -> Result<ComponentInfo> {
        self.with_dataset(path, |dataset| {
            Ok(ComponentInfo {
                dtype: dataset.dtype,
                shape: dataset.extent.clone(),
                constant: dataset.constant.is_some(),
                empty: dataset.is_empty(),
            })
        })
    }

    fn available_chunks(&self, path: &NodePath) -> Result<ChunkTable> {
        self.with_dataset(path, |dataset| {
            if dataset.constant.is_some() || dataset.is_empty() {
                return Ok(ChunkTable::new());
            }
            // no recorded regions: the dataset is available as a whole
            if dataset.chunks.is_empty() {
                return Ok(vec![Chunk::whole(&dataset.extent)]);
            }
            Ok(dataset.chunks.clone())
        })
    }

    fn load_chunk(&mut self, path: &NodePath, chunk: &Chunk) -> Result<Buffer> {
        let dtype = self.with_dataset(path, |dataset| Ok(dataset.dtype))?;
        let size = dtype
            .element_size()
            .ok_or_else(|| PipeError::backend(format!("{path} has non-scalar type {dtype}")))?;
        let mut data = vec![0; chunk.byte_len(size)?];
        self.load_chunk_into(path, chunk, &mut data)?;
        Ok(Buffer::new(dtype, data))
    }

    fn load_chunk_into(&mut self, path: &NodePath, chunk: &Chunk, out: &mut [u8]) -> Result<()> {
        self.with_dataset(path, |dataset| {
            let size = dataset.dtype.element_size().ok_or_else(|| {
                PipeError::backend(format!("{path} has non-scalar type {}", dataset.dtype))
            })?;
            match &dataset.constant {
                Some(value) => {
                    if !chunk.fits_within(&dataset.extent) || out.len() != chunk.byte_len(size)? {
                        return Err(PipeError::InvalidChunk(format!(
                            "chunk {chunk} does not match constant component {path}"
                        )));
                    }
                    let element = value.to_element_bytes(dataset.dtype).ok_or_else(|| {
                        PipeError::backend(format!("constant of {path} does not fit its type"))
                    })?;
                    for slot in out.chunks_exact_mut(size) {
                        slot.copy_from_slice(&element);
                    }
                    Ok(())
                }
                None => read_region(&dataset.data, &dataset.extent, chunk, size, out),
            }
        })?;
        tracing::trace!(path = %path, chunk = %chunk, "loaded chunk");
        Ok(())
    }

    fn close_iteration(&mut self, index: u64) -> Result<()> {
        if self.current != Some(index) {
            return Err(PipeError::backend(format!(
                "iteration {index} is not the open source iteration"
            )));
        }
        self.current = None;
        tracing::debug!(iteration = index, "closed source iteration");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmdpipe_core::{AttributeValue, Datatype};

    fn store() -> MemoryStore {
        let mut data = SeriesData::default();
        data.attributes.insert("author".into(), Attribute::string("me"));
        for index in [20, 10] {
            let component = NodeData::new(NodeKind::RecordComponent).with_dataset(DatasetData {
                dtype: Datatype::UInt8,
                extent: vec![2, 2],
                constant: None,
                chunks: vec![Chunk::new(vec![0, 0], vec![2, 2])],
                data: vec![1, 2, 3, 4],
            });
            let iteration = NodeData::new(NodeKind::Iteration).with_child(
                "meshes",
                NodeData::new(NodeKind::MeshContainer)
                    .with_child("rho", NodeData::new(NodeKind::Mesh).with_child("x", component)),
            );
            data.iterations.insert(index, iteration);
        }
        MemoryStore::from_data(data)
    }

    fn rho(index: u64) -> NodePath {
        NodePath::iteration(index).child("meshes").child("rho").child("x")
    }

    #[test]
    fn test_linear_order() {
        let mut r = MemoryReader::new(store());
        assert!(r.next_iteration().is_err());
        r.parse_base().unwrap();
        assert_eq!(r.next_iteration().unwrap(), Some(10));
        assert!(r.next_iteration().is_err());
        r.close_iteration(10).unwrap();
        assert_eq!(r.next_iteration().unwrap(), Some(20));
        r.close_iteration(20).unwrap();
        assert_eq!(r.next_iteration().unwrap(), None);
    }

    #[test]
    fn test_closed_iteration_is_inaccessible() {
        let mut r = MemoryReader::new(store());
        r.parse_base().unwrap();
        r.next_iteration().unwrap();
        assert_eq!(r.kind(&NodePath::iteration(10)).unwrap(), NodeKind::IndexedIteration);
        assert!(r.kind(&rho(20)).is_err());
        r.close_iteration(10).unwrap();
        assert!(r.component(&rho(10)).is_err());
        assert_eq!(r.attribute(&NodePath::root(), "author").unwrap(), Attribute::string("me"));
    }

    #[test]
    fn test_load() {
        let mut r = MemoryReader::new(store());
        r.parse_base().unwrap();
        r.next_iteration().unwrap();
        let info = r.component(&rho(10)).unwrap();
        assert_eq!(info.shape, vec![2, 2]);
        assert!(!info.constant && !info.empty);
        let buffer = r.load_chunk(&rho(10), &Chunk::new(vec![1, 0], vec![1, 2])).unwrap();
        assert_eq!(buffer.data, vec![3, 4]);
        assert_eq!(r.available_chunks(&rho(10)).unwrap().len(), 1);
    }

    #[test]
    fn test_constant_load_replicates_value() {
        let s = store();
        {
            let mut data = s.write();
            let node = crate::store::lookup_mut(&mut data, &rho(10)).unwrap();
            let dataset = node.dataset.as_mut().unwrap();
            dataset.constant = Some(AttributeValue::UInt(9));
            dataset.data.clear();
        }
        let mut r = MemoryReader::new(s);
        r.parse_base().unwrap();
        r.next_iteration().unwrap();
        assert!(r.available_chunks(&rho(10)).unwrap().is_empty());
        let buffer = r.load_chunk(&rho(10), &Chunk::whole(&[2, 2])).unwrap();
        assert_eq!(buffer.data, vec![9; 4]);
    }

    #[test]
    fn test_unrecorded_chunks_report_whole_dataset() {
        let s = store();
        {
            let mut data = s.write();
            let node = crate::store::lookup_mut(&mut data, &rho(10)).unwrap();
            node.dataset.as_mut().unwrap().chunks.clear();
        }
        let mut r = MemoryReader::new(s);
        r.parse_base().unwrap();
        r.next_iteration().unwrap();
        assert_eq!(
            r.available_chunks(&rho(10)).unwrap(),
            vec![Chunk::whole(&[2, 2])]
        );
    }

    #[test]
    fn test_children_are_sorted() {
        let mut r = MemoryReader::new(store());
        r.parse_base().unwrap();
        assert_eq!(r.children(&NodePath::root()).unwrap(), vec!["10", "20"]);
        r.next_iteration().unwrap();
        assert_eq!(r.children(&NodePath::iteration(10)).unwrap(), vec!["meshes"]);
        assert!(r.rank_table(true).unwrap().is_empty());
    }
}
