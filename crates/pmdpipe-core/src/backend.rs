//! Backend interfaces consumed by the pipe
//!
//! The storage or streaming backend is an external collaborator. The pipe
//! talks to a data source through [`SeriesReader`] and to a data sink through
//! [`SeriesWriter`]; it never depends on a concrete backend.
//!
//! Writes are two-phase. [`SeriesWriter::store_chunk`] commits the sink to a
//! region and hands out a [`WriteSpan`] owning a buffer for it. Whoever holds
//! the span fills the buffer and gives it back through
//! [`SeriesWriter::submit_span`] before the iteration is closed.

use crate::chunk::{Chunk, ChunkTable};
use crate::datatype::{Attribute, AttributeValue, Dataset, Datatype};
use crate::error::{PipeError, Result};
use crate::node::{NodeKind, NodePath};
use crate::rank::RankTable;

/// Shape and state of a record component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentInfo {
    pub dtype: Datatype,
    pub shape: Vec<u64>,
    /// All elements share one value, stored as the `value` attribute
    pub constant: bool,
    /// The dataset holds no elements
    pub empty: bool,
}

/// Dataset contents loaded from a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buffer {
    pub dtype: Datatype,
    pub data: Vec<u8>,
}

impl Buffer {
    /// Wrap raw element bytes
    pub fn new(dtype: Datatype, data: Vec<u8>) -> Self {
        Self { dtype, data }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        match self.dtype.element_size() {
            Some(size) if size > 0 => self.data.len() / size,
            _ => 0,
        }
    }

    /// Whether the buffer holds no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes of element `index`
    pub fn element(&self, index: usize) -> Option<&[u8]> {
        let size = self.dtype.element_size()?;
        self.data.get(index * size..(index + 1) * size)
    }
}

/// Region of a sink dataset whose data has been promised but not delivered
///
/// The span owns its buffer. The sink never sees the bytes until the span is
/// handed back through [`SeriesWriter::submit_span`].
#[derive(Debug)]
pub struct WriteSpan {
    ticket: u64,
    path: NodePath,
    chunk: Chunk,
    dtype: Datatype,
    buffer: Vec<u8>,
}

impl WriteSpan {
    /// Allocate a zeroed span for `chunk` of a dataset of type `dtype`
    pub fn allocate(ticket: u64, path: NodePath, chunk: Chunk, dtype: Datatype) -> Result<Self> {
        let size = dtype.element_size().ok_or_else(|| {
            PipeError::backend(format!("cannot store chunks of non-scalar type {dtype}"))
        })?;
        let len = chunk.byte_len(size)?;
        Ok(Self {
            ticket,
            path,
            chunk,
            dtype,
            buffer: vec![0; len],
        })
    }

    /// Identifier the sink handed out with this span
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    /// Destination record component
    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// Destination region
    pub fn chunk(&self) -> &Chunk {
        &self.chunk
    }

    /// Element type
    pub fn dtype(&self) -> Datatype {
        self.dtype
    }

    /// Writable view of the span's data
    pub fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    /// Span's data
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Give up the span, returning its data
    pub fn into_buffer(self) -> Vec<u8> {
        self.buffer
    }
}

/// Read side of a series, opened in linear (single-pass) read mode
pub trait SeriesReader {
    /// Parse series-level metadata
    ///
    /// In linear read mode global attributes are only visible afterwards.
    fn parse_base(&mut self) -> Result<()>;

    /// Advance the read stream to the next iteration
    ///
    /// Returns `None` once the stream is exhausted. The stream cannot be
    /// rewound and an iteration must be closed before the next one is pulled.
    fn next_iteration(&mut self) -> Result<Option<u64>>;

    /// Rank table of the writers that produced the data
    fn rank_table(&mut self, collective: bool) -> Result<RankTable>;

    /// Kind of the node at `path`
    fn kind(&self, path: &NodePath) -> Result<NodeKind>;

    /// Names of the children of a container node, in stable order
    fn children(&self, path: &NodePath) -> Result<Vec<String>>;

    /// Names of the attributes of a node
    fn attribute_names(&self, path: &NodePath) -> Result<Vec<String>>;

    /// Value and declared type of an attribute
    fn attribute(&self, path: &NodePath, name: &str) -> Result<Attribute>;

    /// Shape and state of a record component
    fn component(&self, path: &NodePath) -> Result<ComponentInfo>;

    /// Chunks physically available for a record component
    fn available_chunks(&self, path: &NodePath) -> Result<ChunkTable>;

    /// Load a region into a fresh buffer
    fn load_chunk(&mut self, path: &NodePath, chunk: &Chunk) -> Result<Buffer>;

    /// Load a region directly into `out`, which must be exactly the region's size
    fn load_chunk_into(&mut self, path: &NodePath, chunk: &Chunk, out: &mut [u8]) -> Result<()>;

    /// Close an iteration; its nodes must not be accessed afterwards
    fn close_iteration(&mut self, index: u64) -> Result<()>;
}

/// Write side of a series, opened in create mode
pub trait SeriesWriter {
    /// Open an iteration for writing
    ///
    /// Must be called before the first write to the iteration.
    fn open_iteration(&mut self, index: u64) -> Result<()>;

    /// Open the node at `path`, creating it if needed, and report its kind
    ///
    /// The kind of a created node follows from its parent's kind and its name.
    fn node(&mut self, path: &NodePath) -> Result<NodeKind>;

    /// Set an attribute with its declared type
    fn set_attribute(&mut self, path: &NodePath, name: &str, attribute: Attribute) -> Result<()>;

    /// Declare (or redeclare) the dataset of a record component
    fn reset_dataset(&mut self, path: &NodePath, dataset: Dataset) -> Result<()>;

    /// Turn a record component into a constant one
    fn make_constant(&mut self, path: &NodePath, value: AttributeValue) -> Result<()>;

    /// Commit to writing `chunk` and hand out the span that will carry its data
    fn store_chunk(&mut self, path: &NodePath, chunk: Chunk) -> Result<WriteSpan>;

    /// Deliver the data of a span obtained from [`SeriesWriter::store_chunk`]
    fn submit_span(&mut self, span: WriteSpan) -> Result<()>;

    /// Write one element of a patch record component
    fn store_patch(&mut self, path: &NodePath, index: u64, value: &[u8]) -> Result<()>;

    /// Flush and close an iteration
    fn close_iteration(&mut self, index: u64) -> Result<()>;
}
