//! Deferred operation queue
//!
//! The walker does not move bulk data while it traverses an iteration. It
//! commits the sink to every region it will write and queues the matching
//! reads here; [`DeferredQueue::drain`] then executes everything in one go at
//! the end of the iteration, before either side closes it.
//!
//! # Ownership
//!
//! A queued load owns the [`WriteSpan`] it will fill, so the destination
//! buffer cannot be reused or dropped before the load has run. After the load
//! the span is moved back to the sink through
//! [`SeriesWriter::submit_span`].
//!
//! # Ordering
//!
//! All loads run before any particle patch store. Within each group,
//! operations run in the order they were queued.
//!
//! # Failure
//!
//! Draining stops at the first failing operation and returns its error. The
//! operations after it are discarded, not executed; whatever was already
//! delivered to the sink stays there.

use pmdpipe_core::{Buffer, NodePath, PipeError, Result, SeriesReader, SeriesWriter, WriteSpan};

/// Read into a sink span that has not been delivered yet
#[derive(Debug)]
pub struct DeferredLoad {
    /// Source record component
    pub source: NodePath,
    /// Sink region to fill; carries the offset and extent of the read
    pub span: WriteSpan,
}

/// Particle patch values to replay into the sink, one element per index
#[derive(Debug)]
pub struct DeferredPatchStore {
    /// Values loaded eagerly from the source
    pub values: Buffer,
    /// Sink patch record component
    pub dest: NodePath,
}

/// Work done by one [`DeferredQueue::drain`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    /// Loads executed
    pub loads: usize,
    /// Bytes moved by those loads
    pub bytes_loaded: u64,
    /// Individual patch values stored
    pub patch_values: usize,
}

/// Queue of operations deferred until the end of an iteration
#[derive(Debug, Default)]
pub struct DeferredQueue {
    loads: Vec<DeferredLoad>,
    patch_stores: Vec<DeferredPatchStore>,
}

impl DeferredQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a read of the span's region of `source` into the span
    pub fn enqueue_load(&mut self, source: NodePath, span: WriteSpan) {
        self.loads.push(DeferredLoad { source, span });
    }

    /// Queue the replay of patch `values` into `dest`
    pub fn enqueue_patch_store(&mut self, values: Buffer, dest: NodePath) {
        self.patch_stores.push(DeferredPatchStore { values, dest });
    }

    /// Number of queued loads
    pub fn pending_loads(&self) -> usize {
        self.loads.len()
    }

    /// Number of queued patch stores
    pub fn pending_patch_stores(&self) -> usize {
        self.patch_stores.len()
    }

    /// Total number of queued operations
    pub fn len(&self) -> usize {
        self.loads.len() + self.patch_stores.len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all queued operations without executing them
    pub fn clear(&mut self) {
        self.loads.clear();
        self.patch_stores.clear();
    }

    /// Execute all queued loads, then all queued patch stores
    ///
    /// The queue is empty afterwards, whether or not an operation failed.
    pub fn drain<R, W>(&mut self, reader: &mut R, writer: &mut W) -> Result<DrainStats>
    where
        R: SeriesReader + ?Sized,
        W: SeriesWriter + ?Sized,
    {
        let loads = std::mem::take(&mut self.loads);
        let patch_stores = std::mem::take(&mut self.patch_stores);
        let mut stats = DrainStats::default();

        for DeferredLoad { source, mut span } in loads {
            let chunk = span.chunk().clone();
            reader.load_chunk_into(&source, &chunk, span.buffer_mut())?;
            stats.bytes_loaded += span.buffer().len() as u64;
            writer.submit_span(span)?;
            stats.loads += 1;
        }

        for DeferredPatchStore { values, dest } in patch_stores {
            let size = values.dtype.element_size().ok_or_else(|| {
                PipeError::backend(format!(
                    "patch values for {dest} have non-scalar type {}",
                    values.dtype
                ))
            })?;
            for (index, value) in values.data.chunks_exact(size).enumerate() {
                writer.store_patch(&dest, index as u64, value)?;
                stats.patch_values += 1;
            }
        }

        tracing::debug!(
            loads = stats.loads,
            bytes = stats.bytes_loaded,
            patch_values = stats.patch_values,
            "drained deferred operations"
        );
        Ok(stats)
    }
}
