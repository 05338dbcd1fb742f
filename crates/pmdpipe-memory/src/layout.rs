//! Row-major hyperslab copies between a full dataset buffer and a chunk buffer

use pmdpipe_core::{Chunk, PipeError, Result};

/// Copy the region `chunk` of the dataset `full` (of `shape`) into `out`
pub fn read_region(
    full: &[u8],
    shape: &[u64],
    chunk: &Chunk,
    element_size: usize,
    out: &mut [u8],
) -> Result<()> {
    check(full.len(), shape, chunk, element_size, out.len())?;
    for_each_row(shape, chunk, element_size, |dataset_at, chunk_at, len| {
        out[chunk_at..chunk_at + len].copy_from_slice(&full[dataset_at..dataset_at + len]);
    });
    Ok(())
}

/// Copy `data`, laid out as the region `chunk`, into the dataset `full` (of `shape`)
pub fn write_region(
    full: &mut [u8],
    shape: &[u64],
    chunk: &Chunk,
    element_size: usize,
    data: &[u8],
) -> Result<()> {
    check(full.len(), shape, chunk, element_size, data.len())?;
    for_each_row(shape, chunk, element_size, |dataset_at, chunk_at, len| {
        full[dataset_at..dataset_at + len].copy_from_slice(&data[chunk_at..chunk_at + len]);
    });
    Ok(())
}

fn check(
    full_len: usize,
    shape: &[u64],
    chunk: &Chunk,
    element_size: usize,
    chunk_len: usize,
) -> Result<()> {
    if !chunk.fits_within(shape) {
        return Err(PipeError::InvalidChunk(format!(
            "chunk {chunk} outside dataset of extent {shape:?}"
        )));
    }
    let dataset_bytes = Chunk::whole(shape).byte_len(element_size)?;
    if full_len != dataset_bytes {
        return Err(PipeError::backend(format!(
            "dataset buffer holds {full_len} bytes, extent {shape:?} needs {dataset_bytes}"
        )));
    }
    let chunk_bytes = chunk.byte_len(element_size)?;
    if chunk_len != chunk_bytes {
        return Err(PipeError::InvalidChunk(format!(
            "buffer of {chunk_len} bytes for chunk {chunk} of {chunk_bytes} bytes"
        )));
    }
    Ok(())
}

/// Call `f(dataset_byte_offset, chunk_byte_offset, byte_len)` for every
/// contiguous row of `chunk`
fn for_each_row(
    shape: &[u64],
    chunk: &Chunk,
    element_size: usize,
    mut f: impl FnMut(usize, usize, usize),
) {
    if chunk.is_empty() {
        return;
    }
    let dims = shape.len();
    if dims == 0 {
        f(0, 0, element_size);
        return;
    }

    let mut strides = vec![1u64; dims];
    for d in (0..dims - 1).rev() {
        strides[d] = strides[d + 1] * shape[d + 1];
    }

    let row_len = chunk.extent[dims - 1] as usize * element_size;
    let outer = &chunk.extent[..dims - 1];
    let rows: u64 = outer.iter().product();
    let mut index = vec![0u64; dims - 1];

    for row in 0..rows as usize {
        let linear: u64 = (0..dims - 1)
            .map(|d| (chunk.offset[d] + index[d]) * strides[d])
            .sum::<u64>()
            + chunk.offset[dims - 1];
        f(linear as usize * element_size, row * row_len, row_len);

        // odometer over the outer dimensions
        for d in (0..dims - 1).rev() {
            index[d] += 1;
            if index[d] < outer[d] {
                break;
            }
            index[d] = 0;
        }
    }
}
