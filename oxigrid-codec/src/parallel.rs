//! Parallel fixed-rate coding (requires the `parallel` feature).
//!
//! Under a word-aligned fixed rate every block occupies the same whole
//! number of 64-bit words, so block `i` lives at a known byte offset. Blocks
//! are coded on rayon workers, each owning a disjoint slice of the output.
//! The result is byte-identical to [`Stream::compress`](crate::Stream::compress)
//! under the same policy.

use crate::block::{BlockCoder, BlockGrid, MAX_BLOCK_LEN};
use crate::value::BlockValue;
use oxigrid_core::{
    BitStream, Field, FieldData, FieldDataMut, FieldMut, FixedRate, OxiGridError,
    RateControlPolicy, Result, ScalarKind, Shape,
};
use rayon::prelude::*;

/// Bytes per block for `rate`, after checking it suits a field of `kind`
/// and `shape`.
fn block_bytes(rate: &FixedRate, kind: ScalarKind, shape: &Shape) -> Result<usize> {
    RateControlPolicy::FixedRate(*rate).validate(kind, shape.rank())?;
    if !rate.word_aligned() {
        return Err(OxiGridError::configuration(
            "parallel coding requires a word-aligned fixed rate",
        ));
    }
    Ok(rate.bits_per_block() as usize / 8)
}

fn compress_values<T: BlockValue>(
    data: &[T],
    shape: &Shape,
    coder: &BlockCoder,
    block_bytes: usize,
) -> Result<Vec<u8>> {
    let grid = BlockGrid::new(shape);
    let mut output = vec![0u8; grid.len() * block_bytes];
    if block_bytes == 0 {
        return Ok(output);
    }

    let n = grid.block_len();
    output
        .par_chunks_mut(block_bytes)
        .enumerate()
        .try_for_each(|(index, chunk)| -> Result<()> {
            let mut block = [T::default(); MAX_BLOCK_LEN];
            grid.gather(data, grid.origin(index), &mut block[..n]);
            let mut stream = BitStream::new(chunk);
            coder.encode_block(&mut stream, &block[..n])?;
            stream.flush()?;
            Ok(())
        })?;
    Ok(output)
}

fn decompress_values<T: BlockValue>(
    input: &[u8],
    data: &mut [T],
    shape: &Shape,
    coder: &BlockCoder,
    block_bytes: usize,
) -> Result<()> {
    let grid = BlockGrid::new(shape);
    if block_bytes == 0 {
        data.fill(T::default());
        return Ok(());
    }
    let needed = grid.len() * block_bytes;
    if input.len() < needed {
        return Err(OxiGridError::decode(
            input.len() as u64 * 8,
            format!("stream holds {} bytes, {needed} required", input.len()),
        ));
    }

    let n = grid.block_len();
    let blocks: Vec<[T; MAX_BLOCK_LEN]> = input[..needed]
        .par_chunks(block_bytes)
        .enumerate()
        .map(|(index, chunk)| -> Result<[T; MAX_BLOCK_LEN]> {
            let mut block = [T::default(); MAX_BLOCK_LEN];
            let mut stream = BitStream::new(chunk);
            coder.decode_block(&mut stream, &mut block[..n]).map_err(|e| match e {
                OxiGridError::Decode { bit_position, message } => OxiGridError::decode(
                    (index * block_bytes * 8) as u64 + bit_position,
                    message,
                ),
                other => other,
            })?;
            Ok(block)
        })
        .collect::<Result<_>>()?;

    for (index, block) in blocks.iter().enumerate() {
        grid.scatter(&block[..n], grid.origin(index), data);
    }
    Ok(())
}

/// Compress `field` under a word-aligned fixed `rate`, coding blocks in
/// parallel.
pub fn compress_parallel(field: &Field<'_>, rate: &FixedRate) -> Result<Vec<u8>> {
    let shape = field.shape();
    let bytes = block_bytes(rate, field.kind(), shape)?;
    let coder = BlockCoder::new(&RateControlPolicy::FixedRate(*rate), field.kind(), shape.rank());

    let output = match field.data() {
        FieldData::Int32(values) => compress_values(values, shape, &coder, bytes),
        FieldData::Int64(values) => compress_values(values, shape, &coder, bytes),
        FieldData::Float32(values) => compress_values(values, shape, &coder, bytes),
        FieldData::Float64(values) => compress_values(values, shape, &coder, bytes),
    }?;
    log::debug!(
        "compressed {} blocks in parallel into {} bytes",
        shape.block_count(),
        output.len()
    );
    Ok(output)
}

/// Decompress a stream produced by [`compress_parallel`] (or by a serial
/// compress under the same policy) into `field`.
pub fn decompress_parallel(input: &[u8], field: &mut FieldMut<'_>, rate: &FixedRate) -> Result<()> {
    let shape = *field.shape();
    let bytes = block_bytes(rate, field.kind(), &shape)?;
    let coder = BlockCoder::new(&RateControlPolicy::FixedRate(*rate), field.kind(), shape.rank());

    match field.data_mut() {
        FieldDataMut::Int32(values) => decompress_values(input, &mut **values, &shape, &coder, bytes),
        FieldDataMut::Int64(values) => decompress_values(input, &mut **values, &shape, &coder, bytes),
        FieldDataMut::Float32(values) => decompress_values(input, &mut **values, &shape, &coder, bytes),
        FieldDataMut::Float64(values) => decompress_values(input, &mut **values, &shape, &coder, bytes),
    }
}
