//! Compress command implementation.

use super::CodecArgs;
use crate::utils::{RawArray, bits_per_value, ratio};
use oxigrid_codec::Stream;
use oxigrid_core::BitStream;
use std::path::Path;

pub fn cmd_compress(
    input: &Path,
    output: &Path,
    codec: &CodecArgs,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let kind = codec.kind();
    let shape = codec.shape()?;
    let policy = codec.policy()?;

    let bytes = std::fs::read(input)?;
    let array = RawArray::from_le_bytes(&bytes, kind, &shape)?;
    let field = array.field(&shape)?;

    let mut stream = Stream::with_policy(policy);
    let capacity = stream.maximum_size(&field)?;
    stream.bind_bitstream(BitStream::with_capacity(capacity));
    let header_bits = stream.write_header(&field)?;
    let size = stream.compress(&field)?;

    let mut compressed = stream
        .take_bitstream()
        .map(BitStream::into_inner)
        .unwrap_or_default();
    compressed.truncate(size);
    std::fs::write(output, &compressed)?;

    if verbose {
        println!("Input: {} ({} bytes)", input.display(), bytes.len());
        println!("Array: {} {:?}", kind, shape.extents());
        println!("Mode: {}", policy);
        println!("Header: {} bits", header_bits);
        println!("Output: {} ({} bytes)", output.display(), compressed.len());
        println!("Ratio: {:.2}x", ratio(bytes.len(), compressed.len()));
        println!(
            "Rate: {:.3} bits/value",
            bits_per_value(compressed.len(), shape.len())
        );
    }

    Ok(())
}
