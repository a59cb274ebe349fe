//! Decompress command implementation.

use crate::utils::{RawArray, raw_size};
use oxigrid_codec::Stream;
use oxigrid_core::{BitStream, OxiGridError};
use std::path::Path;

pub fn cmd_decompress(
    input: &Path,
    output: &Path,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let compressed = std::fs::read(input)?;
    let mut stream = Stream::new();
    stream.bind_bitstream(BitStream::new(compressed.as_slice()));

    let header = stream.read_header()?;

    // The header is untrusted: refuse extents the payload cannot cover
    // before allocating the output.
    let available = (compressed.len() as u64)
        .saturating_mul(8)
        .saturating_sub(header.size_bits());
    let needed = header.minimum_stream_bits();
    if needed > available {
        return Err(OxiGridError::decode(
            header.size_bits(),
            format!(
                "{} blocks need at least {needed} bits but only {available} follow the header",
                header.shape.block_count()
            ),
        )
        .into());
    }
    raw_size(header.kind, &header.shape)?;

    let mut array = RawArray::zeroed(header.kind, header.shape.len());
    let consumed = {
        let mut field = array.field_mut(&header.shape)?;
        stream.decompress(&mut field)?
    };

    let raw = array.to_le_bytes();
    std::fs::write(output, &raw)?;

    if verbose {
        println!("Input: {} ({} bytes)", input.display(), compressed.len());
        println!("Array: {} {:?}", header.kind, header.shape.extents());
        println!("Mode: {}", header.policy);
        println!("Consumed: {} bytes", consumed);
        println!("Output: {} ({} bytes)", output.display(), raw.len());
    }

    Ok(())
}
