//! Roundtrip command implementation.

use super::CodecArgs;
use crate::utils::{ErrorStats, RawArray, bits_per_value, ratio};
use oxigrid_codec::{compress, decompress};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;

/// JSON output for a roundtrip measurement.
#[derive(Debug, Serialize)]
struct RoundtripJson {
    file: String,
    kind: String,
    extents: Vec<usize>,
    policy: String,
    original_size: usize,
    compressed_size: usize,
    ratio: f64,
    bits_per_value: f64,
    #[serde(flatten)]
    error: ErrorStats,
    compress_ms: f64,
    decompress_ms: f64,
}

pub fn cmd_roundtrip(
    input: &Path,
    codec: &CodecArgs,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let kind = codec.kind();
    let shape = codec.shape()?;
    let policy = codec.policy()?;

    let bytes = std::fs::read(input)?;
    let array = RawArray::from_le_bytes(&bytes, kind, &shape)?;

    let start = Instant::now();
    let compressed = compress(&array.field(&shape)?, &policy)?;
    let compress_time = start.elapsed();

    let mut decoded = RawArray::zeroed(kind, shape.len());
    let start = Instant::now();
    decompress(&compressed, &mut decoded.field_mut(&shape)?, &policy)?;
    let decompress_time = start.elapsed();

    let report = RoundtripJson {
        file: input.display().to_string(),
        kind: kind.to_string(),
        extents: shape.extents().to_vec(),
        policy: policy.to_string(),
        original_size: bytes.len(),
        compressed_size: compressed.len(),
        ratio: ratio(bytes.len(), compressed.len()),
        bits_per_value: bits_per_value(compressed.len(), shape.len()),
        error: ErrorStats::between(&array.to_f64(), &decoded.to_f64()),
        compress_ms: compress_time.as_secs_f64() * 1e3,
        decompress_ms: decompress_time.as_secs_f64() * 1e3,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Roundtrip: {}", report.file);
    println!("Array: {} {:?}", report.kind, report.extents);
    println!("Mode: {}", report.policy);
    println!("Original size: {} bytes", report.original_size);
    println!("Compressed size: {} bytes", report.compressed_size);
    println!("Ratio: {:.2}x", report.ratio);
    println!("Rate: {:.3} bits/value", report.bits_per_value);
    println!("Max abs error: {:e}", report.error.max_abs_error);
    println!("RMSE: {:e}", report.error.rmse);
    match report.error.psnr {
        Some(psnr) => println!("PSNR: {:.2} dB", psnr),
        None => println!("PSNR: lossless"),
    }
    println!(
        "Time: compress {:.2} ms, decompress {:.2} ms",
        report.compress_ms, report.decompress_ms
    );

    Ok(())
}
