//! Info command implementation.

use crate::utils::{bits_per_value, ratio, raw_size};
use oxigrid_codec::{Header, read_header};
use oxigrid_core::{BitStream, OxiGridError, RateControlPolicy};
use serde::Serialize;
use std::path::Path;

/// JSON output for stream information.
#[derive(Debug, Serialize)]
struct StreamInfoJson {
    file: String,
    size: usize,
    kind: String,
    extents: Vec<usize>,
    values: usize,
    mode: String,
    policy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    precision: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bits_per_block: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    word_aligned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tolerance: Option<f64>,
    header_bits: u64,
    uncompressed_size: usize,
    ratio: f64,
    bits_per_value: f64,
}

impl StreamInfoJson {
    fn new(file: &Path, size: usize, header: &Header) -> Result<Self, OxiGridError> {
        let values = header.shape.len();
        let uncompressed_size = raw_size(header.kind, &header.shape)?;
        let mut info = Self {
            file: file.display().to_string(),
            size,
            kind: header.kind.to_string(),
            extents: header.shape.extents().to_vec(),
            values,
            mode: header.policy.mode().to_string(),
            policy: header.policy.to_string(),
            precision: None,
            bits_per_block: None,
            word_aligned: None,
            tolerance: None,
            header_bits: header.size_bits(),
            uncompressed_size,
            ratio: ratio(uncompressed_size, size),
            bits_per_value: bits_per_value(size, values),
        };
        match header.policy {
            RateControlPolicy::FixedPrecision(p) => info.precision = Some(p.bits()),
            RateControlPolicy::FixedRate(r) => {
                info.bits_per_block = Some(r.bits_per_block());
                info.word_aligned = Some(r.word_aligned());
            }
            RateControlPolicy::FixedAccuracy(a) => info.tolerance = Some(a.effective_tolerance()),
        }
        Ok(info)
    }
}

pub fn cmd_info(input: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let compressed = std::fs::read(input)?;
    let mut stream = BitStream::new(compressed.as_slice());
    let header = read_header(&mut stream)?;
    let info = StreamInfoJson::new(input, compressed.len(), &header)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Stream Information");
    println!("==================");
    println!("File: {}", info.file);
    println!("Size: {} bytes", info.size);
    println!("Type: {}", info.kind);
    println!("Extents: {:?}", info.extents);
    println!("Values: {}", info.values);
    println!("Mode: {}", info.policy);
    println!("Header: {} bits", info.header_bits);
    println!("Uncompressed size: {} bytes", info.uncompressed_size);
    println!("Compression ratio: {:.2}x", info.ratio);
    println!("Rate: {:.3} bits/value", info.bits_per_value);

    Ok(())
}
