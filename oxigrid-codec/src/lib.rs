//! Block transform codec for regularly gridded arrays.
//!
//! Fields of `i32`, `i64`, `f32` or `f64` values in one to three dimensions
//! are cut into independent blocks of `4^rank` values. Each block is
//! converted to integers (block-floating-point for floats), decorrelated by
//! a separable lifting transform, reordered by sequency and written one bit
//! plane at a time by an embedded coder that stops exactly when the active
//! [`RateControlPolicy`](oxigrid_core::RateControlPolicy) says so.
//!
//! # Features
//!
//! - Fixed precision, fixed rate and fixed accuracy modes
//! - Exactly reversible coding when every bit plane is kept
//! - Deterministic, platform-independent output
//! - Optional self-describing header ([`header`])
//! - Parallel fixed-rate coding with the `parallel` feature
//!
//! # Example
//!
//! ```
//! use oxigrid_codec::{compress, decompress};
//! use oxigrid_core::{Field, FieldMut, RateControlPolicy, ScalarKind};
//!
//! let data: Vec<f32> = (0..32 * 32).map(|i| (i as f32 * 0.01).cos()).collect();
//! let field = Field::new_2d(&data, 32, 32).unwrap();
//! let policy = RateControlPolicy::rate(8.0, ScalarKind::Float32, 2, false).unwrap();
//!
//! let compressed = compress(&field, &policy).unwrap();
//! assert_eq!(compressed.len(), data.len());
//!
//! let mut out = vec![0.0f32; data.len()];
//! let mut output = FieldMut::new_2d(&mut out, 32, 32).unwrap();
//! decompress(&compressed, &mut output, &policy).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

mod block;
mod decode;
mod embedded;
mod encode;
pub mod header;
#[cfg(feature = "parallel")]
mod parallel;
pub mod stream;
mod transform;
mod value;

pub use header::{Header, read_header, write_header};
#[cfg(feature = "parallel")]
pub use parallel::{compress_parallel, decompress_parallel};
pub use stream::Stream;

use oxigrid_core::{BitStream, Field, FieldMut, OxiGridError, RateControlPolicy, Result};

/// Compress `field` under `policy` into a new buffer.
///
/// The buffer is sized with the worst-case bound and truncated to the bytes
/// actually written. No header is written.
pub fn compress(field: &Field<'_>, policy: &RateControlPolicy) -> Result<Vec<u8>> {
    let capacity = field.maximum_compressed_size(policy)?;
    let mut stream = Stream::with_policy(*policy);
    stream.bind_bitstream(BitStream::with_capacity(capacity));
    let bytes = stream.compress(field)?;

    let mut buffer = stream
        .take_bitstream()
        .map(BitStream::into_inner)
        .ok_or_else(|| OxiGridError::configuration("no bitstream bound"))?;
    buffer.truncate(bytes);
    Ok(buffer)
}

/// Decompress `data` into `field` under `policy`.
///
/// Returns the number of bytes consumed.
pub fn decompress(data: &[u8], field: &mut FieldMut<'_>, policy: &RateControlPolicy) -> Result<usize> {
    let mut stream = Stream::with_policy(*policy);
    stream.bind_bitstream(BitStream::new(data));
    stream.decompress(field)
}
