//! Codec state: one rate-control policy plus one bound bitstream.
//!
//! A [`Stream`] is configured once and then used to compress or decompress
//! any number of fields. Each call is independent: no state is carried from
//! one block to the next or from one call to the next, apart from the
//! bitstream cursor.
//!
//! # Example
//!
//! ```rust
//! use oxigrid_codec::Stream;
//! use oxigrid_core::{BitStream, Field, FieldMut};
//!
//! let data: Vec<f64> = (0..256).map(|i| (i as f64 * 0.1).sin()).collect();
//! let field = Field::new_2d(&data, 16, 16).unwrap();
//!
//! let mut stream = Stream::new();
//! stream.set_accuracy(1e-6).unwrap();
//! let size = stream.maximum_size(&field).unwrap();
//! stream.bind_bitstream(BitStream::with_capacity(size));
//! let written = stream.compress(&field).unwrap();
//!
//! let mut out = vec![0.0f64; 256];
//! let mut output = FieldMut::new_2d(&mut out, 16, 16).unwrap();
//! stream.rewind();
//! let read = stream.decompress(&mut output).unwrap();
//! assert_eq!(read, written);
//! assert!(data.iter().zip(&out).all(|(a, b)| (a - b).abs() <= 1e-6));
//! ```

use crate::block::BlockCoder;
use crate::decode::decode_field;
use crate::encode::encode_field;
use crate::header::{self, Header};
use oxigrid_core::{
    BitStream, Field, FieldData, FieldDataMut, FieldMut, FixedAccuracy, FixedPrecision,
    FixedRate, OxiGridError, RateControlPolicy, Result, ScalarKind,
};

/// Run `$body` with `$values` bound to the typed slice inside `$data`.
macro_rules! with_values {
    ($enum:ident, $data:expr, $values:ident => $body:expr) => {
        match $data {
            $enum::Int32($values) => $body,
            $enum::Int64($values) => $body,
            $enum::Float32($values) => $body,
            $enum::Float64($values) => $body,
        }
    };
}

/// Compression/decompression state.
#[derive(Debug)]
pub struct Stream<B> {
    policy: Option<RateControlPolicy>,
    bitstream: Option<BitStream<B>>,
}

impl<B> Default for Stream<B> {
    fn default() -> Self {
        Self {
            policy: None,
            bitstream: None,
        }
    }
}

impl<B> Stream<B> {
    /// Create a stream with no policy and no bitstream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stream with the given policy.
    pub fn with_policy(policy: RateControlPolicy) -> Self {
        Self {
            policy: Some(policy),
            bitstream: None,
        }
    }

    /// Replace the active policy.
    pub fn set_policy(&mut self, policy: RateControlPolicy) {
        log::trace!("policy set to {policy}");
        self.policy = Some(policy);
    }

    /// The active policy, if any.
    pub fn policy(&self) -> Option<&RateControlPolicy> {
        self.policy.as_ref()
    }

    /// Switch to fixed precision with `bits` bit planes per block.
    ///
    /// Returns the precision in effect. On error the previous policy is
    /// kept.
    pub fn set_precision(&mut self, bits: u32) -> Result<u32> {
        let precision = FixedPrecision::new(bits)?;
        self.set_policy(RateControlPolicy::FixedPrecision(precision));
        Ok(precision.bits())
    }

    /// Switch to fixed rate for fields of `kind` and `rank`.
    ///
    /// Returns the achieved rate in bits per value, which may differ from the
    /// request because the block budget is a whole number of bits.
    pub fn set_rate(
        &mut self,
        bits_per_value: f64,
        kind: ScalarKind,
        rank: usize,
        word_aligned: bool,
    ) -> Result<f64> {
        let rate = FixedRate::new(bits_per_value, kind, rank, word_aligned)?;
        self.set_policy(RateControlPolicy::FixedRate(rate));
        Ok(rate.rate())
    }

    /// Switch to fixed accuracy.
    ///
    /// Returns the tolerance actually enforced, a power of two no larger than
    /// `tolerance`.
    pub fn set_accuracy(&mut self, tolerance: f64) -> Result<f64> {
        let accuracy = FixedAccuracy::new(tolerance)?;
        self.set_policy(RateControlPolicy::FixedAccuracy(accuracy));
        Ok(accuracy.effective_tolerance())
    }

    /// Bind a bitstream, returning the one previously bound.
    pub fn bind_bitstream(&mut self, bitstream: BitStream<B>) -> Option<BitStream<B>> {
        self.bitstream.replace(bitstream)
    }

    /// The bound bitstream.
    pub fn bitstream(&self) -> Option<&BitStream<B>> {
        self.bitstream.as_ref()
    }

    /// The bound bitstream, mutably.
    pub fn bitstream_mut(&mut self) -> Option<&mut BitStream<B>> {
        self.bitstream.as_mut()
    }

    /// Unbind and return the bitstream.
    pub fn take_bitstream(&mut self) -> Option<BitStream<B>> {
        self.bitstream.take()
    }

    fn require_policy(&self) -> Result<RateControlPolicy> {
        self.policy
            .ok_or_else(|| OxiGridError::configuration("no rate-control policy set"))
    }
}

fn no_bitstream() -> OxiGridError {
    OxiGridError::configuration("no bitstream bound")
}

impl<B: AsRef<[u8]>> Stream<B> {
    /// Move the bitstream cursor back to its origin. The policy is kept.
    pub fn rewind(&mut self) {
        if let Some(bitstream) = self.bitstream.as_mut() {
            bitstream.rewind();
        }
    }

    /// Worst-case compressed size of `field` in bytes under the active
    /// policy.
    pub fn maximum_size(&self, field: &Field<'_>) -> Result<usize> {
        field.maximum_compressed_size(&self.require_policy()?)
    }

    /// Decompress into `field` from the bitstream cursor.
    ///
    /// The field must describe the same kind and extents that were
    /// compressed. Returns the number of bytes consumed, rounded up to whole
    /// words.
    pub fn decompress(&mut self, field: &mut FieldMut<'_>) -> Result<usize> {
        let policy = self.require_policy()?;
        let kind = field.kind();
        let shape = *field.shape();
        policy.validate(kind, shape.rank())?;
        let stream = self.bitstream.as_mut().ok_or_else(no_bitstream)?;

        let coder = BlockCoder::new(&policy, kind, shape.rank());
        let bits = with_values!(FieldDataMut, field.data_mut(), values => {
            decode_field(&coder, stream, &mut **values, &shape)
        })?;
        stream.align();

        let bytes = stream.size_bytes();
        log::debug!(
            "decompressed {} {kind} values ({}) from {bytes} bytes, {} bits",
            shape.len(),
            policy.mode(),
            bits
        );
        Ok(bytes)
    }

    /// Read a header at the bitstream cursor and adopt its policy.
    pub fn read_header(&mut self) -> Result<Header> {
        let stream = self.bitstream.as_mut().ok_or_else(no_bitstream)?;
        let header = header::read_header(stream)?;
        self.set_policy(header.policy);
        Ok(header)
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Stream<B> {
    /// Compress `field` at the bitstream cursor and flush.
    ///
    /// Returns the number of bytes in the bitstream after the flush.
    pub fn compress(&mut self, field: &Field<'_>) -> Result<usize> {
        let policy = self.require_policy()?;
        let kind = field.kind();
        let shape = field.shape();
        policy.validate(kind, shape.rank())?;
        let stream = self.bitstream.as_mut().ok_or_else(no_bitstream)?;

        let coder = BlockCoder::new(&policy, kind, shape.rank());
        let bits = with_values!(FieldData, field.data(), values => {
            encode_field(&coder, stream, values, shape)
        })?;
        stream.flush()?;

        let bytes = stream.size_bytes();
        log::debug!(
            "compressed {} {kind} values ({}) into {bytes} bytes, {:.3} bits/value",
            shape.len(),
            policy.mode(),
            bits as f64 / shape.len() as f64
        );
        Ok(bytes)
    }

    /// Write a header describing `field` under the active policy.
    ///
    /// Returns the number of bits written.
    pub fn write_header(&mut self, field: &Field<'_>) -> Result<u64> {
        let policy = self.require_policy()?;
        let stream = self.bitstream.as_mut().ok_or_else(no_bitstream)?;
        header::write_header(stream, field.kind(), field.shape(), &policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_precision() {
        let mut stream: Stream<Vec<u8>> = Stream::new();
        assert_eq!(stream.set_precision(12).unwrap(), 12);
        assert_eq!(
            stream.policy().map(|p| p.mode()),
            Some(oxigrid_core::Mode::FixedPrecision)
        );
        assert!(stream.set_precision(0).is_err());
        assert!(stream.set_precision(65).is_err());
        // Failed configuration leaves the previous policy in place.
        assert_eq!(stream.policy(), Some(&RateControlPolicy::precision(12).unwrap()));
    }

    #[test]
    fn test_set_rate_returns_achieved_rate() {
        let mut stream: Stream<Vec<u8>> = Stream::new();
        let rate = stream.set_rate(1.3, ScalarKind::Int32, 1, false).unwrap();
        assert_eq!(rate, 5.0 / 4.0);
        let rate = stream.set_rate(1.0, ScalarKind::Float64, 2, true).unwrap();
        assert_eq!(rate, 64.0 / 16.0);
        assert!(stream.set_rate(-1.0, ScalarKind::Float64, 2, false).is_err());
    }

    #[test]
    fn test_set_accuracy_returns_power_of_two() {
        let mut stream: Stream<Vec<u8>> = Stream::new();
        assert_eq!(stream.set_accuracy(1e-3).unwrap(), 1.0 / 1024.0);
        assert_eq!(stream.set_accuracy(0.25).unwrap(), 0.25);
        assert!(stream.set_accuracy(0.0).is_err());
        assert!(stream.set_accuracy(f64::NAN).is_err());
    }

    #[test]
    fn test_bind_returns_previous() {
        let mut stream = Stream::new();
        assert!(stream.bind_bitstream(BitStream::with_capacity(8)).is_none());
        let old = stream.bind_bitstream(BitStream::with_capacity(16)).unwrap();
        assert_eq!(old.capacity_bytes(), 8);
        assert_eq!(stream.bitstream().map(|b| b.capacity_bytes()), Some(16));
        assert!(stream.take_bitstream().is_some());
        assert!(stream.bitstream().is_none());
    }

    #[test]
    fn test_compress_requires_policy_and_bitstream() {
        let data = [1.0f32; 16];
        let field = Field::new_1d(&data, 16).unwrap();

        let mut stream = Stream::new();
        stream.bind_bitstream(BitStream::with_capacity(1024));
        assert!(matches!(
            stream.compress(&field),
            Err(OxiGridError::Configuration { .. })
        ));

        let mut stream: Stream<Vec<u8>> = Stream::new();
        stream.set_precision(16).unwrap();
        assert!(matches!(
            stream.compress(&field),
            Err(OxiGridError::Configuration { .. })
        ));
    }

    #[test]
    fn test_compress_rejects_mismatched_rate_before_writing() {
        let data = [1i64; 16];
        let field = Field::new_2d(&data, 4, 4).unwrap();
        let mut stream = Stream::new();
        stream.bind_bitstream(BitStream::with_capacity(1024));

        stream.set_rate(8.0, ScalarKind::Int32, 2, false).unwrap();
        let err = stream.compress(&field).unwrap_err();
        assert_eq!(
            err,
            OxiGridError::type_mismatch(ScalarKind::Int32, ScalarKind::Int64)
        );

        stream.set_rate(8.0, ScalarKind::Int64, 1, false).unwrap();
        assert!(matches!(
            stream.compress(&field),
            Err(OxiGridError::Configuration { .. })
        ));
        assert_eq!(stream.bitstream().map(|b| b.write_position()), Some(0));
    }

    #[test]
    fn test_roundtrip_with_header() {
        let data: Vec<i32> = (0..60).map(|i| i * i - 300).collect();
        let field = Field::new_2d(&data, 10, 6).unwrap();

        let mut writer = Stream::new();
        writer.set_precision(32).unwrap();
        let size = writer.maximum_size(&field).unwrap();
        writer.bind_bitstream(BitStream::with_capacity(size));
        writer.write_header(&field).unwrap();
        let bytes = writer.compress(&field).unwrap();
        let buffer = writer.take_bitstream().unwrap().into_inner();

        let mut reader = Stream::new();
        reader.bind_bitstream(BitStream::new(&buffer[..bytes]));
        let header = reader.read_header().unwrap();
        assert_eq!(header.kind, ScalarKind::Int32);
        assert_eq!(header.shape.extents(), &[10, 6]);

        let mut out = vec![0i32; 60];
        let mut output = FieldMut::new(&mut out, header.shape.extents()).unwrap();
        assert_eq!(reader.decompress(&mut output).unwrap(), bytes);
        assert_eq!(out, data);
    }

    #[test]
    fn test_rewind_is_idempotent() {
        let data: Vec<f32> = (0..64).map(|i| i as f32 * 0.5).collect();
        let field = Field::new_3d(&data, 4, 4, 4).unwrap();
        let mut stream = Stream::new();
        stream.set_precision(20).unwrap();
        stream.bind_bitstream(BitStream::with_capacity(stream.maximum_size(&field).unwrap()));

        let first = stream.compress(&field).unwrap();
        let bytes = stream.bitstream().unwrap().data().to_vec();
        stream.rewind();
        stream.rewind();
        let second = stream.compress(&field).unwrap();
        assert_eq!(first, second);
        assert_eq!(stream.bitstream().unwrap().data(), &bytes[..]);
    }
}
