//! Utility functions for the CLI.

use oxigrid_core::{Element, Field, FieldMut, OxiGridError, ScalarKind, Shape};
use serde::Serialize;

/// A raw array decoded from little-endian bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum RawArray {
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

macro_rules! with_array {
    ($array:expr, $values:ident => $body:expr) => {
        match $array {
            RawArray::Int32($values) => $body,
            RawArray::Int64($values) => $body,
            RawArray::Float32($values) => $body,
            RawArray::Float64($values) => $body,
        }
    };
}

/// Element types that can be read from and written to raw files.
trait RawValue: Element {
    fn from_le(bytes: &[u8]) -> Self;
    fn extend_le(self, out: &mut Vec<u8>);
    fn to_f64(self) -> f64;
}

macro_rules! impl_raw_value {
    ($($ty:ty),*) => {
        $(impl RawValue for $ty {
            fn from_le(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                buf.copy_from_slice(bytes);
                <$ty>::from_le_bytes(buf)
            }

            fn extend_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn to_f64(self) -> f64 {
                self as f64
            }
        })*
    };
}

impl_raw_value!(i32, i64, f32, f64);

fn decode<T: RawValue>(bytes: &[u8]) -> Vec<T> {
    bytes
        .chunks_exact(std::mem::size_of::<T>())
        .map(T::from_le)
        .collect()
}

fn encode<T: RawValue>(values: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * std::mem::size_of::<T>());
    for &v in values {
        v.extend_le(&mut out);
    }
    out
}

/// Size in bytes of a raw array of `kind` with `shape`.
pub fn raw_size(kind: ScalarKind, shape: &Shape) -> Result<usize, OxiGridError> {
    shape.len().checked_mul(kind.size_bytes()).ok_or_else(|| {
        OxiGridError::configuration(format!(
            "{} {kind} values overflow the addressable size",
            shape.len()
        ))
    })
}

impl RawArray {
    /// Decode `bytes` as `shape.len()` values of `kind`.
    pub fn from_le_bytes(
        bytes: &[u8],
        kind: ScalarKind,
        shape: &Shape,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let expected = raw_size(kind, shape)?;
        if bytes.len() != expected {
            return Err(format!(
                "input holds {} bytes but {} {} values need {} bytes",
                bytes.len(),
                shape.len(),
                kind,
                expected
            )
            .into());
        }

        Ok(match kind {
            ScalarKind::Int32 => RawArray::Int32(decode(bytes)),
            ScalarKind::Int64 => RawArray::Int64(decode(bytes)),
            ScalarKind::Float32 => RawArray::Float32(decode(bytes)),
            ScalarKind::Float64 => RawArray::Float64(decode(bytes)),
        })
    }

    /// A zero-filled array of `len` values of `kind`.
    pub fn zeroed(kind: ScalarKind, len: usize) -> Self {
        match kind {
            ScalarKind::Int32 => RawArray::Int32(vec![0; len]),
            ScalarKind::Int64 => RawArray::Int64(vec![0; len]),
            ScalarKind::Float32 => RawArray::Float32(vec![0.0; len]),
            ScalarKind::Float64 => RawArray::Float64(vec![0.0; len]),
        }
    }

    pub fn to_le_bytes(&self) -> Vec<u8> {
        with_array!(self, values => encode(values))
    }

    /// Borrow as a field with the given extents.
    pub fn field(&self, shape: &Shape) -> Result<Field<'_>, OxiGridError> {
        with_array!(self, values => Field::new(values, shape.extents()))
    }

    /// Borrow mutably as a field with the given extents.
    pub fn field_mut(&mut self, shape: &Shape) -> Result<FieldMut<'_>, OxiGridError> {
        with_array!(self, values => FieldMut::new(values, shape.extents()))
    }

    /// Values widened to f64 for error statistics.
    pub fn to_f64(&self) -> Vec<f64> {
        with_array!(self, values => values.iter().map(|&v| v.to_f64()).collect())
    }
}

/// Reconstruction error of a decompressed array against its original.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorStats {
    pub max_abs_error: f64,
    pub rmse: f64,
    /// Peak signal-to-noise ratio in dB; absent for an exact reconstruction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psnr: Option<f64>,
}

impl ErrorStats {
    pub fn between(original: &[f64], decoded: &[f64]) -> Self {
        let mut max_abs_error = 0.0f64;
        let mut sum_sq = 0.0f64;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for (&a, &b) in original.iter().zip(decoded) {
            let err = (a - b).abs();
            max_abs_error = max_abs_error.max(err);
            sum_sq += err * err;
            min = min.min(a);
            max = max.max(a);
        }

        let n = original.len().max(1) as f64;
        let mse = sum_sq / n;
        let rmse = mse.sqrt();
        let range = max - min;
        let psnr = if mse > 0.0 && range > 0.0 {
            Some(20.0 * range.log10() - 10.0 * mse.log10())
        } else {
            None
        };

        Self {
            max_abs_error,
            rmse,
            psnr,
        }
    }
}

/// Compression ratio as original/compressed.
pub fn ratio(original: usize, compressed: usize) -> f64 {
    if compressed == 0 {
        0.0
    } else {
        original as f64 / compressed as f64
    }
}

/// Compressed bits per array value.
pub fn bits_per_value(compressed: usize, values: usize) -> f64 {
    if values == 0 {
        0.0
    } else {
        compressed as f64 * 8.0 / values as f64
    }
}
