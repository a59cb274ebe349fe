//! # OxiGrid Core
//!
//! Core components for the OxiGrid array compressor.
//!
//! This crate provides the building blocks shared by the codec and its
//! callers:
//!
//! - [`bitstream`]: Word-oriented bit I/O over a caller-owned buffer
//! - [`field`]: Field descriptors borrowing 1D/2D/3D caller arrays
//! - [`policy`]: Fixed precision / rate / accuracy rate control
//! - [`scalar`]: Supported element kinds
//! - [`error`]: Error types
//!
//! ## Architecture
//!
//! OxiGrid is designed as a layered stack:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L3: Driver                                              │
//! │     CLI, optional stream header                         │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Codec                                               │
//! │     Block transform, embedded bit-plane coder, Stream   │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: Core (this crate)                                   │
//! │     BitStream, Field, RateControlPolicy, errors         │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use oxigrid_core::bitstream::BitStream;
//! use oxigrid_core::field::Field;
//! use oxigrid_core::policy::RateControlPolicy;
//!
//! let data = vec![0.5f32; 64 * 64];
//! let field = Field::new_2d(&data, 64, 64).unwrap();
//! let policy = RateControlPolicy::precision(20).unwrap();
//!
//! // Size the buffer once, up front; the codec never grows it.
//! let bytes = field.maximum_compressed_size(&policy).unwrap();
//! let stream = BitStream::with_capacity(bytes);
//! assert_eq!(stream.capacity_bytes(), bytes);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![forbid(unsafe_code)]

pub mod bitstream;
pub mod error;
pub mod field;
pub mod policy;
pub mod scalar;

// Re-exports for convenience
pub use bitstream::{BitStream, WORD_BITS};
pub use error::{OxiGridError, Result};
pub use field::{BLOCK_EDGE, Field, FieldData, FieldDataMut, FieldMut, Shape};
pub use policy::{
    BlockBudget, FixedAccuracy, FixedPrecision, FixedRate, HEADER_MAX_BITS, MAX_BLOCK_BITS,
    MAX_PRECISION, MIN_EXPONENT, Mode, RateControlPolicy,
};
pub use scalar::{Element, ScalarKind};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bitstream::BitStream;
    pub use crate::error::{OxiGridError, Result};
    pub use crate::field::{Field, FieldMut, Shape};
    pub use crate::policy::{FixedAccuracy, FixedPrecision, FixedRate, RateControlPolicy};
    pub use crate::scalar::{Element, ScalarKind};
}
