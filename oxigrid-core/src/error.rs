//! Error types for OxiGrid operations.
//!
//! This module provides a single error type covering every failure the codec
//! can report: invalid configuration, bitstream overflow, element type
//! disagreement between a field and its stream, and malformed input during
//! decompression.
//!
//! Running out of bit budget while coding a block is *not* an error. It is
//! the normal termination path of the fixed-precision and fixed-rate modes.

use crate::scalar::ScalarKind;
use thiserror::Error;

/// The main error type for OxiGrid operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OxiGridError {
    /// Invalid rank/extents, an out-of-range parameter, or a mode that is
    /// not legal for the field (e.g. fixed accuracy on integer data).
    #[error("Invalid configuration: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// A write would run past the end of the bitstream buffer.
    #[error("Bitstream capacity exceeded: need {needed_bits} bits, capacity is {capacity_bits} bits")]
    CapacityExceeded {
        /// Bit position the write needed to reach.
        needed_bits: u64,
        /// Usable capacity of the buffer in bits.
        capacity_bits: u64,
    },

    /// The field's element kind disagrees with the stream configuration.
    #[error("Type mismatch: stream configured for {expected}, field holds {found}")]
    TypeMismatch {
        /// Element kind the stream was configured for.
        expected: ScalarKind,
        /// Element kind of the field passed in.
        found: ScalarKind,
    },

    /// Malformed or truncated compressed input.
    #[error("Decode error at bit {bit_position}: {message}")]
    Decode {
        /// Bit position where decoding failed.
        bit_position: u64,
        /// Description of the failure.
        message: String,
    },
}

/// Result type alias for OxiGrid operations.
pub type Result<T> = std::result::Result<T, OxiGridError>;

impl OxiGridError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a capacity exceeded error.
    pub fn capacity_exceeded(needed_bits: u64, capacity_bits: u64) -> Self {
        Self::CapacityExceeded {
            needed_bits,
            capacity_bits,
        }
    }

    /// Create a type mismatch error.
    pub fn type_mismatch(expected: ScalarKind, found: ScalarKind) -> Self {
        Self::TypeMismatch { expected, found }
    }

    /// Create a decode error.
    pub fn decode(bit_position: u64, message: impl Into<String>) -> Self {
        Self::Decode {
            bit_position,
            message: message.into(),
        }
    }

    /// Whether this error was raised by configuration validation, i.e. before
    /// any bit was written or read.
    pub fn is_fail_fast(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::TypeMismatch { .. })
    }
}
