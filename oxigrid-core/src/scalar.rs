//! Element kinds supported by the codec.

use crate::field::{FieldData, FieldDataMut};
use std::fmt;

/// The element type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// IEEE 754 single precision.
    Float32,
    /// IEEE 754 double precision.
    Float64,
}

impl ScalarKind {
    /// All kinds, in tag order.
    pub const ALL: [ScalarKind; 4] = [
        ScalarKind::Int32,
        ScalarKind::Int64,
        ScalarKind::Float32,
        ScalarKind::Float64,
    ];

    /// Width of the element (and of the integer coefficients it is coded as).
    pub fn bits(self) -> u32 {
        match self {
            ScalarKind::Int32 | ScalarKind::Float32 => 32,
            ScalarKind::Int64 | ScalarKind::Float64 => 64,
        }
    }

    /// Size of one element in bytes.
    pub fn size_bytes(self) -> usize {
        self.bits() as usize / 8
    }

    /// Whether the kind is a floating-point type.
    pub fn is_float(self) -> bool {
        matches!(self, ScalarKind::Float32 | ScalarKind::Float64)
    }

    /// Number of bits used to store a block's common exponent (0 for integers).
    pub fn exponent_bits(self) -> u32 {
        match self {
            ScalarKind::Float32 => 8,
            ScalarKind::Float64 => 11,
            ScalarKind::Int32 | ScalarKind::Int64 => 0,
        }
    }

    /// IEEE exponent bias (0 for integers).
    pub fn exponent_bias(self) -> i32 {
        match self {
            ScalarKind::Float32 => 127,
            ScalarKind::Float64 => 1023,
            ScalarKind::Int32 | ScalarKind::Int64 => 0,
        }
    }

    /// Number of bits holding the per-block bit-plane count on the lossless path.
    pub fn precision_bits(self) -> u32 {
        match self.bits() {
            32 => 5,
            _ => 6,
        }
    }

    /// Two-bit tag used by the stream header.
    pub fn tag(self) -> u8 {
        match self {
            ScalarKind::Int32 => 0,
            ScalarKind::Int64 => 1,
            ScalarKind::Float32 => 2,
            ScalarKind::Float64 => 3,
        }
    }

    /// Inverse of [`ScalarKind::tag`].
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    /// Short lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::Int32 => "int32",
            ScalarKind::Int64 => "int64",
            ScalarKind::Float32 => "float32",
            ScalarKind::Float64 => "float64",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A Rust type that can be stored in a field.
///
/// Implemented for `i32`, `i64`, `f32` and `f64`.
pub trait Element: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// The kind tag of this type.
    const KIND: ScalarKind;

    /// Wrap a borrowed slice as type-tagged field data.
    fn wrap(data: &[Self]) -> FieldData<'_>;

    /// Wrap a mutable slice as type-tagged field data.
    fn wrap_mut(data: &mut [Self]) -> FieldDataMut<'_>;
}

macro_rules! impl_element {
    ($ty:ty, $kind:ident) => {
        impl Element for $ty {
            const KIND: ScalarKind = ScalarKind::$kind;

            fn wrap(data: &[Self]) -> FieldData<'_> {
                FieldData::$kind(data)
            }

            fn wrap_mut(data: &mut [Self]) -> FieldDataMut<'_> {
                FieldDataMut::$kind(data)
            }
        }
    };
}

impl_element!(i32, Int32);
impl_element!(i64, Int64);
impl_element!(f32, Float32);
impl_element!(f64, Float64);
