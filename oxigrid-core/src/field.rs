//! Field descriptors.
//!
//! A field describes the logical array being compressed or decompressed: its
//! element kind, its rank (1 to 3) and its extents. It borrows the caller's
//! storage and never copies, reallocates or frees it.
//!
//! # Layout
//!
//! Values are stored with x varying fastest:
//!
//! ```text
//! index(x, y, z) = x + nx * (y + ny * z)
//! ```
//!
//! # Example
//!
//! ```
//! use oxigrid_core::field::Field;
//! use oxigrid_core::scalar::ScalarKind;
//!
//! let data = vec![0.0f64; 8 * 6];
//! let field = Field::new_2d(&data, 8, 6).unwrap();
//! assert_eq!(field.kind(), ScalarKind::Float64);
//! assert_eq!(field.shape().block_count(), 2 * 2);
//! ```

use crate::error::{OxiGridError, Result};
use crate::policy::RateControlPolicy;
use crate::scalar::{Element, ScalarKind};

/// Edge length of a block along every axis.
pub const BLOCK_EDGE: usize = 4;

/// Rank and extents of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    extents: [usize; 3],
    rank: usize,
}

impl Shape {
    /// Build a shape from 1 to 3 positive extents, x first.
    pub fn new(extents: &[usize]) -> Result<Self> {
        if extents.is_empty() || extents.len() > 3 {
            return Err(OxiGridError::configuration(format!(
                "rank must be 1, 2 or 3, got {}",
                extents.len()
            )));
        }
        if let Some(axis) = extents.iter().position(|&n| n == 0) {
            return Err(OxiGridError::configuration(format!(
                "extent along axis {axis} must be positive"
            )));
        }
        extents
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .ok_or_else(|| OxiGridError::configuration("element count overflows usize"))?;

        let mut padded = [1usize; 3];
        padded[..extents.len()].copy_from_slice(extents);
        Ok(Self {
            extents: padded,
            rank: extents.len(),
        })
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Extents, x first, `rank` entries long.
    pub fn extents(&self) -> &[usize] {
        &self.extents[..self.rank]
    }

    /// Extents padded with 1 up to three axes.
    pub fn extents3(&self) -> [usize; 3] {
        self.extents
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.extents.iter().product()
    }

    /// Always false; shapes have positive extents.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Number of blocks along each axis (1 for unused axes).
    pub fn blocks_per_axis(&self) -> [usize; 3] {
        let mut blocks = [1usize; 3];
        for (axis, count) in blocks.iter_mut().enumerate().take(self.rank) {
            *count = self.extents[axis].div_ceil(BLOCK_EDGE);
        }
        blocks
    }

    /// Total number of blocks covering the field.
    pub fn block_count(&self) -> usize {
        self.blocks_per_axis().iter().product()
    }

    /// Number of values in one block (`4^rank`).
    pub fn block_len(&self) -> usize {
        1 << (2 * self.rank)
    }
}

/// Borrowed, type-tagged field storage.
#[derive(Debug, Clone, Copy)]
pub enum FieldData<'a> {
    /// 32-bit integers.
    Int32(&'a [i32]),
    /// 64-bit integers.
    Int64(&'a [i64]),
    /// Single-precision floats.
    Float32(&'a [f32]),
    /// Double-precision floats.
    Float64(&'a [f64]),
}

impl FieldData<'_> {
    /// Element kind of the storage.
    pub fn kind(&self) -> ScalarKind {
        match self {
            FieldData::Int32(_) => ScalarKind::Int32,
            FieldData::Int64(_) => ScalarKind::Int64,
            FieldData::Float32(_) => ScalarKind::Float32,
            FieldData::Float64(_) => ScalarKind::Float64,
        }
    }

    /// Number of elements in the storage.
    pub fn len(&self) -> usize {
        match self {
            FieldData::Int32(d) => d.len(),
            FieldData::Int64(d) => d.len(),
            FieldData::Float32(d) => d.len(),
            FieldData::Float64(d) => d.len(),
        }
    }

    /// Whether the storage is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mutably borrowed, type-tagged field storage.
#[derive(Debug)]
pub enum FieldDataMut<'a> {
    /// 32-bit integers.
    Int32(&'a mut [i32]),
    /// 64-bit integers.
    Int64(&'a mut [i64]),
    /// Single-precision floats.
    Float32(&'a mut [f32]),
    /// Double-precision floats.
    Float64(&'a mut [f64]),
}

impl FieldDataMut<'_> {
    /// Element kind of the storage.
    pub fn kind(&self) -> ScalarKind {
        match self {
            FieldDataMut::Int32(_) => ScalarKind::Int32,
            FieldDataMut::Int64(_) => ScalarKind::Int64,
            FieldDataMut::Float32(_) => ScalarKind::Float32,
            FieldDataMut::Float64(_) => ScalarKind::Float64,
        }
    }

    /// Number of elements in the storage.
    pub fn len(&self) -> usize {
        match self {
            FieldDataMut::Int32(d) => d.len(),
            FieldDataMut::Int64(d) => d.len(),
            FieldDataMut::Float32(d) => d.len(),
            FieldDataMut::Float64(d) => d.len(),
        }
    }

    /// Whether the storage is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn check_len(shape: &Shape, len: usize) -> Result<()> {
    if len != shape.len() {
        return Err(OxiGridError::configuration(format!(
            "storage holds {len} elements but extents {:?} describe {}",
            shape.extents(),
            shape.len()
        )));
    }
    Ok(())
}

/// A read-only field: the input of compression.
#[derive(Debug, Clone, Copy)]
pub struct Field<'a> {
    shape: Shape,
    data: FieldData<'a>,
}

impl<'a> Field<'a> {
    /// Describe `data` with the given extents (x first).
    pub fn new<T: Element>(data: &'a [T], extents: &[usize]) -> Result<Self> {
        let shape = Shape::new(extents)?;
        check_len(&shape, data.len())?;
        Ok(Self {
            shape,
            data: T::wrap(data),
        })
    }

    /// Describe a 1D array of `nx` values.
    pub fn new_1d<T: Element>(data: &'a [T], nx: usize) -> Result<Self> {
        Self::new(data, &[nx])
    }

    /// Describe a 2D array of `nx * ny` values.
    pub fn new_2d<T: Element>(data: &'a [T], nx: usize, ny: usize) -> Result<Self> {
        Self::new(data, &[nx, ny])
    }

    /// Describe a 3D array of `nx * ny * nz` values.
    pub fn new_3d<T: Element>(data: &'a [T], nx: usize, ny: usize, nz: usize) -> Result<Self> {
        Self::new(data, &[nx, ny, nz])
    }

    /// Element kind.
    pub fn kind(&self) -> ScalarKind {
        self.data.kind()
    }

    /// Rank and extents.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    /// The borrowed storage.
    pub fn data(&self) -> FieldData<'a> {
        self.data
    }

    /// Worst-case compressed size in bytes under `policy`.
    pub fn maximum_compressed_size(&self, policy: &RateControlPolicy) -> Result<usize> {
        policy.maximum_compressed_size(self.kind(), &self.shape)
    }
}

/// A writable field: the output of decompression.
#[derive(Debug)]
pub struct FieldMut<'a> {
    shape: Shape,
    data: FieldDataMut<'a>,
}

impl<'a> FieldMut<'a> {
    /// Describe `data` with the given extents (x first).
    pub fn new<T: Element>(data: &'a mut [T], extents: &[usize]) -> Result<Self> {
        let shape = Shape::new(extents)?;
        check_len(&shape, data.len())?;
        Ok(Self {
            shape,
            data: T::wrap_mut(data),
        })
    }

    /// Describe a 1D array of `nx` values.
    pub fn new_1d<T: Element>(data: &'a mut [T], nx: usize) -> Result<Self> {
        Self::new(data, &[nx])
    }

    /// Describe a 2D array of `nx * ny` values.
    pub fn new_2d<T: Element>(data: &'a mut [T], nx: usize, ny: usize) -> Result<Self> {
        Self::new(data, &[nx, ny])
    }

    /// Describe a 3D array of `nx * ny * nz` values.
    pub fn new_3d<T: Element>(
        data: &'a mut [T],
        nx: usize,
        ny: usize,
        nz: usize,
    ) -> Result<Self> {
        Self::new(data, &[nx, ny, nz])
    }

    /// Element kind.
    pub fn kind(&self) -> ScalarKind {
        self.data.kind()
    }

    /// Rank and extents.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    /// The borrowed storage.
    pub fn data_mut(&mut self) -> &mut FieldDataMut<'a> {
        &mut self.data
    }

    /// Worst-case compressed size in bytes under `policy`.
    pub fn maximum_compressed_size(&self, policy: &RateControlPolicy) -> Result<usize> {
        policy.maximum_compressed_size(self.kind(), &self.shape)
    }
}
