//! Block partitioning.
//!
//! A field is covered by `4^rank` blocks visited in raster order (x blocks
//! fastest, then y, then z). Blocks that overhang the field edge are padded
//! by repeating the nearest in-range value along each axis, which keeps the
//! padded block smooth and cheap to code. Padding is never written back.

use oxigrid_core::{BLOCK_EDGE, BlockBudget, RateControlPolicy, ScalarKind, Shape};

/// Largest number of values in a block (a 3D block).
pub(crate) const MAX_BLOCK_LEN: usize = 64;

/// Block layout of a field.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BlockGrid {
    shape: Shape,
    blocks: [usize; 3],
}

impl BlockGrid {
    pub(crate) fn new(shape: &Shape) -> Self {
        Self {
            shape: *shape,
            blocks: shape.blocks_per_axis(),
        }
    }

    /// Number of blocks.
    pub(crate) fn len(&self) -> usize {
        self.blocks.iter().product()
    }

    /// Values per block.
    pub(crate) fn block_len(&self) -> usize {
        self.shape.block_len()
    }

    /// First field coordinate covered by block `index`.
    pub(crate) fn origin(&self, index: usize) -> [usize; 3] {
        let [bx, by, _] = self.blocks;
        [
            (index % bx) * BLOCK_EDGE,
            ((index / bx) % by) * BLOCK_EDGE,
            (index / (bx * by)) * BLOCK_EDGE,
        ]
    }

    /// Origins of all blocks in coding order.
    pub(crate) fn origins(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        (0..self.len()).map(|index| self.origin(index))
    }

    /// Copy the block at `origin` out of `data`, padding overhanging
    /// coordinates with the nearest in-range value.
    pub(crate) fn gather<T: Copy>(&self, data: &[T], origin: [usize; 3], block: &mut [T]) {
        let [nx, ny, nz] = self.shape.extents3();
        for (i, value) in block.iter_mut().enumerate() {
            let x = (origin[0] + (i & 3)).min(nx - 1);
            let y = (origin[1] + ((i >> 2) & 3)).min(ny - 1);
            let z = (origin[2] + ((i >> 4) & 3)).min(nz - 1);
            *value = data[x + nx * (y + ny * z)];
        }
    }

    /// Copy the in-range part of `block` into `data` at `origin`.
    pub(crate) fn scatter<T: Copy>(&self, block: &[T], origin: [usize; 3], data: &mut [T]) {
        let [nx, ny, nz] = self.shape.extents3();
        for (i, &value) in block.iter().enumerate() {
            let x = origin[0] + (i & 3);
            let y = origin[1] + ((i >> 2) & 3);
            let z = origin[2] + ((i >> 4) & 3);
            if x < nx && y < ny && z < nz {
                data[x + nx * (y + ny * z)] = value;
            }
        }
    }
}

/// Per-field coding parameters shared by every block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockCoder {
    pub(crate) budget: BlockBudget,
    pub(crate) rank: usize,
    pub(crate) lossless: bool,
}

impl BlockCoder {
    pub(crate) fn new(policy: &RateControlPolicy, kind: ScalarKind, rank: usize) -> Self {
        Self {
            budget: policy.budget(),
            rank,
            lossless: policy.is_lossless(kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origins_raster_order() {
        let shape = Shape::new(&[9, 5]).unwrap();
        let grid = BlockGrid::new(&shape);
        let origins: Vec<_> = grid.origins().collect();
        assert_eq!(
            origins,
            vec![[0, 0, 0], [4, 0, 0], [8, 0, 0], [0, 4, 0], [4, 4, 0], [8, 4, 0]]
        );
    }

    #[test]
    fn test_gather_pads_with_nearest_value() {
        let shape = Shape::new(&[6]).unwrap();
        let grid = BlockGrid::new(&shape);
        let data = [1, 2, 3, 4, 5, 6];
        let mut block = [0; 4];
        grid.gather(&data, grid.origin(1), &mut block);
        assert_eq!(block, [5, 6, 6, 6]);
    }

    #[test]
    fn test_gather_2d_partial() {
        let shape = Shape::new(&[2, 3]).unwrap();
        let grid = BlockGrid::new(&shape);
        let data = [1, 2, 3, 4, 5, 6];
        let mut block = [0; 16];
        grid.gather(&data, [0, 0, 0], &mut block);
        assert_eq!(
            block,
            [1, 2, 2, 2, 3, 4, 4, 4, 5, 6, 6, 6, 5, 6, 6, 6]
        );
    }

    #[test]
    fn test_scatter_skips_padding() {
        let shape = Shape::new(&[5, 2, 1]).unwrap();
        let grid = BlockGrid::new(&shape);
        let block: Vec<i32> = (0..64).collect();
        let mut data = vec![-1; 10];
        grid.scatter(&block, grid.origin(1), &mut data);
        assert_eq!(data, vec![-1, -1, -1, -1, 0, -1, -1, -1, -1, 4]);
        grid.scatter(&block, grid.origin(0), &mut data);
        assert_eq!(data, vec![0, 1, 2, 3, 0, 4, 5, 6, 7, 4]);
    }

    #[test]
    fn test_gather_scatter_roundtrip_3d() {
        let shape = Shape::new(&[5, 6, 7]).unwrap();
        let grid = BlockGrid::new(&shape);
        let data: Vec<u32> = (0..shape.len() as u32).collect();
        let mut out = vec![0u32; data.len()];
        let mut block = [0u32; MAX_BLOCK_LEN];
        for origin in grid.origins() {
            grid.gather(&data, origin, &mut block[..grid.block_len()]);
            grid.scatter(&block[..grid.block_len()], origin, &mut out);
        }
        assert_eq!(out, data);
    }
}
