//! Block and field encoder.

use crate::block::{BlockCoder, BlockGrid, MAX_BLOCK_LEN};
use crate::embedded;
use crate::transform;
use crate::value::{BlockInt, BlockValue};
use oxigrid_core::{BitStream, Result, Shape};

impl BlockCoder {
    /// Encode one block of `4^rank` values. Returns the bits written.
    pub(crate) fn encode_block<T, B>(&self, stream: &mut BitStream<B>, values: &[T]) -> Result<u32>
    where
        T: BlockValue,
        B: AsRef<[u8]> + AsMut<[u8]>,
    {
        let mut ints = [<T::Int as Default>::default(); MAX_BLOCK_LEN];
        let ints = &mut ints[..values.len()];
        let kind = T::KIND;
        let budget = self.budget;

        if !kind.is_float() {
            T::quantize(values, 0, ints);
            return self.encode_ints(stream, ints, budget.min_bits, budget.max_bits, budget.max_precision);
        }

        let emax = T::block_exponent(values);
        let max_prec = if self.lossless {
            kind.bits()
        } else {
            budget.precision(emax, self.rank)
        };
        let biased = if max_prec > 0 {
            emax + kind.exponent_bias()
        } else {
            0
        };

        let mut bits = 1;
        if biased > 0 {
            // Nonzero flag and biased exponent in one write.
            bits += kind.exponent_bits();
            stream.write_bits(2 * biased as u64 + 1, bits)?;
            T::quantize(values, emax, ints);
            bits += self.encode_ints(
                stream,
                ints,
                budget.min_bits.saturating_sub(bits),
                budget.max_bits.saturating_sub(bits),
                max_prec,
            )?;
        } else {
            stream.write_bit(false)?;
            if budget.min_bits > bits {
                stream.pad((budget.min_bits - bits) as u64)?;
                bits = budget.min_bits;
            }
        }
        Ok(bits)
    }

    /// Transform, reorder and bit-plane code an integer block, then pad to
    /// `min_bits`.
    fn encode_ints<I, B>(
        &self,
        stream: &mut BitStream<B>,
        ints: &mut [I],
        min_bits: u32,
        max_bits: u32,
        max_prec: u32,
    ) -> Result<u32>
    where
        I: BlockInt,
        B: AsRef<[u8]> + AsMut<[u8]>,
    {
        let mut coeffs = [0u64; MAX_BLOCK_LEN];
        let coeffs = &mut coeffs[..ints.len()];

        let mut bits = if self.lossless {
            transform::forward_reversible(ints, self.rank);
            transform::reorder_forward(ints, self.rank, coeffs);
            let planes = embedded::required_planes(coeffs, I::BITS).max(1);
            let pbits = plane_count_bits(I::BITS);
            stream.write_bits((planes - 1) as u64, pbits)?;
            pbits
                + embedded::encode_ints(
                    stream,
                    max_bits.saturating_sub(pbits),
                    planes,
                    coeffs,
                    I::BITS,
                )?
        } else {
            transform::forward(ints, self.rank);
            transform::reorder_forward(ints, self.rank, coeffs);
            embedded::encode_ints(stream, max_bits, max_prec, coeffs, I::BITS)?
        };

        if bits < min_bits {
            stream.pad((min_bits - bits) as u64)?;
            bits = min_bits;
        }
        Ok(bits)
    }
}

/// Bits used to store the plane count of a reversible block.
pub(crate) fn plane_count_bits(intprec: u32) -> u32 {
    if intprec > 32 { 6 } else { 5 }
}

/// Encode every block of `data`. Returns the bits written.
pub(crate) fn encode_field<T, B>(
    coder: &BlockCoder,
    stream: &mut BitStream<B>,
    data: &[T],
    shape: &Shape,
) -> Result<u64>
where
    T: BlockValue,
    B: AsRef<[u8]> + AsMut<[u8]>,
{
    let grid = BlockGrid::new(shape);
    let n = grid.block_len();
    let mut block = [T::default(); MAX_BLOCK_LEN];
    let mut total = 0u64;

    for origin in grid.origins() {
        grid.gather(data, origin, &mut block[..n]);
        total += coder.encode_block(stream, &block[..n])? as u64;
    }

    log::debug!(
        "encoded {} {} blocks of {} into {} bits",
        grid.len(),
        T::KIND,
        n,
        total
    );
    Ok(total)
}
