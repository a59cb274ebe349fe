//! Block and field decoder.

use crate::block::{BlockCoder, BlockGrid, MAX_BLOCK_LEN};
use crate::embedded;
use crate::encode::plane_count_bits;
use crate::transform;
use crate::value::{BlockInt, BlockValue};
use oxigrid_core::{BitStream, Result, Shape};

impl BlockCoder {
    /// Decode one block of `4^rank` values. Returns the bits consumed,
    /// which always equals what [`encode_block`](Self::encode_block) wrote.
    pub(crate) fn decode_block<T, B>(&self, stream: &mut BitStream<B>, values: &mut [T]) -> Result<u32>
    where
        T: BlockValue,
        B: AsRef<[u8]>,
    {
        let mut ints = [<T::Int as Default>::default(); MAX_BLOCK_LEN];
        let ints = &mut ints[..values.len()];
        let kind = T::KIND;
        let budget = self.budget;

        if !kind.is_float() {
            let bits =
                self.decode_ints(stream, ints, budget.min_bits, budget.max_bits, budget.max_precision)?;
            T::dequantize(ints, 0, values);
            return Ok(bits);
        }

        let mut bits = 1;
        if stream.read_bit()? {
            bits += kind.exponent_bits();
            let emax = stream.read_bits(kind.exponent_bits())? as i32 - kind.exponent_bias();
            let max_prec = if self.lossless {
                kind.bits()
            } else {
                budget.precision(emax, self.rank)
            };
            bits += self.decode_ints(
                stream,
                ints,
                budget.min_bits.saturating_sub(bits),
                budget.max_bits.saturating_sub(bits),
                max_prec,
            )?;
            T::dequantize(ints, emax, values);
        } else {
            values.fill(T::default());
            if budget.min_bits > bits {
                stream.skip((budget.min_bits - bits) as u64)?;
                bits = budget.min_bits;
            }
        }
        Ok(bits)
    }

    fn decode_ints<I, B>(
        &self,
        stream: &mut BitStream<B>,
        ints: &mut [I],
        min_bits: u32,
        max_bits: u32,
        max_prec: u32,
    ) -> Result<u32>
    where
        I: BlockInt,
        B: AsRef<[u8]>,
    {
        let mut coeffs = [0u64; MAX_BLOCK_LEN];
        let coeffs = &mut coeffs[..ints.len()];

        let mut bits = if self.lossless {
            let pbits = plane_count_bits(I::BITS);
            let planes = stream.read_bits(pbits)? as u32 + 1;
            let read = embedded::decode_ints(
                stream,
                max_bits.saturating_sub(pbits),
                planes,
                coeffs,
                I::BITS,
            )?;
            transform::reorder_inverse(coeffs, self.rank, ints);
            transform::inverse_reversible(ints, self.rank);
            pbits + read
        } else {
            let read = embedded::decode_ints(stream, max_bits, max_prec, coeffs, I::BITS)?;
            transform::reorder_inverse(coeffs, self.rank, ints);
            transform::inverse(ints, self.rank);
            read
        };

        if bits < min_bits {
            stream.skip((min_bits - bits) as u64)?;
            bits = min_bits;
        }
        Ok(bits)
    }
}

/// Decode every block into `data`. Returns the bits consumed.
pub(crate) fn decode_field<T, B>(
    coder: &BlockCoder,
    stream: &mut BitStream<B>,
    data: &mut [T],
    shape: &Shape,
) -> Result<u64>
where
    T: BlockValue,
    B: AsRef<[u8]>,
{
    let grid = BlockGrid::new(shape);
    let n = grid.block_len();
    let mut block = [T::default(); MAX_BLOCK_LEN];
    let mut total = 0u64;

    for origin in grid.origins() {
        total += coder.decode_block(stream, &mut block[..n])? as u64;
        grid.scatter(&block[..n], origin, data);
    }

    log::debug!(
        "decoded {} {} blocks of {} from {} bits",
        grid.len(),
        T::KIND,
        n,
        total
    );
    Ok(total)
}
