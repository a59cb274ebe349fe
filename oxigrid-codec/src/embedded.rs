//! Embedded bit-plane coder.
//!
//! Coefficients (negabinary, sequency ordered) are emitted one bit plane at
//! a time, most significant plane first. Within a plane, coefficients that
//! were already significant in an earlier plane are written verbatim. The
//! remaining suffix is coded with group tests: a single bit says whether any
//! coefficient in the suffix has a one in this plane, followed by a unary
//! scan up to that coefficient. Coding stops as soon as the bit budget or
//! the plane budget is exhausted, so every prefix of the output is a
//! coarser approximation of the block.

use oxigrid_core::{BitStream, Result};

/// Encode `data` (at most 64 coefficients of `intprec` bits each) using at
/// most `max_bits` bits and `max_prec` planes.
///
/// Returns the number of bits written.
pub(crate) fn encode_ints<B: AsRef<[u8]> + AsMut<[u8]>>(
    stream: &mut BitStream<B>,
    max_bits: u32,
    max_prec: u32,
    data: &[u64],
    intprec: u32,
) -> Result<u32> {
    let size = data.len();
    let kmin = intprec.saturating_sub(max_prec);
    let mut bits = max_bits;
    let mut n = 0usize;

    let mut k = intprec;
    while bits > 0 && k > kmin {
        k -= 1;

        // Gather bit plane k.
        let mut x = data
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, &c)| acc | (((c >> k) & 1) << i));

        // Verbatim bits for coefficients already known to be significant.
        let m = (n as u32).min(bits);
        bits -= m;
        x = stream.write_bits(x, m)?;

        // Group tests and unary scan over the rest.
        while n < size && bits > 0 {
            bits -= 1;
            if !stream.write_bit(x != 0)? {
                break;
            }
            while n < size - 1 && bits > 0 {
                bits -= 1;
                if stream.write_bit(x & 1 != 0)? {
                    break;
                }
                x >>= 1;
                n += 1;
            }
            x >>= 1;
            n += 1;
        }
    }

    Ok(max_bits - bits)
}

/// Decode into `data`, which must be zeroed. Mirrors [`encode_ints`] and
/// consumes exactly the bits it wrote.
///
/// Returns the number of bits read.
pub(crate) fn decode_ints<B: AsRef<[u8]>>(
    stream: &mut BitStream<B>,
    max_bits: u32,
    max_prec: u32,
    data: &mut [u64],
    intprec: u32,
) -> Result<u32> {
    let size = data.len();
    let kmin = intprec.saturating_sub(max_prec);
    let mut bits = max_bits;
    let mut n = 0usize;

    let mut k = intprec;
    while bits > 0 && k > kmin {
        k -= 1;

        let m = (n as u32).min(bits);
        bits -= m;
        let mut x = stream.read_bits(m)?;

        while n < size && bits > 0 {
            bits -= 1;
            if !stream.read_bit()? {
                break;
            }
            while n < size - 1 && bits > 0 {
                bits -= 1;
                if stream.read_bit()? {
                    break;
                }
                n += 1;
            }
            x += 1u64 << n;
            n += 1;
        }

        // Deposit bit plane k.
        let mut i = 0;
        while x != 0 {
            data[i] += (x & 1) << k;
            x >>= 1;
            i += 1;
        }
    }

    Ok(max_bits - bits)
}

/// Number of bit planes that must be coded to reproduce `data` exactly.
pub(crate) fn required_planes(data: &[u64], intprec: u32) -> u32 {
    let all = data.iter().fold(0u64, |acc, &c| acc | c);
    if all == 0 {
        0
    } else {
        intprec - all.trailing_zeros()
    }
}
