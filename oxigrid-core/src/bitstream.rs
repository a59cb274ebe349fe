//! Word-oriented bit-level I/O over a caller-owned byte buffer.
//!
//! This module provides [`BitStream`], a single cursor that can write and read
//! variable-width bit strings. Unlike a `Read`/`Write` adapter it never grows
//! its buffer: the caller sizes the buffer up front (see
//! [`RateControlPolicy::maximum_compressed_size`]) and any write that would run
//! past its end fails with [`OxiGridError::CapacityExceeded`].
//!
//! [`RateControlPolicy::maximum_compressed_size`]: crate::policy::RateControlPolicy::maximum_compressed_size
//!
//! # Bit Ordering
//!
//! Bits are staged in a 64-bit word, least significant bit first, and each
//! full word is stored little-endian. The layout is therefore identical on
//! every platform.
//!
//! # Example
//!
//! ```
//! use oxigrid_core::bitstream::BitStream;
//!
//! let mut stream = BitStream::with_capacity(16);
//! stream.write_bits(0b101, 3).unwrap();
//! stream.write_bits(0b1100, 4).unwrap();
//! stream.flush().unwrap();
//! assert_eq!(stream.size_bytes(), 8);
//!
//! stream.rewind();
//! assert_eq!(stream.read_bits(3).unwrap(), 0b101);
//! assert_eq!(stream.read_bits(4).unwrap(), 0b1100);
//! ```

use crate::error::{OxiGridError, Result};

/// Number of bits in a stream word.
pub const WORD_BITS: u32 = 64;

const WORD_BYTES: usize = (WORD_BITS / 8) as usize;

/// A bit cursor over a byte buffer.
///
/// `B` is any byte storage: an owned `Vec<u8>`, a borrowed `&mut [u8]` for
/// writing, or a borrowed `&[u8]` for reading.
///
/// The same cursor is used for both directions. While writing, `staged`
/// holds the `bits` most recent bits not yet stored; while reading, it holds
/// the `bits` bits of the current word not yet consumed.
#[derive(Debug, Clone)]
pub struct BitStream<B> {
    /// Underlying storage.
    buf: B,
    /// Index of the next word to store or load.
    word: usize,
    /// Staging word (LSB-first).
    staged: u64,
    /// Number of valid bits in `staged`, always below 64.
    bits: u32,
}

impl BitStream<Vec<u8>> {
    /// Create a stream over a zeroed buffer of `bytes` bytes.
    pub fn with_capacity(bytes: usize) -> Self {
        Self::new(vec![0u8; bytes])
    }
}

impl<B: AsRef<[u8]>> BitStream<B> {
    /// Create a stream positioned at the start of `buf`.
    pub fn new(buf: B) -> Self {
        Self {
            buf,
            word: 0,
            staged: 0,
            bits: 0,
        }
    }

    /// Get a reference to the underlying buffer.
    pub fn get_ref(&self) -> &B {
        &self.buf
    }

    /// Consume the stream and return the underlying buffer.
    ///
    /// Staged bits that were not flushed are discarded.
    pub fn into_inner(self) -> B {
        self.buf
    }

    /// Length of the underlying buffer in bytes.
    pub fn capacity_bytes(&self) -> usize {
        self.buf.as_ref().len()
    }

    /// Usable capacity in bits. A trailing partial word is never used.
    pub fn capacity_bits(&self) -> u64 {
        self.capacity_words() as u64 * WORD_BITS as u64
    }

    fn capacity_words(&self) -> usize {
        self.capacity_bytes() / WORD_BYTES
    }

    /// Bytes of whole words transferred since the origin.
    ///
    /// After [`flush`](Self::flush) this covers every bit written.
    pub fn size_bytes(&self) -> usize {
        self.word * WORD_BYTES
    }

    /// The touched prefix of the buffer.
    pub fn data(&self) -> &[u8] {
        &self.buf.as_ref()[..self.size_bytes()]
    }

    /// Current write position in bits.
    pub fn write_position(&self) -> u64 {
        self.word as u64 * WORD_BITS as u64 + self.bits as u64
    }

    /// Current read position in bits.
    pub fn read_position(&self) -> u64 {
        self.word as u64 * WORD_BITS as u64 - self.bits as u64
    }

    /// Reset the cursor to the origin. Buffer contents are left untouched.
    pub fn rewind(&mut self) {
        self.word = 0;
        self.staged = 0;
        self.bits = 0;
    }

    #[inline]
    fn load_word(&mut self) -> Result<u64> {
        let start = self.word * WORD_BYTES;
        let bytes = self
            .buf
            .as_ref()
            .get(start..start + WORD_BYTES)
            .ok_or_else(|| {
                OxiGridError::decode(
                    self.word as u64 * WORD_BITS as u64,
                    "unexpected end of bitstream",
                )
            })?;
        let mut word = [0u8; WORD_BYTES];
        word.copy_from_slice(bytes);
        self.word += 1;
        Ok(u64::from_le_bytes(word))
    }

    /// Read a single bit.
    #[inline]
    pub fn read_bit(&mut self) -> Result<bool> {
        if self.bits == 0 {
            self.staged = self.load_word()?;
            self.bits = WORD_BITS;
        }
        self.bits -= 1;
        let bit = self.staged & 1;
        self.staged >>= 1;
        Ok(bit != 0)
    }

    /// Read up to 64 bits.
    ///
    /// The first bit read ends up in the least significant position.
    #[inline]
    pub fn read_bits(&mut self, count: u32) -> Result<u64> {
        debug_assert!(count <= WORD_BITS, "Cannot read more than 64 bits at once");

        if count == 0 {
            return Ok(0);
        }

        let mut value = self.staged;
        if self.bits < count {
            let word = self.load_word()?;
            value |= word << self.bits;
            let used = count - self.bits;
            self.staged = word.checked_shr(used).unwrap_or(0);
            self.bits = WORD_BITS - used;
        } else {
            self.bits -= count;
            self.staged >>= count;
        }

        if count < WORD_BITS {
            value &= (1u64 << count) - 1;
        }
        Ok(value)
    }

    /// Position the read cursor at an absolute bit offset.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        let word = (offset / WORD_BITS as u64) as usize;
        let rem = (offset % WORD_BITS as u64) as u32;
        if offset > self.capacity_bits() {
            return Err(OxiGridError::decode(offset, "seek past end of bitstream"));
        }
        self.word = word;
        if rem > 0 {
            self.staged = self.load_word()? >> rem;
            self.bits = WORD_BITS - rem;
        } else {
            self.staged = 0;
            self.bits = 0;
        }
        Ok(())
    }

    /// Skip `count` bits on the read side.
    pub fn skip(&mut self, count: u64) -> Result<()> {
        self.seek(self.read_position() + count)
    }

    /// Discard the unread remainder of the current word.
    pub fn align(&mut self) {
        self.staged = 0;
        self.bits = 0;
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> BitStream<B> {
    #[inline]
    fn store_word(&mut self, value: u64) -> Result<()> {
        let start = self.word * WORD_BYTES;
        let capacity_bits = self.capacity_bits();
        let needed_bits = (self.word as u64 + 1) * WORD_BITS as u64;
        let slot = self
            .buf
            .as_mut()
            .get_mut(start..start + WORD_BYTES)
            .ok_or_else(|| OxiGridError::capacity_exceeded(needed_bits, capacity_bits))?;
        slot.copy_from_slice(&value.to_le_bytes());
        self.word += 1;
        Ok(())
    }

    /// Write a single bit and return it.
    #[inline]
    pub fn write_bit(&mut self, bit: bool) -> Result<bool> {
        let staged = self.staged | ((bit as u64) << self.bits);
        if self.bits + 1 == WORD_BITS {
            self.store_word(staged)?;
            self.staged = 0;
            self.bits = 0;
        } else {
            self.staged = staged;
            self.bits += 1;
        }
        Ok(bit)
    }

    /// Write the low `count` bits of `value` (0-64 bits).
    ///
    /// Returns `value >> count`, the bits that were not written. The
    /// embedded coder relies on this to walk a bit plane.
    #[inline]
    pub fn write_bits(&mut self, value: u64, count: u32) -> Result<u64> {
        debug_assert!(count <= WORD_BITS, "Cannot write more than 64 bits at once");

        if count == 0 {
            return Ok(value);
        }

        let masked = if count == WORD_BITS {
            value
        } else {
            value & ((1u64 << count) - 1)
        };

        let staged = self.staged | (masked << self.bits);
        let total = self.bits + count;
        if total >= WORD_BITS {
            self.store_word(staged)?;
            // Bits of `masked` that did not fit in the stored word.
            self.staged = masked.checked_shr(WORD_BITS - self.bits).unwrap_or(0);
            self.bits = total - WORD_BITS;
        } else {
            self.staged = staged;
            self.bits = total;
        }

        Ok(value.checked_shr(count).unwrap_or(0))
    }

    /// Write `count` zero bits.
    ///
    /// Fails up front, without writing anything, if the bits do not fit.
    pub fn pad(&mut self, mut count: u64) -> Result<()> {
        let stored = (self.bits as u64).saturating_add(count) / WORD_BITS as u64;
        let needed_words = (self.word as u64).saturating_add(stored);
        if needed_words > self.capacity_words() as u64 {
            return Err(OxiGridError::capacity_exceeded(
                needed_words.saturating_mul(WORD_BITS as u64),
                self.capacity_bits(),
            ));
        }
        while count > 0 {
            let n = count.min(WORD_BITS as u64) as u32;
            self.write_bits(0, n)?;
            count -= n as u64;
        }
        Ok(())
    }

    /// Pad the partial word with zeros and store it.
    ///
    /// Returns the number of padding bits written.
    pub fn flush(&mut self) -> Result<u32> {
        if self.bits == 0 {
            return Ok(0);
        }
        let padding = WORD_BITS - self.bits;
        self.store_word(self.staged)?;
        self.staged = 0;
        self.bits = 0;
        Ok(padding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_basic() {
        let mut stream = BitStream::with_capacity(8);
        // 0b10110101 bit by bit, LSB first
        for bit in [true, false, true, false, true, true, false, true] {
            stream.write_bit(bit).unwrap();
        }
        assert_eq!(stream.flush().unwrap(), 56);
        assert_eq!(stream.data()[0], 0xB5);
        assert_eq!(&stream.data()[1..], &[0u8; 7]);
    }

    #[test]
    fn test_multi_bits_packing() {
        let mut stream = BitStream::with_capacity(8);
        stream.write_bits(0b101, 3).unwrap();
        stream.write_bits(0b11001, 5).unwrap();
        stream.flush().unwrap();
        // 3 bits: 101, 5 bits: 11001 -> 11001_101 = 0xCD
        assert_eq!(stream.data()[0], 0xCD);
    }

    #[test]
    fn test_roundtrip_across_words() {
        let mut stream = BitStream::with_capacity(32);
        stream.write_bits(0b101, 3).unwrap();
        stream.write_bits(u64::MAX, 64).unwrap();
        stream.write_bits(0x1234_5678_9ABC, 48).unwrap();
        stream.write_bits(0b10, 2).unwrap();
        stream.write_bits(0x8000_0000_0000_0001, 64).unwrap();
        stream.flush().unwrap();
        assert_eq!(stream.size_bytes(), 24);

        stream.rewind();
        assert_eq!(stream.read_bits(3).unwrap(), 0b101);
        assert_eq!(stream.read_bits(64).unwrap(), u64::MAX);
        assert_eq!(stream.read_bits(48).unwrap(), 0x1234_5678_9ABC);
        assert_eq!(stream.read_bits(2).unwrap(), 0b10);
        assert_eq!(stream.read_bits(64).unwrap(), 0x8000_0000_0000_0001);
    }

    #[test]
    fn test_write_returns_remaining_bits() {
        let mut stream = BitStream::with_capacity(8);
        assert_eq!(stream.write_bits(0b1101, 2).unwrap(), 0b11);
        assert_eq!(stream.write_bits(0xFF, 0).unwrap(), 0xFF);
        assert_eq!(stream.write_bits(7, 64).unwrap(), 0);
    }

    #[test]
    fn test_word_is_little_endian() {
        let mut stream = BitStream::with_capacity(8);
        stream.write_bits(0x0102_0304_0506_0708, 64).unwrap();
        assert_eq!(stream.data(), &[8, 7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_capacity_exceeded() {
        let mut stream = BitStream::with_capacity(8);
        stream.write_bits(0, 60).unwrap();
        stream.write_bits(0, 8).unwrap();
        let err = stream.flush().unwrap_err();
        assert!(matches!(
            err,
            OxiGridError::CapacityExceeded {
                needed_bits: 128,
                capacity_bits: 64
            }
        ));
        // The buffer itself was never written past its end.
        assert_eq!(stream.capacity_bytes(), 8);
    }

    #[test]
    fn test_failed_write_keeps_cursor() {
        let mut stream = BitStream::with_capacity(8);
        stream.write_bits(0, 63).unwrap();
        stream.write_bit(true).unwrap();
        stream.write_bits(0x7fff_ffff_ffff_ffff, 63).unwrap();
        assert_eq!(stream.write_position(), 127);

        let err = stream.write_bit(true).unwrap_err();
        assert!(matches!(
            err,
            OxiGridError::CapacityExceeded {
                needed_bits: 128,
                capacity_bits: 64
            }
        ));
        assert_eq!(stream.write_position(), 127);

        // Retrying fails the same way instead of corrupting the cursor.
        assert!(stream.write_bit(false).is_err());
        assert!(stream.write_bits(0b11, 2).is_err());
        assert!(stream.pad(1).is_err());
        assert_eq!(stream.write_position(), 127);

        // Writes that stay in the staging word still succeed.
        stream.rewind();
        stream.write_bits(0b101, 3).unwrap();
        stream.flush().unwrap();
        assert_eq!(stream.data()[0], 0b101);
    }

    #[test]
    fn test_pad_fails_without_writing() {
        let mut stream = BitStream::with_capacity(16);
        stream.write_bits(0xff, 8).unwrap();
        assert!(stream.pad(184).is_err());
        assert_eq!(stream.write_position(), 8);
        stream.pad(120).unwrap();
        assert_eq!(stream.write_position(), 128);
        assert_eq!(stream.data()[0], 0xff);
    }

    #[test]
    fn test_partial_word_capacity_unused() {
        let mut stream = BitStream::with_capacity(12);
        assert_eq!(stream.capacity_bits(), 64);
        stream.write_bits(0, 64).unwrap();
        stream.write_bit(true).unwrap();
        assert!(stream.flush().is_err());
    }

    #[test]
    fn test_read_past_end() {
        let mut stream = BitStream::new(vec![0u8; 8]);
        stream.read_bits(64).unwrap();
        let err = stream.read_bit().unwrap_err();
        assert!(matches!(err, OxiGridError::Decode { bit_position: 64, .. }));
    }

    #[test]
    fn test_rewind_keeps_contents() {
        let mut stream = BitStream::with_capacity(8);
        stream.write_bits(0xAB, 8).unwrap();
        stream.flush().unwrap();
        stream.rewind();
        assert_eq!(stream.size_bytes(), 0);
        assert_eq!(stream.get_ref()[0], 0xAB);
        assert_eq!(stream.read_bits(8).unwrap(), 0xAB);
    }

    #[test]
    fn test_pad_and_positions() {
        let mut stream = BitStream::with_capacity(32);
        stream.write_bit(true).unwrap();
        stream.pad(130).unwrap();
        assert_eq!(stream.write_position(), 131);
        stream.write_bit(true).unwrap();
        stream.flush().unwrap();

        stream.rewind();
        assert!(stream.read_bit().unwrap());
        stream.skip(130).unwrap();
        assert_eq!(stream.read_position(), 131);
        assert!(stream.read_bit().unwrap());
    }

    #[test]
    fn test_seek_and_align() {
        let mut stream = BitStream::with_capacity(16);
        stream.write_bits(0, 64).unwrap();
        stream.write_bits(0b1011, 4).unwrap();
        stream.flush().unwrap();

        stream.rewind();
        stream.seek(65).unwrap();
        assert_eq!(stream.read_bits(3).unwrap(), 0b101);
        stream.align();
        assert_eq!(stream.read_position(), 128);
        assert!(stream.seek(129).is_err());
    }

    #[test]
    fn test_borrowed_buffer() {
        let mut backing = [0u8; 16];
        {
            let mut stream = BitStream::new(&mut backing[..]);
            stream.write_bits(0xDEAD_BEEF, 32).unwrap();
            stream.flush().unwrap();
        }
        let mut reader = BitStream::new(&backing[..]);
        assert_eq!(reader.read_bits(32).unwrap(), 0xDEAD_BEEF);
    }
}
