//! Element types as seen by the block coder.
//!
//! Every element kind is coded through a signed integer block of the same
//! width. Integer kinds are used as-is. Floating-point blocks are converted
//! to block-floating-point: one common exponent (the exponent of the largest
//! magnitude in the block) and a fixed-point integer mantissa per value,
//! leaving two bits of headroom for the transform.

use oxigrid_core::Element;
use std::fmt;

/// Signed integer coefficient type (`i32` or `i64`).
///
/// All arithmetic wraps: the transform must never panic on hostile input.
pub trait BlockInt: Copy + Default + Eq + fmt::Debug + Send + Sync + 'static {
    /// Width in bits.
    const BITS: u32;

    /// Wrapping addition.
    fn add(self, rhs: Self) -> Self;

    /// Wrapping subtraction.
    fn sub(self, rhs: Self) -> Self;

    /// Arithmetic shift right by one.
    fn half(self) -> Self;

    /// Wrapping shift left by one.
    fn twice(self) -> Self;

    /// Map to negabinary, zero-extended to 64 bits.
    fn to_negabinary(self) -> u64;

    /// Inverse of [`to_negabinary`](Self::to_negabinary).
    fn from_negabinary(value: u64) -> Self;
}

macro_rules! impl_block_int {
    ($int:ty, $uint:ty, $mask:expr) => {
        impl BlockInt for $int {
            const BITS: u32 = <$int>::BITS;

            #[inline(always)]
            fn add(self, rhs: Self) -> Self {
                self.wrapping_add(rhs)
            }

            #[inline(always)]
            fn sub(self, rhs: Self) -> Self {
                self.wrapping_sub(rhs)
            }

            #[inline(always)]
            fn half(self) -> Self {
                self >> 1
            }

            #[inline(always)]
            fn twice(self) -> Self {
                self.wrapping_shl(1)
            }

            #[inline(always)]
            fn to_negabinary(self) -> u64 {
                ((self as $uint).wrapping_add($mask) ^ $mask) as u64
            }

            #[inline(always)]
            fn from_negabinary(value: u64) -> Self {
                ((value as $uint ^ $mask).wrapping_sub($mask)) as $int
            }
        }
    };
}

impl_block_int!(i32, u32, 0xaaaa_aaaa_u32);
impl_block_int!(i64, u64, 0xaaaa_aaaa_aaaa_aaaa_u64);

/// An element type the block coder can compress.
pub trait BlockValue: Element {
    /// Integer type the block is coded as.
    type Int: BlockInt;

    /// Common exponent of a block. Integer kinds return 0.
    fn block_exponent(block: &[Self]) -> i32;

    /// Convert a block to integers relative to the common exponent `emax`.
    fn quantize(block: &[Self], emax: i32, out: &mut [Self::Int]);

    /// Convert integers back to values relative to `emax`.
    fn dequantize(ints: &[Self::Int], emax: i32, out: &mut [Self]);
}

macro_rules! impl_int_value {
    ($ty:ty) => {
        impl BlockValue for $ty {
            type Int = $ty;

            fn block_exponent(_block: &[Self]) -> i32 {
                0
            }

            fn quantize(block: &[Self], _emax: i32, out: &mut [Self::Int]) {
                out.copy_from_slice(block);
            }

            fn dequantize(ints: &[Self::Int], _emax: i32, out: &mut [Self]) {
                out.copy_from_slice(ints);
            }
        }
    };
}

impl_int_value!(i32);
impl_int_value!(i64);

impl BlockValue for f32 {
    type Int = i32;

    fn block_exponent(block: &[Self]) -> i32 {
        let max = block.iter().fold(0.0f64, |max, &x| {
            let f = (x as f64).abs();
            if max < f { f } else { max }
        });
        exponent(max, 127)
    }

    fn quantize(block: &[Self], emax: i32, out: &mut [Self::Int]) {
        let shift = (i32::BITS as i32 - 2) - emax;
        for (o, &x) in out.iter_mut().zip(block) {
            *o = ldexp(x as f64, shift) as i32;
        }
    }

    fn dequantize(ints: &[Self::Int], emax: i32, out: &mut [Self]) {
        let shift = emax - (i32::BITS as i32 - 2);
        for (o, &i) in out.iter_mut().zip(ints) {
            // Round to single precision first, as a native f32 product would.
            *o = ldexp(i as f32 as f64, shift) as f32;
        }
    }
}

impl BlockValue for f64 {
    type Int = i64;

    fn block_exponent(block: &[Self]) -> i32 {
        let max = block.iter().fold(0.0f64, |max, &x| {
            let f = x.abs();
            if max < f { f } else { max }
        });
        exponent(max, 1023)
    }

    fn quantize(block: &[Self], emax: i32, out: &mut [Self::Int]) {
        let shift = (i64::BITS as i32 - 2) - emax;
        for (o, &x) in out.iter_mut().zip(block) {
            *o = ldexp(x, shift) as i64;
        }
    }

    fn dequantize(ints: &[Self::Int], emax: i32, out: &mut [Self]) {
        let shift = emax - (i64::BITS as i32 - 2);
        for (o, &i) in out.iter_mut().zip(ints) {
            *o = ldexp(i as f64, shift);
        }
    }
}

/// Exponent of a non-negative magnitude, clamped to the kind's range.
///
/// Zero maps to `-bias`, which the block coder stores as a biased exponent
/// of 0 ("all-zero block").
fn exponent(max: f64, bias: i32) -> i32 {
    if max > 0.0 {
        frexp_exponent(max).clamp(1 - bias, bias + 1)
    } else {
        -bias
    }
}

/// The `e` in `x = m * 2^e` with `0.5 <= m < 1`, for finite positive `x`.
///
/// Infinity reports one past the largest finite exponent.
pub(crate) fn frexp_exponent(x: f64) -> i32 {
    let bits = x.to_bits();
    let exp = ((bits >> 52) & 0x7ff) as i32;
    if exp == 0 {
        // Subnormal: normalize the mantissa.
        let mantissa = bits & ((1u64 << 52) - 1);
        -1074 + (64 - mantissa.leading_zeros()) as i32
    } else {
        exp - 1022
    }
}

/// `x * 2^e` without intermediate overflow or double rounding.
pub(crate) fn ldexp(x: f64, mut e: i32) -> f64 {
    const P1023: f64 = f64::from_bits(0x7fe0_0000_0000_0000); // 2^1023
    const PM969: f64 = f64::from_bits(0x0360_0000_0000_0000); // 2^-969

    let mut y = x;
    if e > 1023 {
        y *= P1023;
        e -= 1023;
        if e > 1023 {
            y *= P1023;
            e -= 1023;
            e = e.min(1023);
        }
    } else if e < -1022 {
        // Keep the final scale below 2^-53 so rounding happens once.
        y *= PM969;
        e += 969;
        if e < -1022 {
            y *= PM969;
            e += 969;
            e = e.max(-1022);
        }
    }
    y * f64::from_bits(((0x3ff + e) as u64) << 52)
}
