//! Rate-control policies.
//!
//! A policy decides how many bits the embedded coder may spend on each block.
//! Three policies are available:
//!
//! | Policy | Parameter | Bounds |
//! |--------|-----------|--------|
//! | [`FixedPrecision`] | bit planes per block | numeric precision |
//! | [`FixedRate`] | bits per value | compressed size (exact) |
//! | [`FixedAccuracy`] | absolute tolerance | reconstruction error |
//!
//! The coder never inspects the policy directly. Each policy is reduced to a
//! [`BlockBudget`]: a minimum and maximum number of bits per block, a maximum
//! number of bit planes, and the smallest exponent worth coding. Coding a
//! block stops after any bit at which one of these limits is reached.
//!
//! # Example
//!
//! ```
//! use oxigrid_core::policy::{FixedRate, RateControlPolicy};
//! use oxigrid_core::scalar::ScalarKind;
//!
//! let rate = FixedRate::new(8.0, ScalarKind::Float64, 2, false).unwrap();
//! assert_eq!(rate.bits_per_block(), 128);
//!
//! let policy = RateControlPolicy::FixedRate(rate);
//! let budget = policy.budget();
//! assert_eq!(budget.min_bits, budget.max_bits);
//! ```

use crate::bitstream::WORD_BITS;
use crate::error::{OxiGridError, Result};
use crate::field::Shape;
use crate::scalar::ScalarKind;
use std::fmt;

/// Largest number of bit planes that can be coded for any kind.
pub const MAX_PRECISION: u32 = 64;

/// Smallest exponent (of the smallest positive subnormal `f64`).
pub const MIN_EXPONENT: i32 = -1074;

/// Upper bound on the bits any single block can occupy.
///
/// 3D `f64` block on the lossless path: nonzero flag, exponent, plane count,
/// group tests, and 64 planes of 64 coefficients.
pub const MAX_BLOCK_BITS: u32 = 1 + 11 + 6 + (64 - 1) + 64 * 64;

/// Upper bound on the optional stream header, in bits.
///
/// Magic (32), kind (2), rank (2), three 40-bit extents, mode word (32).
pub const HEADER_MAX_BITS: u64 = 32 + 2 + 2 + 3 * 40 + 32;

/// The numbers the embedded coder consults for every block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockBudget {
    /// Every block occupies at least this many bits (zero padded).
    pub min_bits: u32,
    /// Coding stops once this many bits have been spent.
    pub max_bits: u32,
    /// Coding stops after this many bit planes.
    pub max_precision: u32,
    /// Bit planes below `2^min_exponent` are not coded.
    pub min_exponent: i32,
}

impl BlockBudget {
    /// Number of bit planes to code for a floating-point block whose largest
    /// magnitude has exponent `emax`.
    ///
    /// Two guard planes per transform pass plus two are kept above
    /// `min_exponent` so that transform rounding stays below the tolerance.
    pub fn precision(&self, emax: i32, rank: usize) -> u32 {
        let planes = emax as i64 - self.min_exponent as i64 + 2 * (rank as i64 + 1);
        planes.clamp(0, self.max_precision as i64) as u32
    }
}

/// Fixed precision: code a fixed number of bit planes per block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPrecision {
    bits: u32,
}

impl FixedPrecision {
    /// Code `bits` planes per block (1 to 64).
    pub fn new(bits: u32) -> Result<Self> {
        if bits == 0 || bits > MAX_PRECISION {
            return Err(OxiGridError::configuration(format!(
                "precision must be between 1 and {MAX_PRECISION} bits, got {bits}"
            )));
        }
        Ok(Self { bits })
    }

    /// Number of bit planes per block.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Whether every bit plane of `kind` is kept.
    pub fn is_lossless(&self, kind: ScalarKind) -> bool {
        self.bits >= kind.bits()
    }
}

/// Fixed rate: every block occupies exactly the same number of bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedRate {
    bits_per_block: u32,
    kind: ScalarKind,
    rank: usize,
    word_aligned: bool,
}

impl FixedRate {
    /// Budget `bits_per_value` bits for each value of a `rank`-dimensional
    /// field of `kind`.
    ///
    /// The block budget is `round(4^rank * bits_per_value)`, raised so a
    /// floating-point block can always store its exponent. With
    /// `word_aligned` the budget is rounded up to a whole number of 64-bit
    /// words, so every block starts on a word boundary.
    pub fn new(bits_per_value: f64, kind: ScalarKind, rank: usize, word_aligned: bool) -> Result<Self> {
        if !bits_per_value.is_finite() || bits_per_value <= 0.0 {
            return Err(OxiGridError::configuration(format!(
                "rate must be a positive number of bits per value, got {bits_per_value}"
            )));
        }
        check_rank(rank)?;

        let values = block_values(rank);
        let bits = (values as f64 * bits_per_value + 0.5).floor();
        if bits > MAX_BLOCK_BITS as f64 {
            return Err(OxiGridError::configuration(format!(
                "rate of {bits_per_value} bits per value exceeds the block limit of {MAX_BLOCK_BITS} bits"
            )));
        }
        let bits = (bits as u32).max(min_block_bits(kind));
        Self::from_block_bits(bits, kind, rank, word_aligned)
    }

    /// Build a policy from an exact per-block budget.
    ///
    /// Every block gets at least one bit. A floating-point budget must also
    /// hold the nonzero flag and the block exponent.
    pub fn from_block_bits(
        bits_per_block: u32,
        kind: ScalarKind,
        rank: usize,
        word_aligned: bool,
    ) -> Result<Self> {
        check_rank(rank)?;
        let min_bits = min_block_bits(kind);
        if bits_per_block < min_bits {
            return Err(OxiGridError::configuration(format!(
                "{bits_per_block} bits per block is below the {kind} minimum of {min_bits} bits"
            )));
        }
        let bits_per_block = if word_aligned {
            bits_per_block.next_multiple_of(WORD_BITS)
        } else {
            bits_per_block
        };
        if bits_per_block > MAX_BLOCK_BITS.next_multiple_of(WORD_BITS) {
            return Err(OxiGridError::configuration(format!(
                "{bits_per_block} bits per block exceeds the block limit"
            )));
        }
        Ok(Self {
            bits_per_block,
            kind,
            rank,
            word_aligned,
        })
    }

    /// Bits spent on every block.
    pub fn bits_per_block(&self) -> u32 {
        self.bits_per_block
    }

    /// Achieved rate in bits per value.
    pub fn rate(&self) -> f64 {
        self.bits_per_block as f64 / block_values(self.rank) as f64
    }

    /// Element kind the rate was computed for.
    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    /// Rank the rate was computed for.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Whether blocks start on word boundaries.
    pub fn word_aligned(&self) -> bool {
        self.word_aligned
    }
}

/// Fixed accuracy: bound the absolute reconstruction error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedAccuracy {
    tolerance: f64,
    min_exponent: i32,
}

impl FixedAccuracy {
    /// Keep the absolute error within `tolerance`.
    ///
    /// The effective tolerance is `tolerance` rounded down to a power of two.
    pub fn new(tolerance: f64) -> Result<Self> {
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(OxiGridError::configuration(format!(
                "tolerance must be positive and finite, got {tolerance}"
            )));
        }
        Ok(Self {
            tolerance,
            min_exponent: floor_log2(tolerance).max(MIN_EXPONENT),
        })
    }

    /// Build a policy directly from the smallest coded exponent.
    pub fn from_min_exponent(min_exponent: i32) -> Result<Self> {
        if min_exponent < MIN_EXPONENT || min_exponent > f64::MAX_EXP - 1 {
            return Err(OxiGridError::configuration(format!(
                "minimum exponent {min_exponent} out of range"
            )));
        }
        Ok(Self {
            tolerance: pow2(min_exponent),
            min_exponent,
        })
    }

    /// Tolerance as requested.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Tolerance actually enforced, `2^min_exponent`.
    pub fn effective_tolerance(&self) -> f64 {
        pow2(self.min_exponent)
    }

    /// Exponent of the smallest coded bit plane.
    pub fn min_exponent(&self) -> i32 {
        self.min_exponent
    }
}

/// Which policy is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// [`FixedPrecision`].
    FixedPrecision,
    /// [`FixedRate`].
    FixedRate,
    /// [`FixedAccuracy`].
    FixedAccuracy,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::FixedPrecision => "fixed-precision",
            Mode::FixedRate => "fixed-rate",
            Mode::FixedAccuracy => "fixed-accuracy",
        })
    }
}

/// The active rate-control policy of a stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateControlPolicy {
    /// Fixed number of bit planes.
    FixedPrecision(FixedPrecision),
    /// Fixed number of bits per block.
    FixedRate(FixedRate),
    /// Fixed absolute error bound.
    FixedAccuracy(FixedAccuracy),
}

impl RateControlPolicy {
    /// Shorthand for a validated [`FixedPrecision`] policy.
    pub fn precision(bits: u32) -> Result<Self> {
        FixedPrecision::new(bits).map(Self::FixedPrecision)
    }

    /// Shorthand for a validated [`FixedRate`] policy.
    pub fn rate(bits_per_value: f64, kind: ScalarKind, rank: usize, word_aligned: bool) -> Result<Self> {
        FixedRate::new(bits_per_value, kind, rank, word_aligned).map(Self::FixedRate)
    }

    /// Shorthand for a validated [`FixedAccuracy`] policy.
    pub fn accuracy(tolerance: f64) -> Result<Self> {
        FixedAccuracy::new(tolerance).map(Self::FixedAccuracy)
    }

    /// The active mode.
    pub fn mode(&self) -> Mode {
        match self {
            Self::FixedPrecision(_) => Mode::FixedPrecision,
            Self::FixedRate(_) => Mode::FixedRate,
            Self::FixedAccuracy(_) => Mode::FixedAccuracy,
        }
    }

    /// Reduce the policy to per-block limits.
    pub fn budget(&self) -> BlockBudget {
        match self {
            Self::FixedPrecision(p) => BlockBudget {
                min_bits: 0,
                max_bits: MAX_BLOCK_BITS,
                max_precision: p.bits,
                min_exponent: MIN_EXPONENT,
            },
            Self::FixedRate(r) => BlockBudget {
                min_bits: r.bits_per_block,
                max_bits: r.bits_per_block,
                max_precision: MAX_PRECISION,
                min_exponent: MIN_EXPONENT,
            },
            Self::FixedAccuracy(a) => BlockBudget {
                min_bits: 0,
                max_bits: MAX_BLOCK_BITS,
                max_precision: MAX_PRECISION,
                min_exponent: a.min_exponent,
            },
        }
    }

    /// Whether blocks of `kind` take the exactly reversible path.
    pub fn is_lossless(&self, kind: ScalarKind) -> bool {
        matches!(self, Self::FixedPrecision(p) if p.is_lossless(kind))
    }

    /// Check that a field of `kind` and `rank` can be coded under this policy.
    pub fn validate(&self, kind: ScalarKind, rank: usize) -> Result<()> {
        check_rank(rank)?;
        match self {
            Self::FixedPrecision(_) => Ok(()),
            Self::FixedRate(r) => {
                if r.kind != kind {
                    return Err(OxiGridError::type_mismatch(r.kind, kind));
                }
                if r.rank != rank {
                    return Err(OxiGridError::configuration(format!(
                        "rate was configured for rank {}, field has rank {rank}",
                        r.rank
                    )));
                }
                Ok(())
            }
            Self::FixedAccuracy(_) => {
                if !kind.is_float() {
                    return Err(OxiGridError::configuration(format!(
                        "fixed accuracy requires floating-point data, field holds {kind}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Worst-case bits for one block of `kind` in a `rank`-dimensional field.
    pub fn maximum_block_bits(&self, kind: ScalarKind, rank: usize) -> u32 {
        let budget = self.budget();
        let values = block_values(rank);
        let precision = budget.max_precision.min(kind.bits());

        let mut bits = 1 + kind.exponent_bits();
        if self.is_lossless(kind) {
            bits += kind.precision_bits();
        }
        bits += values - 1 + values * precision;
        bits.min(budget.max_bits).max(budget.min_bits)
    }

    /// Worst-case compressed size in bytes of a field, header included,
    /// rounded up to whole words.
    ///
    /// No input under this policy produces more output.
    pub fn maximum_compressed_size(&self, kind: ScalarKind, shape: &Shape) -> Result<usize> {
        self.validate(kind, shape.rank())?;
        let block_bits = self.maximum_block_bits(kind, shape.rank()) as u64;
        let total = (shape.block_count() as u64)
            .checked_mul(block_bits)
            .and_then(|bits| bits.checked_add(HEADER_MAX_BITS))
            .ok_or_else(|| OxiGridError::configuration("maximum size overflows u64"))?;
        let bytes = total.div_ceil(WORD_BITS as u64) * (WORD_BITS as u64 / 8);
        usize::try_from(bytes).map_err(|_| OxiGridError::configuration("maximum size overflows usize"))
    }
}

impl fmt::Display for RateControlPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FixedPrecision(p) => write!(f, "fixed precision ({} bit planes)", p.bits),
            Self::FixedRate(r) => write!(
                f,
                "fixed rate ({} bits/value, {} bits/block{})",
                r.rate(),
                r.bits_per_block,
                if r.word_aligned { ", word aligned" } else { "" }
            ),
            Self::FixedAccuracy(a) => write!(
                f,
                "fixed accuracy (tolerance {:e}, effective 2^{})",
                a.tolerance, a.min_exponent
            ),
        }
    }
}

fn check_rank(rank: usize) -> Result<()> {
    if !(1..=3).contains(&rank) {
        return Err(OxiGridError::configuration(format!(
            "rank must be 1, 2 or 3, got {rank}"
        )));
    }
    Ok(())
}

/// Smallest fixed-rate block budget for `kind`.
fn min_block_bits(kind: ScalarKind) -> u32 {
    if kind.is_float() {
        1 + kind.exponent_bits()
    } else {
        1
    }
}

fn block_values(rank: usize) -> u32 {
    1 << (2 * rank)
}

/// `floor(log2(x))` for finite positive `x`.
fn floor_log2(x: f64) -> i32 {
    let bits = x.to_bits();
    let exp = ((bits >> 52) & 0x7ff) as i32;
    if exp == 0 {
        let mantissa = bits & ((1u64 << 52) - 1);
        -1075 + (64 - mantissa.leading_zeros()) as i32
    } else {
        exp - 1023
    }
}

/// `2^e` for `MIN_EXPONENT <= e <= 1023`.
fn pow2(e: i32) -> f64 {
    if e >= -1022 {
        f64::from_bits(((e + 1023) as u64) << 52)
    } else {
        f64::from_bits(1u64 << (e - MIN_EXPONENT))
    }
}
