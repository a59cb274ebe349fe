//! Optional self-describing stream header.
//!
//! The block stream itself carries no metadata: the decoder must be told the
//! element kind, the extents and the policy. Callers that want a single
//! self-contained buffer can prefix it with this header.
//!
//! # Layout
//!
//! All fields are written LSB first through the [`BitStream`]:
//!
//! ```text
//! ┌───────────────┬──────┬──────────┬──────────────────────┬───────────┐
//! │ magic+version │ kind │ rank - 1 │ extent - 1 (per axis)│ mode word │
//! │    32 bits    │  2   │    2     │   40 bits x rank     │  32 bits  │
//! └───────────────┴──────┴──────────┴──────────────────────┴───────────┘
//! ```
//!
//! The mode word holds a 2-bit mode tag followed by its parameters:
//!
//! | Tag | Mode            | Payload                                    |
//! |-----|-----------------|--------------------------------------------|
//! | 0   | fixed precision | bit planes - 1 (6 bits)                    |
//! | 1   | fixed rate      | bits per block (13 bits), word aligned (1) |
//! | 2   | fixed accuracy  | min exponent + 1074 (12 bits)              |

use oxigrid_core::{
    BitStream, FixedAccuracy, FixedPrecision, FixedRate, MIN_EXPONENT, OxiGridError,
    RateControlPolicy, Result, ScalarKind, Shape,
};

/// Magic bytes identifying an OxiGrid stream.
pub const MAGIC: [u8; 3] = *b"oxg";

/// Header format version.
pub const VERSION: u8 = 1;

const EXTENT_BITS: u32 = 40;
const MODE_TAG_BITS: u32 = 2;
const MODE_WORD_BITS: u32 = 32;

const TAG_PRECISION: u64 = 0;
const TAG_RATE: u64 = 1;
const TAG_ACCURACY: u64 = 2;

/// Everything needed to decode a stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Header {
    /// Element kind.
    pub kind: ScalarKind,
    /// Rank and extents.
    pub shape: Shape,
    /// Policy the blocks were coded with.
    pub policy: RateControlPolicy,
}

impl Header {
    /// Size of this header in bits.
    pub fn size_bits(&self) -> u64 {
        (32 + 2 + 2 + EXTENT_BITS as usize * self.shape.rank() + MODE_WORD_BITS as usize) as u64
    }

    /// Fewest bits the block stream after this header can occupy.
    ///
    /// Every block costs at least one bit, and exactly its budget under
    /// fixed rate. Lets a reader reject a header whose extents cannot
    /// possibly match the data that follows.
    pub fn minimum_stream_bits(&self) -> u64 {
        let block_bits = match self.policy {
            RateControlPolicy::FixedRate(r) => r.bits_per_block() as u64,
            _ => 1,
        };
        (self.shape.block_count() as u64).saturating_mul(block_bits)
    }
}

fn magic_word() -> u64 {
    u32::from_le_bytes([MAGIC[0], MAGIC[1], MAGIC[2], VERSION]) as u64
}

fn mode_word(policy: &RateControlPolicy) -> u64 {
    let (tag, payload) = match policy {
        RateControlPolicy::FixedPrecision(p) => (TAG_PRECISION, (p.bits() - 1) as u64),
        RateControlPolicy::FixedRate(r) => (
            TAG_RATE,
            r.bits_per_block() as u64 | ((r.word_aligned() as u64) << 13),
        ),
        RateControlPolicy::FixedAccuracy(a) => {
            (TAG_ACCURACY, (a.min_exponent() - MIN_EXPONENT) as u64)
        }
    };
    tag | (payload << MODE_TAG_BITS)
}

/// Write a header describing a field of `kind` and `shape` coded with
/// `policy`. Returns the number of bits written.
pub fn write_header<B: AsRef<[u8]> + AsMut<[u8]>>(
    stream: &mut BitStream<B>,
    kind: ScalarKind,
    shape: &Shape,
    policy: &RateControlPolicy,
) -> Result<u64> {
    policy.validate(kind, shape.rank())?;
    if let Some(&n) = shape.extents().iter().find(|&&n| n as u64 > 1 << EXTENT_BITS) {
        return Err(OxiGridError::configuration(format!(
            "extent {n} does not fit in the stream header"
        )));
    }

    let start = stream.write_position();
    stream.write_bits(magic_word(), 32)?;
    stream.write_bits(kind.tag() as u64, 2)?;
    stream.write_bits(shape.rank() as u64 - 1, 2)?;
    for &n in shape.extents() {
        stream.write_bits(n as u64 - 1, EXTENT_BITS)?;
    }
    stream.write_bits(mode_word(policy), MODE_WORD_BITS)?;
    Ok(stream.write_position() - start)
}

/// Read and validate a header.
pub fn read_header<B: AsRef<[u8]>>(stream: &mut BitStream<B>) -> Result<Header> {
    let start = stream.read_position();
    if stream.read_bits(32)? != magic_word() {
        return Err(OxiGridError::decode(start, "not an OxiGrid stream (bad magic or version)"));
    }

    let kind = ScalarKind::from_tag(stream.read_bits(2)? as u8)
        .ok_or_else(|| OxiGridError::decode(start + 32, "invalid element kind"))?;
    let rank = stream.read_bits(2)? as usize + 1;
    if rank > 3 {
        return Err(OxiGridError::decode(start + 34, "invalid rank"));
    }
    let mut extents = [1usize; 3];
    for extent in extents.iter_mut().take(rank) {
        let n = stream.read_bits(EXTENT_BITS)? + 1;
        *extent = usize::try_from(n)
            .map_err(|_| OxiGridError::decode(stream.read_position(), "extent overflows usize"))?;
    }
    let shape = Shape::new(&extents[..rank])
        .map_err(|e| OxiGridError::decode(stream.read_position(), e.to_string()))?;

    let mode_position = stream.read_position();
    let word = stream.read_bits(MODE_WORD_BITS)?;
    let payload = word >> MODE_TAG_BITS;
    let policy = match word & ((1 << MODE_TAG_BITS) - 1) {
        TAG_PRECISION => FixedPrecision::new((payload & 0x3f) as u32 + 1)
            .map(RateControlPolicy::FixedPrecision),
        TAG_RATE => FixedRate::from_block_bits(
            (payload & 0x1fff) as u32,
            kind,
            rank,
            (payload >> 13) & 1 == 1,
        )
        .map(RateControlPolicy::FixedRate),
        TAG_ACCURACY => FixedAccuracy::from_min_exponent((payload & 0xfff) as i32 + MIN_EXPONENT)
            .map(RateControlPolicy::FixedAccuracy),
        _ => Err(OxiGridError::decode(mode_position, "invalid mode tag")),
    }
    .map_err(|e| match e {
        OxiGridError::Decode { .. } => e,
        other => OxiGridError::decode(mode_position, other.to_string()),
    })?;

    policy
        .validate(kind, rank)
        .map_err(|e| OxiGridError::decode(mode_position, e.to_string()))?;

    log::trace!("read header: {kind} {:?} {policy}", shape.extents());
    Ok(Header { kind, shape, policy })
}
