//! Command implementations for OxiGrid CLI.

pub mod compress;
pub mod decompress;
pub mod info;
pub mod roundtrip;

pub use compress::cmd_compress;
pub use decompress::cmd_decompress;
pub use info::cmd_info;
pub use roundtrip::cmd_roundtrip;

use crate::{ElementType, ModeArgs};
use clap::Args;
use oxigrid_core::{OxiGridError, RateControlPolicy, ScalarKind, Shape};

/// Array layout and rate-control options shared by `compress` and `roundtrip`.
#[derive(Debug, Clone, Args)]
pub struct CodecArgs {
    /// Element type of the raw input
    #[arg(short = 't', long = "type", value_enum)]
    pub element: ElementType,

    /// Grid extents, x first (1 to 3 values)
    #[arg(short, long, num_args = 1..=3, required = true)]
    pub dims: Vec<usize>,

    #[command(flatten)]
    pub mode: ModeArgs,

    /// Pad every fixed-rate block to a whole number of 64-bit words
    #[arg(long, requires = "rate")]
    pub aligned: bool,
}

impl CodecArgs {
    pub fn kind(&self) -> ScalarKind {
        self.element.into()
    }

    pub fn shape(&self) -> Result<Shape, OxiGridError> {
        Shape::new(&self.dims)
    }

    /// Build the validated policy selected on the command line.
    pub fn policy(&self) -> Result<RateControlPolicy, OxiGridError> {
        let ModeArgs {
            precision,
            rate,
            accuracy,
        } = self.mode;
        match (precision, rate, accuracy) {
            (Some(bits), None, None) => RateControlPolicy::precision(bits),
            (None, Some(rate), None) => {
                RateControlPolicy::rate(rate, self.kind(), self.dims.len(), self.aligned)
            }
            (None, None, Some(tolerance)) => RateControlPolicy::accuracy(tolerance),
            _ => Err(OxiGridError::configuration(
                "exactly one of --precision, --rate or --accuracy is required",
            )),
        }
    }
}
