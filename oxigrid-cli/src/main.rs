//! OxiGrid CLI - compression for gridded numeric arrays
//!
//! Compresses raw little-endian arrays of i32, i64, f32 or f64 values laid out
//! as 1D, 2D or 3D grids (x varying fastest).

mod commands;
mod utils;

use clap::{Args, Parser, Subcommand, ValueEnum};
use commands::{CodecArgs, cmd_compress, cmd_decompress, cmd_info, cmd_roundtrip};
use oxigrid_core::ScalarKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "oxigrid")]
#[command(
    author,
    version,
    about = "OxiGrid - Pure Rust compression for gridded numeric arrays"
)]
#[command(long_about = "
OxiGrid compresses 1D, 2D and 3D arrays of i32, i64, f32 and f64 values
under one of three rate-control modes: fixed precision, fixed rate or
fixed accuracy. Input and output arrays are raw little-endian values with
x varying fastest.

Examples:
  oxigrid compress field.raw field.oxg --type f64 --dims 256 256 --accuracy 1e-6
  oxigrid compress field.raw field.oxg --type f32 --dims 64 64 64 --rate 8 --aligned
  oxigrid compress ids.raw ids.oxg --type i32 --dims 1000000 --precision 32
  oxigrid decompress field.oxg field.out
  oxigrid info field.oxg --json
  oxigrid roundtrip field.raw --type f64 --dims 256 256 --precision 24
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a raw array into a self-describing stream
    #[command(alias = "c")]
    Compress {
        /// Raw little-endian input array
        input: PathBuf,

        /// Compressed output file
        output: PathBuf,

        #[command(flatten)]
        codec: CodecArgs,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Decompress a stream back into a raw array
    #[command(alias = "d")]
    Decompress {
        /// Compressed input file
        input: PathBuf,

        /// Raw little-endian output array
        output: PathBuf,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show the header of a compressed stream
    #[command(alias = "i")]
    Info {
        /// Compressed input file
        input: PathBuf,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,
    },

    /// Compress and decompress in memory and report the error
    #[command(alias = "r")]
    Roundtrip {
        /// Raw little-endian input array
        input: PathBuf,

        #[command(flatten)]
        codec: CodecArgs,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,
    },
}

/// Element type of a raw array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ElementType {
    /// 32-bit signed integers
    #[value(name = "i32")]
    I32,
    /// 64-bit signed integers
    #[value(name = "i64")]
    I64,
    /// Single-precision floats
    #[value(name = "f32")]
    F32,
    /// Double-precision floats
    #[value(name = "f64")]
    F64,
}

impl From<ElementType> for ScalarKind {
    fn from(ty: ElementType) -> Self {
        match ty {
            ElementType::I32 => ScalarKind::Int32,
            ElementType::I64 => ScalarKind::Int64,
            ElementType::F32 => ScalarKind::Float32,
            ElementType::F64 => ScalarKind::Float64,
        }
    }
}

/// Rate-control mode. Exactly one must be given.
#[derive(Debug, Clone, Copy, Args)]
#[group(required = true, multiple = false)]
pub struct ModeArgs {
    /// Fixed precision: number of bit planes to keep (1-64)
    #[arg(short, long)]
    pub precision: Option<u32>,

    /// Fixed rate: bits per value
    #[arg(short, long)]
    pub rate: Option<f64>,

    /// Fixed accuracy: absolute error tolerance (floating-point types only)
    #[arg(short, long)]
    pub accuracy: Option<f64>,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compress {
            input,
            output,
            codec,
            verbose,
        } => cmd_compress(&input, &output, &codec, verbose),
        Commands::Decompress {
            input,
            output,
            verbose,
        } => cmd_decompress(&input, &output, verbose),
        Commands::Info { input, json } => cmd_info(&input, json),
        Commands::Roundtrip { input, codec, json } => cmd_roundtrip(&input, &codec, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_compress() {
        let cli = Cli::try_parse_from([
            "oxigrid", "compress", "in.raw", "out.oxg", "--type", "f32", "--dims", "8", "4",
            "--rate", "6", "--aligned",
        ])
        .unwrap();
        match cli.command {
            Commands::Compress { codec, .. } => {
                assert_eq!(codec.element, ElementType::F32);
                assert_eq!(codec.dims, vec![8, 4]);
                assert_eq!(codec.mode.rate, Some(6.0));
                assert!(codec.aligned);
            }
            _ => panic!("expected compress"),
        }
    }

    #[test]
    fn test_modes_are_exclusive() {
        let result = Cli::try_parse_from([
            "oxigrid", "roundtrip", "in.raw", "--type", "f64", "--dims", "16",
            "--precision", "8", "--accuracy", "0.1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_mode_is_required() {
        let result =
            Cli::try_parse_from(["oxigrid", "roundtrip", "in.raw", "--type", "f64", "--dims", "16"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_aligned_requires_rate() {
        let result = Cli::try_parse_from([
            "oxigrid", "compress", "in.raw", "out.oxg", "--type", "i64", "--dims", "16",
            "--precision", "8", "--aligned",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_too_many_dims() {
        let result = Cli::try_parse_from([
            "oxigrid", "roundtrip", "in.raw", "--type", "f64", "--dims", "2", "2", "2", "2",
            "--precision", "8",
        ]);
        assert!(result.is_err());
    }
}
