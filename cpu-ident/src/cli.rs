use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "cpu-ident",
    version,
    about = r#"
cpu-ident identifies the CPU instruction set architecture of a raw binary
blob by statistical similarity against a trained corpus, and locates the
regions of a file that carry code for a known architecture.

EXAMPLES:
    # Classify a whole file as a single architecture:
    cpu-ident whole --corpus ./corpus firmware.bin

    # Scan a file and print a labeled segmentation:
    cpu-ident scan --corpus ./corpus firmware.bin
"#
)]
pub struct Opt {
    #[command(subcommand)]
    pub action: Action,
}

#[derive(Debug, Subcommand)]
pub enum Action {
    /// Slide a window across each file and print a labeled segmentation.
    Scan(ScanArgs),

    /// Classify each file as a single blob and print one label per file.
    Whole(WholeArgs),
}

#[derive(Debug, Args)]
pub struct CorpusArgs {
    /// Path to a directory of `<Label>.corpus` (or `.corpus.xz`) entries.
    #[arg(short, long)]
    pub corpus: PathBuf,
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    #[command(flatten)]
    pub corpus_args: CorpusArgs,

    /// Window size in bytes, accepts `0x`-prefixed hex.
    #[arg(short, long, value_parser = parse_int, default_value = "0x1000")]
    pub window: usize,

    /// Step between windows in bytes; defaults to the window size
    /// (non-overlapping windows, per the engine's calibration).
    #[arg(short, long, value_parser = parse_int)]
    pub step: Option<usize>,

    /// Emit one JSON record per run instead of the human-readable line
    /// format.
    #[arg(long)]
    pub json: bool,

    /// Files to scan.
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct WholeArgs {
    #[command(flatten)]
    pub corpus_args: CorpusArgs,

    /// Emit one JSON record per file instead of `LABEL` / `None`.
    #[arg(long)]
    pub json: bool,

    /// Files to classify.
    pub files: Vec<PathBuf>,
}

fn parse_int(s: &str) -> Result<usize, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        usize::from_str_radix(hex, 16).map_err(|e| e.to_string())
    } else {
        s.parse::<usize>().map_err(|e| e.to_string())
    }
}
