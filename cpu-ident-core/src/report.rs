//! Human-readable and machine-readable rendering of a segmentation.

use serde::Serialize;

use crate::reconcile::Run;

/// `serde`-serializable view of one segmentation run, for the CLI's
/// `--json` output mode. Not part of the core's statistical semantics —
/// purely a rendering convenience — but kept here so the CLI crate does not
/// need to know about `Run`'s internal layout.
#[derive(Debug, Serialize)]
pub struct RunRecord {
    pub offset: usize,
    pub hex_offset: String,
    pub label: Option<String>,
    pub size: usize,
    pub hex_size: String,
    pub entropy: f64,
    pub high_entropy: bool,
}

impl From<&Run> for RunRecord {
    fn from(run: &Run) -> Self {
        RunRecord {
            offset: run.offset,
            hex_offset: format!("{:#x}", run.offset),
            label: run.label.clone(),
            size: run.len,
            hex_size: format!("{:#x}", run.len),
            entropy: round6(run.entropy),
            high_entropy: run.high_entropy,
        }
    }
}

/// Render one run in the line format:
/// `OFFSET  HEX_OFFSET  LABEL (size=HEX_SIZE, entropy=E)`
pub fn format_run_line(run: &Run) -> String {
    let label = run.label.as_deref().unwrap_or("None");
    format!(
        "{}  {:#x}  {} (size={:#x}, entropy={:.6})",
        run.offset, run.offset, label, run.len, round6(run.entropy)
    )
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}
