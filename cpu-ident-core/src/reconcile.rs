//! Turns an ordered list of window classifications into a gapless,
//! non-overlapping segmentation.

use crate::classifier::Verdict;
use crate::window::{normalized_entropy, WindowResult, DEFAULT_WINDOW};

/// A run is flagged high-entropy at or above this normalized value;
/// downstream consumers may discount it as likely encrypted or compressed.
pub const HIGH_ENTROPY_THRESHOLD: f64 = 0.9;

/// One maximal contiguous stretch sharing a label in the final
/// segmentation. `label` is `None` for the literal `None` verdict.
#[derive(Debug, Clone)]
pub struct Run {
    pub offset: usize,
    pub len: usize,
    pub label: Option<String>,
    pub entropy: f64,
    pub high_entropy: bool,
}

/// Resolves overlaps, coalesces windows into runs, and absorbs short noise
/// runs. The reconciler is total: given any window results covering
/// `[0, total_len)`, it always returns a complete gapless segmentation.
#[derive(Debug, Clone, Copy)]
pub struct Reconciler {
    noise_threshold: usize,
}

impl Default for Reconciler {
    /// Matches the default window size; exposed as a tunable since the
    /// right absorption radius depends on how noisy the corpus is.
    fn default() -> Self {
        Reconciler {
            noise_threshold: DEFAULT_WINDOW,
        }
    }
}

impl Reconciler {
    pub fn new(noise_threshold: usize) -> Self {
        Reconciler { noise_threshold }
    }

    pub fn reconcile(&self, windows: &[WindowResult], data: &[u8]) -> Vec<Run> {
        if windows.is_empty() {
            return Vec::new();
        }

        let intervals = disjoint_intervals(windows);
        let mut runs = coalesce(&intervals, data);
        loop {
            let absorbed = self.absorb_pass(&mut runs, data);
            if !absorbed {
                break;
            }
        }
        runs
    }

    /// One pass of noise absorption. Returns whether anything changed, so
    /// the caller can iterate to a fixed point — absorbing a run can create
    /// a new pair of equal-label neighbors that itself becomes absorbable.
    fn absorb_pass(&self, runs: &mut Vec<Run>, data: &[u8]) -> bool {
        let mut i = 1;
        while i + 1 < runs.len() {
            let (left, mid, right) = (&runs[i - 1], &runs[i], &runs[i + 1]);
            let same_flanks = left.label == right.label;
            let mid_is_none = mid.label.is_none();
            let mid_short = mid.len <= self.noise_threshold;
            let flanks_long_enough = left.len >= self.noise_threshold && right.len >= self.noise_threshold;

            let absorbable = same_flanks
                && mid_short
                && left.label != mid.label
                && (flanks_long_enough || mid_is_none);

            if absorbable {
                let offset = left.offset;
                let len = left.len + mid.len + right.len;
                let label = left.label.clone();
                let slice = &data[offset..offset + len];
                let entropy = normalized_entropy(slice);
                let merged = Run {
                    offset,
                    len,
                    label,
                    entropy,
                    high_entropy: entropy >= HIGH_ENTROPY_THRESHOLD,
                };
                runs.splice(i - 1..i + 2, [merged]);
                return true;
            }
            i += 1;
        }
        false
    }
}

/// Clip overlapping windows into disjoint half-open intervals. The overlap
/// region is assigned to whichever window has a confident verdict; ties (or
/// neither confident) favor the earlier window.
fn disjoint_intervals(windows: &[WindowResult]) -> Vec<(usize, usize, Verdict, f64)> {
    let mut result: Vec<(usize, usize, Verdict, f64)> = Vec::with_capacity(windows.len());
    for w in windows {
        let mut start = w.offset;
        let end = w.offset + w.len;
        if let Some(last) = result.last_mut() {
            if start < last.1 {
                let earlier_confident = last.2.confident;
                let later_confident = w.verdict.confident;
                if later_confident && !earlier_confident {
                    last.1 = start;
                } else {
                    start = last.1;
                }
            }
        }
        if start < end {
            result.push((start, end, w.verdict.clone(), w.entropy));
        }
    }
    result
}

fn coalesce(intervals: &[(usize, usize, Verdict, f64)], data: &[u8]) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for (start, end, verdict, entropy) in intervals {
        let label = verdict.label.clone();
        if let Some(last) = runs.last_mut() {
            if last.label == label && last.offset + last.len == *start {
                last.len = end - last.offset;
                continue;
            }
        }
        runs.push(Run {
            offset: *start,
            len: end - start,
            label,
            entropy: *entropy,
            high_entropy: *entropy >= HIGH_ENTROPY_THRESHOLD,
        });
    }
    // Coalescing may have merged windows whose individually-recorded
    // entropy no longer represents the run; recompute over the final span.
    for run in &mut runs {
        let slice = &data[run.offset..run.offset + run.len];
        run.entropy = normalized_entropy(slice);
        run.high_entropy = run.entropy >= HIGH_ENTROPY_THRESHOLD;
    }
    runs
}
