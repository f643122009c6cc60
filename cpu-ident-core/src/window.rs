//! Sliding-window classification over a whole file.

use rayon::prelude::*;

use crate::classifier::{classify, Verdict};
use crate::corpus::ReferenceIndex;
use crate::ngram::{count_ngrams, NgramOrder};
use crate::profile::ProfileBuilder;

/// Default window size `W`: the engine is calibrated for this value;
/// smaller windows lose statistical power, larger ones lose spatial
/// resolution.
pub const DEFAULT_WINDOW: usize = 0x1000;

/// Below this length, the whole file is classified as a single window
/// rather than scanned.
pub const MIN_WINDOW: usize = 0x80;

/// One classified window.
#[derive(Debug, Clone)]
pub struct WindowResult {
    pub offset: usize,
    pub len: usize,
    pub verdict: Verdict,
    /// Shannon byte entropy of the window, normalized to `[0, 1]`.
    pub entropy: f64,
}

/// Scans a file with a fixed-size sliding window, classifying each window
/// independently against a shared [`ReferenceIndex`].
#[derive(Debug, Clone, Copy)]
pub struct WindowScanner {
    window: usize,
    step: usize,
}

impl Default for WindowScanner {
    /// Non-overlapping windows of [`DEFAULT_WINDOW`] bytes: step equal to
    /// the window size.
    fn default() -> Self {
        WindowScanner {
            window: DEFAULT_WINDOW,
            step: DEFAULT_WINDOW,
        }
    }
}

impl WindowScanner {
    pub fn new(window: usize, step: usize) -> Self {
        assert!(window > 0, "window size must be positive");
        assert!(step > 0, "step must be positive");
        WindowScanner { window, step }
    }

    pub fn window_size(&self) -> usize {
        self.window
    }

    /// The offsets and lengths of every window that will be classified, in
    /// ascending order, before any classification runs. Exposed separately
    /// from [`Self::scan`] so the reconciler's noise threshold (which
    /// defaults to the window size) can be derived without re-deriving the
    /// scan geometry.
    pub fn window_layout(&self, data_len: usize) -> Vec<(usize, usize)> {
        if data_len < MIN_WINDOW {
            return if data_len == 0 {
                Vec::new()
            } else {
                vec![(0, data_len)]
            };
        }

        let w = self.window.min(data_len);
        if data_len < self.window {
            return vec![(0, w)];
        }

        let step = self.step.min(w);
        let mut offsets = Vec::new();
        let mut off = 0usize;
        while off + w <= data_len {
            offsets.push(off);
            off += step;
        }
        let tail_needed = match offsets.last() {
            Some(&last) => last + w < data_len,
            None => true,
        };
        if tail_needed {
            offsets.push(data_len - w);
        }
        offsets.into_iter().map(|off| (off, w)).collect()
    }

    /// Classify every window in parallel against `index`, then return the
    /// results in ascending offset order — the ordering guarantee binds the
    /// emitted order, not the scheduling.
    pub fn scan(&self, data: &[u8], index: &ReferenceIndex) -> Vec<WindowResult> {
        let layout = self.window_layout(data.len());
        layout
            .into_par_iter()
            .map(|(offset, len)| {
                let slice = &data[offset..offset + len];
                let builder = ProfileBuilder::default();
                let q2 = builder.build(NgramOrder::Bigram, &count_ngrams(slice, NgramOrder::Bigram));
                let q3 = builder.build(
                    NgramOrder::Trigram,
                    &count_ngrams(slice, NgramOrder::Trigram),
                );
                let verdict = classify(&q2, &q3, index);
                WindowResult {
                    offset,
                    len,
                    verdict,
                    entropy: normalized_entropy(slice),
                }
            })
            .collect()
    }
}

/// Shannon entropy of `data`'s byte histogram, normalized to `[0, 1]` by
/// dividing by 8 bits (the maximum possible entropy per byte).
pub fn normalized_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut histogram = [0u64; 256];
    for &b in data {
        histogram[b as usize] += 1;
    }
    let len = data.len() as f64;
    let bits: f64 = histogram
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / len;
            -p * p.log2()
        })
        .sum();
    bits / 8.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_tiny_file_is_one_window() {
        let scanner = WindowScanner::default();
        assert_eq!(scanner.window_layout(0), vec![]);
        assert_eq!(scanner.window_layout(10), vec![(0, 10)]);
    }

    #[test]
    fn layout_below_window_above_min_reduces_window() {
        let scanner = WindowScanner::default();
        assert_eq!(scanner.window_layout(500), vec![(0, 500)]);
    }

    #[test]
    fn layout_covers_whole_file_when_step_does_not_divide_length() {
        let scanner = WindowScanner::new(0x1000, 0x1000);
        let len = 0x1000 * 3 + 100;
        let layout = scanner.window_layout(len);
        let covered_end = layout.last().unwrap();
        assert_eq!(covered_end.0 + covered_end.1, len);
        // Every offset but the last should be a clean multiple of the step.
        for &(off, w) in &layout[..layout.len() - 1] {
            assert_eq!(off % 0x1000, 0);
            assert_eq!(w, 0x1000);
        }
    }

    #[test]
    fn layout_exact_multiple_has_no_duplicate_tail() {
        let scanner = WindowScanner::new(0x1000, 0x1000);
        let len = 0x1000 * 4;
        let layout = scanner.window_layout(len);
        assert_eq!(layout.len(), 4);
        let total: usize = layout.iter().map(|&(_, w)| w).sum();
        assert_eq!(total, len);
    }

    #[test]
    fn entropy_of_constant_byte_is_zero() {
        let data = vec![0x41u8; 4096];
        assert!(normalized_entropy(&data) < 1e-9);
    }

    #[test]
    fn entropy_of_uniform_bytes_is_near_one() {
        let data: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        assert!(normalized_entropy(&data) > 0.99);
    }
}
