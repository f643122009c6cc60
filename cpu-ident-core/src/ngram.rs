//! Sparse byte n-gram counting.
//!
//! An n-gram key packs the earliest byte into the most significant position:
//! `k = b0*256 + b1` for bigrams, `k = b0*65536 + b1*256 + b2` for trigrams.
//! The encoding is only meaningful within this crate; it must simply stay
//! consistent between a reference's profile and a query's profile, which it
//! does because both go through [`count_ngrams`].

use rustc_hash::FxHashMap;

/// The n-gram order supported by the classifier: two or three. A third
/// order would need its own universe-size arithmetic, so this is an enum
/// rather than a bare `usize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NgramOrder {
    Bigram = 2,
    Trigram = 3,
}

impl NgramOrder {
    pub const ALL: [NgramOrder; 2] = [NgramOrder::Bigram, NgramOrder::Trigram];

    /// `n`, the tuple length.
    pub fn len(self) -> usize {
        self as usize
    }

    /// `256^n`, the size of the full key universe.
    pub fn universe_size(self) -> u64 {
        256u64.pow(self.len() as u32)
    }
}

/// Sparse mapping from packed n-gram key to occurrence count. Keys absent
/// from the map occurred zero times.
pub type SparseCounts = FxHashMap<u32, u64>;

/// Count every n-gram of the given order in `data`, sliding by a stride of
/// one byte. A block shorter than `order` yields an empty map. The caller is
/// responsible for concatenating multi-chunk corpus entries into a single
/// slice before calling this — this function never straddles a boundary
/// it isn't shown, but it also never artificially introduces one within the
/// slice it is given.
pub fn count_ngrams(data: &[u8], order: NgramOrder) -> SparseCounts {
    let n = order.len();
    let mut counts = SparseCounts::default();
    if data.len() < n {
        return counts;
    }
    for window in data.windows(n) {
        let key = pack_key(window);
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

fn pack_key(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(0u32, |acc, &b| (acc << 8) | b as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_block_yields_empty_map() {
        assert!(count_ngrams(&[], NgramOrder::Bigram).is_empty());
        assert!(count_ngrams(&[0x41], NgramOrder::Bigram).is_empty());
        assert!(count_ngrams(&[0x41, 0x42], NgramOrder::Trigram).is_empty());
    }

    #[test]
    fn bigram_key_encoding() {
        let counts = count_ngrams(&[0x01, 0x02], NgramOrder::Bigram);
        assert_eq!(counts.get(&(0x0102)), Some(&1));
    }

    #[test]
    fn trigram_key_encoding() {
        let counts = count_ngrams(&[0x01, 0x02, 0x03], NgramOrder::Trigram);
        assert_eq!(counts.get(&(0x010203)), Some(&1));
    }

    #[test]
    fn sliding_stride_one_overlaps() {
        // "AAAA" has 3 overlapping bigrams, all identical.
        let counts = count_ngrams(b"AAAA", NgramOrder::Bigram);
        assert_eq!(counts.len(), 1);
        let key = pack_key(b"AA");
        assert_eq!(counts[&key], 3);
    }

    #[test]
    fn total_ngram_count_matches_sliding_window_formula() {
        let data = b"the quick brown fox jumps over the lazy dog";
        for order in NgramOrder::ALL {
            let counts = count_ngrams(data, order);
            let total: u64 = counts.values().sum();
            let expected = (data.len() - order.len() + 1) as u64;
            assert_eq!(total, expected);
        }
    }

    #[test]
    fn universe_size() {
        assert_eq!(NgramOrder::Bigram.universe_size(), 65_536);
        assert_eq!(NgramOrder::Trigram.universe_size(), 16_777_216);
    }
}
