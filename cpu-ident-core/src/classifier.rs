//! Kullback-Leibler divergence classification: given a query profile, rank
//! every reference by divergence at each n-gram order and derive a
//! confidence-gated verdict.

use crate::corpus::ReferenceIndex;
use crate::ngram::NgramOrder;
use crate::profile::Profile;

/// One entry in a divergence ranking.
#[derive(Debug, Clone)]
pub struct RankedReference {
    pub label: String,
    pub divergence: f64,
}

/// The outcome of classifying one query profile against a [`ReferenceIndex`].
#[derive(Debug, Clone)]
pub struct Verdict {
    /// `Some(label)` only when the order-2 and order-3 argmins agree (and,
    /// for the OCaml label specifically, the low-divergence gate passes).
    pub label: Option<String>,
    pub confident: bool,
    /// Ascending by divergence.
    pub order2: Vec<RankedReference>,
    /// Ascending by divergence.
    pub order3: Vec<RankedReference>,
}

impl Verdict {
    pub fn none(order2: Vec<RankedReference>, order3: Vec<RankedReference>) -> Self {
        Verdict {
            label: None,
            confident: false,
            order2,
            order3,
        }
    }
}

/// KL divergence from query `q` to reference `r`, at `q`'s order.
///
/// The sum ranges only over keys present in `q`'s sparse representation
/// (keys `q` counted at least once); a key present in `q` but absent from
/// `r`'s sparse map uses `r`'s `default` probability, and keys absent from
/// `q` contribute nothing to the sum. Every term is finite because `r` is
/// strictly positive everywhere.
pub fn kl_divergence(q: &Profile, r: &Profile) -> f64 {
    debug_assert_eq!(q.order(), r.order(), "divergence compares profiles of the same order");
    q.present_keys()
        .map(|(&key, &qp)| {
            let rp = r.probability(key);
            qp * (qp / rp).ln()
        })
        .sum()
}

fn rank(query: &Profile, index: &ReferenceIndex, order: NgramOrder) -> Vec<RankedReference> {
    let mut ranking: Vec<RankedReference> = index
        .references()
        .map(|reference| RankedReference {
            label: reference.label().to_string(),
            divergence: kl_divergence(query, reference.profile(order)),
        })
        .collect();
    // References are already lexicographically sorted by `ReferenceIndex`,
    // so a stable sort on divergence breaks ties in lexicographic label
    // order.
    ranking.sort_by(|a, b| a.divergence.partial_cmp(&b.divergence).unwrap());
    ranking
}

/// Classify a query built at both orders against every reference in `index`,
/// apply the two-order confidence gate, and apply the OCaml low-divergence
/// post-filter if the index loaded an OCaml reference.
pub fn classify(query2: &Profile, query3: &Profile, index: &ReferenceIndex) -> Verdict {
    let order2 = rank(query2, index, NgramOrder::Bigram);
    let order3 = rank(query3, index, NgramOrder::Trigram);

    let top2 = order2.first();
    let top3 = order3.first();

    let agree = match (top2, top3) {
        (Some(a), Some(b)) => a.label == b.label,
        _ => false,
    };

    if !agree {
        return Verdict::none(order2, order3);
    }

    let label = top2.unwrap().label.clone();
    let top3_divergence = top3.unwrap().divergence;

    if index.is_ocaml_label(&label) && !index.ocaml_gate_passes(top3_divergence) {
        return Verdict::none(order2, order3);
    }

    Verdict {
        label: Some(label),
        confident: true,
        order2,
        order3,
    }
}
