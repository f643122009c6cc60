//! Loading a corpus directory into an immutable, shared [`ReferenceIndex`].

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use rand::{RngCore, SeedableRng};
use rayon::prelude::*;

use crate::classifier::kl_divergence;
use crate::error::{Error, Result};
use crate::ngram::{count_ngrams, NgramOrder};
use crate::profile::{Profile, ProfileBuilder};

const CORPUS_SUFFIX: &str = ".corpus";
const XZ_SUFFIX: &str = ".xz";

/// The label under which the OCaml corpus entry is expected to be named.
/// Matched exactly; a corpus without an entry by this name simply never
/// triggers the post-filter.
const OCAML_LABEL: &str = "OCaml";

/// A synthetic buffer this size is used to calibrate the OCaml gate (§4.4):
/// large enough that its profile's `default` mass is small relative to the
/// OCaml reference's observed frequencies, matching a typical query window.
const OCAML_CALIBRATION_SIZE: usize = 1 << 16;

/// One labeled architecture: a pair of profiles (order 2 and order 3)
/// derived from the exact same bytes.
#[derive(Debug)]
pub struct Reference {
    label: String,
    order2: Profile,
    order3: Profile,
}

impl Reference {
    /// Assemble a reference from already-built profiles. Used by tests that
    /// want full control over the underlying counts without touching the
    /// filesystem; real corpus loading goes through [`load_one`].
    pub(crate) fn new(label: String, order2: Profile, order3: Profile) -> Self {
        Reference {
            label,
            order2,
            order3,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn profile(&self, order: NgramOrder) -> &Profile {
        match order {
            NgramOrder::Bigram => &self.order2,
            NgramOrder::Trigram => &self.order3,
        }
    }
}

/// The calibrated acceptance threshold for the OCaml post-filter: a verdict
/// of `OCaml` is only accepted if its order-3 divergence from the OCaml
/// reference falls below this value.
#[derive(Debug, Clone, Copy)]
pub struct OcamlGate {
    pub threshold: f64,
}

/// The set of labeled references loaded from one corpus directory. Immutable
/// and shared read-only across every classification in a session.
#[derive(Debug)]
pub struct ReferenceIndex {
    references: Vec<Reference>,
    ocaml_gate: Option<OcamlGate>,
}

impl ReferenceIndex {
    /// Load every `<Label>.corpus` or `<Label>.corpus.xz` entry in `dir`.
    /// Entries that can't be read or decompressed, or that are empty, are
    /// skipped with a `log::warn!` and do not abort the load — except that
    /// if *every* entry is skipped, loading as a whole fails with
    /// [`Error::EmptyCorpus`], rather than silently producing an empty,
    /// useless index.
    pub fn load(dir: &Path) -> Result<ReferenceIndex> {
        let entries = fs::read_dir(dir)
            .map_err(|source| Error::CorpusDirUnreadable {
                path: dir.to_path_buf(),
                source,
            })?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| corpus_label(path).is_some())
            .collect::<Vec<PathBuf>>();

        let mut references: Vec<Reference> = entries
            .par_iter()
            .filter_map(|path| match load_one(path) {
                Ok(reference) => Some(reference),
                Err(err) => {
                    log::warn!("skipping corpus entry {:?}: {}", path, err);
                    None
                }
            })
            .collect();

        if references.is_empty() {
            return Err(Error::EmptyCorpus {
                path: dir.to_path_buf(),
            });
        }

        references.sort_by(|a, b| a.label.cmp(&b.label));

        let ocaml_gate = references
            .iter()
            .find(|r| r.label == OCAML_LABEL)
            .map(|ocaml| calibrate_ocaml_gate(ocaml));

        if let Some(gate) = ocaml_gate {
            log::debug!("calibrated OCaml gate threshold: {}", gate.threshold);
        }

        Ok(ReferenceIndex {
            references,
            ocaml_gate,
        })
    }

    /// Build an index directly from already-assembled references, useful for
    /// tests that don't want to touch the filesystem.
    pub fn from_references(mut references: Vec<Reference>) -> ReferenceIndex {
        references.sort_by(|a, b| a.label.cmp(&b.label));
        let ocaml_gate = references
            .iter()
            .find(|r| r.label == OCAML_LABEL)
            .map(|ocaml| calibrate_ocaml_gate(ocaml));
        ReferenceIndex {
            references,
            ocaml_gate,
        }
    }

    pub fn references(&self) -> impl Iterator<Item = &Reference> {
        self.references.iter()
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub fn is_ocaml_label(&self, label: &str) -> bool {
        label == OCAML_LABEL
    }

    /// Whether `divergence` (an order-3 divergence against the OCaml
    /// reference) clears the calibrated gate. Always true if no OCaml
    /// reference was loaded, so the filter stays inert against partial
    /// corpora.
    pub fn ocaml_gate_passes(&self, divergence: f64) -> bool {
        match self.ocaml_gate {
            Some(gate) => divergence < gate.threshold,
            None => true,
        }
    }
}

/// Strip the corpus label out of a path: `<Label>.corpus` or
/// `<Label>.corpus.xz`. Returns `None` for anything else.
fn corpus_label(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(XZ_SUFFIX).unwrap_or(name);
    stem.strip_suffix(CORPUS_SUFFIX).map(str::to_string)
}

fn is_xz(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.ends_with(XZ_SUFFIX))
        .unwrap_or(false)
}

fn load_one(path: &Path) -> Result<Reference, Box<dyn std::error::Error>> {
    let label = corpus_label(path).ok_or("not a corpus entry")?;
    let raw = fs::read(path)?;
    let bytes = if is_xz(path) {
        let mut out = Vec::new();
        lzma_rs::xz_decompress(&mut Cursor::new(&raw), &mut out)
            .map_err(|e| format!("xz decompression failed: {:?}", e))?;
        out
    } else {
        raw
    };

    if bytes.is_empty() {
        return Err("corpus entry is empty".into());
    }

    let builder = ProfileBuilder::default();
    let order2 = builder.build(NgramOrder::Bigram, &count_ngrams(&bytes, NgramOrder::Bigram));
    let order3 = builder.build(NgramOrder::Trigram, &count_ngrams(&bytes, NgramOrder::Trigram));

    Ok(Reference {
        label,
        order2,
        order3,
    })
}

/// Derive the OCaml gate by scoring a synthetic, uniformly random buffer
/// against the OCaml reference's order-3 profile and halving the result as
/// a safety margin. The PRNG is seeded so the calibration is deterministic
/// across runs of the same corpus.
fn calibrate_ocaml_gate(ocaml: &Reference) -> OcamlGate {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x0CAA1);
    let mut noise = vec![0u8; OCAML_CALIBRATION_SIZE];
    rng.fill_bytes(&mut noise);

    let builder = ProfileBuilder::default();
    let noise_profile = builder.build(
        NgramOrder::Trigram,
        &count_ngrams(&noise, NgramOrder::Trigram),
    );
    let divergence = kl_divergence(&noise_profile, &ocaml.order3);
    OcamlGate {
        threshold: divergence * 0.5,
    }
}
