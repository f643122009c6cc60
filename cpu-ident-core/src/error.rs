use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The error type used by this crate.
///
/// Statistical outcomes — including a `NONE` verdict — are never represented
/// here; they are ordinary values returned from [`crate::classifier::classify`]
/// and friends. Only I/O and corpus-structural failures reach this type.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("could not read corpus directory {path:?}: {source}")]
    CorpusDirUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not read query file {path:?}: {source}")]
    QueryFileUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corpus directory {path:?} contained no usable .corpus entries")]
    EmptyCorpus { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, Error>;
