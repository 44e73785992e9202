use std::path::PathBuf;
use thiserror::Error;

/// Failures while resolving or downloading catalog resources.
///
/// These are recoverable at the run level: the caller falls back to scanning
/// the bronze directory for a previously downloaded artifact.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("catalog request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("catalog returned no CSV or ZIP resource")]
    NoResourceFound,

    #[error("writing artifact to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures while loading or correcting a raw artifact. Fatal for the run:
/// no output is written.
#[derive(Debug, Error)]
pub enum CorrectError {
    #[error("required column `{0}` missing from input")]
    Schema(String),

    #[error("invalid reference range: start {start} > end {end}")]
    InvalidRange { start: i32, end: i32 },

    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("ZIP archive contains no CSV entry")]
    NoCsvInArchive,

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}
