//! Error type shared across the renest crates.
//!
//! Repair is a pure transform over a fixed input, so there is no
//! recoverable/retryable category here: every variant is fatal for the run
//! it occurs in. `Internal` marks "should never happen" consistency
//! violations surfaced as values instead of panics.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used throughout the workspace.
pub type Result<T, E = RenestError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum RenestError {
    /// I/O failure reading the input archive or writing the output.
    #[error("i/o failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Archive container failure (corrupt central directory, bad entry, ...).
    #[error("archive failure in {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// A class entry could not be parsed into a structural view.
    #[error("malformed class data: {detail}")]
    MalformedClass { detail: String },

    /// Context wrapper naming the entry and archive a failure occurred in.
    #[error("class entry `{entry}` in {archive}: {source}")]
    Entry {
        entry: String,
        archive: PathBuf,
        #[source]
        source: Box<RenestError>,
    },

    /// Patching would need a constant-pool index beyond the format's
    /// 16-bit limit.
    #[error("constant pool exhausted while adding `{name}`")]
    PoolExhausted { name: String },

    /// Internal invariant violated; indicates a bug, not bad input.
    #[error("internal invariant violated: {detail}")]
    Internal { detail: String },
}

impl RenestError {
    /// Malformed-class error from any displayable detail.
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedClass {
            detail: detail.into(),
        }
    }

    /// Internal-invariant error from any displayable detail.
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal {
            detail: detail.into(),
        }
    }

    /// Wrap an error with the archive entry it was raised for.
    #[must_use]
    pub fn for_entry(self, entry: impl Into<String>, archive: impl Into<PathBuf>) -> Self {
        Self::Entry {
            entry: entry.into(),
            archive: archive.into(),
            source: Box::new(self),
        }
    }
}
