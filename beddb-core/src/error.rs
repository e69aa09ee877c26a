//! Error types for beddb-core

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building a tileset.
///
/// `FatalConfiguration` and `UnknownChromosome` abort the run. `MalformedRecord`
/// is produced per line and the caller skips the record.
#[derive(Debug, Error)]
pub enum BeddbError {
    #[error("Chromosome sizes unavailable ({path}): {reason}")]
    FatalConfiguration { path: PathBuf, reason: String },

    #[error("Unable to find {chrom} in the list of chromosome sizes")]
    UnknownChromosome { chrom: String },

    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl BeddbError {
    pub fn malformed<S: Into<String>>(line: usize, reason: S) -> Self {
        Self::MalformedRecord { line, reason: reason.into() }
    }

    pub fn fatal_config<P: Into<PathBuf>, S: Into<String>>(path: P, reason: S) -> Self {
        Self::FatalConfiguration { path: path.into(), reason: reason.into() }
    }

    /// True when the run can continue after skipping the offending record.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MalformedRecord { .. })
    }
}

pub type BeddbResult<T> = Result<T, BeddbError>;
