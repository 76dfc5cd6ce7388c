//! Error types for resolution, caching and graph construction

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to resolve a script name to a file on disk.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Every search location was probed without a match.
    #[error("could not find file \"{name}\"\nEnsure it is in one of the search/probing directories.")]
    NotFound { name: String },
}

/// Failure while persisting a transformed import into the cache.
///
/// Always fatal to the import; the offending path is carried in the error.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to create cache directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write cache file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure while building or ordering the import graph.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("circular script import detected: {0}")]
    Cycle(String),
}

/// Any failure while processing a single script unit.
#[derive(Debug, Error)]
pub enum UnitError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Error reported by the external directive parser.
    #[error("{0}")]
    Parse(String),
}
