//! Error types for topology inference.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading a descriptor file.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// The file could not be opened.
    #[error("cannot open descriptor {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading failed part way through the scan.
    #[error("read error in descriptor at line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: io::Error,
    },
}

/// Topology inference errors.
///
/// Only precondition violations surface as errors; a missing descriptor file
/// is not an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
    /// Service instance name does not extend past the log prefix.
    #[error("service name {name:?} is too short for log prefix {prefix:?}")]
    ServiceNameTooShort { name: String, prefix: String },

    /// Base name too short for the trailing-character convention.
    #[error("base name {name:?} must have at least {min} characters")]
    BaseNameTooShort { name: String, min: usize },
}
