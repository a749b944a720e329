//! Error types for unipack
//!
//! A build either fully succeeds or fails with exactly one of these errors
//! naming the responsible file. Partial graphs and partial bundles are never
//! surfaced.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for unipack operations
pub type BundleResult<T> = Result<T, BundleError>;

/// Main error type for unipack operations
#[derive(Error, Debug)]
pub enum BundleError {
    /// The source compiler could not build a syntax tree for a file
    #[error("failed to parse {file}:{line}: {message}")]
    Parse {
        file: PathBuf,
        line: usize,
        message: String,
    },

    /// A dependency specifier resolves to no readable file, or resolution
    /// policy rejects the target
    #[error("cannot resolve import '{specifier}' from {importer}: {reason}")]
    Resolution {
        importer: PathBuf,
        specifier: String,
        reason: String,
    },

    /// A transpiled module body cannot be embedded verbatim in the bundle
    #[error("cannot embed module body for {file}: {reason}")]
    Emit { file: PathBuf, reason: String },

    /// Reading a discovered file failed after resolution succeeded
    #[error("failed to read {file}: {source}")]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
