//! Cache module for storing API responses to disk
//!
//! This module provides a response cache that persists decoded API responses
//! to the filesystem, keyed by a fingerprint of the endpoint and its query
//! parameters. Entries expire lazily after a configurable number of hours.

mod fingerprint;
mod manager;

use std::path::PathBuf;
use thiserror::Error;

pub use fingerprint::{fingerprint, QueryParams, Scalar};
pub use manager::ResponseCache;

/// Errors raised around the response cache
///
/// Storage errors never escape `ResponseCache`: reads turn them into misses and
/// writes into a `false` return, both logged. They exist so the log line says
/// exactly what failed.
#[derive(Debug, Error)]
pub enum CacheError {
    /// An entry exists but could not be read or decoded
    #[error("Failed to read cache entry {path:?}: {reason}")]
    StorageRead { path: PathBuf, reason: String },

    /// An entry could not be written
    #[error("Failed to write cache entry {path:?}: {reason}")]
    StorageWrite { path: PathBuf, reason: String },

    /// Query parameters that cannot be part of a fingerprint
    #[error("Invalid request parameters: {0}")]
    InvalidFingerprintInput(String),
}
