//! Error types for the preference layer

use storage::{NativeKind, StoreError};
use thiserror::Error;

use crate::blob::BlobError;
use crate::descriptor::PrefKind;

/// Preference error types
///
/// Typed reads never return these; they resolve to a default instead. They
/// surface from initialization, live values, export and backup.
#[derive(Debug, Error)]
pub enum PrefError {
    /// Native store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Serialized blob could not be produced or read
    #[error("Blob error: {0}")]
    Blob(#[from] BlobError),

    /// A complex value could not be converted to or from its structured form
    #[error("Serialization error: {0}")]
    Serialization(#[from] ciborium::value::Error),

    /// Config or legacy file IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config or legacy file is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No native change notification exists for this kind
    #[error("Live values are not supported for {0:?} preferences")]
    UnsupportedLiveKind(PrefKind),

    /// A live value was viewed as the wrong kind
    #[error("Cannot view live {found} value as {expected}")]
    LiveKindMismatch {
        /// Kind requested by the caller
        expected: NativeKind,
        /// Kind the live value carries
        found: NativeKind,
    },

    /// Supplied default does not match the preference's declared kind
    #[error("Default for {name} must be {expected:?}, got {found:?}")]
    DefaultKindMismatch {
        /// Preference name
        name: &'static str,
        /// Declared kind
        expected: PrefKind,
        /// Kind of the supplied default
        found: PrefKind,
    },

    /// The live value's watcher is gone
    #[error("Live value for {0} is closed")]
    LiveClosed(String),
}

/// Result type for preference operations
pub type Result<T> = std::result::Result<T, PrefError>;
