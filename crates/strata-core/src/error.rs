//! Error types and result aliases for Strata.
//!
//! The taxonomy is shared across all components so the API layer can map
//! failures to HTTP statuses without inspecting message strings.

/// The result type used throughout Strata.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Strata operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required parameter was missing or malformed.
    #[error("{message}")]
    Validation {
        /// Description of the invalid input.
        message: String,
    },

    /// The requested object does not exist in the bucket.
    #[error("object not found: s3://{bucket}/{key}")]
    ObjectNotFound {
        /// Bucket that was queried.
        bucket: String,
        /// Key that was looked up.
        key: String,
    },

    /// The requested bucket does not exist.
    #[error("bucket not found: {bucket}")]
    BucketNotFound {
        /// Bucket that was queried.
        bucket: String,
    },

    /// A columnar payload could not be parsed.
    #[error("parse error: {message}")]
    Parse {
        /// Description of the parse failure.
        message: String,
    },

    /// A storage operation failed.
    #[error("storage error: {message}")]
    Store {
        /// Description of the storage failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// A log version or metadata sequence the writer expected to be free is
    /// already occupied by another writer.
    #[error("concurrent modification: {message}")]
    ConcurrentModification {
        /// Description of the conflicting write.
        message: String,
    },

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new validation error with the given message.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a new storage error with the given message.
    #[must_use]
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new storage error with a source cause.
    #[must_use]
    pub fn store_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Store {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new parse error with the given message.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Creates a new concurrent-modification error with the given message.
    #[must_use]
    pub fn concurrent_modification(message: impl Into<String>) -> Self {
        Self::ConcurrentModification {
            message: message.into(),
        }
    }

    /// Creates a new serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}
