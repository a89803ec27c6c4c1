use hoard_types::IdError;

/// Errors from content store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No object is persisted under the requested identifier.
    #[error("object not found: {0}")]
    NotFound(String),

    /// Textual or binary input could not be decoded into an identifier.
    #[error(transparent)]
    MalformedIdentifier(#[from] IdError),

    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A dependency index record is unreadable or inconsistent.
    #[error("corrupt dependency index {path}: {reason}")]
    Index { path: String, reason: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The store configuration is invalid or could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A lock guarding in-process state was poisoned by a panicking thread.
    #[error("dependency graph lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// Returns `true` for a read of a missing object.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
