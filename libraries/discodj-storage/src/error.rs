/// Storage-specific errors
use thiserror::Error;

/// Result type alias using `StorageError`
pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// Entity not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A name or id that cannot be stored
    #[error("Invalid {what}: {value:?}")]
    Invalid { what: &'static str, value: String },

    /// Serialization/deserialization error
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn invalid(what: &'static str, value: impl Into<String>) -> Self {
        Self::Invalid {
            what,
            value: value.into(),
        }
    }
}

impl From<StorageError> for discodj_core::DjError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { entity, id } => discodj_core::DjError::not_found(entity, id),
            other => discodj_core::DjError::storage(other.to_string()),
        }
    }
}
