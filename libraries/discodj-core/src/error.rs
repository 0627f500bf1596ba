/// Core error types for discodj collaborators
use std::time::Duration;
use thiserror::Error;

/// Result type alias using `DjError`
pub type Result<T> = std::result::Result<T, DjError>;

/// Error raised by an external collaborator (resolver, sink, surface, store)
#[derive(Error, Debug)]
pub enum DjError {
    /// A track could not be turned into something playable
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// An external call exceeded its time limit
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: String,
        after: Duration,
    },

    /// Voice connection or sink errors
    #[error("Voice error: {0}")]
    Voice(String),

    /// Display surface errors
    #[error("Display error: {0}")]
    Display(String),

    /// Presence update errors
    #[error("Presence error: {0}")]
    Presence(String),

    /// Entity not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Persistence errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl DjError {
    /// Create a resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after,
        }
    }

    /// Create a voice error
    pub fn voice(msg: impl Into<String>) -> Self {
        Self::Voice(msg.into())
    }

    /// Create a display error
    pub fn display(msg: impl Into<String>) -> Self {
        Self::Display(msg.into())
    }

    /// Create a presence error
    pub fn presence(msg: impl Into<String>) -> Self {
        Self::Presence(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Whether retrying the same call later could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Resolution(_) | Self::Timeout { .. } | Self::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        assert_eq!(
            DjError::not_found("message", "9").to_string(),
            "message not found: 9"
        );
        assert_eq!(
            DjError::timeout("yt-dlp -J", Duration::from_secs(30)).to_string(),
            "yt-dlp -J timed out after 30s"
        );
    }

    #[test]
    fn transient_classification() {
        assert!(DjError::resolution("404").is_transient());
        assert!(!DjError::display("gone").is_transient());
    }
}
