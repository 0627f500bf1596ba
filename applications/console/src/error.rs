/// Console error types
use discodj_playback::PlaybackError;
use discodj_storage::StorageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConsoleError>;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// A typed line could not be understood
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Resolver error: {0}")]
    Resolver(#[from] discodj_resolver::ResolverError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConsoleError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Whether the message should be shown to the user rather than logged
    pub fn is_user_error(&self) -> bool {
        match self {
            Self::Usage(_) => true,
            Self::Playback(e) => e.is_user_error(),
            Self::Storage(StorageError::NotFound { .. } | StorageError::Invalid { .. }) => true,
            _ => false,
        }
    }
}

impl From<config::ConfigError> for ConsoleError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
