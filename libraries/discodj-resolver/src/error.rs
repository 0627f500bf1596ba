//! Error types for track resolution

use std::time::Duration;
use thiserror::Error;

/// Errors raised while talking to yt-dlp or Spotify
#[derive(Error, Debug)]
pub enum ResolverError {
    /// The helper program could not be started
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The helper program ran past its time limit and was killed
    #[error("{program} timed out after {after:?}")]
    Timeout { program: String, after: Duration },

    /// The helper program exited unsuccessfully
    #[error("yt-dlp failed ({}): {stderr}", .code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    Failed { code: Option<i32>, stderr: String },

    /// Output was not the JSON we expected
    #[error("Failed to parse output: {0}")]
    Parse(#[from] serde_json::Error),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Not a URL we can handle
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Nothing playable came back
    #[error("No playable media for {0}")]
    NoMedia(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ResolverError {
    /// Whether running the same command again may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Failed { .. } | Self::Parse(_) | Self::Request(_)
        )
    }
}

/// Result type for resolver operations.
pub type Result<T> = std::result::Result<T, ResolverError>;

impl From<ResolverError> for discodj_core::DjError {
    fn from(err: ResolverError) -> Self {
        match err {
            ResolverError::Timeout { program, after } => discodj_core::DjError::timeout(program, after),
            ResolverError::Io(e) => discodj_core::DjError::Io(e),
            other => discodj_core::DjError::resolution(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_name_their_exit_code() {
        let err = ResolverError::Failed {
            code: Some(1),
            stderr: "ERROR: Video unavailable".into(),
        };
        assert_eq!(err.to_string(), "yt-dlp failed (1): ERROR: Video unavailable");
        assert!(err.is_retryable());
        assert!(!ResolverError::InvalidUrl("x".into()).is_retryable());
    }

    #[test]
    fn timeouts_stay_timeouts() {
        let err: discodj_core::DjError = ResolverError::Timeout {
            program: "yt-dlp".into(),
            after: Duration::from_secs(30),
        }
        .into();
        assert!(matches!(err, discodj_core::DjError::Timeout { .. }));
    }
}
