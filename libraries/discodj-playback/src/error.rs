//! Error types for room playback control

use discodj_core::DjError;
use thiserror::Error;

/// Playback errors
///
/// Everything except `Collaborator` and `Executor` is a rejected request:
/// the room is left untouched and the message is safe to show to the user.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Operation needs a current track
    #[error("Nothing is playing")]
    NothingPlaying,

    /// Queue index outside `[0, len)`
    #[error("Index {index} is out of range (queue has {len} tracks)")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Malformed or out-of-range seek target
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Requester is not in a voice channel
    #[error("Join a voice channel first")]
    NotInVoice,

    /// Room is in DJ-only mode and the actor is not a DJ
    #[error("Only DJs can do that in this room")]
    Forbidden,

    /// Resolution returned nothing
    #[error("No results for '{0}'")]
    NoResults(String),

    /// Filter key not recognised
    #[error("Unknown filter '{0}'")]
    UnknownFilter(String),

    /// History is empty
    #[error("Nothing to go back to")]
    NoPrevious,

    /// Invalid request that fits no other variant
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The room's serial lane dropped the operation
    #[error("Room operation aborted: {0}")]
    Executor(String),

    /// An external collaborator failed
    #[error(transparent)]
    Collaborator(#[from] DjError),
}

impl PlaybackError {
    pub fn index_out_of_bounds(index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds { index, len }
    }

    /// Whether this is a rejected request rather than a failure
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Self::Executor(_) | Self::Collaborator(_))
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_errors_are_distinguished() {
        assert!(PlaybackError::NothingPlaying.is_user_error());
        assert!(PlaybackError::index_out_of_bounds(3, 2).is_user_error());
        assert!(!PlaybackError::Collaborator(DjError::voice("gone")).is_user_error());
        assert!(!PlaybackError::Executor("panicked".into()).is_user_error());
    }

    #[test]
    fn index_message_names_both_numbers() {
        assert_eq!(
            PlaybackError::index_out_of_bounds(7, 3).to_string(),
            "Index 7 is out of range (queue has 3 tracks)"
        );
    }
}
