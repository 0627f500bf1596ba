//! Core types for room playback

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where enqueued tracks land
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnqueuePosition {
    /// Append to the back
    #[default]
    End,
    /// Insert at the front
    Next,
    /// Same as `Next`
    Top,
}

impl EnqueuePosition {
    pub fn is_front(self) -> bool {
        matches!(self, EnqueuePosition::Next | EnqueuePosition::Top)
    }
}

/// Configuration for the playback controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackConfig {
    /// In-memory history size (default: 50)
    pub history_size: usize,

    /// Up-next entries per panel page (default: 10)
    pub page_size: usize,

    /// Progress bar slots (default: 10)
    pub progress_slots: usize,

    /// Panel refresh period while playing (default: 5s)
    pub refresh_interval: Duration,

    /// Consecutive start failures before giving up (default: 5)
    pub max_consecutive_failures: u32,

    /// Time limit for resolving a placeholder at playback time (default: 30s)
    pub resolve_timeout: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            history_size: 50,
            page_size: 10,
            progress_slots: 10,
            refresh_interval: Duration::from_secs(5),
            max_consecutive_failures: 5,
            resolve_timeout: Duration::from_secs(30),
        }
    }
}
