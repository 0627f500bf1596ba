//! Playback history tracking
//!
//! Maintains a bounded history of finished tracks for "previous" and for the
//! persisted snapshot.

use discodj_core::Track;
use std::collections::VecDeque;

/// Playback history with bounded size
///
/// Ring buffer: once full, the oldest entry is discarded on push.
#[derive(Debug, Clone)]
pub struct History {
    /// History buffer (most recent = back)
    tracks: VecDeque<Track>,

    /// Maximum history size
    max_size: usize,
}

impl History {
    /// Create new history with specified maximum size
    pub fn new(max_size: usize) -> Self {
        Self {
            tracks: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// Add track to history
    ///
    /// If history is full, oldest track is discarded
    pub fn push(&mut self, track: Track) {
        if self.max_size == 0 {
            return;
        }
        if self.tracks.len() >= self.max_size {
            self.tracks.pop_front();
        }
        self.tracks.push_back(track);
    }

    /// Most recent track (without removing)
    pub fn peek(&self) -> Option<&Track> {
        self.tracks.back()
    }

    /// Pop most recent track, for "previous"
    pub fn pop(&mut self) -> Option<Track> {
        self.tracks.pop_back()
    }

    /// All tracks, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    /// The `n` most recent tracks, oldest first
    pub fn recent(&self, n: usize) -> Vec<Track> {
        let skip = self.tracks.len().saturating_sub(n);
        self.tracks.iter().skip(skip).cloned().collect()
    }

    /// Replace contents, keeping the newest entries if `tracks` is too long
    pub fn replace(&mut self, tracks: impl IntoIterator<Item = Track>) {
        self.tracks.clear();
        for track in tracks {
            self.push(track);
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(50) // Default: 50 tracks
    }
}
