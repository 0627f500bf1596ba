//! Up-next queue
//!
//! A single FIFO of tracks waiting to play. The current track is never in
//! here; the room moves it in and out explicitly.

use crate::error::{PlaybackError, Result};
use crate::shuffle::shuffle_tracks;
use discodj_core::types::TrackKey;
use discodj_core::Track;
use std::collections::VecDeque;

#[derive(Debug, Clone, Default)]
pub struct TrackQueue {
    tracks: VecDeque<Track>,
}

impl TrackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tracks(tracks: impl IntoIterator<Item = Track>) -> Self {
        Self {
            tracks: tracks.into_iter().collect(),
        }
    }

    /// Append to the back
    pub fn push_back(&mut self, track: Track) {
        self.tracks.push_back(track);
    }

    /// Insert at the front
    pub fn push_front(&mut self, track: Track) {
        self.tracks.push_front(track);
    }

    /// Append several tracks in order
    pub fn extend_back(&mut self, tracks: impl IntoIterator<Item = Track>) {
        self.tracks.extend(tracks);
    }

    /// Insert several tracks at the front, keeping their relative order
    pub fn extend_front(&mut self, tracks: Vec<Track>) {
        for track in tracks.into_iter().rev() {
            self.tracks.push_front(track);
        }
    }

    /// Take the next track to play
    pub fn pop_front(&mut self) -> Option<Track> {
        self.tracks.pop_front()
    }

    pub fn front(&self) -> Option<&Track> {
        self.tracks.front()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Remove track at `index`
    pub fn remove(&mut self, index: usize) -> Result<Track> {
        let len = self.tracks.len();
        self.tracks
            .remove(index)
            .ok_or_else(|| PlaybackError::index_out_of_bounds(index, len))
    }

    /// Move track from `from` to `to`
    ///
    /// Both indices refer to positions before the move. Nothing changes if
    /// either is out of range.
    pub fn move_track(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.tracks.len();
        if from >= len {
            return Err(PlaybackError::index_out_of_bounds(from, len));
        }
        if to >= len {
            return Err(PlaybackError::index_out_of_bounds(to, len));
        }
        if from != to {
            if let Some(track) = self.tracks.remove(from) {
                self.tracks.insert(to, track);
            }
        }
        Ok(())
    }

    /// Move track at `index` to the front
    pub fn promote(&mut self, index: usize) -> Result<()> {
        let track = self.remove(index)?;
        self.tracks.push_front(track);
        Ok(())
    }

    /// Empty the queue, returning how many tracks were dropped
    pub fn clear(&mut self) -> usize {
        let dropped = self.tracks.len();
        self.tracks.clear();
        dropped
    }

    /// Randomize order
    pub fn shuffle(&mut self) {
        shuffle_tracks(self.tracks.make_contiguous());
    }

    pub fn contains(&self, key: TrackKey) -> bool {
        self.tracks.iter().any(|t| t.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    pub fn to_vec(&self) -> Vec<Track> {
        self.tracks.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use discodj_core::{Requester, TrackSource};

    fn create_test_track(title: &str) -> Track {
        Track::new(
            format!("https://youtu.be/{}", title),
            title,
            &Requester::new("1", "tester"),
            TrackSource::YouTube,
        )
    }

    fn queue_of(titles: &[&str]) -> TrackQueue {
        TrackQueue::from_tracks(titles.iter().map(|t| create_test_track(t)))
    }

    fn titles(queue: &TrackQueue) -> Vec<&str> {
        queue.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn front_insert_keeps_batch_order() {
        let mut queue = queue_of(&["c"]);
        queue.extend_front(vec![create_test_track("a"), create_test_track("b")]);
        assert_eq!(titles(&queue), vec!["a", "b", "c"]);

        queue.extend_back(vec![create_test_track("d")]);
        assert_eq!(titles(&queue), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn remove_validates_index() {
        let mut queue = queue_of(&["a", "b"]);
        assert!(matches!(
            queue.remove(2),
            Err(PlaybackError::IndexOutOfBounds { index: 2, len: 2 })
        ));
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.remove(0).unwrap().title, "a");
        assert_eq!(titles(&queue), vec!["b"]);
    }

    #[test]
    fn move_track_forward_and_back() {
        let mut queue = queue_of(&["a", "b", "c", "d"]);
        queue.move_track(0, 2).unwrap();
        assert_eq!(titles(&queue), vec!["b", "c", "a", "d"]);

        queue.move_track(3, 0).unwrap();
        assert_eq!(titles(&queue), vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn move_track_out_of_range_is_noop() {
        let mut queue = queue_of(&["a", "b"]);
        assert!(queue.move_track(0, 5).is_err());
        assert!(queue.move_track(5, 0).is_err());
        assert_eq!(titles(&queue), vec!["a", "b"]);
    }

    #[test]
    fn promote_moves_to_front() {
        let mut queue = queue_of(&["a", "b", "c"]);
        queue.promote(2).unwrap();
        assert_eq!(titles(&queue), vec!["c", "a", "b"]);
        assert!(queue.promote(3).is_err());
    }

    #[test]
    fn clear_reports_dropped() {
        let mut queue = queue_of(&["a", "b", "c"]);
        assert_eq!(queue.clear(), 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn contains_by_key() {
        let queue = queue_of(&["a"]);
        let key = queue.front().unwrap().key;
        assert!(queue.contains(key));
        assert!(!queue.contains(TrackKey::generate()));
    }
}
