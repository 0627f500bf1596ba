//! Per-room state
//!
//! The authoritative record of one room. It is only ever mutated from inside
//! that room's serial lane; see [`crate::controller`].

use crate::history::History;
use crate::queue::TrackQueue;
use crate::timing::{Progress, Timing};
use discodj_core::types::{ResourceId, TrackKey, PERSISTED_HISTORY_LIMIT};
use discodj_core::{
    AudioFilter, AudioSink, LoopMode, PlayerStatus, RoomId, RoomSettings, RoomSnapshot, Track,
    VoiceConnection,
};
use std::sync::Arc;
use tokio::task::AbortHandle;

pub struct RoomState {
    id: RoomId,
    pub queue: TrackQueue,
    pub history: History,
    now_playing: Option<Track>,
    pub timing: Timing,
    pub status: PlayerStatus,
    pub settings: RoomSettings,
    pub filter: Option<AudioFilter>,
    /// Up-next page shown on the panel; not persisted
    pub page: usize,
    pub(crate) sink: Option<Arc<dyn AudioSink>>,
    /// Resource the sink is playing for us; events for any other are stale
    pub(crate) current_resource: Option<ResourceId>,
    pub(crate) connection: Option<Arc<dyn VoiceConnection>>,
    pub(crate) refresh: Option<AbortHandle>,
}

impl RoomState {
    pub fn new(id: RoomId, history_size: usize) -> Self {
        Self {
            id,
            queue: TrackQueue::new(),
            history: History::new(history_size),
            now_playing: None,
            timing: Timing::default(),
            status: PlayerStatus::Idle,
            settings: RoomSettings::default(),
            filter: None,
            page: 0,
            sink: None,
            current_resource: None,
            connection: None,
            refresh: None,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn now_playing(&self) -> Option<&Track> {
        self.now_playing.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Whether a track with this identity is queued or playing
    pub fn holds(&self, key: TrackKey) -> bool {
        self.now_playing.as_ref().is_some_and(|t| t.key == key) || self.queue.contains(key)
    }

    /// Give `track` a new identity if one with the same key is already here
    pub fn admit(&self, mut track: Track) -> Track {
        if self.holds(track.key) {
            track.key = TrackKey::generate();
        }
        track
    }

    /// Make `track` current, starting at `seek_sec`
    pub fn begin(&mut self, track: Track, resource: ResourceId, now_ms: u64, seek_sec: f64) {
        self.now_playing = Some(track);
        self.current_resource = Some(resource);
        self.timing.on_track_start(now_ms, seek_sec);
        self.status = PlayerStatus::Playing;
    }

    /// Retire the current track into history and apply the loop policy
    ///
    /// A manual skip does not replay the track under `LoopMode::One`; it is
    /// treated like `Off` for that track. Returns the finished track.
    pub fn finish_current(&mut self, manual: bool) -> Option<Track> {
        let finished = self.now_playing.take();
        self.clear_playback();

        let track = finished?;
        self.history.push(track.clone());
        match self.settings.loop_mode {
            LoopMode::One if !manual => self.queue.push_front(track.clone()),
            LoopMode::All => self.queue.push_back(track.clone()),
            LoopMode::One | LoopMode::Off => {}
        }
        Some(track)
    }

    /// Take the current track without touching history, for restarts
    pub fn take_current(&mut self) -> Option<Track> {
        let track = self.now_playing.take();
        self.clear_playback();
        track
    }

    /// Forget the current track, timing and resource
    pub fn clear_playback(&mut self) {
        self.now_playing = None;
        self.current_resource = None;
        self.timing.reset();
        self.status = PlayerStatus::Idle;
    }

    /// Progress of the current track, `None` when idle
    pub fn progress(&self, now_ms: u64, hardware_ms: Option<f64>) -> Option<Progress> {
        let track = self.now_playing.as_ref()?;
        Some(self.timing.progress(now_ms, hardware_ms, track.known_duration()))
    }

    /// Number of up-next pages for `page_size`, at least one
    pub fn page_count(&self, page_size: usize) -> usize {
        self.queue.len().div_ceil(page_size.max(1)).max(1)
    }

    /// Move the page cursor by `delta`, clamped into range
    pub fn turn_page(&mut self, delta: i64, page_size: usize) -> usize {
        let last = self.page_count(page_size) - 1;
        let target = (self.page as i64).saturating_add(delta).clamp(0, last as i64);
        self.page = target as usize;
        self.page
    }

    /// Page cursor clamped to the current queue length
    pub fn clamped_page(&self, page_size: usize) -> usize {
        self.page.min(self.page_count(page_size) - 1)
    }

    /// What gets persisted
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            queue: self.queue.to_vec(),
            history: self.history.recent(PERSISTED_HISTORY_LIMIT),
            settings: self.settings,
        }
    }

    /// Restore queue, history and settings from disk
    ///
    /// Playback state, connection and panel are left as they are.
    pub fn apply_snapshot(&mut self, snapshot: RoomSnapshot) {
        let RoomSnapshot {
            queue,
            history,
            settings,
        } = snapshot.truncated();

        self.queue.clear();
        for track in queue {
            let track = self.admit(track);
            self.queue.push_back(track);
        }
        self.history.replace(history);
        self.settings = RoomSettings {
            volume: settings.volume.min(discodj_core::types::MAX_VOLUME),
            ..settings
        };
        self.page = 0;
    }

    /// True when the current track is not also queued
    pub fn is_exclusive(&self) -> bool {
        self.now_playing
            .as_ref()
            .map_or(true, |current| !self.queue.contains(current.key))
    }
}

impl std::fmt::Debug for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomState")
            .field("id", &self.id)
            .field("now_playing", &self.now_playing.as_ref().map(|t| &t.title))
            .field("queue", &self.queue.len())
            .field("history", &self.history.len())
            .field("status", &self.status)
            .field("settings", &self.settings)
            .field("connected", &self.connection.is_some())
            .finish_non_exhaustive()
    }
}
