//! Playback controller
//!
//! Owns the lifecycle of "what plays now" for every room. Each public
//! operation runs as one turn on the room's serial lane: it locks the room,
//! mutates it, then persists and refreshes the panel before the next queued
//! operation for that room may start.
//!
//! Sink status callbacks re-enter through the same lane. Every resource handed
//! to a sink is tagged with a fresh [`ResourceId`]; events for a resource that
//! is no longer current are dropped, so stopping a track to seek, skip or jump
//! never looks like the track ending on its own.
//!
//! Side calls that are allowed to fail (presence, panel pushes, persistence,
//! autoplay lookups) are logged and swallowed in one place each.

use crate::error::{PlaybackError, Result};
use crate::executor::SerialExecutor;
use crate::panel::{is_live, panel_hash, render, PanelLayout};
use crate::refresh::{spawn_refresh_loop, stop_refresh_loop};
use crate::registry::{RoomHandle, RoomRegistry};
use crate::room::RoomState;
use crate::sync::{PanelSlot, PanelSync, PendingPush};
use crate::timing::Progress;
use crate::types::{EnqueuePosition, PlaybackConfig};
use discodj_core::types::{PanelRef, ResourceId, SinkEvent, SurfaceId};
use discodj_core::{
    AudioFilter, AudioSink, Clock, DisplaySurface, DjError, LoopMode, PlayerStatus, Presence,
    Requester, ResourceFactory, Resolver, RoomId, RoomSettings, RoomSnapshot, SnapshotStore,
    StatusListener, Track, VoiceConnection, VoiceContext, VoiceProvider,
};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

/// Everything the controller talks to
#[derive(Clone)]
pub struct Collaborators {
    pub resolver: Arc<dyn Resolver>,
    pub resources: Arc<dyn ResourceFactory>,
    pub voice: Arc<dyn VoiceProvider>,
    pub surface: Arc<dyn DisplaySurface>,
    pub presence: Arc<dyn Presence>,
    pub store: Arc<dyn SnapshotStore>,
    pub clock: Arc<dyn Clock>,
}

/// Result of a play request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayOutcome {
    /// Tracks added to the queue
    pub added: usize,
    /// Title of the first added track
    pub first_title: String,
    /// Whether playback started because the room was idle
    pub started: bool,
}

/// Read-only view of a room
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub now_playing: Option<Track>,
    pub queue: Vec<Track>,
    /// Oldest first
    pub history: Vec<Track>,
    pub status: PlayerStatus,
    pub settings: RoomSettings,
    pub filter: Option<AudioFilter>,
    pub progress: Option<Progress>,
    pub connected: bool,
    pub page: usize,
    /// Whether the progress refresh loop is running
    pub refreshing: bool,
}

/// A room locked for the duration of one operation
struct Turn {
    room: RoomHandle,
    state: OwnedMutexGuard<RoomState>,
}

pub struct PlaybackController {
    config: PlaybackConfig,
    registry: Arc<RoomRegistry>,
    executor: SerialExecutor<RoomId>,
    deps: Collaborators,
    panels: PanelSync,
    next_resource: AtomicU64,
    this: Weak<Self>,
}

impl PlaybackController {
    pub fn new(config: PlaybackConfig, registry: Arc<RoomRegistry>, deps: Collaborators) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            panels: PanelSync::new(Arc::clone(&deps.surface)),
            config,
            registry,
            executor: SerialExecutor::new(),
            deps,
            next_resource: AtomicU64::new(0),
            this: this.clone(),
        })
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Where the room's panel currently lives
    pub fn panel_ref(&self, room: &RoomId) -> Option<PanelRef> {
        self.registry.get(room).and_then(|handle| handle.panel.panel_ref())
    }

    // ----- Connection -----

    /// Join the requester's voice channel unless already connected
    ///
    /// Returns `None` when the requester is not in a voice channel. Status
    /// callbacks are wired once per new connection object, after the old
    /// wiring has been removed.
    pub async fn ensure_connected(
        &self,
        room: &RoomId,
        context: &VoiceContext,
    ) -> Result<Option<Arc<dyn VoiceConnection>>> {
        if context.channel.is_none() {
            return Ok(None);
        }
        let context = context.clone();
        self.with_room(room, move |this, mut turn| async move {
            this.connect_locked(&mut turn, &context).await.map(Some)
        })
        .await
    }

    /// React to a change in the number of human listeners
    ///
    /// With nobody left the room leaves voice: the connection is destroyed,
    /// playback is auto-paused, the refresh loop stops and presence clears.
    /// Returns whether the room left.
    pub async fn on_membership_change(&self, room: &RoomId, listeners: usize) -> Result<bool> {
        if listeners > 0 {
            return Ok(false);
        }
        self.with_room(room, |this, mut turn| async move {
            let Some(connection) = turn.state.connection.take() else {
                return Ok(false);
            };
            connection.destroy();
            if turn.state.status == PlayerStatus::Playing {
                if let Some(sink) = &turn.state.sink {
                    sink.pause();
                }
                let now = this.now_ms();
                turn.state.timing.on_pause(now);
                turn.state.status = PlayerStatus::AutoPaused;
            }
            stop_refresh_loop(&mut turn.state.refresh);
            this.presence_clear();
            info!(room = %turn.room.id, "no listeners left, left voice");
            this.refresh_panel(&turn, true).await;
            Ok(true)
        })
        .await
    }

    /// Handle a status transition reported by the room's sink
    pub async fn on_sink_event(&self, room: &RoomId, event: SinkEvent) -> Result<()> {
        self.with_room(room, move |this, mut turn| async move {
            if turn.state.current_resource != Some(event.resource) {
                debug!(room = %turn.room.id, resource = %event.resource, status = ?event.status, "stale sink event ignored");
                return Ok(());
            }
            match event.status {
                PlayerStatus::Idle => this.track_end_locked(&mut turn, false).await,
                PlayerStatus::Playing => {
                    if turn.state.status.is_paused() {
                        this.mark_resumed(&mut turn);
                    }
                    turn.state.status = PlayerStatus::Playing;
                    this.refresh_panel(&turn, false).await;
                }
                PlayerStatus::Paused | PlayerStatus::AutoPaused => {
                    if !turn.state.status.is_paused() {
                        this.mark_paused(&mut turn);
                    }
                    turn.state.status = event.status;
                    this.refresh_panel(&turn, true).await;
                }
            }
            Ok(())
        })
        .await
    }

    // ----- Queueing -----

    /// Resolve `query`, queue the result and start playing if idle
    ///
    /// Joining and resolution happen inside the room's turn, so plays for one
    /// room queue their tracks in the order they were submitted. The lookup is
    /// bounded by the resolve timeout.
    pub async fn play(
        &self,
        room: &RoomId,
        context: &VoiceContext,
        surface: Option<SurfaceId>,
        query: &str,
        requester: &Requester,
        position: EnqueuePosition,
    ) -> Result<PlayOutcome> {
        if context.channel.is_none() {
            return Err(PlaybackError::NotInVoice);
        }
        let context = context.clone();
        let query = query.to_string();
        let requester = requester.clone();

        self.with_room(room, move |this, mut turn| async move {
            this.connect_locked(&mut turn, &context).await?;

            let tracks = this
                .bounded("resolve", this.deps.resolver.resolve(&query, &requester))
                .await?;
            let Some(first_title) = tracks.first().map(|t| t.title.clone()) else {
                return Err(PlaybackError::NoResults(query));
            };
            let added = tracks.len();
            info!(room = %turn.room.id, query = %query, added, "resolved play request");

            if let Some(surface) = surface {
                turn.room.panel.attach(surface);
            }
            this.enqueue_locked(&mut turn.state, tracks, position);

            let started = if turn.state.now_playing().is_none() {
                this.play_next_locked(&mut turn, 0.0).await;
                turn.state.now_playing().is_some()
            } else {
                this.refresh_panel(&turn, true).await;
                this.persist(&turn).await;
                false
            };
            Ok(PlayOutcome {
                added,
                first_title,
                started,
            })
        })
        .await
    }

    /// Add tracks to the queue without starting playback
    pub async fn enqueue(&self, room: &RoomId, tracks: Vec<Track>, position: EnqueuePosition) -> Result<usize> {
        self.with_room(room, move |this, mut turn| async move {
            let added = this.enqueue_locked(&mut turn.state, tracks, position);
            this.persist(&turn).await;
            this.refresh_panel(&turn, true).await;
            Ok(added)
        })
        .await
    }

    pub async fn remove(&self, room: &RoomId, index: usize) -> Result<Track> {
        self.with_room(room, move |this, mut turn| async move {
            let removed = turn.state.queue.remove(index)?;
            this.persist(&turn).await;
            this.refresh_panel(&turn, true).await;
            Ok(removed)
        })
        .await
    }

    pub async fn move_track(&self, room: &RoomId, from: usize, to: usize) -> Result<()> {
        self.with_room(room, move |this, mut turn| async move {
            turn.state.queue.move_track(from, to)?;
            this.persist(&turn).await;
            this.refresh_panel(&turn, true).await;
            Ok(())
        })
        .await
    }

    /// Empty the queue, leaving the current track alone
    pub async fn clear_queue(&self, room: &RoomId) -> Result<usize> {
        self.with_room(room, |this, mut turn| async move {
            let dropped = turn.state.queue.clear();
            turn.state.page = 0;
            this.persist(&turn).await;
            this.refresh_panel(&turn, true).await;
            Ok(dropped)
        })
        .await
    }

    /// Randomize the queue; needs at least two tracks
    pub async fn shuffle(&self, room: &RoomId) -> Result<usize> {
        self.with_room(room, |this, mut turn| async move {
            let len = turn.state.queue.len();
            if len < 2 {
                return Err(PlaybackError::InvalidRequest(
                    "need at least two queued tracks to shuffle".into(),
                ));
            }
            turn.state.queue.shuffle();
            this.persist(&turn).await;
            this.refresh_panel(&turn, true).await;
            Ok(len)
        })
        .await
    }

    // ----- Transport -----

    /// Start the front of the queue, optionally from `seek_sec`
    ///
    /// A track that is current when this is called is retired into history
    /// without looping.
    pub async fn play_next(&self, room: &RoomId, seek_sec: Option<f64>) -> Result<()> {
        self.with_room(room, move |this, mut turn| async move {
            if let Some(current) = turn.state.take_current() {
                this.stop_sink(&turn.state);
                turn.state.history.push(current);
            }
            this.play_next_locked(&mut turn, seek_sec.unwrap_or(0.0)).await;
            Ok(())
        })
        .await
    }

    /// The current resource finished on its own
    pub async fn handle_track_end(&self, room: &RoomId) -> Result<()> {
        self.with_room(room, |this, mut turn| async move {
            this.track_end_locked(&mut turn, false).await;
            Ok(())
        })
        .await
    }

    /// End the current track early; the queue is kept
    pub async fn skip(&self, room: &RoomId) -> Result<Track> {
        self.with_room(room, |this, mut turn| async move {
            let skipped = turn
                .state
                .now_playing()
                .cloned()
                .ok_or(PlaybackError::NothingPlaying)?;
            this.stop_sink(&turn.state);
            this.track_end_locked(&mut turn, true).await;
            Ok(skipped)
        })
        .await
    }

    /// Stop playback and clear the queue
    pub async fn stop(&self, room: &RoomId) -> Result<()> {
        self.with_room(room, |this, mut turn| async move {
            this.stop_locked(&mut turn);
            this.persist(&turn).await;
            this.refresh_panel(&turn, true).await;
            Ok(())
        })
        .await
    }

    /// Stop, leave voice and delete the panel
    pub async fn leave(&self, room: &RoomId) -> Result<bool> {
        self.with_room(room, |this, mut turn| async move {
            this.stop_locked(&mut turn);
            let was_connected = match turn.state.connection.take() {
                Some(connection) => {
                    connection.destroy();
                    true
                }
                None => false,
            };
            let panel = turn.room.panel.panel_ref();
            turn.room.panel.detach();
            if let Some(message) = panel.and_then(|p| p.message_ref()) {
                if let Err(e) = this.deps.surface.delete_message(&message).await {
                    warn!(room = %turn.room.id, error = %e, "panel not deleted");
                }
            }
            this.persist(&turn).await;
            info!(room = %turn.room.id, was_connected, "left room");
            Ok(was_connected)
        })
        .await
    }

    /// Play the most recent history entry; the current track follows it
    ///
    /// With no history the current track restarts from the beginning.
    pub async fn previous(&self, room: &RoomId) -> Result<()> {
        self.with_room(room, |this, mut turn| async move {
            let previous = turn.state.history.pop();
            if previous.is_none() && turn.state.now_playing().is_none() {
                return Err(PlaybackError::NoPrevious);
            }
            if let Some(current) = turn.state.take_current() {
                this.stop_sink(&turn.state);
                turn.state.queue.push_front(current);
            }
            if let Some(previous) = previous {
                let previous = turn.state.admit(previous);
                turn.state.queue.push_front(previous);
            }
            this.play_next_locked(&mut turn, 0.0).await;
            Ok(())
        })
        .await
    }

    /// Returns `false` if already paused
    pub async fn pause(&self, room: &RoomId) -> Result<bool> {
        self.with_room(room, |this, mut turn| async move {
            this.pause_locked(&mut turn).await
        })
        .await
    }

    /// Returns `false` if not paused
    pub async fn resume(&self, room: &RoomId) -> Result<bool> {
        self.with_room(room, |this, mut turn| async move {
            this.resume_locked(&mut turn).await
        })
        .await
    }

    /// Pause when playing, resume when paused; returns whether now paused
    pub async fn toggle_pause(&self, room: &RoomId) -> Result<bool> {
        self.with_room(room, |this, mut turn| async move {
            if turn.state.status.is_paused() {
                this.resume_locked(&mut turn).await?;
                Ok(false)
            } else {
                this.pause_locked(&mut turn).await?;
                Ok(true)
            }
        })
        .await
    }

    /// Restart the current track from `target_sec`
    ///
    /// The transcode pipeline cannot seek in place, so the track goes back to
    /// the front of the queue and starts again at the new offset.
    pub async fn seek(&self, room: &RoomId, target_sec: f64) -> Result<()> {
        self.with_room(room, move |this, mut turn| async move {
            let current = turn.state.now_playing().ok_or(PlaybackError::NothingPlaying)?;
            if !target_sec.is_finite() || target_sec < 0.0 {
                return Err(PlaybackError::InvalidTimestamp(target_sec.to_string()));
            }
            if let Some(duration) = current.known_duration() {
                if target_sec > duration {
                    return Err(PlaybackError::InvalidTimestamp(format!(
                        "{} is past the end of the track ({})",
                        crate::panel::format_time(target_sec),
                        crate::panel::format_time(duration)
                    )));
                }
            }
            this.restart_current(&mut turn, target_sec).await;
            Ok(())
        })
        .await
    }

    /// Change the audio effect, keeping the playback position
    pub async fn apply_filter(&self, room: &RoomId, filter: Option<AudioFilter>) -> Result<()> {
        self.with_room(room, move |this, mut turn| async move {
            turn.state.filter = filter;
            info!(room = %turn.room.id, filter = ?filter.map(AudioFilter::key), "filter changed");
            let position = turn
                .state
                .progress(this.now_ms(), this.hardware_ms(&turn.state))
                .map(|p| p.elapsed);
            match position {
                Some(elapsed) => this.restart_current(&mut turn, elapsed).await,
                None => this.refresh_panel(&turn, true).await,
            }
            Ok(())
        })
        .await
    }

    /// Play the queued track at `index` right away
    pub async fn jump(&self, room: &RoomId, index: usize) -> Result<()> {
        self.with_room(room, move |this, mut turn| async move {
            turn.state.queue.promote(index)?;
            if turn.state.now_playing().is_some() {
                this.stop_sink(&turn.state);
                this.track_end_locked(&mut turn, true).await;
            } else {
                this.play_next_locked(&mut turn, 0.0).await;
            }
            Ok(())
        })
        .await
    }

    // ----- Settings -----

    /// Set volume percentage, clamped to 0-200; applied live
    pub async fn set_volume(&self, room: &RoomId, percent: i64) -> Result<u16> {
        let volume = percent.clamp(0, i64::from(discodj_core::types::MAX_VOLUME)) as u16;
        self.with_room(room, move |this, mut turn| async move {
            turn.state.settings.volume = volume;
            if let Some(sink) = &turn.state.sink {
                sink.set_volume(turn.state.settings.volume_ratio());
            }
            this.persist(&turn).await;
            this.refresh_panel(&turn, true).await;
            Ok(volume)
        })
        .await
    }

    pub async fn set_loop(&self, room: &RoomId, mode: LoopMode) -> Result<LoopMode> {
        self.update_settings(room, move |settings| settings.loop_mode = mode)
            .await
            .map(|settings| settings.loop_mode)
    }

    pub async fn set_autoplay(&self, room: &RoomId, enabled: bool) -> Result<bool> {
        self.update_settings(room, move |settings| settings.autoplay = enabled)
            .await
            .map(|settings| settings.autoplay)
    }

    pub async fn set_dj_only(&self, room: &RoomId, enabled: bool) -> Result<bool> {
        self.update_settings(room, move |settings| settings.dj_only = enabled)
            .await
            .map(|settings| settings.dj_only)
    }

    /// Current settings without waiting for the room's lane
    pub async fn settings(&self, room: &RoomId) -> RoomSettings {
        match self.registry.get(room) {
            Some(handle) => handle.state.lock().await.settings,
            None => RoomSettings::default(),
        }
    }

    async fn update_settings<F>(&self, room: &RoomId, update: F) -> Result<RoomSettings>
    where
        F: FnOnce(&mut RoomSettings) + Send + 'static,
    {
        self.with_room(room, move |this, mut turn| async move {
            update(&mut turn.state.settings);
            this.persist(&turn).await;
            this.refresh_panel(&turn, true).await;
            Ok(turn.state.settings)
        })
        .await
    }

    // ----- Panel -----

    /// Post (or re-post) the panel on `surface`
    pub async fn show_panel(&self, room: &RoomId, surface: SurfaceId) -> Result<()> {
        self.with_room(room, move |this, turn| async move {
            turn.room.panel.attach(surface);
            this.refresh_panel(&turn, true).await;
            Ok(())
        })
        .await
    }

    /// Move the up-next page cursor; returns the new page
    pub async fn turn_page(&self, room: &RoomId, delta: i64) -> Result<usize> {
        self.with_room(room, move |this, mut turn| async move {
            let page = turn.state.turn_page(delta, this.config.page_size);
            this.refresh_panel(&turn, true).await;
            Ok(page)
        })
        .await
    }

    // ----- Lifecycle -----

    /// Restore the room's persisted queue, history and settings
    pub async fn load_room(&self, room: &RoomId) -> Result<usize> {
        self.with_room(room, |this, mut turn| async move {
            let snapshot = this.deps.store.load(&turn.room.id).await;
            turn.state.apply_snapshot(snapshot);
            if let Some(sink) = &turn.state.sink {
                sink.set_volume(turn.state.settings.volume_ratio());
            }
            let queued = turn.state.queue.len();
            info!(room = %turn.room.id, queued, history = turn.state.history.len(), "room restored");
            this.refresh_panel(&turn, true).await;
            Ok(queued)
        })
        .await
    }

    pub async fn info(&self, room: &RoomId) -> Result<RoomInfo> {
        self.with_room(room, |this, turn| async move {
            let state = &*turn.state;
            Ok(RoomInfo {
                now_playing: state.now_playing().cloned(),
                queue: state.queue.to_vec(),
                history: state.history.iter().cloned().collect(),
                status: state.status,
                settings: state.settings,
                filter: state.filter,
                progress: state.progress(this.now_ms(), this.hardware_ms(state)),
                connected: state.is_connected(),
                page: state.page,
                refreshing: state.refresh.is_some(),
            })
        })
        .await
    }

    pub async fn snapshot(&self, room: &RoomId) -> Result<RoomSnapshot> {
        self.with_room(room, |_, turn| async move { Ok(turn.state.snapshot()) })
            .await
    }

    /// Persist every room, stop refresh loops and leave all voice channels
    pub async fn shutdown(&self) -> Result<()> {
        let rooms = self.registry.all();
        info!(rooms = rooms.len(), "shutting down playback");
        for handle in rooms {
            let room = handle.id.clone();
            let outcome = self
                .with_room(&room, |this, mut turn| async move {
                    stop_refresh_loop(&mut turn.state.refresh);
                    this.persist(&turn).await;
                    if let Some(connection) = turn.state.connection.take() {
                        connection.destroy();
                    }
                    if let Some(sink) = turn.state.sink.take() {
                        sink.set_listener(None);
                        sink.stop();
                    }
                    turn.state.clear_playback();
                    Ok(())
                })
                .await;
            if let Err(e) = outcome {
                warn!(room = %room, error = %e, "room shutdown failed");
            }
        }
        self.presence_clear();
        Ok(())
    }

    // ----- Turn plumbing -----

    /// Run `op` as one turn on the room's serial lane
    async fn with_room<T, F, Fut>(&self, room: &RoomId, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<Self>, Turn) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let this = self
            .this
            .upgrade()
            .ok_or_else(|| PlaybackError::Executor("controller shut down".into()))?;
        let handle = self.registry.get_or_create(room);
        self.executor
            .run(room.clone(), async move {
                let state = Arc::clone(&handle.state).lock_owned().await;
                op(this, Turn { room: handle, state }).await
            })
            .await?
    }

    async fn connect_locked(&self, turn: &mut Turn, context: &VoiceContext) -> Result<Arc<dyn VoiceConnection>> {
        let room = turn.room.id.clone();
        let connection = match self.deps.voice.get_existing(&room) {
            Some(existing) => existing,
            None => self.deps.voice.join(&room, context).await?,
        };

        let already_wired = turn
            .state
            .connection
            .as_ref()
            .is_some_and(|current| current.id() == connection.id());
        if !already_wired {
            let sink = self.sink_for(&mut turn.state);
            sink.set_listener(None);
            connection.subscribe(Arc::clone(&sink));
            sink.set_listener(Some(self.status_listener(room.clone())));
            turn.state.connection = Some(Arc::clone(&connection));
            info!(room = %room, connection = ?connection.id(), "voice connection wired");

            if turn.state.status == PlayerStatus::AutoPaused {
                self.resume_locked(turn).await?;
            }
        }
        Ok(connection)
    }

    fn enqueue_locked(&self, state: &mut RoomState, tracks: Vec<Track>, position: EnqueuePosition) -> usize {
        let mut admitted = Vec::with_capacity(tracks.len());
        for track in tracks {
            let track = state.admit(track);
            admitted.push(track);
        }
        let added = admitted.len();
        if position.is_front() {
            state.queue.extend_front(admitted);
        } else {
            state.queue.extend_back(admitted);
        }
        debug!(room = %state.id(), added, ?position, queued = state.queue.len(), "tracks enqueued");
        added
    }

    /// Pop and start tracks until one plays, the queue runs dry, or too many
    /// fail in a row
    async fn play_next_locked(&self, turn: &mut Turn, seek_sec: f64) {
        let max_failures = self.config.max_consecutive_failures.max(1);
        let mut seek_sec = seek_sec;
        let mut failures = 0;

        loop {
            let Some(track) = turn.state.queue.pop_front() else {
                self.settle_idle(turn).await;
                return;
            };
            let title = track.title.clone();

            match self.start_track(&mut turn.state, track, seek_sec).await {
                Ok(()) => {
                    info!(room = %turn.room.id, track = %title, seek_sec, "track started");
                    self.start_refresh(turn);
                    self.presence_playing(&title);
                    self.refresh_panel(turn, true).await;
                    self.persist(turn).await;
                    return;
                }
                Err(e) => {
                    failures += 1;
                    warn!(room = %turn.room.id, track = %title, attempt = failures, error = %e, "track failed to start");
                    // Offsets belong to the track that failed
                    seek_sec = 0.0;
                    if failures >= max_failures {
                        self.give_up(turn, failures).await;
                        return;
                    }
                }
            }
        }
    }

    async fn start_track(&self, state: &mut RoomState, mut track: Track, seek_sec: f64) -> discodj_core::Result<()> {
        if track.is_placeholder() {
            self.resolve_placeholder(&mut track).await?;
        }
        let resource = self
            .bounded(
                "make resource",
                self.deps.resources.make_resource(&track, seek_sec, state.filter),
            )
            .await?;

        let sink = self.sink_for(state);
        let id = ResourceId(self.next_resource.fetch_add(1, Ordering::Relaxed) + 1);
        sink.set_volume(state.settings.volume_ratio());
        sink.play(id, resource)?;
        state.begin(track, id, self.now_ms(), seek_sec);
        Ok(())
    }

    async fn resolve_placeholder(&self, track: &mut Track) -> discodj_core::Result<()> {
        let query = track.lazy_query.clone().unwrap_or_default();
        let requester = Requester::new(track.requested_by_id.clone(), track.requested_by_tag.clone());
        let found = self
            .bounded("resolve placeholder", self.deps.resolver.resolve(&query, &requester))
            .await?;
        let resolved = found
            .first()
            .ok_or_else(|| DjError::resolution(format!("no match for '{}'", query)))?;
        if !track.resolve_placeholder(resolved) {
            return Err(DjError::resolution(format!("'{}' resolved to nothing playable", query)));
        }
        debug!(query = %query, url = ?track.url, "placeholder resolved");
        Ok(())
    }

    async fn track_end_locked(&self, turn: &mut Turn, manual: bool) {
        let finished = turn.state.finish_current(manual);
        stop_refresh_loop(&mut turn.state.refresh);
        if let Some(track) = &finished {
            debug!(room = %turn.room.id, track = %track.title, manual, "track ended");
        }
        self.persist(turn).await;

        if turn.state.queue.is_empty() && turn.state.settings.autoplay {
            if let Some(seed) = &finished {
                self.autoplay(&mut turn.state, seed).await;
            }
        }
        self.play_next_locked(turn, 0.0).await;
    }

    /// Best effort: a failed lookup only means the queue stays empty
    async fn autoplay(&self, state: &mut RoomState, seed: &Track) {
        match self
            .bounded("find related", self.deps.resolver.find_related(seed))
            .await
        {
            Ok(Some(related)) => {
                let related = state.admit(related);
                info!(room = %state.id(), seed = %seed.title, track = %related.title, "autoplay queued related track");
                state.queue.push_back(related);
            }
            Ok(None) => debug!(room = %state.id(), seed = %seed.title, "autoplay found nothing"),
            Err(e) => debug!(room = %state.id(), error = %e, "autoplay lookup failed"),
        }
    }

    async fn restart_current(&self, turn: &mut Turn, from_sec: f64) {
        if let Some(current) = turn.state.take_current() {
            self.stop_sink(&turn.state);
            turn.state.queue.push_front(current);
        }
        self.play_next_locked(turn, from_sec).await;
    }

    fn stop_locked(&self, turn: &mut Turn) {
        let dropped = turn.state.queue.clear();
        self.stop_sink(&turn.state);
        turn.state.clear_playback();
        turn.state.page = 0;
        stop_refresh_loop(&mut turn.state.refresh);
        self.presence_clear();
        info!(room = %turn.room.id, dropped, "playback stopped");
    }

    async fn pause_locked(&self, turn: &mut Turn) -> Result<bool> {
        if turn.state.now_playing().is_none() {
            return Err(PlaybackError::NothingPlaying);
        }
        if turn.state.status.is_paused() {
            return Ok(false);
        }
        if let Some(sink) = &turn.state.sink {
            sink.pause();
        }
        self.mark_paused(turn);
        turn.state.status = PlayerStatus::Paused;
        self.refresh_panel(turn, true).await;
        Ok(true)
    }

    async fn resume_locked(&self, turn: &mut Turn) -> Result<bool> {
        if turn.state.now_playing().is_none() {
            return Err(PlaybackError::NothingPlaying);
        }
        if !turn.state.status.is_paused() {
            return Ok(false);
        }
        if let Some(sink) = &turn.state.sink {
            sink.resume();
        }
        self.mark_resumed(turn);
        turn.state.status = PlayerStatus::Playing;
        self.refresh_panel(turn, true).await;
        Ok(true)
    }

    fn mark_paused(&self, turn: &mut Turn) {
        let now = self.now_ms();
        turn.state.timing.on_pause(now);
        stop_refresh_loop(&mut turn.state.refresh);
        self.presence_clear();
    }

    fn mark_resumed(&self, turn: &mut Turn) {
        let now = self.now_ms();
        turn.state.timing.on_resume(now);
        self.start_refresh(turn);
        if let Some(title) = turn.state.now_playing().map(|t| t.title.clone()) {
            self.presence_playing(&title);
        }
    }

    async fn settle_idle(&self, turn: &mut Turn) {
        turn.state.clear_playback();
        stop_refresh_loop(&mut turn.state.refresh);
        self.presence_clear();
        debug!(room = %turn.room.id, "queue exhausted");
        self.refresh_panel(turn, true).await;
        self.persist(turn).await;
    }

    async fn give_up(&self, turn: &mut Turn, failures: u32) {
        warn!(room = %turn.room.id, failures, "giving up after consecutive playback failures");
        turn.state.clear_playback();
        stop_refresh_loop(&mut turn.state.refresh);
        self.presence_clear();

        if let Some(panel) = turn.room.panel.panel_ref() {
            let notice = format!("Couldn't play {} tracks in a row, stopping playback.", failures);
            if let Err(e) = self.deps.surface.notify(&panel.surface, &notice).await {
                warn!(room = %turn.room.id, error = %e, "failure notice not delivered");
            }
        }
        self.refresh_panel(turn, true).await;
        self.persist(turn).await;
    }

    // ----- Sink -----

    fn sink_for(&self, state: &mut RoomState) -> Arc<dyn AudioSink> {
        if let Some(sink) = &state.sink {
            return Arc::clone(sink);
        }
        let sink = self.deps.voice.create_sink(state.id());
        sink.set_volume(state.settings.volume_ratio());
        sink.set_listener(Some(self.status_listener(state.id().clone())));
        state.sink = Some(Arc::clone(&sink));
        sink
    }

    /// Stop the sink; the resulting idle event is stale once the caller
    /// clears or replaces the current resource
    fn stop_sink(&self, state: &RoomState) {
        if let Some(sink) = &state.sink {
            sink.stop();
        }
    }

    /// Callback that feeds sink events back through the room's lane
    fn status_listener(&self, room: RoomId) -> StatusListener {
        let controller = self.this.clone();
        let runtime = tokio::runtime::Handle::current();
        Arc::new(move |event: SinkEvent| {
            let Some(controller) = controller.upgrade() else {
                return;
            };
            let room = room.clone();
            runtime.spawn(async move {
                if let Err(e) = controller.on_sink_event(&room, event).await {
                    warn!(room = %room, error = %e, "sink event handling failed");
                }
            });
        })
    }

    fn hardware_ms(&self, state: &RoomState) -> Option<f64> {
        state.current_resource?;
        state.sink.as_ref().and_then(|sink| sink.playback_duration_ms())
    }

    fn now_ms(&self) -> u64 {
        self.deps.clock.now_ms()
    }

    // ----- Refresh loop -----

    fn start_refresh(&self, turn: &mut Turn) {
        stop_refresh_loop(&mut turn.state.refresh);
        let controller = self.this.clone();
        let room = turn.room.clone();
        turn.state.refresh = Some(spawn_refresh_loop(self.config.refresh_interval, move || {
            let controller = controller.clone();
            let room = room.clone();
            async move {
                match controller.upgrade() {
                    Some(controller) => controller.refresh_tick(&room).await,
                    None => false,
                }
            }
        }));
    }

    /// One refresh loop tick; `false` ends the loop
    ///
    /// Skipped while the room is busy with an operation, which refreshes the
    /// panel itself when done.
    async fn refresh_tick(&self, room: &RoomHandle) -> bool {
        let pending = {
            let Ok(state) = room.state.try_lock() else {
                return true;
            };
            if state.now_playing().is_none() {
                return false;
            }
            if !is_live(state.status) {
                return true;
            }
            self.schedule_panel(&room.panel, &state, false)
        };
        if let Some(pending) = pending {
            self.push_panel(&room.id, pending).await;
        }
        true
    }

    // ----- Best-effort side calls -----

    fn layout(&self) -> PanelLayout {
        PanelLayout {
            page_size: self.config.page_size,
            progress_slots: self.config.progress_slots,
        }
    }

    fn schedule_panel(&self, slot: &Arc<PanelSlot>, state: &RoomState, force: bool) -> Option<PendingPush> {
        let progress = state.progress(self.now_ms(), self.hardware_ms(state));
        let hash = panel_hash(state, progress);
        self.panels
            .schedule(slot, render(state, progress, self.layout()), hash, force)
    }

    async fn refresh_panel(&self, turn: &Turn, force: bool) {
        if let Some(pending) = self.schedule_panel(&turn.room.panel, &turn.state, force) {
            self.push_panel(&turn.room.id, pending).await;
        }
    }

    async fn push_panel(&self, room: &RoomId, pending: PendingPush) {
        match self.panels.push(pending).await {
            Ok(outcome) => debug!(room = %room, ?outcome, "panel pushed"),
            Err(e) => warn!(room = %room, error = %e, "panel push failed"),
        }
    }

    async fn persist(&self, turn: &Turn) {
        if let Err(e) = self.deps.store.save(&turn.room.id, &turn.state.snapshot()).await {
            warn!(room = %turn.room.id, error = %e, "snapshot not saved");
        }
    }

    fn presence_playing(&self, title: &str) {
        if let Err(e) = self.deps.presence.set_playing(title) {
            warn!(error = %e, "presence update failed");
        }
    }

    fn presence_clear(&self) {
        if let Err(e) = self.deps.presence.clear() {
            warn!(error = %e, "presence clear failed");
        }
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        fut: impl Future<Output = discodj_core::Result<T>>,
    ) -> discodj_core::Result<T> {
        match tokio::time::timeout(self.config.resolve_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(DjError::timeout(operation, self.config.resolve_timeout)),
        }
    }
}
