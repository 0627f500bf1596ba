//! Hand-written collaborator fakes shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use discodj_core::types::{ConnectionId, MessageId, MessageRef, PanelPayload, ResourceId, SinkEvent, SurfaceId};
use discodj_core::{
    AudioFilter, AudioResource, AudioSink, DisplaySurface, DjError, ManualClock, PlayerStatus,
    Presence, Requester, ResourceFactory, Resolver, RoomId, RoomSnapshot, SnapshotStore,
    StatusListener, Track, TrackSource, VoiceConnection, VoiceContext, VoiceProvider,
};
use discodj_playback::{Collaborators, PlaybackConfig, PlaybackController, RoomRegistry};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn requester() -> Requester {
    Requester::new("100", "listener#0001")
}

pub fn track(title: &str) -> Track {
    Track::new(
        format!("https://www.youtube.com/watch?v={}", title),
        title,
        &requester(),
        TrackSource::YouTube,
    )
    .with_duration(Some(180.0))
}

pub fn tracks(titles: &[&str]) -> Vec<Track> {
    titles.iter().map(|t| track(t)).collect()
}

pub fn titles(tracks: &[Track]) -> Vec<String> {
    tracks.iter().map(|t| t.title.clone()).collect()
}

// ===== Resolver =====

#[derive(Default)]
pub struct FakeResolver {
    pub results: Mutex<HashMap<String, Vec<Track>>>,
    /// How long resolving a query takes
    pub delays: Mutex<HashMap<String, Duration>>,
    pub related: Mutex<Option<Track>>,
    pub fail_related: AtomicBool,
    pub resolve_calls: AtomicUsize,
    pub related_calls: AtomicUsize,
}

impl FakeResolver {
    pub fn answer(&self, query: &str, tracks: Vec<Track>) {
        self.results.lock().unwrap().insert(query.to_string(), tracks);
    }

    pub fn answer_after(&self, query: &str, delay: Duration, tracks: Vec<Track>) {
        self.delays.lock().unwrap().insert(query.to_string(), delay);
        self.answer(query, tracks);
    }
}

#[async_trait]
impl Resolver for FakeResolver {
    async fn resolve(&self, query: &str, _requester: &Requester) -> discodj_core::Result<Vec<Track>> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delays.lock().unwrap().get(query).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .results
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default())
    }

    async fn resolve_one(&self, url: &str) -> discodj_core::Result<Option<Track>> {
        Ok(self
            .results
            .lock()
            .unwrap()
            .values()
            .flatten()
            .find(|t| t.url.as_deref() == Some(url))
            .cloned())
    }

    async fn find_related(&self, _seed: &Track) -> discodj_core::Result<Option<Track>> {
        self.related_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_related.load(Ordering::SeqCst) {
            return Err(DjError::resolution("related lookup failed"));
        }
        Ok(self.related.lock().unwrap().clone())
    }
}

// ===== Resources =====

#[derive(Debug, Clone, PartialEq)]
pub struct MadeResource {
    pub title: String,
    pub seek: f64,
    pub filter: Option<AudioFilter>,
}

#[derive(Default)]
pub struct FakeResources {
    pub fail_all: AtomicBool,
    pub failing: Mutex<HashSet<String>>,
    pub attempts: AtomicUsize,
    pub made: Mutex<Vec<MadeResource>>,
}

impl FakeResources {
    pub fn fail_title(&self, title: &str) {
        self.failing.lock().unwrap().insert(title.to_string());
    }

    pub fn made(&self) -> Vec<MadeResource> {
        self.made.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceFactory for FakeResources {
    async fn make_resource(
        &self,
        track: &Track,
        seek_offset_sec: f64,
        filter: Option<AudioFilter>,
    ) -> discodj_core::Result<AudioResource> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_all.load(Ordering::SeqCst) || self.failing.lock().unwrap().contains(&track.title) {
            return Err(DjError::resolution(format!("{} is unplayable", track.title)));
        }
        let Some(url) = track.url.clone() else {
            return Err(DjError::resolution("track has no url"));
        };
        self.made.lock().unwrap().push(MadeResource {
            title: track.title.clone(),
            seek: seek_offset_sec,
            filter,
        });
        Ok(AudioResource {
            input: url,
            seek_offset_sec,
            filter,
            track: track.clone(),
        })
    }
}

// ===== Sink =====

/// Sink that behaves like a voice player: stopping reports the stopped
/// resource as idle, playing reports it as playing
#[derive(Default)]
pub struct FakeSink {
    pub current: Mutex<Option<ResourceId>>,
    pub played: Mutex<Vec<(ResourceId, String)>>,
    pub paused: AtomicBool,
    pub stops: AtomicUsize,
    pub volume_milli: AtomicU64,
    pub hardware_ms: Mutex<Option<f64>>,
    pub listener: Mutex<Option<StatusListener>>,
    pub listener_sets: AtomicUsize,
}

impl FakeSink {
    fn emit(&self, resource: ResourceId, status: PlayerStatus) {
        let listener = self.listener.lock().unwrap().clone();
        if let Some(listener) = listener {
            listener(SinkEvent { resource, status });
        }
    }

    /// The current resource ran out on its own
    pub fn finish(&self) {
        let resource = self.current.lock().unwrap().take();
        if let Some(resource) = resource {
            self.emit(resource, PlayerStatus::Idle);
        }
    }

    pub fn current(&self) -> Option<ResourceId> {
        *self.current.lock().unwrap()
    }

    pub fn played_titles(&self) -> Vec<String> {
        self.played.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
    }

    pub fn volume(&self) -> f32 {
        self.volume_milli.load(Ordering::SeqCst) as f32 / 1000.0
    }

    pub fn has_listener(&self) -> bool {
        self.listener.lock().unwrap().is_some()
    }
}

impl AudioSink for FakeSink {
    fn play(&self, id: ResourceId, resource: AudioResource) -> discodj_core::Result<()> {
        *self.current.lock().unwrap() = Some(id);
        self.paused.store(false, Ordering::SeqCst);
        self.played.lock().unwrap().push((id, resource.track.title.clone()));
        self.emit(id, PlayerStatus::Playing);
        Ok(())
    }

    fn pause(&self) -> bool {
        !self.paused.swap(true, Ordering::SeqCst)
    }

    fn resume(&self) -> bool {
        self.paused.swap(false, Ordering::SeqCst)
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        let resource = self.current.lock().unwrap().take();
        if let Some(resource) = resource {
            self.emit(resource, PlayerStatus::Idle);
        }
    }

    fn set_volume(&self, ratio: f32) {
        self.volume_milli
            .store((ratio * 1000.0).round() as u64, Ordering::SeqCst);
    }

    fn playback_duration_ms(&self) -> Option<f64> {
        *self.hardware_ms.lock().unwrap()
    }

    fn set_listener(&self, listener: Option<StatusListener>) {
        self.listener_sets.fetch_add(1, Ordering::SeqCst);
        *self.listener.lock().unwrap() = listener;
    }
}

// ===== Voice =====

pub struct FakeConnection {
    pub id: ConnectionId,
    pub destroyed: AtomicBool,
    pub subscriptions: AtomicUsize,
}

impl VoiceConnection for FakeConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn subscribe(&self, _sink: Arc<dyn AudioSink>) {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
    }

    fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakeVoice {
    pub sink: Arc<FakeSink>,
    pub joins: AtomicUsize,
    pub connections: Mutex<Vec<Arc<FakeConnection>>>,
    next_id: AtomicU64,
}

impl FakeVoice {
    pub fn last_connection(&self) -> Option<Arc<FakeConnection>> {
        self.connections.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl VoiceProvider for FakeVoice {
    async fn join(&self, _room: &RoomId, _context: &VoiceContext) -> discodj_core::Result<Arc<dyn VoiceConnection>> {
        self.joins.fetch_add(1, Ordering::SeqCst);
        let connection = Arc::new(FakeConnection {
            id: ConnectionId(self.next_id.fetch_add(1, Ordering::SeqCst)),
            destroyed: AtomicBool::new(false),
            subscriptions: AtomicUsize::new(0),
        });
        self.connections.lock().unwrap().push(connection.clone());
        Ok(connection)
    }

    fn get_existing(&self, _room: &RoomId) -> Option<Arc<dyn VoiceConnection>> {
        self.last_connection()
            .filter(|c| !c.destroyed.load(Ordering::SeqCst))
            .map(|c| c as Arc<dyn VoiceConnection>)
    }

    fn create_sink(&self, _room: &RoomId) -> Arc<dyn AudioSink> {
        self.sink.clone()
    }
}

// ===== Surface =====

#[derive(Default)]
pub struct FakeSurface {
    pub sent: Mutex<Vec<PanelPayload>>,
    pub edited: Mutex<Vec<PanelPayload>>,
    pub notices: Mutex<Vec<String>>,
    pub deleted: AtomicBool,
    /// Messages removed through the surface
    pub removed: Mutex<Vec<MessageRef>>,
    next_message: AtomicU64,
}

impl FakeSurface {
    /// Most recent payload, sent or edited
    pub fn last_payload(&self) -> Option<PanelPayload> {
        let edited = self.edited.lock().unwrap().last().cloned();
        let sent = self.sent.lock().unwrap().last().cloned();
        // Edits only happen after the first send
        edited.or(sent)
    }

    pub fn push_count(&self) -> usize {
        self.sent.lock().unwrap().len() + self.edited.lock().unwrap().len()
    }
}

#[async_trait]
impl DisplaySurface for FakeSurface {
    async fn fetch_channel(&self, _surface: &SurfaceId) -> discodj_core::Result<bool> {
        Ok(true)
    }

    async fn send(&self, surface: &SurfaceId, payload: &PanelPayload) -> discodj_core::Result<MessageRef> {
        self.sent.lock().unwrap().push(payload.clone());
        self.edited.lock().unwrap().clear();
        self.deleted.store(false, Ordering::SeqCst);
        let n = self.next_message.fetch_add(1, Ordering::SeqCst);
        Ok(MessageRef {
            surface: surface.clone(),
            message: MessageId::new(format!("msg-{n}")),
        })
    }

    async fn edit(&self, _message: &MessageRef, payload: &PanelPayload) -> discodj_core::Result<()> {
        self.edited.lock().unwrap().push(payload.clone());
        Ok(())
    }

    async fn fetch_message(&self, message: &MessageRef) -> discodj_core::Result<Option<MessageRef>> {
        if self.deleted.load(Ordering::SeqCst) {
            Ok(None)
        } else {
            Ok(Some(message.clone()))
        }
    }

    async fn delete_message(&self, message: &MessageRef) -> discodj_core::Result<()> {
        self.removed.lock().unwrap().push(message.clone());
        self.deleted.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn notify(&self, _surface: &SurfaceId, text: &str) -> discodj_core::Result<()> {
        self.notices.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

// ===== Presence =====

#[derive(Default)]
pub struct FakePresence {
    pub playing: Mutex<Option<String>>,
    pub fail: AtomicBool,
}

impl Presence for FakePresence {
    fn set_playing(&self, title: &str) -> discodj_core::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DjError::presence("gateway closed"));
        }
        *self.playing.lock().unwrap() = Some(title.to_string());
        Ok(())
    }

    fn clear(&self) -> discodj_core::Result<()> {
        *self.playing.lock().unwrap() = None;
        Ok(())
    }
}

// ===== Store =====

#[derive(Default)]
pub struct MemoryStore {
    pub snapshots: Mutex<HashMap<RoomId, RoomSnapshot>>,
    pub saves: AtomicUsize,
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn save(&self, room: &RoomId, snapshot: &RoomSnapshot) -> discodj_core::Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.snapshots
            .lock()
            .unwrap()
            .insert(room.clone(), snapshot.clone());
        Ok(())
    }

    async fn load(&self, room: &RoomId) -> RoomSnapshot {
        self.snapshots
            .lock()
            .unwrap()
            .get(room)
            .cloned()
            .unwrap_or_default()
    }
}

// ===== Harness =====

pub struct Harness {
    pub controller: Arc<PlaybackController>,
    pub resolver: Arc<FakeResolver>,
    pub resources: Arc<FakeResources>,
    pub voice: Arc<FakeVoice>,
    pub surface: Arc<FakeSurface>,
    pub presence: Arc<FakePresence>,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub room: RoomId,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(PlaybackConfig::default())
    }

    pub fn with_config(config: PlaybackConfig) -> Self {
        let resolver = Arc::new(FakeResolver::default());
        let resources = Arc::new(FakeResources::default());
        let voice = Arc::new(FakeVoice::default());
        let surface = Arc::new(FakeSurface::default());
        let presence = Arc::new(FakePresence::default());
        let store = Arc::new(MemoryStore::default());
        let clock = Arc::new(ManualClock::new(1_000_000));

        let registry = Arc::new(RoomRegistry::new(config.history_size));
        let controller = PlaybackController::new(
            config,
            registry,
            Collaborators {
                resolver: resolver.clone(),
                resources: resources.clone(),
                voice: voice.clone(),
                surface: surface.clone(),
                presence: presence.clone(),
                store: store.clone(),
                clock: clock.clone(),
            },
        );

        Self {
            controller,
            resolver,
            resources,
            voice,
            surface,
            presence,
            store,
            clock,
            room: RoomId::new("guild-1"),
        }
    }

    pub fn sink(&self) -> &FakeSink {
        &self.voice.sink
    }

    pub fn surface_id(&self) -> SurfaceId {
        SurfaceId::new("music-text")
    }

    pub fn voice_context(&self) -> VoiceContext {
        VoiceContext::in_channel("voice-1")
    }

    /// Let spawned sink-event tasks reach the room's lane, then wait for
    /// everything queued there
    pub async fn settle(&self) {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        self.controller.info(&self.room).await.unwrap();
    }

    /// Queue `titles` and start playing the first
    pub async fn start_with(&self, titles: &[&str]) {
        self.controller
            .show_panel(&self.room, self.surface_id())
            .await
            .unwrap();
        self.controller
            .ensure_connected(&self.room, &self.voice_context())
            .await
            .unwrap()
            .unwrap();
        self.controller
            .enqueue(&self.room, tracks(titles), discodj_playback::EnqueuePosition::End)
            .await
            .unwrap();
        self.controller.play_next(&self.room, None).await.unwrap();
        self.settle().await;
    }
}
