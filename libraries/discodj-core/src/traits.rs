/// Collaborator traits consumed by the playback core
///
/// Everything the core needs from the outside world (search, transcoding,
/// voice transport, the chat surface, disk) is reached through these traits.
use crate::error::Result;
use crate::types::{
    AudioFilter, ConnectionId, MessageRef, PanelPayload, Requester, ResourceId, RoomId,
    RoomSnapshot, SinkEvent, SurfaceId, Track,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Media resolution service
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Turn a URL or free-text query into tracks
    ///
    /// Playlist references expand into many tracks. An empty vector means
    /// nothing matched. Safe to retry.
    async fn resolve(&self, query: &str, requester: &Requester) -> Result<Vec<Track>>;

    /// Look up metadata for a single URL
    async fn resolve_one(&self, url: &str) -> Result<Option<Track>>;

    /// Pick a track related to `seed`, for autoplay
    async fn find_related(&self, seed: &Track) -> Result<Option<Track>>;
}

/// A track turned into something a sink can play
#[derive(Debug, Clone, PartialEq)]
pub struct AudioResource {
    /// Direct media location handed to the transcode pipeline
    pub input: String,
    /// Where in the track the stream starts
    pub seek_offset_sec: f64,
    pub filter: Option<AudioFilter>,
    /// The track this resource plays
    pub track: Track,
}

/// Produces playable resources
#[async_trait]
pub trait ResourceFactory: Send + Sync {
    /// Prepare `track` for playback starting at `seek_offset_sec`
    ///
    /// Fails with a resolution error when the track is unplayable.
    async fn make_resource(
        &self,
        track: &Track,
        seek_offset_sec: f64,
        filter: Option<AudioFilter>,
    ) -> Result<AudioResource>;
}

/// Callback receiving sink status transitions
pub type StatusListener = Arc<dyn Fn(SinkEvent) + Send + Sync>;

/// Per-room audio player
pub trait AudioSink: Send + Sync {
    /// Start playing `resource`, replacing whatever played before
    fn play(&self, id: ResourceId, resource: AudioResource) -> Result<()>;

    /// Returns `false` if there was nothing to pause
    fn pause(&self) -> bool;

    /// Returns `false` if there was nothing to resume
    fn resume(&self) -> bool;

    /// Stop the current resource
    fn stop(&self);

    /// Gain ratio, 1.0 = 100%
    fn set_volume(&self, ratio: f32);

    /// Milliseconds of the current resource actually played, if the sink
    /// measures it
    fn playback_duration_ms(&self) -> Option<f64>;

    /// Replace the status listener; `None` unregisters
    fn set_listener(&self, listener: Option<StatusListener>);
}

/// An established voice session
pub trait VoiceConnection: Send + Sync {
    /// Identity of this connection object
    fn id(&self) -> ConnectionId;

    /// Route `sink` output into this connection
    fn subscribe(&self, sink: Arc<dyn AudioSink>);

    /// Leave the voice channel
    fn destroy(&self);
}

/// Where the requester is, from the chat layer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VoiceContext {
    /// Voice channel the requester sits in, if any
    pub channel: Option<String>,
}

impl VoiceContext {
    pub fn in_channel(channel: impl Into<String>) -> Self {
        Self {
            channel: Some(channel.into()),
        }
    }
}

/// Voice transport
#[async_trait]
pub trait VoiceProvider: Send + Sync {
    /// Join `context.channel` for `room`
    async fn join(&self, room: &RoomId, context: &VoiceContext) -> Result<Arc<dyn VoiceConnection>>;

    /// The live connection for `room`, if any
    fn get_existing(&self, room: &RoomId) -> Option<Arc<dyn VoiceConnection>>;

    /// Create the audio sink for `room`
    fn create_sink(&self, room: &RoomId) -> Arc<dyn AudioSink>;
}

/// The chat surface the panel is drawn on
#[async_trait]
pub trait DisplaySurface: Send + Sync {
    /// Whether `surface` exists and accepts messages
    async fn fetch_channel(&self, surface: &SurfaceId) -> Result<bool>;

    /// Post a new panel message
    async fn send(&self, surface: &SurfaceId, payload: &PanelPayload) -> Result<MessageRef>;

    /// Replace the content of an existing message
    async fn edit(&self, message: &MessageRef, payload: &PanelPayload) -> Result<()>;

    /// `None` when the message no longer exists
    async fn fetch_message(&self, message: &MessageRef) -> Result<Option<MessageRef>>;

    /// Remove a posted message; a message that is already gone is not an error
    async fn delete_message(&self, message: &MessageRef) -> Result<()>;

    /// Post a plain notice
    async fn notify(&self, surface: &SurfaceId, text: &str) -> Result<()>;
}

/// Bot presence ("Listening to ...")
pub trait Presence: Send + Sync {
    fn set_playing(&self, title: &str) -> Result<()>;

    fn clear(&self) -> Result<()>;
}

/// Room snapshot persistence
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save(&self, room: &RoomId, snapshot: &RoomSnapshot) -> Result<()>;

    /// Never fails: missing or malformed data yields defaults
    async fn load(&self, room: &RoomId) -> RoomSnapshot;
}
