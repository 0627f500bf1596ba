mod ids;
mod panel;
mod room;
mod track;

pub use ids::{ConnectionId, MessageId, ResourceId, RoomId, SurfaceId, TrackKey};
pub use panel::{MessageRef, NowPlayingView, PanelControl, PanelPayload, PanelRef, UpNextEntry};
pub use room::{
    AudioFilter, LoopMode, PlayerStatus, RoomSettings, RoomSnapshot, SinkEvent, MAX_VOLUME,
    PERSISTED_HISTORY_LIMIT,
};
pub use track::{Requester, Track, TrackSource};
