//! discodj Core
//!
//! Domain types, collaborator traits and error handling shared by the discodj
//! playback core and its adapters.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `RoomSnapshot`, `RoomSettings`, `PanelPayload`
//! - **Collaborator Traits**: `Resolver`, `ResourceFactory`, `AudioSink`,
//!   `VoiceProvider`, `DisplaySurface`, `Presence`, `SnapshotStore`
//! - **Error Handling**: unified `DjError` and `Result` types
//! - **Clock**: injectable wall clock for timing math
//!
//! # Example
//!
//! ```rust
//! use discodj_core::types::{Requester, Track, TrackSource};
//!
//! let requester = Requester::new("1234", "listener#0001");
//! let track = Track::new("https://youtu.be/dQw4w9WgXcQ", "Never Gonna Give You Up", &requester, TrackSource::YouTube)
//!     .with_duration(Some(213.0));
//! assert!(!track.is_placeholder());
//! ```

#![forbid(unsafe_code)]

pub mod clock;
pub mod error;
pub mod traits;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{DjError, Result};
pub use traits::{
    AudioResource, AudioSink, DisplaySurface, Presence, ResourceFactory, Resolver, SnapshotStore,
    StatusListener, VoiceConnection, VoiceContext, VoiceProvider,
};
pub use types::{
    AudioFilter, LoopMode, PlayerStatus, Requester, RoomId, RoomSettings, RoomSnapshot, Track,
    TrackSource,
};
