//! discodj - Room Playback
//!
//! The playback state machine and progress tracking core of discodj.
//!
//! This crate provides:
//! - Timing engine (pause-aware elapsed time, read-time clamping)
//! - Per-room state (queue, bounded history, settings, snapshot)
//! - Serial executor (one FIFO lane per room, failure isolation)
//! - Playback controller (start/end, pause/resume, seek, skip, loop, autoplay)
//! - Panel renderer and de-duplicating panel sync
//! - Control-event dispatch for the chat layer
//!
//! # Architecture
//!
//! `discodj-playback` never talks to a chat SDK, a transcoder or the disk
//! directly. Everything external is reached through the collaborator traits in
//! `discodj-core`, bundled into [`Collaborators`].
//!
//! ```text
//! ControlEvent / sink event
//!        │
//!        ▼
//! SerialExecutor (per room) ──► PlaybackController ──► RoomState
//!                                     │
//!                                     ▼
//!                       render ──► PanelSync ──► DisplaySurface
//! ```
//!
//! # Example: Timing
//!
//! ```rust
//! use discodj_playback::Timing;
//!
//! let mut timing = Timing::default();
//! timing.on_track_start(0, 0.0);
//! timing.on_pause(5_000);
//! timing.on_resume(8_000);
//!
//! // 3s of pause are not counted
//! assert!((timing.elapsed_seconds(10_000, None) - 7.0).abs() < 1e-9);
//! ```
//!
//! # Example: Serial execution
//!
//! ```rust
//! use discodj_playback::SerialExecutor;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let executor = SerialExecutor::new();
//! let first = executor.run("room-a", async { 1 });
//! let second = executor.run("room-a", async { 2 });
//! assert_eq!(first.await.unwrap() + second.await.unwrap(), 3);
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod control;
pub mod controller;
pub mod error;
pub mod executor;
pub mod history;
pub mod panel;
pub mod queue;
pub mod refresh;
pub mod registry;
pub mod room;
pub mod shuffle;
pub mod sync;
pub mod timing;
pub mod types;

pub use control::{dispatch, dispatch_button, parse_timestamp, Actor, ControlEvent};
pub use controller::{Collaborators, PlayOutcome, PlaybackController, RoomInfo};
pub use error::{PlaybackError, Result};
pub use executor::SerialExecutor;
pub use history::History;
pub use panel::{format_time, render, PanelLayout};
pub use queue::TrackQueue;
pub use registry::{RoomHandle, RoomRegistry};
pub use room::RoomState;
pub use sync::{PanelSlot, PanelSync, PushOutcome};
pub use timing::{Progress, Timing};
pub use types::{EnqueuePosition, PlaybackConfig};
