//! discodj Storage
//!
//! JSON file persistence for discodj: one snapshot file per room (queue,
//! recent history and settings) and one file of saved playlists per room.
//!
//! # Example
//!
//! ```rust,no_run
//! use discodj_core::{RoomId, SnapshotStore};
//! use discodj_storage::JsonSnapshotStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = JsonSnapshotStore::new("./data");
//! let room = RoomId::new("123456789");
//!
//! let snapshot = store.load(&room).await;
//! store.save(&room, &snapshot).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod error;
mod files;

pub mod playlists;
pub mod snapshots;

pub use error::{Result, StorageError};
pub use playlists::{PlaylistStore, SavedPlaylist};
pub use snapshots::{parse_snapshot, JsonSnapshotStore};
