//! Room snapshot persistence
//!
//! One pretty-printed JSON file per room, `<data_dir>/<room>.json`:
//!
//! ```json
//! { "queue": [...], "history": [...], "volume": 100, "loop": "off",
//!   "autoplay": true, "djOnly": false }
//! ```
//!
//! Loading is lenient field by field: a malformed field falls back to its
//! default without discarding the rest, and unreadable tracks are skipped.

use crate::error::Result;
use crate::files::{read_optional, room_stem, write_atomic};
use async_trait::async_trait;
use discodj_core::types::MAX_VOLUME;
use discodj_core::{RoomId, RoomSettings, RoomSnapshot, SnapshotStore, Track};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// [`SnapshotStore`] backed by JSON files in a directory
#[derive(Debug, Clone)]
pub struct JsonSnapshotStore {
    data_dir: PathBuf,
}

impl JsonSnapshotStore {
    /// Store files under `data_dir`, created on first save
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path_for(&self, room: &RoomId) -> Result<PathBuf> {
        Ok(self.data_dir.join(format!("{}.json", room_stem(room.as_str())?)))
    }

    /// Write `snapshot`, trimmed to the persisted history limit
    pub async fn write(&self, room: &RoomId, snapshot: &RoomSnapshot) -> Result<()> {
        let path = self.path_for(room)?;
        let body = serde_json::to_vec_pretty(&snapshot.clone().truncated())?;
        write_atomic(&path, &body).await?;
        debug!(room = %room, path = %path.display(), queued = snapshot.queue.len(), "snapshot saved");
        Ok(())
    }

    /// Read the room's snapshot; `Ok(None)` when it was never saved
    pub async fn read(&self, room: &RoomId) -> Result<Option<RoomSnapshot>> {
        let path = self.path_for(room)?;
        Ok(read_optional(&path).await?.map(|raw| parse_snapshot(&raw)))
    }
}

#[async_trait]
impl SnapshotStore for JsonSnapshotStore {
    async fn save(&self, room: &RoomId, snapshot: &RoomSnapshot) -> discodj_core::Result<()> {
        self.write(room, snapshot).await.map_err(Into::into)
    }

    async fn load(&self, room: &RoomId) -> RoomSnapshot {
        match self.read(room).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => RoomSnapshot::default(),
            Err(e) => {
                warn!(room = %room, error = %e, "snapshot unreadable, using defaults");
                RoomSnapshot::default()
            }
        }
    }
}

/// Parse a snapshot document, defaulting whatever is missing or malformed
pub fn parse_snapshot(raw: &str) -> RoomSnapshot {
    let doc = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(doc)) => doc,
        Ok(_) => {
            warn!("snapshot is not a JSON object, using defaults");
            return RoomSnapshot::default();
        }
        Err(e) => {
            warn!(error = %e, "snapshot is not valid JSON, using defaults");
            return RoomSnapshot::default();
        }
    };

    let defaults = RoomSettings::default();
    let settings = RoomSettings {
        volume: doc
            .get("volume")
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
            .map_or(defaults.volume, |v| v.round().clamp(0.0, f64::from(MAX_VOLUME)) as u16),
        loop_mode: doc
            .get("loop")
            .and_then(Value::as_str)
            .and_then(|mode| mode.parse().ok())
            .unwrap_or(defaults.loop_mode),
        autoplay: doc
            .get("autoplay")
            .and_then(Value::as_bool)
            .unwrap_or(defaults.autoplay),
        dj_only: doc
            .get("djOnly")
            .and_then(Value::as_bool)
            .unwrap_or(defaults.dj_only),
    };

    RoomSnapshot {
        queue: tracks_field(&doc, "queue"),
        history: tracks_field(&doc, "history"),
        settings,
    }
    .truncated()
}

fn tracks_field(doc: &Map<String, Value>, field: &str) -> Vec<Track> {
    let Some(items) = doc.get(field).and_then(Value::as_array) else {
        return Vec::new();
    };
    let tracks: Vec<Track> = items
        .iter()
        .filter_map(|item| serde_json::from_value::<Track>(item.clone()).ok())
        .filter(|track| track.url.is_some() || track.is_placeholder())
        .collect();
    if tracks.len() != items.len() {
        warn!(field, skipped = items.len() - tracks.len(), "unreadable tracks dropped from snapshot");
    }
    tracks
}
