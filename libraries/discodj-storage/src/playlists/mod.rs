//! Saved playlists
//!
//! Named track lists per room, stored in `<data_dir>/<room>.playlists.json`
//! as an object keyed by playlist name.

use crate::error::{Result, StorageError};
use crate::files::{read_optional, room_stem, write_atomic};
use chrono::{DateTime, SubsecRound, Utc};
use discodj_core::{RoomId, Track};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Longest accepted playlist name, in characters
pub const MAX_NAME_LEN: usize = 100;

/// A saved playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPlaylist {
    pub name: String,
    pub tracks: Vec<Track>,
    /// Milliseconds since the epoch on disk
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub saved_at: DateTime<Utc>,
    pub count: usize,
}

type Playlists = BTreeMap<String, SavedPlaylist>;

/// Per-room playlist files
#[derive(Debug)]
pub struct PlaylistStore {
    data_dir: PathBuf,
    /// Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl PlaylistStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn path_for(&self, room: &RoomId) -> Result<PathBuf> {
        Ok(self
            .data_dir
            .join(format!("{}.playlists.json", room_stem(room.as_str())?)))
    }

    /// All playlists of a room, ordered by name
    pub async fn list(&self, room: &RoomId) -> Result<Vec<SavedPlaylist>> {
        Ok(self.read_all(room).await?.into_values().collect())
    }

    /// Save `tracks` under `name`, replacing a playlist of the same name
    pub async fn save(&self, room: &RoomId, name: &str, tracks: Vec<Track>) -> Result<SavedPlaylist> {
        let name = validate_name(name)?;
        let _guard = self.write_lock.lock().await;

        let mut all = self.read_all(room).await?;
        let playlist = SavedPlaylist {
            name: name.clone(),
            count: tracks.len(),
            tracks,
            // Stored at millisecond precision
            saved_at: Utc::now().trunc_subsecs(3),
        };
        all.insert(name, playlist.clone());
        self.write_all(room, &all).await?;
        info!(room = %room, playlist = %playlist.name, count = playlist.count, "playlist saved");
        Ok(playlist)
    }

    pub async fn load(&self, room: &RoomId, name: &str) -> Result<Option<SavedPlaylist>> {
        let name = validate_name(name)?;
        Ok(self.read_all(room).await?.remove(&name))
    }

    /// Returns `false` if there was no such playlist
    pub async fn delete(&self, room: &RoomId, name: &str) -> Result<bool> {
        let name = validate_name(name)?;
        let _guard = self.write_lock.lock().await;

        let mut all = self.read_all(room).await?;
        if all.remove(&name).is_none() {
            return Ok(false);
        }
        self.write_all(room, &all).await?;
        info!(room = %room, playlist = %name, "playlist deleted");
        Ok(true)
    }

    /// Like [`load`](Self::load) but a missing playlist is an error
    pub async fn require(&self, room: &RoomId, name: &str) -> Result<SavedPlaylist> {
        self.load(room, name)
            .await?
            .ok_or_else(|| StorageError::not_found("Playlist", name.trim()))
    }

    async fn read_all(&self, room: &RoomId) -> Result<Playlists> {
        let path = self.path_for(room)?;
        let Some(raw) = read_optional(&path).await? else {
            return Ok(Playlists::new());
        };
        Ok(parse_playlists(&raw))
    }

    async fn write_all(&self, room: &RoomId, all: &Playlists) -> Result<()> {
        let path = self.path_for(room)?;
        write_atomic(&path, &serde_json::to_vec_pretty(all)?).await
    }
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(StorageError::invalid("playlist name", name));
    }
    Ok(name.to_string())
}

/// Unreadable files read as empty and unreadable entries are skipped
fn parse_playlists(raw: &str) -> Playlists {
    let Ok(Value::Object(entries)) = serde_json::from_str::<Value>(raw) else {
        warn!("playlist file unreadable, treating as empty");
        return Playlists::new();
    };
    entries
        .into_iter()
        .filter_map(|(name, entry)| match serde_json::from_value::<SavedPlaylist>(entry) {
            Ok(playlist) => Some((name, playlist)),
            Err(e) => {
                warn!(playlist = %name, error = %e, "skipping unreadable playlist");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(validate_name("  chill  ").unwrap(), "chill");
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn saved_at_is_epoch_millis() {
        let raw = r#"{
            "chill": {"name": "chill", "tracks": [], "savedAt": 1700000000000, "count": 0},
            "broken": {"name": "broken"}
        }"#;
        let all = parse_playlists(raw);
        assert_eq!(all.len(), 1);
        assert_eq!(all["chill"].saved_at.timestamp_millis(), 1_700_000_000_000);
        assert!(parse_playlists("nope").is_empty());
    }
}
