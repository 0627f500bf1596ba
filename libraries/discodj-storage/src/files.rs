//! File helpers shared by the stores

use crate::error::{Result, StorageError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// File stem for a room id
///
/// Anything outside `[A-Za-z0-9_-]` becomes `_`, so an id can never escape
/// the data directory.
pub fn room_stem(room: &str) -> Result<String> {
    let room = room.trim();
    if room.is_empty() {
        return Err(StorageError::invalid("room id", room));
    }
    Ok(room
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect())
}

/// Read a whole file, `None` if it does not exist
pub async fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Replace `path` with `contents`
///
/// Written to a sibling temp file first and renamed over the target, so a
/// crash mid-write leaves the previous file intact.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let tmp = tmp_path(path);
    fs::write(&tmp, contents).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stems_are_path_safe() {
        assert_eq!(room_stem("123456789").unwrap(), "123456789");
        assert_eq!(room_stem("../../etc/passwd").unwrap(), "______etc_passwd");
        assert_eq!(room_stem("guild-1_a").unwrap(), "guild-1_a");
        assert!(room_stem("  ").is_err());
    }

    #[test]
    fn tmp_is_a_sibling() {
        assert_eq!(
            tmp_path(Path::new("/data/42.json")),
            PathBuf::from("/data/42.json.tmp")
        );
    }

    #[tokio::test]
    async fn atomic_write_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("room.json");

        write_atomic(&path, b"first").await.unwrap();
        write_atomic(&path, b"second").await.unwrap();

        assert_eq!(read_optional(&path).await.unwrap().as_deref(), Some("second"));
        assert!(!tmp_path(&path).exists());
        assert!(read_optional(&dir.path().join("missing.json")).await.unwrap().is_none());
    }
}
