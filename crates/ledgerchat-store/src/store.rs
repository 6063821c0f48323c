//! File-backed persistence for [`ChatRoom`](crate::models::ChatRoom) records.
//!
//! The whole registry is one JSON object keyed by room name. Writes go to a
//! uniquely named sibling temp file which is flushed and then renamed over
//! the real file, so a reader sees either the old mapping or the new one.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::models::RoomMap;

#[derive(Debug, Clone)]
pub struct RoomStore {
    path: PathBuf,
}

impl RoomStore {
    /// Open the registry file, creating its directory and an empty mapping
    /// if either is missing.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self { path: path.into() };

        if let Some(parent) = store.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        if !fs::try_exists(&store.path).await? {
            store.write(&RoomMap::new()).await?;
            info!(path = %store.path.display(), "Created empty room registry");
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every room. An unreadable or corrupt file reads as empty.
    pub async fn read(&self) -> RoomMap {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return RoomMap::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read room registry");
                return RoomMap::new();
            }
        };

        if raw.trim().is_empty() {
            return RoomMap::new();
        }

        match serde_json::from_str(&raw) {
            Ok(rooms) => rooms,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Room registry is corrupt, treating as empty");
                RoomMap::new()
            }
        }
    }

    /// Replace the registry contents atomically.
    pub async fn write(&self, rooms: &RoomMap) -> Result<()> {
        let tmp = self.stage(rooms).await?;
        self.commit(&tmp).await
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "rooms.json".to_string());
        self.path.with_file_name(format!("{name}.{}.tmp", Uuid::new_v4()))
    }

    /// Write the serialised mapping to a fresh temp sibling and flush it.
    async fn stage(&self, rooms: &RoomMap) -> Result<PathBuf> {
        let tmp = self.temp_path();
        match write_flushed(&tmp, rooms).await {
            Ok(()) => Ok(tmp),
            Err(e) => {
                discard(&tmp).await;
                Err(e)
            }
        }
    }

    async fn commit(&self, tmp: &Path) -> Result<()> {
        if let Err(e) = fs::rename(tmp, &self.path).await {
            discard(tmp).await;
            return Err(e.into());
        }
        debug!(path = %self.path.display(), "Room registry written");
        Ok(())
    }
}

async fn write_flushed(tmp: &Path, rooms: &RoomMap) -> Result<()> {
    let data = serde_json::to_vec_pretty(rooms)?;
    let mut file = fs::File::create(tmp).await?;
    file.write_all(&data).await?;
    file.sync_all().await?;
    Ok(())
}

async fn discard(tmp: &Path) {
    if let Err(e) = fs::remove_file(tmp).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %tmp.display(), error = %e, "Failed to remove temp registry file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatRoom;
    use chrono::Utc;
    use tempfile::TempDir;

    fn room(name: &str) -> ChatRoom {
        let now = Utc::now();
        ChatRoom {
            room_name: name.to_string(),
            schema_id: format!("0x{}", "ab".repeat(32)),
            owner_address: None,
            metadata: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn temp_files(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "tmp"))
            .collect()
    }

    #[tokio::test]
    async fn test_open_bootstraps_directory_and_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("rooms.json");

        let store = RoomStore::open(&path).await.unwrap();
        assert!(path.exists());
        assert!(store.read().await.is_empty());

        // Re-opening leaves existing content alone.
        let mut rooms = RoomMap::new();
        rooms.insert("general".into(), room("general"));
        store.write(&rooms).await.unwrap();
        let reopened = RoomStore::open(&path).await.unwrap();
        assert_eq!(reopened.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let store = RoomStore::open(dir.path().join("rooms.json")).await.unwrap();

        let mut rooms = RoomMap::new();
        rooms.insert("general".into(), room("general"));
        rooms.insert("random".into(), room("random"));
        store.write(&rooms).await.unwrap();

        assert_eq!(store.read().await, rooms);
        assert!(temp_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rooms.json");
        let store = RoomStore::open(&path).await.unwrap();

        std::fs::write(&path, b"{ not json").unwrap();
        assert!(store.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_crash_before_rename_keeps_original() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rooms.json");
        let store = RoomStore::open(&path).await.unwrap();

        let mut original = RoomMap::new();
        original.insert("general".into(), room("general"));
        store.write(&original).await.unwrap();

        let mut next = original.clone();
        next.insert("random".into(), room("random"));
        // Stage the new mapping but never commit it.
        let tmp = store.stage(&next).await.unwrap();
        assert!(tmp.exists());

        assert_eq!(store.read().await, original);
        let on_disk: RoomMap =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, original);
    }

    #[tokio::test]
    async fn test_failed_rename_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rooms.json");
        let store = RoomStore::open(&path).await.unwrap();

        // Replace the registry file with a non-empty directory so the rename fails.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("blocker"), b"x").unwrap();

        assert!(store.write(&RoomMap::new()).await.is_err());
        assert!(temp_files(dir.path()).is_empty());
    }
}
