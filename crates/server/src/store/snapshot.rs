//! Durable snapshot persistence.
//!
//! The whole store is serialized to a single JSON file after every
//! mutating command and on shutdown. Loading tolerates an absent or
//! corrupt file by starting from empty registries: losing the
//! snapshot is accepted, failing to start is not.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{info, warn};

use crate::models::Snapshot;

pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted snapshot, falling back to empty registries
    /// when the file is missing or unreadable.
    pub async fn load(&self) -> Snapshot {
        match fs::read_to_string(&self.path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(path = %self.path.display(), "snapshot file is corrupt, starting empty: {e}");
                    Snapshot::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no snapshot file found, starting empty");
                Snapshot::default()
            }
            Err(e) => {
                warn!(path = %self.path.display(), "failed to read snapshot, starting empty: {e}");
                Snapshot::default()
            }
        }
    }

    /// Overwrite the snapshot file with the full current state.
    /// Written to a temp file first and renamed into place so a crash
    /// mid-write never leaves a half-written snapshot.
    pub async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create data dir {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(snapshot)?;
        let temp_path = self.path.with_extension("tmp");

        fs::write(&temp_path, json)
            .await
            .with_context(|| format!("failed to write {}", temp_path.display()))?;
        fs::rename(&temp_path, &self.path)
            .await
            .with_context(|| format!("failed to replace {}", self.path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Channel, User};
    use tempfile::tempdir;

    #[tokio::test]
    async fn save_then_load_reproduces_state() {
        let dir = tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("server_data.json"));

        let snapshot = Snapshot {
            users: vec![User::new("alice", 100), User::new("bob", 101)],
            channels: vec![Channel::new("general", 102)],
            publications: vec![],
            messages: vec![],
            last_updated: 103,
        };
        file.save(&snapshot).await.unwrap();

        let loaded = file.load().await;
        assert_eq!(loaded.users.len(), 2);
        assert_eq!(loaded.users[0].user, "alice");
        assert_eq!(loaded.users[1].user, "bob");
        assert_eq!(loaded.channels[0].channel, "general");
        assert_eq!(loaded.last_updated, 103);
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("absent.json"));

        let loaded = file.load().await;
        assert!(loaded.users.is_empty());
        assert!(loaded.channels.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_loads_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("server_data.json");
        std::fs::write(&path, "{ not json ...").unwrap();

        let loaded = SnapshotFile::new(&path).load().await;
        assert!(loaded.users.is_empty());
        assert!(loaded.messages.is_empty());
    }
}
