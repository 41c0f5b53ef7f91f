use super::{ReplayCache, ReplayStore, now_ms};
use crate::config::ReplayBackend;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

/// Replay cache snapshotted to a flat JSON object file.
pub struct FileReplayStore {
    cache: ReplayCache,
    path: PathBuf,
    max_entries: usize,
}

impl FileReplayStore {
    /// Load the snapshot at `path`. A missing file is an empty cache; a
    /// corrupt one is logged and treated as empty so the receiver can start.
    pub async fn open(path: &Path, max_entries: usize, now_ms: i64) -> Result<Self> {
        let entries = match tokio::fs::read(path).await {
            Ok(raw) => match serde_json::from_slice::<BTreeMap<String, i64>>(&raw) {
                Ok(entries) => entries,
                Err(error) => {
                    tracing::warn!(
                        path = %path.display(),
                        %error,
                        "replay snapshot is corrupt, starting empty"
                    );
                    BTreeMap::new()
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(error) => {
                return Err(error)
                    .with_context(|| format!("read replay snapshot {}", path.display()));
            }
        };

        Ok(Self {
            cache: ReplayCache::from_entries(entries, now_ms),
            path: path.to_path_buf(),
            max_entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_snapshot(&self) -> Result<()> {
        let snapshot: BTreeMap<String, i64> = self
            .cache
            .live_entries(now_ms(), self.max_entries)
            .into_iter()
            .map(|entry| (entry.signature, entry.expires_at_ms))
            .collect();
        let data = serde_json::to_vec(&snapshot).context("serialize replay snapshot")?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create replay snapshot dir {}", parent.display()))?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, data)
            .await
            .with_context(|| format!("write replay snapshot temp {}", temp_path.display()))?;

        if let Err(rename_error) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(rename_error).with_context(|| {
                format!("replace replay snapshot {}", self.path.display())
            });
        }

        Ok(())
    }
}

impl ReplayStore for FileReplayStore {
    fn cache(&self) -> &ReplayCache {
        &self.cache
    }

    fn backend(&self) -> ReplayBackend {
        ReplayBackend::Json
    }

    fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn flush(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(self.write_snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TTL_MS: i64 = 300_000;

    fn read_snapshot(path: &Path) -> BTreeMap<String, i64> {
        serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn missing_file_opens_empty() {
        let tmp = TempDir::new().unwrap();
        let store = FileReplayStore::open(&tmp.path().join("replay.json"), 10, now_ms())
            .await
            .unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_opens_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("replay.json");
        std::fs::write(&path, b"{not json").unwrap();
        let store = FileReplayStore::open(&path, 10, now_ms()).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn flush_writes_signature_to_expiry_object() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("replay.json");
        let now = now_ms();
        let store = FileReplayStore::open(&path, 10, now).await.unwrap();
        assert!(store.claim("deadbeef", now + TTL_MS, now));

        store.flush().await.unwrap();

        let snapshot = read_snapshot(&path);
        assert_eq!(snapshot.get("deadbeef"), Some(&(now + TTL_MS)));
        assert!(!tmp.path().join("replay.json.tmp").exists());
    }

    #[tokio::test]
    async fn open_discards_expired_entries() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("replay.json");
        let now = now_ms();
        let persisted = serde_json::json!({"stale": now - 1, "fresh": now + TTL_MS});
        std::fs::write(&path, persisted.to_string()).unwrap();

        let store = FileReplayStore::open(&path, 10, now).await.unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.has("fresh", now));
        assert!(!store.has("stale", now));
    }

    #[tokio::test]
    async fn flush_caps_file_at_max_entries() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("replay.json");
        let now = now_ms();
        let store = FileReplayStore::open(&path, 3, now).await.unwrap();
        for offset in 1..=6 {
            store.put(&format!("sig-{offset}"), now + TTL_MS + offset);
        }

        store.flush().await.unwrap();

        let snapshot = read_snapshot(&path);
        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.contains_key("sig-6"));
        assert!(snapshot.contains_key("sig-4"));
        assert!(!snapshot.contains_key("sig-3"));
    }
}
