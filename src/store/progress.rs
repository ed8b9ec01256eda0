use std::path::{Path, PathBuf};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::common::types::{AnyResult, EpisodeId, TitleId, now_ms};

/// Last known playback position for a title.
///
/// One record per title: the latest episode watched overwrites it. The
/// episode id is kept so a load can tell whether the point belongs to the
/// episode it is starting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumePoint {
    pub episode_id: EpisodeId,
    /// Seconds into the episode.
    pub position: f64,
    /// Episode duration in seconds at save time.
    pub duration: f64,
    /// Unix milliseconds.
    pub saved_at: u64,
}

impl ResumePoint {
    pub fn new(episode_id: impl Into<EpisodeId>, position: f64, duration: f64) -> Self {
        Self {
            episode_id: episode_id.into(),
            position,
            duration,
            saved_at: now_ms(),
        }
    }
}

/// Per-title resume persistence.
///
/// Write failures must be tolerable: the orchestrator logs and ignores them,
/// playback never stops because a disk was full.
pub trait ProgressStore: Send + Sync {
    fn get(&self, title: &TitleId) -> Option<ResumePoint>;
    fn put(&self, title: &TitleId, point: ResumePoint) -> AnyResult<()>;
    fn clear(&self, title: &TitleId) -> AnyResult<()>;
}

/// `ProgressStore` backed by a single JSON file, mirroring the shape the
/// web app kept under its `watch_progress` storage key.
pub struct JsonProgressStore {
    path: PathBuf,
    map: DashMap<TitleId, ResumePoint>,
}

impl JsonProgressStore {
    /// Open the store, loading any existing file. A missing file is an
    /// empty store; a corrupt one is replaced on the next write.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let map = DashMap::new();

        if let Ok(raw) = std::fs::read_to_string(&path) {
            match serde_json::from_str::<std::collections::HashMap<TitleId, ResumePoint>>(&raw) {
                Ok(entries) => {
                    for (title, point) in entries {
                        map.insert(title, point);
                    }
                }
                Err(e) => tracing::warn!("Ignoring corrupt progress file {:?}: {}", path, e),
            }
        }

        Self { path, map }
    }

    fn persist(&self) -> AnyResult<()> {
        let entries: std::collections::HashMap<TitleId, ResumePoint> = self
            .map
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(&entries)?)?;
        Ok(())
    }
}

impl ProgressStore for JsonProgressStore {
    fn get(&self, title: &TitleId) -> Option<ResumePoint> {
        self.map.get(title).map(|e| e.value().clone())
    }

    fn put(&self, title: &TitleId, point: ResumePoint) -> AnyResult<()> {
        self.map.insert(title.clone(), point);
        self.persist()
    }

    fn clear(&self, title: &TitleId) -> AnyResult<()> {
        if self.map.remove(title).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::SessionId;

    fn temp_store() -> (JsonProgressStore, PathBuf) {
        let path = std::env::temp_dir().join(format!(
            "cozify-progress-test-{}.json",
            SessionId::generate()
        ));
        (JsonProgressStore::open(&path), path)
    }

    #[test]
    fn test_put_get_clear_roundtrip() {
        let (store, path) = temp_store();
        let title = TitleId::from("frieren-18542");

        assert!(store.get(&title).is_none());

        let point = ResumePoint::new("frieren-18542$episode$101", 734.2, 1420.0);
        store.put(&title, point.clone()).unwrap();
        assert_eq!(store.get(&title), Some(point));

        store.clear(&title).unwrap();
        assert!(store.get(&title).is_none());

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_latest_episode_overwrites_title_record() {
        let (store, path) = temp_store();
        let title = TitleId::from("frieren-18542");

        store
            .put(&title, ResumePoint::new("frieren-18542$episode$101", 600.0, 1420.0))
            .unwrap();
        store
            .put(&title, ResumePoint::new("frieren-18542$episode$102", 42.0, 1415.0))
            .unwrap();

        let point = store.get(&title).unwrap();
        assert_eq!(&*point.episode_id, "frieren-18542$episode$102");
        assert_eq!(point.position, 42.0);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_survives_reopen() {
        let (store, path) = temp_store();
        let title = TitleId::from("frieren-18542");
        store
            .put(&title, ResumePoint::new("frieren-18542$episode$103", 300.0, 1400.0))
            .unwrap();
        drop(store);

        let reopened = JsonProgressStore::open(&path);
        assert_eq!(reopened.get(&title).unwrap().position, 300.0);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_corrupt_file_is_empty_store() {
        let path = std::env::temp_dir().join(format!(
            "cozify-progress-test-{}.json",
            SessionId::generate()
        ));
        std::fs::write(&path, "not json at all").unwrap();

        let store = JsonProgressStore::open(&path);
        assert!(store.get(&TitleId::from("anything")).is_none());

        let _ = std::fs::remove_file(path);
    }
}
