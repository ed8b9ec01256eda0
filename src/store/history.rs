use std::collections::HashSet;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::common::types::{AnyResult, EpisodeId, TitleId, now_ms};

const HISTORY_CAP: usize = 200;

/// One watch-history row: which episode of which title was opened, when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub title_id: TitleId,
    pub title_name: String,
    #[serde(default)]
    pub image: Option<String>,
    pub episode_id: EpisodeId,
    pub episode_number: u32,
    /// Unix milliseconds.
    pub watched_at: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryData {
    entries: Vec<HistoryEntry>,
    watched_episodes: HashSet<EpisodeId>,
    /// Accumulated viewing time across all sessions.
    total_watch_secs: u64,
}

/// Watch history, watched-episode set and viewing-time counter in one JSON
/// file. The embedding app writes this when an episode is opened; the
/// orchestrator itself never touches it.
pub struct JsonHistoryStore {
    path: PathBuf,
    data: Mutex<HistoryData>,
}

impl JsonHistoryStore {
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let data = std::fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str::<HistoryData>(&raw).ok())
            .unwrap_or_default();

        Self {
            path,
            data: Mutex::new(data),
        }
    }

    /// Record that an episode was opened. An existing row for the same
    /// title+episode moves to the front; the list is capped at 200 rows.
    pub fn add(
        &self,
        title_id: impl Into<TitleId>,
        title_name: impl Into<String>,
        image: Option<String>,
        episode_id: impl Into<EpisodeId>,
        episode_number: u32,
    ) -> AnyResult<()> {
        let title_id = title_id.into();
        let episode_id = episode_id.into();

        {
            let mut data = self.data.lock();
            data.entries
                .retain(|e| !(e.title_id == title_id && e.episode_id == episode_id));
            data.entries.insert(
                0,
                HistoryEntry {
                    title_id,
                    title_name: title_name.into(),
                    image,
                    episode_id,
                    episode_number,
                    watched_at: now_ms(),
                },
            );
            data.entries.truncate(HISTORY_CAP);
        }

        self.persist()
    }

    /// Most recent entry per title, newest first.
    pub fn continue_watching(&self, limit: usize) -> Vec<HistoryEntry> {
        let data = self.data.lock();
        let mut seen = HashSet::new();
        let mut result = Vec::new();

        for entry in &data.entries {
            if seen.insert(entry.title_id.clone()) {
                result.push(entry.clone());
            }
            if result.len() >= limit {
                break;
            }
        }

        result
    }

    pub fn mark_watched(&self, episode_id: impl Into<EpisodeId>) -> AnyResult<()> {
        let inserted = self.data.lock().watched_episodes.insert(episode_id.into());
        if inserted {
            self.persist()?;
        }
        Ok(())
    }

    pub fn is_watched(&self, episode_id: &EpisodeId) -> bool {
        self.data.lock().watched_episodes.contains(episode_id)
    }

    pub fn add_watch_time(&self, secs: u64) -> AnyResult<()> {
        self.data.lock().total_watch_secs += secs;
        self.persist()
    }

    pub fn total_watch_secs(&self) -> u64 {
        self.data.lock().total_watch_secs
    }

    fn persist(&self) -> AnyResult<()> {
        let json = serde_json::to_vec_pretty(&*self.data.lock())?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}
