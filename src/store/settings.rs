use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::common::types::AnyResult;

/// Global playback preferences, surviving across all sessions.
///
/// Read once at session start, written on every user change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSettings {
    /// 0.0..=1.0; out-of-range values are clamped on construction and set.
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub muted: bool,
    #[serde(default = "default_rate")]
    pub playback_rate: f64,
    /// Subtitle scale factor relative to the player default.
    #[serde(default = "default_subtitle_size")]
    pub subtitle_size: f32,
    /// Whether subtitles render on a backing box.
    #[serde(default = "default_subtitle_background")]
    pub subtitle_background: bool,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            muted: false,
            playback_rate: default_rate(),
            subtitle_size: default_subtitle_size(),
            subtitle_background: default_subtitle_background(),
        }
    }
}

impl PlayerSettings {
    pub fn clamped(mut self) -> Self {
        self.volume = self.volume.clamp(0.0, 1.0);
        self
    }
}

fn default_volume() -> f32 {
    1.0
}

fn default_rate() -> f64 {
    1.0
}

fn default_subtitle_size() -> f32 {
    1.0
}

fn default_subtitle_background() -> bool {
    true
}

pub trait SettingsStore: Send + Sync {
    fn get(&self) -> PlayerSettings;
    fn put(&self, settings: &PlayerSettings) -> AnyResult<()>;
}

/// `SettingsStore` backed by one JSON file.
pub struct JsonSettingsStore {
    path: PathBuf,
    cached: Mutex<PlayerSettings>,
}

impl JsonSettingsStore {
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let cached = std::fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str::<PlayerSettings>(&raw).ok())
            .map(PlayerSettings::clamped)
            .unwrap_or_default();

        Self {
            path,
            cached: Mutex::new(cached),
        }
    }
}

impl SettingsStore for JsonSettingsStore {
    fn get(&self) -> PlayerSettings {
        self.cached.lock().clone()
    }

    fn put(&self, settings: &PlayerSettings) -> AnyResult<()> {
        let settings = settings.clone().clamped();
        *self.cached.lock() = settings.clone();

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(&settings)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::SessionId;

    #[test]
    fn test_defaults_when_missing() {
        let path = std::env::temp_dir().join(format!(
            "cozify-settings-test-{}.json",
            SessionId::generate()
        ));
        let store = JsonSettingsStore::open(&path);
        assert_eq!(store.get(), PlayerSettings::default());
    }

    #[test]
    fn test_put_clamps_and_persists() {
        let path = std::env::temp_dir().join(format!(
            "cozify-settings-test-{}.json",
            SessionId::generate()
        ));
        let store = JsonSettingsStore::open(&path);

        let mut settings = PlayerSettings::default();
        settings.volume = 1.7;
        settings.muted = true;
        settings.playback_rate = 1.25;
        store.put(&settings).unwrap();

        assert_eq!(store.get().volume, 1.0);
        assert!(store.get().muted);

        let reopened = JsonSettingsStore::open(&path);
        assert_eq!(reopened.get().playback_rate, 1.25);

        let _ = std::fs::remove_file(path);
    }
}
