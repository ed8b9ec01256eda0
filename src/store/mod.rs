pub mod history;
pub mod progress;
pub mod settings;

pub use history::{HistoryEntry, JsonHistoryStore};
pub use progress::{JsonProgressStore, ProgressStore, ResumePoint};
pub use settings::{JsonSettingsStore, PlayerSettings, SettingsStore};
