use serde::{Deserialize, Serialize};

/// Tuning knobs for the playback orchestrator.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PlayerConfig {
    /// Wall-clock budget per delivery candidate, covering resolution and
    /// manifest load. Exceeding it fails the candidate, not the session.
    #[serde(default = "default_load_timeout_ms")]
    pub load_timeout_ms: u64,
    /// How long to sit on an engine `ready` before trusting it. A manifest
    /// that dies right after parse fails the candidate inside this window.
    #[serde(default = "default_verify_delay_ms")]
    pub verify_delay_ms: u64,
    /// Retry budget for the candidate search. The search stops at this many
    /// failed candidates even if untried combinations remain.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Saved positions at or below this many seconds start over silently
    /// instead of prompting.
    #[serde(default = "default_resume_threshold_secs")]
    pub resume_threshold_secs: f64,
    /// Cadence of periodic progress persistence while playing.
    #[serde(default = "default_progress_save_interval_secs")]
    pub progress_save_interval_secs: u64,
    /// Positions earlier than this are never persisted.
    #[serde(default = "default_min_watched_secs")]
    pub min_watched_secs: f64,
    /// Positions within this many seconds of the end are never persisted,
    /// so a finished episode does not masquerade as a resume point.
    #[serde(default = "default_end_margin_secs")]
    pub end_margin_secs: f64,
    /// Idle time before the control overlay auto-hides.
    #[serde(default = "default_controls_idle_ms")]
    pub controls_idle_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            load_timeout_ms: default_load_timeout_ms(),
            verify_delay_ms: default_verify_delay_ms(),
            max_retries: default_max_retries(),
            resume_threshold_secs: default_resume_threshold_secs(),
            progress_save_interval_secs: default_progress_save_interval_secs(),
            min_watched_secs: default_min_watched_secs(),
            end_margin_secs: default_end_margin_secs(),
            controls_idle_ms: default_controls_idle_ms(),
        }
    }
}

fn default_load_timeout_ms() -> u64 {
    12_000
}

fn default_verify_delay_ms() -> u64 {
    3_000
}

fn default_max_retries() -> u32 {
    6
}

fn default_resume_threshold_secs() -> f64 {
    10.0
}

fn default_progress_save_interval_secs() -> u64 {
    5
}

fn default_min_watched_secs() -> f64 {
    10.0
}

fn default_end_margin_secs() -> f64 {
    30.0
}

fn default_controls_idle_ms() -> u64 {
    2_000
}
