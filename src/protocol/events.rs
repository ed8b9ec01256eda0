use serde::Serialize;

use crate::common::errors::ErrorKind;
use crate::protocol::episode::{AudioTrack, DeliveryCandidate};
use crate::protocol::manifest::{QualityLevel, SubtitleTrack};
use crate::protocol::state::PlaybackPhase;

/// Events emitted by the player to its embedding caller.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlayerEvent {
    /// A candidate produced a parsed, playable manifest.
    Ready {
        #[serde(rename = "qualityLevels")]
        quality_levels: Vec<QualityLevel>,
        subtitles: Vec<SubtitleTrack>,
        candidate: DeliveryCandidate,
    },

    /// A user-visible failure. Non-terminal kinds never reach here; they
    /// advance the candidate search silently.
    Error {
        kind: ErrorKind,
        message: String,
        /// How many server/audio combinations were tried before giving up.
        #[serde(skip_serializing_if = "Option::is_none")]
        tried: Option<usize>,
    },

    /// Playback reached the end of the episode.
    Ended {
        #[serde(rename = "hasNext")]
        has_next: bool,
    },

    /// A saved position exists for this episode; playback holds in `Ready`
    /// until the caller answers with `resume()` or `restart()`.
    ResumeDecisionNeeded {
        #[serde(rename = "savedPosition")]
        saved_position: f64,
    },

    /// Current time entered or left the intro window.
    SkipIntroAvailable { available: bool },

    /// Current time entered or left the outro window.
    SkipOutroAvailable {
        available: bool,
        #[serde(rename = "hasNext")]
        has_next: bool,
    },

    /// The caller should advance to the next episode (outro skip).
    NextEpisodeRequested,

    TimeUpdate {
        position: f64,
        duration: f64,
    },

    PhaseChanged {
        phase: PlaybackPhase,
    },

    /// The search moved on to another server/audio combination.
    CandidateChanged {
        candidate: DeliveryCandidate,
        #[serde(rename = "serverName")]
        server_name: String,
        audio: AudioTrack,
    },

    /// Control overlay visibility, driven by the activity idle timer.
    OverlayVisibility { visible: bool },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tagging() {
        let e = PlayerEvent::Ended { has_next: true };
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["type"], "ended");
        assert_eq!(json["hasNext"], true);
    }

    #[test]
    fn test_error_event_omits_absent_tried() {
        let e = PlayerEvent::Error {
            kind: ErrorKind::UnsupportedPlayback,
            message: "no engine".into(),
            tried: None,
        };
        let json = serde_json::to_value(&e).unwrap();
        assert!(json.get("tried").is_none());
    }
}
