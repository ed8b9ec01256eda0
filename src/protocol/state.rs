use serde::{Deserialize, Serialize};

use crate::protocol::episode::{AudioTrack, DeliveryCandidate};
use crate::protocol::manifest::QualitySelection;

/// Where the orchestrator's state machine currently sits.
///
/// `Error` is non-terminal for the session: user action (retry, manual
/// server/audio pick) or a new load re-enters `Resolving`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackPhase {
    #[default]
    Idle,
    Resolving,
    Loading,
    Ready,
    Playing,
    Paused,
    Seeking,
    Ended,
    Error,
}

impl PlaybackPhase {
    /// Phases during which a per-candidate deadline is meaningful.
    pub fn is_acquiring(self) -> bool {
        matches!(self, Self::Resolving | Self::Loading)
    }
}

/// Point-in-time view of the player, readable without talking to the actor.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStateSnapshot {
    pub phase: PlaybackPhase,
    /// Seconds into the episode.
    pub position: f64,
    /// Episode duration in seconds, 0 until the engine reports one.
    pub duration: f64,
    pub quality: QualitySelection,
    /// Selected subtitle track id, if any.
    pub subtitle: Option<String>,
    pub playback_rate: f64,
    /// The candidate currently bound to the engine, if any.
    pub candidate: Option<DeliveryCandidate>,
    pub audio: AudioTrack,
}
