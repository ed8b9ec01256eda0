use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Everything that can go wrong while bringing an episode to a playing state.
///
/// Only `NoDeliveryAvailable` and `UnsupportedPlayback` are terminal for a
/// playback attempt; every other kind is handled internally by advancing the
/// delivery-candidate search.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The upstream answered but returned no usable source list.
    #[error("resolution failed: {0}")]
    ResolutionFailed(String),

    /// No upstream response arrived within the bounded window.
    #[error("resolution timed out after {0:?}")]
    ResolutionTimeout(Duration),

    /// The stream engine reported an error it cannot recover from.
    #[error("engine fatal error: {0}")]
    EngineFatal(String),

    /// Every server/audio combination has been tried (or the retry budget
    /// ran out) without producing a working stream.
    #[error("no delivery available: {tried} server/audio combinations failed")]
    NoDeliveryAvailable { tried: usize },

    /// No compatible stream engine exists for this runtime.
    #[error("no compatible stream engine available")]
    UnsupportedPlayback,
}

impl PlaybackError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ResolutionFailed(_) => ErrorKind::ResolutionFailed,
            Self::ResolutionTimeout(_) => ErrorKind::ResolutionTimeout,
            Self::EngineFatal(_) => ErrorKind::EngineFatal,
            Self::NoDeliveryAvailable { .. } => ErrorKind::NoDeliveryAvailable,
            Self::UnsupportedPlayback => ErrorKind::UnsupportedPlayback,
        }
    }

    /// Kinds that fail one candidate and advance the search rather than
    /// ending the session.
    pub fn is_candidate_failure(&self) -> bool {
        matches!(
            self,
            Self::ResolutionFailed(_) | Self::ResolutionTimeout(_) | Self::EngineFatal(_)
        )
    }
}

/// Serializable error discriminant carried by caller-facing `Error` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    ResolutionFailed,
    ResolutionTimeout,
    EngineFatal,
    NoDeliveryAvailable,
    UnsupportedPlayback,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_failures_are_not_terminal() {
        assert!(PlaybackError::ResolutionFailed("empty sources".into()).is_candidate_failure());
        assert!(PlaybackError::ResolutionTimeout(Duration::from_secs(12)).is_candidate_failure());
        assert!(PlaybackError::EngineFatal("manifest parse error".into()).is_candidate_failure());
        assert!(!PlaybackError::NoDeliveryAvailable { tried: 6 }.is_candidate_failure());
        assert!(!PlaybackError::UnsupportedPlayback.is_candidate_failure());
    }

    #[test]
    fn test_kind_serializes_camel_case() {
        let s = serde_json::to_string(&ErrorKind::NoDeliveryAvailable).unwrap();
        assert_eq!(s, "\"noDeliveryAvailable\"");
    }
}
