use serde::{Deserialize, Serialize};

use crate::common::types::{EpisodeId, TitleId};

/// Audio track variant offered by the upstream provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioTrack {
    #[default]
    Sub,
    Dub,
}

impl AudioTrack {
    pub fn alternate(self) -> Self {
        match self {
            Self::Sub => Self::Dub,
            Self::Dub => Self::Sub,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sub => "sub",
            Self::Dub => "dub",
        }
    }
}

impl std::fmt::Display for AudioTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller asked to watch. Immutable for one playback attempt;
/// changing any field means a fresh attempt with a cleared tried-set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRef {
    pub title_id: TitleId,
    pub episode_id: EpisodeId,
    /// Requested audio track. The search may fall back to the alternate
    /// track once every server failed with this one.
    pub audio: AudioTrack,
}

impl EpisodeRef {
    pub fn new(
        title_id: impl Into<TitleId>,
        episode_id: impl Into<EpisodeId>,
        audio: AudioTrack,
    ) -> Self {
        Self {
            title_id: title_id.into(),
            episode_id: episode_id.into(),
            audio,
        }
    }
}

/// One delivery option: a server index paired with an audio track.
///
/// Identity is the pair itself; the server index points into the configured
/// server list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryCandidate {
    pub server: usize,
    pub audio: AudioTrack,
}

impl DeliveryCandidate {
    pub fn new(server: usize, audio: AudioTrack) -> Self {
        Self { server, audio }
    }
}

impl std::fmt::Display for DeliveryCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "server {} ({})", self.server + 1, self.audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_alternate_flips() {
        assert_eq!(AudioTrack::Sub.alternate(), AudioTrack::Dub);
        assert_eq!(AudioTrack::Dub.alternate(), AudioTrack::Sub);
    }

    #[test]
    fn test_audio_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&AudioTrack::Sub).unwrap(), "\"sub\"");
        assert_eq!(serde_json::to_string(&AudioTrack::Dub).unwrap(), "\"dub\"");
    }

    #[test]
    fn test_candidate_identity_is_the_pair() {
        let a = DeliveryCandidate::new(0, AudioTrack::Sub);
        let b = DeliveryCandidate::new(0, AudioTrack::Sub);
        let c = DeliveryCandidate::new(0, AudioTrack::Dub);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
