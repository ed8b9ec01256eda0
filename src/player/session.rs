use crate::common::types::SessionId;
use crate::player::candidates::CandidateSpace;
use crate::protocol::episode::{AudioTrack, DeliveryCandidate, EpisodeRef};
use crate::protocol::manifest::{ManifestDescriptor, QualityLevel};

/// Mutable state of one playback attempt (one loaded episode).
///
/// Created fresh on every `load_episode`; everything here dies with the
/// attempt, which is what clears the tried-set and discards the manifest on
/// episode change.
pub struct EpisodeSession {
    pub id: SessionId,
    pub episode: EpisodeRef,
    pub has_next: bool,
    /// Audio track currently being searched. Starts at the requested track
    /// and may flip to the alternate during fallback.
    pub audio: AudioTrack,
    pub candidates: CandidateSpace,
    /// The candidate currently bound to the live engine, if any.
    pub active: Option<DeliveryCandidate>,
    /// Pinned by `force_candidate`; disables automatic searching.
    pub forced: Option<DeliveryCandidate>,
    pub manifest: Option<ManifestDescriptor>,
    /// Quality levels reported by the engine's `ready`.
    pub quality_levels: Vec<QualityLevel>,
    /// Search advances so far in this attempt.
    pub retries: u32,
    pub position: f64,
    pub duration: f64,
    /// Skip to here (instead of prompting) once the stream is ready.
    pub resume_override: Option<f64>,
    /// Saved position offered to the caller; `Some` while holding in
    /// `Ready` for a resume-or-restart answer.
    pub pending_resume: Option<f64>,
    pub intro_visible: bool,
    pub outro_visible: bool,
}

impl EpisodeSession {
    pub fn new(
        episode: EpisodeRef,
        has_next: bool,
        server_count: usize,
        resume_override: Option<f64>,
    ) -> Self {
        let audio = episode.audio;
        Self {
            id: SessionId::generate(),
            episode,
            has_next,
            audio,
            candidates: CandidateSpace::new(server_count),
            active: None,
            forced: None,
            manifest: None,
            quality_levels: Vec::new(),
            retries: 0,
            position: 0.0,
            duration: 0.0,
            resume_override,
            pending_resume: None,
            intro_visible: false,
            outro_visible: false,
        }
    }
}
