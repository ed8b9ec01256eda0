pub mod upstream;

pub use upstream::UpstreamResolver;

use async_trait::async_trait;

use crate::common::errors::PlaybackError;
use crate::protocol::episode::{AudioTrack, EpisodeRef};
use crate::protocol::manifest::ManifestDescriptor;

/// Resolves one delivery candidate into a playable manifest.
///
/// Resolution is idempotent and side-effect free beyond the network call;
/// the orchestrator may issue it repeatedly for different candidates. A
/// superseded call's result is discarded by the caller, so implementations
/// need no cancellation support of their own.
#[async_trait]
pub trait SourceResolver: Send + Sync {
    /// Unique identifier for this resolver (e.g. "upstream", "mock").
    fn name(&self) -> &str;

    /// Fetch the manifest descriptor for `episode` from `server` with the
    /// given audio track.
    ///
    /// Fails with `ResolutionFailed` when the upstream returns no usable
    /// source list and `ResolutionTimeout` when no response arrives in time.
    async fn resolve(
        &self,
        episode: &EpisodeRef,
        server: &str,
        audio: AudioTrack,
    ) -> Result<ManifestDescriptor, PlaybackError>;
}
