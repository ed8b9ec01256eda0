pub mod adapter;

pub use adapter::EngineAdapter;

use serde::Serialize;

use crate::common::types::AnyResult;
use crate::protocol::manifest::{QualityLevel, QualitySelection};

/// Opaque handle to the caller's media surface (the element or view the
/// engine renders into). One engine binding per sink at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSink {
    id: String,
}

impl MediaSink {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Commands accepted by a live engine binding.
///
/// Engines must tolerate control commands arriving right after `attach`,
/// before they have emitted `Ready`.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    Play,
    Pause,
    /// Seek to an absolute position in seconds.
    Seek(f64),
    SetRate(f64),
    SetVolume(f32),
    SetMuted(bool),
    SetQuality(QualitySelection),
    /// Select a subtitle track by id, or `None` to turn subtitles off.
    SetSubtitle(Option<String>),
    /// Tear down the binding and release the media sink.
    Destroy,
}

/// Events produced by an engine binding.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineEvent {
    /// Manifest parsed and playable. The success signal the orchestrator
    /// waits for.
    Ready {
        #[serde(rename = "qualityLevels")]
        quality_levels: Vec<QualityLevel>,
    },

    /// The engine cannot continue with this stream. Fails the candidate.
    FatalError { detail: String },

    /// Recoverable hiccup (buffer stall, transient network error). Absorbed
    /// by the adapter; never reaches the orchestrator's retry logic.
    NonFatal { detail: String },

    TimeUpdate { position: f64, duration: f64 },

    Ended,
}

/// Channel pair representing one live engine binding.
pub struct EngineAttachment {
    pub events: flume::Receiver<EngineEvent>,
    pub commands: flume::Sender<EngineCommand>,
}

/// A pluggable adaptive-bitrate playback engine.
///
/// `attach` creates a fresh binding for one manifest; the previous binding
/// for the same sink must already be destroyed. Implementations spawn their
/// own machinery and communicate only through the returned channels.
pub trait StreamEngine: Send + Sync {
    /// Unique identifier for this engine (e.g. "hls", "native").
    fn name(&self) -> &str;

    /// Whether this engine can run at all in the current runtime.
    fn supported(&self) -> bool {
        true
    }

    fn attach(&self, manifest_url: &str, sink: &MediaSink) -> AnyResult<EngineAttachment>;
}
