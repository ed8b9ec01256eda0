//! Playback orchestration core for the Cozify streaming app.
//!
//! The orchestrator searches the finite space of delivery options (server ×
//! audio track) until one yields a working adaptive stream, adapts a
//! pluggable stream engine over it, decides whether to resume a prior
//! position, and surfaces timed intro/outro skip windows during playback.
//!
//! ```no_run
//! use std::sync::Arc;
//! use cozify_player::configs::Config;
//! use cozify_player::engine::MediaSink;
//! use cozify_player::player::{Player, PlayerOptions};
//! use cozify_player::protocol::{AudioTrack, EpisodeRef};
//! use cozify_player::resolver::UpstreamResolver;
//! use cozify_player::store::{JsonProgressStore, JsonSettingsStore};
//!
//! # fn engine() -> Arc<dyn cozify_player::engine::StreamEngine> { unimplemented!() }
//! # async fn demo() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let config = Config::default();
//! let resolver = Arc::new(UpstreamResolver::new(&config.upstream)?);
//!
//! let player = Player::spawn(PlayerOptions {
//!     config,
//!     resolver,
//!     engine: engine(),
//!     sink: MediaSink::new("video-main"),
//!     progress: Arc::new(JsonProgressStore::open("watch_progress.json")),
//!     settings: Arc::new(JsonSettingsStore::open("settings.json")),
//! })?;
//!
//! player.load_episode(
//!     EpisodeRef::new("frieren-18542", "frieren-18542$episode$101", AudioTrack::Sub),
//!     None,
//!     true,
//! );
//! while let Ok(event) = player.events().recv_async().await {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod configs;
pub mod engine;
pub mod player;
pub mod protocol;
pub mod resolver;
pub mod store;

pub use common::errors::{ErrorKind, PlaybackError};
pub use player::{Player, PlayerOptions};
pub use protocol::events::PlayerEvent;
