use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::common::errors::PlaybackError;
use crate::configs::UpstreamConfig;
use crate::protocol::episode::{AudioTrack, EpisodeRef};
use crate::protocol::manifest::{ManifestDescriptor, SkipWindow, StreamSource, SubtitleTrack};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36";

/// `SourceResolver` backed by the provider's `/watch` endpoint.
pub struct UpstreamResolver {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl UpstreamResolver {
    pub fn new(config: &UpstreamConfig) -> Result<Self, PlaybackError> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let client = reqwest::Client::builder()
            .user_agent(
                config
                    .user_agent
                    .clone()
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            )
            .timeout(timeout)
            .build()
            .map_err(|e| PlaybackError::ResolutionFailed(format!("http client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn watch_url(&self, episode: &EpisodeRef, server: &str, audio: AudioTrack) -> String {
        format!(
            "{}/watch?episodeId={}&type={}&server={}",
            self.base_url,
            urlencoding::encode(&episode.episode_id),
            audio,
            urlencoding::encode(server),
        )
    }
}

#[async_trait]
impl crate::resolver::SourceResolver for UpstreamResolver {
    fn name(&self) -> &str {
        "upstream"
    }

    async fn resolve(
        &self,
        episode: &EpisodeRef,
        server: &str,
        audio: AudioTrack,
    ) -> Result<ManifestDescriptor, PlaybackError> {
        let url = self.watch_url(episode, server, audio);
        tracing::trace!("Resolving {} via {}", episode.episode_id, url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                PlaybackError::ResolutionTimeout(self.timeout)
            } else {
                PlaybackError::ResolutionFailed(format!("request failed: {e}"))
            }
        })?;

        if !response.status().is_success() {
            return Err(PlaybackError::ResolutionFailed(format!(
                "upstream returned {}",
                response.status()
            )));
        }

        let body: WatchResponse = response
            .json()
            .await
            .map_err(|e| PlaybackError::ResolutionFailed(format!("bad response body: {e}")))?;

        let manifest = ManifestDescriptor::from(body);
        if manifest.sources.is_empty() {
            // An empty source list is the upstream's way of shrugging.
            return Err(PlaybackError::ResolutionFailed(format!(
                "no sources for {} on {}",
                episode.episode_id, server
            )));
        }

        Ok(manifest)
    }
}

/// Raw `/watch` response shape.
#[derive(Debug, Deserialize)]
struct WatchResponse {
    #[serde(default)]
    sources: Vec<WatchSource>,
    #[serde(default)]
    subtitles: Vec<WatchSubtitle>,
    #[serde(default)]
    intro: Option<WatchWindow>,
    #[serde(default)]
    outro: Option<WatchWindow>,
}

#[derive(Debug, Deserialize)]
struct WatchSource {
    url: String,
    #[serde(default)]
    quality: Option<String>,
    #[serde(default, rename = "isM3U8")]
    is_m3u8: bool,
}

#[derive(Debug, Deserialize)]
struct WatchSubtitle {
    #[serde(default)]
    lang: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct WatchWindow {
    start: f64,
    end: f64,
}

impl From<WatchResponse> for ManifestDescriptor {
    fn from(r: WatchResponse) -> Self {
        ManifestDescriptor {
            sources: r
                .sources
                .into_iter()
                .map(|s| StreamSource {
                    url: s.url,
                    quality: s.quality,
                    is_m3u8: s.is_m3u8,
                })
                .collect(),
            subtitles: r
                .subtitles
                .into_iter()
                .map(|s| SubtitleTrack {
                    lang: s.lang,
                    url: s.url,
                })
                .collect(),
            intro: r.intro.map(|w| SkipWindow {
                start: w.start,
                end: w.end,
            }),
            outro: r.outro.map(|w| SkipWindow {
                start: w.start,
                end: w.end,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_url_encodes_episode_id() {
        let resolver = UpstreamResolver::new(&UpstreamConfig {
            base_url: "http://127.0.0.1:3001/api/".to_string(),
            ..Default::default()
        })
        .unwrap();

        let episode = EpisodeRef::new(
            "solo-leveling-18718",
            "solo-leveling-18718$episode$122083",
            AudioTrack::Sub,
        );
        let url = resolver.watch_url(&episode, "vidcloud", AudioTrack::Dub);
        assert_eq!(
            url,
            "http://127.0.0.1:3001/api/watch?episodeId=solo-leveling-18718%24episode%24122083&type=dub&server=vidcloud"
        );
    }

    #[test]
    fn test_watch_response_conversion() {
        let body = r#"{
            "sources": [{"url": "https://cdn.example/master.m3u8", "isM3U8": true}],
            "subtitles": [{"lang": "English", "url": "https://cdn.example/en.vtt"}],
            "intro": {"start": 85, "end": 174},
            "outro": {"start": 1340, "end": 1420}
        }"#;
        let parsed: WatchResponse = serde_json::from_str(body).unwrap();
        let manifest = ManifestDescriptor::from(parsed);

        assert_eq!(manifest.sources.len(), 1);
        assert!(manifest.sources[0].is_m3u8);
        assert_eq!(manifest.intro.unwrap().end, 174.0);
        assert_eq!(manifest.outro.unwrap().start, 1340.0);
    }

    #[test]
    fn test_empty_response_parses_to_empty_manifest() {
        let parsed: WatchResponse = serde_json::from_str("{}").unwrap();
        let manifest = ManifestDescriptor::from(parsed);
        assert!(manifest.sources.is_empty());
    }
}
