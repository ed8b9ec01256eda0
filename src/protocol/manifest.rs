use serde::{Deserialize, Serialize};

/// Resolved description of a playable stream for one delivery candidate.
///
/// Owned exclusively by the playback attempt that resolved it; discarded
/// whenever the episode changes or the candidate is abandoned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestDescriptor {
    pub sources: Vec<StreamSource>,
    #[serde(default)]
    pub subtitles: Vec<SubtitleTrack>,
    #[serde(default)]
    pub intro: Option<SkipWindow>,
    #[serde(default)]
    pub outro: Option<SkipWindow>,
}

impl ManifestDescriptor {
    /// The stream handed to the engine. Upstream orders sources best-first.
    pub fn primary_source(&self) -> Option<&StreamSource> {
        self.sources.first()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSource {
    pub url: String,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default, rename = "isM3U8")]
    pub is_m3u8: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleTrack {
    pub lang: String,
    pub url: String,
}

/// Time range (seconds) during which a skip affordance is offered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipWindow {
    pub start: f64,
    pub end: f64,
}

impl SkipWindow {
    /// Half-open containment: visible at `start`, hidden exactly at `end`.
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }
}

/// One quality level the attached engine exposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityLevel {
    pub height: u32,
    pub bitrate: u64,
    #[serde(default)]
    pub label: Option<String>,
}

/// Quality requested through `set_quality`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QualitySelection {
    /// Let the engine pick per bandwidth.
    #[default]
    Auto,
    /// Pin a level by index into the `ready` quality list.
    Level(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_window_half_open() {
        let w = SkipWindow { start: 10.0, end: 95.5 };
        assert!(!w.contains(9.99));
        assert!(w.contains(10.0));
        assert!(w.contains(95.49));
        assert!(!w.contains(95.5));
    }

    #[test]
    fn test_manifest_deserializes_upstream_shape() {
        let json = r#"{
            "sources": [{"url": "https://cdn.example/ep.m3u8", "isM3U8": true, "quality": "default"}],
            "subtitles": [{"lang": "English", "url": "https://cdn.example/en.vtt"}],
            "intro": {"start": 90, "end": 180}
        }"#;
        let m: ManifestDescriptor = serde_json::from_str(json).unwrap();
        assert!(m.primary_source().unwrap().is_m3u8);
        assert_eq!(m.subtitles[0].lang, "English");
        assert_eq!(m.intro.unwrap().start, 90.0);
        assert!(m.outro.is_none());
    }

    #[test]
    fn test_manifest_missing_optionals() {
        let m: ManifestDescriptor = serde_json::from_str(r#"{"sources": []}"#).unwrap();
        assert!(m.primary_source().is_none());
        assert!(m.subtitles.is_empty());
        assert!(m.intro.is_none() && m.outro.is_none());
    }
}
