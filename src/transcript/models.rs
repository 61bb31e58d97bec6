// Common data models for the transcript cascade

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::TranscriptError;
use super::utils::truncate_chars;

/// Canonical 11-character YouTube video identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoId(String);

impl VideoId {
    /// Callers go through `video_id::extract_video_id` / `parse_video_id`,
    /// which check the `[A-Za-z0-9_-]{11}` shape first.
    pub(crate) fn from_validated(id: &str) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch-page URL
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// `context.client` payload sent to the player endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContext {
    pub client_name: &'static str,
    pub client_version: &'static str,
    pub hl: &'static str,
    pub gl: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub android_sdk_version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_model: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_name: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_version: Option<&'static str>,
}

/// Named impersonation configuration for the internal player API
#[derive(Debug, Clone, PartialEq)]
pub struct ClientProfile {
    /// Display name (for logging)
    pub name: &'static str,
    /// User-Agent for both the player request and the caption fetch
    pub user_agent: &'static str,
    pub client: ClientContext,
    /// `thirdParty.embedUrl`, required by embedded-player clients
    pub embed_url: Option<&'static str>,
}

impl ClientProfile {
    /// Default priority order: two mobile clients, a TV/embedded client, desktop web
    pub fn defaults() -> Vec<ClientProfile> {
        vec![
            ClientProfile {
                name: "ANDROID",
                user_agent: "com.google.android.youtube/19.09.37 (Linux; U; Android 12; US) gzip",
                client: ClientContext {
                    client_name: "ANDROID",
                    client_version: "19.09.37",
                    hl: "en",
                    gl: "US",
                    android_sdk_version: Some(31),
                    device_model: None,
                    os_name: Some("Android"),
                    os_version: Some("12"),
                },
                embed_url: None,
            },
            ClientProfile {
                name: "IOS",
                user_agent: "com.google.ios.youtube/19.09.3 (iPhone14,3; U; CPU iOS 17_0 like Mac OS X; en_US)",
                client: ClientContext {
                    client_name: "IOS",
                    client_version: "19.09.3",
                    hl: "en",
                    gl: "US",
                    android_sdk_version: None,
                    device_model: Some("iPhone14,3"),
                    os_name: Some("iPhone"),
                    os_version: Some("17.0.0.21A329"),
                },
                embed_url: None,
            },
            ClientProfile {
                name: "TV_EMBEDDED",
                user_agent: "Mozilla/5.0 (ChromiumStylePlatform) Cobalt/Version",
                client: ClientContext {
                    client_name: "TVHTML5_SIMPLY_EMBEDDED_PLAYER",
                    client_version: "2.0",
                    hl: "en",
                    gl: "US",
                    android_sdk_version: None,
                    device_model: None,
                    os_name: None,
                    os_version: None,
                },
                embed_url: Some("https://www.google.com"),
            },
            ClientProfile {
                name: "WEB",
                user_agent: DESKTOP_USER_AGENT,
                client: ClientContext {
                    client_name: "WEB",
                    client_version: "2.20240304.00.00",
                    hl: "en",
                    gl: "US",
                    android_sdk_version: None,
                    device_model: None,
                    os_name: None,
                    os_version: None,
                },
                embed_url: None,
            },
        ]
    }
}

pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// One language/format variant of a video's subtitles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionTrack {
    pub language_code: String,
    pub name: Option<String>,
    /// Content URL; may be relative to a mirror's base URL
    pub url: String,
    /// Format/extension hint (vtt, srv3, ttml)
    pub ext: Option<String>,
}

impl CaptionTrack {
    pub fn is_english(&self) -> bool {
        self.language_code == "en" || self.language_code.starts_with("en")
    }

    pub fn is_named_english(&self) -> bool {
        self.name
            .as_ref()
            .map_or(false, |n| n.to_lowercase().contains("english"))
    }
}

/// Prefer an English track, otherwise the first one in upstream order
pub fn select_track(tracks: &[CaptionTrack]) -> Option<&CaptionTrack> {
    tracks.iter().find(|t| t.is_english()).or_else(|| tracks.first())
}

/// Base URL of a community-run Piped/Invidious server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MirrorInstance {
    base_url: String,
}

impl MirrorInstance {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}{path}`; `path` must start with '/'
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Resolve a possibly base-relative track URL against this instance
    pub fn resolve(&self, track_url: &str) -> Result<String, TranscriptError> {
        if let Ok(absolute) = url::Url::parse(track_url) {
            return Ok(absolute.to_string());
        }
        let base = url::Url::parse(&format!("{}/", self.base_url)).map_err(|e| {
            TranscriptError::Config(format!("Invalid instance URL {}: {}", self.base_url, e))
        })?;
        base.join(track_url)
            .map(|u| u.to_string())
            .map_err(|e| TranscriptError::Parse(format!("Bad track URL {}: {}", track_url, e)))
    }
}

impl fmt::Display for MirrorInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url)
    }
}

/// One strategy's failure during a cascade run
#[derive(Debug, Clone)]
pub struct StrategyFailure {
    pub strategy: String,
    pub error: TranscriptError,
}

impl StrategyFailure {
    pub fn new(strategy: &str, error: TranscriptError) -> Self {
        Self {
            strategy: strategy.to_string(),
            error,
        }
    }

    /// `Name: message`, with the message cut to `max_message` chars
    pub fn label(&self, max_message: usize) -> String {
        format!(
            "{}: {}",
            self.strategy,
            truncate_chars(&self.error.to_string(), max_message)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(code: &str) -> CaptionTrack {
        CaptionTrack {
            language_code: code.to_string(),
            name: None,
            url: format!("https://example.com/{}", code),
            ext: None,
        }
    }

    #[test]
    fn select_prefers_english_anywhere() {
        for pos in 0..4 {
            let mut tracks = vec![track("de"), track("fr"), track("es")];
            tracks.insert(pos, track("en-GB"));
            assert_eq!(select_track(&tracks).unwrap().language_code, "en-GB");
        }
    }

    #[test]
    fn select_falls_back_to_first() {
        let tracks = vec![track("ja"), track("de")];
        assert_eq!(select_track(&tracks).unwrap().language_code, "ja");
        assert!(select_track(&[]).is_none());
    }

    #[test]
    fn mirror_resolves_relative_urls() {
        let inst = MirrorInstance::new("https://inv.example.org/");
        assert_eq!(inst.base_url(), "https://inv.example.org");
        assert_eq!(
            inst.resolve("/api/v1/captions/abc?label=English").unwrap(),
            "https://inv.example.org/api/v1/captions/abc?label=English"
        );
        assert_eq!(
            inst.resolve("https://cdn.example.com/sub.vtt").unwrap(),
            "https://cdn.example.com/sub.vtt"
        );
    }

    #[test]
    fn default_profiles_cover_required_platforms() {
        let profiles = ClientProfile::defaults();
        let names: Vec<&str> = profiles.iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["ANDROID", "IOS", "TV_EMBEDDED", "WEB"]);
        let mut agents: Vec<&str> = profiles.iter().map(|p| p.user_agent).collect();
        agents.dedup();
        assert_eq!(agents.len(), 4);
    }

    #[test]
    fn failure_label_is_bounded() {
        let f = StrategyFailure::new("Piped", TranscriptError::Failed("x".repeat(500)));
        let label = f.label(100);
        assert!(label.starts_with("Piped: "));
        assert!(label.chars().count() <= "Piped: ".len() + 103);
    }
}
