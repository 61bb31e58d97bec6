// Player response shape shared by the internal API and the watch page
//
// Every field is optional: absent or wrong-typed data becomes a strategy
// failure instead of a crash.

use serde::Deserialize;
use serde_json::Value;

use crate::transcript::diagnostics::{diagnose_error, is_bot_challenge};
use crate::transcript::errors::TranscriptError;
use crate::transcript::models::CaptionTrack;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResponse {
    #[serde(default)]
    pub playability_status: Option<PlayabilityStatus>,
    #[serde(default)]
    pub captions: Option<Captions>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlayabilityStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Captions {
    #[serde(default)]
    pub player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracklistRenderer {
    #[serde(default)]
    pub caption_tracks: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTrack {
    base_url: String,
    #[serde(default)]
    language_code: Option<String>,
    #[serde(default)]
    name: Value,
}

impl PlayerResponse {
    /// Decode a player JSON document; shape mismatches become `Parse`
    pub fn parse(json: &str) -> Result<Self, TranscriptError> {
        let value: Value = serde_json::from_str(json)?;
        if !value.is_object() {
            return Err(TranscriptError::Parse(
                "Player response is not an object".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(|e| {
            TranscriptError::Parse(format!("Unexpected player response shape: {}", e))
        })
    }

    pub fn status(&self) -> Option<&str> {
        self.playability_status
            .as_ref()
            .and_then(|p| p.status.as_deref())
    }

    /// Err unless the playability status is "OK"
    pub fn ensure_playable(&self) -> Result<(), TranscriptError> {
        let status = self.status().unwrap_or("UNKNOWN");
        if status == "OK" {
            return Ok(());
        }
        let reason = self
            .playability_status
            .as_ref()
            .and_then(|p| p.reason.clone())
            .unwrap_or_else(|| "no reason given".to_string());
        Err(playability_error(status, &reason))
    }

    /// Caption tracks with a usable URL, in upstream order
    pub fn caption_tracks(&self) -> Vec<CaptionTrack> {
        let raw = self
            .captions
            .as_ref()
            .and_then(|c| c.player_captions_tracklist_renderer.as_ref())
            .and_then(|r| r.caption_tracks.as_ref());

        let Some(raw) = raw else {
            return Vec::new();
        };

        raw.iter()
            .filter_map(|v| serde_json::from_value::<RawTrack>(v.clone()).ok())
            .filter(|t| !t.base_url.is_empty())
            .map(|t| CaptionTrack {
                language_code: t.language_code.unwrap_or_default(),
                name: display_name(&t.name),
                url: t.base_url,
                ext: None,
            })
            .collect()
    }
}

fn playability_error(status: &str, reason: &str) -> TranscriptError {
    let blocked = is_bot_challenge(reason)
        || diagnose_error(reason).map_or(false, |r| r.is_server_block());
    if blocked {
        TranscriptError::BotDetection(format!("{}: {}", status, reason))
    } else {
        TranscriptError::Upstream {
            status: status.to_string(),
            reason: reason.to_string(),
        }
    }
}

// `{"simpleText": ..}` or `{"runs": [{"text": ..}]}`
fn display_name(name: &Value) -> Option<String> {
    if let Some(text) = name.get("simpleText").and_then(Value::as_str) {
        return Some(text.to_string());
    }
    let runs = name.get("runs")?.as_array()?;
    let joined: String = runs
        .iter()
        .filter_map(|r| r.get("text").and_then(Value::as_str))
        .collect();
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tracks_with_both_name_shapes() {
        let json = r#"{
            "playabilityStatus": {"status": "OK"},
            "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": [
                {"baseUrl": "https://a/de", "languageCode": "de", "name": {"simpleText": "German"}},
                {"baseUrl": "https://a/en", "languageCode": "en", "name": {"runs": [{"text": "English"}, {"text": " (auto)"}]}},
                {"languageCode": "fr"},
                {"baseUrl": 12}
            ]}}
        }"#;
        let resp = PlayerResponse::parse(json).unwrap();
        assert!(resp.ensure_playable().is_ok());
        let tracks = resp.caption_tracks();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].name.as_deref(), Some("German"));
        assert_eq!(tracks[1].name.as_deref(), Some("English (auto)"));
    }

    #[test]
    fn login_required_bot_reason_is_blocking() {
        let json = r#"{"playabilityStatus": {"status": "LOGIN_REQUIRED", "reason": "Sign in to confirm you're not a bot"}}"#;
        let err = PlayerResponse::parse(json).unwrap().ensure_playable().unwrap_err();
        assert!(err.is_blocking());
        assert!(err.to_string().contains("LOGIN_REQUIRED"));
    }

    #[test]
    fn plain_unplayable_is_upstream_error() {
        let json = r#"{"playabilityStatus": {"status": "ERROR", "reason": "Video unavailable"}}"#;
        let err = PlayerResponse::parse(json).unwrap().ensure_playable().unwrap_err();
        assert!(matches!(err, TranscriptError::Upstream { .. }));
        assert_eq!(err.to_string(), "ERROR: Video unavailable");
    }

    #[test]
    fn wrong_types_are_parse_failures_not_panics() {
        assert!(PlayerResponse::parse("[1,2,3]").is_err());
        assert!(PlayerResponse::parse(r#"{"captions": "nope"}"#).is_err());
        let missing = PlayerResponse::parse("{}").unwrap();
        assert!(missing.ensure_playable().is_err());
        assert!(missing.caption_tracks().is_empty());
    }
}
