// Internal player API strategy
//
// Impersonates official clients one profile at a time. The caption content
// must be fetched with the same User-Agent as the player request; YouTube
// serves different (often empty) bodies otherwise.

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, COOKIE, ORIGIN, USER_AGENT};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::player::PlayerResponse;
use super::{aggregate_attempts, finish_transcript, youtube_status_error};
use crate::transcript::config::TranscriptConfig;
use crate::transcript::errors::TranscriptError;
use crate::transcript::models::{select_track, ClientProfile, VideoId};
use crate::transcript::traits::TranscriptStrategy;

pub struct InnertubeStrategy {
    http: reqwest::Client,
    config: Arc<TranscriptConfig>,
}

impl InnertubeStrategy {
    pub fn new(http: reqwest::Client, config: Arc<TranscriptConfig>) -> Self {
        Self { http, config }
    }

    fn player_url(&self) -> String {
        format!(
            "{}/youtubei/v1/player?prettyPrint=false",
            self.config.youtube_base
        )
    }

    /// Request body for one client profile
    pub fn payload(profile: &ClientProfile, video_id: &VideoId) -> Value {
        let mut context = json!({ "client": profile.client });
        if let Some(embed_url) = profile.embed_url {
            context["thirdParty"] = json!({ "embedUrl": embed_url });
        }
        json!({
            "videoId": video_id.as_str(),
            "context": context,
            "contentCheckOk": true,
            "racyCheckOk": true,
        })
    }

    async fn try_profile(
        &self,
        profile: &ClientProfile,
        video_id: &VideoId,
    ) -> Result<String, TranscriptError> {
        let mut request = self
            .http
            .post(self.player_url())
            .timeout(self.config.timeout)
            .header(USER_AGENT, profile.user_agent)
            .header(CONTENT_TYPE, "application/json")
            .header(ORIGIN, self.config.youtube_base.as_str())
            .json(&Self::payload(profile, video_id));
        if let Some(cookies) = &self.config.cookies {
            request = request.header(COOKIE, cookies.as_str());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(youtube_status_error(response.status(), "Player request"));
        }
        let body = response.text().await?;

        let player = PlayerResponse::parse(&body)?;
        player.ensure_playable()?;

        let tracks = player.caption_tracks();
        let track = select_track(&tracks).ok_or(TranscriptError::NoCaptions)?;
        debug!(
            profile = profile.name,
            language = %track.language_code,
            tracks = tracks.len(),
            "[Innertube] Selected caption track"
        );

        let mut request = self
            .http
            .get(&track.url)
            .timeout(self.config.timeout)
            .header(USER_AGENT, profile.user_agent);
        if let Some(cookies) = &self.config.cookies {
            request = request.header(COOKIE, cookies.as_str());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(youtube_status_error(response.status(), "Caption request"));
        }
        finish_transcript(&response.text().await?)
    }
}

#[async_trait]
impl TranscriptStrategy for InnertubeStrategy {
    fn name(&self) -> &'static str {
        "Innertube"
    }

    async fn fetch(&self, video_id: &VideoId) -> Result<String, TranscriptError> {
        if self.config.profiles.is_empty() {
            return Err(TranscriptError::Config(
                "No client profiles configured".to_string(),
            ));
        }

        let mut attempts = Vec::new();
        for profile in &self.config.profiles {
            match self.try_profile(profile, video_id).await {
                Ok(text) => {
                    info!(profile = profile.name, %video_id, "[Innertube] ✓ Got transcript");
                    return Ok(text);
                }
                Err(e) => {
                    warn!(profile = profile.name, %video_id, error = %e, "[Innertube] Profile failed");
                    attempts.push((profile.name.to_string(), e));
                }
            }
        }

        Err(aggregate_attempts(&attempts))
    }
}
