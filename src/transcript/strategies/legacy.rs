// Legacy timedtext endpoint - last resort, rarely answers today

use async_trait::async_trait;
use reqwest::header::{COOKIE, USER_AGENT};
use std::sync::Arc;

use super::{finish_transcript, youtube_status_error};
use crate::transcript::config::TranscriptConfig;
use crate::transcript::errors::TranscriptError;
use crate::transcript::models::VideoId;
use crate::transcript::traits::TranscriptStrategy;

pub struct LegacyTimedTextStrategy {
    http: reqwest::Client,
    config: Arc<TranscriptConfig>,
}

impl LegacyTimedTextStrategy {
    pub fn new(http: reqwest::Client, config: Arc<TranscriptConfig>) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl TranscriptStrategy for LegacyTimedTextStrategy {
    fn name(&self) -> &'static str {
        "LegacyAPI"
    }

    async fn fetch(&self, video_id: &VideoId) -> Result<String, TranscriptError> {
        let url = format!(
            "{}/timedtext?lang=en&v={}",
            self.config.legacy_base, video_id
        );
        let mut request = self
            .http
            .get(&url)
            .timeout(self.config.timeout)
            .header(USER_AGENT, "Mozilla/5.0");
        if let Some(cookies) = &self.config.cookies {
            request = request.header(COOKIE, cookies.as_str());
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(youtube_status_error(response.status(), "Legacy timedtext"));
        }

        let body = response.text().await?;
        if !body.contains("<transcript") {
            return Err(TranscriptError::Failed(
                "Legacy endpoint returned no transcript".to_string(),
            ));
        }
        finish_transcript(&body)
    }
}
