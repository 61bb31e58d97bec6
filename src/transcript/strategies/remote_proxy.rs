// Remote proxy strategy
//
// Delegates to an externally hosted endpoint that scrapes YouTube from a
// different network. The endpoint takes `?v=<id>` and answers either JSON
// (`{"transcript": ..}` or `{"error": ..}`) or the transcript as plain text.
// Known error codes: BOT_DETECTION, NO_CAPTIONS_FOUND, NO_ENGLISH_TRACK.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::{finish_transcript, status_error};
use crate::transcript::config::TranscriptConfig;
use crate::transcript::errors::TranscriptError;
use crate::transcript::models::VideoId;
use crate::transcript::traits::TranscriptStrategy;

pub struct RemoteProxyStrategy {
    http: reqwest::Client,
    config: Arc<TranscriptConfig>,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct ProxyReply {
    #[serde(default)]
    transcript: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl RemoteProxyStrategy {
    pub fn new(http: reqwest::Client, config: Arc<TranscriptConfig>, endpoint: String) -> Self {
        Self {
            http,
            config,
            endpoint,
        }
    }

    fn request_url(&self, video_id: &VideoId) -> Result<url::Url, TranscriptError> {
        let mut url = url::Url::parse(&self.endpoint).map_err(|e| {
            TranscriptError::Config(format!("Invalid remote proxy URL: {}", e))
        })?;
        url.query_pairs_mut().append_pair("v", video_id.as_str());
        Ok(url)
    }
}

fn reply_to_transcript(body: &str) -> Result<String, TranscriptError> {
    if !body.trim_start().starts_with('{') {
        return finish_transcript(body);
    }
    let reply: ProxyReply = serde_json::from_str(body)?;
    match (reply.transcript, reply.error) {
        (Some(text), _) if !text.trim().is_empty() => finish_transcript(&text),
        (_, Some(error)) => Err(proxy_error(&error)),
        _ => Err(TranscriptError::ParseEmpty),
    }
}

fn proxy_error(code: &str) -> TranscriptError {
    match code.trim() {
        "BOT_DETECTION" => TranscriptError::BotDetection("Proxy: BOT_DETECTION".to_string()),
        "NO_CAPTIONS_FOUND" | "NO_ENGLISH_TRACK" => TranscriptError::NoCaptions,
        other => TranscriptError::from(format!("Proxy: {}", other)),
    }
}

#[async_trait]
impl TranscriptStrategy for RemoteProxyStrategy {
    fn name(&self) -> &'static str {
        "RemoteProxy"
    }

    async fn fetch(&self, video_id: &VideoId) -> Result<String, TranscriptError> {
        let response = self
            .http
            .get(self.request_url(video_id)?)
            .timeout(self.config.timeout)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // The proxy may still explain itself in a JSON error body
            return match reply_to_transcript(&body) {
                Err(
                    e @ (TranscriptError::BotDetection(_)
                    | TranscriptError::NoCaptions
                    | TranscriptError::Failed(_)),
                ) => Err(e),
                _ => Err(status_error(status, "Remote proxy")),
            };
        }

        let text = reply_to_transcript(&body)?;
        info!(%video_id, chars = text.len(), "[RemoteProxy] ✓ Got transcript");
        Ok(text)
    }
}
