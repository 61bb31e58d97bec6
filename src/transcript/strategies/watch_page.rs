// Watch-page scraping strategy
//
// Pulls the inline `ytInitialPlayerResponse` object out of the watch HTML and
// reuses its caption tracks. The object sits inside a script body, so it is
// isolated with a brace-depth scan rather than a regex over the JSON.

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{ACCEPT_LANGUAGE, COOKIE, REFERER, USER_AGENT};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::player::PlayerResponse;
use super::{finish_transcript, youtube_status_error};
use crate::transcript::config::TranscriptConfig;
use crate::transcript::diagnostics::is_bot_challenge;
use crate::transcript::errors::TranscriptError;
use crate::transcript::models::{select_track, VideoId, DESKTOP_USER_AGENT};
use crate::transcript::traits::TranscriptStrategy;
use crate::transcript::utils::response_cookies;

lazy_static::lazy_static! {
    static ref PLAYER_ASSIGNMENT_RE: Regex =
        Regex::new(r"ytInitialPlayerResponse\s*=\s*\{").unwrap();
}

/// Real watch pages are hundreds of KB; anything this small is a block or redirect page
pub const MIN_PAGE_BYTES: usize = 10_000;

/// Pre-accepted consent so EU-routed requests skip the consent interstitial
const CONSENT_COOKIE: &str = "CONSENT=YES+yt.453767867.en+FP+XXXXXXXXXX";

const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";

pub struct WatchPageStrategy {
    http: reqwest::Client,
    config: Arc<TranscriptConfig>,
}

impl WatchPageStrategy {
    pub fn new(http: reqwest::Client, config: Arc<TranscriptConfig>) -> Self {
        Self { http, config }
    }

    fn watch_url(&self, video_id: &VideoId) -> String {
        format!("{}/watch?v={}", self.config.youtube_base, video_id)
    }

    fn cookie_header(&self, session: &[String]) -> String {
        let mut parts = vec![CONSENT_COOKIE.to_string()];
        parts.extend(session.iter().cloned());
        if let Some(cookies) = &self.config.cookies {
            parts.push(cookies.clone());
        }
        parts.join("; ")
    }

    async fn fetch_caption(
        &self,
        url: &str,
        user_agent: &str,
        cookies: &str,
        referer: &str,
    ) -> Result<String, TranscriptError> {
        let response = self
            .http
            .get(url)
            .timeout(self.config.timeout)
            .header(USER_AGENT, user_agent)
            .header(COOKIE, cookies)
            .header(REFERER, referer)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(youtube_status_error(response.status(), "Caption request"));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl TranscriptStrategy for WatchPageStrategy {
    fn name(&self) -> &'static str {
        "WatchPage"
    }

    async fn fetch(&self, video_id: &VideoId) -> Result<String, TranscriptError> {
        let watch_url = self.watch_url(video_id);
        let response = self
            .http
            .get(&watch_url)
            .timeout(self.config.timeout)
            .header(USER_AGENT, DESKTOP_USER_AGENT)
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header(COOKIE, self.cookie_header(&[]))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(youtube_status_error(response.status(), "Watch page"));
        }

        let session = response_cookies(response.headers());
        let html = response.text().await?;

        if html.len() < MIN_PAGE_BYTES {
            if is_bot_challenge(&html) {
                return Err(TranscriptError::BotDetection(
                    "Watch page is a bot challenge".to_string(),
                ));
            }
            return Err(TranscriptError::Failed(format!(
                "Watch page too small ({} bytes)",
                html.len()
            )));
        }

        let Some(json) = extract_player_response(&html) else {
            if is_bot_challenge(&html) {
                return Err(TranscriptError::BotDetection(
                    "Watch page looks like a bot-block page".to_string(),
                ));
            }
            return Err(TranscriptError::Failed("No player data in page".to_string()));
        };

        let player = PlayerResponse::parse(json)?;
        let tracks = player.caption_tracks();
        if tracks.is_empty() {
            player.ensure_playable()?;
            return Err(TranscriptError::NoCaptions);
        }
        let track = select_track(&tracks).ok_or(TranscriptError::NoCaptions)?;
        debug!(%video_id, language = %track.language_code, session_cookies = session.len(), "[WatchPage] Selected caption track");

        let cookies = self.cookie_header(&session);
        let body = self
            .fetch_caption(&track.url, DESKTOP_USER_AGENT, &cookies, &watch_url)
            .await?;

        let body = if body.trim().is_empty() {
            warn!(%video_id, "[WatchPage] Empty caption body, retrying with mobile User-Agent");
            self.fetch_caption(&track.url, MOBILE_USER_AGENT, &cookies, &watch_url)
                .await?
        } else {
            body
        };

        let text = finish_transcript(&body)?;
        info!(%video_id, chars = text.len(), "[WatchPage] ✓ Got transcript");
        Ok(text)
    }
}

/// Isolate the JSON object assigned to `ytInitialPlayerResponse`.
///
/// Scans from the opening brace, tracking depth outside string literals.
pub fn extract_player_response(html: &str) -> Option<&str> {
    for found in PLAYER_ASSIGNMENT_RE.find_iter(html) {
        let start = found.end() - 1;
        if let Some(end) = matching_brace(&html.as_bytes()[start..]) {
            return Some(&html[start..start + end + 1]);
        }
    }
    None
}

// Offset of the brace closing the one at bytes[0]
fn matching_brace(bytes: &[u8]) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
