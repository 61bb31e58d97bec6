// Mirror federation strategies (Piped, Invidious)
//
// The same two-step query (track list, then track content) is raced against
// every configured instance at once. First non-empty transcript wins; the
// remaining requests are dropped with the race.

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::header::{HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{finish_transcript, status_error, ATTEMPT_MESSAGE_CHARS};
use crate::transcript::config::TranscriptConfig;
use crate::transcript::errors::TranscriptError;
use crate::transcript::models::{select_track, CaptionTrack, MirrorInstance, VideoId};
use crate::transcript::traits::TranscriptStrategy;
use crate::transcript::utils::truncate_chars;

/// Mirrors answer tiny bodies for missing or broken tracks
pub const MIN_CAPTION_BYTES: usize = 50;

/// Endpoint and response-shape differences between mirror families
pub trait MirrorApi: Send + Sync + 'static {
    const FAMILY: &'static str;

    /// Path (with leading '/') of the track-list endpoint
    fn tracks_path(video_id: &VideoId) -> String;

    fn parse_tracks(body: &str) -> Result<Vec<CaptionTrack>, TranscriptError>;

    fn select(tracks: &[CaptionTrack]) -> Option<&CaptionTrack> {
        select_track(tracks)
    }

    /// Family-specific cleanup before generic normalization
    fn clean(raw: &str) -> String {
        raw.to_string()
    }
}

/// Piped: `/streams/{id}` → `{subtitles: [{code, url, name, mimeType}]}`
pub struct Piped;

#[derive(Debug, Deserialize)]
struct PipedStreams {
    #[serde(default)]
    subtitles: Option<Vec<Value>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PipedSubtitle {
    url: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    language_code: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
}

impl MirrorApi for Piped {
    const FAMILY: &'static str = "Piped";

    fn tracks_path(video_id: &VideoId) -> String {
        format!("/streams/{}", video_id)
    }

    fn parse_tracks(body: &str) -> Result<Vec<CaptionTrack>, TranscriptError> {
        let streams: PipedStreams = serde_json::from_str(body)?;
        if let Some(error) = streams.error {
            return Err(TranscriptError::Upstream {
                status: "error".to_string(),
                reason: error,
            });
        }
        Ok(streams
            .subtitles
            .unwrap_or_default()
            .into_iter()
            .filter_map(|v| serde_json::from_value::<PipedSubtitle>(v).ok())
            .map(|s| CaptionTrack {
                language_code: s.code.or(s.language_code).unwrap_or_default(),
                name: s.name,
                ext: s.mime_type.as_deref().map(ext_from_mime),
                url: s.url,
            })
            .collect())
    }

    // Piped sometimes leaves the code empty but names the track "English"
    fn select(tracks: &[CaptionTrack]) -> Option<&CaptionTrack> {
        tracks
            .iter()
            .find(|t| t.is_english())
            .or_else(|| tracks.iter().find(|t| t.is_named_english()))
            .or_else(|| tracks.first())
    }

    // Piped's VTT keeps bare cue numbers even without timing lines
    fn clean(raw: &str) -> String {
        raw.lines()
            .filter(|l| {
                let t = l.trim();
                t.is_empty() || !t.bytes().all(|b| b.is_ascii_digit())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn ext_from_mime(mime: &str) -> String {
    match mime {
        m if m.contains("vtt") => "vtt".to_string(),
        m if m.contains("ttml") => "ttml".to_string(),
        m => m.rsplit('/').next().unwrap_or(m).to_string(),
    }
}

/// Invidious: `/api/v1/captions/{id}` → `{captions: [{languageCode, label, url}]}`
pub struct Invidious;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InvidiousCaptions {
    Wrapped { captions: Vec<Value> },
    Bare(Vec<Value>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvidiousCaption {
    url: String,
    #[serde(default)]
    language_code: Option<String>,
    #[serde(default)]
    label: Option<String>,
}

impl MirrorApi for Invidious {
    const FAMILY: &'static str = "Invidious";

    fn tracks_path(video_id: &VideoId) -> String {
        format!("/api/v1/captions/{}", video_id)
    }

    fn parse_tracks(body: &str) -> Result<Vec<CaptionTrack>, TranscriptError> {
        let entries = match serde_json::from_str::<InvidiousCaptions>(body) {
            Ok(InvidiousCaptions::Wrapped { captions }) => captions,
            Ok(InvidiousCaptions::Bare(list)) => list,
            Err(_) => {
                return Err(TranscriptError::Parse(
                    "Unexpected Invidious captions response".to_string(),
                ))
            }
        };
        Ok(entries
            .into_iter()
            .filter_map(|v| serde_json::from_value::<InvidiousCaption>(v).ok())
            .map(|c| CaptionTrack {
                language_code: c.language_code.unwrap_or_default(),
                name: c.label,
                url: c.url,
                ext: Some("vtt".to_string()),
            })
            .collect())
    }
}

pub struct FederationStrategy<A: MirrorApi> {
    http: reqwest::Client,
    config: Arc<TranscriptConfig>,
    instances: Vec<MirrorInstance>,
    _api: PhantomData<A>,
}

pub type PipedStrategy = FederationStrategy<Piped>;
pub type InvidiousStrategy = FederationStrategy<Invidious>;

impl FederationStrategy<Piped> {
    pub fn piped(http: reqwest::Client, config: Arc<TranscriptConfig>) -> Self {
        let instances = config.piped_instances.clone();
        Self::with_instances(http, config, instances)
    }
}

impl FederationStrategy<Invidious> {
    pub fn invidious(http: reqwest::Client, config: Arc<TranscriptConfig>) -> Self {
        let instances = config.invidious_instances.clone();
        Self::with_instances(http, config, instances)
    }
}

impl<A: MirrorApi> FederationStrategy<A> {
    pub fn with_instances(
        http: reqwest::Client,
        config: Arc<TranscriptConfig>,
        instances: Vec<MirrorInstance>,
    ) -> Self {
        Self {
            http,
            config,
            instances,
            _api: PhantomData,
        }
    }

    pub fn instances(&self) -> &[MirrorInstance] {
        &self.instances
    }

    /// Step one: the instance's caption track list
    pub(crate) async fn list_tracks(
        http: &reqwest::Client,
        instance: &MirrorInstance,
        video_id: &VideoId,
        timeout: Duration,
    ) -> Result<Vec<CaptionTrack>, TranscriptError> {
        let response = http
            .get(instance.endpoint(&A::tracks_path(video_id)))
            .timeout(timeout)
            .header(USER_AGENT, HeaderValue::from_static(""))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(status_error(response.status(), "Track list"));
        }
        A::parse_tracks(&response.text().await?)
    }

    async fn query_instance(
        http: &reqwest::Client,
        instance: &MirrorInstance,
        video_id: &VideoId,
        timeout: Duration,
    ) -> Result<String, TranscriptError> {
        let tracks = Self::list_tracks(http, instance, video_id, timeout).await?;
        let track = A::select(&tracks).ok_or(TranscriptError::NoCaptions)?;
        let url = instance.resolve(&track.url)?;

        let response = http
            .get(&url)
            .timeout(timeout)
            .header(USER_AGENT, HeaderValue::from_static(""))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(status_error(response.status(), "Caption request"));
        }
        let body = response.text().await?;
        if body.len() < MIN_CAPTION_BYTES {
            return Err(TranscriptError::Failed(format!(
                "Caption body too small ({} bytes)",
                body.len()
            )));
        }

        finish_transcript(&A::clean(&body))
    }
}

#[async_trait]
impl<A: MirrorApi> TranscriptStrategy for FederationStrategy<A> {
    fn name(&self) -> &'static str {
        A::FAMILY
    }

    async fn fetch(&self, video_id: &VideoId) -> Result<String, TranscriptError> {
        if self.instances.is_empty() {
            return Err(TranscriptError::Failed(format!(
                "No {} instances configured",
                A::FAMILY
            )));
        }

        let timeout = self.config.mirror_timeout;
        let mut race: FuturesUnordered<_> = self
            .instances
            .iter()
            .map(|instance| {
                let http = &self.http;
                async move {
                    let result = tokio::time::timeout(
                        timeout,
                        Self::query_instance(http, instance, video_id, timeout),
                    )
                    .await
                    .unwrap_or_else(|_| {
                        Err(TranscriptError::Timeout(format!(
                            "no answer within {}s",
                            timeout.as_secs_f32()
                        )))
                    });
                    (instance, result)
                }
            })
            .collect();

        let mut failures = Vec::with_capacity(self.instances.len());
        while let Some((instance, result)) = race.next().await {
            match result {
                Ok(text) => {
                    info!(
                        family = A::FAMILY,
                        instance = instance.base_url(),
                        %video_id,
                        "[Federation] ✓ Instance won the race"
                    );
                    return Ok(text);
                }
                Err(e) => {
                    debug!(
                        family = A::FAMILY,
                        instance = instance.base_url(),
                        error = %e,
                        "[Federation] Instance failed"
                    );
                    failures.push(format!(
                        "{}: {}",
                        instance.base_url(),
                        truncate_chars(&e.to_string(), ATTEMPT_MESSAGE_CHARS)
                    ));
                }
            }
        }

        Err(TranscriptError::Failed(format!(
            "All {} {} instances failed: {}",
            failures.len(),
            A::FAMILY,
            failures.join("; ")
        )))
    }
}
