// yt-dlp strategy - uses the native `yt-dlp` binary for metadata only
//
// yt-dlp resolves signed caption URLs that plain HTTP clients cannot get.
// The caption file itself is fetched directly, not through the binary.
//
// Tries several player clients in order; a missing binary ends the strategy.

use async_trait::async_trait;
use reqwest::header::{COOKIE, USER_AGENT};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::{aggregate_attempts, finish_transcript, youtube_status_error};
use crate::transcript::config::TranscriptConfig;
use crate::transcript::errors::TranscriptError;
use crate::transcript::models::{CaptionTrack, VideoId, DESKTOP_USER_AGENT};
use crate::transcript::traits::TranscriptStrategy;
use crate::transcript::utils::{run_output_with_timeout, truncate_chars};

/// Extension preference when a language offers several formats
const FORMAT_PREFERENCE: &[&str] = &["vtt", "srv3", "ttml"];

/// Upper bound for the `--version` check
const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Stdout kept in the error when yt-dlp fails without stderr
const STDOUT_EXCERPT_CHARS: usize = 200;

pub struct YtDlpStrategy {
    http: reqwest::Client,
    config: Arc<TranscriptConfig>,
    ytdlp_path: String,
    version_check: OnceCell<Result<(), TranscriptError>>,
}

impl YtDlpStrategy {
    pub fn new(http: reqwest::Client, config: Arc<TranscriptConfig>) -> Self {
        let ytdlp_path = find_ytdlp(config.ytdlp_path.as_deref());
        Self {
            http,
            config,
            ytdlp_path,
            version_check: OnceCell::new(),
        }
    }

    pub fn ytdlp_path(&self) -> &str {
        &self.ytdlp_path
    }

    /// Check that the binary runs (`--version`); cached after the first call.
    /// Anything short of a clean exit counts as a missing tool.
    async fn has_ytdlp_binary(&self) -> Result<(), TranscriptError> {
        self.version_check
            .get_or_init(|| async {
                let bound = self.config.ytdlp_timeout.min(VERSION_CHECK_TIMEOUT);
                let args = ["--version".to_string()];
                match run_output_with_timeout(&self.ytdlp_path, &args, bound).await {
                    Ok(out) if out.status.success() => {
                        debug!(
                            path = %self.ytdlp_path,
                            version = %String::from_utf8_lossy(&out.stdout).trim(),
                            "[YtDlp] Binary found"
                        );
                        Ok(())
                    }
                    Ok(out) => Err(TranscriptError::ToolNotFound(format!(
                        "{} --version exited with {}",
                        self.ytdlp_path, out.status
                    ))),
                    Err(e @ TranscriptError::ToolNotFound(_)) => Err(e),
                    Err(e) => Err(TranscriptError::ToolNotFound(format!(
                        "{} --version failed: {}",
                        self.ytdlp_path, e
                    ))),
                }
            })
            .await
            .clone()
    }

    /// Argument list for one player client. Passed as an argv array, never through a shell.
    pub fn build_args(&self, video_id: &VideoId, client: &str) -> Vec<String> {
        let mut args = vec![
            "--dump-single-json".to_string(),
            "--skip-download".to_string(),
            "--no-warnings".to_string(),
            "--user-agent".to_string(),
            DESKTOP_USER_AGENT.to_string(),
            "--extractor-args".to_string(),
            format!("youtube:player_client={}", client),
        ];

        if let Some(proxy) = &self.config.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }

        if self.config.geo_bypass {
            args.push("--geo-bypass".to_string());
        }

        if let Some(cookies) = &self.config.cookies {
            args.push("--add-header".to_string());
            args.push(format!("Cookie:{}", cookies));
        }

        args.push(video_id.watch_url());
        args
    }

    async fn transcript_from_metadata(&self, stdout: &[u8]) -> Result<String, TranscriptError> {
        let metadata = parse_metadata(stdout)?;
        let track = metadata.english_track().ok_or(TranscriptError::NoCaptions)?;
        debug!(
            language = %track.language_code,
            ext = track.ext.as_deref().unwrap_or("?"),
            "[YtDlp] Selected subtitle"
        );

        let mut request = self
            .http
            .get(&track.url)
            .timeout(self.config.timeout)
            .header(USER_AGENT, DESKTOP_USER_AGENT);
        if let Some(cookies) = &self.config.cookies {
            request = request.header(COOKIE, cookies.as_str());
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(youtube_status_error(response.status(), "Subtitle request"));
        }
        finish_transcript(&response.text().await?)
    }
}

#[async_trait]
impl TranscriptStrategy for YtDlpStrategy {
    fn name(&self) -> &'static str {
        "YtDlp"
    }

    async fn fetch(&self, video_id: &VideoId) -> Result<String, TranscriptError> {
        self.has_ytdlp_binary().await?;
        if self.config.ytdlp_clients.is_empty() {
            return Err(TranscriptError::Config(
                "No yt-dlp player clients configured".to_string(),
            ));
        }

        let mut attempts = Vec::new();
        for client in &self.config.ytdlp_clients {
            debug!(client = %client, path = %self.ytdlp_path, %video_id, "[YtDlp] Trying client");

            let output =
                run_output_with_timeout(&self.ytdlp_path, &self.build_args(video_id, client), self.config.ytdlp_timeout)
                    .await;

            let result = match output {
                Err(e @ TranscriptError::ToolNotFound(_)) => return Err(e),
                Err(e) => Err(e),
                Ok(out) if !out.status.success() => Err(exit_error(&out)),
                Ok(out) => self.transcript_from_metadata(&out.stdout).await,
            };

            match result {
                Ok(text) => {
                    info!(client = %client, %video_id, "[YtDlp] ✓ Got transcript");
                    return Ok(text);
                }
                Err(e) => {
                    warn!(client = %client, %video_id, error = %e, "[YtDlp] Client failed");
                    attempts.push((client.clone(), e));
                }
            }
        }

        Err(aggregate_attempts(&attempts))
    }
}

/// Classify a failed run by its stderr, falling back to the exit status and stdout
fn exit_error(out: &std::process::Output) -> TranscriptError {
    let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
    if !stderr.is_empty() {
        return TranscriptError::from(stderr);
    }
    let stdout = String::from_utf8_lossy(&out.stdout);
    let stdout = stdout.trim();
    if stdout.is_empty() {
        TranscriptError::Execution(format!("yt-dlp exited with {}", out.status))
    } else {
        TranscriptError::Execution(format!(
            "yt-dlp exited with {}: {}",
            out.status,
            truncate_chars(stdout, STDOUT_EXCERPT_CHARS)
        ))
    }
}

/// Locate the yt-dlp binary: configured path, common install locations,
/// else the bare name for PATH lookup at spawn time
pub fn find_ytdlp(configured: Option<&Path>) -> String {
    if let Some(path) = configured {
        return path.to_string_lossy().into_owned();
    }

    let mut candidates: Vec<PathBuf> = vec![
        PathBuf::from("/opt/homebrew/bin/yt-dlp"), // Homebrew on Apple Silicon
        PathBuf::from("/usr/local/bin/yt-dlp"),    // Homebrew on Intel / pip --user on Linux
        PathBuf::from("/usr/bin/yt-dlp"),          // System package
    ];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".local/bin/yt-dlp"));
    }

    for path in candidates {
        if path.exists() {
            return path.to_string_lossy().into_owned();
        }
    }

    "yt-dlp".to_string()
}

/// The parts of yt-dlp's `--dump-single-json` output this strategy reads
#[derive(Debug, Default, Deserialize)]
pub struct VideoMetadata {
    #[serde(default)]
    pub subtitles: Option<BTreeMap<String, Vec<SubtitleEntry>>>,
    #[serde(default)]
    pub automatic_captions: Option<BTreeMap<String, Vec<SubtitleEntry>>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubtitleEntry {
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

pub fn parse_metadata(stdout: &[u8]) -> Result<VideoMetadata, TranscriptError> {
    let json_str = String::from_utf8_lossy(stdout);
    serde_json::from_str(json_str.trim())
        .map_err(|e| TranscriptError::Parse(format!("Invalid JSON: {}", e)))
}

impl VideoMetadata {
    /// Manual English subtitles win over automatic captions
    pub fn english_track(&self) -> Option<CaptionTrack> {
        [&self.subtitles, &self.automatic_captions]
            .into_iter()
            .flatten()
            .find_map(english_entries)
    }
}

fn english_entries(map: &BTreeMap<String, Vec<SubtitleEntry>>) -> Option<CaptionTrack> {
    let (lang, entries) = map
        .get_key_value("en")
        .filter(|(_, e)| has_url(e))
        .or_else(|| {
            map.iter()
                .find(|(lang, e)| lang.starts_with("en") && has_url(e))
        })?;

    let entry = pick_format(entries)?;
    Some(CaptionTrack {
        language_code: lang.clone(),
        name: entry.name.clone(),
        url: entry.url.clone()?,
        ext: entry.ext.clone(),
    })
}

fn has_url(entries: &[SubtitleEntry]) -> bool {
    entries.iter().any(|e| e.url.is_some())
}

/// vtt, then srv3, then ttml, else the first entry with a URL
fn pick_format(entries: &[SubtitleEntry]) -> Option<&SubtitleEntry> {
    let usable = || entries.iter().filter(|e| e.url.is_some());
    FORMAT_PREFERENCE
        .iter()
        .find_map(|ext| usable().find(|e| e.ext.as_deref() == Some(*ext)))
        .or_else(|| usable().next())
}
