// Cascade orchestrator with fallback logic
//
// Strategies run strictly one after another in a fixed order. The first
// non-empty transcript wins; every failure is recorded and the cascade moves
// on. When all strategies fail, one aggregated error carries a bounded,
// strategy-labeled digest of what went wrong.

use std::sync::Arc;
use tracing::{error, info, warn};

use super::config::TranscriptConfig;
use super::diagnostics::{blocking_advice, BlockingReason};
use super::errors::TranscriptError;
use super::models::{StrategyFailure, VideoId};
use super::strategies::{
    InnertubeStrategy, InvidiousStrategy, LegacyTimedTextStrategy, PipedStrategy,
    RemoteProxyStrategy, WatchPageStrategy, YtDlpStrategy,
};
use super::traits::TranscriptStrategy;
use super::utils::{build_http_client, truncate_chars};

/// Hard cap for the failure digest embedded in the final error
pub const SUMMARY_MAX_CHARS: usize = 300;
/// Per-entry cap before the shared budget is applied
pub const ENTRY_MAX_CHARS: usize = 100;
const ENTRY_MIN_CHARS: usize = 16;
const SEPARATOR: &str = " | ";

pub struct Cascade {
    strategies: Vec<Box<dyn TranscriptStrategy>>,
    /// Configuration problems found while building; reported with every failure digest
    setup_failures: Vec<StrategyFailure>,
}

impl Cascade {
    pub fn new(strategies: Vec<Box<dyn TranscriptStrategy>>) -> Self {
        Self {
            strategies,
            setup_failures: Vec::new(),
        }
    }

    /// Default order: remote proxy (when configured), innertube, Piped,
    /// Invidious, watch page, yt-dlp, legacy timedtext.
    ///
    /// An unusable proxy is dropped (requests go direct) and recorded as a
    /// `Proxy` failure; an invalid remote proxy endpoint fails only its own strategy.
    pub fn from_config(mut config: TranscriptConfig) -> Result<Self, TranscriptError> {
        let mut setup_failures = Vec::new();
        let http = match build_http_client(&config) {
            Ok(http) => http,
            Err(e) => {
                error!(error = %e, "[Cascade] Ignoring unusable proxy, connecting directly");
                config.proxy = None;
                setup_failures.push(StrategyFailure::new("Proxy", e));
                build_http_client(&config)?
            }
        };
        let config = Arc::new(config);
        let mut cascade = Self::new(Vec::new());
        cascade.setup_failures = setup_failures;

        if let Some(endpoint) = config.remote_proxy_url.clone() {
            if let Err(e) = url::Url::parse(&endpoint) {
                error!(error = %e, "[Cascade] TRANSCRIPT_PROXY_URL is not a valid URL");
            }
            cascade.add_strategy(Box::new(RemoteProxyStrategy::new(
                http.clone(),
                config.clone(),
                endpoint,
            )));
        }
        cascade.add_strategy(Box::new(InnertubeStrategy::new(http.clone(), config.clone())));
        cascade.add_strategy(Box::new(PipedStrategy::piped(http.clone(), config.clone())));
        cascade.add_strategy(Box::new(InvidiousStrategy::invidious(
            http.clone(),
            config.clone(),
        )));
        cascade.add_strategy(Box::new(WatchPageStrategy::new(http.clone(), config.clone())));
        cascade.add_strategy(Box::new(YtDlpStrategy::new(http.clone(), config.clone())));
        cascade.add_strategy(Box::new(LegacyTimedTextStrategy::new(http, config)));

        Ok(cascade)
    }

    pub fn add_strategy(&mut self, strategy: Box<dyn TranscriptStrategy>) {
        self.strategies.push(strategy);
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run every strategy in order until one yields a transcript
    pub async fn fetch_transcript(&self, video_id: &VideoId) -> Result<String, TranscriptError> {
        let mut failures: Vec<StrategyFailure> = self.setup_failures.clone();

        for strategy in &self.strategies {
            let name = strategy.name();

            if !strategy.is_available() {
                let err = TranscriptError::ToolNotFound(format!("{} is not available", name));
                error!(strategy = name, %video_id, "[Cascade] Strategy unavailable, skipping");
                failures.push(StrategyFailure::new(name, err));
                continue;
            }

            info!(strategy = name, %video_id, "[Cascade] Trying strategy");

            match strategy.fetch(video_id).await {
                Ok(text) if !text.trim().is_empty() => {
                    info!(
                        strategy = name,
                        %video_id,
                        chars = text.len(),
                        "[Cascade] ✓ Success"
                    );
                    return Ok(text);
                }
                Ok(_) => {
                    warn!(strategy = name, %video_id, "[Cascade] ✗ Returned empty text");
                    failures.push(StrategyFailure::new(name, TranscriptError::ParseEmpty));
                }
                Err(e) => {
                    let shown = truncate_chars(&e.to_string(), SUMMARY_MAX_CHARS);
                    if e.is_fatal() {
                        error!(strategy = name, %video_id, error = %shown, "[Cascade] ✗ Failed");
                    } else {
                        warn!(
                            strategy = name,
                            %video_id,
                            error = %shown,
                            blocked = e.is_blocking(),
                            "[Cascade] ✗ Failed"
                        );
                    }
                    failures.push(StrategyFailure::new(name, e));
                }
            }
        }

        let summary = summarize_failures(&failures);
        let blocked = failures.iter().any(|f| f.error.is_blocking());
        error!(%video_id, %summary, blocked, "[Cascade] All strategies failed");

        let mut message = format!("Failed to fetch transcript. Debug: [{}]", summary);
        if blocked {
            message.push(' ');
            message.push_str(&blocking_advice(BlockingReason::BotDetection));
        }

        Err(TranscriptError::AllStrategiesFailed { message, blocked })
    }
}

/// Strategy-labeled digest of every failure, bounded to roughly
/// `SUMMARY_MAX_CHARS` while keeping every strategy's label visible
pub fn summarize_failures(failures: &[StrategyFailure]) -> String {
    if failures.is_empty() {
        return "no strategies configured".to_string();
    }

    let separators = SEPARATOR.len() * (failures.len() - 1);
    let share = SUMMARY_MAX_CHARS.saturating_sub(separators) / failures.len();

    failures
        .iter()
        .map(|f| {
            let label_len = f.strategy.chars().count() + 2;
            let room = share
                .saturating_sub(label_len)
                .clamp(ENTRY_MIN_CHARS, ENTRY_MAX_CHARS);
            f.label(room)
        })
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}
