// Error types for transcript strategies

use thiserror::Error;

use super::diagnostics::{diagnose_error, BlockingReason};

#[derive(Debug, Clone, Error)]
pub enum TranscriptError {
    /// Input did not match any recognized YouTube URL shape
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Upstream answered but listed no caption tracks
    #[error("No caption tracks")]
    NoCaptions,

    /// Caption body normalized down to nothing
    #[error("Caption content is empty after parsing")]
    ParseEmpty,

    /// Upstream returned malformed JSON/XML or an unexpected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Upstream reported a non-OK status (playability or HTTP)
    #[error("{status}: {reason}")]
    Upstream { status: String, reason: String },

    /// YouTube bot detection / IP blocking
    #[error("Blocked by YouTube: {0}")]
    BotDetection(String),

    /// Network timeout while talking to an upstream
    #[error("Network timeout: {0}")]
    Timeout(String),

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// yt-dlp binary missing
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Subprocess ran but failed
    #[error("Execution error: {0}")]
    Execution(String),

    /// Malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Soft strategy failure with a free-form reason
    #[error("{0}")]
    Failed(String),

    /// Every strategy in the cascade failed
    #[error("{message}")]
    AllStrategiesFailed { message: String, blocked: bool },
}

impl TranscriptError {
    /// Bot-detection style failures that should change the final advice
    pub fn is_blocking(&self) -> bool {
        match self {
            Self::BotDetection(_) => true,
            Self::AllStrategiesFailed { blocked, .. } => *blocked,
            _ => false,
        }
    }

    /// Unexpected failures (missing tool, bad config). Logged louder, never abort the cascade.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ToolNotFound(_) | Self::Config(_))
    }
}

impl From<reqwest::Error> for TranscriptError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::Timeout(e.to_string());
        }
        if e.is_decode() {
            return Self::Parse(e.to_string());
        }
        Self::Http(e.to_string())
    }
}

impl From<serde_json::Error> for TranscriptError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(format!("Invalid JSON: {}", e))
    }
}

// Classify raw error text (subprocess stderr, upstream reason strings)
impl From<String> for TranscriptError {
    fn from(s: String) -> Self {
        match diagnose_error(&s) {
            Some(reason) if reason.is_server_block() => Self::BotDetection(s),
            Some(BlockingReason::NetworkTimeout) => Self::Timeout(s),
            _ => {
                let lower = s.to_lowercase();
                if lower.contains("no such file") || lower.contains("command not found") {
                    Self::ToolNotFound(s)
                } else if lower.contains("invalid json") || lower.contains("parse") {
                    Self::Parse(s)
                } else {
                    Self::Failed(s)
                }
            }
        }
    }
}
