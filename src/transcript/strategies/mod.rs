// Transcript acquisition strategies
//
// Each strategy is independent: a function of (video id, configuration) to
// transcript text or error. The cascade decides the order.

pub mod federation;
pub mod innertube;
pub mod legacy;
pub mod player;
pub mod remote_proxy;
pub mod watch_page;
pub mod ytdlp;

pub use federation::{FederationStrategy, Invidious, InvidiousStrategy, MirrorApi, Piped, PipedStrategy};
pub use innertube::InnertubeStrategy;
pub use legacy::LegacyTimedTextStrategy;
pub use remote_proxy::RemoteProxyStrategy;
pub use watch_page::WatchPageStrategy;
pub use ytdlp::YtDlpStrategy;

use reqwest::StatusCode;

use super::errors::TranscriptError;
use super::normalizer::normalize;

/// Shorter results are treated as junk (error pages, lone "[Music]" cues)
pub(crate) const MIN_TRANSCRIPT_CHARS: usize = 10;

/// Per-attempt message cap inside a strategy's aggregated error
pub(crate) const ATTEMPT_MESSAGE_CHARS: usize = 100;

/// Map a non-success upstream status. 429 from YouTube itself is a block.
pub(crate) fn youtube_status_error(status: StatusCode, what: &str) -> TranscriptError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return TranscriptError::BotDetection(format!("{} returned HTTP 429 Too Many Requests", what));
    }
    status_error(status, what)
}

pub(crate) fn status_error(status: StatusCode, what: &str) -> TranscriptError {
    TranscriptError::Upstream {
        status: format!("HTTP {}", status.as_u16()),
        reason: format!(
            "{} {}",
            what,
            status.canonical_reason().unwrap_or("request failed")
        ),
    }
}

/// Normalize a caption body and reject results too short to be real
pub(crate) fn finish_transcript(raw: &str) -> Result<String, TranscriptError> {
    let text = normalize(raw)?;
    let chars = text.chars().count();
    if chars < MIN_TRANSCRIPT_CHARS {
        return Err(TranscriptError::Parse(format!(
            "Transcript too short ({} chars)",
            chars
        )));
    }
    Ok(text)
}

/// Fold per-attempt errors into one strategy failure, keeping the blocking flag
pub(crate) fn aggregate_attempts(attempts: &[(String, TranscriptError)]) -> TranscriptError {
    let joined = attempts
        .iter()
        .map(|(label, e)| {
            format!(
                "{}: {}",
                label,
                super::utils::truncate_chars(&e.to_string(), ATTEMPT_MESSAGE_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("; ");

    if attempts.iter().any(|(_, e)| e.is_blocking()) {
        TranscriptError::BotDetection(joined)
    } else {
        TranscriptError::Failed(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_transcripts_are_rejected() {
        assert!(finish_transcript("<text>[Music]</text>").is_err());
        assert_eq!(
            finish_transcript("<text>long enough text</text>").unwrap(),
            "long enough text"
        );
    }

    #[test]
    fn youtube_rate_limit_is_blocking() {
        assert!(youtube_status_error(StatusCode::TOO_MANY_REQUESTS, "Player").is_blocking());
        let err = youtube_status_error(StatusCode::NOT_FOUND, "Player");
        assert_eq!(err.to_string(), "HTTP 404: Player Not Found");
    }

    #[test]
    fn aggregate_keeps_every_label() {
        let err = aggregate_attempts(&[
            ("ANDROID".to_string(), TranscriptError::NoCaptions),
            ("IOS".to_string(), TranscriptError::Failed("x".repeat(500))),
        ]);
        let msg = err.to_string();
        assert!(msg.starts_with("ANDROID: No caption tracks; IOS: "));
        assert!(msg.len() < 200);
        assert!(!err.is_blocking());
    }

    #[test]
    fn aggregate_flags_blocking_attempts() {
        let err = aggregate_attempts(&[
            ("WEB".to_string(), TranscriptError::BotDetection("captcha".to_string())),
            ("TV".to_string(), TranscriptError::NoCaptions),
        ]);
        assert!(err.is_blocking());
    }
}
