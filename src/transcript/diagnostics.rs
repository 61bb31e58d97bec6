// Blocking diagnostics - identifies why YouTube refused to hand out captions
//
// Analyzes error text (playability reasons, yt-dlp stderr, watch-page HTML) to determine:
// - Whether the failure is bot detection / IP blocking
// - What the operator can do about it

use serde::{Deserialize, Serialize};

/// Markers YouTube embeds in bot-challenge pages and error strings
const BOT_CHALLENGE_MARKERS: &[&str] = &[
    "confirm you're not a bot",
    "confirm you\u{2019}re not a bot",
    "confirm that you're not a bot",
    "our systems have detected unusual traffic",
    "www.google.com/sorry",
    "g-recaptcha",
    "captcha-form",
];

/// Reasons why YouTube might refuse a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockingReason {
    /// Bot detection / "sign in to confirm you're not a bot"
    BotDetection,

    /// Rate limiting (429 or similar)
    RateLimited,

    /// HTTP 403 Forbidden
    Http403Forbidden,

    /// Age-restricted content requiring login
    AgeRestricted,

    /// Private video
    PrivateVideo,

    /// Video deleted or unavailable
    VideoUnavailable,

    /// Geographic restriction
    GeoBlocked,

    /// Network timeout (soft IP block)
    NetworkTimeout,

    /// Generic/unknown
    Unknown,
}

impl BlockingReason {
    /// Blocks aimed at this server rather than at the video
    pub fn is_server_block(&self) -> bool {
        matches!(self, Self::BotDetection | Self::RateLimited)
    }

    pub fn cookies_might_help(&self) -> bool {
        matches!(
            self,
            Self::BotDetection | Self::Http403Forbidden | Self::AgeRestricted | Self::PrivateVideo
        )
    }

    pub fn proxy_might_help(&self) -> bool {
        matches!(
            self,
            Self::BotDetection
                | Self::RateLimited
                | Self::Http403Forbidden
                | Self::GeoBlocked
                | Self::NetworkTimeout
        )
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::BotDetection => "Bot detection triggered",
            Self::RateLimited => "Rate limited by YouTube",
            Self::Http403Forbidden => "Access denied (HTTP 403)",
            Self::AgeRestricted => "Age-restricted content",
            Self::PrivateVideo => "Private video",
            Self::VideoUnavailable => "Video unavailable",
            Self::GeoBlocked => "Geographic restriction",
            Self::NetworkTimeout => "Network timeout (possible IP throttling)",
            Self::Unknown => "Unknown failure",
        }
    }
}

/// True when text carries one of YouTube's bot-challenge markers
pub fn is_bot_challenge(text: &str) -> bool {
    let lower = text.to_lowercase();
    BOT_CHALLENGE_MARKERS.iter().any(|m| lower.contains(m))
}

/// Analyze error text and return the most specific blocking reason
pub fn diagnose_error(error: &str) -> Option<BlockingReason> {
    if error.trim().is_empty() {
        return None;
    }

    let lower = error.to_lowercase();

    if is_bot_challenge(&lower) || lower.contains("not a bot") || lower.contains("unusual traffic")
    {
        return Some(BlockingReason::BotDetection);
    }

    if lower.contains("age-restricted")
        || lower.contains("sign in to confirm your age")
        || lower.contains("age_verification")
    {
        return Some(BlockingReason::AgeRestricted);
    }

    if lower.contains("private video") || lower.contains("video is private") {
        return Some(BlockingReason::PrivateVideo);
    }

    if lower.contains("video unavailable")
        || lower.contains("video has been removed")
        || lower.contains("this video is no longer available")
        || lower.contains("video is unavailable")
    {
        return Some(BlockingReason::VideoUnavailable);
    }

    if lower.contains("not available in your country") || lower.contains("blocked in your country")
    {
        return Some(BlockingReason::GeoBlocked);
    }

    if lower.contains("429") || lower.contains("rate limit") || lower.contains("too many requests") {
        return Some(BlockingReason::RateLimited);
    }

    if lower.contains("403") || lower.contains("forbidden") {
        return Some(BlockingReason::Http403Forbidden);
    }

    if lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection refused")
        || lower.contains("network unreachable")
    {
        return Some(BlockingReason::NetworkTimeout);
    }

    Some(BlockingReason::Unknown)
}

/// Operator-facing advice appended to a total cascade failure
pub fn blocking_advice(reason: BlockingReason) -> String {
    let mut steps = Vec::new();
    if reason.cookies_might_help() {
        steps.push("configure YOUTUBE_COOKIES with a logged-in cookie header");
    }
    if reason.proxy_might_help() {
        steps.push("set YOUTUBE_PROXY or TRANSCRIPT_PROXY_URL to route around the block");
    }
    if steps.is_empty() {
        return format!("{}.", reason.description());
    }
    format!(
        "{}: YouTube is blocking requests from this server. Try: {}.",
        reason.description(),
        steps.join("; ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bot_detection() {
        let error = "ERROR: [youtube] dQw4w9WgXcQ: Sign in to confirm you're not a bot.";
        assert_eq!(diagnose_error(error), Some(BlockingReason::BotDetection));
    }

    #[test]
    fn test_bot_detection_curly_apostrophe() {
        let error = "Sign in to confirm you\u{2019}re not a bot";
        assert!(is_bot_challenge(error));
    }

    #[test]
    fn test_sorry_page_marker() {
        let html = r#"<html><body><form action="https://www.google.com/sorry/index"></form></body></html>"#;
        assert!(is_bot_challenge(html));
        assert!(!is_bot_challenge("<html><body>robots welcome</body></html>"));
    }

    #[test]
    fn test_rate_limit_detection() {
        let error = "HTTP Error 429: Too Many Requests";
        assert_eq!(diagnose_error(error), Some(BlockingReason::RateLimited));
        assert!(BlockingReason::RateLimited.is_server_block());
    }

    #[test]
    fn test_403_detection() {
        let error = "ERROR: HTTP Error 403: Forbidden";
        assert_eq!(diagnose_error(error), Some(BlockingReason::Http403Forbidden));
    }

    #[test]
    fn test_age_restricted_detection() {
        let error = "Sign in to confirm your age";
        assert_eq!(diagnose_error(error), Some(BlockingReason::AgeRestricted));
    }

    #[test]
    fn test_timeout_detection() {
        let error = "Timed out after 30s";
        assert_eq!(diagnose_error(error), Some(BlockingReason::NetworkTimeout));
    }

    #[test]
    fn test_empty_is_none() {
        assert_eq!(diagnose_error("   "), None);
    }

    #[test]
    fn test_advice_flags() {
        assert!(BlockingReason::BotDetection.cookies_might_help());
        assert!(BlockingReason::BotDetection.proxy_might_help());
        assert!(!BlockingReason::VideoUnavailable.proxy_might_help());
    }

    #[test]
    fn test_bot_advice_mentions_cookies_and_proxy() {
        let advice = blocking_advice(BlockingReason::BotDetection);
        assert!(advice.contains("YOUTUBE_COOKIES"));
        assert!(advice.contains("YOUTUBE_PROXY"));
    }
}
