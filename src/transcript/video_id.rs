// Video identifier extraction from the URL shapes users paste

use regex::Regex;

use super::models::VideoId;

lazy_static::lazy_static! {
    static ref URL_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?:youtube\.com/watch\?(?:[^#\s]*&)?v=)([A-Za-z0-9_-]{11})").unwrap(),
        Regex::new(r"(?:youtu\.be/)([A-Za-z0-9_-]{11})").unwrap(),
        Regex::new(r"(?:youtube\.com/embed/)([A-Za-z0-9_-]{11})").unwrap(),
        Regex::new(r"(?:youtube\.com/shorts/)([A-Za-z0-9_-]{11})").unwrap(),
    ];
    static ref BARE_ID: Regex = Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap();
}

/// Extract the video id from a watch, short-link, embed or shorts URL.
///
/// Returns `None` for anything unrecognized; that is ordinary bad input,
/// the caller decides how to report it.
pub fn extract_video_id(url: &str) -> Option<VideoId> {
    URL_PATTERNS
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| VideoId::from_validated(m.as_str()))
}

/// Accept an already-bare identifier (exactly 11 chars of `[A-Za-z0-9_-]`)
pub fn parse_video_id(id: &str) -> Option<VideoId> {
    let id = id.trim();
    if BARE_ID.is_match(id) {
        Some(VideoId::from_validated(id))
    } else {
        None
    }
}

/// URL first, bare id second
pub fn resolve_video_id(input: &str) -> Option<VideoId> {
    extract_video_id(input).or_else(|| parse_video_id(input))
}
