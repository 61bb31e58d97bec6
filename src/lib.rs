pub mod transcript;

pub use transcript::{
    extract_video_id, normalize, Cascade, TranscriptConfig, TranscriptError, TranscriptStrategy,
    VideoId,
};

/// Fetch a transcript for a video id or URL using environment configuration.
///
/// Every call re-runs the full cascade; nothing is cached between calls.
pub async fn fetch_transcript(video: &str) -> Result<String, TranscriptError> {
    let video_id = transcript::resolve_video_id(video)
        .ok_or_else(|| TranscriptError::InvalidUrl(video.to_string()))?;
    let cascade = Cascade::from_config(TranscriptConfig::from_env())?;
    cascade.fetch_transcript(&video_id).await
}
