// Transcript strategy trait definition

use async_trait::async_trait;

use super::errors::TranscriptError;
use super::models::VideoId;

/// One independent way of acquiring a video's caption text
#[async_trait]
pub trait TranscriptStrategy: Send + Sync {
    /// Name of the strategy (for logging and the failure digest)
    fn name(&self) -> &'static str;

    /// Whether the strategy can run at all in this environment
    fn is_available(&self) -> bool {
        true
    }

    /// Fetch normalized, non-empty transcript text
    async fn fetch(&self, video_id: &VideoId) -> Result<String, TranscriptError>;
}
