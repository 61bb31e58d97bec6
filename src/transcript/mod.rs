// Transcript module - ordered multi-strategy caption retrieval

pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod health;
pub mod models;
pub mod normalizer;
pub mod orchestrator;
pub mod strategies;
pub mod traits;
pub mod utils;
pub mod video_id;

pub use config::TranscriptConfig;
pub use errors::TranscriptError;
pub use models::{CaptionTrack, ClientProfile, MirrorInstance, StrategyFailure, VideoId};
pub use normalizer::normalize;
pub use orchestrator::Cascade;
pub use traits::TranscriptStrategy;
pub use video_id::{extract_video_id, parse_video_id, resolve_video_id};
