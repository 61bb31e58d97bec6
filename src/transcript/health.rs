// Mirror instance health probe
//
// Checks each configured Piped/Invidious instance one at a time against a
// known-captioned video, so operators can prune dead mirrors from the lists.

use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::config::TranscriptConfig;
use super::errors::TranscriptError;
use super::models::{MirrorInstance, VideoId};
use super::strategies::{FederationStrategy, Invidious, MirrorApi, Piped};
use super::utils::build_http_client;

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Video with long-lived English captions, used as the probe target
pub const PROBE_VIDEO_ID: &str = "PkZNo7MFNFg";

#[derive(Debug, Clone, Serialize)]
pub struct InstanceHealth {
    pub family: &'static str,
    pub base_url: String,
    pub healthy: bool,
    pub tracks: usize,
    pub latency_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Probe every configured mirror sequentially
pub async fn check_instances(
    config: &TranscriptConfig,
    video_id: &VideoId,
) -> Result<Vec<InstanceHealth>, TranscriptError> {
    let http = build_http_client(config)?;
    let mut report = probe_family::<Piped>(&http, &config.piped_instances, video_id, PROBE_TIMEOUT).await;
    report.extend(
        probe_family::<Invidious>(&http, &config.invidious_instances, video_id, PROBE_TIMEOUT).await,
    );

    let healthy = report.iter().filter(|h| h.healthy).count();
    info!(healthy, total = report.len(), "[Health] Probe finished");
    Ok(report)
}

pub async fn probe_family<A: MirrorApi>(
    http: &reqwest::Client,
    instances: &[MirrorInstance],
    video_id: &VideoId,
    timeout: Duration,
) -> Vec<InstanceHealth> {
    let mut report = Vec::with_capacity(instances.len());
    for instance in instances {
        let started = Instant::now();
        let result = tokio::time::timeout(
            timeout,
            FederationStrategy::<A>::list_tracks(http, instance, video_id, timeout),
        )
        .await
        .unwrap_or_else(|_| Err(TranscriptError::Timeout("probe timed out".to_string())));
        let latency_ms = started.elapsed().as_millis();

        let health = match result {
            Ok(tracks) if !tracks.is_empty() => InstanceHealth {
                family: A::FAMILY,
                base_url: instance.base_url().to_string(),
                healthy: true,
                tracks: tracks.len(),
                latency_ms,
                error: None,
            },
            Ok(_) => InstanceHealth {
                family: A::FAMILY,
                base_url: instance.base_url().to_string(),
                healthy: false,
                tracks: 0,
                latency_ms,
                error: Some(TranscriptError::NoCaptions.to_string()),
            },
            Err(e) => InstanceHealth {
                family: A::FAMILY,
                base_url: instance.base_url().to_string(),
                healthy: false,
                tracks: 0,
                latency_ms,
                error: Some(e.to_string()),
            },
        };
        debug!(family = A::FAMILY, instance = %health.base_url, healthy = health.healthy, "[Health] Probed");
        report.push(health);
    }
    report
}
