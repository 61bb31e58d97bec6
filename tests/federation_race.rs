mod common;

use axum::{http::StatusCode, routing::get, Json, Router};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{instances, local_config, serve, SAMPLE_VTT, VIDEO};
use yt_transcript_cascade::transcript::strategies::{InvidiousStrategy, PipedStrategy};
use yt_transcript_cascade::transcript::utils::build_http_client;
use yt_transcript_cascade::transcript::{parse_video_id, TranscriptError, TranscriptStrategy};

fn piped_ok(delay: Duration) -> Router {
    Router::new()
        .route(
            "/streams/:id",
            get(move || async move {
                tokio::time::sleep(delay).await;
                Json(json!({
                    "title": "test",
                    "subtitles": [
                        {"url": "/subs/de.vtt", "code": "de", "name": "Deutsch", "mimeType": "text/vtt"},
                        {"url": "/subs/en.vtt", "code": "en", "name": "English", "mimeType": "text/vtt"}
                    ]
                }))
            }),
        )
        .route("/subs/en.vtt", get(|| async { SAMPLE_VTT }))
        .route("/subs/de.vtt", get(|| async { "WEBVTT\n\n00:00:00.000 --> 00:00:01.000\nfalsch\n" }))
}

fn piped_broken() -> Router {
    Router::new().route(
        "/streams/:id",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    )
}

fn piped_hanging() -> Router {
    Router::new().route(
        "/streams/:id",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            "too late"
        }),
    )
}

fn piped_no_subtitles() -> Router {
    Router::new().route("/streams/:id", get(|| async { Json(json!({"subtitles": []})) }))
}

#[tokio::test]
async fn one_healthy_mirror_wins_in_bounded_time() {
    let bases = vec![
        serve(piped_hanging()).await,
        serve(piped_broken()).await,
        serve(piped_ok(Duration::from_millis(300))).await,
        serve(piped_no_subtitles()).await,
        serve(piped_hanging()).await,
    ];
    let config = Arc::new(
        local_config(&bases[0])
            .with_piped_instances(instances(&bases))
            .with_mirror_timeout(Duration::from_secs(4)),
    );
    let strategy = PipedStrategy::piped(build_http_client(&config).unwrap(), config);
    let vid = parse_video_id(VIDEO).unwrap();

    let started = Instant::now();
    let text = strategy.fetch(&vid).await.unwrap();

    assert_eq!(text, "never gonna give you up never gonna let you down");
    assert!(
        started.elapsed() < Duration::from_secs(3),
        "race waited on losers: {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn every_mirror_failing_aggregates_all_instances() {
    let bases = vec![
        serve(piped_broken()).await,
        serve(piped_no_subtitles()).await,
        serve(piped_hanging()).await,
    ];
    let config = Arc::new(
        local_config(&bases[0])
            .with_piped_instances(instances(&bases))
            .with_mirror_timeout(Duration::from_millis(500)),
    );
    let strategy = PipedStrategy::piped(build_http_client(&config).unwrap(), config);
    let vid = parse_video_id(VIDEO).unwrap();

    let started = Instant::now();
    let err = strategy.fetch(&vid).await.unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(5));

    let msg = err.to_string();
    assert!(msg.contains("All 3 Piped instances failed"), "{}", msg);
    for base in &bases {
        assert!(msg.contains(base.as_str()), "{} missing from {}", base, msg);
    }
    assert!(msg.contains("No caption tracks"), "{}", msg);
    assert!(!err.is_blocking());
}

#[tokio::test]
async fn tiny_caption_bodies_are_rejected() {
    let app = Router::new()
        .route(
            "/streams/:id",
            get(|| async { Json(json!({"subtitles": [{"url": "/subs/en.vtt", "code": "en"}]})) }),
        )
        .route("/subs/en.vtt", get(|| async { "WEBVTT\n" }));
    let base = serve(app).await;
    let config = Arc::new(local_config(&base).with_piped_instances(instances(&[base.clone()])));
    let strategy = PipedStrategy::piped(build_http_client(&config).unwrap(), config);

    let err = strategy.fetch(&parse_video_id(VIDEO).unwrap()).await.unwrap_err();
    assert!(err.to_string().contains("too small"), "{}", err);
}

#[tokio::test]
async fn invidious_resolves_relative_track_urls() {
    // Real instances serve both steps from one path; the query tells them apart
    let app = Router::new().route(
        "/api/v1/captions/:id",
        get(
            |axum::extract::RawQuery(query): axum::extract::RawQuery| async move {
                match query {
                    Some(_) => SAMPLE_VTT.to_string(),
                    None => json!({"captions": [
                        {"label": "English", "languageCode": "en", "url": "/api/v1/captions/dQw4w9WgXcQ?label=English"}
                    ]})
                    .to_string(),
                }
            },
        ),
    );
    let base = serve(app).await;
    let config = Arc::new(local_config(&base).with_invidious_instances(instances(&[base.clone()])));
    let strategy = InvidiousStrategy::invidious(build_http_client(&config).unwrap(), config);

    let text = strategy.fetch(&parse_video_id(VIDEO).unwrap()).await.unwrap();
    assert!(text.starts_with("never gonna give you up"));
}

#[tokio::test]
async fn no_instances_is_a_soft_failure() {
    let config = Arc::new(local_config("http://127.0.0.1:9"));
    let strategy = PipedStrategy::piped(build_http_client(&config).unwrap(), config);
    let err = strategy.fetch(&parse_video_id(VIDEO).unwrap()).await.unwrap_err();
    assert!(matches!(err, TranscriptError::Failed(_)));
}
