mod common;

use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use common::{local_config, serve, VIDEO};
use yt_transcript_cascade::transcript::strategies::RemoteProxyStrategy;
use yt_transcript_cascade::transcript::utils::build_http_client;
use yt_transcript_cascade::transcript::{
    parse_video_id, Cascade, TranscriptError, TranscriptStrategy,
};

#[derive(Clone, Copy)]
enum Worker {
    Healthy,
    Blocked,
    NoCaptions,
}

// Same contract as the deployed worker: `?v=` or a 400
fn worker(mode: Worker) -> Router {
    Router::new().route(
        "/",
        get(move |Query(params): Query<HashMap<String, String>>| async move {
            let reply = |status: StatusCode, body: Value| (status, Json(body));
            match params.get("v") {
                None => reply(
                    StatusCode::BAD_REQUEST,
                    json!({"error": "Missing video ID (?v=...)"}),
                ),
                Some(id) if id != VIDEO => reply(StatusCode::NOT_FOUND, json!({"error": "NO_CAPTIONS_FOUND"})),
                Some(_) => match mode {
                    Worker::Healthy => reply(
                        StatusCode::OK,
                        json!({"success": true, "transcript": "we're no strangers to love"}),
                    ),
                    Worker::Blocked => reply(StatusCode::FORBIDDEN, json!({"error": "BOT_DETECTION"})),
                    Worker::NoCaptions => {
                        reply(StatusCode::NOT_FOUND, json!({"error": "NO_ENGLISH_TRACK"}))
                    }
                },
            }
        }),
    )
}

async fn strategy(mode: Worker) -> RemoteProxyStrategy {
    let base = serve(worker(mode)).await;
    let config = Arc::new(local_config(&base));
    RemoteProxyStrategy::new(build_http_client(&config).unwrap(), config, format!("{}/", base))
}

#[tokio::test]
async fn worker_returns_transcript() {
    let text = strategy(Worker::Healthy)
        .await
        .fetch(&parse_video_id(VIDEO).unwrap())
        .await
        .unwrap();
    assert_eq!(text, "we're no strangers to love");
}

#[tokio::test]
async fn worker_bot_detection_is_blocking() {
    let err = strategy(Worker::Blocked)
        .await
        .fetch(&parse_video_id(VIDEO).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, TranscriptError::BotDetection(_)), "{}", err);
}

#[tokio::test]
async fn worker_missing_track_is_no_captions() {
    let err = strategy(Worker::NoCaptions)
        .await
        .fetch(&parse_video_id(VIDEO).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, TranscriptError::NoCaptions), "{}", err);
}

#[tokio::test]
async fn blocked_worker_carries_advice_through_the_cascade() {
    let proxy = serve(worker(Worker::Blocked)).await;
    let youtube = serve(Router::new().fallback(|| async { (StatusCode::NOT_FOUND, "not here") })).await;
    let config = local_config(&youtube).with_remote_proxy(Some(format!("{}/", proxy)));

    let err = Cascade::from_config(config)
        .unwrap()
        .fetch_transcript(&parse_video_id(VIDEO).unwrap())
        .await
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("RemoteProxy: "), "{}", msg);
    assert!(err.is_blocking());
    assert!(msg.contains("YOUTUBE_COOKIES"), "{}", msg);
}
