#![allow(dead_code)]

use axum::Router;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use yt_transcript_cascade::transcript::{MirrorInstance, TranscriptConfig};

pub const VIDEO: &str = "dQw4w9WgXcQ";

/// Bind first so handlers can embed the server's own address in URLs
pub async fn bind() -> (tokio::net::TcpListener, String) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    (listener, format!("http://{}", addr))
}

pub fn spawn(listener: tokio::net::TcpListener, app: Router) {
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
}

pub async fn serve(app: Router) -> String {
    let (listener, base) = bind().await;
    spawn(listener, app);
    base
}

/// Config that never leaves localhost: no mirrors, no yt-dlp, short timeouts
pub fn local_config(base: &str) -> TranscriptConfig {
    TranscriptConfig::default()
        .with_youtube_base(base)
        .with_legacy_base(base)
        .with_piped_instances(Vec::new())
        .with_invidious_instances(Vec::new())
        .with_ytdlp_path(Some(PathBuf::from("/nonexistent/yt-dlp-test")))
        .with_timeout(Duration::from_secs(5))
        .with_mirror_timeout(Duration::from_secs(2))
}

pub fn instances(bases: &[String]) -> Vec<MirrorInstance> {
    bases.iter().map(|b| MirrorInstance::new(b)).collect()
}

pub const SAMPLE_VTT: &str = "WEBVTT\nKind: captions\nLanguage: en\n\n\
00:00:00.000 --> 00:00:02.000\nnever gonna give you up\n\n\
00:00:02.000 --> 00:00:04.000\nnever gonna let you down\n";

pub const SAMPLE_XML: &str = "<?xml version=\"1.0\" encoding=\"utf-8\" ?><transcript>\
<text start=\"0\" dur=\"2\">we&amp;#39;re no strangers</text>\
<text start=\"2\" dur=\"2\">to love</text></transcript>";
