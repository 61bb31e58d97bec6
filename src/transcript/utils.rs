// Helper functions shared by the strategies

use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, EXPIRES, PRAGMA};
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;
use tracing::warn;

use super::config::TranscriptConfig;
use super::errors::TranscriptError;

/// Cut `text` to at most `max` chars (char-boundary safe), marking the cut with "..."
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max).collect();
    out.push_str("...");
    out
}

/// Headers that keep intermediaries from serving a cached (possibly blocked) response
pub fn no_cache_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(EXPIRES, HeaderValue::from_static("0"));
    headers
}

/// Build the shared HTTP client (proxy, no-cache defaults).
///
/// Timeouts are applied per request so each strategy can pick its own bound.
pub fn build_http_client(config: &TranscriptConfig) -> Result<reqwest::Client, TranscriptError> {
    let mut builder = reqwest::Client::builder()
        .default_headers(no_cache_headers())
        .connect_timeout(config.timeout);

    // Only the configured proxy is used; ambient proxy variables were already folded into config
    match config.proxy.as_deref() {
        Some(proxy_url) => {
            let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| {
                TranscriptError::Config(format!(
                    "Invalid proxy URL {}: {}",
                    config.redacted_proxy().unwrap_or_default(),
                    e
                ))
            })?;
            builder = builder.proxy(proxy);
        }
        None => builder = builder.no_proxy(),
    }

    builder
        .build()
        .map_err(|e| TranscriptError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Collect `name=value` pairs from a response's Set-Cookie headers
pub fn response_cookies(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(|pair| pair.trim().to_string())
        .filter(|pair| pair.contains('='))
        .collect()
}

/// Run a command with a timeout, capturing stdout/stderr.
///
/// A missing binary maps to `ToolNotFound`, an expired timeout to `Timeout`.
pub async fn run_output_with_timeout(
    program: &str,
    args: &[String],
    timeout_after: Duration,
) -> Result<std::process::Output, TranscriptError> {
    let mut child = TokioCommand::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                TranscriptError::ToolNotFound(format!("{}: {}", program, e))
            }
            _ => TranscriptError::Execution(format!("Failed to start {}: {}", program, e)),
        })?;

    let mut stdout_pipe = child.stdout.take().ok_or_else(|| {
        TranscriptError::Execution(format!("Failed to capture stdout from {}", program))
    })?;
    let mut stderr_pipe = child.stderr.take().ok_or_else(|| {
        TranscriptError::Execution(format!("Failed to capture stderr from {}", program))
    })?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    match timeout(timeout_after, child.wait()).await {
        Ok(status_res) => {
            let status = status_res.map_err(|e| {
                TranscriptError::Execution(format!("Failed to wait for {}: {}", program, e))
            })?;
            let stdout = join_pipe(stdout_task, "stdout").await?;
            let stderr = join_pipe(stderr_task, "stderr").await?;
            Ok(std::process::Output {
                status,
                stdout,
                stderr,
            })
        }
        Err(_) => {
            if let Err(e) = child.kill().await {
                warn!(program, error = %e, "[Subprocess] Failed to kill timed-out child");
            }
            stdout_task.abort();
            stderr_task.abort();
            Err(TranscriptError::Timeout(format!(
                "{} timed out after {}s",
                program,
                timeout_after.as_secs()
            )))
        }
    }
}

async fn join_pipe(
    task: tokio::task::JoinHandle<std::io::Result<Vec<u8>>>,
    which: &str,
) -> Result<Vec<u8>, TranscriptError> {
    task.await
        .map_err(|e| TranscriptError::Execution(format!("{} task failed: {}", which, e)))?
        .map_err(|e| TranscriptError::Execution(format!("Failed to read {}: {}", which, e)))
}
