//! yt-transcript - command-line front end for the transcript cascade
//!
//! Configuration comes from the environment (YOUTUBE_COOKIES, YOUTUBE_PROXY,
//! TRANSCRIPT_PROXY_URL, ...); see `TranscriptConfig::from_env`.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use yt_transcript_cascade::transcript::health::{check_instances, PROBE_VIDEO_ID};
use yt_transcript_cascade::transcript::{parse_video_id, resolve_video_id, Cascade, TranscriptConfig};

#[derive(Parser, Debug)]
#[command(name = "yt-transcript")]
#[command(about = "Fetch YouTube captions as plain text")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the transcript for a video URL or 11-character id
    Fetch {
        input: String,
    },
    /// Probe configured Piped/Invidious mirrors
    CheckInstances {
        /// Video id with known English captions
        #[arg(long, default_value = PROBE_VIDEO_ID)]
        video: String,

        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean for the transcript
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = TranscriptConfig::from_env();
    info!(?config, "Configuration loaded");

    match args.command {
        Command::Fetch { input } => {
            let video_id = resolve_video_id(&input)
                .ok_or_else(|| anyhow!("Invalid YouTube URL or video id: {}", input))?;
            let cascade = Cascade::from_config(config)?;
            let text = cascade.fetch_transcript(&video_id).await?;
            println!("{}", text);
        }
        Command::CheckInstances { video, json } => {
            let video_id = parse_video_id(&video)
                .ok_or_else(|| anyhow!("Invalid video id: {}", video))?;
            let report = check_instances(&config, &video_id)
                .await
                .context("Instance check failed")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for h in &report {
                    let status = if h.healthy { "OK " } else { "BAD" };
                    println!(
                        "{} {:<9} {:<40} {:>6}ms {}",
                        status,
                        h.family,
                        h.base_url,
                        h.latency_ms,
                        h.error.as_deref().unwrap_or("")
                    );
                }
                let healthy = report.iter().filter(|h| h.healthy).count();
                println!("{}/{} instances healthy", healthy, report.len());
            }
        }
    }

    Ok(())
}
