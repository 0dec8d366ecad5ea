//! Record command - capture, stop and save a recording

use anyhow::{Context, Result};
use bykugan_core::{
    config::{ConfigFile, RecorderOptions},
    error::RecorderError,
    formats,
    platform::{PlatformCapability, SimulatedPlatform},
    RecorderState, SaveOutcome, ScreenRecorder,
};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

/// Arguments for the record command
#[derive(Args)]
pub struct RecordArgs {
    /// Stop after this many seconds (default: until Ctrl+C)
    #[arg(short, long)]
    duration: Option<f64>,

    /// Preferred mime type (e.g. "video/webm;codecs=vp8")
    #[arg(short, long)]
    mime_type: Option<String>,

    /// Encoder flush interval in milliseconds
    #[arg(short, long)]
    time_slice: Option<u64>,

    /// Also capture audio
    #[arg(short, long)]
    audio: bool,

    /// File name to save as
    #[arg(short, long)]
    output: Option<String>,

    /// Directory to save into
    #[arg(long)]
    dir: Option<PathBuf>,

    /// End the share after this many seconds, as if the user revoked it
    #[arg(long)]
    revoke_after: Option<f64>,
}

impl RecordArgs {
    /// Overrides given on the command line
    fn overrides(&self, file: &ConfigFile) -> RecorderOptions {
        let mut from_file = file.to_options();
        if self.audio {
            if let Some(constraints) = from_file.constraints.as_mut() {
                constraints.audio = true;
            }
        }

        from_file.overlay(RecorderOptions {
            constraints: None,
            mime_type: self.mime_type.clone(),
            time_slice: self.time_slice,
        })
    }
}

/// Record a session
pub async fn record(args: RecordArgs) -> Result<()> {
    println!("Bykugan - Recording\n");

    let file = ConfigFile::load_or_default();
    let options = args.overrides(&file);

    let mut platform = SimulatedPlatform::new();
    if let Some(dir) = args.dir.clone().or_else(|| file.output_directory()) {
        platform = platform.with_download_dir(dir);
    }
    if let Some(secs) = args.revoke_after {
        platform = platform.with_revoke_after(seconds(secs, "--revoke-after")?);
    }
    let platform = Arc::new(platform);
    let capability = PlatformCapability::Available(platform.clone());

    if !ScreenRecorder::is_supported(&capability) {
        anyhow::bail!("Screen recording is not supported on this platform");
    }

    let recorder =
        ScreenRecorder::new(capability, options).map_err(|e| report(e, "Invalid options"))?;

    let config = recorder.config();
    println!("Configuration:");
    println!("  Audio:       {}", config.constraints.audio);
    println!(
        "  Mime type:   {}",
        config.mime_type.as_deref().unwrap_or("(negotiated)")
    );
    println!("  Time slice:  {} ms", config.time_slice_ms);
    println!("  Save to:     {}", platform.downloads().dir().display());
    println!();

    let stream = recorder
        .start()
        .await
        .map_err(|e| report(e, "Failed to start recording"))?;

    println!("Recording started ({})", stream.id());
    for track in stream.tracks() {
        println!("  {}: {}", track.kind(), track.label());
    }
    println!(
        "  Encoding: {}",
        recorder.mime_type().as_deref().unwrap_or("platform default")
    );
    println!();
    match args.duration {
        Some(secs) => println!("Recording for {} s (Ctrl+C to stop early)...\n", secs),
        None => println!("Press Ctrl+C to stop...\n"),
    }

    let deadline = match args.duration {
        Some(secs) => Some(seconds(secs, "--duration")?),
        None => None,
    };

    tokio::select! {
        _ = interrupted() => {
            println!("\nReceived interrupt signal...");
        }
        _ = elapsed(deadline) => {
            info!("Recording duration reached");
        }
        _ = finalized(&recorder) => {
            println!("Capture ended by the source.");
        }
    }

    println!("Stopping recording...");
    let Some(blob) = recorder.stop().await else {
        println!("Nothing was recorded.");
        return Ok(());
    };

    println!("Recording stopped.");
    println!("  Fragments: {}", recorder.fragment_count());
    println!("  Size:      {}", format_size(blob.size()));
    println!("  Type:      {}", blob.mime_type());
    println!();

    let filename = args
        .output
        .clone()
        .unwrap_or_else(|| default_filename(&file, blob.mime_type()));

    match recorder
        .save(Some(&filename))
        .map_err(|e| report(e, "Failed to save recording"))?
    {
        SaveOutcome::Saved { size, .. } => {
            let path = platform
                .downloads()
                .last_saved()
                .context("Download reported success but no file was written")?;
            println!("Saved {} to {}", format_size(size), path.display());
        }
        SaveOutcome::NoData => println!("Nothing to save."),
    }

    Ok(())
}

/// Convert a core error for display, printing its hint
fn report(err: RecorderError, context: &'static str) -> anyhow::Error {
    if let Some(hint) = err.user_hint() {
        eprintln!("Hint: {}", hint);
    }
    anyhow::Error::new(err).context(context)
}

fn seconds(secs: f64, flag: &str) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).with_context(|| format!("Invalid value for {}", flag))
}

/// Configured file name, with the extension fixed up for non-webm output
fn default_filename(file: &ConfigFile, mime_type: &str) -> String {
    let ext = formats::file_extension(mime_type);
    let name = file.output.filename.trim();
    match name.rsplit_once('.') {
        Some((stem, current)) if current != ext && !stem.is_empty() => {
            format!("{}.{}", stem, ext)
        }
        _ => name.to_string(),
    }
}

async fn interrupted() {
    if let Err(e) = signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn elapsed(deadline: Option<Duration>) {
    match deadline {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}

async fn finalized(recorder: &ScreenRecorder) {
    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    while recorder.state() != RecorderState::Finalized {
        ticker.tick().await;
    }
}

fn format_size(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b >= KIB * KIB {
        format!("{:.1} MiB", b / (KIB * KIB))
    } else if b >= KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{} B", bytes)
    }
}
