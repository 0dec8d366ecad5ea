//! Info command - show recording support and encoding negotiation

use anyhow::Result;
use bykugan_core::config::{ConfigFile, RecorderConfig};
use bykugan_core::formats::{self, PREFERRED_MIME_TYPES};
use bykugan_core::platform::{MediaPlatform, PlatformCapability, SimulatedPlatform};
use bykugan_core::ScreenRecorder;
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

/// Arguments for the info command
#[derive(Args)]
pub struct InfoArgs {
    /// Print machine-readable JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct InfoReport {
    platform: &'static str,
    supported: bool,
    encodings: Vec<EncodingSupport>,
    negotiated: Option<String>,
    configured: Option<String>,
    config_path: String,
    download_dir: String,
}

#[derive(Serialize)]
struct EncodingSupport {
    mime_type: &'static str,
    container: &'static str,
    extension: &'static str,
    supported: bool,
}

fn build_report(capability: &PlatformCapability, file: &ConfigFile, download_dir: String) -> InfoReport {
    let config = RecorderConfig::from(file.to_options());
    let platform = capability.platform();
    let supports = |m: &str| platform.is_some_and(|p| p.supports_encoding(m));

    let negotiated = formats::negotiate_mime_type(None, supports);
    let configured = config
        .mime_type
        .as_deref()
        .and_then(|requested| formats::negotiate_mime_type(Some(requested), supports));

    InfoReport {
        platform: "simulated",
        supported: ScreenRecorder::is_supported(capability),
        encodings: PREFERRED_MIME_TYPES
            .iter()
            .map(|&mime_type| EncodingSupport {
                mime_type,
                container: formats::container(mime_type),
                extension: formats::file_extension(mime_type),
                supported: supports(mime_type),
            })
            .collect(),
        negotiated,
        configured,
        config_path: ConfigFile::default_path().display().to_string(),
        download_dir,
    }
}

/// Show recording support and encoding negotiation
pub async fn info(args: InfoArgs) -> Result<()> {
    let file = ConfigFile::load_or_default();

    let mut simulated = SimulatedPlatform::new();
    if let Some(dir) = file.output_directory() {
        simulated = simulated.with_download_dir(dir);
    }
    let download_dir = simulated.downloads().dir().display().to_string();
    let platform: Arc<dyn MediaPlatform> = Arc::new(simulated);
    let capability = PlatformCapability::Available(platform);

    let report = build_report(&capability, &file, download_dir);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Bykugan - Recording Support\n");

    let icon = if report.supported { "[OK]" } else { "[!!]" };
    println!("Platform:");
    println!("  {} {}", icon, report.platform);
    println!();

    println!("Encodings (in preference order):");
    for encoding in &report.encodings {
        let mark = if encoding.supported { "yes" } else { "no " };
        println!("  {}  {:<24} .{}", mark, encoding.mime_type, encoding.extension);
    }
    println!();

    println!("Negotiation:");
    println!(
        "  Default:     {}",
        report.negotiated.as_deref().unwrap_or("platform default")
    );
    if let Some(configured) = &report.configured {
        println!("  Configured:  {}", configured);
    }
    println!();

    println!("Paths:");
    println!("  Config:      {}", report.config_path);
    println!("  Downloads:   {}", report.download_dir);

    Ok(())
}
