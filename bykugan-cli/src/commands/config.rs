//! Config command - manage the configuration file

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use bykugan_core::config::{sample_config, ConfigFile, RecorderConfig};

/// Arguments for the config command
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the path to the config file
    Path,

    /// Show the config file and the settings a recording would use
    Show,

    /// Generate a default config file
    Init {
        /// Force overwrite if file exists
        #[arg(short, long)]
        force: bool,
    },

    /// Print a sample configuration to stdout
    Sample,
}

/// Run config subcommand
pub async fn config(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommand::Path => {
            let path = ConfigFile::default_path();
            println!("{}", path.display());
            if path.exists() {
                println!("(file exists)");
            } else {
                println!("(file does not exist)");
            }
        }
        ConfigCommand::Show => {
            let path = ConfigFile::default_path();
            if path.exists() {
                let content =
                    std::fs::read_to_string(&path).context("Failed to read config file")?;
                println!("Configuration file: {}\n", path.display());
                println!("{}", content);
            } else {
                println!("No configuration file found at: {}", path.display());
                println!("Create one with:");
                println!("  bykugan config init");
                println!();
            }

            let file = ConfigFile::load_from(path).context("Failed to load config file")?;
            let effective = RecorderConfig::from(file.to_options());
            print_effective(&file, &effective);
        }
        ConfigCommand::Init { force } => {
            let path = ConfigFile::default_path();

            if path.exists() && !force {
                println!("Configuration file already exists: {}", path.display());
                println!();
                println!("Use --force to overwrite, or edit the existing file.");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).context("Failed to create config directory")?;
            }

            // Write the commented sample rather than a bare serialization
            std::fs::write(&path, sample_config()).context("Failed to write config file")?;

            println!("Created configuration file: {}", path.display());
            println!();
            println!("Edit this file to customize Bykugan settings.");
        }
        ConfigCommand::Sample => {
            print!("{}", sample_config());
        }
    }

    Ok(())
}

fn print_effective(file: &ConfigFile, config: &RecorderConfig) {
    let limit = |v: Option<u32>| v.map_or_else(|| "none".to_string(), |v| v.to_string());
    let constraints = &config.constraints;

    println!("Effective settings:");
    println!("  Video:       {}", constraints.video);
    println!("  Audio:       {}", constraints.audio);
    println!(
        "  Max size:    {} x {}",
        limit(constraints.max_width),
        limit(constraints.max_height)
    );
    println!("  Frame rate:  {}", limit(constraints.frame_rate));
    println!(
        "  Mime type:   {}",
        config.mime_type.as_deref().unwrap_or("(negotiated)")
    );
    println!("  Time slice:  {} ms", config.time_slice_ms);
    println!("  File name:   {}", file.output.filename);
    match file.output_directory() {
        Some(dir) => println!("  Directory:   {}", dir.display()),
        None => println!("  Directory:   (download directory)"),
    }

    if let Err(e) = config.validate_strict() {
        println!();
        println!("  [!!] {}", e);
    }
    for warning in config.validate() {
        println!("  [!]  {}", warning);
    }
}
