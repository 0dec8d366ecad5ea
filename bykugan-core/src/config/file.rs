//! Configuration file loading and merging
//!
//! Loads user configuration from `~/.config/bykugan/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::{CaptureConstraints, RecorderOptions, DEFAULT_FILENAME, DEFAULT_TIME_SLICE_MS};
use crate::error::{RecorderError, Result};

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Capture request settings
    #[serde(default)]
    pub capture: CaptureSettings,

    /// Encoder settings
    #[serde(default)]
    pub recorder: RecorderSettings,

    /// Where and how recordings are saved
    #[serde(default)]
    pub output: OutputSettings,
}

/// Capture request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Capture a video track
    #[serde(default = "default_true")]
    pub video: bool,

    /// Capture an audio track
    #[serde(default)]
    pub audio: bool,

    /// Maximum width in pixels (0 = no limit)
    #[serde(default)]
    pub max_width: u32,

    /// Maximum height in pixels (0 = no limit)
    #[serde(default)]
    pub max_height: u32,

    /// Requested frame rate (0 = platform default)
    #[serde(default)]
    pub frame_rate: u32,
}

/// Encoder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderSettings {
    /// Preferred mime type (empty = negotiate)
    #[serde(default)]
    pub mime_type: String,

    /// Flush interval in milliseconds
    #[serde(default = "default_time_slice")]
    pub time_slice_ms: u64,
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Suggested file name for saved recordings
    #[serde(default = "default_filename")]
    pub filename: String,

    /// Directory recordings are saved into (empty = user download directory)
    #[serde(default)]
    pub directory: String,
}

fn default_true() -> bool {
    true
}

fn default_time_slice() -> u64 {
    DEFAULT_TIME_SLICE_MS
}

fn default_filename() -> String {
    DEFAULT_FILENAME.to_string()
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            video: true,
            audio: false,
            max_width: 0,
            max_height: 0,
            frame_rate: 0,
        }
    }
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            mime_type: String::new(),
            time_slice_ms: default_time_slice(),
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            filename: default_filename(),
            directory: String::new(),
        }
    }
}

impl ConfigFile {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("bykugan").join("config.toml")
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("bykugan")
                .join("config.toml")
        } else {
            PathBuf::from("/etc/bykugan/config.toml")
        }
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| RecorderError::Config(format!("Failed to read config file: {}", e)))?;

        let config: ConfigFile = toml::from_str(&content)?;

        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load configuration, logging warnings but returning defaults on error
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load config file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(Self::default_path())
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    RecorderError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| RecorderError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&path, content)
            .map_err(|e| RecorderError::Config(format!("Failed to write config file: {}", e)))?;

        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Convert file settings into recorder overrides
    ///
    /// Zero and empty values mean "not set" and leave the defaults alone.
    pub fn to_options(&self) -> RecorderOptions {
        let non_zero = |v: u32| (v > 0).then_some(v);
        let capture = &self.capture;

        RecorderOptions {
            constraints: Some(CaptureConstraints {
                video: capture.video,
                audio: capture.audio,
                max_width: non_zero(capture.max_width),
                max_height: non_zero(capture.max_height),
                frame_rate: non_zero(capture.frame_rate),
            }),
            mime_type: Some(self.recorder.mime_type.trim())
                .filter(|m| !m.is_empty())
                .map(str::to_string),
            time_slice: Some(self.recorder.time_slice_ms),
        }
    }

    /// Directory recordings are saved into, if one is configured
    pub fn output_directory(&self) -> Option<PathBuf> {
        let dir = self.output.directory.trim();
        if dir.is_empty() {
            None
        } else if let Some(rest) = dir.strip_prefix("~/") {
            dirs::home_dir().map(|home| home.join(rest))
        } else {
            Some(PathBuf::from(dir))
        }
    }
}

/// Generate a sample configuration file
pub fn sample_config() -> String {
    r#"# Bykugan Configuration

[capture]
# Capture the screen/window video track
video = true

# Capture system or tab audio alongside the video
audio = false

# Upper bounds on the captured resolution (0 = no limit)
max_width = 0
max_height = 0

# Requested frame rate (0 = platform default)
frame_rate = 0

[recorder]
# Preferred mime type. Leave empty to negotiate from:
#   video/webm;codecs=vp9, video/webm;codecs=vp8, video/webm, video/mp4
mime_type = ""

# How often the encoder flushes a fragment, in milliseconds
time_slice_ms = 1000

[output]
# Suggested file name for saved recordings
filename = "recording.webm"

# Directory to save into (empty = your download directory)
directory = ""
"#
    .to_string()
}
