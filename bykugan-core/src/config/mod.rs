//! Configuration types for Bykugan
//!
//! Provides capture constraints, recorder settings, caller overrides and
//! the on-disk configuration file.

mod file;

pub use file::{sample_config, CaptureSettings, ConfigFile, OutputSettings, RecorderSettings};

use serde::{Deserialize, Serialize};

use crate::error::{RecorderError, Result};

/// Default flush interval for encoded data, in milliseconds
pub const DEFAULT_TIME_SLICE_MS: u64 = 1000;

/// Default file name offered by `save()`
pub const DEFAULT_FILENAME: &str = "recording.webm";

/// What to request from the capture source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CaptureConstraints {
    /// Capture a video track
    pub video: bool,
    /// Capture an audio track
    pub audio: bool,
    /// Upper bound on the captured width
    pub max_width: Option<u32>,
    /// Upper bound on the captured height
    pub max_height: Option<u32>,
    /// Requested frame rate
    pub frame_rate: Option<u32>,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            video: true,
            audio: false,
            max_width: None,
            max_height: None,
            frame_rate: None,
        }
    }
}

impl CaptureConstraints {
    /// Enable or disable audio capture
    pub fn with_audio(mut self, audio: bool) -> Self {
        self.audio = audio;
        self
    }

    /// Enable or disable video capture
    pub fn with_video(mut self, video: bool) -> Self {
        self.video = video;
        self
    }

    /// Limit the captured resolution
    pub fn with_max_size(mut self, width: u32, height: u32) -> Self {
        self.max_width = Some(width);
        self.max_height = Some(height);
        self
    }

    /// Request a frame rate
    pub fn with_frame_rate(mut self, fps: u32) -> Self {
        self.frame_rate = Some(fps);
        self
    }
}

/// Caller-supplied overrides
///
/// Every field is optional; present fields replace the defaults when merged
/// into a [`RecorderConfig`]. The JSON shape is
/// `{ "constraints": {..}, "mimeType": "..", "timeSlice": 1000 }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderOptions {
    /// Capture request shape
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<CaptureConstraints>,
    /// Preferred encoding id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Flush interval in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_slice: Option<u64>,
}

impl RecorderOptions {
    /// Parse options from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Layer `other` on top of `self`; fields set in `other` win
    pub fn overlay(self, other: RecorderOptions) -> Self {
        Self {
            constraints: other.constraints.or(self.constraints),
            mime_type: other.mime_type.or(self.mime_type),
            time_slice: other.time_slice.or(self.time_slice),
        }
    }
}

/// Complete recorder configuration, fixed once a recorder is built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Capture request shape
    pub constraints: CaptureConstraints,
    /// Preferred encoding, tried before the built-in preference list
    pub mime_type: Option<String>,
    /// How often the encoder flushes buffered data, in milliseconds
    pub time_slice_ms: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            constraints: CaptureConstraints::default(),
            mime_type: None,
            time_slice_ms: DEFAULT_TIME_SLICE_MS,
        }
    }
}

impl From<RecorderOptions> for RecorderConfig {
    fn from(options: RecorderOptions) -> Self {
        Self::default().merge(options)
    }
}

impl RecorderConfig {
    /// Apply caller overrides on top of this configuration
    pub fn merge(mut self, options: RecorderOptions) -> Self {
        if let Some(constraints) = options.constraints {
            self.constraints = constraints;
        }
        if let Some(mime_type) = options.mime_type {
            self.mime_type = Some(mime_type);
        }
        if let Some(time_slice) = options.time_slice {
            self.time_slice_ms = time_slice;
        }
        self
    }

    /// Set the capture constraints
    pub fn with_constraints(mut self, constraints: CaptureConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Set the preferred mime type
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Set the flush interval in milliseconds
    pub fn with_time_slice(mut self, ms: u64) -> Self {
        self.time_slice_ms = ms;
        self
    }

    /// Flush interval as a Duration
    pub fn time_slice(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.time_slice_ms)
    }

    /// Validate configuration and return warnings for questionable settings
    ///
    /// Returns a list of warning messages. An empty list means no issues.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.time_slice_ms > 0 && self.time_slice_ms < 100 {
            warnings.push(format!(
                "Time slice of {} ms produces many tiny fragments. Consider 250 ms or more.",
                self.time_slice_ms
            ));
        }

        if self.time_slice_ms > 60_000 {
            warnings.push(format!(
                "Time slice of {} ms means up to a minute of data is lost if the encoder crashes.",
                self.time_slice_ms
            ));
        }

        if !self.constraints.video && self.constraints.audio {
            warnings.push("Audio-only capture still goes through the screen picker.".to_string());
        }

        if let Some(fps) = self.constraints.frame_rate {
            if fps > 60 {
                warnings.push(format!(
                    "{}fps is above what most capture backends deliver for screen content.",
                    fps
                ));
            }
        }

        warnings
    }

    /// Strict validation that fails on invalid configurations
    pub fn validate_strict(&self) -> Result<()> {
        if self.time_slice_ms == 0 {
            return Err(RecorderError::config("Time slice cannot be zero"));
        }

        if !self.constraints.video && !self.constraints.audio {
            return Err(RecorderError::config(
                "At least one of video or audio must be captured",
            ));
        }

        if self.constraints.max_width == Some(0) || self.constraints.max_height == Some(0) {
            return Err(RecorderError::config("Maximum resolution cannot be zero"));
        }

        if self.constraints.frame_rate == Some(0) {
            return Err(RecorderError::config("Frame rate cannot be zero"));
        }

        if let Some(mime) = &self.mime_type {
            if mime.trim().is_empty() {
                return Err(RecorderError::config("Mime type cannot be blank"));
            }
        }

        Ok(())
    }
}
