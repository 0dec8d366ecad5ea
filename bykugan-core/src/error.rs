//! Error types for Bykugan

use thiserror::Error;

/// Result type alias using RecorderError
pub type Result<T> = std::result::Result<T, RecorderError>;

/// Why the platform refused to hand out a capture stream
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// The user (or a policy) denied screen capture permission
    #[error("permission denied")]
    PermissionDenied,

    /// The source picker was dismissed without choosing anything
    #[error("no capture source selected")]
    NoSourceSelected,

    /// The capture backend could not be reached
    #[error("capture platform unavailable: {0}")]
    PlatformUnavailable(String),
}

/// Main error type for Bykugan operations
#[derive(Debug, Error)]
pub enum RecorderError {
    /// Capture or encoder primitives are missing on this platform
    #[error("Screen recording is not supported: {0}")]
    UnsupportedPlatform(String),

    /// The platform did not grant a capture stream
    #[error("Capture acquisition failed: {0}")]
    CaptureAcquisitionFailed(#[from] CaptureError),

    /// A session is already requesting, recording or stopping
    #[error("Recording session already running")]
    AlreadyRecording,

    /// Encoder creation or control error
    #[error("Encoder error: {0}")]
    Encoder(String),

    /// Download/save affordance error
    #[error("Download error: {0}")]
    Download(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<RecorderError>,
    },
}

impl RecorderError {
    /// Create an unsupported-platform error
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::UnsupportedPlatform(reason.into())
    }

    /// Create an encoder error
    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::Encoder(msg.into())
    }

    /// Create a download error
    pub fn download(msg: impl Into<String>) -> Self {
        Self::Download(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping context wrappers
    pub fn root(&self) -> &RecorderError {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// A short hint telling the user what to try next
    pub fn user_hint(&self) -> Option<&'static str> {
        match self.root() {
            Self::UnsupportedPlatform(_) => {
                Some("Screen capture or encoding is unavailable here; try another platform backend")
            }
            Self::CaptureAcquisitionFailed(CaptureError::PermissionDenied) => {
                Some("Grant screen recording permission and run the recording again")
            }
            Self::CaptureAcquisitionFailed(CaptureError::NoSourceSelected) => {
                Some("Pick a screen or window in the source picker to start recording")
            }
            Self::CaptureAcquisitionFailed(CaptureError::PlatformUnavailable(_)) => {
                Some("Check that the capture service is running")
            }
            Self::AlreadyRecording => Some("Stop the current recording before starting a new one"),
            Self::Download(_) => Some("Check that the download directory exists and is writable"),
            Self::Config(_) => Some("Check ~/.config/bykugan/config.toml for invalid values"),
            _ => None,
        }
    }

    /// Whether the user can fix this without code changes
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self.root(),
            Self::UnsupportedPlatform(_)
                | Self::CaptureAcquisitionFailed(_)
                | Self::AlreadyRecording
                | Self::Download(_)
                | Self::Config(_)
        )
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl From<toml::de::Error> for RecorderError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("Failed to parse config file: {}", err))
    }
}

impl From<serde_json::Error> for RecorderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("Invalid recorder options: {}", err))
    }
}
