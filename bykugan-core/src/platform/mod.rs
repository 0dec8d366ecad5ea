//! Platform collaborators used by a recording session
//!
//! A session never talks to a capture or encoding backend directly. It is
//! handed a [`PlatformCapability`] at construction and drives the backend
//! through these traits:
//! - [`CaptureProvider`] grants capture streams made of [`MediaTrack`]s
//! - [`EncoderProvider`] reports supported encodings and builds [`MediaEncoder`]s
//! - [`DownloadProvider`] persists a finished blob under a suggested name
//!
//! Events flow back over channels: encoders push [`EncoderEvent`]s into an
//! mpsc sender supplied at start, tracks expose their "ended" flag as a
//! watch receiver.

pub mod downloads;
pub mod simulated;

pub use downloads::DirectoryDownloads;
pub use simulated::SimulatedPlatform;

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use crate::config::CaptureConstraints;
use crate::error::{CaptureError, Result};
use crate::types::{Blob, TrackKind};

/// One media track inside a capture stream
pub trait MediaTrack: Send + Sync {
    /// Whether this is a video or audio track
    fn kind(&self) -> TrackKind;

    /// Human readable source name
    fn label(&self) -> String;

    /// Release the underlying source. Stopping twice is a no-op.
    fn stop(&self);

    /// Whether the track is still delivering media
    fn is_live(&self) -> bool;

    /// Flips to `true` when the source goes away outside our control,
    /// e.g. the user revoked sharing from the system UI
    fn ended(&self) -> watch::Receiver<bool>;
}

/// A live capture stream granted by the platform
pub trait CaptureStream: Send + Sync {
    /// Platform identifier for the stream
    fn id(&self) -> String;

    /// All tracks, video first
    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>>;

    /// Video tracks only
    fn video_tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        self.tracks()
            .into_iter()
            .filter(|t| t.kind() == TrackKind::Video)
            .collect()
    }

    /// Audio tracks only
    fn audio_tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        self.tracks()
            .into_iter()
            .filter(|t| t.kind() == TrackKind::Audio)
            .collect()
    }

    /// Whether any track is still live
    fn is_active(&self) -> bool {
        self.tracks().iter().any(|t| t.is_live())
    }

    /// Stop every track
    fn stop_all(&self) {
        for track in self.tracks() {
            track.stop();
        }
    }
}

impl std::fmt::Debug for dyn CaptureStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureStream").field("id", &self.id()).finish()
    }
}

/// Grants capture streams
#[async_trait]
pub trait CaptureProvider: Send + Sync {
    /// Ask the platform for a capture stream matching `constraints`
    ///
    /// Usually shows a source picker; may take as long as the user needs.
    async fn request_capture(
        &self,
        constraints: &CaptureConstraints,
    ) -> std::result::Result<Arc<dyn CaptureStream>, CaptureError>;
}

/// Options passed when building an encoder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncoderOptions {
    /// Explicit mime type, or `None` for the platform default
    pub mime_type: Option<String>,
}

/// Encoder run state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderState {
    /// Not started, or fully stopped
    Inactive,
    /// Producing fragments
    Recording,
}

/// Events emitted by a running encoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderEvent {
    /// A flushed fragment; may be empty
    DataAvailable(Bytes),
    /// The encoder has flushed its last fragment and stopped
    Stopped,
}

/// An encoder bound to one capture stream
pub trait MediaEncoder: Send {
    /// Mime type the encoder actually produces, if known
    fn mime_type(&self) -> Option<String>;

    /// Current run state
    fn state(&self) -> EncoderState;

    /// Start producing fragments every `time_slice`
    ///
    /// All events for this encoder go to `events`, in encode order, ending
    /// with exactly one [`EncoderEvent::Stopped`].
    fn start(
        &mut self,
        time_slice: Duration,
        events: mpsc::UnboundedSender<EncoderEvent>,
    ) -> Result<()>;

    /// Ask the encoder to flush and stop. Completion is signalled by
    /// [`EncoderEvent::Stopped`].
    fn stop(&mut self);
}

/// Reports encoding support and builds encoders
pub trait EncoderProvider: Send + Sync {
    /// Whether the platform can encode `mime_type`
    fn supports_encoding(&self, mime_type: &str) -> bool;

    /// Build an encoder consuming `stream`
    fn create_encoder(
        &self,
        stream: Arc<dyn CaptureStream>,
        options: EncoderOptions,
    ) -> Result<Box<dyn MediaEncoder>>;
}

/// Temporary reference to a blob handed to the download affordance
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    /// Wrap a platform reference
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Raw reference
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// "Persist these bytes with a suggested name"
pub trait DownloadProvider: Send + Sync {
    /// Allocate a temporary reference to `blob`
    fn create_object_url(&self, blob: &Blob) -> Result<ObjectUrl>;

    /// Hand the referenced blob to the user under `filename`
    fn trigger_download(&self, url: &ObjectUrl, filename: &str) -> Result<()>;

    /// Release a reference from [`create_object_url`](Self::create_object_url)
    fn revoke_object_url(&self, url: &ObjectUrl);
}

/// Everything a recording session needs from the platform
pub trait MediaPlatform: CaptureProvider + EncoderProvider + DownloadProvider {}

impl<T> MediaPlatform for T where T: CaptureProvider + EncoderProvider + DownloadProvider {}

/// Whether the platform can record at all
#[derive(Clone)]
pub enum PlatformCapability {
    /// Capture and encoding primitives are present
    Available(Arc<dyn MediaPlatform>),
    /// Something required is missing
    Unavailable {
        /// What is missing
        reason: String,
    },
}

impl PlatformCapability {
    /// Wrap a platform implementation
    pub fn available(platform: impl MediaPlatform + 'static) -> Self {
        Self::Available(Arc::new(platform))
    }

    /// Mark the platform as unable to record
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Whether recording is possible
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    /// The platform, if available
    pub fn platform(&self) -> Option<&Arc<dyn MediaPlatform>> {
        match self {
            Self::Available(platform) => Some(platform),
            Self::Unavailable { .. } => None,
        }
    }
}

impl std::fmt::Debug for PlatformCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available(_) => f.write_str("Available"),
            Self::Unavailable { reason } => {
                f.debug_struct("Unavailable").field("reason", reason).finish()
            }
        }
    }
}
