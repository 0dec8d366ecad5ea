//! Core types for Bykugan
//!
//! These types represent the data that flows through a recording session:
//! session handles, lifecycle state, media track kinds and the finalized blob.

use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global handle counter for unique session IDs
static HANDLE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Media type used when fragments exist but no encoding was negotiated
pub const DEFAULT_BLOB_TYPE: &str = "video/webm";

/// Opaque handle for a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

impl Handle {
    /// Create a new unique handle
    pub fn new() -> Self {
        Self(HANDLE_COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    /// Get the raw handle value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Handle({})", self.0)
    }
}

/// Recording session lifecycle
///
/// `Idle → Requesting → Recording → Stopping → Finalized`. A failed or
/// abandoned `start()` falls back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecorderState {
    /// Nothing started yet
    #[default]
    Idle,
    /// Waiting for the platform to grant a capture stream
    Requesting,
    /// Encoder running, fragments being buffered
    Recording,
    /// Stop requested, waiting for the encoder to flush
    Stopping,
    /// Encoder stopped and the blob materialized
    Finalized,
}

impl RecorderState {
    /// Whether a session currently holds (or is acquiring) platform resources
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Requesting | Self::Recording | Self::Stopping)
    }
}

impl std::fmt::Display for RecorderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecorderState::Idle => write!(f, "Idle"),
            RecorderState::Requesting => write!(f, "Requesting"),
            RecorderState::Recording => write!(f, "Recording"),
            RecorderState::Stopping => write!(f, "Stopping"),
            RecorderState::Finalized => write!(f, "Finalized"),
        }
    }
}

/// Kind of media track inside a capture stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// Screen or window video
    Video,
    /// System or tab audio
    Audio,
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Video => write!(f, "video"),
            TrackKind::Audio => write!(f, "audio"),
        }
    }
}

/// Immutable encoded recording
///
/// Cloning is cheap; the underlying bytes are reference counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    data: Bytes,
    mime_type: String,
}

impl Blob {
    /// Create a blob from already concatenated bytes
    pub fn new(data: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Concatenate fragments in order into a single blob
    pub fn from_chunks(chunks: &[Bytes], mime_type: impl Into<String>) -> Self {
        let total: usize = chunks.iter().map(Bytes::len).sum();
        let mut buf = BytesMut::with_capacity(total);
        for chunk in chunks {
            buf.extend_from_slice(chunk);
        }
        Self::new(buf.freeze(), mime_type)
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Whether the blob holds no data
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Media type tag
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Borrow the encoded bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Get a cheap clone of the encoded bytes
    pub fn bytes(&self) -> Bytes {
        self.data.clone()
    }
}

/// Result of [`crate::ScreenRecorder::save`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The download was triggered under this file name
    Saved { filename: String, size: usize },
    /// Nothing was recorded; no download was triggered
    NoData,
}

impl SaveOutcome {
    /// Whether a download was actually triggered
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }
}
