//! Bykugan Core Library
//!
//! Lightweight screen recording sessions.
//!
//! This library provides:
//! - A [`ScreenRecorder`] that owns one recording's lifecycle
//! - Encoding negotiation over a fixed mime type preference list
//! - Platform collaborator traits for capture, encoding and downloads
//! - A simulated platform and a directory-backed download affordance
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────┐    ┌─────────────────┐
//! │ CaptureProvider │───▶│ MediaEncoder │───▶│ ScreenRecorder  │──▶ Blob ──▶ DownloadProvider
//! │ (screen share)  │    │ (fragments)  │    │ (buffer, stop)  │
//! └─────────────────┘    └──────────────┘    └─────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod formats;
pub mod platform;
pub mod recorder;
pub mod types;

pub use config::{CaptureConstraints, RecorderConfig, RecorderOptions};
pub use error::{CaptureError, RecorderError, Result};
pub use platform::PlatformCapability;
pub use recorder::ScreenRecorder;
pub use types::{Blob, Handle, RecorderState, SaveOutcome};
