//! Screen recording session
//!
//! Owns one recording's lifecycle: capability check, capture acquisition,
//! encoder selection, fragment buffering, stop/finalize and saving.
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────────┐   ┌────────────┐
//! │ Capture      │──▶│ Encoder      │──▶│ Session event │──▶│ Blob       │
//! │ (platform)   │   │ (platform)   │   │ task (chunks) │   │ (finalize) │
//! └──────────────┘   └──────────────┘   └───────────────┘   └────────────┘
//! ```
//!
//! All session state sits behind one mutex. Encoder events and the video
//! track's "ended" signal are consumed by a single task per session, so
//! fragments are appended in the order the encoder produced them.

use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, trace, warn};

use crate::config::{RecorderConfig, RecorderOptions, DEFAULT_FILENAME};
use crate::error::{RecorderError, Result};
use crate::formats::negotiate_mime_type;
use crate::platform::{
    CaptureStream, EncoderEvent, EncoderOptions, EncoderState, MediaEncoder, MediaPlatform,
    ObjectUrl, PlatformCapability,
};
use crate::types::{Blob, Handle, RecorderState, SaveOutcome, DEFAULT_BLOB_TYPE};

/// A screen recorder bound to one platform
///
/// One recording at a time. After a recording is finalized, calling
/// [`start`](Self::start) again begins a fresh one and discards the
/// previous blob.
pub struct ScreenRecorder {
    /// Injected platform
    capability: PlatformCapability,
    /// Configuration
    config: RecorderConfig,
    /// Session state shared with the event task
    inner: Arc<Mutex<SessionInner>>,
}

/// Mutable per-session state
struct SessionInner {
    /// Session handle, renewed on every start
    handle: Handle,
    /// Lifecycle state
    state: RecorderState,
    /// Live capture stream (when recording)
    capture: Option<Arc<dyn CaptureStream>>,
    /// Encoder bound to `capture`
    encoder: Option<Box<dyn MediaEncoder>>,
    /// Encoded fragments in encode order
    chunks: Vec<Bytes>,
    /// Fragments accepted this session
    fragment_count: usize,
    /// Negotiated (or encoder reported) mime type
    mime_type: Option<String>,
    /// Finalized recording, `None` if nothing was recorded
    blob: Option<Blob>,
    /// Callers waiting in `stop()`
    waiters: Vec<oneshot::Sender<Option<Blob>>>,
}

impl SessionInner {
    fn new() -> Self {
        Self {
            handle: Handle::new(),
            state: RecorderState::Idle,
            capture: None,
            encoder: None,
            chunks: Vec::new(),
            fragment_count: 0,
            mime_type: None,
            blob: None,
            waiters: Vec::new(),
        }
    }

    /// Forget the previous recording
    fn reset(&mut self) {
        self.handle = Handle::new();
        self.chunks.clear();
        self.fragment_count = 0;
        self.mime_type = None;
        self.blob = None;
    }

    fn push_fragment(&mut self, data: Bytes) {
        if data.is_empty() {
            trace!("{}: dropping empty fragment", self.handle);
            return;
        }
        if !matches!(self.state, RecorderState::Recording | RecorderState::Stopping) {
            debug!("{}: fragment after finalize ignored", self.handle);
            return;
        }
        trace!(
            "{}: fragment {} ({} bytes)",
            self.handle,
            self.fragment_count,
            data.len()
        );
        self.chunks.push(data);
        self.fragment_count += 1;
    }

    /// Ask the encoder to stop and release the capture source
    ///
    /// Returns false if there was nothing to stop.
    fn begin_stop(&mut self, reason: &str) -> bool {
        if self.state != RecorderState::Recording {
            return false;
        }

        info!("{}: stopping recording ({})", self.handle, reason);
        self.state = RecorderState::Stopping;

        if let Some(encoder) = self.encoder.as_mut() {
            if encoder.state() != EncoderState::Inactive {
                encoder.stop();
            }
        }
        if let Some(capture) = &self.capture {
            capture.stop_all();
        }
        true
    }

    /// Materialize the blob and wake every stop waiter
    fn finalize(&mut self) {
        if self.state == RecorderState::Finalized {
            return;
        }

        let chunks = std::mem::take(&mut self.chunks);
        self.blob = if chunks.is_empty() {
            None
        } else {
            let mime = self.mime_type.as_deref().unwrap_or(DEFAULT_BLOB_TYPE);
            Some(Blob::from_chunks(&chunks, mime))
        };
        self.state = RecorderState::Finalized;

        self.encoder = None;
        if let Some(capture) = self.capture.take() {
            capture.stop_all();
        }

        match &self.blob {
            Some(blob) => info!(
                "{}: recording finalized: {} fragments, {} bytes, {}",
                self.handle,
                self.fragment_count,
                blob.size(),
                blob.mime_type()
            ),
            None => info!("{}: recording finalized with no data", self.handle),
        }

        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(self.blob.clone());
        }
    }
}

/// Puts the session back to `Idle` if `start()` does not complete
struct RequestGuard<'a> {
    inner: &'a Mutex<SessionInner>,
    armed: bool,
}

impl RequestGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for RequestGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut inner = self.inner.lock();
            if inner.state == RecorderState::Requesting {
                debug!("{}: capture request abandoned", inner.handle);
                inner.state = RecorderState::Idle;
            }
        }
    }
}

/// Revokes an object URL when dropped
struct ObjectUrlLease<'a> {
    platform: &'a dyn MediaPlatform,
    url: ObjectUrl,
}

impl Drop for ObjectUrlLease<'_> {
    fn drop(&mut self) {
        self.platform.revoke_object_url(&self.url);
    }
}

impl ScreenRecorder {
    /// Create a recorder from caller options merged over the defaults
    pub fn new(capability: PlatformCapability, options: RecorderOptions) -> Result<Self> {
        Self::with_config(capability, RecorderConfig::from(options))
    }

    /// Create a recorder from a complete configuration
    pub fn with_config(capability: PlatformCapability, config: RecorderConfig) -> Result<Self> {
        config.validate_strict()?;
        for warning in config.validate() {
            warn!("{}", warning);
        }

        Ok(Self {
            capability,
            config,
            inner: Arc::new(Mutex::new(SessionInner::new())),
        })
    }

    /// Whether `capability` allows recording at all
    ///
    /// Needs no recorder instance and has no side effects.
    pub fn is_supported(capability: &PlatformCapability) -> bool {
        capability.is_available()
    }

    /// Start recording
    ///
    /// Requests a capture stream, negotiates an encoding, starts the encoder
    /// and returns the live stream (e.g. for a preview). Fails with
    /// [`RecorderError::UnsupportedPlatform`] without touching the platform
    /// if recording is unsupported, and with
    /// [`RecorderError::AlreadyRecording`] while another recording is in
    /// progress. A failed or abandoned start leaves the recorder `Idle`.
    pub async fn start(&self) -> Result<Arc<dyn CaptureStream>> {
        let platform = match &self.capability {
            PlatformCapability::Available(platform) => platform.clone(),
            PlatformCapability::Unavailable { reason } => {
                return Err(RecorderError::unsupported(reason.clone()));
            }
        };

        let handle = {
            let mut inner = self.inner.lock();
            if inner.state.is_busy() {
                return Err(RecorderError::AlreadyRecording);
            }
            inner.reset();
            inner.state = RecorderState::Requesting;
            inner.handle
        };
        let guard = RequestGuard {
            inner: &self.inner,
            armed: true,
        };

        info!("{}: requesting capture", handle);
        let stream = platform
            .request_capture(&self.config.constraints)
            .await
            .map_err(|e| {
                warn!("{}: capture request failed: {}", handle, e);
                RecorderError::from(e)
            })?;

        let mime_type = negotiate_mime_type(self.config.mime_type.as_deref(), |m| {
            platform.supports_encoding(m)
        });

        let mut encoder = match platform.create_encoder(
            stream.clone(),
            EncoderOptions {
                mime_type: mime_type.clone(),
            },
        ) {
            Ok(encoder) => encoder,
            Err(e) => {
                stream.stop_all();
                return Err(e.with_context("Failed to create encoder"));
            }
        };

        // Subscribe before starting so an early "ended" is not missed
        let ended = stream.video_tracks().first().map(|track| track.ended());
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        if let Err(e) = encoder.start(self.config.time_slice(), events_tx) {
            stream.stop_all();
            return Err(e.with_context("Failed to start encoder"));
        }

        {
            let mut inner = self.inner.lock();
            inner.mime_type = mime_type.or_else(|| encoder.mime_type());
            inner.capture = Some(stream.clone());
            inner.encoder = Some(encoder);
            inner.state = RecorderState::Recording;
            info!(
                "{}: recording {} every {} ms as {}",
                handle,
                stream.id(),
                self.config.time_slice_ms,
                inner.mime_type.as_deref().unwrap_or("platform default")
            );
        }
        guard.disarm();

        tokio::spawn(run_session_events(self.inner.clone(), events_rx, ended));

        Ok(stream)
    }

    /// Stop recording and return the finalized blob
    ///
    /// With nothing recording this returns the current blob immediately.
    /// Otherwise it stops the encoder and every capture track and waits for
    /// finalization. Concurrent callers all receive the same blob.
    pub async fn stop(&self) -> Option<Blob> {
        let waiter = {
            let mut inner = self.inner.lock();
            let state = inner.state;
            match state {
                RecorderState::Recording => {
                    inner.begin_stop("stop requested");
                }
                RecorderState::Stopping => {
                    debug!("{}: joining pending stop", inner.handle);
                }
                _ => return inner.blob.clone(),
            }
            let (tx, rx) = oneshot::channel();
            inner.waiters.push(tx);
            rx
        };

        match waiter.await {
            Ok(blob) => blob,
            Err(_) => self.get_blob(),
        }
    }

    /// The finalized recording, or `None` if nothing was recorded
    ///
    /// Fragments are only readable once the encoder has fully stopped, so
    /// this is `None` while a recording is in progress.
    pub fn get_blob(&self) -> Option<Blob> {
        self.inner.lock().blob.clone()
    }

    /// Offer the recording for download as `filename` (default `recording.webm`)
    ///
    /// With nothing recorded this logs a warning and returns
    /// [`SaveOutcome::NoData`] without touching the platform. The temporary
    /// object URL is always revoked, even if the download fails.
    pub fn save(&self, filename: Option<&str>) -> Result<SaveOutcome> {
        let filename = filename.unwrap_or(DEFAULT_FILENAME);

        let Some(blob) = self.get_blob() else {
            warn!("No recording available to save");
            return Ok(SaveOutcome::NoData);
        };
        let platform = self
            .capability
            .platform()
            .ok_or_else(|| RecorderError::unsupported("no download affordance"))?;

        let lease = ObjectUrlLease {
            platform: platform.as_ref(),
            url: platform.create_object_url(&blob)?,
        };
        platform.trigger_download(&lease.url, filename)?;

        info!("Saved {} bytes as {}", blob.size(), filename);
        Ok(SaveOutcome::Saved {
            filename: filename.to_string(),
            size: blob.size(),
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> RecorderState {
        self.inner.lock().state
    }

    /// Whether the encoder is running
    pub fn is_recording(&self) -> bool {
        self.state() == RecorderState::Recording
    }

    /// Mime type of the current or last recording
    pub fn mime_type(&self) -> Option<String> {
        self.inner.lock().mime_type.clone()
    }

    /// Non-empty fragments accepted in the current or last recording
    pub fn fragment_count(&self) -> usize {
        self.inner.lock().fragment_count
    }

    /// Handle of the current or last session
    pub fn handle(&self) -> Handle {
        self.inner.lock().handle
    }

    /// Configuration
    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Injected platform capability
    pub fn capability(&self) -> &PlatformCapability {
        &self.capability
    }
}

impl Drop for ScreenRecorder {
    fn drop(&mut self) {
        // Release the capture source; the event task finalizes on its own
        self.inner.lock().begin_stop("recorder dropped");
    }
}

/// Session event loop: appends fragments, follows the video track's ended
/// signal, finalizes on encoder stop
async fn run_session_events(
    inner: Arc<Mutex<SessionInner>>,
    mut events: mpsc::UnboundedReceiver<EncoderEvent>,
    mut ended: Option<watch::Receiver<bool>>,
) {
    loop {
        tokio::select! {
            biased;

            event = events.recv() => match event {
                Some(EncoderEvent::DataAvailable(data)) => inner.lock().push_fragment(data),
                Some(EncoderEvent::Stopped) => {
                    inner.lock().finalize();
                    break;
                }
                None => {
                    let mut inner = inner.lock();
                    warn!("{}: encoder went away without stopping", inner.handle);
                    inner.begin_stop("encoder lost");
                    inner.finalize();
                    break;
                }
            },

            user_ended = track_ended(&mut ended) => {
                if user_ended {
                    inner.lock().begin_stop("capture ended by user");
                }
            }
        }
    }
}

/// Resolves once the watched track reports ended (`true`) or is dropped
/// (`false`); pending forever when nothing is watched
async fn track_ended(ended: &mut Option<watch::Receiver<bool>>) -> bool {
    let Some(rx) = ended.as_mut() else {
        return std::future::pending().await;
    };
    let result = rx.wait_for(|ended| *ended).await.is_ok();
    *ended = None;
    result
}
