//! Simulated capture and encoding backend
//!
//! Produces a deterministic synthetic stream: one video track (plus an
//! audio track when requested) and an encoder that emits one numbered
//! fragment per time slice. Useful for exercising the full session
//! lifecycle without a compositor or a hardware encoder.

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::{
    CaptureProvider, CaptureStream, DirectoryDownloads, DownloadProvider, EncoderEvent,
    EncoderOptions, EncoderProvider, EncoderState, MediaEncoder, MediaTrack, ObjectUrl,
};
use crate::config::CaptureConstraints;
use crate::error::{CaptureError, RecorderError, Result};
use crate::formats::PREFERRED_MIME_TYPES;
use crate::types::{Blob, TrackKind};

/// Fragment magic
const FRAGMENT_MAGIC: &[u8; 4] = b"BYKG";

/// Default synthetic fragment payload size
const DEFAULT_FRAGMENT_SIZE: usize = 4096;

static STREAM_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Synthetic capture and encoding platform
pub struct SimulatedPlatform {
    /// Mime types the simulated encoder accepts
    supported: Vec<String>,
    /// Refuse capture with this error
    deny: Option<CaptureError>,
    /// End the video track after this long, as if the user stopped sharing
    revoke_after: Option<Duration>,
    /// Payload bytes per fragment
    fragment_size: usize,
    /// Where saved recordings go
    downloads: DirectoryDownloads,
}

impl Default for SimulatedPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedPlatform {
    /// Supports every preferred mime type and saves into the download directory
    pub fn new() -> Self {
        Self {
            supported: PREFERRED_MIME_TYPES.iter().map(|s| s.to_string()).collect(),
            deny: None,
            revoke_after: None,
            fragment_size: DEFAULT_FRAGMENT_SIZE,
            downloads: DirectoryDownloads::user_default(),
        }
    }

    /// Replace the set of supported mime types
    pub fn with_supported<I, S>(mut self, mime_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported = mime_types.into_iter().map(Into::into).collect();
        self
    }

    /// Fail every capture request with `error`
    pub fn with_denial(mut self, error: CaptureError) -> Self {
        self.deny = Some(error);
        self
    }

    /// End the video track `delay` after capture starts
    pub fn with_revoke_after(mut self, delay: Duration) -> Self {
        self.revoke_after = Some(delay);
        self
    }

    /// Payload bytes per fragment
    pub fn with_fragment_size(mut self, size: usize) -> Self {
        self.fragment_size = size;
        self
    }

    /// Save recordings into `dir`
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.downloads = DirectoryDownloads::new(dir);
        self
    }

    /// The download affordance in use
    pub fn downloads(&self) -> &DirectoryDownloads {
        &self.downloads
    }

    /// Mime types the simulated encoder accepts
    pub fn supported(&self) -> &[String] {
        &self.supported
    }
}

#[async_trait]
impl CaptureProvider for SimulatedPlatform {
    async fn request_capture(
        &self,
        constraints: &CaptureConstraints,
    ) -> std::result::Result<Arc<dyn CaptureStream>, CaptureError> {
        if let Some(error) = &self.deny {
            warn!("Simulated capture denied: {}", error);
            return Err(error.clone());
        }

        let width = constraints.max_width.unwrap_or(1920).min(1920);
        let height = constraints.max_height.unwrap_or(1080).min(1080);
        let fps = constraints.frame_rate.unwrap_or(30);

        let mut tracks: Vec<Arc<SimulatedTrack>> = Vec::new();
        if constraints.video {
            tracks.push(Arc::new(SimulatedTrack::new(
                TrackKind::Video,
                format!("Simulated screen {}x{}@{}", width, height, fps),
            )));
        }
        if constraints.audio {
            tracks.push(Arc::new(SimulatedTrack::new(
                TrackKind::Audio,
                "Simulated system audio".to_string(),
            )));
        }
        if tracks.is_empty() {
            return Err(CaptureError::NoSourceSelected);
        }

        let stream = Arc::new(SimulatedStream {
            id: format!("simulated-{}", STREAM_COUNTER.fetch_add(1, Ordering::SeqCst)),
            tracks,
        });
        info!("Simulated capture granted: {}", stream.id);

        if let (Some(delay), Some(video)) = (
            self.revoke_after,
            stream.tracks.iter().find(|t| t.kind == TrackKind::Video).cloned(),
        ) {
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                video.end();
            });
        }

        Ok(stream)
    }
}

impl EncoderProvider for SimulatedPlatform {
    fn supports_encoding(&self, mime_type: &str) -> bool {
        self.supported.iter().any(|m| m == mime_type)
    }

    fn create_encoder(
        &self,
        stream: Arc<dyn CaptureStream>,
        options: EncoderOptions,
    ) -> Result<Box<dyn MediaEncoder>> {
        if !stream.is_active() {
            return Err(RecorderError::encoder("Capture stream is not active"));
        }
        if let Some(mime) = &options.mime_type {
            if !self.supports_encoding(mime) {
                return Err(RecorderError::encoder(format!("Unsupported mime type {}", mime)));
            }
        }

        // Without an explicit type the platform default is the first supported one
        let mime_type = options.mime_type.or_else(|| self.supported.first().cloned());
        debug!("Creating simulated encoder for {} ({:?})", stream.id(), mime_type);

        Ok(Box::new(SimulatedEncoder {
            mime_type,
            fragment_size: self.fragment_size,
            state: EncoderState::Inactive,
            stop_tx: None,
            task: None,
        }))
    }
}

impl DownloadProvider for SimulatedPlatform {
    fn create_object_url(&self, blob: &Blob) -> Result<ObjectUrl> {
        self.downloads.create_object_url(blob)
    }

    fn trigger_download(&self, url: &ObjectUrl, filename: &str) -> Result<()> {
        self.downloads.trigger_download(url, filename)
    }

    fn revoke_object_url(&self, url: &ObjectUrl) {
        self.downloads.revoke_object_url(url)
    }
}

/// Synthetic media track
pub struct SimulatedTrack {
    kind: TrackKind,
    label: String,
    live: AtomicBool,
    ended_tx: watch::Sender<bool>,
}

impl SimulatedTrack {
    fn new(kind: TrackKind, label: String) -> Self {
        let (ended_tx, _) = watch::channel(false);
        Self {
            kind,
            label,
            live: AtomicBool::new(true),
            ended_tx,
        }
    }

    /// End the track from the "platform side"
    pub fn end(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            info!("Simulated {} track ended by user", self.kind);
            self.ended_tx.send_replace(true);
        }
    }
}

impl MediaTrack for SimulatedTrack {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn label(&self) -> String {
        self.label.clone()
    }

    fn stop(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            debug!("Simulated {} track stopped", self.kind);
        }
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn ended(&self) -> watch::Receiver<bool> {
        self.ended_tx.subscribe()
    }
}

/// Synthetic capture stream
pub struct SimulatedStream {
    id: String,
    tracks: Vec<Arc<SimulatedTrack>>,
}

impl CaptureStream for SimulatedStream {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        self.tracks
            .iter()
            .map(|t| t.clone() as Arc<dyn MediaTrack>)
            .collect()
    }
}

/// Encoder emitting numbered synthetic fragments
pub struct SimulatedEncoder {
    mime_type: Option<String>,
    fragment_size: usize,
    state: EncoderState,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl MediaEncoder for SimulatedEncoder {
    fn mime_type(&self) -> Option<String> {
        self.mime_type.clone()
    }

    fn state(&self) -> EncoderState {
        self.state
    }

    fn start(
        &mut self,
        time_slice: Duration,
        events: mpsc::UnboundedSender<EncoderEvent>,
    ) -> Result<()> {
        if self.state == EncoderState::Recording {
            return Err(RecorderError::encoder("Encoder already started"));
        }
        if time_slice.is_zero() {
            return Err(RecorderError::encoder("Time slice cannot be zero"));
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let fragment_size = self.fragment_size;
        self.task = Some(tokio::spawn(run_encoder(
            time_slice,
            fragment_size,
            events,
            stop_rx,
        )));
        self.stop_tx = Some(stop_tx);
        self.state = EncoderState::Recording;
        Ok(())
    }

    fn stop(&mut self) {
        if self.state == EncoderState::Inactive {
            return;
        }
        self.state = EncoderState::Inactive;
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for SimulatedEncoder {
    fn drop(&mut self) {
        self.stop();
        // The task sends Stopped on its own; detach it
        self.task.take();
    }
}

/// Encoder loop: one fragment per tick, a final flush on stop
async fn run_encoder(
    time_slice: Duration,
    fragment_size: usize,
    events: mpsc::UnboundedSender<EncoderEvent>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(time_slice);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // First tick completes immediately
    ticker.tick().await;

    let mut sequence: u32 = 0;
    loop {
        tokio::select! {
            _ = &mut stop_rx => break,
            _ = ticker.tick() => {
                let fragment = synthetic_fragment(sequence, fragment_size);
                trace!("Simulated fragment {} ({} bytes)", sequence, fragment.len());
                sequence += 1;
                if events.send(EncoderEvent::DataAvailable(fragment)).is_err() {
                    debug!("Encoder event receiver gone, stopping");
                    return;
                }
            }
        }
    }

    // Flush the partial slice, then report stopped
    let _ = events.send(EncoderEvent::DataAvailable(synthetic_fragment(
        sequence,
        fragment_size / 2,
    )));
    let _ = events.send(EncoderEvent::Stopped);
    debug!("Simulated encoder stopped after {} fragments", sequence + 1);
}

/// `BYKG` + big-endian sequence number + patterned payload
fn synthetic_fragment(sequence: u32, payload: usize) -> Bytes {
    let mut buf = BytesMut::with_capacity(8 + payload);
    buf.put_slice(FRAGMENT_MAGIC);
    buf.put_u32(sequence);
    buf.extend((0..payload).map(|i| (i as u32).wrapping_add(sequence) as u8));
    buf.freeze()
}
