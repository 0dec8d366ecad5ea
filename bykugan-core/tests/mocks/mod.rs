//! Mock infrastructure for testing
//!
//! Provides a scriptable platform that records every call the recorder
//! makes, and lets tests push encoder events and end tracks by hand.

#![allow(dead_code)]

use async_trait::async_trait;
use bykugan_core::config::CaptureConstraints;
use bykugan_core::error::{CaptureError, RecorderError, Result};
use bykugan_core::platform::{
    CaptureProvider, CaptureStream, DownloadProvider, EncoderEvent, EncoderOptions,
    EncoderProvider, EncoderState, MediaEncoder, MediaTrack, ObjectUrl,
};
use bykugan_core::types::{Blob, TrackKind};
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

pub const A: &str = "video/webm;codecs=vp9";
pub const B: &str = "video/webm;codecs=vp8";
pub const C: &str = "video/webm";
pub const D: &str = "video/mp4";

/// Call counters shared between the platform and the objects it hands out
#[derive(Default)]
pub struct Calls {
    pub capture_requests: AtomicUsize,
    pub encoders_created: AtomicUsize,
    pub encoder_starts: AtomicUsize,
    pub encoder_stops: AtomicUsize,
    pub track_stops: AtomicUsize,
    pub urls_created: AtomicUsize,
    pub downloads_triggered: AtomicUsize,
    pub urls_revoked: AtomicUsize,
}

/// Read a counter
pub fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

/// Scriptable platform
pub struct MockPlatform {
    pub calls: Arc<Calls>,
    supported: Mutex<Vec<String>>,
    capture_error: Mutex<Option<CaptureError>>,
    hold_capture: AtomicBool,
    fail_encoder: AtomicBool,
    fail_download: AtomicBool,
    /// Encoder answers stop() with an immediate Stopped event
    auto_stop: Arc<AtomicBool>,
    events: Arc<Mutex<Option<mpsc::UnboundedSender<EncoderEvent>>>>,
    last_stream: Mutex<Option<Arc<MockStream>>>,
    pub last_encoder_options: Mutex<Option<EncoderOptions>>,
    pub last_time_slice: Arc<Mutex<Option<Duration>>>,
    pub downloads: Mutex<Vec<(String, Vec<u8>)>>,
    staged: Mutex<Vec<(ObjectUrl, Blob)>>,
}

impl MockPlatform {
    /// Supports every preferred mime type
    pub fn new() -> Self {
        Self::supporting(&[A, B, C, D])
    }

    /// Supports exactly `mime_types`
    pub fn supporting(mime_types: &[&str]) -> Self {
        Self {
            calls: Arc::new(Calls::default()),
            supported: Mutex::new(mime_types.iter().map(|s| s.to_string()).collect()),
            capture_error: Mutex::new(None),
            hold_capture: AtomicBool::new(false),
            fail_encoder: AtomicBool::new(false),
            fail_download: AtomicBool::new(false),
            auto_stop: Arc::new(AtomicBool::new(true)),
            events: Arc::new(Mutex::new(None)),
            last_stream: Mutex::new(None),
            last_encoder_options: Mutex::new(None),
            last_time_slice: Arc::new(Mutex::new(None)),
            downloads: Mutex::new(Vec::new()),
            staged: Mutex::new(Vec::new()),
        }
    }

    pub fn deny_capture(&self, error: CaptureError) {
        *self.capture_error.lock() = Some(error);
    }

    pub fn allow_capture(&self) {
        *self.capture_error.lock() = None;
    }

    /// Never resolve capture requests
    pub fn hold_capture(&self) {
        self.hold_capture.store(true, Ordering::SeqCst);
    }

    pub fn fail_encoder(&self) {
        self.fail_encoder.store(true, Ordering::SeqCst);
    }

    pub fn fail_download(&self) {
        self.fail_download.store(true, Ordering::SeqCst);
    }

    /// Encoder stop() does not report Stopped; use `finish_encoder`
    pub fn manual_stop(&self) {
        self.auto_stop.store(false, Ordering::SeqCst);
    }

    /// Push a fragment from the running encoder
    pub fn emit(&self, data: &[u8]) {
        let events = self.events.lock();
        let tx = events.as_ref().expect("encoder not started");
        tx.send(EncoderEvent::DataAvailable(Bytes::copy_from_slice(data)))
            .expect("session event task gone");
    }

    /// Report the encoder as fully stopped
    pub fn finish_encoder(&self) {
        if let Some(tx) = self.events.lock().as_ref() {
            let _ = tx.send(EncoderEvent::Stopped);
        }
    }

    /// Simulate the user revoking the share from system UI
    pub fn end_video_track(&self) {
        let stream = self.last_stream.lock().clone().expect("no capture granted");
        stream.tracks[0].end();
    }

    /// The most recent capture stream
    pub fn last_stream(&self) -> Option<Arc<MockStream>> {
        self.last_stream.lock().clone()
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureProvider for MockPlatform {
    async fn request_capture(
        &self,
        constraints: &CaptureConstraints,
    ) -> std::result::Result<Arc<dyn CaptureStream>, CaptureError> {
        self.calls.capture_requests.fetch_add(1, Ordering::SeqCst);

        if self.hold_capture.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if let Some(error) = self.capture_error.lock().clone() {
            return Err(error);
        }

        let mut tracks = vec![Arc::new(MockTrack::new(TrackKind::Video, self.calls.clone()))];
        if constraints.audio {
            tracks.push(Arc::new(MockTrack::new(TrackKind::Audio, self.calls.clone())));
        }
        let stream = Arc::new(MockStream { tracks });
        *self.last_stream.lock() = Some(stream.clone());
        Ok(stream)
    }
}

impl EncoderProvider for MockPlatform {
    fn supports_encoding(&self, mime_type: &str) -> bool {
        self.supported.lock().iter().any(|m| m == mime_type)
    }

    fn create_encoder(
        &self,
        _stream: Arc<dyn CaptureStream>,
        options: EncoderOptions,
    ) -> Result<Box<dyn MediaEncoder>> {
        if self.fail_encoder.load(Ordering::SeqCst) {
            return Err(RecorderError::encoder("mock encoder refused"));
        }
        self.calls.encoders_created.fetch_add(1, Ordering::SeqCst);
        *self.last_encoder_options.lock() = Some(options.clone());

        Ok(Box::new(MockEncoder {
            mime_type: options.mime_type,
            state: EncoderState::Inactive,
            calls: self.calls.clone(),
            events: self.events.clone(),
            auto_stop: self.auto_stop.clone(),
            time_slice: self.last_time_slice.clone(),
        }))
    }
}

impl DownloadProvider for MockPlatform {
    fn create_object_url(&self, blob: &Blob) -> Result<ObjectUrl> {
        let n = self.calls.urls_created.fetch_add(1, Ordering::SeqCst);
        let url = ObjectUrl::new(format!("blob:mock/{}", n));
        self.staged.lock().push((url.clone(), blob.clone()));
        Ok(url)
    }

    fn trigger_download(&self, url: &ObjectUrl, filename: &str) -> Result<()> {
        self.calls.downloads_triggered.fetch_add(1, Ordering::SeqCst);
        if self.fail_download.load(Ordering::SeqCst) {
            return Err(RecorderError::download("mock download refused"));
        }
        let staged = self.staged.lock();
        let (_, blob) = staged
            .iter()
            .find(|(u, _)| u == url)
            .ok_or_else(|| RecorderError::download("unknown url"))?;
        self.downloads
            .lock()
            .push((filename.to_string(), blob.as_bytes().to_vec()));
        Ok(())
    }

    fn revoke_object_url(&self, url: &ObjectUrl) {
        self.calls.urls_revoked.fetch_add(1, Ordering::SeqCst);
        self.staged.lock().retain(|(u, _)| u != url);
    }
}

/// Track whose "ended" signal is fired by the test
pub struct MockTrack {
    kind: TrackKind,
    live: AtomicBool,
    ended_tx: watch::Sender<bool>,
    calls: Arc<Calls>,
}

impl MockTrack {
    fn new(kind: TrackKind, calls: Arc<Calls>) -> Self {
        let (ended_tx, _) = watch::channel(false);
        Self {
            kind,
            live: AtomicBool::new(true),
            ended_tx,
            calls,
        }
    }

    pub fn end(&self) {
        self.live.store(false, Ordering::SeqCst);
        self.ended_tx.send_replace(true);
    }
}

impl MediaTrack for MockTrack {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn label(&self) -> String {
        format!("mock {}", self.kind)
    }

    fn stop(&self) {
        self.calls.track_stops.fetch_add(1, Ordering::SeqCst);
        self.live.store(false, Ordering::SeqCst);
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn ended(&self) -> watch::Receiver<bool> {
        self.ended_tx.subscribe()
    }
}

pub struct MockStream {
    pub tracks: Vec<Arc<MockTrack>>,
}

impl MockStream {
    pub fn all_stopped(&self) -> bool {
        self.tracks.iter().all(|t| !t.is_live())
    }
}

impl CaptureStream for MockStream {
    fn id(&self) -> String {
        "mock-stream".to_string()
    }

    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        self.tracks
            .iter()
            .map(|t| t.clone() as Arc<dyn MediaTrack>)
            .collect()
    }
}

pub struct MockEncoder {
    mime_type: Option<String>,
    state: EncoderState,
    calls: Arc<Calls>,
    events: Arc<Mutex<Option<mpsc::UnboundedSender<EncoderEvent>>>>,
    auto_stop: Arc<AtomicBool>,
    time_slice: Arc<Mutex<Option<Duration>>>,
}

impl MediaEncoder for MockEncoder {
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
        self.calls.encoder_starts.fetch_add(1, Ordering::SeqCst);
        *self.time_slice.lock() = Some(time_slice);
        *self.events.lock() = Some(events);
        self.state = EncoderState::Recording;
        Ok(())
    }

    fn stop(&mut self) {
        self.calls.encoder_stops.fetch_add(1, Ordering::SeqCst);
        self.state = EncoderState::Inactive;
        if self.auto_stop.load(Ordering::SeqCst) {
            if let Some(tx) = self.events.lock().as_ref() {
                let _ = tx.send(EncoderEvent::Stopped);
            }
        }
    }
}

/// Yield until `done` holds, giving spawned session tasks a chance to run
pub async fn settle(mut done: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if done() {
            return true;
        }
        tokio::task::yield_now().await;
    }
    done()
}
