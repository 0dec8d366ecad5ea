//! Integration tests for the recording session lifecycle

mod mocks;

use bykugan_core::error::{CaptureError, RecorderError};
use bykugan_core::platform::PlatformCapability;
use bykugan_core::{RecorderOptions, RecorderState, SaveOutcome, ScreenRecorder};
use mocks::{count, settle, MockPlatform, A, D};
use std::sync::Arc;
use std::time::Duration;

fn recorder_with(platform: &Arc<MockPlatform>) -> ScreenRecorder {
    ScreenRecorder::new(
        PlatformCapability::Available(platform.clone()),
        RecorderOptions::default(),
    )
    .expect("default options are valid")
}

#[tokio::test]
async fn test_unsupported_platform_has_no_side_effects() {
    let capability = PlatformCapability::unavailable("no display server");
    assert!(!ScreenRecorder::is_supported(&capability));

    let recorder = ScreenRecorder::new(capability, RecorderOptions::default()).unwrap();
    let err = recorder.start().await.err().expect("start must fail");
    assert!(matches!(err, RecorderError::UnsupportedPlatform(ref r) if r == "no display server"));

    assert_eq!(recorder.state(), RecorderState::Idle);
    assert!(recorder.get_blob().is_none());
    assert!(recorder.stop().await.is_none());
    assert_eq!(recorder.save(None).unwrap(), SaveOutcome::NoData);
}

#[test]
fn test_is_supported_without_instance() {
    let platform = Arc::new(MockPlatform::new());
    assert!(ScreenRecorder::is_supported(&PlatformCapability::Available(
        platform
    )));
}

#[tokio::test]
async fn test_fragments_buffered_in_order() {
    let platform = Arc::new(MockPlatform::new());
    let recorder = recorder_with(&platform);

    recorder.start().await.unwrap();
    assert_eq!(recorder.state(), RecorderState::Recording);

    platform.emit(b"one-");
    platform.emit(b"");
    platform.emit(b"two-");
    platform.emit(b"three");
    platform.emit(b"");

    let blob = recorder.stop().await.expect("data was recorded");
    assert_eq!(blob.as_bytes(), b"one-two-three");
    assert_eq!(recorder.fragment_count(), 3);
    assert_eq!(recorder.state(), RecorderState::Finalized);
}

#[tokio::test]
async fn test_start_returns_live_stream_and_uses_time_slice() {
    let platform = Arc::new(MockPlatform::new());
    let recorder = ScreenRecorder::new(
        PlatformCapability::Available(platform.clone()),
        RecorderOptions {
            time_slice: Some(250),
            ..Default::default()
        },
    )
    .unwrap();

    let stream = recorder.start().await.unwrap();
    assert!(stream.is_active());
    assert_eq!(stream.video_tracks().len(), 1);
    assert_eq!(
        *platform.last_time_slice.lock(),
        Some(Duration::from_millis(250))
    );
    assert_eq!(recorder.mime_type().as_deref(), Some(A));

    recorder.stop().await;
    assert!(!stream.is_active());
}

#[tokio::test]
async fn test_stop_before_data_yields_no_blob() {
    let platform = Arc::new(MockPlatform::new());
    let recorder = recorder_with(&platform);

    recorder.start().await.unwrap();
    assert!(recorder.stop().await.is_none());
    assert_eq!(recorder.state(), RecorderState::Finalized);
    assert!(recorder.get_blob().is_none());
}

#[tokio::test]
async fn test_stop_releases_every_track() {
    let platform = Arc::new(MockPlatform::new());
    let recorder = ScreenRecorder::new(
        PlatformCapability::Available(platform.clone()),
        RecorderOptions::from_json(r#"{"constraints": {"video": true, "audio": true}}"#).unwrap(),
    )
    .unwrap();

    recorder.start().await.unwrap();
    let stream = platform.last_stream().unwrap();
    assert_eq!(stream.tracks.len(), 2);

    recorder.stop().await;
    assert!(stream.all_stopped());
}

#[tokio::test]
async fn test_second_stop_returns_same_blob_without_stopping_again() {
    let platform = Arc::new(MockPlatform::new());
    let recorder = recorder_with(&platform);

    recorder.start().await.unwrap();
    platform.emit(b"frame");

    let first = recorder.stop().await;
    let second = recorder.stop().await;

    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(count(&platform.calls.encoder_stops), 1);
}

#[tokio::test]
async fn test_concurrent_stops_share_the_result() {
    let platform = Arc::new(MockPlatform::new());
    platform.manual_stop();
    let recorder = recorder_with(&platform);

    recorder.start().await.unwrap();
    platform.emit(b"abc");

    let finisher = async {
        assert!(settle(|| recorder.state() == RecorderState::Stopping).await);
        platform.finish_encoder();
    };
    let (a, b, ()) = tokio::join!(recorder.stop(), recorder.stop(), finisher);

    assert_eq!(a.as_ref().map(|b| b.as_bytes().to_vec()), Some(b"abc".to_vec()));
    assert_eq!(a, b);
    assert_eq!(count(&platform.calls.encoder_stops), 1);
}

#[tokio::test]
async fn test_blob_not_readable_until_encoder_stopped() {
    let platform = Arc::new(MockPlatform::new());
    platform.manual_stop();
    let recorder = recorder_with(&platform);

    recorder.start().await.unwrap();
    platform.emit(b"abc");

    let stop = recorder.stop();
    tokio::pin!(stop);
    // Not finished: the encoder has not reported stopped yet
    assert!(
        tokio::time::timeout(Duration::from_millis(20), &mut stop)
            .await
            .is_err()
    );
    assert_eq!(recorder.state(), RecorderState::Stopping);
    assert!(recorder.get_blob().is_none());

    platform.finish_encoder();
    let blob = stop.await.unwrap();
    assert_eq!(blob.as_bytes(), b"abc");
}

#[tokio::test]
async fn test_track_ended_finalizes_like_stop() {
    let platform = Arc::new(MockPlatform::new());
    let recorder = recorder_with(&platform);

    recorder.start().await.unwrap();
    platform.emit(b"shared ");
    platform.emit(b"screen");
    platform.end_video_track();

    assert!(settle(|| recorder.state() == RecorderState::Finalized).await);
    assert_eq!(count(&platform.calls.encoder_stops), 1);
    assert!(platform.last_stream().unwrap().all_stopped());
    assert_eq!(recorder.get_blob().unwrap().as_bytes(), b"shared screen");

    // stop() after the user ended sharing returns the same blob immediately
    let blob = recorder.stop().await.unwrap();
    assert_eq!(blob.as_bytes(), b"shared screen");
    assert_eq!(count(&platform.calls.encoder_stops), 1);
}

#[tokio::test]
async fn test_capture_denied_leaves_session_idle() {
    let platform = Arc::new(MockPlatform::new());
    platform.deny_capture(CaptureError::PermissionDenied);
    let recorder = recorder_with(&platform);

    let err = recorder.start().await.err().unwrap();
    assert!(matches!(
        err,
        RecorderError::CaptureAcquisitionFailed(CaptureError::PermissionDenied)
    ));
    assert!(err.is_user_recoverable());
    assert_eq!(recorder.state(), RecorderState::Idle);
    assert_eq!(count(&platform.calls.encoders_created), 0);

    // The caller may retry
    platform.allow_capture();
    recorder.start().await.unwrap();
    assert!(recorder.is_recording());
    recorder.stop().await;
}

#[tokio::test]
async fn test_no_source_selected() {
    let platform = Arc::new(MockPlatform::new());
    platform.deny_capture(CaptureError::NoSourceSelected);
    let recorder = recorder_with(&platform);

    let err = recorder.start().await.err().unwrap();
    assert!(matches!(
        err,
        RecorderError::CaptureAcquisitionFailed(CaptureError::NoSourceSelected)
    ));
    assert_eq!(recorder.state(), RecorderState::Idle);
}

#[tokio::test]
async fn test_encoder_failure_releases_capture() {
    let platform = Arc::new(MockPlatform::new());
    platform.fail_encoder();
    let recorder = recorder_with(&platform);

    let err = recorder.start().await.err().unwrap();
    assert!(matches!(err.root(), RecorderError::Encoder(_)));
    assert_eq!(recorder.state(), RecorderState::Idle);
    assert!(platform.last_stream().unwrap().all_stopped());
}

#[tokio::test]
async fn test_start_while_recording_is_rejected() {
    let platform = Arc::new(MockPlatform::new());
    let recorder = recorder_with(&platform);

    recorder.start().await.unwrap();
    let err = recorder.start().await.err().unwrap();
    assert!(matches!(err, RecorderError::AlreadyRecording));
    assert_eq!(count(&platform.calls.capture_requests), 1);
    assert!(recorder.is_recording());

    recorder.stop().await;
}

#[tokio::test]
async fn test_restart_after_finalize_begins_fresh_session() {
    let platform = Arc::new(MockPlatform::new());
    let recorder = recorder_with(&platform);

    recorder.start().await.unwrap();
    let first_handle = recorder.handle();
    platform.emit(b"first");
    assert!(recorder.stop().await.is_some());

    recorder.start().await.unwrap();
    assert_ne!(recorder.handle(), first_handle);
    assert!(recorder.get_blob().is_none());
    assert_eq!(recorder.fragment_count(), 0);

    platform.emit(b"second");
    let blob = recorder.stop().await.unwrap();
    assert_eq!(blob.as_bytes(), b"second");
}

#[test]
fn test_abandoned_start_returns_to_idle() {
    let platform = Arc::new(MockPlatform::new());
    platform.hold_capture();
    let recorder = recorder_with(&platform);

    {
        let mut start = tokio_test::task::spawn(recorder.start());
        tokio_test::assert_pending!(start.poll());
        assert_eq!(recorder.state(), RecorderState::Requesting);
    }

    assert_eq!(recorder.state(), RecorderState::Idle);
    assert_eq!(count(&platform.calls.encoders_created), 0);
}

#[tokio::test]
async fn test_unknown_encoding_uses_generic_blob_type() {
    let platform = Arc::new(MockPlatform::supporting(&[]));
    let recorder = recorder_with(&platform);

    recorder.start().await.unwrap();
    let options = platform.last_encoder_options.lock().clone().unwrap();
    assert_eq!(options.mime_type, None);

    platform.emit(b"data");
    let blob = recorder.stop().await.unwrap();
    assert_eq!(blob.mime_type(), "video/webm");
}

#[tokio::test]
async fn test_blob_tagged_with_negotiated_type() {
    let platform = Arc::new(MockPlatform::supporting(&[D]));
    let recorder = recorder_with(&platform);

    recorder.start().await.unwrap();
    platform.emit(b"mp4 data");
    let blob = recorder.stop().await.unwrap();
    assert_eq!(blob.mime_type(), D);
}

#[tokio::test]
async fn test_save_without_data_triggers_nothing() {
    let platform = Arc::new(MockPlatform::new());
    let recorder = recorder_with(&platform);

    assert_eq!(recorder.save(None).unwrap(), SaveOutcome::NoData);

    recorder.start().await.unwrap();
    recorder.stop().await;
    assert_eq!(recorder.save(Some("empty.webm")).unwrap(), SaveOutcome::NoData);

    assert_eq!(count(&platform.calls.urls_created), 0);
    assert_eq!(count(&platform.calls.downloads_triggered), 0);
    assert_eq!(count(&platform.calls.urls_revoked), 0);
}

#[tokio::test]
async fn test_save_triggers_one_download_and_one_release() {
    let platform = Arc::new(MockPlatform::new());
    let recorder = recorder_with(&platform);

    recorder.start().await.unwrap();
    platform.emit(b"video bytes");
    recorder.stop().await;

    let outcome = recorder.save(None).unwrap();
    assert_eq!(
        outcome,
        SaveOutcome::Saved {
            filename: "recording.webm".to_string(),
            size: 11,
        }
    );
    assert_eq!(count(&platform.calls.urls_created), 1);
    assert_eq!(count(&platform.calls.downloads_triggered), 1);
    assert_eq!(count(&platform.calls.urls_revoked), 1);

    let downloads = platform.downloads.lock();
    assert_eq!(downloads.len(), 1);
    assert_eq!(downloads[0].0, "recording.webm");
    assert_eq!(downloads[0].1, b"video bytes");
}

#[tokio::test]
async fn test_failed_download_still_releases_url() {
    let platform = Arc::new(MockPlatform::new());
    platform.fail_download();
    let recorder = recorder_with(&platform);

    recorder.start().await.unwrap();
    platform.emit(b"x");
    recorder.stop().await;

    let err = recorder.save(Some("clip.webm")).unwrap_err();
    assert!(matches!(err, RecorderError::Download(_)));
    assert_eq!(count(&platform.calls.downloads_triggered), 1);
    assert_eq!(count(&platform.calls.urls_revoked), 1);
}

#[tokio::test]
async fn test_dropping_recorder_releases_capture() {
    let platform = Arc::new(MockPlatform::new());
    let recorder = recorder_with(&platform);

    recorder.start().await.unwrap();
    drop(recorder);

    assert_eq!(count(&platform.calls.encoder_stops), 1);
    assert!(platform.last_stream().unwrap().all_stopped());
}
