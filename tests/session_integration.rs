//! Recording session lifecycle against the synthetic signal backend.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use vocal_range::audio::SignalBackend;
use vocal_range::config::AppConfig;
use vocal_range::error::AudioError;
use vocal_range::session::RecordingSession;
use vocal_range::tracker::{RangeEvent, RangeSnapshot};

fn session(backend: SignalBackend) -> RecordingSession {
    let mut config = AppConfig::default();
    config.audio.tick_interval_ms = 5;
    RecordingSession::new(Arc::new(backend), config)
}

/// Poll until `done` holds for the snapshot or the timeout elapses
fn wait_for<F>(session: &RecordingSession, timeout: Duration, done: F) -> RangeSnapshot
where
    F: Fn(&RangeSnapshot) -> bool,
{
    let started = Instant::now();
    loop {
        let snapshot = session.snapshot().unwrap();
        if done(&snapshot) || started.elapsed() > timeout {
            return snapshot;
        }
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn test_tone_is_measured_as_a4() {
    let session = session(SignalBackend::tone(440.0, 48_000));
    session.start().unwrap();
    assert!(session.is_recording());

    let snapshot = wait_for(&session, Duration::from_secs(3), |s| s.highest_hz.is_some());
    session.stop().unwrap();

    let highest = snapshot.highest_hz.expect("tone should be detected");
    let lowest = snapshot.lowest_hz.expect("first sample sets both bounds");
    assert!((highest - 440.0).abs() < 2.0, "highest {}", highest);
    assert!((lowest - 440.0).abs() < 2.0, "lowest {}", lowest);
    assert_eq!(snapshot.highest_note, "A4");
    assert_eq!(snapshot.lowest_note, "A4");
    assert_eq!(snapshot.note_numbers(), (69, 69));
}

#[test]
fn test_extremes_survive_stop_and_freeze() {
    let session = session(SignalBackend::tone(220.0, 48_000));
    session.start().unwrap();
    wait_for(&session, Duration::from_secs(3), |s| s.highest_hz.is_some());
    session.stop().unwrap();
    assert!(!session.is_recording());

    let after_stop = session.snapshot().unwrap();
    assert_eq!(after_stop.highest_note, "A3");
    assert!(!after_stop.recording);

    thread::sleep(Duration::from_millis(100));
    assert_eq!(session.snapshot().unwrap(), after_stop);
}

#[test]
fn test_reset_while_recording_starts_over() {
    let session = session(SignalBackend::tone(330.0, 48_000));
    session.start().unwrap();
    wait_for(&session, Duration::from_secs(3), |s| s.highest_hz.is_some());

    session.reset().unwrap();
    let measured_again = wait_for(&session, Duration::from_secs(3), |s| s.highest_hz.is_some());
    session.stop().unwrap();
    assert_eq!(measured_again.highest_note, "E4");

    session.reset().unwrap();
    let cleared = session.snapshot().unwrap();
    assert_eq!(cleared.highest_note, "--");
    assert_eq!(cleared.lowest_note, "--");
    assert_eq!(cleared.highest_display, "... Hz");
    assert_eq!(cleared.lowest_display, "... Hz");
}

#[test]
fn test_denied_microphone_leaves_session_idle() {
    let session = session(SignalBackend::failing(AudioError::PermissionDenied));
    let err = session.start().unwrap_err();
    assert!(err.is_access_failure());
    assert!(!session.is_recording());
    assert!(session.snapshot().unwrap().highest_hz.is_none());

    // A later stop is still harmless
    session.stop().unwrap();
}

#[test]
fn test_start_twice_then_restart() {
    let session = session(SignalBackend::tone(440.0, 48_000));
    session.start().unwrap();
    assert_eq!(session.start().unwrap_err(), AudioError::AlreadyRecording);
    session.stop().unwrap();
    session.stop().unwrap();

    session.start().unwrap();
    assert!(session.is_recording());
    session.stop().unwrap();
}

#[test]
fn test_out_of_band_tone_is_ignored() {
    let session = session(SignalBackend::tone(50.0, 48_000));
    session.start().unwrap();
    thread::sleep(Duration::from_millis(300));
    session.stop().unwrap();
    assert!(session.snapshot().unwrap().highest_hz.is_none());
}

#[test]
fn test_subscribers_see_range_events() {
    let session = session(SignalBackend::tone(220.0, 48_000));
    let mut events = session.subscribe();
    session.start().unwrap();

    let started = Instant::now();
    let mut received = Vec::new();
    while received.len() < 2 && started.elapsed() < Duration::from_secs(3) {
        match events.try_recv() {
            Ok(event) => received.push(event),
            Err(_) => thread::sleep(Duration::from_millis(10)),
        }
    }
    session.stop().unwrap();

    assert!(received
        .iter()
        .any(|e| matches!(e, RangeEvent::Highest { note, .. } if note == "A3")));
    assert!(received
        .iter()
        .any(|e| matches!(e, RangeEvent::Lowest { note, .. } if note == "A3")));
}
