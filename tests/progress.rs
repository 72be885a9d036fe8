//! Progress and cancellation integration tests.

use std::sync::{Arc, Mutex};

use playblast::{
    CancellationToken, CaptureConfig, HeadlessHost, Playblast, PlayblastError, ProgressCallback, ProgressInfo,
    Time,
};

// ── CancellationToken ──────────────────────────────────────────────

#[test]
fn cancellation_token_default_not_cancelled() {
    let token = CancellationToken::new();
    assert!(!token.is_cancelled());
}

#[test]
fn cancellation_token_clone_shares_state() {
    let token = CancellationToken::new();
    let clone = token.clone();
    assert!(!clone.is_cancelled());

    token.cancel();
    assert!(clone.is_cancelled());
}

#[test]
fn cancellation_token_default_trait() {
    let token = CancellationToken::default();
    assert!(!token.is_cancelled());
}

#[test]
fn cancelled_capture_returns_error() {
    let token = CancellationToken::new();
    token.cancel();

    let config = CaptureConfig::new("out")
        .with_frame_range(0, 99)
        .with_cancellation(token);

    let mut host = HeadlessHost::new();
    match Playblast::new(config).run(&mut host) {
        Err(PlayblastError::Cancelled) => {}
        other => panic!("Expected Cancelled, got: {other:?}"),
    }
}

// ── ProgressInfo ───────────────────────────────────────────────────

struct RecordingProgress {
    infos: Mutex<Vec<ProgressInfo>>,
}

impl RecordingProgress {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            infos: Mutex::new(Vec::new()),
        })
    }
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.infos.lock().unwrap().push(info.clone());
    }
}

fn run_with(recorder: &Arc<RecordingProgress>, start: i32, end: i32, batch_size: u64) {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let config = CaptureConfig::new(directory.path().join("progress").to_string_lossy())
        .with_frame_range(start, end)
        .with_progress(recorder.clone())
        .with_batch_size(batch_size);

    let mut host = HeadlessHost::new().with_viewport_size(4, 4);
    Playblast::new(config).run(&mut host).expect("Failed to capture");
}

#[test]
fn progress_reports_every_frame_with_its_time() {
    let recorder = RecordingProgress::new();
    run_with(&recorder, 1, 4, 1);

    let infos = recorder.infos.lock().unwrap();
    let times: Vec<Option<Time>> = infos.iter().map(|info| info.current_time).collect();
    assert_eq!(
        times,
        vec![
            Some(Time::new(1.0)),
            Some(Time::new(2.0)),
            Some(Time::new(3.0)),
            Some(Time::new(4.0)),
            None,
        ]
    );
    for info in infos.iter() {
        assert_eq!(info.total, Some(4));
    }
}

#[test]
fn progress_respects_batch_size() {
    let recorder = RecordingProgress::new();
    run_with(&recorder, 1, 5, 2);

    let currents: Vec<u64> = recorder
        .infos
        .lock()
        .unwrap()
        .iter()
        .map(|info| info.current)
        .collect();
    assert_eq!(currents, vec![2, 4, 5]);
}

#[test]
fn progress_final_report_is_complete() {
    let recorder = RecordingProgress::new();
    run_with(&recorder, 10, 12, 1);

    let infos = recorder.infos.lock().unwrap();
    let last = infos.last().expect("Expected a final report");
    assert_eq!(last.current, 3);
    assert_eq!(last.percentage, Some(100.0));
    assert_eq!(last.estimated_remaining.map(|remaining| remaining.as_nanos()), Some(0));
}

#[test]
fn progress_current_increases() {
    let recorder = RecordingProgress::new();
    run_with(&recorder, 0, 9, 1);

    let infos = recorder.infos.lock().unwrap();
    for window in infos.windows(2) {
        assert!(
            window[1].current >= window[0].current,
            "Progress current should be non-decreasing",
        );
    }
}

#[test]
fn empty_range_still_reports_once() {
    let recorder = RecordingProgress::new();
    run_with(&recorder, 5, 1, 1);

    let infos = recorder.infos.lock().unwrap();
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].current, 0);
    assert_eq!(infos[0].percentage, None);
}
