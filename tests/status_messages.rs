//! Per-frame status line tests.
//!
//! A capturing logger records every `log` record emitted on the test's own
//! thread, so tests running in parallel do not see each other's lines.

use std::cell::RefCell;
use std::path::Path;
use std::sync::Once;

use log::{Level, LevelFilter, Log, Metadata, Record};
use playblast::{CaptureConfig, HeadlessHost, Playblast, PlayblastError, RasterFormat, SurfaceDescription};

thread_local! {
    static LINES: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
}

struct CapturingLogger;

impl Log for CapturingLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        LINES.with(|lines| {
            lines
                .borrow_mut()
                .push((record.level(), record.args().to_string()));
        });
    }

    fn flush(&self) {}
}

static LOGGER: CapturingLogger = CapturingLogger;
static INIT: Once = Once::new();

fn capture_logs() {
    INIT.call_once(|| {
        log::set_logger(&LOGGER).expect("logger already set");
        log::set_max_level(LevelFilter::Trace);
    });
    LINES.with(|lines| lines.borrow_mut().clear());
}

fn lines_at(level: Level) -> Vec<String> {
    LINES.with(|lines| {
        lines
            .borrow()
            .iter()
            .filter(|(line_level, _)| *line_level == level)
            .map(|(_, line)| line.clone())
            .collect()
    })
}

fn status_lines() -> Vec<String> {
    LINES.with(|lines| {
        lines
            .borrow()
            .iter()
            .filter(|(level, line)| {
                (*level == Level::Info && line.starts_with("Captured color render target"))
                    || (*level == Level::Error && line.starts_with("Failed to capture"))
                    || (*level == Level::Warn && line.starts_with("Skipping frame"))
            })
            .map(|(_, line)| line.clone())
            .collect()
    })
}

#[test]
fn one_success_line_per_frame() {
    capture_logs();
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let stem = directory.path().join("out").to_string_lossy().into_owned();
    let mut host = HeadlessHost::new();

    Playblast::new(CaptureConfig::new(&stem).with_frame_range(1, 3))
        .run(&mut host)
        .unwrap();

    assert_eq!(
        status_lines(),
        vec![
            format!("Captured color render target to {stem}.1.iff."),
            format!("Captured color render target to {stem}.2.iff."),
            format!("Captured color render target to {stem}.3.iff."),
        ]
    );
    assert!(
        lines_at(Level::Info).contains(&format!("Captured 3/3 frames to {stem} (0 failed, 0 skipped)")),
        "missing summary in {:?}",
        lines_at(Level::Info)
    );
}

#[test]
fn write_failure_names_the_path() {
    capture_logs();
    let saver = |_: &SurfaceDescription, _: &[u8], _: &Path| -> Result<(), PlayblastError> {
        Err(PlayblastError::IoError(std::io::Error::other("no space left")))
    };
    let mut host = HeadlessHost::new().with_texture_saver(Box::new(saver));

    Playblast::new(CaptureConfig::new("shots/out").with_frame_range(4, 4))
        .run(&mut host)
        .unwrap();

    let errors = lines_at(Level::Error);
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(errors[0].starts_with("Failed to capture color render target to shots/out.4.iff: "));
    assert!(errors[0].contains("no space left"));
    assert!(lines_at(Level::Info).contains(&"Captured 0/1 frames to shots/out (1 failed, 0 skipped)".to_string()));
}

#[test]
fn unsupported_format_is_a_warning() {
    capture_logs();
    let mut host = HeadlessHost::new().with_raster_format(RasterFormat::R32Float);

    Playblast::new(CaptureConfig::new("out").with_frame_range(1, 2))
        .run(&mut host)
        .unwrap();

    let warnings: Vec<String> = lines_at(Level::Warn)
        .into_iter()
        .filter(|line| line.starts_with("Skipping frame"))
        .collect();
    assert_eq!(warnings.len(), 2);
    assert!(warnings[0].contains("R32_FLOAT"));
    assert_eq!(status_lines().len(), 2);
    assert!(lines_at(Level::Info).contains(&"Captured 0/2 frames to out (0 failed, 2 skipped)".to_string()));
}

#[test]
fn pass_tracing_logs_at_debug() {
    capture_logs();
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let stem = directory.path().join("trace").to_string_lossy().into_owned();
    let mut host = HeadlessHost::new();

    Playblast::new(CaptureConfig::new(&stem).with_frame_range(1, 1).with_pass_tracing(true))
        .run(&mut host)
        .unwrap();

    let traces: Vec<String> = lines_at(Level::Debug)
        .into_iter()
        .filter(|line| line.contains("semantics ["))
        .collect();
    assert_eq!(traces.len(), 3, "{traces:?}");
    assert!(traces[0].starts_with("[beginRender] frame 1"));
    assert_eq!(status_lines().len(), 1);
}
