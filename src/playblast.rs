//! Capture scheduling.
//!
//! [`Playblast`] drives a host's render loop across a frame range. It arms a
//! [`CaptureSession`] (notifications registered, overrides applied), then for
//! every frame of `[start, end]` moves the host to that time and forces a
//! synchronous redraw of the active viewport. The redraw is what fires the
//! [`FrameExporter`]; frame N is fully written before frame N + 1 is drawn.
//! When the loop ends, however it ends, the session is dropped and the host
//! is back in the state it was found in.

use std::cell::RefCell;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use crate::arguments::CommandArguments;
use crate::configuration::{CaptureConfig, FailurePolicy};
use crate::error::PlayblastError;
use crate::export::{CaptureTally, FrameExporter, FrameOutcome, FrameRecord};
use crate::host::{NotificationKey, PassSemantic, RefreshMode, RenderHost, RenderNotification};
use crate::output::{CodecOutputs, ImageOutputFactory};
use crate::progress::ProgressTracker;
use crate::session::{CaptureSession, SessionOverrides};
use crate::time::Time;
use crate::trace::PassTracer;

/// Name the frame exporter is registered under.
pub const POST_RENDER_NOTIFICATION: &str = "playblastCaptureNotification";

/// Key of the frame exporter's registration.
pub fn post_render_key() -> NotificationKey {
    NotificationKey::new(POST_RENDER_NOTIFICATION, PassSemantic::EndRender)
}

/// Parse command tokens and run a capture on `host`.
///
/// This is the whole command: argument errors are reported before the host
/// is looked at, and the host is looked at before anything is changed.
///
/// # Errors
///
/// Any argument error from [`CommandArguments::parse`] or
/// [`CommandArguments::resolve`], and any error from [`Playblast::run`].
///
/// # Example
///
/// ```
/// use playblast::{HeadlessHost, PlayblastError, execute};
///
/// let mut host = HeadlessHost::new();
/// let error = execute(&mut host, ["-sf", "1", "-ef", "3"]).unwrap_err();
/// assert!(matches!(error, PlayblastError::MissingRequiredArgument("-filename")));
/// assert!(host.events().is_empty());
/// ```
pub fn execute<H, I, S>(host: &mut H, tokens: I) -> Result<CaptureReport, PlayblastError>
where
    H: RenderHost + ?Sized,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let config = CommandArguments::parse(tokens)?.resolve()?;
    Playblast::new(config).run(host)
}

/// A configured capture, ready to run against a host.
#[must_use]
pub struct Playblast {
    config: Arc<CaptureConfig>,
    outputs: Arc<dyn ImageOutputFactory>,
}

impl Playblast {
    /// Prepare a capture. The external writer backend uses
    /// [`CodecOutputs`] unless told otherwise.
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config: Arc::new(config),
            outputs: Arc::new(CodecOutputs),
        }
    }

    /// Use a different image writer factory for the external backend.
    pub fn with_image_outputs(mut self, outputs: Arc<dyn ImageOutputFactory>) -> Self {
        self.outputs = outputs;
        self
    }

    /// The capture configuration.
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Capture every frame of the configured range.
    ///
    /// Returns a report with one record per frame that was iterated. With
    /// [`FailurePolicy::Continue`] per-frame failures only show up in the
    /// report and the log.
    ///
    /// # Errors
    ///
    /// - [`PlayblastError::RendererUnavailable`] or
    ///   [`PlayblastError::NoActiveViewport`] before anything is changed.
    /// - [`PlayblastError::CaptureInProgress`] if another capture is armed
    ///   on the host.
    /// - [`PlayblastError::Cancelled`] if the cancellation token fired.
    /// - With [`FailurePolicy::Abort`], the error of the first frame that
    ///   produced no file.
    ///
    /// Render state is restored before any of these is returned.
    pub fn run<H: RenderHost + ?Sized>(&self, host: &mut H) -> Result<CaptureReport, PlayblastError> {
        if !host.renderer_available() {
            return Err(PlayblastError::RendererUnavailable);
        }
        let viewport = host.active_viewport().ok_or(PlayblastError::NoActiveViewport)?;

        let config = Arc::clone(&self.config);
        let tally = Rc::new(RefCell::new(CaptureTally::default()));

        let mut notifications = Vec::new();
        if config.trace_passes {
            notifications.extend(PassTracer::registrations(POST_RENDER_NOTIFICATION));
        }
        let exporter: Box<dyn RenderNotification> = Box::new(FrameExporter::new(
            Arc::clone(&config),
            Arc::clone(&self.outputs),
            Rc::clone(&tally),
        ));
        notifications.push((post_render_key(), exporter));

        let overrides = SessionOverrides {
            size: config.size_override(),
            disable_color_management: config.disable_color_management,
        };

        log::debug!(
            "Capturing {} frame(s) [{}, {}] of viewport {} to {}",
            config.frame_count(),
            config.start_frame,
            config.end_frame,
            viewport.0,
            config.output_path_stem,
        );

        let mut session = CaptureSession::arm(host, notifications, overrides)?;
        session.begin_looping();

        let mut tracker = ProgressTracker::new(
            Arc::clone(&config.progress),
            Some(config.frame_count()),
            config.batch_size,
        );
        let mut stopped = None;

        for time in config.frames() {
            if config.is_cancelled() {
                log::warn!("Capture cancelled before frame {time}");
                stopped = Some(PlayblastError::Cancelled);
                break;
            }

            let recorded = tally.borrow().records.len();
            let host = session.host();
            host.set_current_time(time);
            let refresh = host.refresh(viewport, RefreshMode::CAPTURE);

            let failure = match refresh {
                Ok(()) => None,
                Err(error) => {
                    log::error!("Failed to redraw frame {time}: {error}");
                    Some(render_failure(time, error))
                }
            };

            let outcome = {
                let mut tally = tally.borrow_mut();
                if tally.records.len() == recorded {
                    if failure.is_none() {
                        log::warn!("Frame {time} was redrawn but never reached the post-render notification");
                    }
                    tally.record(time, FrameOutcome::NotRendered);
                }
                tally
                    .records
                    .last()
                    .map(|record| record.outcome.clone())
                    .unwrap_or(FrameOutcome::NotRendered)
            };

            tracker.advance(time);

            if config.failure_policy == FailurePolicy::Abort {
                let error = failure.or_else(|| outcome.into_error(time));
                if let Some(error) = error {
                    log::error!("Aborting capture at frame {time}");
                    stopped = Some(error);
                    break;
                }
            }
        }

        tracker.finish();
        drop(session);

        let report = CaptureReport {
            requested: config.frame_count(),
            frames: std::mem::take(&mut tally.borrow_mut().records),
        };
        log::info!(
            "Captured {}/{} frames to {} ({} failed, {} skipped)",
            report.written(),
            report.requested,
            config.output_path_stem,
            report.failed(),
            report.skipped(),
        );

        match stopped {
            Some(error) => Err(error),
            None => Ok(report),
        }
    }
}

fn render_failure(time: Time, error: PlayblastError) -> PlayblastError {
    match error {
        PlayblastError::RenderFailure { .. } => error,
        other => PlayblastError::RenderFailure {
            time,
            reason: other.to_string(),
        },
    }
}

/// What a capture did, frame by frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureReport {
    /// Number of frames in the configured range.
    pub requested: u64,
    /// One record per frame iterated, in frame order.
    pub frames: Vec<FrameRecord>,
}

impl CaptureReport {
    /// Frames written to disk.
    pub fn written(&self) -> usize {
        self.count(|outcome| matches!(outcome, FrameOutcome::Written(_)))
    }

    /// Frames whose write failed or that were never rendered.
    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, FrameOutcome::Failed { .. } | FrameOutcome::NotRendered))
    }

    /// Frames skipped because of an unsupported raster format.
    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, FrameOutcome::Skipped { .. }))
    }

    /// Paths of the written frames, in frame order.
    pub fn written_paths(&self) -> Vec<&Path> {
        self.frames
            .iter()
            .filter_map(|record| match &record.outcome {
                FrameOutcome::Written(path) => Some(path.as_path()),
                _ => None,
            })
            .collect()
    }

    /// Whether every requested frame was written.
    pub fn is_complete(&self) -> bool {
        self.written() as u64 == self.requested
    }

    fn count(&self, predicate: impl Fn(&FrameOutcome) -> bool) -> usize {
        self.frames.iter().filter(|record| predicate(&record.outcome)).count()
    }
}

impl Display for CaptureReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "Captured {}/{} frames ({} failed, {} skipped)",
            self.written(),
            self.requested,
            self.failed(),
            self.skipped(),
        )
    }
}
