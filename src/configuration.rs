//! Capture configuration.
//!
//! [`CaptureConfig`] is a builder holding everything one capture needs: the
//! output path stem, the frame range, the optional output-size override and
//! the writer backend, plus the operational settings (failure policy,
//! progress callback, cancellation token) that thread through the frame
//! loop. Once a capture starts the configuration is shared immutably.
//!
//! # Example
//!
//! ```
//! use playblast::{CaptureConfig, FailurePolicy, WriterBackend};
//!
//! let config = CaptureConfig::new("shots/shot010")
//!     .with_frame_range(1001.0, 1100.0)
//!     .with_image_size(1920, 1080)
//!     .with_writer(WriterBackend::External)
//!     .with_failure_policy(FailurePolicy::Abort);
//!
//! assert_eq!(config.frame_count(), 100);
//! assert_eq!(config.size_override(), Some((1920, 1080)));
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};
use crate::time::{FrameSteps, Time, frame_count};

/// Which backend writes each captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriterBackend {
    /// Copy the surface to a texture and hand it to the host's own image
    /// saver, which infers the file format from the extension.
    #[default]
    Native,
    /// Read the surface's raw pixel memory and encode it with an
    /// [`ImageOutputFactory`](crate::ImageOutputFactory).
    External,
}

/// What the frame loop does when a frame produces no file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the failure, record it in the report, and move on to the next
    /// frame. This is the default.
    #[default]
    Continue,
    /// Stop at the first frame that was not written and return its error.
    Abort,
}

/// Configuration for one capture.
///
/// Only the output path stem is required; the frame range defaults to
/// `[0, 1]`, no size override is applied, and frames go through the native
/// writer.
#[derive(Clone)]
pub struct CaptureConfig {
    pub(crate) output_path_stem: String,
    pub(crate) start_frame: Time,
    pub(crate) end_frame: Time,
    pub(crate) override_width: u32,
    pub(crate) override_height: u32,
    pub(crate) writer: WriterBackend,
    pub(crate) failure_policy: FailurePolicy,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
    pub(crate) batch_size: u64,
    pub(crate) trace_passes: bool,
    pub(crate) disable_color_management: bool,
}

impl Debug for CaptureConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("CaptureConfig")
            .field("output_path_stem", &self.output_path_stem)
            .field("start_frame", &self.start_frame)
            .field("end_frame", &self.end_frame)
            .field("override_width", &self.override_width)
            .field("override_height", &self.override_height)
            .field("writer", &self.writer)
            .field("failure_policy", &self.failure_policy)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("batch_size", &self.batch_size)
            .field("trace_passes", &self.trace_passes)
            .finish()
    }
}

impl CaptureConfig {
    /// Create a configuration writing frames to `<stem>.<frame><ext>`.
    pub fn new(output_path_stem: impl Into<String>) -> Self {
        Self {
            output_path_stem: output_path_stem.into(),
            start_frame: Time::new(0.0),
            end_frame: Time::new(1.0),
            override_width: 0,
            override_height: 0,
            writer: WriterBackend::Native,
            failure_policy: FailurePolicy::Continue,
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            batch_size: 1,
            trace_passes: false,
            disable_color_management: true,
        }
    }

    /// Set the inclusive frame range.
    ///
    /// No ordering is enforced: a start after the end captures nothing.
    #[must_use]
    pub fn with_frame_range(mut self, start: impl Into<Time>, end: impl Into<Time>) -> Self {
        self.start_frame = start.into();
        self.end_frame = end.into();
        self
    }

    /// Set the start frame.
    #[must_use]
    pub fn with_start_frame(mut self, start: impl Into<Time>) -> Self {
        self.start_frame = start.into();
        self
    }

    /// Set the end frame.
    #[must_use]
    pub fn with_end_frame(mut self, end: impl Into<Time>) -> Self {
        self.end_frame = end.into();
        self
    }

    /// Request an output-size override.
    ///
    /// The override only takes effect when both dimensions are non-zero;
    /// otherwise the viewport renders at its own size.
    #[must_use]
    pub fn with_image_size(mut self, width: u32, height: u32) -> Self {
        self.override_width = width;
        self.override_height = height;
        self
    }

    /// Select the writer backend.
    #[must_use]
    pub fn with_writer(mut self, writer: WriterBackend) -> Self {
        self.writer = writer;
        self
    }

    /// Select the external writer when `enabled`, the native one otherwise.
    #[must_use]
    pub fn with_external_writer(self, enabled: bool) -> Self {
        self.with_writer(if enabled {
            WriterBackend::External
        } else {
            WriterBackend::Native
        })
    }

    /// Set the per-frame failure policy.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    ///
    /// When the token is cancelled the frame loop stops before the next
    /// redraw, restores render state, and returns
    /// [`PlayblastError::Cancelled`](crate::PlayblastError::Cancelled).
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set how often the progress callback fires.
    ///
    /// Clamped to a minimum of 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Also register begin-render and scene-pass notifications that log
    /// each pass identifier and its semantics at debug level.
    #[must_use]
    pub fn with_pass_tracing(mut self, enabled: bool) -> Self {
        self.trace_passes = enabled;
        self
    }

    /// Control whether viewport color management is switched off while
    /// capturing. Defaults to `true`.
    #[must_use]
    pub fn with_color_management_disabled(mut self, disabled: bool) -> Self {
        self.disable_color_management = disabled;
        self
    }

    /// Base path each frame number and extension is appended to.
    pub fn output_path_stem(&self) -> &str {
        &self.output_path_stem
    }

    /// First frame of the range.
    pub fn start_frame(&self) -> Time {
        self.start_frame
    }

    /// Last frame of the range (inclusive).
    pub fn end_frame(&self) -> Time {
        self.end_frame
    }

    /// The requested output size, as given.
    pub fn image_size(&self) -> (u32, u32) {
        (self.override_width, self.override_height)
    }

    /// The output-size override to apply, if both dimensions are non-zero.
    pub fn size_override(&self) -> Option<(u32, u32)> {
        (self.override_width > 0 && self.override_height > 0)
            .then_some((self.override_width, self.override_height))
    }

    /// The selected writer backend.
    pub fn writer(&self) -> WriterBackend {
        self.writer
    }

    /// The per-frame failure policy.
    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Whether pass tracing notifications are registered.
    pub fn traces_passes(&self) -> bool {
        self.trace_passes
    }

    /// Whether viewport color management is switched off while capturing.
    pub fn disables_color_management(&self) -> bool {
        self.disable_color_management
    }

    /// Number of frames the capture will redraw.
    pub fn frame_count(&self) -> u64 {
        frame_count(self.start_frame, self.end_frame)
    }

    /// The frames the capture will redraw, in order.
    pub fn frames(&self) -> FrameSteps {
        self.start_frame.frames_through(self.end_frame)
    }

    /// Returns `true` if cancellation has been requested.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}
