//! Frame export.
//!
//! [`FrameExporter`] is the post-render notification of a capture. For
//! every frame the host renders it resolves the raster format of the color
//! surface to a container and extension, derives the output path
//! `<stem>.<frame><extension>`, and writes the frame through the selected
//! backend:
//!
//! * **native**: copy the surface to a transient texture and let the host
//!   save it; the texture is released immediately afterwards.
//! * **external**: pin the surface's raw pixel memory, describe it with an
//!   [`ImageSpec`] and hand it to an [`ImageOutputFactory`]; the memory is
//!   released on every exit path.
//!
//! Exactly one status line is logged per frame, and the outcome is recorded
//! for the capture report.

use std::cell::RefCell;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use crate::configuration::{CaptureConfig, WriterBackend};
use crate::error::PlayblastError;
use crate::format::{ContainerFormat, FormatMapping, RasterFormat};
use crate::host::{ColorSurface, FrameCaptureContext, RenderNotification};
use crate::output::{ImageOutputFactory, ImageSpec, write_image_file};
use crate::resource::{RawPixelLease, TransientTexture};
use crate::time::Time;

/// Output path of one frame: `<stem>.<time><extension>`.
///
/// ```
/// use std::path::PathBuf;
///
/// use playblast::{ContainerFormat, Time, frame_path};
///
/// assert_eq!(
///     frame_path("shot010", Time::new(1001.0), ContainerFormat::Exr),
///     PathBuf::from("shot010.1001.exr"),
/// );
/// ```
pub fn frame_path(stem: &str, time: Time, container: ContainerFormat) -> PathBuf {
    PathBuf::from(format!("{stem}.{time}{}", container.extension()))
}

/// What happened to one frame of a capture.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// The frame was written to the path.
    Written(PathBuf),
    /// Writing the frame failed.
    Failed {
        /// The resolved output path.
        path: PathBuf,
        /// Why the write failed.
        reason: String,
    },
    /// The surface used a raster format with no output mapping.
    Skipped {
        /// The unsupported format.
        format: RasterFormat,
    },
    /// The viewport redraw did not reach the post-render notification.
    NotRendered,
}

impl FrameOutcome {
    /// Whether a file was written.
    pub fn is_written(&self) -> bool {
        matches!(self, FrameOutcome::Written(_))
    }

    pub(crate) fn into_error(self, time: Time) -> Option<PlayblastError> {
        match self {
            FrameOutcome::Written(_) => None,
            FrameOutcome::Failed { path, reason } => Some(PlayblastError::WriteFailure { path, reason }),
            FrameOutcome::Skipped { format } => Some(PlayblastError::UnsupportedPixelFormat { format, time }),
            FrameOutcome::NotRendered => Some(PlayblastError::FrameNotRendered(time)),
        }
    }
}

impl Display for FrameOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FrameOutcome::Written(path) => write!(f, "written to {}", path.display()),
            FrameOutcome::Failed { path, reason } => {
                write!(f, "failed to write {}: {reason}", path.display())
            }
            FrameOutcome::Skipped { format } => write!(f, "skipped ({format} is not supported)"),
            FrameOutcome::NotRendered => f.write_str("not rendered"),
        }
    }
}

/// One frame of a capture report.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    /// Frame time.
    pub time: Time,
    /// What happened.
    pub outcome: FrameOutcome,
}

/// Per-frame outcomes collected while the exporter is registered.
#[derive(Debug, Default)]
pub(crate) struct CaptureTally {
    pub(crate) records: Vec<FrameRecord>,
}

impl CaptureTally {
    pub(crate) fn record(&mut self, time: Time, outcome: FrameOutcome) {
        self.records.push(FrameRecord { time, outcome });
    }
}

/// The post-render notification that writes each frame.
pub struct FrameExporter {
    config: Arc<CaptureConfig>,
    outputs: Arc<dyn ImageOutputFactory>,
    tally: Rc<RefCell<CaptureTally>>,
}

impl FrameExporter {
    pub(crate) fn new(
        config: Arc<CaptureConfig>,
        outputs: Arc<dyn ImageOutputFactory>,
        tally: Rc<RefCell<CaptureTally>>,
    ) -> Self {
        Self {
            config,
            outputs,
            tally,
        }
    }

    /// Write the frame in `context` and return the path it was written to.
    ///
    /// # Errors
    ///
    /// - [`PlayblastError::NoColorSurface`] if the renderer exposes no
    ///   color target.
    /// - [`PlayblastError::UnsupportedPixelFormat`] if the surface's
    ///   raster format has no mapping; nothing is written.
    /// - [`PlayblastError::WriteFailure`] if the backend failed.
    pub fn export(&self, context: &mut FrameCaptureContext<'_>) -> Result<PathBuf, PlayblastError> {
        let time = context.current_time();
        let surface = context
            .color_surface()
            .ok_or(PlayblastError::NoColorSurface(time))?;

        let description = surface.description();
        let mapping = description
            .raster_format
            .mapping()
            .ok_or(PlayblastError::UnsupportedPixelFormat {
                format: description.raster_format,
                time,
            })?;
        let path = frame_path(&self.config.output_path_stem, time, mapping.container);

        let written = match self.config.writer {
            WriterBackend::Native => write_native(surface, &path),
            WriterBackend::External => {
                let spec = ImageSpec::for_mapping(description.width, description.height, &mapping);
                write_external(surface, &path, &spec, self.outputs.as_ref())
            }
        };

        written.map_err(|error| PlayblastError::WriteFailure {
            path: path.clone(),
            reason: error.to_string(),
        })?;
        Ok(path)
    }

    /// The mapping the exporter would use for a format.
    pub fn mapping_for(format: RasterFormat) -> Option<FormatMapping> {
        format.mapping()
    }
}

impl RenderNotification for FrameExporter {
    fn on_frame_rendered(&mut self, context: &mut FrameCaptureContext<'_>) -> Result<(), PlayblastError> {
        let time = context.current_time();
        let result = self.export(context);

        let outcome = match &result {
            Ok(path) => {
                log::info!("Captured color render target to {}.", path.display());
                FrameOutcome::Written(path.clone())
            }
            Err(PlayblastError::UnsupportedPixelFormat { format, .. }) => {
                log::warn!("Skipping frame {time}: raster format {format} cannot be captured.");
                FrameOutcome::Skipped { format: *format }
            }
            Err(PlayblastError::WriteFailure { path, reason }) => {
                log::error!("Failed to capture color render target to {}: {reason}", path.display());
                FrameOutcome::Failed {
                    path: path.clone(),
                    reason: reason.clone(),
                }
            }
            Err(error) => {
                let path = PathBuf::from(format!("{}.{time}", self.config.output_path_stem));
                log::error!("Failed to capture color render target to {}: {error}", path.display());
                FrameOutcome::Failed {
                    path,
                    reason: error.to_string(),
                }
            }
        };

        self.tally.borrow_mut().record(time, outcome);
        result.map(|_| ())
    }
}

fn write_native<S: ColorSurface + ?Sized>(surface: &mut S, path: &Path) -> Result<(), PlayblastError> {
    let mut texture = TransientTexture::copy_from(surface)?;
    texture.save(path)
}

fn write_external<S: ColorSurface + ?Sized>(
    surface: &mut S,
    path: &Path,
    spec: &ImageSpec,
    outputs: &dyn ImageOutputFactory,
) -> Result<(), PlayblastError> {
    let lease = RawPixelLease::acquire(surface)?;
    log::debug!(
        "Raw pixels for {}: {} bytes, row pitch {}, slice pitch {}",
        path.display(),
        lease.data().bytes.len(),
        lease.data().row_pitch,
        lease.data().slice_pitch,
    );
    write_image_file(outputs, path, spec, lease.data())
}
