//! # playblast
//!
//! Capture a range of animation frames straight from a host application's
//! viewport renderer and write each frame to disk.
//!
//! A capture is a small pipeline: command flags are resolved into a
//! [`CaptureConfig`], [`Playblast::run`] steps the host through the frame
//! range and forces a redraw of the active viewport for every frame, and the
//! [`FrameExporter`] registered as the renderer's post-render notification
//! writes the freshly rendered color surface as `<stem>.<frame><ext>`. The
//! extension follows the surface's raster format: floating-point surfaces
//! become `.exr`, 8-bit surfaces become `.iff`.
//!
//! ## Quick Start
//!
//! ### Run the capture command
//!
//! ```
//! use playblast::{HeadlessHost, execute};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let stem = dir.path().join("out");
//! let stem = stem.to_str().unwrap();
//!
//! let mut host = HeadlessHost::new();
//! let report = execute(&mut host, ["-f", stem, "-sf", "1", "-ef", "3"]).unwrap();
//!
//! assert_eq!(report.written(), 3);
//! assert!(dir.path().join("out.2.iff").exists());
//! ```
//!
//! ### Build a configuration directly
//!
//! ```
//! use playblast::{CaptureConfig, FailurePolicy, HeadlessHost, Playblast, RasterFormat, WriterBackend};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let config = CaptureConfig::new(dir.path().join("shot010").to_string_lossy())
//!     .with_frame_range(1001, 1004)
//!     .with_image_size(32, 16)
//!     .with_writer(WriterBackend::External)
//!     .with_failure_policy(FailurePolicy::Abort);
//!
//! let mut host = HeadlessHost::new().with_raster_format(RasterFormat::R32G32B32A32Float);
//! let report = Playblast::new(config).run(&mut host).unwrap();
//! assert!(report.is_complete());
//! ```
//!
//! ## Features
//!
//! - **Two writer backends**: the host's own texture saver, or an external
//!   [`ImageOutputFactory`] fed from raw surface memory
//! - **Closed format table**: every [`RasterFormat`] is either mapped to a
//!   container or explicitly skipped with a warning
//! - **Guaranteed restoration**: size override, on-screen presentation and
//!   color management are put back however a capture ends
//! - **Failure policy**: best-effort batch capture or abort on the first
//!   frame that was not written
//! - **Progress & cancellation**: cooperative callbacks and
//!   [`CancellationToken`] checked before every frame
//! - **Capture report**: one [`FrameRecord`] per frame plus a summary line
//! - **Headless host**: an offscreen [`RenderHost`] for tools and tests

pub mod arguments;
pub mod configuration;
pub mod error;
pub mod export;
pub mod format;
pub mod headless;
pub mod host;
pub mod output;
pub mod playblast;
pub mod progress;
pub mod resource;
pub mod session;
pub mod time;
pub mod trace;

pub use arguments::{ArgumentKind, CommandArguments, FlagSpec, SYNTAX};
pub use configuration::{CaptureConfig, FailurePolicy, WriterBackend};
pub use error::PlayblastError;
pub use export::{FrameExporter, FrameOutcome, FrameRecord, frame_path};
pub use format::{ComponentType, ContainerFormat, FormatMapping, RasterFormat};
pub use headless::{FileTextureSaver, HeadlessHost, HostEvent, TextureSaver};
pub use host::{
    ColorSurface, FrameCaptureContext, NotificationKey, PassContext, PassSemantic, RawPixelData,
    RefreshMode, RenderHost, RenderNotification, SurfaceDescription, TextureHandle, ViewportId,
};
pub use output::{
    CodecOutputs, ExrOutput, IffOutput, ImageOutput, ImageOutputFactory, ImageSpec, RasterOutput, pack_rows,
    write_image_file,
};
pub use playblast::{CaptureReport, POST_RENDER_NOTIFICATION, Playblast, execute, post_render_key};
pub use progress::{CancellationToken, ProgressCallback, ProgressInfo};
pub use resource::{RawPixelLease, TransientTexture};
pub use session::{CapturePhase, CaptureSession, SessionOverrides};
pub use time::{FrameSteps, Time};
pub use trace::PassTracer;
