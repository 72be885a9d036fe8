//! Host collaborator interfaces.
//!
//! A capture never renders anything itself. It asks a [`RenderHost`] to
//! move to a time and redraw a viewport, and the host calls back into every
//! registered [`RenderNotification`] while the frame is still alive. The
//! callback sees the frame through a [`FrameCaptureContext`], whose
//! [`ColorSurface`] is owned by the host and only valid for the duration of
//! the call.
//!
//! Output size override, on-screen presentation and viewport color
//! management are renderer-global state. A capture borrows them and puts
//! them back when it finishes, so only one capture may be in flight per
//! host at a time.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;

use crate::error::PlayblastError;
use crate::format::RasterFormat;
use crate::time::Time;

/// Point in the renderer's per-frame pipeline a notification fires at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassSemantic {
    /// Before anything is drawn for the frame.
    BeginRender,
    /// Before a scene pass.
    BeginSceneRender,
    /// After a scene pass.
    EndSceneRender,
    /// After color rendering of the frame has completed.
    EndRender,
}

impl PassSemantic {
    /// Order in which a frame's notifications fire.
    pub const PIPELINE: [PassSemantic; 4] = [
        PassSemantic::BeginRender,
        PassSemantic::BeginSceneRender,
        PassSemantic::EndSceneRender,
        PassSemantic::EndRender,
    ];

    /// The renderer's name for the semantic.
    pub const fn as_str(self) -> &'static str {
        match self {
            PassSemantic::BeginRender => "beginRender",
            PassSemantic::BeginSceneRender => "beginSceneRender",
            PassSemantic::EndSceneRender => "endSceneRender",
            PassSemantic::EndRender => "endRender",
        }
    }
}

impl Display for PassSemantic {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Identifies a notification registration: a name plus the semantic it
/// fires at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotificationKey {
    /// Registration name.
    pub name: String,
    /// Pipeline point.
    pub semantic: PassSemantic,
}

impl NotificationKey {
    /// Create a key.
    pub fn new(name: impl Into<String>, semantic: PassSemantic) -> Self {
        Self {
            name: name.into(),
            semantic,
        }
    }
}

impl Display for NotificationKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} ({})", self.name, self.semantic)
    }
}

/// Opaque handle to a host viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewportId(pub u32);

/// How a viewport redraw is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshMode {
    /// Redraw every viewport rather than only the given one.
    pub all_views: bool,
    /// Redraw even if the host thinks nothing changed.
    pub force: bool,
}

impl RefreshMode {
    /// The mode used for capture: only the target viewport, always redrawn.
    pub const CAPTURE: RefreshMode = RefreshMode {
        all_views: false,
        force: true,
    };
}

/// Size and layout of a color surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceDescription {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel layout.
    pub raster_format: RasterFormat,
}

/// Raw pixel memory borrowed from a color surface.
///
/// Must be handed back with [`ColorSurface::release_raw_data`] exactly
/// once; [`RawPixelLease`](crate::RawPixelLease) does that on drop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPixelData {
    /// Pixel bytes, rows top to bottom.
    pub bytes: Vec<u8>,
    /// Distance in bytes between the starts of two rows.
    pub row_pitch: usize,
    /// Size in bytes of one full image slice.
    pub slice_pitch: usize,
}

/// Opaque handle to a transient texture copied from a color surface.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// The rendered color buffer of one frame.
pub trait ColorSurface {
    /// Size and raster format of the surface.
    fn description(&self) -> SurfaceDescription;

    /// Copy the surface into a new transient texture.
    fn copy_to_texture(&mut self) -> Option<TextureHandle>;

    /// Save a texture with the host's own image writer. The host picks the
    /// file format from the path's extension.
    fn save_texture(&mut self, texture: &TextureHandle, path: &Path) -> Result<(), PlayblastError>;

    /// Release a texture obtained from [`copy_to_texture`](Self::copy_to_texture).
    fn release_texture(&mut self, texture: TextureHandle);

    /// Pin the surface's pixels into CPU-readable memory.
    fn acquire_raw_data(&mut self) -> Option<RawPixelData>;

    /// Return memory obtained from [`acquire_raw_data`](Self::acquire_raw_data).
    fn release_raw_data(&mut self, data: RawPixelData);
}

/// Identifier and semantics of the pass a notification fires for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassContext {
    /// The renderer's identifier for the pass.
    pub identifier: String,
    /// Semantics attached to the pass, e.g. `colorPass`, `endRender`.
    pub semantics: Vec<String>,
}

/// What a notification sees of the frame being rendered.
pub struct FrameCaptureContext<'a> {
    current_time: Time,
    pass: &'a PassContext,
    color_surface: Option<&'a mut dyn ColorSurface>,
}

impl<'a> FrameCaptureContext<'a> {
    /// Create a context. Hosts call this once per notification.
    pub fn new(
        current_time: Time,
        pass: &'a PassContext,
        color_surface: Option<&'a mut dyn ColorSurface>,
    ) -> Self {
        Self {
            current_time,
            pass,
            color_surface,
        }
    }

    /// The time that was just rendered.
    pub fn current_time(&self) -> Time {
        self.current_time
    }

    /// The pass the notification fires for.
    pub fn pass(&self) -> &PassContext {
        self.pass
    }

    /// The frame's color surface, if the renderer exposes one.
    pub fn color_surface(&mut self) -> Option<&mut (dyn ColorSurface + 'a)> {
        self.color_surface.as_deref_mut()
    }
}

/// A callback the renderer invokes at a point of its per-frame pipeline.
///
/// Invocation is synchronous: the host calls it from inside
/// [`RenderHost::refresh`] and does not return until it has finished.
pub trait RenderNotification {
    /// Handle one rendered frame.
    fn on_frame_rendered(&mut self, context: &mut FrameCaptureContext<'_>) -> Result<(), PlayblastError>;
}

/// The host application's renderer, viewport and time control.
pub trait RenderHost {
    /// Whether a live viewport renderer exists.
    fn renderer_available(&self) -> bool;

    /// The viewport that currently has focus.
    fn active_viewport(&self) -> Option<ViewportId>;

    /// Register a notification.
    fn add_notification(
        &mut self,
        key: NotificationKey,
        handler: Box<dyn RenderNotification>,
    ) -> Result<(), PlayblastError>;

    /// Remove a notification. Returns `false` if nothing was registered
    /// under `key`.
    fn remove_notification(&mut self, key: &NotificationKey) -> bool;

    /// Whether a notification is registered under `key`.
    fn has_notification(&self, key: &NotificationKey) -> bool;

    /// The current output-size override, if any.
    fn output_size_override(&self) -> Option<(u32, u32)>;

    /// Force every render target to the given size.
    fn set_output_size_override(&mut self, width: u32, height: u32);

    /// Go back to rendering at viewport size.
    fn unset_output_size_override(&mut self);

    /// Whether rendered frames are presented to the on-screen window.
    fn present_on_screen(&self) -> bool;

    /// Enable or disable on-screen presentation.
    fn set_present_on_screen(&mut self, present: bool);

    /// Whether viewport color management is enabled.
    fn color_management_enabled(&self) -> bool {
        true
    }

    /// Enable or disable viewport color management.
    fn set_color_management_enabled(&mut self, _enabled: bool) {}

    /// Move the animation to `time`.
    fn set_current_time(&mut self, time: Time);

    /// Redraw a viewport synchronously, firing registered notifications
    /// before returning.
    fn refresh(&mut self, viewport: ViewportId, mode: RefreshMode) -> Result<(), PlayblastError>;
}
