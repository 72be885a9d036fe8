//! An offscreen render host.
//!
//! [`HeadlessHost`] implements [`RenderHost`] without a window or GPU. Every
//! redraw renders a small test pattern into a color surface of the
//! configured raster format and fires the registered notifications in
//! pipeline order. Everything a capture does to the host is appended to an
//! event journal ([`HeadlessHost::events`]), which makes it the host of
//! choice for the command-line tool and for tests.
//!
//! The native texture saver puts 8-bit surfaces into RGBA byte order and
//! hands every file to [`CodecOutputs`].
//!
//! # Example
//!
//! ```
//! use playblast::{CaptureConfig, HeadlessHost, HostEvent, Playblast, RasterFormat};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let stem = dir.path().join("shot010");
//! let config = CaptureConfig::new(stem.to_string_lossy()).with_frame_range(1001, 1002);
//!
//! let mut host = HeadlessHost::new().with_raster_format(RasterFormat::R16G16B16A16Float);
//! let report = Playblast::new(config).run(&mut host).unwrap();
//!
//! assert_eq!(report.written(), 2);
//! assert!(dir.path().join("shot010.1001.exr").exists());
//! assert!(host.events().contains(&HostEvent::PresentOnScreen(true)));
//! ```

use std::path::{Path, PathBuf};

use exr::prelude::f16;

use crate::error::PlayblastError;
use crate::format::{ComponentType, RasterFormat};
use crate::host::{
    ColorSurface, FrameCaptureContext, NotificationKey, PassContext, PassSemantic, RawPixelData,
    RefreshMode, RenderHost, RenderNotification, SurfaceDescription, TextureHandle, ViewportId,
};
use crate::output::{CodecOutputs, ImageSpec, write_image_file};
use crate::time::Time;

/// Something a capture did to a [`HeadlessHost`].
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// A notification was registered.
    NotificationAdded(NotificationKey),
    /// A notification was removed.
    NotificationRemoved(NotificationKey),
    /// The output size override was set.
    SizeOverrideSet(u32, u32),
    /// The output size override was cleared.
    SizeOverrideCleared,
    /// On-screen presentation was switched.
    PresentOnScreen(bool),
    /// Viewport color management was switched.
    ColorManagement(bool),
    /// The animation time was changed.
    TimeChanged(Time),
    /// A viewport redraw was requested at a time.
    Refreshed(Time),
    /// A surface was copied into a texture.
    TextureCopied(u64),
    /// A texture was saved to a path.
    TextureSaved(PathBuf),
    /// A texture was released.
    TextureReleased(u64),
    /// Raw surface memory was handed out.
    RawDataAcquired,
    /// Raw surface memory was handed back.
    RawDataReleased,
}

/// The host's own image saver, used by the native writer backend.
///
/// `pixels` are tightly packed in the surface's raster format.
pub trait TextureSaver {
    /// Save one texture to `path`.
    fn save(&mut self, description: &SurfaceDescription, pixels: &[u8], path: &Path) -> Result<(), PlayblastError>;
}

impl<F> TextureSaver for F
where
    F: FnMut(&SurfaceDescription, &[u8], &Path) -> Result<(), PlayblastError>,
{
    fn save(&mut self, description: &SurfaceDescription, pixels: &[u8], path: &Path) -> Result<(), PlayblastError> {
        self(description, pixels, path)
    }
}

/// Default [`TextureSaver`]: picks the file format from the extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTextureSaver;

impl TextureSaver for FileTextureSaver {
    fn save(&mut self, description: &SurfaceDescription, pixels: &[u8], path: &Path) -> Result<(), PlayblastError> {
        let mapping = description.raster_format.mapping().ok_or_else(|| {
            PlayblastError::UnsupportedImageSpec(format!("cannot save {} textures", description.raster_format))
        })?;

        if mapping.component == ComponentType::UInt8 {
            let rgba = to_rgba8(description.raster_format, pixels)?;
            let spec = ImageSpec::new(description.width, description.height, 4, ComponentType::UInt8);
            return write_packed(path, &spec, rgba);
        }

        let spec = ImageSpec::for_mapping(description.width, description.height, &mapping);
        write_packed(path, &spec, pixels.to_vec())
    }
}

fn write_packed(path: &Path, spec: &ImageSpec, bytes: Vec<u8>) -> Result<(), PlayblastError> {
    let pixels = RawPixelData {
        bytes,
        row_pitch: 0,
        slice_pitch: 0,
    };
    write_image_file(&CodecOutputs, path, spec, &pixels)
}

fn to_rgba8(format: RasterFormat, pixels: &[u8]) -> Result<Vec<u8>, PlayblastError> {
    let reorder: fn(&[u8]) -> [u8; 4] = match format {
        RasterFormat::R8G8B8A8Unorm => |p| [p[0], p[1], p[2], p[3]],
        RasterFormat::B8G8R8A8 => |p| [p[2], p[1], p[0], p[3]],
        RasterFormat::A8B8G8R8 => |p| [p[3], p[2], p[1], p[0]],
        other => {
            return Err(PlayblastError::UnsupportedImageSpec(format!(
                "{other} is not an 8-bit four channel format"
            )));
        }
    };
    Ok(pixels.chunks_exact(4).flat_map(reorder).collect())
}

/// An offscreen [`RenderHost`]. See the [module documentation](self).
pub struct HeadlessHost {
    renderer: bool,
    viewport: Option<ViewportId>,
    raster_format: RasterFormat,
    viewport_size: (u32, u32),
    row_padding: usize,
    color_surface: bool,
    texture_copy: bool,
    raw_data: bool,
    size_override: Option<(u32, u32)>,
    present_on_screen: bool,
    color_management: bool,
    current_time: Time,
    failing_refreshes: Vec<Time>,
    dropped_frames: Vec<Time>,
    notifications: Vec<(NotificationKey, Box<dyn RenderNotification>)>,
    saver: Box<dyn TextureSaver>,
    next_texture: u64,
    events: Vec<HostEvent>,
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessHost {
    /// A host with a live renderer, one viewport of 64x64 pixels, an 8-bit
    /// RGBA color surface and the [`FileTextureSaver`].
    pub fn new() -> Self {
        Self {
            renderer: true,
            viewport: Some(ViewportId(1)),
            raster_format: RasterFormat::R8G8B8A8Unorm,
            viewport_size: (64, 64),
            row_padding: 0,
            color_surface: true,
            texture_copy: true,
            raw_data: true,
            size_override: None,
            present_on_screen: true,
            color_management: true,
            current_time: Time::default(),
            failing_refreshes: Vec::new(),
            dropped_frames: Vec::new(),
            notifications: Vec::new(),
            saver: Box::new(FileTextureSaver),
            next_texture: 1,
            events: Vec::new(),
        }
    }

    /// Render into surfaces of this raster format.
    #[must_use]
    pub fn with_raster_format(mut self, format: RasterFormat) -> Self {
        self.raster_format = format;
        self
    }

    /// Viewport size used when no output size override is set.
    #[must_use]
    pub fn with_viewport_size(mut self, width: u32, height: u32) -> Self {
        self.viewport_size = (width, height);
        self
    }

    /// Pad every row of the raw pixel memory with this many bytes.
    #[must_use]
    pub fn with_row_padding(mut self, bytes: usize) -> Self {
        self.row_padding = bytes;
        self
    }

    /// Start with an output size override already set.
    #[must_use]
    pub fn with_size_override(mut self, width: u32, height: u32) -> Self {
        self.size_override = Some((width, height));
        self
    }

    /// Start with on-screen presentation in the given state.
    #[must_use]
    pub fn with_present_on_screen(mut self, present: bool) -> Self {
        self.present_on_screen = present;
        self
    }

    /// Start with viewport color management in the given state.
    #[must_use]
    pub fn with_color_management(mut self, enabled: bool) -> Self {
        self.color_management = enabled;
        self
    }

    /// Report no live renderer.
    #[must_use]
    pub fn without_renderer(mut self) -> Self {
        self.renderer = false;
        self
    }

    /// Report no active viewport.
    #[must_use]
    pub fn without_viewport(mut self) -> Self {
        self.viewport = None;
        self
    }

    /// Fire notifications without a color surface.
    #[must_use]
    pub fn without_color_surface(mut self) -> Self {
        self.color_surface = false;
        self
    }

    /// Fail every texture copy.
    #[must_use]
    pub fn without_texture_copy(mut self) -> Self {
        self.texture_copy = false;
        self
    }

    /// Refuse to hand out raw pixel memory.
    #[must_use]
    pub fn without_raw_data(mut self) -> Self {
        self.raw_data = false;
        self
    }

    /// Save native textures with `saver`.
    #[must_use]
    pub fn with_texture_saver(mut self, saver: Box<dyn TextureSaver>) -> Self {
        self.saver = saver;
        self
    }

    /// Make the redraw at `time` fail.
    #[must_use]
    pub fn with_refresh_failure_at(mut self, time: impl Into<Time>) -> Self {
        self.failing_refreshes.push(time.into());
        self
    }

    /// Redraw at `time` without firing any notification.
    #[must_use]
    pub fn with_dropped_frame_at(mut self, time: impl Into<Time>) -> Self {
        self.dropped_frames.push(time.into());
        self
    }

    /// Everything that happened to the host so far, in order.
    pub fn events(&self) -> &[HostEvent] {
        &self.events
    }

    /// Drain the event journal.
    pub fn take_events(&mut self) -> Vec<HostEvent> {
        std::mem::take(&mut self.events)
    }

    /// Number of registered notifications.
    pub fn notification_count(&self) -> usize {
        self.notifications.len()
    }

    /// The current animation time.
    pub fn current_time(&self) -> Time {
        self.current_time
    }

    fn surface_description(&self) -> SurfaceDescription {
        let (width, height) = self.size_override.unwrap_or(self.viewport_size);
        SurfaceDescription {
            width,
            height,
            raster_format: self.raster_format,
        }
    }
}

impl RenderHost for HeadlessHost {
    fn renderer_available(&self) -> bool {
        self.renderer
    }

    fn active_viewport(&self) -> Option<ViewportId> {
        self.viewport
    }

    fn add_notification(
        &mut self,
        key: NotificationKey,
        handler: Box<dyn RenderNotification>,
    ) -> Result<(), PlayblastError> {
        if self.has_notification(&key) {
            return Err(PlayblastError::CaptureInProgress {
                notification: key.name,
            });
        }
        self.events.push(HostEvent::NotificationAdded(key.clone()));
        self.notifications.push((key, handler));
        Ok(())
    }

    fn remove_notification(&mut self, key: &NotificationKey) -> bool {
        let before = self.notifications.len();
        self.notifications.retain(|(registered, _)| registered != key);
        let removed = self.notifications.len() != before;
        if removed {
            self.events.push(HostEvent::NotificationRemoved(key.clone()));
        }
        removed
    }

    fn has_notification(&self, key: &NotificationKey) -> bool {
        self.notifications.iter().any(|(registered, _)| registered == key)
    }

    fn output_size_override(&self) -> Option<(u32, u32)> {
        self.size_override
    }

    fn set_output_size_override(&mut self, width: u32, height: u32) {
        self.size_override = Some((width, height));
        self.events.push(HostEvent::SizeOverrideSet(width, height));
    }

    fn unset_output_size_override(&mut self) {
        self.size_override = None;
        self.events.push(HostEvent::SizeOverrideCleared);
    }

    fn present_on_screen(&self) -> bool {
        self.present_on_screen
    }

    fn set_present_on_screen(&mut self, present: bool) {
        self.present_on_screen = present;
        self.events.push(HostEvent::PresentOnScreen(present));
    }

    fn color_management_enabled(&self) -> bool {
        self.color_management
    }

    fn set_color_management_enabled(&mut self, enabled: bool) {
        self.color_management = enabled;
        self.events.push(HostEvent::ColorManagement(enabled));
    }

    fn set_current_time(&mut self, time: Time) {
        self.current_time = time;
        self.events.push(HostEvent::TimeChanged(time));
    }

    fn refresh(&mut self, viewport: ViewportId, mode: RefreshMode) -> Result<(), PlayblastError> {
        let time = self.current_time;
        if self.viewport != Some(viewport) {
            return Err(PlayblastError::RenderFailure {
                time,
                reason: format!("viewport {} does not exist", viewport.0),
            });
        }
        self.events.push(HostEvent::Refreshed(time));
        log::trace!("Headless redraw of viewport {} at {time} ({mode:?})", viewport.0);

        if self.failing_refreshes.contains(&time) {
            return Err(PlayblastError::RenderFailure {
                time,
                reason: "headless renderer was told to fail".to_string(),
            });
        }
        if self.dropped_frames.contains(&time) {
            return Ok(());
        }

        let description = self.surface_description();
        let row_bytes = description.width as usize * description.raster_format.bytes_per_pixel();
        let row_pitch = row_bytes + self.row_padding;
        let pixels = render_pattern(&description, row_pitch, time);

        let expose_surface = self.color_surface;
        let Self {
            notifications,
            saver,
            events,
            next_texture,
            texture_copy,
            raw_data,
            ..
        } = self;

        let mut surface = HeadlessSurface {
            description,
            pixels,
            row_pitch,
            texture_copy: *texture_copy,
            raw_data: *raw_data,
            saver: &mut **saver,
            events,
            next_texture,
        };

        for semantic in PassSemantic::PIPELINE {
            let pass = PassContext {
                identifier: format!("headless_{semantic}"),
                semantics: vec![semantic.as_str().to_string(), "colorPass".to_string()],
            };
            for (key, handler) in notifications.iter_mut().filter(|(key, _)| key.semantic == semantic) {
                let color_surface: Option<&mut dyn ColorSurface> = if expose_surface {
                    Some(&mut surface)
                } else {
                    None
                };
                let mut context = FrameCaptureContext::new(time, &pass, color_surface);
                if let Err(error) = handler.on_frame_rendered(&mut context) {
                    log::trace!("Notification {key} reported: {error}");
                }
            }
        }

        Ok(())
    }
}

/// The color surface of one headless redraw.
struct HeadlessSurface<'h> {
    description: SurfaceDescription,
    pixels: Vec<u8>,
    row_pitch: usize,
    texture_copy: bool,
    raw_data: bool,
    saver: &'h mut dyn TextureSaver,
    events: &'h mut Vec<HostEvent>,
    next_texture: &'h mut u64,
}

impl HeadlessSurface<'_> {
    fn packed(&self) -> Vec<u8> {
        let row_bytes = self.description.width as usize * self.description.raster_format.bytes_per_pixel();
        self.pixels
            .chunks(self.row_pitch.max(1))
            .take(self.description.height as usize)
            .flat_map(|row| &row[..row_bytes.min(row.len())])
            .copied()
            .collect()
    }
}

impl ColorSurface for HeadlessSurface<'_> {
    fn description(&self) -> SurfaceDescription {
        self.description
    }

    fn copy_to_texture(&mut self) -> Option<TextureHandle> {
        if !self.texture_copy {
            return None;
        }
        let id = *self.next_texture;
        *self.next_texture += 1;
        self.events.push(HostEvent::TextureCopied(id));
        Some(TextureHandle(id))
    }

    fn save_texture(&mut self, _texture: &TextureHandle, path: &Path) -> Result<(), PlayblastError> {
        let packed = self.packed();
        self.saver.save(&self.description, &packed, path)?;
        self.events.push(HostEvent::TextureSaved(path.to_path_buf()));
        Ok(())
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        self.events.push(HostEvent::TextureReleased(texture.0));
    }

    fn acquire_raw_data(&mut self) -> Option<RawPixelData> {
        if !self.raw_data {
            return None;
        }
        self.events.push(HostEvent::RawDataAcquired);
        Some(RawPixelData {
            bytes: self.pixels.clone(),
            row_pitch: self.row_pitch,
            slice_pitch: self.row_pitch * self.description.height as usize,
        })
    }

    fn release_raw_data(&mut self, _data: RawPixelData) {
        self.events.push(HostEvent::RawDataReleased);
    }
}

/// Render a gradient that shifts with `time`, laid out in the surface's
/// raster format. Row padding is zero-filled.
fn render_pattern(description: &SurfaceDescription, row_pitch: usize, time: Time) -> Vec<u8> {
    let format = description.raster_format;
    let pixel_bytes = format.bytes_per_pixel();
    let (width, height) = (description.width as usize, description.height as usize);
    let mut pixels = vec![0u8; row_pitch * height];
    let phase = time.value().rem_euclid(24.0) / 24.0;

    for y in 0..height {
        for x in 0..width {
            let red = x as f64 / width.max(1) as f64;
            let green = y as f64 / height.max(1) as f64;
            let blue = phase;
            let rgba = [red, green, blue, 1.0];

            let offset = y * row_pitch + x * pixel_bytes;
            let pixel = &mut pixels[offset..offset + pixel_bytes];
            encode_pixel(format, rgba, pixel);
        }
    }
    pixels
}

fn encode_pixel(format: RasterFormat, [r, g, b, a]: [f64; 4], out: &mut [u8]) {
    let byte = |value: f64| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
    match format {
        RasterFormat::R8G8B8A8Unorm | RasterFormat::R8G8B8X8 => {
            out.copy_from_slice(&[byte(r), byte(g), byte(b), byte(a)]);
        }
        RasterFormat::B8G8R8A8 | RasterFormat::B8G8R8X8 => {
            out.copy_from_slice(&[byte(b), byte(g), byte(r), byte(a)]);
        }
        RasterFormat::A8B8G8R8 => out.copy_from_slice(&[byte(a), byte(b), byte(g), byte(r)]),
        RasterFormat::R16G16B16A16Float => {
            for (channel, value) in out.chunks_exact_mut(2).zip([r, g, b, a]) {
                channel.copy_from_slice(&f16::from_f64(value).to_le_bytes());
            }
        }
        RasterFormat::R32G32B32A32Float | RasterFormat::R32G32B32Float => {
            for (channel, value) in out.chunks_exact_mut(4).zip([r, g, b, a]) {
                channel.copy_from_slice(&(value as f32).to_le_bytes());
            }
        }
        _ => {
            let fill = byte((r + g) / 2.0);
            out.fill(fill);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{HeadlessHost, HostEvent, render_pattern, to_rgba8};
    use crate::format::RasterFormat;
    use crate::host::{NotificationKey, PassSemantic, RenderHost, SurfaceDescription};
    use crate::time::Time;

    #[test]
    fn pattern_leaves_row_padding_zeroed() {
        let description = SurfaceDescription {
            width: 2,
            height: 2,
            raster_format: RasterFormat::R8G8B8A8Unorm,
        };
        let pixels = render_pattern(&description, 12, Time::new(1.0));
        assert_eq!(pixels.len(), 24);
        assert_eq!(&pixels[8..12], &[0, 0, 0, 0]);
        assert_eq!(pixels[3], 255);
    }

    #[test]
    fn bgra_is_reordered_for_saving() {
        let rgba = to_rgba8(RasterFormat::B8G8R8A8, &[3, 2, 1, 4]).unwrap();
        assert_eq!(rgba, vec![1, 2, 3, 4]);
        assert!(to_rgba8(RasterFormat::R32Float, &[0; 4]).is_err());
    }

    #[test]
    fn duplicate_registration_is_refused() {
        struct Nothing;
        impl crate::host::RenderNotification for Nothing {
            fn on_frame_rendered(
                &mut self,
                _context: &mut crate::host::FrameCaptureContext<'_>,
            ) -> Result<(), crate::error::PlayblastError> {
                Ok(())
            }
        }

        let mut host = HeadlessHost::new();
        let key = NotificationKey::new("probe", PassSemantic::EndRender);
        host.add_notification(key.clone(), Box::new(Nothing)).unwrap();
        assert!(host.add_notification(key.clone(), Box::new(Nothing)).is_err());
        assert!(host.remove_notification(&key));
        assert!(!host.remove_notification(&key));
        assert_eq!(
            host.events(),
            &[HostEvent::NotificationAdded(key.clone()), HostEvent::NotificationRemoved(key)]
        );
    }
}
