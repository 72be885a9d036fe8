//! Scope-bound access to surface resources.
//!
//! Both writer backends borrow something from the color surface that must
//! be given back no matter how the write ends: a transient texture for the
//! native writer, pinned raw pixel memory for the external one. The guards
//! here give it back on drop.

use std::path::Path;

use crate::error::PlayblastError;
use crate::host::{ColorSurface, RawPixelData, TextureHandle};

/// Raw pixel memory borrowed from a [`ColorSurface`].
///
/// The memory is released back to the surface exactly once, when the
/// lease is dropped.
pub struct RawPixelLease<'s, S: ColorSurface + ?Sized> {
    surface: &'s mut S,
    data: RawPixelData,
}

impl<'s, S: ColorSurface + ?Sized> RawPixelLease<'s, S> {
    /// Pin the surface's pixels.
    ///
    /// # Errors
    ///
    /// Returns [`PlayblastError::RawDataUnavailable`] if the surface cannot
    /// expose its memory; nothing needs releasing in that case.
    pub fn acquire(surface: &'s mut S) -> Result<Self, PlayblastError> {
        let data = surface
            .acquire_raw_data()
            .ok_or(PlayblastError::RawDataUnavailable)?;
        Ok(Self { surface, data })
    }

    /// The borrowed pixels.
    pub fn data(&self) -> &RawPixelData {
        &self.data
    }
}

impl<S: ColorSurface + ?Sized> Drop for RawPixelLease<'_, S> {
    fn drop(&mut self) {
        let data = std::mem::take(&mut self.data);
        self.surface.release_raw_data(data);
    }
}

/// A texture copied from a [`ColorSurface`], released on drop.
pub struct TransientTexture<'s, S: ColorSurface + ?Sized> {
    surface: &'s mut S,
    handle: Option<TextureHandle>,
}

impl<'s, S: ColorSurface + ?Sized> TransientTexture<'s, S> {
    /// Copy the surface into a texture.
    ///
    /// # Errors
    ///
    /// Returns [`PlayblastError::TextureUnavailable`] if the copy failed.
    pub fn copy_from(surface: &'s mut S) -> Result<Self, PlayblastError> {
        let handle = surface
            .copy_to_texture()
            .ok_or(PlayblastError::TextureUnavailable)?;
        Ok(Self {
            surface,
            handle: Some(handle),
        })
    }

    /// Save the texture through the host's image writer.
    pub fn save(&mut self, path: &Path) -> Result<(), PlayblastError> {
        match &self.handle {
            Some(handle) => self.surface.save_texture(handle, path),
            None => Err(PlayblastError::TextureUnavailable),
        }
    }
}

impl<S: ColorSurface + ?Sized> Drop for TransientTexture<'_, S> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.surface.release_texture(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::RasterFormat;
    use crate::host::SurfaceDescription;

    #[derive(Default)]
    struct CountingSurface {
        textures_released: u32,
        raw_released: u32,
        texture_copy: bool,
    }

    impl ColorSurface for CountingSurface {
        fn description(&self) -> SurfaceDescription {
            SurfaceDescription {
                width: 1,
                height: 1,
                raster_format: RasterFormat::R8G8B8A8Unorm,
            }
        }

        fn copy_to_texture(&mut self) -> Option<TextureHandle> {
            self.texture_copy.then_some(TextureHandle(7))
        }

        fn save_texture(&mut self, _texture: &TextureHandle, path: &Path) -> Result<(), PlayblastError> {
            Err(PlayblastError::WriteFailure {
                path: path.to_path_buf(),
                reason: "read-only".to_string(),
            })
        }

        fn release_texture(&mut self, _texture: TextureHandle) {
            self.textures_released += 1;
        }

        fn acquire_raw_data(&mut self) -> Option<RawPixelData> {
            Some(RawPixelData {
                bytes: vec![0; 4],
                row_pitch: 4,
                slice_pitch: 4,
            })
        }

        fn release_raw_data(&mut self, _data: RawPixelData) {
            self.raw_released += 1;
        }
    }

    #[test]
    fn texture_released_once_after_failed_save() {
        let mut surface = CountingSurface {
            texture_copy: true,
            ..Default::default()
        };
        {
            let mut texture = TransientTexture::copy_from(&mut surface).unwrap();
            assert!(texture.save(Path::new("out.1.iff")).is_err());
        }
        assert_eq!(surface.textures_released, 1);
    }

    #[test]
    fn failed_copy_releases_nothing() {
        let mut surface = CountingSurface::default();
        assert!(matches!(
            TransientTexture::copy_from(&mut surface),
            Err(PlayblastError::TextureUnavailable)
        ));
        assert_eq!(surface.textures_released, 0);
    }

    #[test]
    fn lease_released_once() {
        let mut surface = CountingSurface::default();
        {
            let lease = RawPixelLease::acquire(&mut surface).unwrap();
            assert_eq!(lease.data().row_pitch, 4);
        }
        assert_eq!(surface.raw_released, 1);
    }
}
