//! Error types for the `playblast` crate.
//!
//! This module defines [`PlayblastError`], the unified error type returned by
//! all fallible operations in the crate. Setup errors (argument parsing,
//! renderer and viewport lookup) are raised before any render state is
//! touched; per-frame errors carry the frame time or output path so a
//! capture report can name exactly what went wrong.

use std::{io::Error as IoError, path::PathBuf};

use image::ImageError;
use thiserror::Error;

use crate::format::RasterFormat;
use crate::time::Time;

/// The unified error type for all `playblast` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlayblastError {
    /// A flag the command cannot run without was not supplied.
    #[error("Missing required argument: {0}")]
    MissingRequiredArgument(&'static str),

    /// A token looked like a flag but is not part of the command syntax.
    #[error("Unknown flag: {0}")]
    UnknownFlag(String),

    /// A flag was given without the value(s) it requires.
    #[error("Flag {flag} expects a value")]
    MissingFlagValue {
        /// The flag as it was written on the command line.
        flag: String,
    },

    /// A flag value could not be converted to the expected type.
    #[error("Invalid value {value:?} for flag {flag}: {reason}")]
    InvalidArgument {
        /// The flag as it was written on the command line.
        flag: String,
        /// The offending value.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The host has no live viewport renderer.
    #[error("Viewport renderer not initialized")]
    RendererUnavailable,

    /// The host has no active viewport to redraw.
    #[error("Failed to find an active 3d view to capture")]
    NoActiveViewport,

    /// Another capture already owns the post-render notification.
    #[error("A capture is already in progress (notification {notification} is registered)")]
    CaptureInProgress {
        /// Name of the notification that is already registered.
        notification: String,
    },

    /// The renderer did not expose a color surface for the frame.
    #[error("No color render target available at frame {0}")]
    NoColorSurface(Time),

    /// The color surface uses a raster format with no output mapping.
    #[error("Unsupported raster format {format} at frame {time}")]
    UnsupportedPixelFormat {
        /// The raster format reported by the surface.
        format: RasterFormat,
        /// The frame that was skipped.
        time: Time,
    },

    /// The color surface could not be copied into a texture.
    #[error("Failed to copy color render target to a texture")]
    TextureUnavailable,

    /// The color surface could not expose its raw pixel memory.
    #[error("Failed to acquire raw pixel data from color render target")]
    RawDataUnavailable,

    /// A raw pixel buffer is smaller than its image spec requires.
    #[error("Pixel buffer too small: expected at least {expected} bytes, got {actual}")]
    InvalidPixelBuffer {
        /// Minimum number of bytes the spec requires.
        expected: usize,
        /// Number of bytes actually supplied.
        actual: usize,
    },

    /// No image writer is registered for the file extension.
    #[error("No image writer available for {0:?} files")]
    UnsupportedContainer(String),

    /// The image writer cannot encode the requested channel layout.
    #[error("Unsupported image spec: {0}")]
    UnsupportedImageSpec(String),

    /// Writing a frame to disk failed.
    #[error("Failed to capture color render target to {}: {reason}", path.display())]
    WriteFailure {
        /// The resolved output path.
        path: PathBuf,
        /// Underlying reason the write failed.
        reason: String,
    },

    /// The host failed to redraw the viewport for a frame.
    #[error("Viewport refresh failed at frame {time}: {reason}")]
    RenderFailure {
        /// The frame being redrawn.
        time: Time,
        /// Underlying reason reported by the host.
        reason: String,
    },

    /// The viewport was redrawn but the post-render notification never fired.
    #[error("Frame {0} was redrawn without a post-render notification")]
    FrameNotRendered(Time),

    /// The capture was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,

    /// An I/O error occurred while writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while encoding a frame.
    #[error("Image encoding error: {0}")]
    ImageError(#[from] ImageError),

    /// An error from the `exr` crate while encoding a frame.
    #[error("OpenEXR error: {0}")]
    ExrError(String),
}

impl From<exr::error::Error> for PlayblastError {
    fn from(error: exr::error::Error) -> Self {
        PlayblastError::ExrError(error.to_string())
    }
}
