//! External image writers.
//!
//! The external writer backend encodes a frame straight from the surface's
//! raw pixel memory. Writers follow the usual image-I/O shape: a factory
//! creates a writer for a path ([`ImageOutputFactory::create`]), the writer
//! is opened with an [`ImageSpec`], receives the whole buffer in one
//! [`write_image`](ImageOutput::write_image) call, and is closed.
//!
//! [`CodecOutputs`] is the default factory. It writes OpenEXR through the
//! `exr` crate (half and float samples are written bit-for-bit), 8-bit
//! tiled IFF with [`IffOutput`], and any 8-bit format the `image` crate can
//! encode. Other containers are refused with
//! [`PlayblastError::UnsupportedContainer`].

use std::borrow::Cow;
use std::fs;
use std::io::Error as IoError;
use std::path::{Path, PathBuf};

use exr::prelude::{f16, write_rgb_file, write_rgba_file};
use image::{ImageFormat, RgbImage, RgbaImage};

use crate::error::PlayblastError;
use crate::format::{ComponentType, FormatMapping};
use crate::host::RawPixelData;

/// Layout of the image handed to a writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSpec {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Channels per pixel.
    pub channels: u8,
    /// Sample type.
    pub component: ComponentType,
}

impl ImageSpec {
    /// Create a spec.
    pub fn new(width: u32, height: u32, channels: u8, component: ComponentType) -> Self {
        Self {
            width,
            height,
            channels,
            component,
        }
    }

    /// Create a spec for a surface of the given size and format mapping.
    pub fn for_mapping(width: u32, height: u32, mapping: &FormatMapping) -> Self {
        Self::new(width, height, mapping.channels, mapping.component)
    }

    /// Bytes per pixel.
    pub fn pixel_bytes(&self) -> usize {
        self.channels as usize * self.component.bytes()
    }

    /// Bytes per tightly-packed row.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.pixel_bytes()
    }

    /// Bytes of the tightly-packed image.
    pub fn image_bytes(&self) -> usize {
        self.row_bytes() * self.height as usize
    }
}

/// A writer for one image file.
pub trait ImageOutput {
    /// Prepare to write `path` with the given layout.
    fn open(&mut self, path: &Path, spec: &ImageSpec) -> Result<(), PlayblastError>;

    /// Write the whole image.
    fn write_image(&mut self, pixels: &RawPixelData) -> Result<(), PlayblastError>;

    /// Finish the file.
    fn close(&mut self) -> Result<(), PlayblastError>;
}

/// Creates the writer suited to a path.
pub trait ImageOutputFactory {
    /// Create a writer for `path`, usually chosen by its extension.
    fn create(&self, path: &Path) -> Result<Box<dyn ImageOutput>, PlayblastError>;
}

/// Create, open, write and close in one go.
///
/// `close` is attempted even when the write fails; the first error wins.
pub fn write_image_file(
    factory: &dyn ImageOutputFactory,
    path: &Path,
    spec: &ImageSpec,
    pixels: &RawPixelData,
) -> Result<(), PlayblastError> {
    let mut output = factory.create(path)?;
    output.open(path, spec)?;
    let written = output.write_image(pixels);
    let closed = output.close();
    written.and(closed)
}

/// Strip row padding from a raw buffer.
///
/// A `row_pitch` of zero means rows are tightly packed. Returns the
/// buffer unchanged when no padding is present.
///
/// # Errors
///
/// Returns [`PlayblastError::InvalidPixelBuffer`] if the pitch is shorter
/// than a row or the buffer does not cover every row.
pub fn pack_rows<'d>(pixels: &'d RawPixelData, spec: &ImageSpec) -> Result<Cow<'d, [u8]>, PlayblastError> {
    let row_bytes = spec.row_bytes();
    let height = spec.height as usize;
    let pitch = if pixels.row_pitch == 0 {
        row_bytes
    } else {
        pixels.row_pitch
    };

    if pitch < row_bytes {
        return Err(PlayblastError::InvalidPixelBuffer {
            expected: row_bytes,
            actual: pitch,
        });
    }

    let required = if height == 0 {
        0
    } else {
        pitch * (height - 1) + row_bytes
    };
    if pixels.bytes.len() < required {
        return Err(PlayblastError::InvalidPixelBuffer {
            expected: required,
            actual: pixels.bytes.len(),
        });
    }

    if pitch == row_bytes {
        return Ok(Cow::Borrowed(&pixels.bytes[..row_bytes * height]));
    }

    let mut buffer = Vec::with_capacity(row_bytes * height);
    for row in 0..height {
        let row_start = row * pitch;
        buffer.extend_from_slice(&pixels.bytes[row_start..row_start + row_bytes]);
    }
    Ok(Cow::Owned(buffer))
}

/// The default [`ImageOutputFactory`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CodecOutputs;

impl ImageOutputFactory for CodecOutputs {
    fn create(&self, path: &Path) -> Result<Box<dyn ImageOutput>, PlayblastError> {
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if extension == "iff" {
            return Ok(Box::new(IffOutput::default()));
        }

        match ImageFormat::from_extension(&extension) {
            Some(ImageFormat::OpenExr) => Ok(Box::new(ExrOutput::default())),
            Some(format) => Ok(Box::new(RasterOutput::new(format))),
            None => Err(PlayblastError::UnsupportedContainer(extension)),
        }
    }
}

fn not_open() -> PlayblastError {
    PlayblastError::IoError(IoError::other("image output is not open"))
}

/// Writes half or float RGB/RGBA images as OpenEXR.
#[derive(Debug, Default)]
pub struct ExrOutput {
    target: Option<(PathBuf, ImageSpec)>,
}

impl ImageOutput for ExrOutput {
    fn open(&mut self, path: &Path, spec: &ImageSpec) -> Result<(), PlayblastError> {
        match (spec.component, spec.channels) {
            (ComponentType::Half | ComponentType::Float, 3 | 4) => {
                self.target = Some((path.to_path_buf(), *spec));
                Ok(())
            }
            _ => Err(PlayblastError::UnsupportedImageSpec(format!(
                "OpenEXR output takes 3 or 4 half/float channels, got {} {} channel(s)",
                spec.channels, spec.component,
            ))),
        }
    }

    fn write_image(&mut self, pixels: &RawPixelData) -> Result<(), PlayblastError> {
        let (path, spec) = self.target.as_ref().ok_or_else(not_open)?;
        let packed = pack_rows(pixels, spec)?;
        let bytes: &[u8] = &packed;
        let width = spec.width as usize;
        let height = spec.height as usize;
        let channels = spec.channels as usize;
        let sample_bytes = spec.component.bytes();
        let offset = move |x: usize, y: usize, channel: usize| {
            ((y * width + x) * channels + channel) * sample_bytes
        };

        log::debug!(
            "Writing {}x{} {} OpenEXR ({} channels) to {}",
            width,
            height,
            spec.component,
            channels,
            path.display(),
        );

        match (spec.component, channels) {
            (ComponentType::Half, 4) => write_rgba_file(path, width, height, |x, y| {
                (
                    half_at(bytes, offset(x, y, 0)),
                    half_at(bytes, offset(x, y, 1)),
                    half_at(bytes, offset(x, y, 2)),
                    half_at(bytes, offset(x, y, 3)),
                )
            })?,
            (ComponentType::Half, 3) => write_rgb_file(path, width, height, |x, y| {
                (
                    half_at(bytes, offset(x, y, 0)),
                    half_at(bytes, offset(x, y, 1)),
                    half_at(bytes, offset(x, y, 2)),
                )
            })?,
            (ComponentType::Float, 4) => write_rgba_file(path, width, height, |x, y| {
                (
                    float_at(bytes, offset(x, y, 0)),
                    float_at(bytes, offset(x, y, 1)),
                    float_at(bytes, offset(x, y, 2)),
                    float_at(bytes, offset(x, y, 3)),
                )
            })?,
            (ComponentType::Float, 3) => write_rgb_file(path, width, height, |x, y| {
                (
                    float_at(bytes, offset(x, y, 0)),
                    float_at(bytes, offset(x, y, 1)),
                    float_at(bytes, offset(x, y, 2)),
                )
            })?,
            _ => {
                return Err(PlayblastError::UnsupportedImageSpec(format!(
                    "OpenEXR output takes 3 or 4 half/float channels, got {channels} {} channel(s)",
                    spec.component,
                )));
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), PlayblastError> {
        self.target = None;
        Ok(())
    }
}

fn half_at(bytes: &[u8], offset: usize) -> f16 {
    f16::from_bits(u16::from_le_bytes([bytes[offset], bytes[offset + 1]]))
}

fn float_at(bytes: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Writes 8-bit RGB/RGBA images in any format the `image` crate encodes.
#[derive(Debug)]
pub struct RasterOutput {
    format: ImageFormat,
    target: Option<(PathBuf, ImageSpec)>,
}

impl RasterOutput {
    /// Create a writer for the given encoder.
    pub fn new(format: ImageFormat) -> Self {
        Self {
            format,
            target: None,
        }
    }
}

impl ImageOutput for RasterOutput {
    fn open(&mut self, path: &Path, spec: &ImageSpec) -> Result<(), PlayblastError> {
        match (spec.component, spec.channels) {
            (ComponentType::UInt8, 3 | 4) => {
                self.target = Some((path.to_path_buf(), *spec));
                Ok(())
            }
            _ => Err(PlayblastError::UnsupportedImageSpec(format!(
                "{:?} output takes 3 or 4 uint8 channels, got {} {} channel(s)",
                self.format, spec.channels, spec.component,
            ))),
        }
    }

    fn write_image(&mut self, pixels: &RawPixelData) -> Result<(), PlayblastError> {
        let (path, spec) = self.target.as_ref().ok_or_else(not_open)?;
        let packed = pack_rows(pixels, spec)?.into_owned();
        let expected = spec.image_bytes();
        let actual = packed.len();
        let too_small = || PlayblastError::InvalidPixelBuffer { expected, actual };

        if spec.channels == 4 {
            RgbaImage::from_raw(spec.width, spec.height, packed)
                .ok_or_else(too_small)?
                .save_with_format(path, self.format)?;
        } else {
            RgbImage::from_raw(spec.width, spec.height, packed)
                .ok_or_else(too_small)?
                .save_with_format(path, self.format)?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), PlayblastError> {
        self.target = None;
        Ok(())
    }
}

/// Writes 8-bit RGB/RGBA images as uncompressed, tiled IFF.
///
/// Samples are taken in RGBA byte order. Three channel images get an
/// opaque alpha.
#[derive(Debug, Default)]
pub struct IffOutput {
    target: Option<(PathBuf, ImageSpec)>,
}

impl ImageOutput for IffOutput {
    fn open(&mut self, path: &Path, spec: &ImageSpec) -> Result<(), PlayblastError> {
        match (spec.component, spec.channels) {
            (ComponentType::UInt8, 3 | 4) => {
                self.target = Some((path.to_path_buf(), *spec));
                Ok(())
            }
            _ => Err(PlayblastError::UnsupportedImageSpec(format!(
                "IFF output takes 3 or 4 uint8 channels, got {} {} channel(s)",
                spec.channels, spec.component,
            ))),
        }
    }

    fn write_image(&mut self, pixels: &RawPixelData) -> Result<(), PlayblastError> {
        let (path, spec) = self.target.as_ref().ok_or_else(not_open)?;
        let packed = pack_rows(pixels, spec)?;
        log::debug!("Writing {}x{} IFF to {}", spec.width, spec.height, path.display());
        fs::write(path, encode_iff(spec, &packed)?)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), PlayblastError> {
        self.target = None;
        Ok(())
    }
}

const IFF_TILE: u32 = 64;
const IFF_RGB: u32 = 0x01;
const IFF_ALPHA: u32 = 0x02;

fn encode_iff(spec: &ImageSpec, packed: &[u8]) -> Result<Vec<u8>, PlayblastError> {
    let (width, height) = (spec.width, spec.height);
    let channels = spec.channels as usize;
    let too_large = || PlayblastError::UnsupportedImageSpec(format!("{width}x{height} is too large for IFF"));

    let tiles_x = width.div_ceil(IFF_TILE);
    let tiles_y = height.div_ceil(IFF_TILE);
    let tile_count = tiles_x
        .checked_mul(tiles_y)
        .and_then(|count| u16::try_from(count).ok())
        .ok_or_else(too_large)?;
    // Tile corners are 16-bit.
    for extent in [width, height] {
        u16::try_from(extent.saturating_sub(1)).map_err(|_| too_large())?;
    }

    let mut header = Vec::with_capacity(24);
    header.extend(width.to_be_bytes());
    header.extend(height.to_be_bytes());
    header.extend(1u16.to_be_bytes());
    header.extend(1u16.to_be_bytes());
    header.extend((IFF_RGB | IFF_ALPHA).to_be_bytes());
    header.extend(0u16.to_be_bytes());
    header.extend(tile_count.to_be_bytes());
    header.extend(0u32.to_be_bytes());

    let mut bitmap = b"TBMP".to_vec();
    for tile_y in 0..tiles_y {
        for tile_x in 0..tiles_x {
            let x1 = tile_x * IFF_TILE;
            let y1 = tile_y * IFF_TILE;
            let x2 = (x1 + IFF_TILE).min(width) - 1;
            let y2 = (y1 + IFF_TILE).min(height) - 1;

            let mut tile = Vec::new();
            for corner in [x1, y1, x2, y2] {
                let corner = u16::try_from(corner).map_err(|_| too_large())?;
                tile.extend(corner.to_be_bytes());
            }
            // IFF rows run bottom to top.
            for y in y1..=y2 {
                let row = (height - 1 - y) as usize;
                for x in x1..=x2 {
                    let offset = (row * width as usize + x as usize) * channels;
                    let alpha = if channels == 4 { packed[offset + 3] } else { u8::MAX };
                    tile.extend([alpha, packed[offset + 2], packed[offset + 1], packed[offset]]);
                }
            }
            push_chunk(&mut bitmap, b"RGBA", &tile);
        }
    }

    let mut image = b"CIMG".to_vec();
    push_chunk(&mut image, b"TBHD", &header);
    push_chunk(&mut image, b"FOR4", &bitmap);

    let mut file = Vec::with_capacity(image.len() + 8);
    push_chunk(&mut file, b"FOR4", &image);
    Ok(file)
}

fn push_chunk(out: &mut Vec<u8>, tag: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(tag);
    out.extend((data.len() as u32).to_be_bytes());
    out.extend_from_slice(data);
    out.resize(out.len().next_multiple_of(4), 0);
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{CodecOutputs, ImageOutputFactory, ImageSpec, encode_iff, pack_rows};
    use crate::error::PlayblastError;
    use crate::format::ComponentType;
    use crate::host::RawPixelData;

    #[test]
    fn packed_rows_are_borrowed() {
        let spec = ImageSpec::new(2, 2, 4, ComponentType::UInt8);
        let pixels = RawPixelData {
            bytes: (0..16).collect(),
            row_pitch: 8,
            slice_pitch: 16,
        };
        let packed = pack_rows(&pixels, &spec).unwrap();
        assert!(matches!(packed, std::borrow::Cow::Borrowed(_)));
        assert_eq!(packed.len(), 16);
    }

    #[test]
    fn row_padding_is_stripped() {
        let spec = ImageSpec::new(1, 3, 4, ComponentType::UInt8);
        let pixels = RawPixelData {
            bytes: vec![
                1, 2, 3, 4, 0, 0, 0, 0, //
                5, 6, 7, 8, 0, 0, 0, 0, //
                9, 10, 11, 12,
            ],
            row_pitch: 8,
            slice_pitch: 24,
        };
        let packed = pack_rows(&pixels, &spec).unwrap();
        assert_eq!(&packed[..], &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let spec = ImageSpec::new(4, 4, 4, ComponentType::Half);
        let pixels = RawPixelData {
            bytes: vec![0; 10],
            row_pitch: 0,
            slice_pitch: 0,
        };
        assert!(matches!(
            pack_rows(&pixels, &spec),
            Err(PlayblastError::InvalidPixelBuffer { expected: 128, actual: 10 })
        ));
    }

    #[test]
    fn containers_by_extension() {
        assert!(CodecOutputs.create(Path::new("shot010.1.iff")).is_ok());
        assert!(CodecOutputs.create(Path::new("shot010.1.IFF")).is_ok());
        assert!(CodecOutputs.create(Path::new("shot010.1.exr")).is_ok());
        assert!(CodecOutputs.create(Path::new("shot010.1.PNG")).is_ok());
        let result = CodecOutputs.create(Path::new("shot010.1.xyz"));
        assert!(matches!(result, Err(PlayblastError::UnsupportedContainer(ext)) if ext == "xyz"));
    }

    #[test]
    fn iff_tiles_are_abgr_bottom_up() {
        let spec = ImageSpec::new(1, 2, 4, ComponentType::UInt8);
        let file = encode_iff(&spec, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        // FOR4 + CIMG + TBHD(24) + FOR4 + TBMP + RGBA header, then the corners.
        let tile = &file[8 + 4 + 32 + 8 + 4 + 8..];
        assert_eq!(&tile[..8], &[0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(&tile[8..16], &[8, 7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn iff_rgb_gets_opaque_alpha() {
        let spec = ImageSpec::new(1, 1, 3, ComponentType::UInt8);
        let file = encode_iff(&spec, &[10, 20, 30]).unwrap();
        assert_eq!(&file[file.len() - 4..], &[255, 30, 20, 10]);
    }

    #[test]
    fn iff_rejects_widths_beyond_tile_corners() {
        let spec = ImageSpec::new(70_000, 1, 4, ComponentType::UInt8);
        let result = encode_iff(&spec, &[]);
        assert!(matches!(result, Err(PlayblastError::UnsupportedImageSpec(message)) if message.contains("70000x1")));
    }
}
