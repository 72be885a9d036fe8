//! Raster format to output container mapping.
//!
//! A rendered color surface reports its pixel layout as a [`RasterFormat`].
//! [`RasterFormat::mapping`] resolves that layout to the container the frame
//! is written as, the component type of the written samples, and the
//! channel count. The table is closed: every format is either mapped or
//! explicitly unsupported, and unsupported frames are skipped.
//!
//! | Raster format | Container | Component | Channels |
//! |---|---|---|---|
//! | `R16G16B16A16_FLOAT` | `.exr` | half | 4 |
//! | `R32G32B32_FLOAT` | `.exr` | float | 3 |
//! | `R32G32B32A32_FLOAT` | `.exr` | float | 4 |
//! | `R8G8B8A8_UNORM`, `B8G8R8A8`, `A8B8G8R8` | `.iff` | 8-bit | 4 |
//!
//! Pixels are never swizzled or converted: the 8-bit byte orders are
//! written exactly as the renderer stored them.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Host-native raster formats a color render target can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RasterFormat {
    /// 24-bit depth, 8-bit stencil.
    D24S8,
    /// 24-bit depth, 8 unused bits.
    D24X8,
    /// 32-bit float depth.
    D32Float,
    /// 24-bit red, 8-bit green (typeless depth alias).
    R24G8,
    /// 24-bit red, 8 unused bits.
    R24X8,
    /// Four 32-bit float channels.
    R32G32B32A32Float,
    /// Four 32-bit unsigned integer channels.
    R32G32B32A32Uint,
    /// Three 32-bit float channels.
    R32G32B32Float,
    /// Four 16-bit half-float channels.
    R16G16B16A16Float,
    /// Four 16-bit normalized channels.
    R16G16B16A16Unorm,
    /// 10-bit color, 2-bit alpha.
    R10G10B10A2Unorm,
    /// 8-bit RGBA.
    R8G8B8A8Unorm,
    /// 8-bit RGB with an unused byte.
    R8G8B8X8,
    /// 8-bit BGRA.
    B8G8R8A8,
    /// 8-bit BGR with an unused byte.
    B8G8R8X8,
    /// 8-bit ABGR.
    A8B8G8R8,
    /// Two 16-bit half-float channels.
    R16G16Float,
    /// Two 32-bit float channels.
    R32G32Float,
    /// One 32-bit float channel.
    R32Float,
    /// One 16-bit half-float channel.
    R16Float,
    /// One 8-bit normalized channel.
    R8Unorm,
    /// 8-bit alpha only.
    A8,
}

impl RasterFormat {
    /// Every raster format, in declaration order.
    pub const ALL: [RasterFormat; 22] = [
        RasterFormat::D24S8,
        RasterFormat::D24X8,
        RasterFormat::D32Float,
        RasterFormat::R24G8,
        RasterFormat::R24X8,
        RasterFormat::R32G32B32A32Float,
        RasterFormat::R32G32B32A32Uint,
        RasterFormat::R32G32B32Float,
        RasterFormat::R16G16B16A16Float,
        RasterFormat::R16G16B16A16Unorm,
        RasterFormat::R10G10B10A2Unorm,
        RasterFormat::R8G8B8A8Unorm,
        RasterFormat::R8G8B8X8,
        RasterFormat::B8G8R8A8,
        RasterFormat::B8G8R8X8,
        RasterFormat::A8B8G8R8,
        RasterFormat::R16G16Float,
        RasterFormat::R32G32Float,
        RasterFormat::R32Float,
        RasterFormat::R16Float,
        RasterFormat::R8Unorm,
        RasterFormat::A8,
    ];

    /// Resolve the output mapping for this format.
    ///
    /// Returns `None` for formats that cannot be captured; such frames are
    /// skipped without writing a file.
    pub const fn mapping(self) -> Option<FormatMapping> {
        match self {
            RasterFormat::R16G16B16A16Float => Some(FormatMapping {
                container: ContainerFormat::Exr,
                component: ComponentType::Half,
                channels: 4,
            }),
            RasterFormat::R32G32B32Float => Some(FormatMapping {
                container: ContainerFormat::Exr,
                component: ComponentType::Float,
                channels: 3,
            }),
            RasterFormat::R32G32B32A32Float => Some(FormatMapping {
                container: ContainerFormat::Exr,
                component: ComponentType::Float,
                channels: 4,
            }),
            RasterFormat::R8G8B8A8Unorm | RasterFormat::B8G8R8A8 | RasterFormat::A8B8G8R8 => {
                Some(FormatMapping {
                    container: ContainerFormat::Iff,
                    component: ComponentType::UInt8,
                    channels: 4,
                })
            }
            RasterFormat::D24S8
            | RasterFormat::D24X8
            | RasterFormat::D32Float
            | RasterFormat::R24G8
            | RasterFormat::R24X8
            | RasterFormat::R32G32B32A32Uint
            | RasterFormat::R16G16B16A16Unorm
            | RasterFormat::R10G10B10A2Unorm
            | RasterFormat::R8G8B8X8
            | RasterFormat::B8G8R8X8
            | RasterFormat::R16G16Float
            | RasterFormat::R32G32Float
            | RasterFormat::R32Float
            | RasterFormat::R16Float
            | RasterFormat::R8Unorm
            | RasterFormat::A8 => None,
        }
    }

    /// Size of one pixel in bytes.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            RasterFormat::R8Unorm | RasterFormat::A8 => 1,
            RasterFormat::R16Float => 2,
            RasterFormat::D24S8
            | RasterFormat::D24X8
            | RasterFormat::D32Float
            | RasterFormat::R24G8
            | RasterFormat::R24X8
            | RasterFormat::R10G10B10A2Unorm
            | RasterFormat::R8G8B8A8Unorm
            | RasterFormat::R8G8B8X8
            | RasterFormat::B8G8R8A8
            | RasterFormat::B8G8R8X8
            | RasterFormat::A8B8G8R8
            | RasterFormat::R16G16Float
            | RasterFormat::R32Float => 4,
            RasterFormat::R16G16B16A16Float
            | RasterFormat::R16G16B16A16Unorm
            | RasterFormat::R32G32Float => 8,
            RasterFormat::R32G32B32Float => 12,
            RasterFormat::R32G32B32A32Float | RasterFormat::R32G32B32A32Uint => 16,
        }
    }

    /// The host's name for this format.
    pub const fn name(self) -> &'static str {
        match self {
            RasterFormat::D24S8 => "D24S8",
            RasterFormat::D24X8 => "D24X8",
            RasterFormat::D32Float => "D32_FLOAT",
            RasterFormat::R24G8 => "R24G8",
            RasterFormat::R24X8 => "R24X8",
            RasterFormat::R32G32B32A32Float => "R32G32B32A32_FLOAT",
            RasterFormat::R32G32B32A32Uint => "R32G32B32A32_UINT",
            RasterFormat::R32G32B32Float => "R32G32B32_FLOAT",
            RasterFormat::R16G16B16A16Float => "R16G16B16A16_FLOAT",
            RasterFormat::R16G16B16A16Unorm => "R16G16B16A16_UNORM",
            RasterFormat::R10G10B10A2Unorm => "R10G10B10A2_UNORM",
            RasterFormat::R8G8B8A8Unorm => "R8G8B8A8_UNORM",
            RasterFormat::R8G8B8X8 => "R8G8B8X8",
            RasterFormat::B8G8R8A8 => "B8G8R8A8",
            RasterFormat::B8G8R8X8 => "B8G8R8X8",
            RasterFormat::A8B8G8R8 => "A8B8G8R8",
            RasterFormat::R16G16Float => "R16G16_FLOAT",
            RasterFormat::R32G32Float => "R32G32_FLOAT",
            RasterFormat::R32Float => "R32_FLOAT",
            RasterFormat::R16Float => "R16_FLOAT",
            RasterFormat::R8Unorm => "R8_UNORM",
            RasterFormat::A8 => "A8",
        }
    }
}

impl Display for RasterFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.name())
    }
}

impl FromStr for RasterFormat {
    type Err = String;

    /// Accepts the host name (case-insensitive) or a short alias such as
    /// `rgba8`, `bgra8`, `abgr8`, `rgba16f`, `rgb32f`, `rgba32f`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        let alias = match normalized.as_str() {
            "RGBA8" => Some(RasterFormat::R8G8B8A8Unorm),
            "BGRA8" => Some(RasterFormat::B8G8R8A8),
            "ABGR8" => Some(RasterFormat::A8B8G8R8),
            "RGBA16F" => Some(RasterFormat::R16G16B16A16Float),
            "RGB32F" => Some(RasterFormat::R32G32B32Float),
            "RGBA32F" => Some(RasterFormat::R32G32B32A32Float),
            "R32F" => Some(RasterFormat::R32Float),
            "DEPTH" => Some(RasterFormat::D24S8),
            _ => None,
        };
        if let Some(format) = alias {
            return Ok(format);
        }
        let trimmed = normalized.trim_start_matches('K');
        RasterFormat::ALL
            .iter()
            .copied()
            .find(|format| format.name() == trimmed)
            .ok_or_else(|| format!("unknown raster format: {s}"))
    }
}

/// Sample type written to the output image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    /// 8-bit unsigned integer.
    UInt8,
    /// 16-bit IEEE half float.
    Half,
    /// 32-bit IEEE float.
    Float,
}

impl ComponentType {
    /// Size of one sample in bytes.
    pub const fn bytes(self) -> usize {
        match self {
            ComponentType::UInt8 => 1,
            ComponentType::Half => 2,
            ComponentType::Float => 4,
        }
    }
}

impl Display for ComponentType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            ComponentType::UInt8 => "uint8",
            ComponentType::Half => "half",
            ComponentType::Float => "float",
        })
    }
}

/// Image container a frame is written as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerFormat {
    /// OpenEXR.
    Exr,
    /// Maya IFF.
    Iff,
}

impl ContainerFormat {
    /// File extension including the leading dot.
    pub const fn extension(self) -> &'static str {
        match self {
            ContainerFormat::Exr => ".exr",
            ContainerFormat::Iff => ".iff",
        }
    }
}

/// One row of the raster format table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatMapping {
    /// Output container, which determines the file extension.
    pub container: ContainerFormat,
    /// Sample type of the written image.
    pub component: ComponentType,
    /// Number of channels written.
    pub channels: u8,
}

impl FormatMapping {
    /// Bytes per pixel of the written image.
    pub const fn bytes_per_pixel(&self) -> usize {
        self.component.bytes() * self.channels as usize
    }
}

#[cfg(test)]
mod tests {
    use super::{ComponentType, ContainerFormat, RasterFormat};

    #[test]
    fn mapped_formats_match_source_pixel_size() {
        for format in RasterFormat::ALL {
            if let Some(mapping) = format.mapping() {
                assert_eq!(
                    mapping.bytes_per_pixel(),
                    format.bytes_per_pixel(),
                    "{format} must be transcoded without resampling",
                );
            }
        }
    }

    #[test]
    fn exactly_six_formats_are_capturable() {
        let mapped = RasterFormat::ALL
            .iter()
            .filter(|format| format.mapping().is_some())
            .count();
        assert_eq!(mapped, 6);
    }

    #[test]
    fn parse_aliases_and_host_names() {
        assert_eq!("rgba8".parse::<RasterFormat>().unwrap(), RasterFormat::R8G8B8A8Unorm);
        assert_eq!(
            "kR16G16B16A16_FLOAT".parse::<RasterFormat>().unwrap(),
            RasterFormat::R16G16B16A16Float,
        );
        assert_eq!("a8b8g8r8".parse::<RasterFormat>().unwrap(), RasterFormat::A8B8G8R8);
        assert!("yuv420".parse::<RasterFormat>().is_err());
    }

    #[test]
    fn names_round_trip() {
        for format in RasterFormat::ALL {
            assert_eq!(format.name().parse::<RasterFormat>().unwrap(), format);
        }
    }

    #[test]
    fn extensions_carry_leading_dot() {
        assert_eq!(ContainerFormat::Exr.extension(), ".exr");
        assert_eq!(ContainerFormat::Iff.extension(), ".iff");
        assert_eq!(ComponentType::Half.bytes(), 2);
    }
}
