//! Captured photo types.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::core::StageIndex;

/// Pixel layout of a raw camera buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// RGBA 8-bit per channel.
    #[default]
    Rgba8,
    /// RGB 8-bit per channel.
    Rgb8,
    /// BGRA 8-bit per channel.
    Bgra8,
    /// BGR 8-bit per channel.
    Bgr8,
    /// Grayscale 8-bit.
    Gray8,
    /// YUV420 planar.
    Yuv420,
    /// NV12 (Y plane + interleaved UV).
    Nv12,
    /// Bayer RGGB mosaic, needs demosaicing.
    BayerRggb8,
}

impl PixelFormat {
    /// Bytes per pixel for packed formats, `None` for planar ones.
    #[must_use]
    pub const fn bytes_per_pixel(&self) -> Option<usize> {
        match self {
            Self::Rgba8 | Self::Bgra8 => Some(4),
            Self::Rgb8 | Self::Bgr8 => Some(3),
            Self::Gray8 | Self::BayerRggb8 => Some(1),
            Self::Yuv420 | Self::Nv12 => None,
        }
    }

    /// Returns true if the preprocessor can decode this layout.
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        matches!(
            self,
            Self::Rgba8 | Self::Rgb8 | Self::Bgra8 | Self::Bgr8 | Self::Gray8
        )
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rgba8 => "rgba8",
            Self::Rgb8 => "rgb8",
            Self::Bgra8 => "bgra8",
            Self::Bgr8 => "bgr8",
            Self::Gray8 => "gray8",
            Self::Yuv420 => "yuv420",
            Self::Nv12 => "nv12",
            Self::BayerRggb8 => "bayer_rggb8",
        };
        f.write_str(name)
    }
}

/// Clockwise rotation the sensor applied relative to upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorRotation {
    /// Already upright.
    #[default]
    Deg0,
    /// Rotate 90 degrees clockwise to correct.
    Deg90,
    /// Rotate 180 degrees to correct.
    Deg180,
    /// Rotate 270 degrees clockwise to correct.
    Deg270,
}

impl SensorRotation {
    /// Maps a degree value reported by a camera API.
    #[must_use]
    pub const fn from_degrees(degrees: u32) -> Option<Self> {
        match degrees % 360 {
            0 => Some(Self::Deg0),
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            _ => None,
        }
    }

    /// Returns true if correcting swaps width and height.
    #[must_use]
    pub const fn swaps_axes(&self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

/// An immutable captured image.
///
/// The pixel buffer is shared, so cloning a photo never copies pixels.
#[derive(Clone)]
pub struct Photo {
    index: StageIndex,
    width: u32,
    height: u32,
    format: PixelFormat,
    rotation: SensorRotation,
    pixels: Arc<[u8]>,
}

impl Photo {
    /// Creates a photo from a raw buffer.
    #[must_use]
    pub fn new(
        index: StageIndex,
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            index,
            width,
            height,
            format,
            rotation: SensorRotation::Deg0,
            pixels: pixels.into(),
        }
    }

    /// Creates an upright RGBA photo from a decoded image.
    #[must_use]
    pub fn from_image(index: StageIndex, image: &DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::new(index, width, height, PixelFormat::Rgba8, rgba.into_raw())
    }

    /// Sets the sensor rotation.
    #[must_use]
    pub fn with_rotation(mut self, rotation: SensorRotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Capture order index.
    #[must_use]
    pub fn index(&self) -> StageIndex {
        self.index
    }

    /// Width in pixels as captured.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels as captured.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel layout.
    #[must_use]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Sensor rotation.
    #[must_use]
    pub fn rotation(&self) -> SensorRotation {
        self.rotation
    }

    /// Raw pixel bytes.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

impl fmt::Debug for Photo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Photo")
            .field("index", &self.index)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("rotation", &self.rotation)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// A photo normalized for model input: packed RGB8 at the target size.
#[derive(Clone, PartialEq, Eq)]
pub struct PreparedFrame {
    /// The photo this frame came from.
    pub source: StageIndex,
    /// Frame width.
    pub width: u32,
    /// Frame height.
    pub height: u32,
    /// Packed RGB8 pixels, row-major.
    pub rgb: Vec<u8>,
}

impl fmt::Debug for PreparedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedFrame")
            .field("source", &self.source)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgb.len())
            .finish()
    }
}
