//! Image preprocessing.
//!
//! Turns a raw captured [`Photo`] into a fixed-size RGB [`PreparedFrame`]:
//! decode the packed buffer, correct the sensor rotation, then resize
//! exactly to the target resolution.

mod photo;

pub use photo::{Photo, PixelFormat, PreparedFrame, SensorRotation};

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};

use crate::errors::PreprocessError;

/// Normalizes photos to a fixed frame size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePreprocessor {
    target_width: u32,
    target_height: u32,
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new(512, 512)
    }
}

impl ImagePreprocessor {
    /// Creates a preprocessor for the given target size.
    #[must_use]
    pub const fn new(target_width: u32, target_height: u32) -> Self {
        Self {
            target_width,
            target_height,
        }
    }

    /// Target frame size as `(width, height)`.
    #[must_use]
    pub const fn target(&self) -> (u32, u32) {
        (self.target_width, self.target_height)
    }

    /// Produces an upright, resized RGB copy of `photo`.
    pub fn preprocess(&self, photo: &Photo) -> Result<PreparedFrame, PreprocessError> {
        let decoded = decode(photo)?;
        let upright = match photo.rotation() {
            SensorRotation::Deg0 => decoded,
            SensorRotation::Deg90 => decoded.rotate90(),
            SensorRotation::Deg180 => decoded.rotate180(),
            SensorRotation::Deg270 => decoded.rotate270(),
        };
        let resized = upright
            .resize_exact(self.target_width, self.target_height, FilterType::Triangle)
            .to_rgb8();

        Ok(PreparedFrame {
            source: photo.index(),
            width: resized.width(),
            height: resized.height(),
            rgb: resized.into_raw(),
        })
    }
}

fn decode(photo: &Photo) -> Result<DynamicImage, PreprocessError> {
    let format = photo.format();
    if !format.is_supported() {
        return Err(PreprocessError::unsupported(format));
    }
    let bytes_per_pixel = format
        .bytes_per_pixel()
        .ok_or_else(|| PreprocessError::unsupported(format))?;

    let (width, height) = (photo.width(), photo.height());
    if width == 0 || height == 0 {
        return Err(PreprocessError::invalid_buffer(format!(
            "zero-sized photo {width}x{height}"
        )));
    }
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(bytes_per_pixel))
        .ok_or_else(|| PreprocessError::invalid_buffer("photo dimensions overflow"))?;
    if photo.pixels().len() != expected {
        return Err(PreprocessError::invalid_buffer(format!(
            "expected {expected} bytes for {width}x{height} {format}, got {}",
            photo.pixels().len()
        )));
    }

    let mut buffer = photo.pixels().to_vec();
    let image = match format {
        PixelFormat::Rgba8 => RgbaImage::from_raw(width, height, buffer).map(DynamicImage::ImageRgba8),
        PixelFormat::Rgb8 => RgbImage::from_raw(width, height, buffer).map(DynamicImage::ImageRgb8),
        PixelFormat::Bgra8 => {
            swap_red_blue(&mut buffer, 4);
            RgbaImage::from_raw(width, height, buffer).map(DynamicImage::ImageRgba8)
        }
        PixelFormat::Bgr8 => {
            swap_red_blue(&mut buffer, 3);
            RgbImage::from_raw(width, height, buffer).map(DynamicImage::ImageRgb8)
        }
        PixelFormat::Gray8 => GrayImage::from_raw(width, height, buffer).map(DynamicImage::ImageLuma8),
        PixelFormat::Yuv420 | PixelFormat::Nv12 | PixelFormat::BayerRggb8 => {
            return Err(PreprocessError::unsupported(format));
        }
    };

    image.ok_or_else(|| PreprocessError::invalid_buffer("buffer does not fit the declared dimensions"))
}

fn swap_red_blue(buffer: &mut [u8], stride: usize) {
    for pixel in buffer.chunks_exact_mut(stride) {
        pixel.swap(0, 2);
    }
}
