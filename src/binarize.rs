use crate::error::{CodecError, Result};
use crate::mask::BinaryMask;

/// Intensities strictly below this are foreground.
pub const THRESHOLD: u8 = 128;

/// Pixels this dark are set in the mask.
#[inline]
pub fn is_foreground(intensity: u8) -> bool {
    intensity < THRESHOLD
}

/// A borrowed, already-decoded frame: `channels` interleaved 8-bit samples per pixel,
/// row-major, top row first.
///
/// Only the first channel of each pixel is ever looked at.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RawFrame<'a> {
    width: u32,
    height: u32,
    channels: usize,
    data: &'a [u8],
}

impl<'a> RawFrame<'a> {
    pub fn new(width: u32, height: u32, channels: usize, data: &'a [u8]) -> Result<Self> {
        if width == 0 || height == 0 || channels == 0 {
            return Err(CodecError::InvalidFrame(format!(
                "{width}x{height} with {channels} channels has no pixels"
            )));
        }

        let expected = width as usize * height as usize * channels;
        if data.len() != expected {
            return Err(CodecError::InvalidFrame(format!(
                "{width}x{height}x{channels} needs {expected} bytes, got {}",
                data.len()
            )));
        }

        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// A single-channel (grayscale) frame
    pub fn gray(width: u32, height: u32, data: &'a [u8]) -> Result<Self> {
        Self::new(width, height, 1, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dims(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// First-channel intensity of every pixel, row-major
    pub fn intensities(&self) -> impl Iterator<Item = u8> + 'a {
        self.data.iter().step_by(self.channels).copied()
    }
}

/// Classifies every pixel of `frame` against [`THRESHOLD`].
pub fn binarize(frame: &RawFrame<'_>) -> BinaryMask {
    // RawFrame::new already checked the sample count
    let bits = frame.intensities().map(is_foreground).collect();
    BinaryMask::from_raw_parts(frame.width, frame.height, bits)
}

#[cfg(feature = "encoder")]
mod images {
    use image::{DynamicImage, GrayImage};

    use super::*;

    impl<'a> TryFrom<&'a GrayImage> for RawFrame<'a> {
        type Error = CodecError;

        fn try_from(img: &'a GrayImage) -> Result<Self> {
            RawFrame::gray(img.width(), img.height(), img.as_raw())
        }
    }

    /// Binarizes a decoded image using its first channel.
    ///
    /// 8-bit images are read in place; anything else is converted to 8-bit RGBA first.
    pub fn binarize_image(img: &DynamicImage) -> Result<BinaryMask> {
        let (width, height) = (img.width(), img.height());
        let channels = img.color().channel_count() as usize;

        let frame = match img {
            DynamicImage::ImageLuma8(buf) => RawFrame::new(width, height, channels, buf.as_raw())?,
            DynamicImage::ImageLumaA8(buf) => RawFrame::new(width, height, channels, buf.as_raw())?,
            DynamicImage::ImageRgb8(buf) => RawFrame::new(width, height, channels, buf.as_raw())?,
            DynamicImage::ImageRgba8(buf) => RawFrame::new(width, height, channels, buf.as_raw())?,
            other => {
                let rgba = other.to_rgba8();
                return Ok(binarize(&RawFrame::new(width, height, 4, rgba.as_raw())?));
            }
        };

        Ok(binarize(&frame))
    }
}

#[cfg(feature = "encoder")]
pub use images::binarize_image;
