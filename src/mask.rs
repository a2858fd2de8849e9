use core::fmt::Debug;

use crate::error::{CodecError, Result};

/// A `width` x `height` grid of on/off pixels, stored row-major with the top row first.
///
/// `true` is foreground: a pixel that was darker than the binarization threshold.
#[derive(Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl Debug for BinaryMask {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BinaryMask")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("set #", &self.count_set())
            .finish()
    }
}

impl BinaryMask {
    /// An all-background mask
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width as usize * height as usize],
        }
    }

    /// Wraps row-major `bits`, which must hold exactly `width * height` entries.
    pub fn from_bits(width: u32, height: u32, bits: Vec<bool>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if bits.len() != expected {
            return Err(CodecError::InvalidFrame(format!(
                "mask of {width}x{height} needs {expected} bits, got {}",
                bits.len()
            )));
        }

        Ok(Self {
            width,
            height,
            bits,
        })
    }

    pub(crate) fn from_raw_parts(width: u32, height: u32, bits: Vec<bool>) -> Self {
        debug_assert_eq!(bits.len(), width as usize * height as usize);
        Self {
            width,
            height,
            bits,
        }
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

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    fn idx(&self, x: u32, y: u32) -> Option<usize> {
        if x < self.width && y < self.height {
            Some(y as usize * self.width as usize + x as usize)
        } else {
            None
        }
    }

    /// Out of bounds reads are background.
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.idx(x, y).map(|i| self.bits[i]).unwrap_or(false)
    }

    /// Out of bounds writes are dropped.
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        if let Some(i) = self.idx(x, y) {
            self.bits[i] = value;
        }
    }

    pub fn clear(&mut self) {
        self.bits.fill(false);
    }

    pub fn count_set(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    /// Row-major view of every pixel
    pub fn as_bits(&self) -> &[bool] {
        &self.bits
    }

    /// Row-major iterator over every pixel
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.bits.iter().copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[bool]> + '_ {
        self.bits.chunks(self.width.max(1) as usize)
    }
}
