//! MSB-first bit packing.
//!
//! Bits are packed continuously: the first pixel lands in bit 7 of the first byte, the ninth
//! pixel in bit 7 of the second byte, and so on, ignoring row boundaries. Only the very last
//! byte is padded (with zeros in its low bits).

use core::iter::Fuse;

use crate::error::{CodecError, Result};
use crate::mask::BinaryMask;

/// Reads bit `i` of `byte`, counting from the most significant bit.
#[inline]
pub fn bit_at(byte: u8, i: u32) -> bool {
    (byte >> (7 - i)) & 1 == 1
}

/// Lazily packs a sequence of bits into bytes.
#[derive(Clone, Debug)]
pub struct BitPacker<I> {
    bits: Fuse<I>,
}

impl<I: Iterator<Item = bool>> BitPacker<I> {
    pub fn new(bits: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            bits: bits.into_iter().fuse(),
        }
    }
}

impl<I: Iterator<Item = bool>> Iterator for BitPacker<I> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        let mut byte = 0_u8;
        let mut n = 0;
        while n < 8 {
            let Some(bit) = self.bits.next() else {
                break;
            };
            if bit {
                byte |= 0x80 >> n;
            }
            n += 1;
        }

        // A partial byte is already left-aligned with zero padding
        (n > 0).then_some(byte)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (lo, hi) = self.bits.size_hint();
        (lo.div_ceil(8), hi.map(|hi| hi.div_ceil(8)))
    }
}

/// Lazily expands bytes back into bits, 8 per byte, MSB-first.
///
/// This knows nothing about padding: callers decide how many bits they actually want.
#[derive(Clone, Debug)]
pub struct BitUnpacker<I> {
    bytes: Fuse<I>,
    curr: u8,
    bit: u32,
}

impl<I: Iterator<Item = u8>> BitUnpacker<I> {
    pub fn new(bytes: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            bytes: bytes.into_iter().fuse(),
            curr: 0,
            bit: 8,
        }
    }
}

impl<I: Iterator<Item = u8>> Iterator for BitUnpacker<I> {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        if self.bit == 8 {
            self.curr = self.bytes.next()?;
            self.bit = 0;
        }

        let bit = bit_at(self.curr, self.bit);
        self.bit += 1;
        Some(bit)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let pending = (8 - self.bit) as usize;
        let (lo, hi) = self.bytes.size_hint();
        (
            lo.saturating_mul(8).saturating_add(pending),
            hi.and_then(|hi| hi.checked_mul(8)?.checked_add(pending)),
        )
    }
}

/// Packs a whole mask. Always produces `ceil(width * height / 8)` bytes.
pub fn pack(mask: &BinaryMask) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(mask.len().div_ceil(8));
    bytes.extend(BitPacker::new(mask.iter()));
    bytes
}

/// Rebuilds a `width` x `height` mask from the front of `bytes`, ignoring anything past
/// `width * height` bits (such as padding).
pub fn unpack(bytes: &[u8], width: u32, height: u32) -> Result<BinaryMask> {
    let n_bits = width as usize * height as usize;
    if bytes.len() * 8 < n_bits {
        return Err(CodecError::InvalidFrame(format!(
            "{width}x{height} needs {} packed bytes, got {}",
            n_bits.div_ceil(8),
            bytes.len()
        )));
    }

    let bits = BitUnpacker::new(bytes.iter().copied()).take(n_bits).collect();
    BinaryMask::from_bits(width, height, bits)
}
