use std::io::{self, Read, Write};

use bytemuck::{Pod, Zeroable};
use static_assertions::*;

use crate::error::{CodecError, Result};

/// The fixed header at the start of every stream.
///
/// On disk this is three little-endian `u32`s and nothing else: no magic, no version.
/// Everything after it is packed frame data, `width * height` bits per frame.
#[derive(Copy, Clone, Debug, Pod, Zeroable, PartialEq, Eq)]
#[repr(C)]
pub struct CodecHeader {
    /// Width of every frame, in pixels
    pub width: u32,

    /// Height of every frame, in pixels
    pub height: u32,

    /// How many frames the encoder was told to expect.
    ///
    /// This is advisory. It is never validated, and decoders derive the real count from the
    /// length of the stream. Partially written files rely on that, so don't "fix" it.
    pub frame_count: u32,
}
assert_eq_size!(CodecHeader, [u32; 3]);
assert_eq_size!(CodecHeader, [u8; 12]);

impl CodecHeader {
    pub const SIZE: usize = core::mem::size_of::<Self>();

    pub fn new(width: u32, height: u32, frame_count: u32) -> Self {
        Self {
            width,
            height,
            frame_count,
        }
    }

    /// Number of bits one frame occupies in the payload
    pub fn pixels_per_frame(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Number of bytes the encoder writes per frame, including the padded final byte
    pub fn bytes_per_frame(&self) -> usize {
        self.pixels_per_frame().div_ceil(8)
    }

    /// Rejects headers that can't describe a frame.
    pub fn validate(self) -> Result<Self> {
        if self.width == 0 || self.height == 0 {
            return Err(CodecError::MalformedHeader {
                width: self.width,
                height: self.height,
            });
        }
        Ok(self)
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let le = Self {
            width: self.width.to_le(),
            height: self.height.to_le(),
            frame_count: self.frame_count.to_le(),
        };
        bytemuck::cast(le)
    }

    /// Reads a header from the front of `bytes`, without validating it.
    pub fn read(bytes: &[u8]) -> Option<Self> {
        let raw: Self = bytemuck::pod_read_unaligned(bytes.get(..Self::SIZE)?);
        Some(Self {
            width: u32::from_le(raw.width),
            height: u32::from_le(raw.height),
            frame_count: u32::from_le(raw.frame_count),
        })
    }

    /// Reads and validates a header from a stream, consuming exactly [`Self::SIZE`] bytes.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let mut buf = [0_u8; Self::SIZE];
        let mut got = 0;
        while got < Self::SIZE {
            match r.read(&mut buf[got..]) {
                Ok(0) => return Err(CodecError::TruncatedHeader { got }),
                Ok(n) => got += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        match Self::read(&buf) {
            Some(header) => header.validate(),
            None => Err(CodecError::TruncatedHeader { got }),
        }
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.to_bytes())
    }
}
