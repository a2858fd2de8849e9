use std::fs::File;
use std::path::Path;
use std::time::Duration;

use crate::codec::CodecHeader;
use crate::error::{CodecError, Result};

/// What a stream holds, worked out from its header and length alone.
///
/// The header is always validated, so a frame never has zero pixels.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StreamInfo {
    header: CodecHeader,

    /// Bytes after the header
    payload_len: u64,
}

impl StreamInfo {
    pub fn new(header: CodecHeader, payload_len: u64) -> Result<Self> {
        Ok(Self {
            header: header.validate()?,
            payload_len,
        })
    }

    /// Inspects a stream on disk without decoding any pixels.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|source| CodecError::Unavailable {
            path: path.to_owned(),
            source,
        })?;

        let header = CodecHeader::read_from(&mut file)?;
        let len = file.metadata()?.len();
        Self::new(header, len.saturating_sub(CodecHeader::SIZE as u64))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = CodecHeader::read_from(&mut &bytes[..])?;
        Self::new(header, (bytes.len() - CodecHeader::SIZE) as u64)
    }

    pub fn header(&self) -> CodecHeader {
        self.header
    }

    /// Bytes after the header
    pub fn payload_len(&self) -> u64 {
        self.payload_len
    }

    fn pixels(&self) -> u64 {
        self.header.pixels_per_frame() as u64
    }

    /// How many complete frames a decoder will yield
    pub fn decodable_frames(&self) -> u64 {
        self.payload_len * 8 / self.pixels()
    }

    /// Bits after the last complete frame, which decoders drop
    pub fn trailing_bits(&self) -> u64 {
        self.payload_len * 8 % self.pixels()
    }

    /// Whether the advisory `frame_count` agrees with the payload. Nothing enforces this.
    pub fn frame_count_matches(&self) -> bool {
        u64::from(self.header.frame_count) == self.decodable_frames()
    }

    /// How long the decodable frames last at `fps`.
    pub fn duration(&self, fps: u32) -> Duration {
        Duration::from_secs_f64(self.decodable_frames() as f64 / f64::from(fps.max(1)))
    }

    /// Size of a whole stream holding `n_frames` frames of this shape, header included.
    pub fn encoded_len(header: &CodecHeader, n_frames: u64) -> u64 {
        CodecHeader::SIZE as u64 + n_frames * header.bytes_per_frame() as u64
    }
}
