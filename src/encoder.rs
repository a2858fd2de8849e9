use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use log::{debug, trace, warn};

use crate::binarize::{binarize, RawFrame};
use crate::bits::BitPacker;
use crate::codec::*;
use crate::error::{CodecError, Result};
use crate::mask::BinaryMask;

/// Streams frames into the packed format as they arrive.
///
/// The header is written as soon as the encoder is created, so `frame_count` is whatever the
/// caller declared up front. Stopping early is fine: the decoder never trusts that field.
pub struct VideoEncoder<W: Write> {
    w: W,
    header: CodecHeader,
    frames_written: usize,
}

impl VideoEncoder<BufWriter<File>> {
    /// Creates (or truncates) `path` and writes the header to it.
    pub fn create(
        path: impl AsRef<Path>,
        width: u32,
        height: u32,
        frame_count: u32,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| CodecError::Unavailable {
            path: path.to_owned(),
            source,
        })?;
        debug!("Encoding to {}", path.display());

        Self::new(BufWriter::new(file), width, height, frame_count)
    }
}

impl<W: Write> VideoEncoder<W> {
    pub fn new(mut w: W, width: u32, height: u32, frame_count: u32) -> Result<Self> {
        // Never write a header that decoders would reject
        let header = CodecHeader::new(width, height, frame_count).validate()?;
        header.write_to(&mut w)?;
        debug!(
            "Wrote header: {}x{}, {} frames declared",
            header.width, header.height, header.frame_count
        );

        Ok(Self {
            w,
            header,
            frames_written: 0,
        })
    }

    pub fn header(&self) -> CodecHeader {
        self.header
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    /// Binarizes, packs, and appends one raw frame.
    pub fn push(&mut self, frame: &RawFrame<'_>) -> Result<()> {
        self.check_dims(frame.dims())?;
        let mask = binarize(frame);
        self.write_mask(&mask)
    }

    /// Packs and appends a frame that's already been binarized.
    pub fn push_mask(&mut self, mask: &BinaryMask) -> Result<()> {
        self.check_dims(mask.dims())?;
        self.write_mask(mask)
    }

    fn check_dims(&self, (got_width, got_height): (u32, u32)) -> Result<()> {
        if (got_width, got_height) != (self.header.width, self.header.height) {
            return Err(CodecError::DimensionMismatch {
                width: self.header.width,
                height: self.header.height,
                got_width,
                got_height,
            });
        }
        Ok(())
    }

    fn write_mask(&mut self, mask: &BinaryMask) -> Result<()> {
        let mut packed = Vec::with_capacity(self.header.bytes_per_frame());
        packed.extend(BitPacker::new(mask.iter()));
        debug_assert_eq!(packed.len(), self.header.bytes_per_frame());

        // No delimiter, no length prefix: frames are back to back
        self.w.write_all(&packed)?;
        self.frames_written += 1;
        trace!(
            "Frame {}: {} set pixels, {} bytes",
            self.frames_written,
            mask.count_set(),
            packed.len()
        );

        Ok(())
    }

    /// Flushes everything and hands back the writer.
    pub fn finish(mut self) -> Result<W> {
        self.w.flush()?;
        debug!(
            "Finished encoding {} frames ({} declared)",
            self.frames_written, self.header.frame_count
        );
        if self.frames_written != self.header.frame_count as usize {
            warn!(
                "Header declares {} frames but {} were written",
                self.header.frame_count, self.frames_written
            );
        }
        Ok(self.w)
    }
}

/// Encodes `frames` into an in-memory stream.
pub fn encode<'a>(
    frames: impl IntoIterator<Item = RawFrame<'a>>,
    width: u32,
    height: u32,
    frame_count: u32,
) -> Result<Vec<u8>> {
    let mut encoder = VideoEncoder::new(io::Cursor::new(vec![]), width, height, frame_count)?;
    for frame in frames {
        encoder.push(&frame)?;
    }

    Ok(encoder.finish()?.into_inner())
}
