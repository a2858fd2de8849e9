use core::fmt::Debug;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use log::{debug, trace};

use crate::bits::bit_at;
use crate::codec::*;
use crate::error::{CodecError, Result};
use crate::mask::BinaryMask;

const READ_CHUNK: usize = 8 * 1024;

/// The foreground pixels of one decoded frame.
///
/// Coordinates are `(x, y)` with `y` flipped: row `r` of the source image is reported as
/// `height - r`, so the top row is `y == height` and the bottom row is `y == 1`.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    id: usize,
    width: u32,
    height: u32,
    points: Vec<(u32, u32)>,
}

impl Debug for DecodedFrame {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DecodedFrame")
            .field("id", &self.id)
            .field("dims", &(self.width, self.height))
            .field("points #", &self.points.len())
            .finish()
    }
}

impl DecodedFrame {
    /// 1-based position of this frame in the stream
    pub fn id(&self) -> usize {
        self.id
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

    /// Every foreground coordinate, in stream order (top row first, left to right)
    pub fn points(&self) -> &[(u32, u32)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether `(x, y)`, in flipped coordinates, is foreground.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        self.points.contains(&(x, y))
    }

    /// Undoes the flip and rebuilds the frame as a mask.
    pub fn to_mask(&self) -> BinaryMask {
        let mut mask = BinaryMask::new(self.width, self.height);
        for &(x, y) in &self.points {
            mask.set(x, self.height - y, true);
        }
        mask
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    StreamingFrames,
    Done,
}

/// Forward-only reader over a packed stream.
///
/// The header is read (and validated) up front by [`VideoDecoder::new`]. After that, each call
/// to `next()` consumes exactly `width * height` bits and yields one frame. Bits are counted
/// continuously across the payload, so frame boundaries don't have to land on byte boundaries.
/// A final partial frame is dropped without complaint.
pub struct VideoDecoder<R> {
    r: R,
    header: CodecHeader,
    state: State,

    buf: Box<[u8]>,
    pos: usize,
    filled: usize,

    curr: u8,
    bit: u32,
    frame_num: usize,
}

impl<R> Debug for VideoDecoder<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VideoDecoder")
            .field("header", &self.header)
            .field("state", &self.state)
            .field("frame_num", &self.frame_num)
            .finish()
    }
}

impl VideoDecoder<File> {
    /// Opens a stream on disk. The file is closed when the decoder is dropped.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| CodecError::Unavailable {
            path: path.to_owned(),
            source,
        })?;
        debug!("Decoding from {}", path.display());

        Self::new(file)
    }
}

impl<R: Read> VideoDecoder<R> {
    pub fn new(mut r: R) -> Result<Self> {
        let header = CodecHeader::read_from(&mut r)?;
        debug!(
            "Read header: {}x{}, {} frames declared",
            header.width, header.height, header.frame_count
        );

        Ok(Self {
            r,
            header,
            state: State::StreamingFrames,
            buf: vec![0; READ_CHUNK].into_boxed_slice(),
            pos: 0,
            filled: 0,
            curr: 0,
            bit: 8,
            frame_num: 0,
        })
    }

    pub fn header(&self) -> CodecHeader {
        self.header
    }

    pub fn is_finished(&self) -> bool {
        self.state == State::Done
    }

    /// How many complete frames have been yielded so far
    pub fn frames_decoded(&self) -> usize {
        self.frame_num
    }

    /// Decodes every remaining complete frame.
    pub fn decode_all(self) -> Result<Vec<DecodedFrame>> {
        self.collect()
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        if self.pos == self.filled {
            self.filled = loop {
                match self.r.read(&mut self.buf) {
                    Ok(n) => break n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                }
            };
            self.pos = 0;

            if self.filled == 0 {
                return Ok(None);
            }
        }

        let byte = self.buf[self.pos];
        self.pos += 1;
        Ok(Some(byte))
    }

    fn next_frame(&mut self) -> Result<Option<DecodedFrame>> {
        let width = self.header.width as usize;
        let height = self.header.height as usize;
        let pixels = self.header.pixels_per_frame();

        let mut points = vec![];
        let mut bits_in_current_frame = 0;
        while bits_in_current_frame < pixels {
            if self.bit == 8 {
                let Some(byte) = self.next_byte()? else {
                    if bits_in_current_frame > 0 {
                        debug!(
                            "Dropping trailing partial frame ({bits_in_current_frame} of {pixels} bits)"
                        );
                    }
                    return Ok(None);
                };
                self.curr = byte;
                self.bit = 0;
            }

            if bit_at(self.curr, self.bit) {
                let x = bits_in_current_frame % width;
                let y = bits_in_current_frame / width;
                points.push((x as u32, (height - y) as u32));
            }

            self.bit += 1;
            bits_in_current_frame += 1;
        }

        self.frame_num += 1;
        trace!("Frame {}: {} set pixels", self.frame_num, points.len());

        Ok(Some(DecodedFrame {
            id: self.frame_num,
            width: self.header.width,
            height: self.header.height,
            points,
        }))
    }
}

impl<R: Read + Seek> VideoDecoder<R> {
    /// Starts over from the first frame.
    ///
    /// Streams are only restartable from the top; there's no seeking to a frame.
    pub fn reset(&mut self) -> Result<()> {
        self.r.seek(SeekFrom::Start(CodecHeader::SIZE as u64))?;
        self.pos = 0;
        self.filled = 0;
        self.curr = 0;
        self.bit = 8;
        self.frame_num = 0;
        self.state = State::StreamingFrames;
        Ok(())
    }
}

impl<R: Read> Iterator for VideoDecoder<R> {
    type Item = Result<DecodedFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == State::Done {
            return None;
        }

        match self.next_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.state = State::Done;
                debug!("Finished decoding {} frames", self.frame_num);
                None
            }
            Err(e) => {
                self.state = State::Done;
                Some(Err(e))
            }
        }
    }
}

/// Decodes every complete frame of an in-memory stream.
pub fn decode(bytes: &[u8]) -> Result<Vec<DecodedFrame>> {
    VideoDecoder::new(bytes)?.decode_all()
}
