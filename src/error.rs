use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::codec::CodecHeader;

pub type Result<T, E = CodecError> = core::result::Result<T, E>;

/// Everything that can go wrong while encoding, decoding, or playing a stream.
///
/// A short trailing frame is deliberately *not* in here: the decoder drops it and carries on.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Unable to open {path:?}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Stream ended after {got} bytes, a header needs {}", CodecHeader::SIZE)]
    TruncatedHeader { got: usize },

    #[error("Malformed header: {width}x{height} is not a valid frame size")]
    MalformedHeader { width: u32, height: u32 },

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Frame is {got_width}x{got_height}, but the stream is {width}x{height}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        got_width: u32,
        got_height: u32,
    },

    #[error("Cannot play back a stream with no complete frames")]
    EmptyPlayback,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[cfg(feature = "encoder")]
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}
