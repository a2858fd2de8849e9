//! A 1-bit-per-pixel video codec.
//!
//! Frames are thresholded into foreground/background masks, packed 8 pixels to a byte
//! (MSB-first, continuous across rows), and written back to back after a 12-byte header.
//! Decoding walks the bits again and yields the foreground coordinates of each frame.

pub mod ascii;
pub mod binarize;
pub mod bits;
pub mod codec;
pub mod error;
pub mod info;
pub mod mask;
pub mod schedule;

pub use binarize::{binarize, RawFrame, THRESHOLD};
pub use bits::{pack, unpack, BitPacker, BitUnpacker};
pub use codec::CodecHeader;
pub use error::{CodecError, Result};
pub use info::StreamInfo;
pub use mask::BinaryMask;
pub use schedule::{AdvancePolicy, FrameClock, Playback, DEFAULT_FPS};

#[cfg(feature = "encoder")]
pub mod encoder;
#[cfg(feature = "encoder")]
pub use encoder::{encode, VideoEncoder};

#[cfg(feature = "decoder")]
pub mod decoder;
#[cfg(feature = "decoder")]
pub use decoder::{decode, DecodedFrame, VideoDecoder};
