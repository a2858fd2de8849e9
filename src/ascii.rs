//! Plain-text rendering of frames, handy for eyeballing a stream.
//!
//! One line per pixel row, top row first: `@` is foreground, `-` is background.

use std::io::{self, Write};

use crate::mask::BinaryMask;

pub const SET: char = '@';
pub const UNSET: char = '-';

pub fn render_mask(mask: &BinaryMask) -> String {
    let mut out = String::with_capacity((mask.width() as usize + 1) * mask.height() as usize);
    for row in mask.rows() {
        out.extend(row.iter().map(|&bit| if bit { SET } else { UNSET }));
        out.push('\n');
    }
    out
}

pub fn write_mask(w: &mut impl Write, mask: &BinaryMask) -> io::Result<()> {
    w.write_all(render_mask(mask).as_bytes())
}

#[cfg(feature = "decoder")]
mod frames {
    use super::*;

    use crate::decoder::DecodedFrame;

    /// Renders a decoded frame the right way up.
    pub fn render_frame(frame: &DecodedFrame) -> String {
        render_mask(&frame.to_mask())
    }

    pub fn write_frame(w: &mut impl Write, frame: &DecodedFrame) -> io::Result<()> {
        write_mask(w, &frame.to_mask())
    }
}

#[cfg(feature = "decoder")]
pub use frames::{render_frame, write_frame};
