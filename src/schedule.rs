//! Fixed-rate frame advance for playback.
//!
//! Decoding happens once, up front: [`Playback`] owns the materialized frames and a
//! [`FrameClock`] that turns wall-clock deltas into "move forward N frames".

use std::time::Duration;

use log::trace;

use crate::error::{CodecError, Result};

/// Playback rate the streams are authored for.
pub const DEFAULT_FPS: u32 = 30;

/// What to do when a single tick covers more than one frame interval.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum AdvancePolicy {
    /// Advance once per whole interval that has built up, so playback keeps pace with the
    /// wall clock even when ticks are slow.
    #[default]
    CatchUp,

    /// Advance at most once per tick. Leftover time stays in the accumulator, so slow ticks
    /// make playback run slow instead of skipping frames.
    Single,
}

/// Elapsed-time accumulator with a fixed frame interval.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameClock {
    interval: Duration,
    accumulator: Duration,
    policy: AdvancePolicy,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(DEFAULT_FPS)
    }
}

impl FrameClock {
    /// A clock that advances `fps` times per second. `0` is treated as `1`.
    pub fn new(fps: u32) -> Self {
        Self::with_interval(Duration::from_secs(1) / fps.max(1))
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_nanos(1)),
            accumulator: Duration::ZERO,
            policy: AdvancePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: AdvancePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn policy(&self) -> AdvancePolicy {
        self.policy
    }

    /// Time banked towards the next advance
    pub fn accumulated(&self) -> Duration {
        self.accumulator
    }

    /// Adds `delta` to the accumulator and returns how many frames to advance.
    pub fn tick(&mut self, delta: Duration) -> usize {
        self.accumulator += delta;

        let whole = self.accumulator.as_nanos() / self.interval.as_nanos();
        let advance = match self.policy {
            AdvancePolicy::CatchUp => whole,
            AdvancePolicy::Single => whole.min(1),
        };

        // Same as subtracting the interval `advance` times
        let spent = self.interval.as_nanos() * advance;
        self.accumulator -= Duration::from_nanos(spent as u64);

        advance as usize
    }

    pub fn reset(&mut self) {
        self.accumulator = Duration::ZERO;
    }
}

/// An indexable, looping frame list driven by a [`FrameClock`].
#[derive(Clone, Debug)]
pub struct Playback<T> {
    frames: Vec<T>,
    index: usize,
    loops: usize,
    clock: FrameClock,
}

impl<T> Playback<T> {
    pub fn new(frames: Vec<T>, clock: FrameClock) -> Result<Self> {
        if frames.is_empty() {
            return Err(CodecError::EmptyPlayback);
        }

        Ok(Self {
            frames,
            index: 0,
            loops: 0,
            clock,
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[T] {
        &self.frames
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Index of the frame currently on screen
    pub fn index(&self) -> usize {
        self.index
    }

    /// How many times playback has wrapped from the last frame back to the first
    pub fn loops_completed(&self) -> usize {
        self.loops
    }

    pub fn current(&self) -> &T {
        &self.frames[self.index]
    }

    /// Moves forward `n` frames, wrapping past the end.
    pub fn advance(&mut self, n: usize) {
        let len = self.frames.len();
        let next = self.index + n;
        self.loops += next / len;
        self.index = next % len;
    }

    /// Feeds `delta` of wall-clock time in and returns the frame to show.
    pub fn tick(&mut self, delta: Duration) -> &T {
        let n = self.clock.tick(delta);
        if n > 0 {
            self.advance(n);
            trace!("Advanced {n} frames to {}", self.index);
        }
        self.current()
    }

    /// Back to frame 0 with an empty accumulator.
    pub fn rewind(&mut self) {
        self.index = 0;
        self.loops = 0;
        self.clock.reset();
    }

    pub fn into_frames(self) -> Vec<T> {
        self.frames
    }
}

#[cfg(feature = "decoder")]
impl Playback<crate::decoder::DecodedFrame> {
    /// Decodes the whole stream once, then plays it back.
    pub fn from_decoder<R: std::io::Read>(
        decoder: crate::decoder::VideoDecoder<R>,
        clock: FrameClock,
    ) -> Result<Self> {
        Self::new(decoder.decode_all()?, clock)
    }
}

#[cfg(test)]
mod t {
    use super::*;

    use pretty_assertions::assert_eq;

    const FRAME: Duration = Duration::from_millis(10);

    #[test]
    fn check_default_rate() {
        let clock = FrameClock::default();
        assert_eq!(clock.interval(), Duration::from_secs(1) / 30);
        assert_eq!(clock.policy(), AdvancePolicy::CatchUp);
    }

    #[test]
    fn check_accumulates_until_interval() {
        let mut clock = FrameClock::with_interval(FRAME);
        assert_eq!(clock.tick(Duration::from_millis(4)), 0);
        assert_eq!(clock.tick(Duration::from_millis(4)), 0);
        assert_eq!(clock.tick(Duration::from_millis(4)), 1);
        assert_eq!(clock.accumulated(), Duration::from_millis(2));
    }

    #[test]
    fn check_catch_up() {
        let mut clock = FrameClock::with_interval(FRAME);
        assert_eq!(clock.tick(Duration::from_millis(35)), 3);
        assert_eq!(clock.accumulated(), Duration::from_millis(5));
    }

    #[test]
    fn check_single_step() {
        let mut clock = FrameClock::with_interval(FRAME).with_policy(AdvancePolicy::Single);
        assert_eq!(clock.tick(Duration::from_millis(35)), 1);
        assert_eq!(clock.accumulated(), Duration::from_millis(25));

        // The backlog drains one frame per tick
        assert_eq!(clock.tick(Duration::ZERO), 1);
        assert_eq!(clock.tick(Duration::ZERO), 1);
        assert_eq!(clock.tick(Duration::ZERO), 0);
        assert_eq!(clock.accumulated(), Duration::from_millis(5));
    }

    #[test]
    fn check_zero_fps_is_clamped() {
        assert_eq!(FrameClock::new(0).interval(), Duration::from_secs(1));
        assert_eq!(
            FrameClock::with_interval(Duration::ZERO).interval(),
            Duration::from_nanos(1)
        );
    }

    #[test]
    fn check_playback_wraps() {
        let mut playback = Playback::new(vec!['a', 'b', 'c'], FrameClock::with_interval(FRAME))
            .unwrap();
        assert_eq!(*playback.current(), 'a');

        assert_eq!(*playback.tick(Duration::from_millis(9)), 'a');
        assert_eq!(*playback.tick(Duration::from_millis(1)), 'b');
        assert_eq!(*playback.tick(Duration::from_millis(10)), 'c');
        assert_eq!(*playback.tick(Duration::from_millis(10)), 'a');
        assert_eq!(playback.loops_completed(), 1);

        // Catch-up across the wrap point
        assert_eq!(*playback.tick(Duration::from_millis(50)), 'c');
        assert_eq!(playback.loops_completed(), 2);

        playback.rewind();
        assert_eq!(playback.index(), 0);
        assert_eq!(playback.clock().accumulated(), Duration::ZERO);
    }

    #[test]
    fn check_single_frame_loops_in_place() {
        let mut playback = Playback::new(vec![7], FrameClock::with_interval(FRAME)).unwrap();
        assert_eq!(*playback.tick(Duration::from_millis(30)), 7);
        assert_eq!(playback.loops_completed(), 3);
    }

    #[test]
    fn check_empty_playback() {
        let err = Playback::<u8>::new(vec![], FrameClock::default()).unwrap_err();
        assert!(matches!(err, CodecError::EmptyPlayback), "{err:?}");
    }
}
