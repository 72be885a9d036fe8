//! Host animation time.
//!
//! [`Time`] is a frame-unit time value as handed out by the host's
//! animation control. Captures step through time one unit at a time, so
//! [`FrameSteps`] derives every frame from the start value rather than by
//! accumulating increments.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// A point on the host's animation timeline, in frames.
///
/// `Display` renders the shortest decimal form of the value, which is the
/// frame number embedded in output file names (`1` for frame one,
/// `12.5` for a sub-frame).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Time(f64);

impl Time {
    /// Create a time value from a frame number.
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    /// The frame number as a floating-point value.
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Iterate the inclusive range `[self, end]` in steps of one frame.
    ///
    /// Yields nothing when `self > end`.
    pub fn frames_through(self, end: Time) -> FrameSteps {
        FrameSteps {
            start: self,
            index: 0,
            count: frame_count(self, end),
        }
    }
}

impl From<f64> for Time {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl From<i32> for Time {
    fn from(value: i32) -> Self {
        Self(f64::from(value))
    }
}

impl Display for Time {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Time {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<f64>()
            .map_err(|error| format!("not a time value ({error})"))?;
        if !value.is_finite() {
            return Err("time value must be finite".to_string());
        }
        Ok(Self(value))
    }
}

/// Widest range, in frames, whose every step is an exact `f64`.
pub const MAX_FRAME_SPAN: f64 = 9_007_199_254_740_992.0;

/// Number of frames in the inclusive range `[start, end]` at a step of one.
///
/// Saturates at `u64::MAX` for ranges too wide to count.
pub fn frame_count(start: Time, end: Time) -> u64 {
    if !(start <= end) {
        return 0;
    }
    ((end.0 - start.0).floor() as u64).saturating_add(1)
}

/// Iterator over the frames of an inclusive range.
///
/// Created by [`Time::frames_through`].
#[derive(Debug, Clone)]
pub struct FrameSteps {
    start: Time,
    index: u64,
    count: u64,
}

impl Iterator for FrameSteps {
    type Item = Time;

    fn next(&mut self) -> Option<Time> {
        if self.index >= self.count {
            return None;
        }
        let time = Time(self.start.0 + self.index as f64);
        self.index += 1;
        Some(time)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.count - self.index) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FrameSteps {}
