// SPDX-License-Identifier: GPL-3.0-or-later
use tracing::trace;

use crate::error::DegenerateRange;

/// Which of the intensity bounds follow the observed data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RangeMode {
    /// Both bounds stay at their configured values.
    Fixed,

    /// The lower bound tracks the coldest sample, the upper bound is fixed.
    AutoMin,

    /// The upper bound tracks the hottest sample, the lower bound is fixed.
    AutoMax,

    /// Both bounds track the data.
    Auto,
}

impl RangeMode {
    pub(crate) fn new(auto_min: bool, auto_max: bool) -> Self {
        match (auto_min, auto_max) {
            (false, false) => Self::Fixed,
            (true, false) => Self::AutoMin,
            (false, true) => Self::AutoMax,
            (true, true) => Self::Auto,
        }
    }

    pub(crate) fn tracks_min(&self) -> bool {
        matches!(self, Self::AutoMin | Self::Auto)
    }

    pub(crate) fn tracks_max(&self) -> bool {
        matches!(self, Self::AutoMax | Self::Auto)
    }
}

impl Default for RangeMode {
    fn default() -> Self {
        Self::Fixed
    }
}

/// The raw sensor values mapped to the ends of the palette.
///
/// `min` is always strictly less than `max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RangeState {
    min: u16,
    max: u16,
}

impl RangeState {
    pub(crate) fn new(min: u16, max: u16) -> Result<Self, DegenerateRange> {
        if min < max {
            Ok(Self { min, max })
        } else {
            Err(DegenerateRange { min, max })
        }
    }

    pub(crate) fn min(&self) -> u16 {
        self.min
    }

    pub(crate) fn max(&self) -> u16 {
        self.max
    }

    pub(crate) fn diff(&self) -> u16 {
        self.max - self.min
    }

    /// Intensity steps per raw unit.
    pub(crate) fn scale(&self) -> f32 {
        255.0 / f32::from(self.diff())
    }

    /// Map a raw sample onto `0..=255`.
    ///
    /// Samples outside of the range are clamped to it first. `min` maps to 0 and `max` to 255.
    pub(crate) fn intensity(&self, raw: u16) -> u8 {
        let clamped = raw.max(self.min).min(self.max);
        let offset = u32::from(clamped - self.min);
        (offset * 255 / u32::from(self.diff())) as u8
    }
}

/// Keeps the intensity range up to date, frame after frame.
#[derive(Clone, Debug)]
pub(crate) struct RangeTracker {
    mode: RangeMode,
    state: RangeState,
}

impl RangeTracker {
    pub(crate) fn new(mode: RangeMode, initial: RangeState) -> Self {
        Self {
            mode,
            state: initial,
        }
    }

    pub(crate) fn mode(&self) -> RangeMode {
        self.mode
    }

    pub(crate) fn state(&self) -> RangeState {
        self.state
    }

    /// Recompute the tracked bounds from the samples of a new frame.
    ///
    /// Zero samples carry no data and are ignored. If the new bounds would be degenerate (no
    /// samples, or every sample the same) the previous range is kept and an error returned.
    pub(crate) fn update<I>(&mut self, samples: I) -> Result<RangeState, DegenerateRange>
    where
        I: IntoIterator<Item = u16>,
    {
        if self.mode == RangeMode::Fixed {
            return Ok(self.state);
        }
        // Starting from the opposite extremes, so a frame without data ends up degenerate.
        let (observed_min, observed_max) = samples
            .into_iter()
            .filter(|sample| *sample != 0)
            .fold((u16::MAX, 0u16), |(low, high), sample| {
                (low.min(sample), high.max(sample))
            });
        let min = if self.mode.tracks_min() {
            observed_min
        } else {
            self.state.min
        };
        let max = if self.mode.tracks_max() {
            observed_max
        } else {
            self.state.max
        };
        self.state = RangeState::new(min, max)?;
        trace!(
            min = self.state.min,
            max = self.state.max,
            scale = self.state.scale(),
            "updated intensity range"
        );
        Ok(self.state)
    }
}
