// SPDX-License-Identifier: GPL-3.0-or-later
//! Raw sensor frames and how they map onto the output raster.
//!
//! The sensor sends each frame as four segments of 9840 bytes. A segment is a run of big-endian
//! 16-bit samples, grouped into lines of 82 samples. The first two samples of every line are a
//! header, the remaining 80 are pixel values. Two consecutive lines make up one raster row (the
//! left and right halves), so each segment covers a band of 30 rows.
mod reassembler;
mod settings;
mod source;

pub(crate) use reassembler::{Cell, Reassembler};

#[cfg(test)]
pub(crate) use reassembler::Cells;
pub(crate) use settings::{FrameSettings, SourceSettings};
pub(crate) use source::SegmentSource;

#[cfg(test)]
pub(crate) use source::{RepeatMode, ReplaySource};

/// The number of segments making up a complete frame.
pub(crate) const SEGMENTS_PER_FRAME: usize = 4;

/// The size of a single segment in bytes.
pub(crate) const SEGMENT_LEN: usize = 9840;

/// The number of 16-bit samples in a segment (header samples included).
pub(crate) const SAMPLES_PER_SEGMENT: usize = SEGMENT_LEN / 2;

/// Samples per line, header included.
pub(crate) const LINE_LEN: usize = 82;

/// Header samples at the start of every line.
pub(crate) const LINE_HEADER_LEN: usize = 2;

/// Pixel samples per line, half of a raster row.
pub(crate) const LINE_WIDTH: usize = LINE_LEN - LINE_HEADER_LEN;

/// Raster rows covered by each segment.
pub(crate) const ROWS_PER_SEGMENT: usize = SAMPLES_PER_SEGMENT / (2 * LINE_LEN);

/// The bytes of one frame, as received from the sensor.
///
/// The buffer is allocated once and reused for every frame.
#[derive(Clone, PartialEq)]
pub(crate) struct RawFrame {
    data: Vec<u8>,
}

impl RawFrame {
    pub(crate) fn new() -> Self {
        Self {
            data: vec![0u8; SEGMENT_LEN * SEGMENTS_PER_FRAME],
        }
    }

    #[cfg(test)]
    pub(crate) fn segment(&self, segment: usize) -> &[u8] {
        let start = segment * SEGMENT_LEN;
        &self.data[start..start + SEGMENT_LEN]
    }

    pub(crate) fn segment_mut(&mut self, segment: usize) -> &mut [u8] {
        let start = segment * SEGMENT_LEN;
        &mut self.data[start..start + SEGMENT_LEN]
    }

    /// The sample at `index` within `segment`.
    pub(crate) fn sample(&self, segment: usize, index: usize) -> u16 {
        let offset = segment * SEGMENT_LEN + index * 2;
        u16::from_be_bytes([self.data[offset], self.data[offset + 1]])
    }
}

impl Default for RawFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawFrame")
            .field("len", &self.data.len())
            .finish()
    }
}
