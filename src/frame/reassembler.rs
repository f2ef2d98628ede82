// SPDX-License-Identifier: GPL-3.0-or-later
use tracing::trace;

use crate::error::TransportError;

use super::source::SegmentSource;
use super::{
    RawFrame, LINE_HEADER_LEN, LINE_LEN, LINE_WIDTH, ROWS_PER_SEGMENT, SAMPLES_PER_SEGMENT,
    SEGMENTS_PER_FRAME, SEGMENT_LEN,
};

/// A single pixel sample placed in the output raster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) row: usize,
    pub(crate) column: usize,
    pub(crate) value: u16,
}

/// Collects the segments of a frame and places their samples in a raster.
#[derive(Debug)]
pub(crate) struct Reassembler {
    frame: RawFrame,
    width: usize,
    height: usize,
}

impl Reassembler {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self {
            frame: RawFrame::new(),
            width: width as usize,
            height: height as usize,
        }
    }

    /// Read the next four segments from `source`.
    ///
    /// Any segment shorter than [`SEGMENT_LEN`] invalidates the whole frame. All four segments
    /// are still read, so the next frame starts on a segment boundary. Only the first short
    /// segment is reported.
    pub(crate) fn receive<S>(&mut self, source: &mut S) -> Result<&RawFrame, TransportError>
    where
        S: SegmentSource + ?Sized,
    {
        let mut short = None;
        for segment in 0..SEGMENTS_PER_FRAME {
            let received = source.read_segment(self.frame.segment_mut(segment))?;
            if received != SEGMENT_LEN && short.is_none() {
                short = Some(TransportError::ShortSegment { segment, received });
            }
        }
        match short {
            Some(err) => Err(err),
            None => {
                trace!("received complete frame");
                Ok(&self.frame)
            }
        }
    }

    /// The raster cells of the most recently received frame.
    pub(crate) fn cells(&self) -> Cells<'_> {
        Cells::new(&self.frame, self.width, self.height)
    }
}

/// Iterator over the raster cells of a frame.
///
/// A zero sample means the sensor dropped the rest of that line. The remainder of the line is
/// skipped (and counted), leaving those cells untouched in whatever is consuming the cells.
#[derive(Debug)]
pub(crate) struct Cells<'a> {
    frame: &'a RawFrame,
    width: usize,
    height: usize,
    segment: usize,
    index: usize,
    dropped_lines: u32,
}

impl<'a> Cells<'a> {
    pub(crate) fn new(frame: &'a RawFrame, width: usize, height: usize) -> Self {
        Self {
            frame,
            width,
            height,
            segment: 0,
            index: 0,
            dropped_lines: 0,
        }
    }

    /// The number of lines cut short by a zero sample so far.
    pub(crate) fn dropped_lines(&self) -> u32 {
        self.dropped_lines
    }
}

impl<'a> Iterator for Cells<'a> {
    type Item = Cell;

    fn next(&mut self) -> Option<Self::Item> {
        while self.segment < SEGMENTS_PER_FRAME {
            let index = self.index;
            if index >= SAMPLES_PER_SEGMENT {
                self.segment += 1;
                self.index = 0;
                continue;
            }
            let line_position = index % LINE_LEN;
            if line_position < LINE_HEADER_LEN {
                self.index += LINE_HEADER_LEN - line_position;
                continue;
            }
            let value = self.frame.sample(self.segment, index);
            if value == 0 {
                self.dropped_lines += 1;
                self.index = (index / LINE_LEN + 1) * LINE_LEN;
                continue;
            }
            self.index += 1;
            // Even lines are the left half of a row, odd lines the right half.
            let column = line_position - LINE_HEADER_LEN
                + LINE_WIDTH * ((index % (2 * LINE_LEN)) / LINE_LEN);
            let row = index / (2 * LINE_LEN) + ROWS_PER_SEGMENT * self.segment;
            if row < self.height && column < self.width {
                return Some(Cell { row, column, value });
            }
        }
        None
    }
}
