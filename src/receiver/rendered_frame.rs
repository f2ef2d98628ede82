// SPDX-License-Identifier: GPL-3.0-or-later
use std::sync::Arc;
use std::time::SystemTime;

use crate::image_buffer::{ColorImage, ThermalImage};
use crate::render::RangeState;

/// Everything produced from one frame, ready to be handed to consumers.
#[derive(Clone, Debug)]
pub(crate) struct RenderedFrame {
    /// Counts successfully decoded frames, starting at 0.
    pub(crate) sequence: u64,

    pub(crate) timestamp: SystemTime,

    pub(crate) frame_id: Arc<str>,

    /// Degrees Celsius for every cell of the raster.
    pub(crate) temperatures: ThermalImage,

    /// The false-color rendering of the same raster.
    pub(crate) image: ColorImage,

    /// The intensity range the image was rendered with.
    pub(crate) range: RangeState,

    /// Lines cut short by a dropped sample in this frame.
    pub(crate) dropped_lines: u32,
}

impl RenderedFrame {
    pub(crate) fn width(&self) -> u32 {
        self.image.width()
    }

    pub(crate) fn height(&self) -> u32 {
        self.image.height()
    }

    /// The pixel format of [`RenderedFrame::image`], in the naming used by most image transports.
    pub(crate) fn encoding(&self) -> &'static str {
        "rgb8"
    }

    /// Bytes per row of [`RenderedFrame::image`].
    pub(crate) fn step(&self) -> u32 {
        self.width() * 3
    }

    /// The coldest and hottest temperatures in the frame, in that order.
    pub(crate) fn temperature_extremes(&self) -> Option<(f32, f32)> {
        self.temperatures.iter().fold(None, |extremes, t| {
            Some(match extremes {
                None => (*t, *t),
                Some((low, high)) => (low.min(*t), high.max(*t)),
            })
        })
    }
}

#[cfg(test)]
impl RenderedFrame {
    /// A white frame at 0°C.
    pub(crate) fn blank(sequence: u64, width: u32, height: u32) -> Self {
        Self {
            sequence,
            timestamp: SystemTime::now(),
            frame_id: Arc::from("thermal_image"),
            temperatures: ThermalImage::new(width, height),
            image: ColorImage::from_pixel(width, height, image::Rgb([255, 255, 255])),
            range: RangeState::new(27300, 31500).unwrap(),
            dropped_lines: 0,
        }
    }
}
