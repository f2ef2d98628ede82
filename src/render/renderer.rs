// SPDX-License-Identifier: GPL-3.0-or-later
use image::Luma;
use tracing::instrument;

use crate::frame::Cell;
use crate::image_buffer::{ColorImage, ThermalImage};
use crate::temperature::celsius_from_raw;

use super::{Palette, RangeState};

/// Turns raster cells into temperatures and false-color pixels.
///
/// Both output images live as long as the renderer. Cells that aren't part of a frame keep
/// whatever they were last rendered as, and start out as 0°C and the lowest intensity color.
#[derive(Clone, Debug)]
pub(crate) struct FrameRenderer {
    palette: Palette,
    temperatures: ThermalImage,
    image: ColorImage,
}

impl FrameRenderer {
    pub(crate) fn new(width: u32, height: u32, palette: Palette) -> Self {
        let image = ColorImage::from_pixel(width, height, palette.color(0));
        Self {
            palette,
            temperatures: ThermalImage::new(width, height),
            image,
        }
    }

    /// Render `cells` using the intensity bounds in `range`.
    ///
    /// Returns the number of cells updated.
    #[instrument(level = "trace", skip(self, cells))]
    pub(crate) fn render<I>(&mut self, cells: I, range: &RangeState) -> usize
    where
        I: IntoIterator<Item = Cell>,
    {
        let mut rendered = 0;
        for Cell { row, column, value } in cells {
            let (x, y) = (column as u32, row as u32);
            // Temperatures always come from the unclamped value.
            self.temperatures
                .put_pixel(x, y, Luma([celsius_from_raw(value)]));
            self.image
                .put_pixel(x, y, self.palette.color(range.intensity(value)));
            rendered += 1;
        }
        rendered
    }

    pub(crate) fn temperatures(&self) -> &ThermalImage {
        &self.temperatures
    }

    pub(crate) fn image(&self) -> &ColorImage {
        &self.image
    }

    pub(crate) fn palette(&self) -> &Palette {
        &self.palette
    }
}
