// SPDX-License-Identifier: GPL-3.0-or-later
use image::{ImageBuffer, Luma, Rgb};

/// Images where each point is a temperature in degrees Celsius.
pub type ThermalImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// False-color images, packed RGB8 rows with no padding.
pub type ColorImage = ImageBuffer<Rgb<u8>, Vec<u8>>;
