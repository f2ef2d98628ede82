// SPDX-License-Identifier: GPL-3.0-or-later
//! Turning raw samples into temperatures and false-color images.
mod palette;
mod range;
mod renderer;
mod settings;

pub(crate) use palette::Palette;
pub(crate) use range::{RangeMode, RangeState, RangeTracker};
pub(crate) use renderer::FrameRenderer;
pub(crate) use settings::RenderSettings;
