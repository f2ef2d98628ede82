// SPDX-License-Identifier: GPL-3.0-or-later
mod decoder;
mod frame_receiver;
mod rendered_frame;

pub(crate) use decoder::FrameDecoder;
pub(crate) use frame_receiver::{FrameReceiver, ReceiverCommand};
pub(crate) use rendered_frame::RenderedFrame;
