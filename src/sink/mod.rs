// SPDX-License-Identifier: GPL-3.0-or-later
//! Consumers of rendered frames.
mod logger;
mod settings;
mod snapshot;

pub(crate) use logger::FrameLogger;
pub(crate) use settings::SnapshotSettings;
pub(crate) use snapshot::SnapshotWriter;
