// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::PathBuf;

use anyhow::bail;
use serde::Deserialize;

fn default_every() -> u32 {
    30
}

/// Periodically save the latest rendered image as a JPEG.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub(crate) struct SnapshotSettings {
    /// Where the snapshot is written. It's replaced each time.
    pub(crate) path: PathBuf,

    /// Frames between snapshots.
    #[serde(default = "default_every")]
    pub(crate) every: u32,
}

impl SnapshotSettings {
    pub(crate) fn validate(&self) -> anyhow::Result<()> {
        if self.every == 0 {
            bail!("snapshot interval must be at least one frame");
        }
        Ok(())
    }
}
