// SPDX-License-Identifier: GPL-3.0-or-later
use std::fs;
use std::io;
use std::path::Path;

use anyhow::Context as _;
use serde::Deserialize;
use tracing::info;

mod cli;

use crate::frame::{FrameSettings, SourceSettings};
use crate::render::RenderSettings;
use crate::sink::SnapshotSettings;
pub(crate) use cli::Args;

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub(crate) struct Settings {
    /// Where frame segments are received from.
    #[serde(default)]
    pub(crate) source: SourceSettings,

    /// The size and label of the decoded frames.
    #[serde(default)]
    pub(crate) frame: FrameSettings,

    /// Intensity range and palette.
    #[serde(default)]
    pub(crate) render: RenderSettings,

    /// Periodic JPEG snapshots, disabled unless given.
    #[serde(default)]
    pub(crate) snapshot: Option<SnapshotSettings>,
}

impl Settings {
    /// Load settings from a TOML file.
    ///
    /// A missing file isn't an error, the defaults are used instead.
    pub(crate) fn from_path(path: &Path) -> anyhow::Result<Self> {
        let settings = match fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("Unable to parse config file {}", path.display()))?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "config file not found, using defaults");
                Self::default()
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Unable to read config file {}", path.display()))
            }
        };
        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn validate(&self) -> anyhow::Result<()> {
        self.source
            .validate()
            .context("Invalid source settings")?;
        self.frame.validate().context("Invalid frame settings")?;
        self.render.validate().context("Invalid render settings")?;
        if let Some(snapshot) = &self.snapshot {
            snapshot.validate().context("Invalid snapshot settings")?;
        }
        Ok(())
    }
}
