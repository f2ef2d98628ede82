// SPDX-License-Identifier: GPL-3.0-or-later
use std::net;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use serde::Deserialize;

use super::source::{RepeatMode, ReplaySource, SegmentSource, UdpSource};
use super::{LINE_WIDTH, ROWS_PER_SEGMENT, SEGMENTS_PER_FRAME};

/// Dimensions and labelling of the output raster.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub(crate) struct FrameSettings {
    #[serde(default = "FrameSettings::default_width", alias = "imageWidth")]
    pub(crate) image_width: u32,

    #[serde(default = "FrameSettings::default_height", alias = "imageHeight")]
    pub(crate) image_height: u32,

    /// The label attached to every rendered frame.
    #[serde(default = "FrameSettings::default_frame_id", alias = "frameId")]
    pub(crate) frame_id: String,
}

impl FrameSettings {
    fn default_width() -> u32 {
        (LINE_WIDTH * 2) as u32
    }

    fn default_height() -> u32 {
        (ROWS_PER_SEGMENT * SEGMENTS_PER_FRAME) as u32
    }

    fn default_frame_id() -> String {
        "thermal_image".to_string()
    }

    pub(crate) fn validate(&self) -> anyhow::Result<()> {
        if self.image_width == 0 || self.image_height == 0 {
            bail!(
                "image dimensions must be non-zero (got {}x{})",
                self.image_width,
                self.image_height
            );
        }
        Ok(())
    }
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            image_width: Self::default_width(),
            image_height: Self::default_height(),
            frame_id: Self::default_frame_id(),
        }
    }
}

fn default_address() -> net::IpAddr {
    net::IpAddr::from([0u8, 0u8, 0u8, 0u8])
}

fn default_port() -> u16 {
    8080u16
}

fn default_frame_rate() -> f32 {
    9.0
}

/// Where frame segments come from.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub(crate) enum SourceSettings {
    Udp {
        /// The address to listen on. Defaults to all IPv4 interfaces.
        #[serde(default = "default_address")]
        address: net::IpAddr,

        #[serde(default = "default_port")]
        port: u16,

        /// Seconds to wait for a segment before giving up on the stream.
        #[serde(default)]
        idle_timeout: Option<f32>,
    },
    Replay {
        path: PathBuf,

        #[serde(default)]
        repeat: RepeatMode,

        #[serde(default = "default_frame_rate")]
        frame_rate: f32,
    },
}

impl SourceSettings {
    pub(crate) fn validate(&self) -> anyhow::Result<()> {
        match self {
            Self::Udp {
                idle_timeout: Some(timeout),
                ..
            } if !(timeout.is_finite() && *timeout > 0.0) => {
                bail!("idle_timeout must be a positive number of seconds")
            }
            Self::Replay { frame_rate, .. } if !(frame_rate.is_finite() && *frame_rate > 0.0) => {
                bail!("frame_rate must be positive")
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn create_source(&self) -> anyhow::Result<Box<dyn SegmentSource + Send>> {
        self.validate()?;
        Ok(match self {
            Self::Udp {
                address,
                port,
                idle_timeout,
            } => {
                let socket_address = net::SocketAddr::new(*address, *port);
                let idle_timeout = idle_timeout.map(Duration::from_secs_f32);
                Box::new(UdpSource::bind(socket_address, idle_timeout)?)
            }
            Self::Replay {
                path,
                repeat,
                frame_rate,
            } => Box::new(ReplaySource::open(path, *repeat, *frame_rate)?),
        })
    }
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self::Udp {
            address: default_address(),
            port: default_port(),
            idle_timeout: None,
        }
    }
}
