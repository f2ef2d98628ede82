// SPDX-License-Identifier: GPL-3.0-or-later
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use bytes::{BufMut, Bytes, BytesMut};
use futures::future::{self, FutureExt};
use futures::stream::{Stream, StreamExt, TryStreamExt};
use image::codecs::jpeg::JpegEncoder;
use tokio::task::spawn_blocking;
use tracing::{debug, trace};

use crate::image_buffer::ColorImage;
use crate::receiver::RenderedFrame;
use crate::util::flatten_join_result;

use super::SnapshotSettings;

pub(crate) fn encode_jpeg(image: &ColorImage) -> anyhow::Result<Bytes> {
    let mut jpeg_buf = BytesMut::new().writer();
    let mut encoder = JpegEncoder::new(&mut jpeg_buf);
    encoder
        .encode_image(image)
        .context("Unable to encode JPEG image")?;
    Ok(jpeg_buf.into_inner().freeze())
}

/// Replace the file at `path` with a JPEG of `image`.
///
/// The image is written next to the destination first and then moved over it, so readers never
/// see a partial file.
fn write_snapshot(path: &Path, image: &ColorImage) -> anyhow::Result<()> {
    let jpeg = encode_jpeg(image)?;
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, &jpeg)
        .with_context(|| format!("Unable to write snapshot to {}", temp_path.display()))?;
    fs::rename(&temp_path, path)
        .with_context(|| format!("Unable to move snapshot into {}", path.display()))?;
    trace!(path = %path.display(), size = jpeg.len(), "wrote snapshot");
    Ok(())
}

/// Save every `every`-th received frame as a JPEG.
#[derive(Clone, Debug)]
pub(crate) struct SnapshotWriter {
    path: PathBuf,
    every: usize,
}

impl SnapshotWriter {
    pub(crate) fn new(settings: &SnapshotSettings) -> anyhow::Result<Self> {
        settings.validate()?;
        Ok(Self {
            path: settings.path.clone(),
            every: settings.every as usize,
        })
    }

    pub(crate) async fn write(&self, frame: Arc<RenderedFrame>) -> anyhow::Result<()> {
        let path = self.path.clone();
        debug!(sequence = frame.sequence, path = %path.display(), "saving snapshot");
        spawn_blocking(move || write_snapshot(&path, &frame.image))
            .map(flatten_join_result)
            .await
    }

    /// Write snapshots from `frames` until the stream ends or a write fails.
    pub(crate) async fn run<St>(self, frames: St) -> anyhow::Result<()>
    where
        St: Stream<Item = Arc<RenderedFrame>>,
    {
        let every = self.every;
        frames
            .enumerate()
            .filter_map(move |(count, frame)| {
                future::ready(if count % every == 0 {
                    Some(Ok(frame))
                } else {
                    None
                })
            })
            .try_for_each(|frame| self.write(frame))
            .await
    }
}
