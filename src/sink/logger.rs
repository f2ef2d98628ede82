// SPDX-License-Identifier: GPL-3.0-or-later
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::UNIX_EPOCH;

use futures::Sink;
use tracing::{debug, info};

use crate::receiver::RenderedFrame;
use crate::temperature::Temperature;

/// Log a summary of every frame that comes through.
#[derive(Debug, Default)]
pub(crate) struct FrameLogger {
    frames: u64,
    dropped_lines: u64,
}

impl FrameLogger {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn log(&mut self, frame: &RenderedFrame) {
        if self.frames == 0 {
            info!(
                frame_id = %frame.frame_id,
                width = frame.width(),
                height = frame.height(),
                encoding = frame.encoding(),
                step = frame.step(),
                "first frame decoded"
            );
        }
        self.frames += 1;
        self.dropped_lines += u64::from(frame.dropped_lines);
        let timestamp = frame
            .timestamp
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        let (coldest, hottest) = frame.temperature_extremes().unwrap_or_default();
        debug!(
            sequence = frame.sequence,
            timestamp,
            range_min = %format_args!("{:#.2}", Temperature::from_raw(frame.range.min())),
            range_max = %format_args!("{:#.2}", Temperature::from_raw(frame.range.max())),
            coldest,
            hottest,
            dropped_lines = frame.dropped_lines,
            "frame"
        );
    }

    #[cfg(test)]
    pub(crate) fn frames(&self) -> u64 {
        self.frames
    }

    #[cfg(test)]
    pub(crate) fn dropped_lines(&self) -> u64 {
        self.dropped_lines
    }
}

impl Sink<Arc<RenderedFrame>> for FrameLogger {
    type Error = Infallible;

    fn poll_ready(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn start_send(mut self: Pin<&mut Self>, frame: Arc<RenderedFrame>) -> Result<(), Self::Error> {
        self.log(&frame);
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        info!(
            frames = self.frames,
            dropped_lines = self.dropped_lines,
            "frame logger closed"
        );
        Poll::Ready(Ok(()))
    }
}
