// SPDX-License-Identifier: GPL-3.0-or-later
use std::convert::TryFrom;
use std::sync::{mpsc, Arc};

use anyhow::Context as _;
use tokio::sync::broadcast;
use tracing::{debug, info, info_span, warn};

use crate::error::TransportError;
use crate::frame::SegmentSource;
use crate::settings::Settings;

use super::{FrameDecoder, RenderedFrame};

#[derive(Debug)]
pub(crate) enum ReceiverCommand {
    /// Stop the receive loop before the next frame.
    Shutdown,
}

/// Receive, decode and publish frames.
///
/// This runs on its own thread, as reading segments blocks until the sensor sends them.
pub(crate) struct FrameReceiver {
    source: Box<dyn SegmentSource + Send>,
    decoder: FrameDecoder,
    frame_channel: broadcast::Sender<Arc<RenderedFrame>>,
    command_receiver: mpsc::Receiver<ReceiverCommand>,
    command_sender: mpsc::Sender<ReceiverCommand>,
}

impl FrameReceiver {
    pub(crate) fn new(source: Box<dyn SegmentSource + Send>, decoder: FrameDecoder) -> Self {
        // Slow consumers skip frames instead of holding up the sensor.
        let (frame_channel, _) = broadcast::channel(1);
        let (command_sender, command_receiver) = mpsc::channel();
        Self {
            source,
            decoder,
            frame_channel,
            command_receiver,
            command_sender,
        }
    }

    /// Receive frames until a [`ReceiverCommand::Shutdown`] arrives or the source fails.
    ///
    /// This is a blocking function. A short segment only loses that frame, but any other
    /// transport error ends the loop. A source running out of segments ends the loop cleanly.
    pub(crate) fn receive_loop(mut self) -> anyhow::Result<()> {
        let span = info_span!("receiver_loop");
        let _enter = span.enter();
        let mut published: u64 = 0;
        let mut discarded: u64 = 0;
        let result = loop {
            if let Some(ReceiverCommand::Shutdown) = self.command_receiver.try_iter().next() {
                info!("Terminating receive loop");
                break Ok(());
            }
            match self.decoder.decode(self.source.as_mut()) {
                Ok(frame) => {
                    // Nobody listening is fine, frames are only kept for current subscribers.
                    #[allow(unused_must_use)]
                    {
                        self.frame_channel.send(Arc::new(frame));
                    }
                    published += 1;
                }
                Err(TransportError::Closed) => {
                    info!("Segment source closed");
                    break Ok(());
                }
                Err(err) if !err.is_fatal() => {
                    warn!(%err, "discarding incomplete frame");
                    discarded += 1;
                }
                Err(err) => {
                    break Err(err).context("Unable to receive frame segments");
                }
            }
        };
        info!(published, discarded, "receive loop finished");
        result
    }

    pub(crate) fn command_channel(&self) -> mpsc::Sender<ReceiverCommand> {
        self.command_sender.clone()
    }

    /// A handle for subscribing to decoded frames.
    pub(crate) fn frame_channel(&self) -> broadcast::Sender<Arc<RenderedFrame>> {
        self.frame_channel.clone()
    }
}

impl TryFrom<&Settings> for FrameReceiver {
    type Error = anyhow::Error;

    fn try_from(settings: &Settings) -> anyhow::Result<Self> {
        let decoder = FrameDecoder::new(&settings.frame, &settings.render)
            .context("Invalid frame or render settings")?;
        let source = settings
            .source
            .create_source()
            .context("Unable to open segment source")?;
        debug!(source = ?settings.source, "created frame receiver");
        Ok(Self::new(source, decoder))
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use tokio::sync::broadcast::error::TryRecvError;
    use tokio::task::spawn_blocking;

    use super::{FrameReceiver, ReceiverCommand};
    use crate::error::TransportError;
    use crate::frame::test_util::{FrameBuilder, ScriptedSource};
    use crate::frame::{FrameSettings, RepeatMode, ReplaySource, SegmentSource, SEGMENT_LEN};
    use crate::receiver::FrameDecoder;
    use crate::render::RenderSettings;

    fn decoder() -> FrameDecoder {
        FrameDecoder::new(&FrameSettings::default(), &RenderSettings::default()).unwrap()
    }

    fn capture(values: &[u16]) -> Vec<u8> {
        values
            .iter()
            .flat_map(|value| FrameBuilder::filled(*value).segments())
            .flatten()
            .collect()
    }

    /// Fails with a read error on the first segment.
    struct BrokenSource;

    impl SegmentSource for BrokenSource {
        fn read_segment(&mut self, _buffer: &mut [u8]) -> Result<usize, TransportError> {
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused").into())
        }
    }

    #[tokio::test]
    async fn publishes_every_frame() {
        let source = ReplaySource::new(
            capture(&[28000, 29000]),
            RepeatMode::None,
            Duration::ZERO,
        );
        let receiver = FrameReceiver::new(Box::new(source), decoder());
        let mut frames = receiver.frame_channel().subscribe();
        let result = spawn_blocking(move || receiver.receive_loop()).await;
        assert!(result.unwrap().is_ok());
        // Only the latest frame is kept for a lagging subscriber.
        assert!(frames.try_recv().is_err());
        let frame = frames.try_recv().unwrap();
        assert_eq!(frame.sequence, 1);
        assert_eq!(frame.temperatures.get_pixel(0, 0)[0], 17.0);
        assert!(matches!(frames.try_recv(), Err(TryRecvError::Closed)));
    }

    #[tokio::test]
    async fn short_segment_skips_frame() {
        let mut broken = FrameBuilder::filled(28000).segments();
        broken[2].truncate(SEGMENT_LEN / 2);
        let segments = broken
            .into_iter()
            .chain(FrameBuilder::filled(29000).segments())
            .map(Ok);
        let source = ScriptedSource::new(segments);
        let receiver = FrameReceiver::new(Box::new(source), decoder());
        let mut frames = receiver.frame_channel().subscribe();
        let result = spawn_blocking(move || receiver.receive_loop()).await;
        // The short segment doesn't stop the loop, the end of the segments does.
        assert!(result.unwrap().is_ok());
        let frame = frames.try_recv().unwrap();
        assert_eq!(frame.sequence, 0);
        assert_eq!(frame.temperatures.get_pixel(0, 0)[0], 17.0);
        assert_eq!(frame.temperatures.get_pixel(159, 119)[0], 17.0);
        assert!(matches!(frames.try_recv(), Err(TryRecvError::Closed)));
    }

    #[tokio::test]
    async fn read_error_ends_loop() {
        let receiver = FrameReceiver::new(Box::new(BrokenSource), decoder());
        let result = spawn_blocking(move || receiver.receive_loop()).await;
        assert!(result.unwrap().is_err());
    }

    #[tokio::test]
    async fn shutdown_command() {
        let source = ReplaySource::new(capture(&[28000]), RepeatMode::Loop, Duration::ZERO);
        let receiver = FrameReceiver::new(Box::new(source), decoder());
        let commands = receiver.command_channel();
        commands.send(ReceiverCommand::Shutdown).unwrap();
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            spawn_blocking(move || receiver.receive_loop()),
        )
        .await
        .expect("the loop to stop");
        assert!(result.unwrap().is_ok());
    }
}
