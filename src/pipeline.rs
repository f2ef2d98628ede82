// SPDX-License-Identifier: GPL-3.0-or-later
use std::convert::TryInto;
use std::future::Future;
use std::pin::Pin;
use std::sync::{mpsc, Arc};
use std::task::{Context, Poll};

use anyhow::{anyhow, Context as _};
use futures::future::{FutureExt, TryFutureExt};
use futures::ready;
use futures::stream::{BoxStream, FuturesUnordered, Stream, StreamExt};
use pin_project::pin_project;
use tokio::sync::broadcast;
use tokio::task::spawn_blocking;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, info_span};
use tracing_futures::Instrument;

use crate::receiver::{FrameReceiver, ReceiverCommand, RenderedFrame};
use crate::settings::Settings;
use crate::sink::{FrameLogger, SnapshotSettings, SnapshotWriter};
use crate::util::{flatten_join_result, StreamExt as _};

type InnerTask = Pin<Box<dyn Future<Output = anyhow::Result<()>>>>;
type TaskList = FuturesUnordered<InnerTask>;
type FrameStream<'a> = BoxStream<'a, Arc<RenderedFrame>>;

/// Connects the frame receiver to everything consuming its frames.
///
/// The pipeline resolves as soon as any of its tasks finishes.
#[pin_project]
pub(crate) struct Pipeline {
    receiver_command_channel: mpsc::Sender<ReceiverCommand>,
    frame_channel: broadcast::Sender<Arc<RenderedFrame>>,
    #[pin]
    tasks: TaskList,
}

impl Pipeline {
    pub(crate) async fn new(config: Settings) -> anyhow::Result<Self> {
        let receiver: FrameReceiver = (&config)
            .try_into()
            .context("Error configuring frame receiver")?;
        let receiver_command_channel = receiver.command_channel();
        let frame_channel = receiver.frame_channel();
        let mut app = Self {
            receiver_command_channel,
            frame_channel,
            tasks: TaskList::new(),
        };
        // Subscribe before the receiver starts so that no frames are missed.
        app.create_logger();
        if let Some(snapshot) = &config.snapshot {
            app.create_snapshot_writer(snapshot)
                .context("Error creating snapshot writer")?;
        }
        let receiver_task = spawn_blocking(move || {
            receiver
                .receive_loop()
                .context("Error within frame receiver thread")
        })
        .map(flatten_join_result)
        .boxed();
        app.tasks.push(receiver_task);
        Ok(app)
    }

    fn create_frame_stream(&self, subscriber: &'static str) -> FrameStream<'static> {
        BroadcastStream::new(self.frame_channel.subscribe())
            .skip_lagged(subscriber)
            .boxed()
    }

    fn create_logger(&mut self) {
        let frame_stream = self
            .create_frame_stream("logger")
            .instrument(info_span!("frame_logger"));
        self.tasks.push(
            frame_stream
                .never_error()
                .forward(FrameLogger::new())
                .err_into()
                .boxed(),
        );
    }

    fn create_snapshot_writer(&mut self, settings: &SnapshotSettings) -> anyhow::Result<()> {
        info!(path = %settings.path.display(), every = settings.every, "Saving snapshots");
        let writer = SnapshotWriter::new(settings)?;
        let frame_stream = self.create_frame_stream("snapshot");
        self.tasks.push(
            writer
                .run(frame_stream)
                .instrument(info_span!("snapshot_writer"))
                .boxed(),
        );
        Ok(())
    }

    /// Ask the frame receiver to stop after the frame it's currently working on.
    pub(crate) fn shutdown(&self) -> anyhow::Result<()> {
        self.receiver_command_channel
            .send(ReceiverCommand::Shutdown)
            .map_err(|_| anyhow!("Frame receiver has already stopped"))
    }
}

impl Future for Pipeline {
    type Output = anyhow::Result<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        // An empty task list never happens in practice, the receiver task is always present.
        let res = ready!(this.tasks.poll_next(cx)).unwrap_or(Ok(()));
        debug!(result = ?res, "Pipeline terminating");
        Poll::Ready(res)
    }
}
