// SPDX-License-Identifier: GPL-3.0-or-later
//! [`Stream`][futures::Stream] extensions.
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{ready, Stream};
use pin_project::pin_project;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::warn;

pub(crate) trait StreamExt: Stream {
    /// Wrap every item in `Ok`, for feeding infallible streams into fallible sinks.
    fn never_error<E>(self) -> OkStream<Self, E>
    where
        Self: Sized,
    {
        OkStream::new(self)
    }

    /// Pass over the gaps left when a broadcast subscriber falls behind, logging how much was
    /// missed.
    fn skip_lagged<T>(self, subscriber: &'static str) -> SkipLagged<Self>
    where
        Self: Sized + Stream<Item = Result<T, BroadcastStreamRecvError>>,
    {
        SkipLagged {
            stream: self,
            subscriber,
            skipped: 0,
        }
    }
}

impl<St: Stream> StreamExt for St {}

#[pin_project]
#[derive(Debug)]
pub(crate) struct OkStream<St: Stream, E> {
    #[pin]
    stream: St,
    phantom_error: PhantomData<E>,
}

impl<St: Stream, E> OkStream<St, E> {
    fn new(stream: St) -> Self {
        Self {
            stream,
            phantom_error: PhantomData,
        }
    }
}

impl<St: Stream, E> Stream for OkStream<St, E> {
    type Item = Result<St::Item, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        Poll::Ready(ready!(this.stream.poll_next(cx)).map(Result::<St::Item, E>::Ok))
    }
}

#[pin_project]
#[derive(Debug)]
pub(crate) struct SkipLagged<St> {
    #[pin]
    stream: St,
    subscriber: &'static str,
    skipped: u64,
}

#[cfg(test)]
impl<St> SkipLagged<St> {
    /// The total number of items this subscriber has missed.
    pub(crate) fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl<St, T> Stream for SkipLagged<St>
where
    St: Stream<Item = Result<T, BroadcastStreamRecvError>>,
{
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        Poll::Ready(loop {
            match ready!(this.stream.as_mut().poll_next(cx)) {
                Some(Ok(item)) => break Some(item),
                Some(Err(BroadcastStreamRecvError::Lagged(count))) => {
                    *this.skipped += count;
                    warn!(
                        subscriber = *this.subscriber,
                        count,
                        total = *this.skipped,
                        "subscriber lagging, frames skipped"
                    );
                }
                None => break None,
            }
        })
    }
}
