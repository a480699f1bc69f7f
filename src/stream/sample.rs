//! Latest-wins sampling for frame streams

use futures::Stream;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior, interval};

/// Extension trait to add sampling to any Stream
pub trait SampleExt: Stream {
    /// Emit at most once per `period`.
    ///
    /// Items arriving within a period replace each other; only the most
    /// recent one is emitted. The first item is emitted as soon as it
    /// arrives, and a pending item is flushed when the inner stream ends.
    fn sample_latest(self, period: Duration) -> SampleLatest<Self>
    where
        Self: Sized,
    {
        SampleLatest::new(self, period)
    }
}

impl<T: Stream> SampleExt for T {}

pin_project! {
    /// Stream returned by [`SampleExt::sample_latest`]
    pub struct SampleLatest<S: Stream> {
        #[pin]
        stream: S,
        interval: Interval,
        pending: Option<S::Item>,
        done: bool,
    }
}

impl<S: Stream> SampleLatest<S> {
    pub fn new(stream: S, period: Duration) -> Self {
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self { stream, interval, pending: None, done: false }
    }
}

impl<S: Stream> Stream for SampleLatest<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        while !*this.done {
            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => *this.pending = Some(item),
                Poll::Ready(None) => *this.done = true,
                Poll::Pending => break,
            }
        }

        if this.pending.is_none() {
            return if *this.done { Poll::Ready(None) } else { Poll::Pending };
        }

        if !*this.done {
            ready!(this.interval.poll_tick(cx));
        }
        Poll::Ready(this.pending.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::ReceiverStream;

    #[tokio::test(start_paused = true)]
    async fn keeps_latest_and_flushes_on_end() {
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            for index in 1..=10u32 {
                tx.send(index).await.unwrap();
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        });

        let sampled: Vec<u32> =
            ReceiverStream::new(rx).sample_latest(Duration::from_millis(35)).collect().await;

        assert_eq!(sampled.first(), Some(&1));
        assert_eq!(sampled.last(), Some(&10));
        assert!(sampled.len() < 10, "expected fewer items, got {sampled:?}");
        assert!(sampled.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[tokio::test]
    async fn empty_stream_ends() {
        let sampled: Vec<u32> = futures::stream::iter(Vec::<u32>::new())
            .sample_latest(Duration::from_millis(5))
            .collect()
            .await;
        assert!(sampled.is_empty());
    }
}
