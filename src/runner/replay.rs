//! A broadcast channel that replays the most recent value.
use std::{
    pin::Pin,
    sync::{Arc, Mutex, PoisonError},
    task::{Context, Poll},
};

use futures_core::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// A publish/replay primitive: a broadcast channel holding the last value.
///
/// Any number of independent subscribers may attach via
/// [`ReplaySubject::subscribe`]; each new subscriber immediately receives the
/// most recently published value (if any), then every subsequent one.
/// [`ReplaySubject::complete`] is terminal: existing subscriber streams end,
/// and late subscribers observe only end-of-stream.
///
/// Cloning the subject is cheap and clones share state, so a subject can be
/// handed to a publishing task while the owner keeps accepting subscribers.
///
/// # Example
///
/// ```rust
/// use futures_util::StreamExt;
/// use panel_query_runner::runner::ReplaySubject;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let subject = ReplaySubject::new();
/// subject.next(1);
/// subject.next(2);
///
/// // A late subscriber still sees the most recent value.
/// let mut stream = subject.subscribe();
/// assert_eq!(stream.next().await, Some(2));
///
/// subject.complete();
/// assert_eq!(stream.next().await, None);
/// # }
/// ```
#[derive(Debug)]
pub struct ReplaySubject<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

#[derive(Debug)]
struct Inner<T> {
    subscribers: Vec<mpsc::UnboundedSender<T>>,
    last: Option<T>,
    closed: bool,
}

impl<T> Clone for ReplaySubject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for ReplaySubject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ReplaySubject<T> {
    /// Create a new subject with no subscribers and no value.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                subscribers: vec![],
                last: None,
                closed: false,
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Terminate the subject.
    ///
    /// Existing subscriber streams end once they have drained any values
    /// already delivered; subscribers attaching afterwards observe only
    /// end-of-stream. Publishing after completion is a no-op.
    pub fn complete(&self) {
        let mut inner = self.lock();
        inner.closed = true;
        inner.last = None;
        inner.subscribers.clear();
    }
}

impl<T: Clone> ReplaySubject<T> {
    /// Publish a value to all current subscribers and cache it for replay.
    pub fn next(&self, value: T) {
        let mut inner = self.lock();
        if inner.closed {
            return;
        }
        inner
            .subscribers
            .retain(|subscriber| subscriber.send(value.clone()).is_ok());
        inner.last = Some(value);
    }

    /// Attach a new subscriber.
    ///
    /// The returned stream immediately yields the most recently published
    /// value, if there is one, followed by every future value until the
    /// subject completes or the stream is dropped.
    pub fn subscribe(&self) -> ReplayStream<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        if !inner.closed {
            if let Some(last) = &inner.last {
                // Cannot fail: we still hold the receiver.
                let _ = tx.send(last.clone());
            }
            inner.subscribers.push(tx);
        }
        ReplayStream {
            inner: UnboundedReceiverStream::new(rx),
        }
    }
}

/// A stream of values from a [`ReplaySubject`].
#[derive(Debug)]
pub struct ReplayStream<T> {
    inner: UnboundedReceiverStream<T>,
}

impl<T> Stream for ReplayStream<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use futures::{FutureExt, StreamExt};
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn delivers_values_to_all_subscribers() {
        let subject = ReplaySubject::new();
        let mut a = subject.subscribe();
        let mut b = subject.subscribe();
        subject.next("x");
        assert_eq!(a.next().await, Some("x"));
        assert_eq!(b.next().await, Some("x"));
    }

    #[tokio::test]
    async fn replays_the_most_recent_value_to_late_subscribers() {
        let subject = ReplaySubject::new();
        subject.next(1);
        subject.next(2);
        let mut late = subject.subscribe();
        assert_eq!(late.next().await, Some(2));
        // Nothing else is buffered.
        assert!(late.next().now_or_never().is_none());
    }

    #[tokio::test]
    async fn complete_ends_existing_streams() {
        let subject = ReplaySubject::new();
        let mut stream = subject.subscribe();
        subject.next(1);
        subject.complete();
        assert_eq!(stream.next().await, Some(1));
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn subscribers_after_complete_only_observe_the_end() {
        let subject = ReplaySubject::new();
        subject.next(1);
        subject.complete();
        subject.next(2);
        let mut late = subject.subscribe();
        assert_eq!(late.next().await, None);
    }

    #[tokio::test]
    async fn dropped_subscribers_are_pruned() {
        let subject = ReplaySubject::new();
        let stream = subject.subscribe();
        drop(stream);
        subject.next(1);
        let mut live = subject.subscribe();
        assert_eq!(live.next().await, Some(1));
    }
}
