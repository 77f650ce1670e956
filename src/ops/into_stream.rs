//! Bridge to `futures::Stream`.
//!
//! ```rust
//! use futures::{executor::block_on, StreamExt};
//! use rxcore::prelude::*;
//!
//! let mut stream = observable::from_iter::<_, ()>(1..=3).into_stream();
//! let values: Vec<_> = block_on(async {
//!   let mut values = vec![];
//!   while let Some(Ok(v)) = stream.next().await {
//!     values.push(v);
//!   }
//!   values
//! });
//! assert_eq!(values, vec![1, 2, 3]);
//! ```

use std::{
  collections::VecDeque,
  pin::Pin,
  task::{Context, Poll, Waker},
};

use futures::stream::{FusedStream, Stream};

use crate::{
  observable::Observable,
  observer::Observer,
  rc::MutArc,
  subscriber::Subscriber,
  subscription::{CompositeSubscription, SubscriptionLike},
};

struct Buffered<Item, Err> {
  queue: VecDeque<Result<Item, Err>>,
  waker: Option<Waker>,
  closed: bool,
}

impl<Item, Err> Buffered<Item, Err> {
  /// Queues `entry`, or closes on `None`, and hands back the waker to call
  /// once the lock is released.
  fn push(&mut self, entry: Option<Result<Item, Err>>) -> Option<Waker> {
    match entry {
      Some(entry) => self.queue.push_back(entry),
      None => self.closed = true,
    }
    self.waker.take()
  }
}

/// The values of an [`Observable`] as a stream of `Result<Item, Err>`.
///
/// Values are buffered until polled. An error is yielded as `Err` and ends
/// the stream. Dropping the stream unsubscribes from the source.
pub struct IntoStream<Item, Err> {
  state: MutArc<Buffered<Item, Err>>,
  lifetime: CompositeSubscription,
}

impl<Item, Err> Stream for IntoStream<Item, Err> {
  type Item = Result<Item, Err>;

  fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    let mut state = self.state.rc_deref_mut();
    if let Some(entry) = state.queue.pop_front() {
      return Poll::Ready(Some(entry));
    }
    if state.closed {
      return Poll::Ready(None);
    }
    state.waker = Some(cx.waker().clone());
    Poll::Pending
  }
}

impl<Item, Err> FusedStream for IntoStream<Item, Err> {
  fn is_terminated(&self) -> bool {
    let state = self.state.rc_deref_mut();
    state.closed && state.queue.is_empty()
  }
}

impl<Item, Err> Drop for IntoStream<Item, Err> {
  fn drop(&mut self) { self.lifetime.unsubscribe() }
}

struct StreamObserver<Item, Err> {
  state: MutArc<Buffered<Item, Err>>,
}

impl<Item, Err> StreamObserver<Item, Err> {
  fn deliver(&self, entries: impl IntoIterator<Item = Option<Result<Item, Err>>>) {
    let waker = {
      let mut state = self.state.rc_deref_mut();
      entries.into_iter().fold(None, |waker, entry| state.push(entry).or(waker))
    };
    if let Some(waker) = waker {
      waker.wake();
    }
  }
}

impl<Item, Err> Observer<Item, Err> for StreamObserver<Item, Err> {
  fn next(&mut self, value: Item) { self.deliver([Some(Ok(value))]) }

  fn error(self, err: Err) { self.deliver([Some(Err(err)), None]) }

  fn complete(self) { self.deliver([None]) }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Subscribes now and yields what arrives as a stream.
  pub fn into_stream(&self) -> IntoStream<Item, Err> {
    let state = MutArc::own(Buffered { queue: VecDeque::new(), waker: None, closed: false });
    let lifetime = CompositeSubscription::new();
    self.subscribe_with(Subscriber::new(lifetime.clone(), StreamObserver { state: state.clone() }));
    IntoStream { state, lifetime }
  }
}

#[cfg(test)]
mod tests {
  use futures::StreamExt;

  use crate::prelude::*;

  #[rxcore_macro::test]
  async fn receives_all_values() {
    let values: Vec<i32> = observable::from_iter::<_, ()>(vec![1, 2, 3])
      .into_stream()
      .map(|v| v.unwrap_or_default())
      .collect()
      .await;
    assert_eq!(values, vec![1, 2, 3]);
  }

  #[rxcore_macro::test]
  async fn error_ends_the_stream() {
    let mut stream = observable::throw::<i32, _>("error").into_stream();
    assert_eq!(stream.next().await, Some(Err("error")));
    assert_eq!(stream.next().await, None);
  }

  #[rxcore_macro::test(shared)]
  async fn values_from_another_thread_wake_the_task() {
    let stream = observable::interval::<(), _>(Duration::from_millis(5), NewThread::new())
      .take(3)
      .into_stream();
    let values: Vec<_> = stream.collect().await;
    assert_eq!(values, vec![Ok(0), Ok(1), Ok(2)]);
  }

  #[rxcore_macro::test]
  fn dropping_the_stream_unsubscribes() {
    let subject = Subject::<i32, ()>::new();
    let stream = subject.observable().into_stream();
    assert!(subject.has_observers());
    drop(stream);
    assert!(!subject.has_observers());
  }
}
