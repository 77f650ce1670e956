//! The producer side.
//!
//! An [`Observable`] is a shared handle to a source that knows how to attach
//! a [`Subscriber`]. Nothing runs until it is subscribed, and each
//! subscription runs the source again. Operators are built with
//! [`Observable::lift`]: an [`Operator`] turns the subscriber of the
//! operator's output into a subscriber of its input, and the result is
//! subscribed to the upstream source.
//!
//! ```rust
//! use rxcore::prelude::*;
//!
//! let seen = MutArc::own(vec![]);
//! let c_seen = seen.clone();
//! observable::from_iter::<_, ()>(1..=5)
//!   .filter(|v| v % 2 == 0)
//!   .map(|v| v * 10)
//!   .subscribe(move |v| c_seen.rc_deref_mut().push(v));
//! assert_eq!(*seen.rc_deref_mut(), vec![20, 40]);
//! ```

use std::{
  fmt::{Debug, Formatter},
  sync::Arc,
};

use crate::{
  observer::{make_observer, Observer},
  scheduler::CurrentThread,
  subscriber::Subscriber,
  subscription::{CompositeSubscription, SubscriptionLike},
};

mod connectable;
mod create;
mod from_iter;
mod interval;

pub use connectable::*;
pub use create::*;
pub use from_iter::*;
pub use interval::*;

pub use crate::ops::{combine_latest::combine_latest_all, concat::concat, merge::merge};

/// Attaches a subscriber to a source of values.
///
/// Returning `Err` reports a failure to start; [`Observable::try_subscribe`]
/// turns it into `on_error` for a subscriber that is still listening.
pub trait OnSubscribe<Item, Err>: Send + Sync {
  fn on_subscribe(&self, subscriber: Subscriber<Item, Err>) -> Result<(), Err>;
}

/// Turns the subscriber of an operator's output into the subscriber of its
/// input.
pub trait Operator<In, Out, Err>: Send + Sync {
  fn apply(&self, subscriber: Subscriber<Out, Err>) -> Subscriber<In, Err>;
}

impl<In, Out, Err, F> Operator<In, Out, Err> for F
where
  F: Fn(Subscriber<Out, Err>) -> Subscriber<In, Err> + Send + Sync,
{
  #[inline]
  fn apply(&self, subscriber: Subscriber<Out, Err>) -> Subscriber<In, Err> { self(subscriber) }
}

/// A composable, possibly infinite, push source of `Item`s that may fail
/// with `Err`.
///
/// Clones share the same source; two observables are equal when they share
/// it.
pub struct Observable<Item, Err> {
  source: Arc<dyn OnSubscribe<Item, Err>>,
}

impl<Item, Err> Clone for Observable<Item, Err> {
  fn clone(&self) -> Self { Observable { source: self.source.clone() } }
}

impl<Item, Err> PartialEq for Observable<Item, Err> {
  fn eq(&self, other: &Self) -> bool { self.ptr_eq(other) }
}

impl<Item, Err> Debug for Observable<Item, Err> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Observable").finish_non_exhaustive()
  }
}

impl<Item, Err> Observable<Item, Err> {
  #[inline]
  pub fn ptr_eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.source, &other.source) }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  pub fn new(source: impl OnSubscribe<Item, Err> + 'static) -> Self {
    Observable { source: Arc::new(source) }
  }

  /// Subscribes `subscriber` and returns its lifetime.
  ///
  /// A subscriber that is already closed is not attached at all. A failure to
  /// start is delivered as `on_error` while the subscriber is subscribed, and
  /// is returned as `Err` when nobody is left to receive it.
  ///
  /// The source attaches inside a [`CurrentThread`] trampoline: current-thread
  /// work it schedules runs after its synchronous emissions, before this
  /// returns.
  pub fn try_subscribe(&self, subscriber: Subscriber<Item, Err>) -> Result<CompositeSubscription, Err> {
    let lifetime = subscriber.lifetime().clone();
    if subscriber.is_closed() {
      return Ok(lifetime);
    }
    CurrentThread::trampoline(|| match self.source.on_subscribe(subscriber.clone()) {
      Ok(()) => Ok(lifetime),
      Err(err) if subscriber.is_subscribed() => {
        subscriber.on_error(err);
        Ok(lifetime)
      }
      Err(err) => Err(err),
    })
  }

  /// Like [`Observable::try_subscribe`], dropping an undeliverable error.
  pub fn subscribe_with(&self, subscriber: Subscriber<Item, Err>) -> CompositeSubscription {
    let lifetime = subscriber.lifetime().clone();
    if self.try_subscribe(subscriber).is_err() {
      tracing::debug!("dropped an on_subscribe error: the subscriber was already closed");
    }
    lifetime
  }

  pub fn subscribe_observer<O>(&self, observer: O) -> CompositeSubscription
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    self.subscribe_with(Subscriber::new(CompositeSubscription::new(), observer))
  }

  /// Subscribes a value handler; errors and completion are ignored.
  pub fn subscribe<N>(&self, next: N) -> CompositeSubscription
  where
    N: FnMut(Item) + Send + 'static,
  {
    self.subscribe_observer(make_observer(next))
  }

  pub fn subscribe_err<N, E>(&self, next: N, error: E) -> CompositeSubscription
  where
    N: FnMut(Item) + Send + 'static,
    E: FnOnce(Err) + Send + 'static,
  {
    self.subscribe_observer(make_observer(next).on_error(error))
  }

  pub fn subscribe_all<N, E, C>(&self, next: N, error: E, complete: C) -> CompositeSubscription
  where
    N: FnMut(Item) + Send + 'static,
    E: FnOnce(Err) + Send + 'static,
    C: FnOnce() + Send + 'static,
  {
    self.subscribe_observer(make_observer(next).on_error(error).on_completed(complete))
  }

  /// Composes an operator onto this observable.
  pub fn lift<Out, Op>(&self, op: Op) -> Observable<Out, Err>
  where
    Out: Send + 'static,
    Op: Operator<Item, Out, Err> + 'static,
  {
    Observable::new(Lift { source: self.clone(), op })
  }
}

struct Lift<In, Err, Op> {
  source: Observable<In, Err>,
  op: Op,
}

impl<In, Out, Err, Op> OnSubscribe<Out, Err> for Lift<In, Err, Op>
where
  In: Send + 'static,
  Out: Send + 'static,
  Err: Send + 'static,
  Op: Operator<In, Out, Err>,
{
  fn on_subscribe(&self, subscriber: Subscriber<Out, Err>) -> Result<(), Err> {
    let upstream = self.op.apply(subscriber);
    self.source.try_subscribe(upstream).map(drop)
  }
}
