//! Cancellation handles.
//!
//! [`Subscription`] is the primitive cancellable handle: an "active" flag and
//! at most one teardown action. [`CompositeSubscription`] is a set of child
//! subscriptions and the backbone of structured cancellation: unsubscribing a
//! parent unsubscribes every child still attached to it, exactly once.

use std::{
  fmt::{Debug, Formatter},
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
  },
};

use crate::rc::lock;

mod composite;
pub use composite::*;

/// Anything that can be cancelled.
///
/// Implementations must make `unsubscribe` idempotent: only the first call has
/// an effect, later calls return immediately.
pub trait SubscriptionLike: Send + Sync {
  /// Cancels the subscription. Once closed it never reopens.
  fn unsubscribe(&self);

  fn is_closed(&self) -> bool;

  #[inline]
  fn is_subscribed(&self) -> bool { !self.is_closed() }
}

impl<T: SubscriptionLike + ?Sized> SubscriptionLike for Arc<T> {
  #[inline]
  fn unsubscribe(&self) { (**self).unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { (**self).is_closed() }
}

impl<T: SubscriptionLike + ?Sized> SubscriptionLike for Box<T> {
  #[inline]
  fn unsubscribe(&self) { (**self).unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { (**self).is_closed() }
}

type Teardown = Box<dyn FnOnce() + Send>;

struct SubscriptionState {
  active: AtomicBool,
  teardown: Mutex<Option<Teardown>>,
}

/// A cancellable handle with a single teardown action.
///
/// Clones share the same state. The teardown runs exactly once, on the thread
/// that wins the active → closed transition, and never while an internal
/// lock is held.
///
/// ```rust
/// use std::sync::{
///   atomic::{AtomicUsize, Ordering},
///   Arc,
/// };
///
/// use rxcore::prelude::*;
///
/// let runs = Arc::new(AtomicUsize::new(0));
/// let c_runs = runs.clone();
/// let subscription = Subscription::new(move || {
///   c_runs.fetch_add(1, Ordering::SeqCst);
/// });
/// subscription.unsubscribe();
/// subscription.unsubscribe();
/// assert_eq!(runs.load(Ordering::SeqCst), 1);
/// ```
#[derive(Clone)]
pub struct Subscription(Arc<SubscriptionState>);

impl Subscription {
  pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
    Self::with_teardown(Some(Box::new(teardown)), true)
  }

  /// An active subscription without a teardown action.
  pub fn empty() -> Self { Self::with_teardown(None, true) }

  /// A subscription that is already closed.
  pub fn closed() -> Self { Self::with_teardown(None, false) }

  fn with_teardown(teardown: Option<Teardown>, active: bool) -> Self {
    Subscription(Arc::new(SubscriptionState {
      active: AtomicBool::new(active),
      teardown: Mutex::new(teardown),
    }))
  }

  #[inline]
  pub fn ptr_eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.0, &other.0) }
}

impl Default for Subscription {
  fn default() -> Self { Self::empty() }
}

impl SubscriptionLike for Subscription {
  fn unsubscribe(&self) {
    if self
      .0
      .active
      .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
      .is_ok()
    {
      let teardown = lock(&self.0.teardown).take();
      if let Some(teardown) = teardown {
        teardown();
      }
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { !self.0.active.load(Ordering::Acquire) }
}

impl Debug for Subscription {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscription")
      .field("is_closed", &self.is_closed())
      .finish()
  }
}

/// An RAII implementation of a "scoped subscribed" of a subscription.
/// When this structure is dropped (falls out of scope), the subscription will
/// be unsubscribed.
///
/// If you want to drop it immediately, wrap it in its own scope
#[derive(Debug)]
#[must_use]
pub struct SubscriptionGuard<T: SubscriptionLike>(pub(crate) T);

impl<T: SubscriptionLike> SubscriptionGuard<T> {
  /// Wraps an existing subscription with a guard to enable RAII behavior for
  /// it.
  pub fn new(subscription: T) -> SubscriptionGuard<T> { SubscriptionGuard(subscription) }

  pub fn subscription(&self) -> &T { &self.0 }
}

impl<T: SubscriptionLike> Drop for SubscriptionGuard<T> {
  #[inline]
  fn drop(&mut self) { self.0.unsubscribe() }
}

/// Extension giving every subscription the RAII helper.
pub trait UnsubscribeWhenDropped: SubscriptionLike + Sized {
  /// Activates "RAII" behavior for this subscription. That means
  /// `unsubscribe()` will be called automatically as soon as the returned
  /// value goes out of scope.
  ///
  /// **Attention:** If you don't assign the return value to a variable,
  /// `unsubscribe()` is called immediately, which is probably not what you
  /// want!
  fn unsubscribe_when_dropped(self) -> SubscriptionGuard<Self> { SubscriptionGuard(self) }
}

impl<T: SubscriptionLike> UnsubscribeWhenDropped for T {}
