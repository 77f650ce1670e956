//! A shareable consumer handle with cancellation and termination enforcement.

use std::{
  collections::VecDeque,
  fmt::{Debug, Formatter},
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
  },
};

use crate::{
  observer::{BoxedObserver, Notification, Observer},
  rc::lock,
  subscription::{CompositeSubscription, Subscription, SubscriptionKey, SubscriptionLike},
};

struct Emitter<Item, Err> {
  observer: Option<BoxedObserver<Item, Err>>,
  pending: VecDeque<Notification<Item, Err>>,
  busy: bool,
  stopped: bool,
}

type Released<Item, Err> = (Option<BoxedObserver<Item, Err>>, VecDeque<Notification<Item, Err>>);

impl<Item, Err> Emitter<Item, Err> {
  fn release(&mut self) -> Released<Item, Err> {
    self.stopped = true;
    (self.observer.take(), std::mem::take(&mut self.pending))
  }
}

/// An observer bundled with its lifetime and a flow-control token.
///
/// `Subscriber` is a cheap handle; clones deliver to the same observer.
///
/// - A signal is a no-op once the lifetime is closed or a terminal signal was
///   accepted.
/// - After delivering `on_error` or `on_completed` the lifetime is
///   unsubscribed, even if the observer panics.
/// - Signals never overlap. One arriving while another is being delivered,
///   from this thread or another one, is queued and handed over by the thread
///   already delivering. No lock is held while observer code runs.
/// - Unsubscribing the lifetime releases the observer.
pub struct Subscriber<Item, Err> {
  lifetime: CompositeSubscription,
  emitter: Arc<Mutex<Emitter<Item, Err>>>,
  resumption: Resumption,
}

impl<Item, Err> Clone for Subscriber<Item, Err> {
  fn clone(&self) -> Self {
    Subscriber {
      lifetime: self.lifetime.clone(),
      emitter: self.emitter.clone(),
      resumption: self.resumption.clone(),
    }
  }
}

impl<Item: Send + 'static, Err: Send + 'static> Subscriber<Item, Err> {
  pub fn new<O>(lifetime: CompositeSubscription, observer: O) -> Self
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    Self::with_resumption(lifetime, observer, Resumption::new())
  }

  pub fn with_resumption<O>(lifetime: CompositeSubscription, observer: O, resumption: Resumption) -> Self
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let emitter = Arc::new(Mutex::new(Emitter {
      observer: Some(Box::new(observer) as BoxedObserver<Item, Err>),
      pending: VecDeque::new(),
      busy: false,
      stopped: false,
    }));
    let weak = Arc::downgrade(&emitter);
    // Runs at once when the lifetime is already closed.
    lifetime.add(Subscription::new(move || {
      if let Some(emitter) = weak.upgrade() {
        let released = lock(&emitter).release();
        drop(released);
      }
    }));
    Subscriber { lifetime, emitter, resumption }
  }

  pub fn on_next(&self, value: Item) { self.emit(Notification::Next(value)) }

  pub fn on_error(&self, err: Err) { self.emit(Notification::Error(err)) }

  pub fn on_completed(&self) { self.emit(Notification::Completed) }

  /// Delivers `signal`, whatever its kind.
  pub fn emit(&self, signal: Notification<Item, Err>) {
    if self.lifetime.is_closed() {
      return;
    }
    let mut state = lock(&self.emitter);
    if state.stopped {
      return;
    }
    if signal.is_terminal() {
      state.stopped = true;
    }
    if state.busy {
      state.pending.push_back(signal);
      return;
    }
    let Some(observer) = state.observer.take() else {
      return;
    };
    state.busy = true;
    drop(state);
    self.drain(observer, signal);
  }

  fn drain(&self, mut observer: BoxedObserver<Item, Err>, mut signal: Notification<Item, Err>) {
    loop {
      match signal {
        Notification::Next(value) => observer.next(value),
        terminal => {
          let _detach = Detacher(&self.lifetime);
          terminal.accept(observer);
          return;
        }
      }

      let mut state = lock(&self.emitter);
      if self.lifetime.is_closed() {
        state.busy = false;
        let released = (Some(observer), state.release());
        drop(state);
        drop(released);
        return;
      }
      match state.pending.pop_front() {
        Some(next) => signal = next,
        None => {
          state.busy = false;
          state.observer = Some(observer);
          return;
        }
      }
    }
  }
}

impl<Item, Err> Subscriber<Item, Err> {
  #[inline]
  pub fn lifetime(&self) -> &CompositeSubscription { &self.lifetime }

  /// Ties `subscription` to this subscriber's lifetime.
  #[inline]
  pub fn add<S: SubscriptionLike + 'static>(&self, subscription: S) -> SubscriptionKey {
    self.lifetime.add(subscription)
  }

  #[inline]
  pub fn remove(&self, key: SubscriptionKey) { self.lifetime.remove(key) }

  #[inline]
  pub fn resumption(&self) -> &Resumption { &self.resumption }

  #[inline]
  pub fn ptr_eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.emitter, &other.emitter) }
}

impl<Item, Err> SubscriptionLike for Subscriber<Item, Err>
where
  Item: Send,
  Err: Send,
{
  #[inline]
  fn unsubscribe(&self) { self.lifetime.unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { self.lifetime.is_closed() }
}

impl<Item: Send + 'static, Err: Send + 'static> Observer<Item, Err> for Subscriber<Item, Err> {
  #[inline]
  fn next(&mut self, value: Item) { self.on_next(value) }

  #[inline]
  fn error(self, err: Err) { self.on_error(err) }

  #[inline]
  fn complete(self) { self.on_completed() }
}

impl<Item, Err> Debug for Subscriber<Item, Err> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscriber")
      .field("lifetime", &self.lifetime)
      .finish()
  }
}

struct Detacher<'a>(&'a CompositeSubscription);

impl Drop for Detacher<'_> {
  fn drop(&mut self) { self.0.unsubscribe() }
}

/// Creates a subscriber with a fresh lifetime.
pub fn make_subscriber<Item, Err, O>(observer: O) -> Subscriber<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
  O: Observer<Item, Err> + Send + 'static,
{
  Subscriber::new(CompositeSubscription::new(), observer)
}

type Waiter = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct ResumptionState {
  paused: AtomicBool,
  waiters: Mutex<Vec<Waiter>>,
}

/// A flow-control token shared between a consumer and the producer feeding
/// it. A producer that honours it stops emitting while the token is paused
/// and continues from [`Resumption::on_resume`].
#[derive(Clone, Default)]
pub struct Resumption(Arc<ResumptionState>);

impl Resumption {
  pub fn new() -> Self { Self::default() }

  #[inline]
  pub fn is_resumed(&self) -> bool { !self.0.paused.load(Ordering::Acquire) }

  pub fn pause(&self) { self.0.paused.store(true, Ordering::Release) }

  /// Resumes and runs every waiter registered while paused.
  pub fn resume(&self) {
    let waiters = {
      let mut waiters = lock(&self.0.waiters);
      self.0.paused.store(false, Ordering::Release);
      std::mem::take(&mut *waiters)
    };
    for waiter in waiters {
      waiter();
    }
  }

  /// Runs `f` now if resumed, otherwise on the next [`Resumption::resume`].
  pub fn on_resume(&self, f: impl FnOnce() + Send + 'static) {
    {
      let mut waiters = lock(&self.0.waiters);
      if self.0.paused.load(Ordering::Acquire) {
        waiters.push(Box::new(f));
        return;
      }
    }
    f()
  }
}

impl Debug for Resumption {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Resumption")
      .field("is_resumed", &self.is_resumed())
      .finish()
  }
}
