//! Hot multicast hubs.
//!
//! A [`Subject`] is both ends of a stream: whatever is pushed into it with
//! `next`/`error`/`complete` fans out to every subscriber attached at that
//! moment. Subscribers can come and go while signals are being delivered;
//! each signal iterates a snapshot of the list taken when it started.

use std::{
  fmt::{Debug, Formatter},
  sync::{Arc, Mutex},
};

use crate::{
  observable::{create, Observable},
  observer::{Notification, Observer},
  rc::lock,
  subscriber::Subscriber,
  subscription::{CompositeSubscription, Subscription, SubscriptionLike},
};

mod behavior_subject;
pub(crate) use behavior_subject::BehaviorObserver;
pub use behavior_subject::BehaviorSubject;

enum Mode<Err> {
  Casting,
  Completed,
  Errored(Err),
  Disposed,
}

type Observers<Item, Err> = Arc<Vec<(u64, Subscriber<Item, Err>)>>;

struct SubjectState<Item, Err> {
  mode: Mode<Err>,
  observers: Observers<Item, Err>,
  next_id: u64,
}

/// A multicast observer and observable pair.
///
/// A subscriber added after the subject terminated gets the terminal signal
/// right away: `on_completed` or the stored error. After the subject's
/// lifetime is unsubscribed while still casting, it is disposed: current
/// subscribers are unsubscribed and new ones are unsubscribed on arrival,
/// without any signal.
pub struct Subject<Item, Err> {
  state: Arc<Mutex<SubjectState<Item, Err>>>,
  lifetime: CompositeSubscription,
}

impl<Item, Err> Clone for Subject<Item, Err> {
  fn clone(&self) -> Self { Subject { state: self.state.clone(), lifetime: self.lifetime.clone() } }
}

impl<Item, Err> Subject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  pub fn new() -> Self { Self::with_lifetime(CompositeSubscription::new()) }

  /// A subject disposed together with `lifetime`.
  pub fn with_lifetime(lifetime: CompositeSubscription) -> Self {
    let state = Arc::new(Mutex::new(SubjectState {
      mode: Mode::Casting,
      observers: Arc::new(vec![]),
      next_id: 0,
    }));
    let weak = Arc::downgrade(&state);
    lifetime.add(Subscription::new(move || {
      let Some(state) = weak.upgrade() else { return };
      let observers = {
        let mut state = lock(&state);
        if !matches!(state.mode, Mode::Casting) {
          return;
        }
        state.mode = Mode::Disposed;
        std::mem::take(&mut state.observers)
      };
      for (_, s) in observers.iter() {
        s.unsubscribe();
      }
    }));
    Subject { state, lifetime }
  }

  pub fn next(&self, value: Item) {
    let observers = {
      let state = lock(&self.state);
      match state.mode {
        Mode::Casting => state.observers.clone(),
        _ => return,
      }
    };
    for (_, s) in observers.iter() {
      s.on_next(value.clone());
    }
  }

  pub fn error(&self, err: Err) {
    let observers = {
      let mut state = lock(&self.state);
      if !matches!(state.mode, Mode::Casting) {
        return;
      }
      state.mode = Mode::Errored(err.clone());
      std::mem::take(&mut state.observers)
    };
    for (_, s) in observers.iter() {
      s.on_error(err.clone());
    }
  }

  pub fn complete(&self) {
    let observers = {
      let mut state = lock(&self.state);
      if !matches!(state.mode, Mode::Casting) {
        return;
      }
      state.mode = Mode::Completed;
      std::mem::take(&mut state.observers)
    };
    for (_, s) in observers.iter() {
      s.on_completed();
    }
  }

  pub fn emit(&self, signal: Notification<Item, Err>) {
    match signal {
      Notification::Next(value) => self.next(value),
      Notification::Error(err) => self.error(err),
      Notification::Completed => self.complete(),
    }
  }

  /// Attaches `subscriber`, or settles it at once if the subject is no longer
  /// casting.
  pub fn add(&self, subscriber: Subscriber<Item, Err>) {
    let mut state = lock(&self.state);
    match &state.mode {
      Mode::Casting => {
        let id = state.next_id;
        state.next_id += 1;
        let mut observers = Vec::with_capacity(state.observers.len() + 1);
        observers.extend(state.observers.iter().cloned());
        observers.push((id, subscriber.clone()));
        state.observers = Arc::new(observers);
        drop(state);

        let weak = Arc::downgrade(&self.state);
        subscriber.add(Subscription::new(move || {
          if let Some(state) = weak.upgrade() {
            remove_observer(&state, id);
          }
        }));
      }
      Mode::Completed => {
        drop(state);
        subscriber.on_completed();
      }
      Mode::Errored(err) => {
        let err = err.clone();
        drop(state);
        subscriber.on_error(err);
      }
      Mode::Disposed => {
        drop(state);
        subscriber.unsubscribe();
      }
    }
  }

  /// The subscribing side.
  pub fn observable(&self) -> Observable<Item, Err> {
    let subject = self.clone();
    create(move |s| subject.add(s))
  }

  /// The pushing side as a subscriber whose lifetime is the subject's.
  pub fn subscriber(&self) -> Subscriber<Item, Err> {
    Subscriber::new(self.lifetime.clone(), self.observer())
  }

  /// The pushing side as a plain observer, for feeding the subject from a
  /// subscription that has its own lifetime.
  pub fn observer(&self) -> SubjectObserver<Item, Err> { SubjectObserver(self.clone()) }

  pub fn has_observers(&self) -> bool { !lock(&self.state).observers.is_empty() }

  pub(crate) fn is_casting(&self) -> bool { matches!(lock(&self.state).mode, Mode::Casting) }
}

impl<Item, Err> Subject<Item, Err> {
  pub fn lifetime(&self) -> &CompositeSubscription { &self.lifetime }
}

fn remove_observer<Item, Err>(state: &Mutex<SubjectState<Item, Err>>, id: u64) {
  let stale = {
    let mut state = lock(state);
    if !state.observers.iter().any(|(k, _)| *k == id) {
      return;
    }
    let kept: Vec<_> = state
      .observers
      .iter()
      .filter(|(k, _)| *k != id)
      .cloned()
      .collect();
    std::mem::replace(&mut state.observers, Arc::new(kept))
  };
  drop(stale);
}

impl<Item, Err> Default for Subject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn default() -> Self { Self::new() }
}

impl<Item, Err> Debug for Subject<Item, Err> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subject")
      .field("observers", &lock(&self.state).observers.len())
      .finish()
  }
}

/// Feeds a [`Subject`].
pub struct SubjectObserver<Item, Err>(Subject<Item, Err>);

impl<Item, Err> Observer<Item, Err> for SubjectObserver<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn next(&mut self, value: Item) { self.0.next(value) }

  fn error(self, err: Err) { self.0.error(err) }

  fn complete(self) { self.0.complete() }
}
