//! Deferred, shared subscriptions.
//!
//! A [`ConnectableObservable`] bridges a source and a subject. Subscribers
//! attach to the subject and see nothing until [`connect`] subscribes the
//! subject to the source; from then on one execution of the source feeds all
//! of them.
//!
//! ```rust
//! use rxcore::prelude::*;
//!
//! let seen = MutArc::own(vec![]);
//! let connectable = observable::from_iter::<_, ()>(vec![1, 2]).publish();
//! let (a, b) = (seen.clone(), seen.clone());
//! connectable.observable().subscribe(move |v| a.rc_deref_mut().push(("a", v)));
//! connectable.observable().subscribe(move |v| b.rc_deref_mut().push(("b", v)));
//! assert!(seen.rc_deref_mut().is_empty());
//!
//! connectable.connect();
//! assert_eq!(*seen.rc_deref_mut(), vec![("a", 1), ("b", 1), ("a", 2), ("b", 2)]);
//! ```
//!
//! [`connect`]: ConnectableObservable::connect

use std::{
  fmt::{Debug, Formatter},
  sync::{Arc, Mutex},
};

use crate::{
  observable::{create, Observable},
  rc::lock,
  subject::{BehaviorObserver, BehaviorSubject, Subject},
  subscriber::Subscriber,
  subscription::{CompositeSubscription, Subscription, SubscriptionLike},
};

/// A hub a [`ConnectableObservable`] can multicast through.
pub trait SubjectLike<Item, Err>: Send + Sync + 'static {
  /// The side subscribers attach to.
  fn observable(&self) -> Observable<Item, Err>;

  /// A subscriber feeding the hub, bound to `lifetime`.
  fn feed(&self, lifetime: CompositeSubscription) -> Subscriber<Item, Err>;
}

impl<Item, Err> SubjectLike<Item, Err> for Subject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn observable(&self) -> Observable<Item, Err> { Subject::observable(self) }

  fn feed(&self, lifetime: CompositeSubscription) -> Subscriber<Item, Err> {
    Subscriber::new(lifetime, self.observer())
  }
}

impl<Item, Err> SubjectLike<Item, Err> for BehaviorSubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn observable(&self) -> Observable<Item, Err> { BehaviorSubject::observable(self) }

  fn feed(&self, lifetime: CompositeSubscription) -> Subscriber<Item, Err> {
    Subscriber::new(lifetime, BehaviorObserver(self.clone()))
  }
}

/// A source whose single shared subscription starts on [`connect`].
///
/// [`connect`]: ConnectableObservable::connect
pub struct ConnectableObservable<Item, Err> {
  source: Observable<Item, Err>,
  hub: Arc<dyn SubjectLike<Item, Err>>,
  connection: Arc<Mutex<Option<CompositeSubscription>>>,
}

impl<Item, Err> Clone for ConnectableObservable<Item, Err> {
  fn clone(&self) -> Self {
    ConnectableObservable {
      source: self.source.clone(),
      hub: self.hub.clone(),
      connection: self.connection.clone(),
    }
  }
}

impl<Item, Err> Debug for ConnectableObservable<Item, Err> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ConnectableObservable")
      .field("connected", &self.is_connected())
      .finish()
  }
}

impl<Item, Err> ConnectableObservable<Item, Err> {
  pub fn is_connected(&self) -> bool { lock(&self.connection).as_ref().is_some_and(|c| c.is_subscribed()) }
}

impl<Item, Err> ConnectableObservable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  pub fn new(source: Observable<Item, Err>, hub: impl SubjectLike<Item, Err>) -> Self {
    ConnectableObservable { source, hub: Arc::new(hub), connection: Arc::default() }
  }

  /// The multicast side. Subscribing to it never starts the source.
  pub fn observable(&self) -> Observable<Item, Err> { self.hub.observable() }

  /// Subscribes the hub to the source, unless a connection is already live,
  /// and returns the connection. Unsubscribing it disconnects.
  pub fn connect(&self) -> CompositeSubscription {
    let lifetime = {
      let mut connection = lock(&self.connection);
      if let Some(live) = connection.as_ref().filter(|c| c.is_subscribed()) {
        return live.clone();
      }
      let lifetime = CompositeSubscription::new();
      *connection = Some(lifetime.clone());
      lifetime
    };
    tracing::trace!("connecting a multicast source");
    self.source.subscribe_with(self.hub.feed(lifetime.clone()));
    lifetime
  }

  /// An observable that connects on its first subscriber and disconnects
  /// when the last one leaves.
  pub fn ref_count(&self) -> Observable<Item, Err> {
    let connectable = self.clone();
    let count = Arc::new(Mutex::new(RefCount { subscribers: 0, connection: None }));
    create(move |s: Subscriber<Item, Err>| {
      let first = {
        let mut count = lock(&count);
        count.subscribers += 1;
        count.subscribers == 1
      };
      let c_count = count.clone();
      s.add(Subscription::new(move || {
        let connection = {
          let mut count = lock(&c_count);
          count.subscribers -= 1;
          if count.subscribers == 0 { count.connection.take() } else { None }
        };
        if let Some(connection) = connection {
          tracing::trace!("last subscriber left, disconnecting");
          connection.unsubscribe();
        }
      }));
      connectable.observable().subscribe_with(s);
      if first {
        let connection = connectable.connect();
        let mut count = lock(&count);
        if count.subscribers == 0 {
          drop(count);
          connection.unsubscribe();
        } else {
          count.connection = Some(connection);
        }
      }
    })
  }
}

struct RefCount {
  subscribers: usize,
  connection: Option<CompositeSubscription>,
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Shares this source through `hub` once connected.
  pub fn multicast(&self, hub: impl SubjectLike<Item, Err>) -> ConnectableObservable<Item, Err> {
    ConnectableObservable::new(self.clone(), hub)
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  /// [`Observable::multicast`] through a fresh [`Subject`].
  pub fn publish(&self) -> ConnectableObservable<Item, Err> { self.multicast(Subject::new()) }

  /// [`Observable::multicast`] through a [`BehaviorSubject`] seeded with
  /// `initial`.
  pub fn publish_behavior(&self, initial: Item) -> ConnectableObservable<Item, Err> {
    self.multicast(BehaviorSubject::new(initial))
  }

  /// `publish().ref_count()`.
  pub fn share(&self) -> Observable<Item, Err> { self.publish().ref_count() }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    rc::MutArc,
    scheduler::{Duration, TestScheduler},
  };

  #[rxcore_macro::test]
  fn connect_is_idempotent_while_live() {
    let subscribed = MutArc::own(0);
    let c_subscribed = subscribed.clone();
    let source = create(move |_: Subscriber<i32, ()>| *c_subscribed.rc_deref_mut() += 1);
    let connectable = source.publish();
    let first = connectable.connect();
    let second = connectable.connect();
    assert!(first.ptr_eq(&second));
    assert_eq!(*subscribed.rc_deref_mut(), 1);

    first.unsubscribe();
    assert!(!connectable.is_connected());
    connectable.connect();
    assert_eq!(*subscribed.rc_deref_mut(), 2);
  }

  #[rxcore_macro::test]
  fn ref_count_connects_once_and_disconnects_at_zero() {
    let scheduler = TestScheduler::new();
    let shared = crate::observable::interval::<(), _>(Duration::from_millis(10), scheduler.clone()).share();
    let seen = MutArc::own(vec![]);
    let (a, b) = (seen.clone(), seen.clone());
    let first = shared.subscribe(move |v| a.rc_deref_mut().push(("a", v)));
    scheduler.advance_to(10);
    let second = shared.subscribe(move |v| b.rc_deref_mut().push(("b", v)));
    scheduler.advance_to(20);
    assert_eq!(*seen.rc_deref_mut(), vec![("a", 0), ("a", 1), ("b", 1)]);

    first.unsubscribe();
    scheduler.advance_to(30);
    assert_eq!(seen.rc_deref_mut().last(), Some(&("b", 2)));
    second.unsubscribe();
    scheduler.advance_to(60);
    assert_eq!(seen.rc_deref_mut().len(), 4);
  }

  #[rxcore_macro::test]
  fn publish_behavior_seeds_late_subscribers() {
    let source = Subject::<i32, ()>::new();
    let connectable = source.observable().publish_behavior(0);
    connectable.connect();
    source.next(7);
    let seen = MutArc::own(vec![]);
    let c_seen = seen.clone();
    connectable.observable().subscribe(move |v| c_seen.rc_deref_mut().push(v));
    source.next(8);
    assert_eq!(*seen.rc_deref_mut(), vec![7, 8]);
  }

  #[rxcore_macro::test]
  fn synchronous_source_completes_every_ref_count_subscriber() {
    let shared = crate::observable::from_iter::<_, ()>(vec![1, 2]).share();
    let log = MutArc::own(vec![]);
    let (l1, l2) = (log.clone(), log.clone());
    shared.subscribe_all(
      move |v| l1.rc_deref_mut().push(format!("{v}")),
      |_| {},
      move || l2.rc_deref_mut().push("completed".to_owned()),
    );
    assert_eq!(*log.rc_deref_mut(), vec!["1", "2", "completed"]);
  }
}
