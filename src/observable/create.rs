use crate::{
  observable::{Observable, OnSubscribe},
  subscriber::Subscriber,
};

/// A source built from a subscribe function.
pub struct Create<F>(F);

impl<Item, Err, F> OnSubscribe<Item, Err> for Create<F>
where
  F: Fn(Subscriber<Item, Err>) -> Result<(), Err> + Send + Sync,
{
  #[inline]
  fn on_subscribe(&self, subscriber: Subscriber<Item, Err>) -> Result<(), Err> { (self.0)(subscriber) }
}

/// Creates an observable from a function run on every subscription.
///
/// ```rust
/// use rxcore::prelude::*;
///
/// let source = observable::create(|s: Subscriber<i32, ()>| {
///   s.on_next(1);
///   s.on_next(2);
///   s.on_completed();
/// });
/// let sum = MutArc::own(0);
/// let c_sum = sum.clone();
/// source.subscribe(move |v| *c_sum.rc_deref_mut() += v);
/// assert_eq!(*sum.rc_deref_mut(), 3);
/// ```
pub fn create<Item, Err, F>(subscribe: F) -> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
  F: Fn(Subscriber<Item, Err>) + Send + Sync + 'static,
{
  try_create(move |s| {
    subscribe(s);
    Ok(())
  })
}

/// Like [`create`], with a subscribe function that may fail to start.
pub fn try_create<Item, Err, F>(subscribe: F) -> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
  F: Fn(Subscriber<Item, Err>) -> Result<(), Err> + Send + Sync + 'static,
{
  Observable::new(Create(subscribe))
}

/// Builds a fresh observable for every subscription.
pub fn defer<Item, Err, F>(factory: F) -> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
  F: Fn() -> Observable<Item, Err> + Send + Sync + 'static,
{
  try_create(move |s| factory().try_subscribe(s).map(drop))
}

/// Emits one value, then completes.
pub fn of<Item, Err>(value: Item) -> Observable<Item, Err>
where
  Item: Clone + Send + Sync + 'static,
  Err: Send + 'static,
{
  create(move |s| {
    s.on_next(value.clone());
    s.on_completed();
  })
}

/// Alias of [`of`].
#[inline]
pub fn just<Item, Err>(value: Item) -> Observable<Item, Err>
where
  Item: Clone + Send + Sync + 'static,
  Err: Send + 'static,
{
  of(value)
}

/// Completes without emitting.
pub fn empty<Item, Err>() -> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  create(|s| s.on_completed())
}

/// Never emits and never terminates.
pub fn never<Item, Err>() -> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  create(|_| {})
}

/// Fails immediately with `err`.
pub fn throw<Item, Err>(err: Err) -> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Clone + Send + Sync + 'static,
{
  create(move |s| s.on_error(err.clone()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{rc::MutArc, subscription::SubscriptionLike};

  fn collect<Item, Err>(source: &Observable<Item, Err>) -> MutArc<Vec<String>>
  where
    Item: std::fmt::Debug + Send + 'static,
    Err: std::fmt::Debug + Send + 'static,
  {
    let log = MutArc::own(vec![]);
    let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
    source.subscribe_all(
      move |v| l1.rc_deref_mut().push(format!("{v:?}")),
      move |e| l2.rc_deref_mut().push(format!("error {e:?}")),
      move || l3.rc_deref_mut().push("completed".to_owned()),
    );
    log
  }

  #[rxcore_macro::test]
  fn trivial_sources() {
    assert_eq!(*collect(&of::<_, ()>(7)).rc_deref_mut(), vec!["7", "completed"]);
    assert_eq!(*collect(&empty::<i32, ()>()).rc_deref_mut(), vec!["completed"]);
    assert!(collect(&never::<i32, ()>()).rc_deref_mut().is_empty());
    assert_eq!(*collect(&throw::<i32, _>("e")).rc_deref_mut(), vec!["error \"e\""]);
  }

  #[rxcore_macro::test]
  fn never_stays_subscribed() {
    let lifetime = never::<i32, ()>().subscribe(|_| {});
    assert!(lifetime.is_subscribed());
    lifetime.unsubscribe();
  }

  #[rxcore_macro::test]
  fn defer_builds_per_subscription() {
    let built = MutArc::own(0);
    let c_built = built.clone();
    let source = defer(move || {
      *c_built.rc_deref_mut() += 1;
      of::<_, ()>(1)
    });
    assert_eq!(*built.rc_deref_mut(), 0);
    collect(&source);
    collect(&source);
    assert_eq!(*built.rc_deref_mut(), 2);
  }

  #[rxcore_macro::test]
  fn subscription_is_independent_per_subscriber() {
    let source = create(|s: Subscriber<i32, ()>| {
      for v in 0..3 {
        s.on_next(v);
      }
      s.on_completed();
    });
    assert_eq!(*collect(&source).rc_deref_mut(), vec!["0", "1", "2", "completed"]);
    assert_eq!(*collect(&source).rc_deref_mut(), vec!["0", "1", "2", "completed"]);
  }
}
