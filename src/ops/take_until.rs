use crate::{
  observable::{Observable, Operator},
  observer::Observer,
  subscriber::Subscriber,
  subscription::{CompositeSubscription, SubscriptionLike},
};

#[derive(Clone)]
pub struct TakeUntilOp<N, Err> {
  notifier: Observable<N, Err>,
}

impl<Item, N, Err> Operator<Item, Item, Err> for TakeUntilOp<N, Err>
where
  Item: Send + 'static,
  N: Send + 'static,
  Err: Send + 'static,
{
  fn apply(&self, out: Subscriber<Item, Err>) -> Subscriber<Item, Err> {
    let upstream = out.lifetime().child();
    let trigger = Subscriber::new(
      out.lifetime().child(),
      TriggerObserver { out: out.clone(), upstream: upstream.clone() },
    );
    self.notifier.subscribe_with(trigger);
    Subscriber::new(upstream, TakeUntilObserver { out })
  }
}

pub struct TakeUntilObserver<Item, Err> {
  out: Subscriber<Item, Err>,
}

impl<Item, Err> Observer<Item, Err> for TakeUntilObserver<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) { self.out.on_next(value) }

  fn error(self, err: Err) { self.out.on_error(err) }

  fn complete(self) { self.out.on_completed() }
}

/// Ends the main stream on the notifier's first value.
pub struct TriggerObserver<Item, Err> {
  out: Subscriber<Item, Err>,
  upstream: CompositeSubscription,
}

impl<Item, N, Err> Observer<N, Err> for TriggerObserver<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, _: N) {
    self.upstream.unsubscribe();
    self.out.on_completed();
  }

  fn error(self, err: Err) { self.out.on_error(err) }

  fn complete(self) {}
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Mirrors the source until `notifier` emits, then completes. The notifier
  /// completing on its own changes nothing; its error is forwarded.
  pub fn take_until<N: Send + 'static>(&self, notifier: Observable<N, Err>) -> Observable<Item, Err> {
    self.lift(TakeUntilOp { notifier })
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[rxcore_macro::test]
  fn base_function() {
    let source = Subject::<i32, ()>::new();
    let notifier = Subject::<(), ()>::new();
    let log = MutArc::own(vec![]);
    let (l1, l2) = (log.clone(), log.clone());
    source.observable().take_until(notifier.observable()).subscribe_all(
      move |v| l1.rc_deref_mut().push(v.to_string()),
      |_| {},
      move || l2.rc_deref_mut().push("completed".to_owned()),
    );
    source.next(1);
    source.next(2);
    notifier.next(());
    source.next(3);
    assert_eq!(*log.rc_deref_mut(), vec!["1", "2", "completed"]);
    assert!(!source.has_observers());
    assert!(!notifier.has_observers());
  }

  #[rxcore_macro::test]
  fn notifier_completion_is_ignored() {
    let source = Subject::<i32, ()>::new();
    let notifier = Subject::<(), ()>::new();
    let seen = MutArc::own(vec![]);
    let c_seen = seen.clone();
    source
      .observable()
      .take_until(notifier.observable())
      .subscribe(move |v| c_seen.rc_deref_mut().push(v));
    notifier.complete();
    source.next(1);
    assert_eq!(*seen.rc_deref_mut(), vec![1]);
  }

  #[rxcore_macro::test]
  fn synchronous_notifier_ends_before_the_source_starts() {
    let seen = MutArc::own(vec![]);
    let c_seen = seen.clone();
    observable::from_iter::<_, ()>(0..5)
      .take_until(observable::of(()))
      .subscribe(move |v| c_seen.rc_deref_mut().push(v));
    assert!(seen.rc_deref_mut().is_empty());
  }
}
