use crate::{
  observable::{Observable, Operator},
  observer::Observer,
  subscriber::Subscriber,
  subscription::{CompositeSubscription, SubscriptionLike},
};

#[derive(Clone)]
pub struct TakeWhileOp<F> {
  predicate: F,
  inclusive: bool,
}

impl<Item, Err, F> Operator<Item, Item, Err> for TakeWhileOp<F>
where
  Item: Send + 'static,
  Err: Send + 'static,
  F: FnMut(&Item) -> bool + Clone + Send + Sync + 'static,
{
  fn apply(&self, out: Subscriber<Item, Err>) -> Subscriber<Item, Err> {
    let upstream = out.lifetime().child();
    Subscriber::new(
      upstream.clone(),
      TakeWhileObserver {
        out,
        upstream,
        predicate: self.predicate.clone(),
        inclusive: self.inclusive,
        triggered: false,
      },
    )
  }
}

pub struct TakeWhileObserver<Item, Err, F> {
  out: Subscriber<Item, Err>,
  upstream: CompositeSubscription,
  predicate: F,
  inclusive: bool,
  triggered: bool,
}

impl<Item, Err, F> Observer<Item, Err> for TakeWhileObserver<Item, Err, F>
where
  Item: Send + 'static,
  Err: Send + 'static,
  F: FnMut(&Item) -> bool,
{
  fn next(&mut self, value: Item) {
    if self.triggered {
      return;
    }
    if (self.predicate)(&value) {
      self.out.on_next(value);
      return;
    }
    self.triggered = true;
    self.upstream.unsubscribe();
    if self.inclusive {
      self.out.on_next(value);
    }
    self.out.on_completed();
  }

  fn error(self, err: Err) { self.out.on_error(err) }

  fn complete(self) { self.out.on_completed() }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Emits values while `predicate` holds, then unsubscribes from the source
  /// and completes.
  pub fn take_while<F>(&self, predicate: F) -> Observable<Item, Err>
  where
    F: FnMut(&Item) -> bool + Clone + Send + Sync + 'static,
  {
    self.lift(TakeWhileOp { predicate, inclusive: false })
  }

  /// Like [`Observable::take_while`], also emitting the value that failed
  /// the predicate.
  pub fn take_while_inclusive<F>(&self, predicate: F) -> Observable<Item, Err>
  where
    F: FnMut(&Item) -> bool + Clone + Send + Sync + 'static,
  {
    self.lift(TakeWhileOp { predicate, inclusive: true })
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  fn collect(source: Observable<i32, ()>) -> Vec<String> {
    let log = MutArc::own(vec![]);
    let (l1, l2) = (log.clone(), log.clone());
    source.subscribe_all(
      move |v| l1.rc_deref_mut().push(v.to_string()),
      |_| {},
      move || l2.rc_deref_mut().push("completed".to_owned()),
    );
    let log = log.rc_deref_mut().clone();
    log
  }

  #[rxcore_macro::test]
  fn stops_at_the_first_failure() {
    let source = observable::from_iter(vec![1, 2, 5, 1]);
    assert_eq!(collect(source.take_while(|v| *v < 3)), vec!["1", "2", "completed"]);
    assert_eq!(
      collect(source.take_while_inclusive(|v| *v < 3)),
      vec!["1", "2", "5", "completed"]
    );
  }

  #[rxcore_macro::test]
  fn completes_with_the_source() {
    let source = observable::from_iter(vec![1, 2]);
    assert_eq!(collect(source.take_while(|_| true)), vec!["1", "2", "completed"]);
  }
}
