use crate::{
  error::SequenceError,
  observable::{Observable, Operator},
  observer::Observer,
  subscriber::Subscriber,
  subscription::{CompositeSubscription, SubscriptionLike},
};

#[derive(Clone)]
pub struct FirstOp;

impl<Item, Err> Operator<Item, Item, Err> for FirstOp
where
  Item: Send + 'static,
  Err: From<SequenceError> + Send + 'static,
{
  fn apply(&self, out: Subscriber<Item, Err>) -> Subscriber<Item, Err> {
    let upstream = out.lifetime().child();
    Subscriber::new(upstream.clone(), FirstObserver { out, upstream, done: false })
  }
}

pub struct FirstObserver<Item, Err> {
  out: Subscriber<Item, Err>,
  upstream: CompositeSubscription,
  done: bool,
}

impl<Item, Err> Observer<Item, Err> for FirstObserver<Item, Err>
where
  Item: Send + 'static,
  Err: From<SequenceError> + Send + 'static,
{
  fn next(&mut self, value: Item) {
    if self.done {
      return;
    }
    self.done = true;
    self.upstream.unsubscribe();
    self.out.on_next(value);
    self.out.on_completed();
  }

  fn error(self, err: Err) { self.out.on_error(err) }

  fn complete(self) {
    if !self.done {
      self.out.on_error(SequenceError::Empty.into());
    }
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Emits the first value and completes; an empty source is an error.
  pub fn first(&self) -> Observable<Item, Err>
  where
    Err: From<SequenceError>,
  {
    self.lift(FirstOp)
  }

  /// Emits the first value, or `default` if the source is empty.
  pub fn first_or(&self, default: Item) -> Observable<Item, Err>
  where
    Item: Clone + Sync,
  {
    self.take(1).default_if_empty(default)
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[rxcore_macro::test]
  fn emits_one_and_completes() {
    let log = MutArc::own(vec![]);
    let (l1, l2) = (log.clone(), log.clone());
    observable::from_iter::<_, SequenceError>(3..10).first().subscribe_all(
      move |v| l1.rc_deref_mut().push(v.to_string()),
      |_| {},
      move || l2.rc_deref_mut().push("completed".to_owned()),
    );
    assert_eq!(*log.rc_deref_mut(), vec!["3", "completed"]);
  }

  #[rxcore_macro::test]
  fn empty_source_is_an_error() {
    let error = MutArc::own(None);
    let c_error = error.clone();
    observable::empty::<i32, SequenceError>()
      .first()
      .subscribe_err(|_| {}, move |e| *c_error.rc_deref_mut() = Some(e));
    assert_eq!(*error.rc_deref_mut(), Some(SequenceError::Empty));
  }

  #[rxcore_macro::test]
  fn first_or_default() {
    let seen = MutArc::own(vec![]);
    let (a, b) = (seen.clone(), seen.clone());
    observable::empty::<i32, ()>().first_or(7).subscribe(move |v| a.rc_deref_mut().push(v));
    observable::from_iter::<_, ()>(vec![1, 2]).first_or(7).subscribe(move |v| b.rc_deref_mut().push(v));
    assert_eq!(*seen.rc_deref_mut(), vec![7, 1]);
  }
}
