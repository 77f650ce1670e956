use crate::{
  error::SequenceError,
  observable::{Observable, Operator},
  observer::Observer,
  subscriber::Subscriber,
};

#[derive(Clone)]
pub struct LastOp;

impl<Item, Err> Operator<Item, Item, Err> for LastOp
where
  Item: Send + 'static,
  Err: From<SequenceError> + Send + 'static,
{
  fn apply(&self, out: Subscriber<Item, Err>) -> Subscriber<Item, Err> {
    let lifetime = out.lifetime().clone();
    Subscriber::new(lifetime, LastObserver { out, last: None })
  }
}

pub struct LastObserver<Item, Err> {
  out: Subscriber<Item, Err>,
  last: Option<Item>,
}

impl<Item, Err> Observer<Item, Err> for LastObserver<Item, Err>
where
  Item: Send + 'static,
  Err: From<SequenceError> + Send + 'static,
{
  fn next(&mut self, value: Item) { self.last = Some(value) }

  fn error(self, err: Err) { self.out.on_error(err) }

  fn complete(self) {
    match self.last {
      Some(v) => {
        self.out.on_next(v);
        self.out.on_completed();
      }
      None => self.out.on_error(SequenceError::Empty.into()),
    }
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Emits the final value once the source completes; an empty source is an
  /// error.
  pub fn last(&self) -> Observable<Item, Err>
  where
    Err: From<SequenceError>,
  {
    self.lift(LastOp)
  }

  /// Emits the final value, or `default` if the source is empty.
  pub fn last_or(&self, default: Item) -> Observable<Item, Err>
  where
    Item: Clone + Sync,
  {
    self.take_last(1).default_if_empty(default)
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[rxcore_macro::test]
  fn emits_the_final_value() {
    let seen = MutArc::own(vec![]);
    let c_seen = seen.clone();
    observable::from_iter::<_, SequenceError>(0..5)
      .last()
      .subscribe(move |v| c_seen.rc_deref_mut().push(v));
    assert_eq!(*seen.rc_deref_mut(), vec![4]);
  }

  #[rxcore_macro::test]
  fn empty_source() {
    let log = MutArc::own(vec![]);
    let (l1, l2) = (log.clone(), log.clone());
    observable::empty::<i32, SequenceError>()
      .last()
      .subscribe_err(move |v| l1.rc_deref_mut().push(v.to_string()), move |e| l2.rc_deref_mut().push(e.to_string()));
    observable::empty::<i32, ()>()
      .last_or(9)
      .subscribe({
        let log = log.clone();
        move |v| log.rc_deref_mut().push(v.to_string())
      });
    assert_eq!(*log.rc_deref_mut(), vec!["sequence contains no elements", "9"]);
  }
}
