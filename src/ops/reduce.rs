use crate::{
  observable::{Observable, Operator},
  observer::Observer,
  subscriber::Subscriber,
};

#[derive(Clone)]
pub struct ReduceOp<F, Acc> {
  func: F,
  initial: Acc,
}

impl<Item, Acc, Err, F> Operator<Item, Acc, Err> for ReduceOp<F, Acc>
where
  Item: Send + 'static,
  Acc: Clone + Send + Sync + 'static,
  Err: Send + 'static,
  F: FnMut(Acc, Item) -> Acc + Clone + Send + Sync + 'static,
{
  fn apply(&self, out: Subscriber<Acc, Err>) -> Subscriber<Item, Err> {
    let lifetime = out.lifetime().clone();
    Subscriber::new(
      lifetime,
      ReduceObserver { out, func: self.func.clone(), acc: Some(self.initial.clone()) },
    )
  }
}

pub struct ReduceObserver<Acc, Err, F> {
  out: Subscriber<Acc, Err>,
  func: F,
  acc: Option<Acc>,
}

impl<Item, Acc, Err, F> Observer<Item, Err> for ReduceObserver<Acc, Err, F>
where
  Acc: Send + 'static,
  Err: Send + 'static,
  F: FnMut(Acc, Item) -> Acc,
{
  fn next(&mut self, value: Item) {
    if let Some(acc) = self.acc.take() {
      self.acc = Some((self.func)(acc, value));
    }
  }

  fn error(self, err: Err) { self.out.on_error(err) }

  fn complete(self) {
    if let Some(acc) = self.acc {
      self.out.on_next(acc);
    }
    self.out.on_completed();
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Folds the whole source into one value, emitted when the source
  /// completes. An empty source emits `initial`.
  pub fn reduce<Acc, F>(&self, initial: Acc, f: F) -> Observable<Acc, Err>
  where
    Acc: Clone + Send + Sync + 'static,
    F: FnMut(Acc, Item) -> Acc + Clone + Send + Sync + 'static,
  {
    self.lift(ReduceOp { func: f, initial })
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[rxcore_macro::test]
  fn reduce_initial() {
    let emitted = MutArc::own(0);
    let c_emitted = emitted.clone();
    observable::from_iter::<_, ()>(vec![1, 1, 1, 1, 1])
      .reduce(100, |acc, v| acc + v)
      .subscribe(move |v| *c_emitted.rc_deref_mut() = v);
    assert_eq!(*emitted.rc_deref_mut(), 105);
  }

  #[rxcore_macro::test]
  fn reduce_initial_on_empty_observable() {
    let emitted = MutArc::own(0);
    let c_emitted = emitted.clone();
    observable::empty::<i32, ()>()
      .reduce(100, |acc, v| acc + v)
      .subscribe(move |v| *c_emitted.rc_deref_mut() = v);
    assert_eq!(*emitted.rc_deref_mut(), 100);
  }

  #[rxcore_macro::test]
  fn error_discards_the_accumulation() {
    let log = MutArc::own(vec![]);
    let (l1, l2) = (log.clone(), log.clone());
    observable::throw::<i32, _>("bad")
      .reduce(0, |acc, v| acc + v)
      .subscribe_err(
        move |v| l1.rc_deref_mut().push(format!("{v}")),
        move |e| l2.rc_deref_mut().push(e.to_owned()),
      );
    assert_eq!(*log.rc_deref_mut(), vec!["bad"]);
  }
}
