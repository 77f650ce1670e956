use crate::{
  observable::{Observable, Operator},
  observer::Observer,
  subscriber::Subscriber,
};

#[derive(Clone)]
pub struct SkipWhileOp<F> {
  predicate: F,
}

impl<Item, Err, F> Operator<Item, Item, Err> for SkipWhileOp<F>
where
  Item: Send + 'static,
  Err: Send + 'static,
  F: FnMut(&Item) -> bool + Clone + Send + Sync + 'static,
{
  fn apply(&self, out: Subscriber<Item, Err>) -> Subscriber<Item, Err> {
    let lifetime = out.lifetime().clone();
    Subscriber::new(
      lifetime,
      SkipWhileObserver { out, predicate: self.predicate.clone(), done_skipping: false },
    )
  }
}

pub struct SkipWhileObserver<Item, Err, F> {
  out: Subscriber<Item, Err>,
  predicate: F,
  done_skipping: bool,
}

impl<Item, Err, F> Observer<Item, Err> for SkipWhileObserver<Item, Err, F>
where
  Item: Send + 'static,
  Err: Send + 'static,
  F: FnMut(&Item) -> bool,
{
  fn next(&mut self, value: Item) {
    if !self.done_skipping {
      if (self.predicate)(&value) {
        return;
      }
      self.done_skipping = true;
    }
    self.out.on_next(value);
  }

  fn error(self, err: Err) { self.out.on_error(err) }

  fn complete(self) { self.out.on_completed() }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Drops values while `predicate` holds; everything from the first failing
  /// value on is emitted.
  pub fn skip_while<F>(&self, predicate: F) -> Observable<Item, Err>
  where
    F: FnMut(&Item) -> bool + Clone + Send + Sync + 'static,
  {
    self.lift(SkipWhileOp { predicate })
  }
}
