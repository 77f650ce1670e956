use crate::{
  observable::{Observable, Operator},
  observer::Observer,
  subscriber::Subscriber,
};

#[derive(Clone)]
pub struct SkipOp {
  count: usize,
}

impl<Item, Err> Operator<Item, Item, Err> for SkipOp
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn apply(&self, out: Subscriber<Item, Err>) -> Subscriber<Item, Err> {
    let lifetime = out.lifetime().clone();
    Subscriber::new(lifetime, SkipObserver { out, remaining: self.count })
  }
}

pub struct SkipObserver<Item, Err> {
  out: Subscriber<Item, Err>,
  remaining: usize,
}

impl<Item, Err> Observer<Item, Err> for SkipObserver<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) {
    if self.remaining == 0 {
      self.out.on_next(value);
    } else {
      self.remaining -= 1;
    }
  }

  fn error(self, err: Err) { self.out.on_error(err) }

  fn complete(self) { self.out.on_completed() }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Drops the first `count` values.
  pub fn skip(&self, count: usize) -> Observable<Item, Err> { self.lift(SkipOp { count }) }
}
