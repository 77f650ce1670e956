use std::collections::VecDeque;

use crate::{
  observable::{Observable, Operator},
  observer::Observer,
  subscriber::Subscriber,
};

#[derive(Clone)]
pub struct TakeLastOp {
  count: usize,
}

impl<Item, Err> Operator<Item, Item, Err> for TakeLastOp
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn apply(&self, out: Subscriber<Item, Err>) -> Subscriber<Item, Err> {
    let lifetime = out.lifetime().clone();
    Subscriber::new(
      lifetime,
      TakeLastObserver { out, count: self.count, queue: VecDeque::with_capacity(self.count) },
    )
  }
}

pub struct TakeLastObserver<Item, Err> {
  out: Subscriber<Item, Err>,
  count: usize,
  queue: VecDeque<Item>,
}

impl<Item, Err> Observer<Item, Err> for TakeLastObserver<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) {
    if self.count == 0 {
      return;
    }
    if self.queue.len() == self.count {
      self.queue.pop_front();
    }
    self.queue.push_back(value);
  }

  fn error(self, err: Err) { self.out.on_error(err) }

  fn complete(self) {
    for v in self.queue {
      self.out.on_next(v);
    }
    self.out.on_completed();
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Emits the last `count` values once the source completes.
  pub fn take_last(&self, count: usize) -> Observable<Item, Err> { self.lift(TakeLastOp { count }) }
}
