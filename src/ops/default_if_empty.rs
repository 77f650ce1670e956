use crate::{
  observable::{Observable, Operator},
  observer::Observer,
  subscriber::Subscriber,
};

#[derive(Clone)]
pub struct DefaultIfEmptyOp<Item> {
  default: Item,
}

impl<Item, Err> Operator<Item, Item, Err> for DefaultIfEmptyOp<Item>
where
  Item: Clone + Send + Sync + 'static,
  Err: Send + 'static,
{
  fn apply(&self, out: Subscriber<Item, Err>) -> Subscriber<Item, Err> {
    let lifetime = out.lifetime().clone();
    Subscriber::new(lifetime, DefaultIfEmptyObserver { out, default: Some(self.default.clone()) })
  }
}

pub struct DefaultIfEmptyObserver<Item, Err> {
  out: Subscriber<Item, Err>,
  default: Option<Item>,
}

impl<Item, Err> Observer<Item, Err> for DefaultIfEmptyObserver<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) {
    self.default = None;
    self.out.on_next(value);
  }

  fn error(self, err: Err) { self.out.on_error(err) }

  fn complete(self) {
    if let Some(v) = self.default {
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
  /// Emits `default` if the source completes without a value.
  pub fn default_if_empty(&self, default: Item) -> Observable<Item, Err>
  where
    Item: Clone + Sync,
  {
    self.lift(DefaultIfEmptyOp { default })
  }
}
