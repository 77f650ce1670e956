use crate::{
  observable::{Observable, Operator},
  observer::Observer,
  subscriber::Subscriber,
};

#[derive(Clone)]
pub struct DistinctUntilChangedOp;

impl<Item, Err> Operator<Item, Item, Err> for DistinctUntilChangedOp
where
  Item: PartialEq + Clone + Send + 'static,
  Err: Send + 'static,
{
  fn apply(&self, out: Subscriber<Item, Err>) -> Subscriber<Item, Err> {
    let lifetime = out.lifetime().clone();
    Subscriber::new(lifetime, DistinctUntilChangedObserver { out, last: None })
  }
}

pub struct DistinctUntilChangedObserver<Item, Err> {
  out: Subscriber<Item, Err>,
  last: Option<Item>,
}

impl<Item, Err> Observer<Item, Err> for DistinctUntilChangedObserver<Item, Err>
where
  Item: PartialEq + Clone + Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) {
    if self.last.as_ref() != Some(&value) {
      self.last = Some(value.clone());
      self.out.on_next(value);
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
  /// Drops every value equal to the one emitted just before it.
  pub fn distinct_until_changed(&self) -> Observable<Item, Err>
  where
    Item: PartialEq + Clone,
  {
    self.lift(DistinctUntilChangedOp)
  }
}
