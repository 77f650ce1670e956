use crate::{
  observable::{Observable, Operator},
  observer::Observer,
  subscriber::Subscriber,
};

#[derive(Clone)]
pub struct FilterOp<F> {
  filter: F,
}

impl<Item, Err, F> Operator<Item, Item, Err> for FilterOp<F>
where
  Item: Send + 'static,
  Err: Send + 'static,
  F: FnMut(&Item) -> Result<bool, Err> + Clone + Send + Sync + 'static,
{
  fn apply(&self, out: Subscriber<Item, Err>) -> Subscriber<Item, Err> {
    let lifetime = out.lifetime().clone();
    Subscriber::new(lifetime, FilterObserver { out, filter: self.filter.clone() })
  }
}

pub struct FilterObserver<Item, Err, F> {
  out: Subscriber<Item, Err>,
  filter: F,
}

impl<Item, Err, F> Observer<Item, Err> for FilterObserver<Item, Err, F>
where
  Item: Send + 'static,
  Err: Send + 'static,
  F: FnMut(&Item) -> Result<bool, Err>,
{
  fn next(&mut self, value: Item) {
    match (self.filter)(&value) {
      Ok(true) => self.out.on_next(value),
      Ok(false) => {}
      Err(e) => self.out.on_error(e),
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
  /// Emit only those items that pass the predicate.
  pub fn filter<F>(&self, mut filter: F) -> Observable<Item, Err>
  where
    F: FnMut(&Item) -> bool + Clone + Send + Sync + 'static,
  {
    self.try_filter(move |v| Ok(filter(v)))
  }

  pub fn try_filter<F>(&self, filter: F) -> Observable<Item, Err>
  where
    F: FnMut(&Item) -> Result<bool, Err> + Clone + Send + Sync + 'static,
  {
    self.lift(FilterOp { filter })
  }
}
