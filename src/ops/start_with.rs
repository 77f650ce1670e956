use crate::{
  observable::{Observable, Operator},
  subscriber::Subscriber,
  subscription::SubscriptionLike,
};

#[derive(Clone)]
pub struct StartWithOp<Item> {
  values: Vec<Item>,
}

impl<Item, Err> Operator<Item, Item, Err> for StartWithOp<Item>
where
  Item: Clone + Send + Sync + 'static,
  Err: Send + 'static,
{
  fn apply(&self, out: Subscriber<Item, Err>) -> Subscriber<Item, Err> {
    for v in self.values.iter() {
      if out.is_closed() {
        break;
      }
      out.on_next(v.clone());
    }
    out
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Emits `values` before anything from the source.
  pub fn start_with(&self, values: Vec<Item>) -> Observable<Item, Err>
  where
    Item: Clone + Sync,
  {
    self.lift(StartWithOp { values })
  }
}
