use crate::{
  observable::{Observable, Operator},
  subscriber::Subscriber,
  subscription::Subscription,
};

#[derive(Clone)]
pub struct FinalizeOp<F> {
  func: F,
}

impl<Item, Err, F> Operator<Item, Item, Err> for FinalizeOp<F>
where
  Item: Send + 'static,
  Err: Send + 'static,
  F: Fn() + Clone + Send + Sync + 'static,
{
  fn apply(&self, out: Subscriber<Item, Err>) -> Subscriber<Item, Err> {
    let func = self.func.clone();
    out.add(Subscription::new(move || func()));
    out
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Calls `f` once the subscription ends, whether by `on_error`,
  /// `on_completed` or unsubscribing.
  pub fn finalize<F>(&self, f: F) -> Observable<Item, Err>
  where
    F: Fn() + Clone + Send + Sync + 'static,
  {
    self.lift(FinalizeOp { func: f })
  }
}
