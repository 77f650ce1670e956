use crate::{
  observable::{Observable, Operator},
  observer::Observer,
  subscriber::Subscriber,
  subscription::{CompositeSubscription, SubscriptionLike},
};

#[derive(Clone)]
pub struct TakeOp {
  count: usize,
}

impl<Item, Err> Operator<Item, Item, Err> for TakeOp
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn apply(&self, out: Subscriber<Item, Err>) -> Subscriber<Item, Err> {
    if self.count == 0 {
      out.on_completed();
      return Subscriber::new(CompositeSubscription::closed(), TakeObserver { out, upstream: None, remaining: 0 });
    }
    let upstream = out.lifetime().child();
    Subscriber::new(
      upstream.clone(),
      TakeObserver { out, upstream: Some(upstream), remaining: self.count },
    )
  }
}

pub struct TakeObserver<Item, Err> {
  out: Subscriber<Item, Err>,
  upstream: Option<CompositeSubscription>,
  remaining: usize,
}

impl<Item, Err> Observer<Item, Err> for TakeObserver<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) {
    if self.remaining == 0 {
      return;
    }
    self.remaining -= 1;
    self.out.on_next(value);
    if self.remaining == 0 {
      // Nothing from upstream may interleave with the completion.
      if let Some(upstream) = self.upstream.take() {
        upstream.unsubscribe();
      }
      self.out.on_completed();
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
  /// Emits only the first `count` values, then unsubscribes from the source
  /// and completes.
  ///
  /// `take(0)` completes at once without subscribing to the source.
  pub fn take(&self, count: usize) -> Observable<Item, Err> { self.lift(TakeOp { count }) }
}
