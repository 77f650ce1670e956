use crate::{
  observable::{Observable, OnSubscribe},
  observer::Observer,
  subscriber::Subscriber,
};

pub struct Retry<Item, Err> {
  source: Observable<Item, Err>,
  count: usize,
}

impl<Item, Err> OnSubscribe<Item, Err> for Retry<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn on_subscribe(&self, out: Subscriber<Item, Err>) -> Result<(), Err> {
    attempt(self.source.clone(), out, self.count);
    Ok(())
  }
}

/// Subscribes one attempt on its own child lifetime, so a failed attempt is
/// torn down without closing `out`.
fn attempt<Item, Err>(source: Observable<Item, Err>, out: Subscriber<Item, Err>, remaining: usize)
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  let lifetime = out.lifetime().child();
  source
    .clone()
    .subscribe_with(Subscriber::new(lifetime, RetryObserver { source, out, remaining }));
}

struct RetryObserver<Item, Err> {
  source: Observable<Item, Err>,
  out: Subscriber<Item, Err>,
  remaining: usize,
}

impl<Item, Err> Observer<Item, Err> for RetryObserver<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) { self.out.on_next(value) }

  fn error(self, err: Err) {
    if self.remaining == 0 {
      self.out.on_error(err);
    } else {
      tracing::trace!(remaining = self.remaining, "resubscribing after an error");
      attempt(self.source, self.out, self.remaining - 1);
    }
  }

  fn complete(self) { self.out.on_completed() }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Resubscribes to the source after an error, up to `count` times, then
  /// forwards the last error.
  pub fn retry(&self, count: usize) -> Observable<Item, Err> {
    Observable::new(Retry { source: self.clone(), count })
  }
}
