use crate::{
  observable::{Observable, Operator},
  observer::Observer,
  subscriber::Subscriber,
};

#[derive(Clone)]
pub struct TapOp<F> {
  func: F,
}

impl<Item, Err, F> Operator<Item, Item, Err> for TapOp<F>
where
  Item: Send + 'static,
  Err: Send + 'static,
  F: FnMut(&Item) + Clone + Send + Sync + 'static,
{
  fn apply(&self, out: Subscriber<Item, Err>) -> Subscriber<Item, Err> {
    let lifetime = out.lifetime().clone();
    Subscriber::new(lifetime, TapObserver { out, func: self.func.clone() })
  }
}

pub struct TapObserver<Item, Err, F> {
  out: Subscriber<Item, Err>,
  func: F,
}

impl<Item, Err, F> Observer<Item, Err> for TapObserver<Item, Err, F>
where
  Item: Send + 'static,
  Err: Send + 'static,
  F: FnMut(&Item),
{
  fn next(&mut self, value: Item) {
    (self.func)(&value);
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
  /// Invokes `f` with a reference to every value before passing it on.
  pub fn tap<F>(&self, f: F) -> Observable<Item, Err>
  where
    F: FnMut(&Item) + Clone + Send + Sync + 'static,
  {
    self.lift(TapOp { func: f })
  }
}
