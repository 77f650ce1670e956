use crate::{
  observable::{Observable, Operator},
  observer::Observer,
  subscriber::Subscriber,
};

#[derive(Clone)]
pub struct ScanOp<F, Acc> {
  func: F,
  initial: Acc,
}

impl<Item, Acc, Err, F> Operator<Item, Acc, Err> for ScanOp<F, Acc>
where
  Item: Send + 'static,
  Acc: Clone + Send + Sync + 'static,
  Err: Send + 'static,
  F: FnMut(Acc, Item) -> Result<Acc, Err> + Clone + Send + Sync + 'static,
{
  fn apply(&self, out: Subscriber<Acc, Err>) -> Subscriber<Item, Err> {
    let lifetime = out.lifetime().clone();
    Subscriber::new(
      lifetime,
      ScanObserver { out, func: self.func.clone(), acc: Some(self.initial.clone()) },
    )
  }
}

pub struct ScanObserver<Acc, Err, F> {
  out: Subscriber<Acc, Err>,
  func: F,
  acc: Option<Acc>,
}

impl<Item, Acc, Err, F> Observer<Item, Err> for ScanObserver<Acc, Err, F>
where
  Acc: Clone + Send + 'static,
  Err: Send + 'static,
  F: FnMut(Acc, Item) -> Result<Acc, Err>,
{
  fn next(&mut self, value: Item) {
    let Some(acc) = self.acc.take() else { return };
    match (self.func)(acc, value) {
      Ok(acc) => {
        self.acc = Some(acc.clone());
        self.out.on_next(acc);
      }
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
  /// Folds every value into an accumulator starting at `initial` and emits
  /// each intermediate accumulation.
  pub fn scan<Acc, F>(&self, initial: Acc, mut f: F) -> Observable<Acc, Err>
  where
    Acc: Clone + Send + Sync + 'static,
    F: FnMut(Acc, Item) -> Acc + Clone + Send + Sync + 'static,
  {
    self.try_scan(initial, move |acc, v| Ok(f(acc, v)))
  }

  pub fn try_scan<Acc, F>(&self, initial: Acc, f: F) -> Observable<Acc, Err>
  where
    Acc: Clone + Send + Sync + 'static,
    F: FnMut(Acc, Item) -> Result<Acc, Err> + Clone + Send + Sync + 'static,
  {
    self.lift(ScanOp { func: f, initial })
  }
}
