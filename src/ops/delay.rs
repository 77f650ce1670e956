use crate::{
  coordination::Coordination,
  observable::{Observable, Operator},
  observer::Observer,
  scheduler::{once, Duration, Worker},
  subscriber::Subscriber,
};

#[derive(Clone)]
pub struct DelayOp<C> {
  delay: Duration,
  coordination: C,
}

impl<Item, Err, C> Operator<Item, Item, Err> for DelayOp<C>
where
  Item: Send + 'static,
  Err: Send + 'static,
  C: Coordination,
{
  fn apply(&self, out: Subscriber<Item, Err>) -> Subscriber<Item, Err> {
    let coordinator = self.coordination.create_coordinator(out.lifetime().clone());
    let out = coordinator.output(out);
    let upstream = out.lifetime().child();
    Subscriber::new(
      upstream,
      DelayObserver { out, worker: coordinator.worker().clone(), delay: self.delay },
    )
  }
}

pub struct DelayObserver<Item, Err> {
  out: Subscriber<Item, Err>,
  worker: Worker,
  delay: Duration,
}

impl<Item, Err> Observer<Item, Err> for DelayObserver<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) {
    let out = self.out.clone();
    self.worker.schedule_after(self.delay, once(move |_| out.on_next(value)));
  }

  // Errors are not delayed; values still in flight are dropped.
  fn error(self, err: Err) {
    let out = self.out;
    self.worker.schedule(once(move |_| out.on_error(err)));
  }

  fn complete(self) {
    let out = self.out;
    self.worker.schedule_after(self.delay, once(move |_| out.on_completed()));
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Shifts every value and the completion forward in time by `delay`.
  pub fn delay<C: Coordination>(&self, delay: Duration, coordination: C) -> Observable<Item, Err> {
    self.lift(DelayOp { delay, coordination })
  }
}
