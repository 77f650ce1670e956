use crate::{
  coordination::{observe_on_one_worker, Coordination},
  observable::{Observable, Operator},
  scheduler::Scheduler,
  subscriber::Subscriber,
};

#[derive(Clone)]
pub struct ObserveOnOp<S> {
  scheduler: S,
}

impl<Item, Err, S> Operator<Item, Item, Err> for ObserveOnOp<S>
where
  Item: Send + 'static,
  Err: Send + 'static,
  S: Scheduler + Clone + 'static,
{
  fn apply(&self, out: Subscriber<Item, Err>) -> Subscriber<Item, Err> {
    let coordinator =
      observe_on_one_worker(self.scheduler.clone()).create_coordinator(out.lifetime().clone());
    coordinator.output(out)
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Delivers every signal on one worker of `scheduler`, in the order the
  /// source produced them.
  pub fn observe_on<S>(&self, scheduler: S) -> Observable<Item, Err>
  where
    S: Scheduler + Clone + 'static,
  {
    self.lift(ObserveOnOp { scheduler })
  }
}
