use crate::{
  coordination::Coordination,
  observable::{Observable, Operator},
  observer::Observer,
  scheduler::{Duration, Instant},
  subscriber::Subscriber,
};

#[derive(Clone)]
pub struct ThrottleOp<C> {
  period: Duration,
  coordination: C,
}

impl<Item, Err, C> Operator<Item, Item, Err> for ThrottleOp<C>
where
  Item: Send + 'static,
  Err: Send + 'static,
  C: Coordination,
{
  fn apply(&self, out: Subscriber<Item, Err>) -> Subscriber<Item, Err> {
    let lifetime = out.lifetime().clone();
    Subscriber::new(
      lifetime,
      ThrottleObserver {
        out,
        coordination: self.coordination.clone(),
        period: self.period,
        open_at: None,
      },
    )
  }
}

pub struct ThrottleObserver<Item, Err, C> {
  out: Subscriber<Item, Err>,
  coordination: C,
  period: Duration,
  /// When the next value may pass; `None` until the first one has.
  open_at: Option<Instant>,
}

impl<Item, Err, C> Observer<Item, Err> for ThrottleObserver<Item, Err, C>
where
  Item: Send + 'static,
  Err: Send + 'static,
  C: Coordination,
{
  fn next(&mut self, value: Item) {
    let now = self.coordination.now();
    if self.open_at.is_some_and(|at| now < at) {
      return;
    }
    self.open_at = Some(now + self.period);
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
  /// Emits a value, then ignores the source for `period`.
  pub fn throttle<C: Coordination>(&self, period: Duration, coordination: C) -> Observable<Item, Err> {
    self.lift(ThrottleOp { period, coordination })
  }
}

#[cfg(test)]
mod test {
  use crate::{prelude::*, scheduler::test_scheduler::*};

  #[rxcore_macro::test]
  fn leading_values_pass() {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_hot_observable(vec![
      on_next(210, 1),
      on_next(220, 2),
      on_next(250, 3),
      on_next(260, 4),
      on_next(300, 5),
      on_completed::<i32, ()>(320),
    ]);
    let (hot, c_scheduler) = (source.observable(), scheduler.clone());
    let observer =
      scheduler.start_observable(move || hot.throttle(Duration::from_millis(40), c_scheduler));
    assert_eq!(
      observer.messages(),
      vec![on_next(210, 1), on_next(250, 3), on_next(300, 5), on_completed(320)]
    );
  }
}
