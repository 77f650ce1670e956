use crate::{
  coordination::Coordination,
  error::TimeoutError,
  observable::{Observable, Operator},
  observer::Observer,
  rc::MutArc,
  scheduler::{once, Duration, Schedulable, Worker},
  subscriber::Subscriber,
  subscription::{CompositeSubscription, SubscriptionLike},
};

#[derive(Clone)]
pub struct TimeoutOp<C> {
  period: Duration,
  coordination: C,
}

impl<Item, Err, C> Operator<Item, Item, Err> for TimeoutOp<C>
where
  Item: Send + 'static,
  Err: From<TimeoutError> + Send + 'static,
  C: Coordination,
{
  fn apply(&self, out: Subscriber<Item, Err>) -> Subscriber<Item, Err> {
    let coordinator = self.coordination.create_coordinator(out.lifetime().clone());
    let out = coordinator.output(out);
    let upstream = out.lifetime().child();
    let timer = Timer {
      worker: coordinator.worker().clone(),
      period: self.period,
      armed: MutArc::own(Armed { index: 0, pending: None }),
    };
    timer.arm(&out, &upstream);
    Subscriber::new(upstream.clone(), TimeoutObserver { out, upstream, timer })
  }
}

struct Armed {
  index: u64,
  pending: Option<Schedulable>,
}

struct Timer {
  worker: Worker,
  period: Duration,
  armed: MutArc<Armed>,
}

impl Timer {
  /// Replaces the running deadline with a fresh one.
  fn arm<Item, Err>(&self, out: &Subscriber<Item, Err>, upstream: &CompositeSubscription)
  where
    Item: Send + 'static,
    Err: From<TimeoutError> + Send + 'static,
  {
    let index = {
      let mut armed = self.armed.rc_deref_mut();
      armed.index += 1;
      armed.index
    };
    self.disarm();
    let (armed, out, upstream) = (self.armed.clone(), out.clone(), upstream.clone());
    let scbl = self.worker.schedule_after(
      self.period,
      once(move |_| {
        if armed.rc_deref_mut().index != index {
          return;
        }
        upstream.unsubscribe();
        out.on_error(TimeoutError.into());
      }),
    );
    let mut armed = self.armed.rc_deref_mut();
    if armed.index == index {
      armed.pending = Some(scbl);
    }
  }

  fn disarm(&self) {
    let pending = self.armed.rc_deref_mut().pending.take();
    if let Some(scbl) = pending {
      scbl.unsubscribe();
    }
  }
}

pub struct TimeoutObserver<Item, Err> {
  out: Subscriber<Item, Err>,
  upstream: CompositeSubscription,
  timer: Timer,
}

impl<Item, Err> Observer<Item, Err> for TimeoutObserver<Item, Err>
where
  Item: Send + 'static,
  Err: From<TimeoutError> + Send + 'static,
{
  fn next(&mut self, value: Item) {
    self.timer.arm(&self.out, &self.upstream);
    self.out.on_next(value);
  }

  fn error(self, err: Err) {
    self.timer.disarm();
    self.out.on_error(err);
  }

  fn complete(self) {
    self.timer.disarm();
    self.out.on_completed();
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Fails with [`TimeoutError`] when `period` passes without a value, counted
  /// from the subscription and then from each value.
  pub fn timeout<C: Coordination>(&self, period: Duration, coordination: C) -> Observable<Item, Err>
  where
    Err: From<TimeoutError>,
  {
    self.lift(TimeoutOp { period, coordination })
  }
}

#[cfg(test)]
mod test {
  use crate::{prelude::*, scheduler::test_scheduler::*};

  #[rxcore_macro::test]
  fn fires_after_a_quiet_period() {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_hot_observable(vec![
      on_next(210, 1),
      on_next(240, 2),
      on_next(300, 3),
      on_completed::<i32, TimeoutError>(400),
    ]);
    let (hot, c_scheduler) = (source.observable(), scheduler.clone());
    let observer =
      scheduler.start_observable(move || hot.timeout(Duration::from_millis(50), c_scheduler));
    assert_eq!(
      observer.messages(),
      vec![on_next(210, 1), on_next(240, 2), on_error(290, TimeoutError)]
    );
    assert_eq!(source.subscriptions(), vec![Subscribed::new(200, 290)]);
  }

  #[rxcore_macro::test]
  fn counts_from_the_subscription() {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_hot_observable(vec![on_next::<i32, TimeoutError>(260, 1)]);
    let (hot, c_scheduler) = (source.observable(), scheduler.clone());
    let observer =
      scheduler.start_observable(move || hot.timeout(Duration::from_millis(50), c_scheduler));
    assert_eq!(observer.messages(), vec![on_error(250, TimeoutError)]);
  }

  #[rxcore_macro::test]
  fn completion_in_time_cancels_the_deadline() {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_hot_observable(vec![
      on_next(210, 1),
      on_completed::<i32, TimeoutError>(230),
    ]);
    let (hot, c_scheduler) = (source.observable(), scheduler.clone());
    let observer =
      scheduler.start_observable(move || hot.timeout(Duration::from_millis(50), c_scheduler));
    assert_eq!(observer.messages(), vec![on_next(210, 1), on_completed(230)]);
  }

  #[rxcore_macro::test]
  fn completion_on_the_current_thread_cancels_the_deadline() {
    let log = MutArc::own(vec![]);
    let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
    let started = std::time::Instant::now();
    observable::create(|s: Subscriber<i32, TimeoutError>| {
      s.on_next(1);
      s.on_completed();
    })
    .timeout(Duration::from_millis(500), CurrentThread)
    .subscribe_all(
      move |v| l1.rc_deref_mut().push(format!("next {v}")),
      move |e| l2.rc_deref_mut().push(format!("error {e}")),
      move || l3.rc_deref_mut().push("completed".to_owned()),
    );
    assert_eq!(*log.rc_deref_mut(), vec!["next 1", "completed"]);
    assert!(started.elapsed() < std::time::Duration::from_millis(500));
  }
}
