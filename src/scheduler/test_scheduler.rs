//! Virtual-time scheduler for deterministic tests of time-based operators.
//!
//! Time only moves when the test says so. Ticks are milliseconds since the
//! scheduler's creation; [`TestScheduler::start`] runs everything queued,
//! jumping the clock to each item's due time, while
//! [`TestScheduler::advance_to`] runs only what is due up to a point.
//!
//! The harness records what an observer sees with its virtual timestamps:
//!
//! ```rust
//! use rxcore::{prelude::*, scheduler::test_scheduler::*};
//!
//! let scheduler = TestScheduler::new();
//! let source = scheduler.create_hot_observable(vec![
//!   on_next(150, 1),
//!   on_next(210, 2),
//!   on_next(240, 3),
//!   on_completed::<i32, ()>(300),
//! ]);
//! let hot = source.observable();
//! let observer = scheduler.start_observable(move || hot.map(|v| v * 10));
//! assert_eq!(
//!   observer.messages(),
//!   vec![on_next(210, 20), on_next(240, 30), on_completed::<i32, ()>(300)]
//! );
//! assert_eq!(source.subscriptions(), vec![Subscribed::new(200, 300)]);
//! ```

use std::sync::{Arc, Mutex};

use super::{
  once, run_queue::RunQueue, Duration, Instant, Schedulable, Scheduler, Worker, WorkerBackend,
};
use crate::{
  observable::{create, Observable},
  observer::{Notification, Observer},
  rc::{lock, MutArc},
  subject::Subject,
  subscriber::Subscriber,
  subscription::{CompositeSubscription, Subscription, SubscriptionLike},
};

/// Default harness timings: create at 100, subscribe at 200, dispose at 1000.
pub const CREATED: u64 = 100;
pub const SUBSCRIBED: u64 = 200;
pub const DISPOSED: u64 = 1000;

struct Inner {
  clock: Duration,
  queue: RunQueue,
  running: bool,
}

struct TestState {
  epoch: Instant,
  inner: Mutex<Inner>,
}

/// A scheduler on a virtual clock, shared by its clones.
///
/// Actions asking to repeat immediately are always re-queued, so work at the
/// same virtual time interleaves in scheduling order.
#[derive(Clone)]
pub struct TestScheduler(Arc<TestState>);

impl TestScheduler {
  pub fn new() -> Self {
    TestScheduler(Arc::new(TestState {
      epoch: Instant::now(),
      inner: Mutex::new(Inner { clock: Duration::ZERO, queue: RunQueue::new(), running: false }),
    }))
  }

  /// Current virtual time in ticks.
  pub fn clock(&self) -> u64 { to_ticks(lock(&self.0.inner).clock) }

  /// The instant of virtual time `ticks`.
  pub fn at(&self, ticks: u64) -> Instant { self.0.epoch + Duration::from_millis(ticks) }

  /// Virtual time, in ticks, of `instant`.
  pub fn ticks_of(&self, instant: Instant) -> u64 {
    to_ticks(instant.saturating_duration_since(self.0.epoch))
  }

  /// Number of queued items, cancelled ones included.
  pub fn pending_count(&self) -> usize { lock(&self.0.inner).queue.len() }

  /// Runs queued work until the queue is empty or [`TestScheduler::stop`] is
  /// called.
  pub fn start(&self) { self.run(None) }

  /// Makes a running [`TestScheduler::start`] return after the current item.
  pub fn stop(&self) { lock(&self.0.inner).running = false }

  /// Runs everything due up to `ticks`, then sets the clock to `ticks`.
  pub fn advance_to(&self, ticks: u64) { self.run(Some(self.at(ticks))) }

  pub fn advance_by(&self, ticks: u64) { self.advance_to(self.clock() + ticks) }

  /// Moves the clock forward without running anything.
  pub fn sleep(&self, ticks: u64) { lock(&self.0.inner).clock += Duration::from_millis(ticks) }

  fn run(&self, limit: Option<Instant>) {
    lock(&self.0.inner).running = true;
    loop {
      let item = {
        let mut inner = lock(&self.0.inner);
        if !inner.running {
          break;
        }
        match inner.queue.peek_when() {
          None => break,
          Some(when) if limit.is_some_and(|limit| when > limit) => break,
          Some(when) => {
            let due = when.saturating_duration_since(self.0.epoch);
            if due > inner.clock {
              inner.clock = due;
            }
            inner.queue.pop()
          }
        }
      };
      let Some(item) = item else { break };
      if let Some(next) = item.what.run() {
        lock(&self.0.inner).queue.push(next, item.what);
      }
    }
    let mut inner = lock(&self.0.inner);
    if let Some(limit) = limit {
      let limit = limit.saturating_duration_since(self.0.epoch);
      if inner.running && limit > inner.clock {
        inner.clock = limit;
      }
    }
    inner.running = false;
  }
}

fn to_ticks(elapsed: Duration) -> u64 { elapsed.as_millis() as u64 }

impl Default for TestScheduler {
  fn default() -> Self { Self::new() }
}

impl Scheduler for TestScheduler {
  fn now(&self) -> Instant { self.0.epoch + lock(&self.0.inner).clock }

  fn is_tail_recursion_allowed(&self) -> bool { false }

  fn create_worker(&self, lifetime: CompositeSubscription) -> Worker {
    Worker::new(lifetime, TestWorker(self.clone()))
  }
}

struct TestWorker(TestScheduler);

impl WorkerBackend for TestWorker {
  fn now(&self) -> Instant { Scheduler::now(&self.0) }

  fn is_tail_recursion_allowed(&self) -> bool { false }

  fn enqueue(&self, when: Instant, schedulable: Schedulable) {
    lock(&self.0 .0.inner).queue.push(when, schedulable)
  }
}

/// A value stamped with the virtual time it was seen at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded<T> {
  pub time: u64,
  pub value: T,
}

pub type Messages<Item, Err> = Vec<Recorded<Notification<Item, Err>>>;

pub fn on_next<Item, Err>(time: u64, value: Item) -> Recorded<Notification<Item, Err>> {
  Recorded { time, value: Notification::Next(value) }
}

pub fn on_error<Item, Err>(time: u64, err: Err) -> Recorded<Notification<Item, Err>> {
  Recorded { time, value: Notification::Error(err) }
}

pub fn on_completed<Item, Err>(time: u64) -> Recorded<Notification<Item, Err>> {
  Recorded { time, value: Notification::Completed }
}

/// When a test source was subscribed, and unsubscribed if it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscribed {
  pub subscribe: u64,
  pub unsubscribe: Option<u64>,
}

impl Subscribed {
  pub fn new(subscribe: u64, unsubscribe: u64) -> Self {
    Subscribed { subscribe, unsubscribe: Some(unsubscribe) }
  }

  pub fn open(subscribe: u64) -> Self { Subscribed { subscribe, unsubscribe: None } }
}

/// Records every signal with the virtual time it arrived at.
pub struct TestObserver<Item, Err> {
  scheduler: TestScheduler,
  messages: MutArc<Messages<Item, Err>>,
}

impl<Item, Err> Clone for TestObserver<Item, Err> {
  fn clone(&self) -> Self {
    TestObserver { scheduler: self.scheduler.clone(), messages: self.messages.clone() }
  }
}

impl<Item: Clone, Err: Clone> TestObserver<Item, Err> {
  pub fn messages(&self) -> Messages<Item, Err> { self.messages.rc_deref_mut().clone() }
}

impl<Item, Err> TestObserver<Item, Err> {
  fn record(&self, value: Notification<Item, Err>) {
    let time = self.scheduler.clock();
    self.messages.rc_deref_mut().push(Recorded { time, value });
  }
}

impl<Item, Err> Observer<Item, Err> for TestObserver<Item, Err> {
  fn next(&mut self, value: Item) { self.record(Notification::Next(value)) }

  fn error(self, err: Err) { self.record(Notification::Error(err)) }

  fn complete(self) { self.record(Notification::Completed) }
}

fn track<Item, Err>(
  scheduler: &TestScheduler, log: &MutArc<Vec<Subscribed>>, s: &Subscriber<Item, Err>,
) {
  let idx = {
    let mut log = log.rc_deref_mut();
    log.push(Subscribed::open(scheduler.clock()));
    log.len() - 1
  };
  let (log, scheduler) = (log.clone(), scheduler.clone());
  s.add(Subscription::new(move || {
    log.rc_deref_mut()[idx].unsubscribe = Some(scheduler.clock());
  }));
}

/// A source that plays its messages at their absolute virtual times,
/// whether anyone listens or not.
pub struct HotObservable<Item, Err> {
  observable: Observable<Item, Err>,
  subscriptions: MutArc<Vec<Subscribed>>,
}

impl<Item, Err> HotObservable<Item, Err> {
  pub fn observable(&self) -> Observable<Item, Err> { self.observable.clone() }

  pub fn subscriptions(&self) -> Vec<Subscribed> { self.subscriptions.rc_deref_mut().clone() }
}

/// A source that plays its messages relative to each subscription.
pub struct ColdObservable<Item, Err> {
  observable: Observable<Item, Err>,
  subscriptions: MutArc<Vec<Subscribed>>,
}

impl<Item, Err> ColdObservable<Item, Err> {
  pub fn observable(&self) -> Observable<Item, Err> { self.observable.clone() }

  pub fn subscriptions(&self) -> Vec<Subscribed> { self.subscriptions.rc_deref_mut().clone() }
}

impl TestScheduler {
  pub fn create_observer<Item, Err>(&self) -> TestObserver<Item, Err> {
    TestObserver { scheduler: self.clone(), messages: MutArc::own(vec![]) }
  }

  pub fn create_hot_observable<Item, Err>(&self, messages: Messages<Item, Err>) -> HotObservable<Item, Err>
  where
    Item: Clone + Send + Sync + 'static,
    Err: Clone + Send + Sync + 'static,
  {
    let subject = Subject::<Item, Err>::new();
    let worker = self.create_worker(CompositeSubscription::new());
    for Recorded { time, value } in messages {
      let subject = subject.clone();
      worker.schedule_at(self.at(time), once(move |_| subject.emit(value)));
    }

    let subscriptions = MutArc::own(vec![]);
    let (scheduler, log) = (self.clone(), subscriptions.clone());
    let observable = create(move |s: Subscriber<Item, Err>| {
      track(&scheduler, &log, &s);
      subject.observable().subscribe_with(s);
    });
    HotObservable { observable, subscriptions }
  }

  pub fn create_cold_observable<Item, Err>(
    &self, messages: Messages<Item, Err>,
  ) -> ColdObservable<Item, Err>
  where
    Item: Clone + Send + Sync + 'static,
    Err: Clone + Send + Sync + 'static,
  {
    let messages = Arc::new(messages);
    let subscriptions = MutArc::own(vec![]);
    let (scheduler, log) = (self.clone(), subscriptions.clone());
    let observable = create(move |s: Subscriber<Item, Err>| {
      track(&scheduler, &log, &s);
      let worker = scheduler.create_worker(s.lifetime().clone());
      for Recorded { time, value } in messages.iter().cloned() {
        let s = s.clone();
        worker.schedule_after(Duration::from_millis(time), once(move |_| s.emit(value)));
      }
    });
    ColdObservable { observable, subscriptions }
  }

  /// Creates the observable from `factory` at `created`, subscribes a
  /// recording observer at `subscribed`, unsubscribes it at `disposed`, and
  /// runs the scheduler to the end.
  pub fn start_with_timing<Item, Err, F>(
    &self, created: u64, subscribed: u64, disposed: u64, factory: F,
  ) -> TestObserver<Item, Err>
  where
    Item: Send + 'static,
    Err: Send + 'static,
    F: FnOnce() -> Observable<Item, Err> + Send + 'static,
  {
    let observer = self.create_observer();
    let source: MutArc<Option<Observable<Item, Err>>> = MutArc::own(None);
    let lifetime = CompositeSubscription::new();
    let worker = self.create_worker(CompositeSubscription::new());

    let c_source = source.clone();
    worker.schedule_at(self.at(created), once(move |_| *c_source.rc_deref_mut() = Some(factory())));

    let (c_lifetime, c_observer) = (lifetime.clone(), observer.clone());
    worker.schedule_at(
      self.at(subscribed),
      once(move |_| {
        let source = source.rc_deref_mut().clone();
        if let Some(source) = source {
          source.subscribe_with(Subscriber::new(c_lifetime, c_observer));
        }
      }),
    );

    worker.schedule_at(self.at(disposed), once(move |_| lifetime.unsubscribe()));
    self.start();
    observer
  }

  /// [`TestScheduler::start_with_timing`] at the default times.
  pub fn start_observable<Item, Err, F>(&self, factory: F) -> TestObserver<Item, Err>
  where
    Item: Send + 'static,
    Err: Send + 'static,
    F: FnOnce() -> Observable<Item, Err> + Send + 'static,
  {
    self.start_with_timing(CREATED, SUBSCRIBED, DISPOSED, factory)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::scheduler::Recurse;

  #[rxcore_macro::test]
  fn runs_in_virtual_time_order() {
    let scheduler = TestScheduler::new();
    let worker = scheduler.create_worker(CompositeSubscription::new());
    let log = MutArc::own(vec![]);
    for at in [300, 100, 200] {
      let (c_log, c_scheduler) = (log.clone(), scheduler.clone());
      worker.schedule_at(
        scheduler.at(at),
        once(move |_| c_log.rc_deref_mut().push((at, c_scheduler.clock()))),
      );
    }
    scheduler.start();
    assert_eq!(*log.rc_deref_mut(), vec![(100, 100), (200, 200), (300, 300)]);
  }

  #[rxcore_macro::test]
  fn advance_runs_only_what_is_due() {
    let scheduler = TestScheduler::new();
    let worker = scheduler.create_worker(CompositeSubscription::new());
    let log = MutArc::own(vec![]);
    for at in [10, 20, 30] {
      let c_log = log.clone();
      worker.schedule_at(scheduler.at(at), once(move |_| c_log.rc_deref_mut().push(at)));
    }
    scheduler.advance_to(20);
    assert_eq!(*log.rc_deref_mut(), vec![10, 20]);
    assert_eq!(scheduler.clock(), 20);
    scheduler.advance_by(5);
    assert_eq!(scheduler.clock(), 25);
    assert_eq!(scheduler.pending_count(), 1);
    scheduler.advance_by(5);
    assert_eq!(*log.rc_deref_mut(), vec![10, 20, 30]);
  }

  #[rxcore_macro::test]
  fn sleep_moves_clock_only() {
    let scheduler = TestScheduler::new();
    let worker = scheduler.create_worker(CompositeSubscription::new());
    let ran = MutArc::own(false);
    let c_ran = ran.clone();
    worker.schedule_at(scheduler.at(5), once(move |_| *c_ran.rc_deref_mut() = true));
    scheduler.sleep(10);
    assert_eq!(scheduler.clock(), 10);
    assert!(!*ran.rc_deref_mut());
    scheduler.start();
    assert!(*ran.rc_deref_mut());
    assert_eq!(scheduler.clock(), 10);
  }

  #[rxcore_macro::test]
  fn stop_halts_start() {
    let scheduler = TestScheduler::new();
    let worker = scheduler.create_worker(CompositeSubscription::new());
    let count = MutArc::own(0);
    let (c_count, c_scheduler) = (count.clone(), scheduler.clone());
    worker.schedule(move |_| {
      *c_count.rc_deref_mut() += 1;
      if *c_count.rc_deref_mut() == 3 {
        c_scheduler.stop();
      }
      Recurse::After(Duration::from_millis(1))
    });
    scheduler.start();
    assert_eq!(*count.rc_deref_mut(), 3);
    assert_eq!(scheduler.clock(), 2);
  }

  #[rxcore_macro::test]
  fn cold_observable_is_relative_to_subscription() {
    let scheduler = TestScheduler::new();
    let cold = scheduler.create_cold_observable(vec![
      on_next(10, 'a'),
      on_next(20, 'b'),
      on_completed::<char, ()>(30),
    ]);
    let source = cold.observable();
    let observer = scheduler.start_observable(move || source);
    assert_eq!(
      observer.messages(),
      vec![on_next(210, 'a'), on_next(220, 'b'), on_completed(230)]
    );
    assert_eq!(cold.subscriptions(), vec![Subscribed::new(200, 230)]);
  }

  #[rxcore_macro::test]
  fn disposal_cuts_off_an_infinite_source() {
    let scheduler = TestScheduler::new();
    let hot = scheduler.create_hot_observable(vec![
      on_next::<i32, ()>(300, 1),
      on_next(1100, 2),
    ]);
    let source = hot.observable();
    let observer = scheduler.start_observable(move || source);
    assert_eq!(observer.messages(), vec![on_next(300, 1)]);
    assert_eq!(hot.subscriptions(), vec![Subscribed::new(200, 1000)]);
  }
}
