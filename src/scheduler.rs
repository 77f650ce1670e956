//! Scheduling of work, now or at a time point, possibly repeatedly.
//!
//! A [`Scheduler`] is a stateless factory of [`Worker`]s. A worker is bound to
//! a lifetime subscription: everything scheduled through it is cancelled when
//! that lifetime unsubscribes. Each scheduled unit is a [`Schedulable`], which
//! is itself a subscription and may reschedule itself by returning a
//! [`Recurse`] value from its action.
//!
//! Reference strategies:
//!
//! | Scheduler | Execution |
//! |-----------|-----------|
//! | [`CurrentThread`] | thread-local trampoline queue, no stack growth |
//! | [`NewThread`] | one background thread per worker |
//! | [`EventLoop`] | fixed set of loop threads shared round-robin |
//! | [`TestScheduler`] | virtual time, driven by the test |
//! | `TokioScheduler` | tokio task per worker (feature `tokio-scheduler`) |

pub use std::time::{Duration, Instant};
use std::{
  fmt::{Debug, Formatter},
  sync::{Arc, Mutex},
};

use crate::{
  rc::lock,
  subscription::{CompositeSubscription, SubscriptionKey, SubscriptionLike},
};

mod current_thread;
mod event_loop;
mod new_thread;
mod run_queue;
pub mod test_scheduler;
#[cfg(feature = "tokio-scheduler")]
mod tokio_scheduler;

pub use current_thread::CurrentThread;
pub use event_loop::EventLoop;
pub use new_thread::NewThread;
pub use test_scheduler::TestScheduler;
#[cfg(feature = "tokio-scheduler")]
pub use tokio_scheduler::TokioScheduler;

/// A factory of workers with a notion of "now".
pub trait Scheduler: Send + Sync {
  fn now(&self) -> Instant;

  /// Whether an action asking to run again immediately may be repeated in
  /// place instead of being queued.
  fn is_tail_recursion_allowed(&self) -> bool { true }

  /// Creates a worker whose scheduled work dies with `lifetime`.
  fn create_worker(&self, lifetime: CompositeSubscription) -> Worker;
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
  fn now(&self) -> Instant { (**self).now() }

  fn is_tail_recursion_allowed(&self) -> bool { (**self).is_tail_recursion_allowed() }

  fn create_worker(&self, lifetime: CompositeSubscription) -> Worker {
    (**self).create_worker(lifetime)
  }
}

/// The queueing strategy behind a [`Worker`].
///
/// `enqueue` must run `schedulable` no earlier than `when`, in non-decreasing
/// due-time order, and re-enqueue it when [`Schedulable::run`] asks for it.
pub trait WorkerBackend: Send + Sync {
  fn now(&self) -> Instant;

  fn is_tail_recursion_allowed(&self) -> bool;

  fn enqueue(&self, when: Instant, schedulable: Schedulable);
}

/// What a scheduled action wants to happen after it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurse {
  /// Finished; the schedulable is unsubscribed.
  Done,
  /// Run again as soon as possible.
  Now,
  After(Duration),
  At(Instant),
}

type Action = Box<dyn FnMut(&Schedulable) -> Recurse + Send>;

/// Adapts a one-shot closure into a scheduled action.
pub fn once<F>(f: F) -> impl FnMut(&Schedulable) -> Recurse + Send + 'static
where
  F: FnOnce(&Schedulable) + Send + 'static,
{
  let mut f = Some(f);
  move |scbl| {
    if let Some(f) = f.take() {
      f(scbl);
    }
    Recurse::Done
  }
}

/// A handle to schedule work, bound to a lifetime.
#[derive(Clone)]
pub struct Worker {
  lifetime: CompositeSubscription,
  backend: Arc<dyn WorkerBackend>,
}

impl Worker {
  pub fn new(lifetime: CompositeSubscription, backend: impl WorkerBackend + 'static) -> Self {
    Worker { lifetime, backend: Arc::new(backend) }
  }

  #[inline]
  pub fn now(&self) -> Instant { self.backend.now() }

  #[inline]
  pub fn lifetime(&self) -> &CompositeSubscription { &self.lifetime }

  #[inline]
  pub fn is_tail_recursion_allowed(&self) -> bool { self.backend.is_tail_recursion_allowed() }

  /// Schedules `action` to run as soon as possible.
  pub fn schedule<A>(&self, action: A) -> Schedulable
  where
    A: FnMut(&Schedulable) -> Recurse + Send + 'static,
  {
    self.schedule_at(self.now(), action)
  }

  pub fn schedule_after<A>(&self, delay: Duration, action: A) -> Schedulable
  where
    A: FnMut(&Schedulable) -> Recurse + Send + 'static,
  {
    self.schedule_at(self.now() + delay, action)
  }

  /// Schedules `action` at `when`. On a closed worker this is a silent no-op:
  /// the returned schedulable is already unsubscribed.
  pub fn schedule_at<A>(&self, when: Instant, action: A) -> Schedulable
  where
    A: FnMut(&Schedulable) -> Recurse + Send + 'static,
  {
    let scbl = Schedulable::new(self.clone(), Box::new(action));
    if scbl.is_subscribed() {
      self.backend.enqueue(when, scbl.clone());
    }
    scbl
  }
}

impl SubscriptionLike for Worker {
  #[inline]
  fn unsubscribe(&self) { self.lifetime.unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { self.lifetime.is_closed() }
}

impl Debug for Worker {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Worker")
      .field("lifetime", &self.lifetime)
      .finish()
  }
}

struct SchedulableState {
  worker: Worker,
  action: Mutex<Option<Action>>,
}

/// One unit of scheduled work.
///
/// Each schedulable owns a lifetime attached to its worker's lifetime, so it
/// can be cancelled on its own. The attachment is detached again once the work
/// finishes. A schedulable whose lifetime is closed never runs its action.
#[derive(Clone)]
pub struct Schedulable {
  lifetime: CompositeSubscription,
  state: Arc<SchedulableState>,
}

impl Schedulable {
  fn new(worker: Worker, action: Action) -> Self {
    let lifetime = worker.lifetime.child();
    Schedulable {
      lifetime,
      state: Arc::new(SchedulableState { worker, action: Mutex::new(Some(action)) }),
    }
  }

  #[inline]
  pub fn worker(&self) -> &Worker { &self.state.worker }

  #[inline]
  pub fn lifetime(&self) -> &CompositeSubscription { &self.lifetime }

  #[inline]
  pub fn now(&self) -> Instant { self.state.worker.now() }

  /// Ties `subscription` to this unit of work.
  pub fn add<S: SubscriptionLike + 'static>(&self, subscription: S) -> SubscriptionKey {
    self.lifetime.add(subscription)
  }

  /// Invokes the action once. A closed schedulable reports `Done` without
  /// running, and so does a call made from inside the running action.
  pub fn invoke(&self) -> Recurse {
    if self.is_closed() {
      return Recurse::Done;
    }
    let taken = lock(&self.state.action).take();
    let Some(mut action) = taken else {
      tracing::warn!("schedulable invoked while its action is running");
      return Recurse::Done;
    };
    let recurse = action(self);
    *lock(&self.state.action) = Some(action);
    recurse
  }

  /// Drives the action, repeating in place while it returns `Recurse::Now`
  /// and the worker allows tail recursion.
  ///
  /// Returns the time it wants to run again, or `None` once it is finished.
  pub fn run(&self) -> Option<Instant> {
    loop {
      if self.is_closed() {
        tracing::trace!("skipping cancelled schedulable");
        return None;
      }
      match self.invoke() {
        Recurse::Done => {
          self.unsubscribe();
          return None;
        }
        Recurse::Now if self.state.worker.is_tail_recursion_allowed() => continue,
        Recurse::Now => return Some(self.now()),
        Recurse::After(delay) => return Some(self.now() + delay),
        Recurse::At(when) => return Some(when),
      }
    }
  }

  #[inline]
  pub fn ptr_eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.state, &other.state) }
}

impl SubscriptionLike for Schedulable {
  #[inline]
  fn unsubscribe(&self) { self.lifetime.unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { self.lifetime.is_closed() }
}

impl Debug for Schedulable {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Schedulable")
      .field("is_closed", &self.is_closed())
      .finish()
  }
}

pub(crate) fn sleep_until(when: Instant) {
  let now = Instant::now();
  if when > now {
    std::thread::sleep(when - now);
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;

  #[rxcore_macro::test]
  fn once_runs_a_single_time() {
    let runs = Arc::new(AtomicUsize::new(0));
    let c_runs = runs.clone();
    let worker = CurrentThread.create_worker(CompositeSubscription::new());
    worker.schedule(once(move |_| {
      c_runs.fetch_add(1, Ordering::SeqCst);
    }));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
  }

  #[rxcore_macro::test]
  fn finished_schedulable_detaches_from_worker() {
    let lifetime = CompositeSubscription::new();
    let worker = CurrentThread.create_worker(lifetime.clone());
    let scbl = worker.schedule(once(|_| {}));
    assert!(scbl.is_closed());
    assert!(lifetime.is_empty());
    assert!(worker.is_subscribed());
  }

  #[rxcore_macro::test]
  fn closed_worker_schedules_nothing() {
    let lifetime = CompositeSubscription::new();
    let worker = CurrentThread.create_worker(lifetime.clone());
    lifetime.unsubscribe();
    let ran = Arc::new(AtomicUsize::new(0));
    let c_ran = ran.clone();
    let scbl = worker.schedule(once(move |_| {
      c_ran.fetch_add(1, Ordering::SeqCst);
    }));
    assert!(scbl.is_closed());
    assert_eq!(ran.load(Ordering::SeqCst), 0);
  }

  #[rxcore_macro::test]
  fn invoke_after_unsubscribe_does_not_run() {
    let scheduler = TestScheduler::new();
    let worker = scheduler.create_worker(CompositeSubscription::new());
    let ran = Arc::new(AtomicUsize::new(0));
    let c_ran = ran.clone();
    let scbl = worker.schedule_after(Duration::from_millis(10), move |_| {
      c_ran.fetch_add(1, Ordering::SeqCst);
      Recurse::Done
    });
    assert_eq!(scbl.invoke(), Recurse::Done);
    assert_eq!(ran.load(Ordering::SeqCst), 1);
    scbl.unsubscribe();
    assert_eq!(scbl.invoke(), Recurse::Done);
    assert_eq!(ran.load(Ordering::SeqCst), 1);
    scheduler.start();
    assert_eq!(ran.load(Ordering::SeqCst), 1);
  }

  #[rxcore_macro::test]
  fn tail_recursion_does_not_grow_the_stack() {
    let count = Arc::new(AtomicUsize::new(0));
    let c_count = count.clone();
    let worker = CurrentThread.create_worker(CompositeSubscription::new());
    worker.schedule(move |_| {
      if c_count.fetch_add(1, Ordering::SeqCst) + 1 < 1_000_000 {
        Recurse::Now
      } else {
        Recurse::Done
      }
    });
    assert_eq!(count.load(Ordering::SeqCst), 1_000_000);
  }

  #[rxcore_macro::test]
  fn cancelling_one_item_keeps_the_worker() {
    let scheduler = TestScheduler::new();
    let worker = scheduler.create_worker(CompositeSubscription::new());
    let log = Arc::new(Mutex::new(vec![]));
    let (l1, l2) = (log.clone(), log.clone());
    let first = worker.schedule_after(
      Duration::from_millis(10),
      once(move |_| l1.lock().unwrap().push(1)),
    );
    worker.schedule_after(Duration::from_millis(20), once(move |_| l2.lock().unwrap().push(2)));
    first.unsubscribe();
    scheduler.start();
    assert_eq!(*log.lock().unwrap(), vec![2]);
    assert!(worker.is_subscribed());
  }
}
