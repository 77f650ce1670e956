use std::cell::RefCell;

use super::{
  run_queue::RunQueue, sleep_until, Instant, Schedulable, Scheduler, Worker, WorkerBackend,
};
use crate::subscription::{CompositeSubscription, SubscriptionLike};

thread_local! {
  static QUEUE: RefCell<Option<RunQueue>> = const { RefCell::new(None) };
}

/// Runs work on the calling thread through a trampoline.
///
/// The first schedule on a thread with no active queue becomes the queue owner
/// and drains the queue before returning. Work scheduled while the queue is
/// draining is appended to it instead of running nested, so recursion through
/// this scheduler never grows the stack. Waiting for a future due time blocks
/// the thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentThread;

impl CurrentThread {
  /// `true` when no queue is active on this thread, so scheduling now would
  /// run the work before returning.
  pub fn is_schedule_required() -> bool { QUEUE.with(|q| q.borrow().is_none()) }

  /// Runs `f` with a queue active on this thread, then drains that queue
  /// before returning. Work scheduled on the current thread inside `f` waits
  /// for `f` to return. When a queue is already active, `f` simply runs.
  pub fn trampoline<R>(f: impl FnOnce() -> R) -> R {
    if !Self::is_schedule_required() {
      return f();
    }
    QUEUE.with(|q| *q.borrow_mut() = Some(RunQueue::new()));
    let _owner = QueueOwner;
    let result = f();
    while let Some(item) = QUEUE.with(|q| q.borrow_mut().as_mut().and_then(RunQueue::pop)) {
      run_at(item.when, item.what);
    }
    result
  }
}

impl Scheduler for CurrentThread {
  fn now(&self) -> Instant { Instant::now() }

  fn is_tail_recursion_allowed(&self) -> bool { queue_is_empty() }

  fn create_worker(&self, lifetime: CompositeSubscription) -> Worker {
    Worker::new(lifetime, CurrentThreadWorker)
  }
}

fn queue_is_empty() -> bool { QUEUE.with(|q| q.borrow().as_ref().map_or(true, RunQueue::is_empty)) }

struct CurrentThreadWorker;

impl WorkerBackend for CurrentThreadWorker {
  fn now(&self) -> Instant { Instant::now() }

  fn is_tail_recursion_allowed(&self) -> bool { queue_is_empty() }

  fn enqueue(&self, when: Instant, schedulable: Schedulable) {
    let first = QUEUE.with(|q| match q.borrow_mut().as_mut() {
      Some(queue) => {
        queue.push(when, schedulable);
        None
      }
      None => Some(schedulable),
    });
    if let Some(first) = first {
      CurrentThread::trampoline(|| run_at(when, first));
    }
  }
}

fn run_at(when: Instant, schedulable: Schedulable) {
  if schedulable.is_closed() {
    return;
  }
  sleep_until(when);
  if let Some(next) = schedulable.run() {
    QUEUE.with(|q| {
      if let Some(queue) = q.borrow_mut().as_mut() {
        queue.push(next, schedulable);
      }
    });
  }
}

/// Releases the thread's queue when draining ends, also on unwind.
struct QueueOwner;

impl Drop for QueueOwner {
  fn drop(&mut self) {
    let leftover = QUEUE.with(|q| q.borrow_mut().take());
    drop(leftover);
  }
}
