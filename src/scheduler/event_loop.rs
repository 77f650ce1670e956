use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};

use once_cell::sync::Lazy;

use super::{
  new_thread::{LoopWorker, RunLoop},
  Instant, Schedulable, Scheduler, Worker, WorkerBackend,
};
use crate::subscription::{CompositeSubscription, SubscriptionLike};

struct Loops {
  loops: Vec<Arc<RunLoop>>,
  next: AtomicUsize,
}

impl Drop for Loops {
  fn drop(&mut self) { self.loops.iter().for_each(|l| l.close()) }
}

/// A fixed set of loop threads; each new worker is pinned to the next loop,
/// round-robin.
///
/// Work of one worker always runs on the same thread, in due-time order.
/// Loop threads stop once the scheduler and all of its workers are dropped.
#[derive(Clone)]
pub struct EventLoop(Arc<Loops>);

static SHARED: Lazy<EventLoop> = Lazy::new(|| {
  let threads = std::thread::available_parallelism().map_or(1, |n| n.get());
  EventLoop::with_threads(threads)
});

impl EventLoop {
  /// The process-wide event loop, sized to the available parallelism.
  pub fn shared() -> EventLoop { SHARED.clone() }

  /// Starts `threads` loop threads (at least one).
  pub fn with_threads(threads: usize) -> EventLoop {
    let loops = (0..threads.max(1))
      .filter_map(|idx| match RunLoop::spawn(format!("rxcore-event-loop-{idx}")) {
        Ok(l) => Some(l),
        Err(err) => {
          tracing::error!(%err, idx, "failed to start an event loop thread");
          None
        }
      })
      .collect();
    EventLoop(Arc::new(Loops { loops, next: AtomicUsize::new(0) }))
  }

  pub fn threads(&self) -> usize { self.0.loops.len() }
}

impl Default for EventLoop {
  fn default() -> Self { Self::shared() }
}

impl Scheduler for EventLoop {
  fn now(&self) -> Instant { Instant::now() }

  fn create_worker(&self, lifetime: CompositeSubscription) -> Worker {
    let loops = &self.0.loops;
    if loops.is_empty() {
      tracing::error!("event loop has no running threads");
      let closed = Arc::new(RunLoop::default());
      closed.close();
      lifetime.unsubscribe();
      return Worker::new(lifetime, EventLoopWorker { _loops: self.0.clone(), inner: LoopWorker(closed) });
    }
    let idx = self.0.next.fetch_add(1, Ordering::Relaxed) % loops.len();
    Worker::new(lifetime, EventLoopWorker { _loops: self.0.clone(), inner: LoopWorker(loops[idx].clone()) })
  }
}

struct EventLoopWorker {
  // Keeps the loop threads running while the worker is in use.
  _loops: Arc<Loops>,
  inner: LoopWorker,
}

impl WorkerBackend for EventLoopWorker {
  fn now(&self) -> Instant { Instant::now() }

  fn is_tail_recursion_allowed(&self) -> bool { true }

  fn enqueue(&self, when: Instant, schedulable: Schedulable) {
    self.inner.enqueue(when, schedulable)
  }
}
