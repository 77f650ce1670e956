use std::{
  borrow::Cow,
  sync::{Arc, Condvar, Mutex, PoisonError},
};

use super::{run_queue::RunQueue, Instant, Schedulable, Scheduler, Worker, WorkerBackend};
use crate::{
  rc::lock,
  subscription::{CompositeSubscription, Subscription, SubscriptionLike},
};

#[derive(Default)]
struct LoopQueue {
  items: RunQueue,
  closed: bool,
}

/// A run queue served by one dedicated thread.
#[derive(Default)]
pub(crate) struct RunLoop {
  queue: Mutex<LoopQueue>,
  wake: Condvar,
}

impl RunLoop {
  /// Spawns the thread serving a new loop.
  pub(crate) fn spawn(name: String) -> std::io::Result<Arc<RunLoop>> {
    let run_loop = Arc::new(RunLoop::default());
    let c_loop = run_loop.clone();
    std::thread::Builder::new()
      .name(name)
      .spawn(move || c_loop.serve())?;
    Ok(run_loop)
  }

  pub(crate) fn push(&self, when: Instant, schedulable: Schedulable) {
    let mut queue = lock(&self.queue);
    if queue.closed {
      drop(queue);
      tracing::trace!("dropping work scheduled on a stopped run loop");
      return;
    }
    queue.items.push(when, schedulable);
    drop(queue);
    self.wake.notify_one();
  }

  /// Stops the serving thread. Pending work is discarded.
  pub(crate) fn close(&self) {
    let pending = {
      let mut queue = lock(&self.queue);
      queue.closed = true;
      queue.items.drain()
    };
    self.wake.notify_all();
    drop(pending);
  }

  fn serve(&self) {
    tracing::debug!("run loop started");
    while let Some(item) = self.next_due() {
      if let Some(next) = item.what.run() {
        self.push(next, item.what);
      }
    }
    tracing::debug!("run loop stopped");
  }

  /// Blocks until an item is due, or returns `None` once the loop is closed.
  fn next_due(&self) -> Option<super::run_queue::QueueItem> {
    let mut queue = lock(&self.queue);
    loop {
      if queue.closed {
        return None;
      }
      match queue.items.peek_when() {
        None => queue = self.wake.wait(queue).unwrap_or_else(PoisonError::into_inner),
        Some(when) => {
          let now = Instant::now();
          if when <= now {
            let item = queue.items.pop();
            match item {
              Some(item) if item.what.is_closed() => continue,
              Some(item) => return Some(item),
              None => continue,
            }
          }
          queue = self
            .wake
            .wait_timeout(queue, when - now)
            .map_or_else(|e| e.into_inner().0, |(guard, _)| guard);
        }
      }
    }
  }
}

/// Runs each worker's work on a thread of its own.
///
/// The thread is started by [`Scheduler::create_worker`] and exits when the
/// worker's lifetime unsubscribes.
#[derive(Debug, Clone)]
pub struct NewThread {
  name: Cow<'static, str>,
}

impl NewThread {
  pub fn new() -> Self { NewThread { name: Cow::Borrowed("rxcore-new-thread") } }

  /// Names the threads started by this scheduler.
  pub fn named(name: impl Into<Cow<'static, str>>) -> Self { NewThread { name: name.into() } }
}

impl Default for NewThread {
  fn default() -> Self { Self::new() }
}

impl Scheduler for NewThread {
  fn now(&self) -> Instant { Instant::now() }

  fn create_worker(&self, lifetime: CompositeSubscription) -> Worker {
    match RunLoop::spawn(self.name.to_string()) {
      Ok(run_loop) => {
        let c_loop = run_loop.clone();
        lifetime.add(Subscription::new(move || c_loop.close()));
        Worker::new(lifetime, LoopWorker(run_loop))
      }
      Err(err) => {
        tracing::error!(%err, "failed to start a new-thread worker");
        let run_loop = Arc::new(RunLoop::default());
        run_loop.close();
        lifetime.unsubscribe();
        Worker::new(lifetime, LoopWorker(run_loop))
      }
    }
  }
}

pub(crate) struct LoopWorker(pub(crate) Arc<RunLoop>);

impl WorkerBackend for LoopWorker {
  fn now(&self) -> Instant { Instant::now() }

  fn is_tail_recursion_allowed(&self) -> bool { true }

  fn enqueue(&self, when: Instant, schedulable: Schedulable) { self.0.push(when, schedulable) }
}

#[cfg(test)]
mod tests {
  use std::{
    sync::mpsc::channel,
    thread::{self, ThreadId},
  };

  use super::*;
  use crate::scheduler::{once, Duration};

  #[rxcore_macro::test]
  fn runs_off_the_calling_thread_in_order() {
    let (tx, rx) = channel::<(u32, ThreadId, Option<String>)>();
    let lifetime = CompositeSubscription::new();
    let worker = NewThread::named("pinned").create_worker(lifetime.clone());
    for (ms, tag) in [(30, 3), (10, 1), (20, 2)] {
      let tx = tx.clone();
      worker.schedule_after(Duration::from_millis(ms), once(move |_| {
        let current = thread::current();
        tx.send((tag, current.id(), current.name().map(str::to_owned))).unwrap();
      }));
    }
    let got: Vec<_> = (0..3).map(|_| rx.recv().unwrap()).collect();
    assert_eq!(got.iter().map(|(tag, ..)| *tag).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert!(got.iter().all(|(_, id, _)| *id == got[0].1));
    assert_ne!(got[0].1, thread::current().id());
    assert_eq!(got[0].2.as_deref(), Some("pinned"));
    lifetime.unsubscribe();
  }

  #[rxcore_macro::test]
  fn unsubscribing_the_lifetime_cancels_pending_work() {
    let (tx, rx) = channel::<u32>();
    let lifetime = CompositeSubscription::new();
    let worker = NewThread::new().create_worker(lifetime.clone());
    worker.schedule_after(Duration::from_millis(200), once(move |_| tx.send(1).unwrap()));
    lifetime.unsubscribe();
    assert!(rx.recv_timeout(Duration::from_millis(400)).is_err());
  }
}
