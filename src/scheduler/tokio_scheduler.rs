use std::{
  future::Future,
  pin::Pin,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
  },
  task::{Context, Poll},
};

use pin_project_lite::pin_project;
use tokio::{
  runtime::{Handle, TryCurrentError},
  sync::{futures::Notified, Notify},
  time::{sleep_until, Sleep},
};

use super::{run_queue::RunQueue, Instant, Schedulable, Scheduler, Worker, WorkerBackend};
use crate::{
  rc::lock,
  subscription::{CompositeSubscription, Subscription},
};

/// Runs each worker as a task on a tokio runtime.
///
/// ```rust
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use rxcore::{prelude::*, scheduler::TokioScheduler};
/// use futures::StreamExt;
///
/// let scheduler = TokioScheduler::current().expect("inside a runtime");
/// let values: Vec<_> = observable::interval::<(), _>(Duration::from_millis(1), scheduler)
///   .take(3)
///   .into_stream()
///   .collect()
///   .await;
/// assert_eq!(values, vec![Ok(0), Ok(1), Ok(2)]);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TokioScheduler {
  handle: Handle,
}

impl TokioScheduler {
  pub fn new(handle: Handle) -> Self { TokioScheduler { handle } }

  /// A scheduler on the runtime the caller is running in.
  pub fn current() -> Result<Self, TryCurrentError> { Handle::try_current().map(Self::new) }
}

impl Scheduler for TokioScheduler {
  fn now(&self) -> Instant { Instant::now() }

  fn create_worker(&self, lifetime: CompositeSubscription) -> Worker {
    let queue = Arc::new(TaskQueue::default());
    let c_queue = queue.clone();
    lifetime.add(Subscription::new(move || c_queue.close()));
    self.handle.spawn(queue.clone().serve());
    Worker::new(lifetime, TaskWorker(queue))
  }
}

#[derive(Default)]
struct TaskQueue {
  items: Mutex<RunQueue>,
  poke: Notify,
  closed: AtomicBool,
}

impl TaskQueue {
  fn push(&self, when: Instant, schedulable: Schedulable) {
    if self.closed.load(Ordering::Acquire) {
      tracing::trace!("dropping work scheduled on a stopped tokio worker");
      return;
    }
    lock(&self.items).push(when, schedulable);
    self.poke.notify_one();
  }

  fn close(&self) {
    self.closed.store(true, Ordering::Release);
    let pending = lock(&self.items).drain();
    self.poke.notify_one();
    drop(pending);
  }

  async fn serve(self: Arc<Self>) {
    tracing::debug!("tokio worker started");
    while !self.closed.load(Ordering::Acquire) {
      let due = {
        let mut items = lock(&self.items);
        match items.peek_when() {
          Some(when) if when <= Instant::now() => Ok(items.pop()),
          next => Err(next),
        }
      };
      match due {
        Ok(Some(item)) => {
          if let Some(next) = item.what.run() {
            self.push(next, item.what);
          }
        }
        Ok(None) => {}
        Err(next) => {
          Wakeup {
            sleep: next.map(|when| sleep_until(when.into())),
            poked: self.poke.notified(),
          }
          .await
        }
      }
    }
    tracing::debug!("tokio worker stopped");
  }
}

pin_project! {
  /// Resolves at the next due time or when the queue is poked, whichever
  /// comes first.
  struct Wakeup<'a> {
    #[pin]
    sleep: Option<Sleep>,
    #[pin]
    poked: Notified<'a>,
  }
}

impl Future for Wakeup<'_> {
  type Output = ();

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
    let this = self.project();
    if this.poked.poll(cx).is_ready() {
      return Poll::Ready(());
    }
    match this.sleep.as_pin_mut() {
      Some(sleep) => sleep.poll(cx),
      None => Poll::Pending,
    }
  }
}

struct TaskWorker(Arc<TaskQueue>);

impl WorkerBackend for TaskWorker {
  fn now(&self) -> Instant { Instant::now() }

  fn is_tail_recursion_allowed(&self) -> bool { true }

  fn enqueue(&self, when: Instant, schedulable: Schedulable) { self.0.push(when, schedulable) }
}
