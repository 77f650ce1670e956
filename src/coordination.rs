//! Routing of several sources through one execution context.
//!
//! A [`Coordination`] turns a lifetime into a [`Coordinator`]: a worker plus
//! two adapters. `input` rewires how a source is subscribed and `output`
//! rewires how a subscriber receives signals. Multi-source and time-based
//! operators wrap every subscriber they emit to with `output`, so the chosen
//! policy decides whether their notifications are delivered as they come,
//! serialised, or moved onto the coordinator's worker.
//!
//! Every [`Scheduler`] is itself the identity coordination for its own
//! workers.

use std::{
  collections::VecDeque,
  sync::{Arc, Mutex},
};

use crate::{
  observable::Observable,
  observer::{Notification, Observer},
  rc::lock,
  scheduler::{CurrentThread, EventLoop, Instant, NewThread, Recurse, Scheduler, Worker},
  subscriber::Subscriber,
  subscription::{CompositeSubscription, SubscriptionLike},
};

/// A policy producing [`Coordinator`]s.
pub trait Coordination: Clone + Send + Sync + 'static {
  fn now(&self) -> Instant;

  fn create_coordinator(&self, lifetime: CompositeSubscription) -> Coordinator;
}

impl<S: Scheduler + Clone + 'static> Coordination for S {
  fn now(&self) -> Instant { Scheduler::now(self) }

  fn create_coordinator(&self, lifetime: CompositeSubscription) -> Coordinator {
    Coordinator::identity(self.create_worker(lifetime))
  }
}

#[derive(Clone)]
enum Strategy {
  Identity,
  Serialize(JobQueue),
  ObserveOn(JobQueue),
}

/// The per-subscription product of a [`Coordination`].
#[derive(Clone)]
pub struct Coordinator {
  worker: Worker,
  strategy: Strategy,
}

impl Coordinator {
  fn identity(worker: Worker) -> Self { Coordinator { worker, strategy: Strategy::Identity } }

  #[inline]
  pub fn worker(&self) -> &Worker { &self.worker }

  #[inline]
  pub fn now(&self) -> Instant { self.worker.now() }

  /// Adapts a source before it is subscribed.
  pub fn input<Item, Err>(&self, source: Observable<Item, Err>) -> Observable<Item, Err> { source }

  /// Adapts a subscriber so its signals follow this coordinator's policy.
  pub fn output<Item, Err>(&self, subscriber: Subscriber<Item, Err>) -> Subscriber<Item, Err>
  where
    Item: Send + 'static,
    Err: Send + 'static,
  {
    match &self.strategy {
      Strategy::Identity => subscriber,
      Strategy::Serialize(jobs) | Strategy::ObserveOn(jobs) => {
        // The target closes its own lifetime once the queued terminal signal
        // reaches it.
        let lifetime = subscriber.lifetime().child();
        Subscriber::new(lifetime, QueuedObserver { jobs: jobs.clone(), target: subscriber })
      }
    }
  }
}

struct QueuedObserver<Item, Err> {
  jobs: JobQueue,
  target: Subscriber<Item, Err>,
}

impl<Item, Err> QueuedObserver<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn forward(&self, signal: Notification<Item, Err>) {
    let target = self.target.clone();
    self.jobs.push(Box::new(move || target.emit(signal)));
  }
}

impl<Item, Err> Observer<Item, Err> for QueuedObserver<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) { self.forward(Notification::Next(value)) }

  fn error(self, err: Err) { self.forward(Notification::Error(err)) }

  fn complete(self) { self.forward(Notification::Completed) }
}

type Job = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct Jobs {
  queue: VecDeque<Job>,
  busy: bool,
}

/// A queue of jobs run one at a time, in push order, either by whichever
/// thread finds it idle or on a worker. Pushing never blocks on a running
/// job.
#[derive(Clone)]
pub(crate) struct JobQueue {
  jobs: Arc<Mutex<Jobs>>,
  worker: Option<Worker>,
}

impl JobQueue {
  /// Jobs run on the pushing thread.
  pub(crate) fn inline() -> Self { JobQueue { jobs: Arc::default(), worker: None } }

  /// Jobs run on `worker`.
  pub(crate) fn on(worker: Worker) -> Self { JobQueue { jobs: Arc::default(), worker: Some(worker) } }

  pub(crate) fn push(&self, job: Job) {
    if self.worker.as_ref().is_some_and(Worker::is_closed) {
      return;
    }
    {
      let mut jobs = lock(&self.jobs);
      jobs.queue.push_back(job);
      if jobs.busy {
        return;
      }
      jobs.busy = true;
    }
    match &self.worker {
      None => run_jobs(&self.jobs),
      Some(worker) => {
        let jobs = self.jobs.clone();
        worker.schedule(move |_| {
          run_jobs(&jobs);
          Recurse::Done
        });
      }
    }
  }
}

fn run_jobs(jobs: &Mutex<Jobs>) {
  loop {
    let job = {
      let mut state = lock(jobs);
      match state.queue.pop_front() {
        Some(job) => job,
        None => {
          state.busy = false;
          return;
        }
      }
    };
    job();
  }
}

/// Delivers as signals arrive, using a worker of `scheduler` for timing.
#[derive(Clone, Debug)]
pub struct IdentityOneWorker<S>(S);

pub fn identity_one_worker<S: Scheduler + Clone + 'static>(scheduler: S) -> IdentityOneWorker<S> {
  IdentityOneWorker(scheduler)
}

pub fn identity_current_thread() -> IdentityOneWorker<CurrentThread> { IdentityOneWorker(CurrentThread) }

impl<S: Scheduler + Clone + 'static> Coordination for IdentityOneWorker<S> {
  fn now(&self) -> Instant { Scheduler::now(&self.0) }

  fn create_coordinator(&self, lifetime: CompositeSubscription) -> Coordinator {
    Coordinator::identity(self.0.create_worker(lifetime))
  }
}

/// Serialises signals from any number of threads without moving them: the
/// thread finding the coordinator idle delivers, the others hand over.
#[derive(Clone, Debug)]
pub struct SerializeOneWorker<S>(S);

pub fn serialize_one_worker<S: Scheduler + Clone + 'static>(scheduler: S) -> SerializeOneWorker<S> {
  SerializeOneWorker(scheduler)
}

pub fn serialize_new_thread() -> SerializeOneWorker<NewThread> { SerializeOneWorker(NewThread::new()) }

pub fn serialize_event_loop() -> SerializeOneWorker<EventLoop> { SerializeOneWorker(EventLoop::shared()) }

impl<S: Scheduler + Clone + 'static> Coordination for SerializeOneWorker<S> {
  fn now(&self) -> Instant { Scheduler::now(&self.0) }

  fn create_coordinator(&self, lifetime: CompositeSubscription) -> Coordinator {
    Coordinator {
      worker: self.0.create_worker(lifetime),
      strategy: Strategy::Serialize(JobQueue::inline()),
    }
  }
}

/// Moves every signal onto the coordinator's single worker, in arrival
/// order.
#[derive(Clone, Debug)]
pub struct ObserveOnOneWorker<S>(S);

pub fn observe_on_one_worker<S: Scheduler + Clone + 'static>(scheduler: S) -> ObserveOnOneWorker<S> {
  ObserveOnOneWorker(scheduler)
}

pub fn observe_on_new_thread() -> ObserveOnOneWorker<NewThread> { ObserveOnOneWorker(NewThread::new()) }

pub fn observe_on_event_loop() -> ObserveOnOneWorker<EventLoop> { ObserveOnOneWorker(EventLoop::shared()) }

impl<S: Scheduler + Clone + 'static> Coordination for ObserveOnOneWorker<S> {
  fn now(&self) -> Instant { Scheduler::now(&self.0) }

  fn create_coordinator(&self, lifetime: CompositeSubscription) -> Coordinator {
    let worker = self.0.create_worker(lifetime);
    let jobs = JobQueue::on(worker.clone());
    Coordinator { worker, strategy: Strategy::ObserveOn(jobs) }
  }
}
