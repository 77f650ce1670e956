use std::ops::Range;

use crate::{
  observable::{create, Observable},
  rc::MutArc,
  scheduler::{CurrentThread, Recurse, Scheduler, Worker},
  subscriber::Subscriber,
  subscription::SubscriptionLike,
};

/// Emits every value of `iter` synchronously on the subscribing thread, then
/// completes. Stops early once the subscriber unsubscribes.
pub fn from_iter<I, Err>(iter: I) -> Observable<I::Item, Err>
where
  I: IntoIterator + Clone + Send + Sync + 'static,
  I::Item: Send + 'static,
  Err: Send + 'static,
{
  create(move |s| {
    for v in iter.clone() {
      if s.is_closed() {
        return;
      }
      s.on_next(v);
    }
    s.on_completed();
  })
}

/// Emits the values of `iter` one scheduled step at a time on a worker of
/// `scheduler`.
///
/// Each value is a tail-recursive step, so a long sequence on
/// [`CurrentThread`] runs in constant stack. Emission halts while the
/// subscriber's [`Resumption`](crate::subscriber::Resumption) is paused and
/// continues when it resumes.
pub fn iterate_on<I, Err, S>(iter: I, scheduler: S) -> Observable<I::Item, Err>
where
  I: IntoIterator + Clone + Send + Sync + 'static,
  I::IntoIter: Send + 'static,
  I::Item: Send + 'static,
  Err: Send + 'static,
  S: Scheduler + Clone + 'static,
{
  create(move |s: Subscriber<I::Item, Err>| {
    let worker = scheduler.create_worker(s.lifetime().clone());
    drive(&worker, s, MutArc::own(iter.clone().into_iter()));
  })
}

/// [`iterate_on`] the current thread.
pub fn iterate<I, Err>(iter: I) -> Observable<I::Item, Err>
where
  I: IntoIterator + Clone + Send + Sync + 'static,
  I::IntoIter: Send + 'static,
  I::Item: Send + 'static,
  Err: Send + 'static,
{
  iterate_on(iter, CurrentThread)
}

/// Emits the values of `range` in order, trampolined on the current thread.
pub fn range<T, Err>(range: Range<T>) -> Observable<T, Err>
where
  Range<T>: Iterator<Item = T> + Clone + Send + Sync + 'static,
  T: Send + 'static,
  Err: Send + 'static,
{
  iterate(range)
}

fn drive<It, Err>(worker: &Worker, s: Subscriber<It::Item, Err>, values: MutArc<It>)
where
  It: Iterator + Send + 'static,
  It::Item: Send + 'static,
  Err: Send + 'static,
{
  let c_worker = worker.clone();
  worker.schedule(move |_| {
    let resumption = s.resumption();
    if !resumption.is_resumed() {
      let (worker, s, values) = (c_worker.clone(), s.clone(), values.clone());
      resumption.on_resume(move || drive(&worker, s, values));
      return Recurse::Done;
    }
    let next = values.rc_deref_mut().next();
    match next {
      Some(v) => {
        s.on_next(v);
        Recurse::Now
      }
      None => {
        s.on_completed();
        Recurse::Done
      }
    }
  });
}
