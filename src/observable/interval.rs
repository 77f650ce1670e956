use crate::{
  observable::{create, Observable},
  scheduler::{once, Duration, Recurse, Scheduler},
  subscriber::Subscriber,
};

/// Emits `0, 1, 2, ...` every `period`, the first value one period after
/// subscribing. Never completes.
pub fn interval<Err, S>(period: Duration, scheduler: S) -> Observable<usize, Err>
where
  Err: Send + 'static,
  S: Scheduler + Clone + 'static,
{
  create(move |s: Subscriber<usize, Err>| {
    let worker = scheduler.create_worker(s.lifetime().clone());
    let mut due = worker.now() + period;
    let mut count = 0;
    worker.schedule_at(due, move |_| {
      s.on_next(count);
      count += 1;
      due += period;
      Recurse::At(due)
    });
  })
}

/// Emits `0` once `delay` has passed, then completes.
pub fn timer<Err, S>(delay: Duration, scheduler: S) -> Observable<usize, Err>
where
  Err: Send + 'static,
  S: Scheduler + Clone + 'static,
{
  create(move |s: Subscriber<usize, Err>| {
    let worker = scheduler.create_worker(s.lifetime().clone());
    worker.schedule_after(
      delay,
      once(move |_| {
        s.on_next(0);
        s.on_completed();
      }),
    );
  })
}
