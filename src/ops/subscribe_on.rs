use crate::{
  observable::{Observable, OnSubscribe},
  scheduler::{once, Scheduler},
  subscriber::Subscriber,
};

pub struct SubscribeOn<Item, Err, S> {
  source: Observable<Item, Err>,
  scheduler: S,
}

impl<Item, Err, S> OnSubscribe<Item, Err> for SubscribeOn<Item, Err, S>
where
  Item: Send + 'static,
  Err: Send + 'static,
  S: Scheduler + Clone + 'static,
{
  fn on_subscribe(&self, subscriber: Subscriber<Item, Err>) -> Result<(), Err> {
    let worker = self.scheduler.create_worker(subscriber.lifetime().clone());
    let source = self.source.clone();
    worker.schedule(once(move |_| {
      source.subscribe_with(subscriber);
    }));
    Ok(())
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Subscribes to the source from a worker of `scheduler`. A source that
  /// emits synchronously then emits on that worker too.
  pub fn subscribe_on<S>(&self, scheduler: S) -> Observable<Item, Err>
  where
    S: Scheduler + Clone + 'static,
  {
    Observable::new(SubscribeOn { source: self.clone(), scheduler })
  }
}

#[cfg(test)]
mod test {
  use std::{sync::mpsc::channel, thread};

  use crate::{prelude::*, scheduler::NewThread};

  #[rxcore_macro::test]
  fn subscribes_on_the_worker_thread() {
    let (tx, rx) = channel();
    let caller = thread::current().id();
    observable::from_iter::<_, ()>(1..5)
      .subscribe_on(NewThread::new())
      .subscribe(move |v| {
        let _ = tx.send((v, thread::current().id()));
      });
    let got: Vec<_> = rx.iter().take(4).collect();
    assert_eq!(got.iter().map(|(v, _)| *v).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    assert!(got.iter().all(|(_, id)| *id != caller));
  }

  #[rxcore_macro::test]
  fn unsubscribe_before_the_worker_runs() {
    let scheduler = TestScheduler::new();
    let subscribed = MutArc::own(false);
    let c_subscribed = subscribed.clone();
    observable::create(move |_: Subscriber<i32, ()>| *c_subscribed.rc_deref_mut() = true)
      .subscribe_on(scheduler.clone())
      .subscribe(|_| {})
      .unsubscribe();
    scheduler.start();
    assert!(!*subscribed.rc_deref_mut());
  }
}
