use std::{collections::VecDeque, sync::Arc};

use super::outbox::{post, HasOutbox, Outbox};
use crate::{
  observable::{Observable, OnSubscribe},
  observer::{Notification, Observer},
  rc::MutArc,
  subscriber::Subscriber,
};

struct Queues<A, B, Err> {
  a: VecDeque<A>,
  b: VecDeque<B>,
  a_done: bool,
  b_done: bool,
  outbox: Outbox<(A, B), Err>,
}

impl<A, B, Err> Queues<A, B, Err> {
  /// A source that completed with nothing queued can never be paired again.
  fn exhausted(&self) -> bool { (self.a_done && self.a.is_empty()) || (self.b_done && self.b.is_empty()) }
}

impl<A, B, Err> HasOutbox for Queues<A, B, Err> {
  type Item = (A, B);
  type Err = Err;

  fn outbox(&mut self) -> &mut Outbox<(A, B), Err> { &mut self.outbox }
}

pub struct Zip<A, B, Err, F> {
  a: Observable<A, Err>,
  b: Observable<B, Err>,
  selector: Arc<F>,
}

impl<A, B, Out, Err, F> OnSubscribe<Out, Err> for Zip<A, B, Err, F>
where
  A: Send + 'static,
  B: Send + 'static,
  Out: Send + 'static,
  Err: Send + 'static,
  F: Fn(A, B) -> Result<Out, Err> + Send + Sync + 'static,
{
  fn on_subscribe(&self, out: Subscriber<Out, Err>) -> Result<(), Err> {
    let state = MutArc::own(Queues {
      a: VecDeque::new(),
      b: VecDeque::new(),
      a_done: false,
      b_done: false,
      outbox: Outbox::default(),
    });
    let a_side = ZipObserver {
      out: out.clone(),
      state: state.clone(),
      selector: self.selector.clone(),
      push: |q: &mut Queues<A, B, Err>, v: A| q.a.push_back(v),
      finish: |q: &mut Queues<A, B, Err>| q.a_done = true,
    };
    let b_side = ZipObserver {
      out: out.clone(),
      state,
      selector: self.selector.clone(),
      push: |q: &mut Queues<A, B, Err>, v: B| q.b.push_back(v),
      finish: |q: &mut Queues<A, B, Err>| q.b_done = true,
    };
    self.a.subscribe_with(Subscriber::new(out.lifetime().child(), a_side));
    self.b.subscribe_with(Subscriber::new(out.lifetime().child(), b_side));
    Ok(())
  }
}

struct ZipObserver<A, B, V, Out, Err, F> {
  out: Subscriber<Out, Err>,
  state: MutArc<Queues<A, B, Err>>,
  selector: Arc<F>,
  push: fn(&mut Queues<A, B, Err>, V),
  finish: fn(&mut Queues<A, B, Err>),
}

impl<A, B, V, Out, Err, F> ZipObserver<A, B, V, Out, Err, F>
where
  Out: Send + 'static,
  Err: Send + 'static,
  F: Fn(A, B) -> Result<Out, Err>,
{
  fn post(&self, update: impl FnOnce(&mut Queues<A, B, Err>)) {
    let (out, selector) = (&self.out, &self.selector);
    post(&self.state, update, |signal| match signal {
      Notification::Next((a, b)) => match selector(a, b) {
        Ok(v) => out.on_next(v),
        Err(e) => out.on_error(e),
      },
      Notification::Error(e) => out.on_error(e),
      Notification::Completed => out.on_completed(),
    });
  }
}

impl<A, B, V, Out, Err, F> Observer<V, Err> for ZipObserver<A, B, V, Out, Err, F>
where
  Out: Send + 'static,
  Err: Send + 'static,
  F: Fn(A, B) -> Result<Out, Err>,
{
  fn next(&mut self, value: V) {
    let push = self.push;
    self.post(|state| {
      push(state, value);
      if !state.a.is_empty() && !state.b.is_empty() {
        if let Some(pair) = state.a.pop_front().zip(state.b.pop_front()) {
          state.outbox.push(Notification::Next(pair));
        }
      }
      if state.exhausted() {
        state.outbox.push(Notification::Completed);
      }
    });
  }

  fn error(self, err: Err) { self.post(|state| state.outbox.push(Notification::Error(err))) }

  fn complete(self) {
    let finish = self.finish;
    self.post(|state| {
      finish(state);
      if state.exhausted() {
        state.outbox.push(Notification::Completed);
      }
    });
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Pairs the n-th value of this observable with the n-th value of `other`.
  /// Completes as soon as one side has completed and every value it produced
  /// has been paired.
  pub fn zip<B>(&self, other: Observable<B, Err>) -> Observable<(Item, B), Err>
  where
    B: Send + 'static,
  {
    self.zip_with(other, |a, b| (a, b))
  }

  /// Like [`Observable::zip`], combining each pair with `f`.
  pub fn zip_with<B, Out, F>(&self, other: Observable<B, Err>, f: F) -> Observable<Out, Err>
  where
    B: Send + 'static,
    Out: Send + 'static,
    F: Fn(Item, B) -> Out + Send + Sync + 'static,
  {
    self.try_zip_with(other, move |a, b| Ok(f(a, b)))
  }

  /// Like [`Observable::zip_with`] with a selector that can fail. An `Err`
  /// from the selector ends the stream and unsubscribes both sources.
  pub fn try_zip_with<B, Out, F>(&self, other: Observable<B, Err>, f: F) -> Observable<Out, Err>
  where
    B: Send + 'static,
    Out: Send + 'static,
    F: Fn(Item, B) -> Result<Out, Err> + Send + Sync + 'static,
  {
    Observable::new(Zip { a: self.clone(), b: other, selector: Arc::new(f) })
  }
}

#[cfg(test)]
mod test {
  use crate::{prelude::*, scheduler::test_scheduler::*};

  #[rxcore_macro::test]
  fn pairs_in_order() {
    let seen = MutArc::own(vec![]);
    let c_seen = seen.clone();
    observable::from_iter::<_, ()>(0..3)
      .zip(observable::from_iter(vec!["a", "b", "c", "d"]))
      .subscribe(move |v| c_seen.rc_deref_mut().push(v));
    assert_eq!(*seen.rc_deref_mut(), vec![(0, "a"), (1, "b"), (2, "c")]);
  }

  #[rxcore_macro::test]
  fn completes_when_a_finished_side_runs_dry() {
    let scheduler = TestScheduler::new();
    let a = scheduler.create_hot_observable(vec![
      on_next(210, 1),
      on_next(220, 2),
      on_completed::<i32, ()>(230),
    ]);
    let b = scheduler.create_hot_observable(vec![
      on_next(240, 10),
      on_next(250, 20),
      on_next(260, 30),
      on_completed::<i32, ()>(270),
    ]);
    let (a_src, b_src) = (a.observable(), b.observable());
    let observer = scheduler.start_observable(move || a_src.zip(b_src));
    assert_eq!(
      observer.messages(),
      vec![on_next(240, (1, 10)), on_next(250, (2, 20)), on_completed(250)]
    );
    assert_eq!(b.subscriptions(), vec![Subscribed::new(200, 250)]);
  }

  #[rxcore_macro::test]
  fn error_from_either_side() {
    let a = Subject::<i32, &str>::new();
    let b = Subject::<i32, &str>::new();
    let err = MutArc::own(None);
    let c_err = err.clone();
    a.observable().zip(b.observable()).subscribe_err(|_| {}, move |e| *c_err.rc_deref_mut() = Some(e));
    a.next(1);
    b.error("boom");
    assert_eq!(*err.rc_deref_mut(), Some("boom"));
    assert!(!a.has_observers());
  }

  #[rxcore_macro::test]
  fn combines_pairs_with_a_selector() {
    let seen = MutArc::own(vec![]);
    let c_seen = seen.clone();
    observable::from_iter::<_, ()>(1..4)
      .zip_with(observable::from_iter(vec![10, 20, 30]), |a, b| a * b)
      .subscribe(move |v| c_seen.rc_deref_mut().push(v));
    assert_eq!(*seen.rc_deref_mut(), vec![10, 40, 90]);
  }

  #[rxcore_macro::test]
  fn selector_error_unsubscribes_both() {
    let a = Subject::<i32, &str>::new();
    let b = Subject::<i32, &str>::new();
    let log = MutArc::own(vec![]);
    let (l1, l2) = (log.clone(), log.clone());
    a.observable()
      .try_zip_with(b.observable(), |a, b| if b == 0 { Err("divide by zero") } else { Ok(a / b) })
      .subscribe_err(
        move |v| l1.rc_deref_mut().push(v.to_string()),
        move |e| l2.rc_deref_mut().push(e.to_owned()),
      );
    a.next(6);
    b.next(3);
    a.next(1);
    b.next(0);
    a.next(5);
    assert_eq!(*log.rc_deref_mut(), vec!["2", "divide by zero"]);
    assert!(!a.has_observers() && !b.has_observers());
  }

  #[rxcore_macro::test]
  fn threaded_sides_pair_in_order() {
    let (tx, rx) = std::sync::mpsc::channel();
    let done = tx.clone();
    let a = observable::from_iter::<_, ()>(0..500).subscribe_on(NewThread::new());
    let b = observable::from_iter::<_, ()>(0..500).subscribe_on(NewThread::new());
    a.zip(b).subscribe_all(
      move |pair| {
        let _ = tx.send(Some(pair));
      },
      |_| {},
      move || {
        let _ = done.send(None);
      },
    );
    let mut pairs = vec![];
    while let Ok(Some(pair)) = rx.recv() {
      pairs.push(pair);
    }
    assert_eq!(pairs, (0..500).map(|v| (v, v)).collect::<Vec<_>>());
  }
}
