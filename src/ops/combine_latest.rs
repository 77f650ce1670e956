//! Joins that pair each source's latest value.
//!
//! Every source is subscribed on its own child of the output lifetime, so
//! cancelling downstream cancels all of them. The joined stream completes
//! once every source has completed. Joined values are queued on an
//! [outbox](super::outbox) under the shared lock, so downstream sees them in
//! the order they were formed even when the sources run on different threads.

use std::sync::Arc;

use super::outbox::{post, HasOutbox, Outbox};
use crate::{
  observable::{Observable, OnSubscribe},
  observer::{Notification, Observer},
  rc::MutArc,
  subscriber::Subscriber,
};

struct Latest<A, B, Err> {
  a: Option<A>,
  b: Option<B>,
  pending: usize,
  outbox: Outbox<(A, B), Err>,
}

impl<A, B, Err> HasOutbox for Latest<A, B, Err> {
  type Item = (A, B);
  type Err = Err;

  fn outbox(&mut self) -> &mut Outbox<(A, B), Err> { &mut self.outbox }
}

type Store<A, B, Err, V> = fn(&mut Latest<A, B, Err>, V);

pub struct CombineLatest<A, B, Err, F> {
  a: Observable<A, Err>,
  b: Observable<B, Err>,
  selector: Arc<F>,
}

impl<A, B, Out, Err, F> OnSubscribe<Out, Err> for CombineLatest<A, B, Err, F>
where
  A: Clone + Send + 'static,
  B: Clone + Send + 'static,
  Out: Send + 'static,
  Err: Send + 'static,
  F: Fn(A, B) -> Result<Out, Err> + Send + Sync + 'static,
{
  fn on_subscribe(&self, out: Subscriber<Out, Err>) -> Result<(), Err> {
    let state = MutArc::own(Latest { a: None, b: None, pending: 2, outbox: Outbox::default() });
    let a_side = Side {
      out: out.clone(),
      state: state.clone(),
      selector: self.selector.clone(),
      store: |s: &mut Latest<A, B, Err>, v: A| s.a = Some(v),
    };
    let b_side = Side {
      out: out.clone(),
      state,
      selector: self.selector.clone(),
      store: |s: &mut Latest<A, B, Err>, v: B| s.b = Some(v),
    };
    self.a.subscribe_with(Subscriber::new(out.lifetime().child(), a_side));
    self.b.subscribe_with(Subscriber::new(out.lifetime().child(), b_side));
    Ok(())
  }
}

struct Side<A, B, V, Out, Err, F> {
  out: Subscriber<Out, Err>,
  state: MutArc<Latest<A, B, Err>>,
  selector: Arc<F>,
  store: Store<A, B, Err, V>,
}

impl<A, B, V, Out, Err, F> Side<A, B, V, Out, Err, F>
where
  Out: Send + 'static,
  Err: Send + 'static,
  F: Fn(A, B) -> Result<Out, Err>,
{
  fn post(&self, update: impl FnOnce(&mut Latest<A, B, Err>)) {
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

impl<A, B, V, Out, Err, F> Observer<V, Err> for Side<A, B, V, Out, Err, F>
where
  A: Clone,
  B: Clone,
  Out: Send + 'static,
  Err: Send + 'static,
  F: Fn(A, B) -> Result<Out, Err>,
{
  fn next(&mut self, value: V) {
    let store = self.store;
    self.post(|state| {
      store(state, value);
      if let Some(pair) = state.a.clone().zip(state.b.clone()) {
        state.outbox.push(Notification::Next(pair));
      }
    });
  }

  fn error(self, err: Err) { self.post(|state| state.outbox.push(Notification::Error(err))) }

  fn complete(self) {
    self.post(|state| {
      state.pending -= 1;
      if state.pending == 0 {
        state.outbox.push(Notification::Completed);
      }
    });
  }
}

struct LatestAll<Item, Err> {
  values: Vec<Option<Item>>,
  missing: usize,
  pending: usize,
  outbox: Outbox<Vec<Item>, Err>,
}

impl<Item, Err> HasOutbox for LatestAll<Item, Err> {
  type Item = Vec<Item>;
  type Err = Err;

  fn outbox(&mut self) -> &mut Outbox<Vec<Item>, Err> { &mut self.outbox }
}

pub struct CombineLatestAll<Item, Err> {
  sources: Vec<Observable<Item, Err>>,
}

impl<Item, Err> OnSubscribe<Vec<Item>, Err> for CombineLatestAll<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Send + 'static,
{
  fn on_subscribe(&self, out: Subscriber<Vec<Item>, Err>) -> Result<(), Err> {
    let n = self.sources.len();
    if n == 0 {
      out.on_completed();
      return Ok(());
    }
    let state = MutArc::own(LatestAll {
      values: vec![None; n],
      missing: n,
      pending: n,
      outbox: Outbox::default(),
    });
    for (index, source) in self.sources.iter().enumerate() {
      let slot = SlotObserver { out: out.clone(), state: state.clone(), index };
      source.subscribe_with(Subscriber::new(out.lifetime().child(), slot));
    }
    Ok(())
  }
}

struct SlotObserver<Item, Err> {
  out: Subscriber<Vec<Item>, Err>,
  state: MutArc<LatestAll<Item, Err>>,
  index: usize,
}

impl<Item, Err> SlotObserver<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn post(&self, update: impl FnOnce(&mut LatestAll<Item, Err>)) {
    let out = &self.out;
    post(&self.state, update, |signal| out.emit(signal));
  }
}

impl<Item, Err> Observer<Item, Err> for SlotObserver<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) {
    let index = self.index;
    self.post(|state| {
      let slot = &mut state.values[index];
      if slot.is_none() {
        state.missing -= 1;
      }
      *slot = Some(value);
      if state.missing == 0 {
        if let Some(all) = state.values.iter().cloned().collect::<Option<Vec<_>>>() {
          state.outbox.push(Notification::Next(all));
        }
      }
    });
  }

  fn error(self, err: Err) { self.post(|state| state.outbox.push(Notification::Error(err))) }

  fn complete(self) {
    self.post(|state| {
      state.pending -= 1;
      if state.pending == 0 {
        state.outbox.push(Notification::Completed);
      }
    });
  }
}

/// Emits the latest value of every source, as a `Vec` in source order,
/// whenever any of them emits once all have emitted at least once.
pub fn combine_latest_all<Item, Err>(sources: Vec<Observable<Item, Err>>) -> Observable<Vec<Item>, Err>
where
  Item: Clone + Send + 'static,
  Err: Send + 'static,
{
  Observable::new(CombineLatestAll { sources })
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Combines the latest values of this observable and `other` with `f`
  /// whenever either emits, once both have emitted.
  ///
  /// A source that completes keeps contributing its last value; the output
  /// completes when both have completed.
  pub fn combine_latest<B, Out, F>(&self, other: Observable<B, Err>, f: F) -> Observable<Out, Err>
  where
    Item: Clone,
    B: Clone + Send + 'static,
    Out: Send + 'static,
    F: Fn(Item, B) -> Out + Send + Sync + 'static,
  {
    self.try_combine_latest(other, move |a, b| Ok(f(a, b)))
  }

  /// Like [`Observable::combine_latest`] with a selector that can fail. An
  /// `Err` from the selector ends the stream and unsubscribes both sources.
  pub fn try_combine_latest<B, Out, F>(&self, other: Observable<B, Err>, f: F) -> Observable<Out, Err>
  where
    Item: Clone,
    B: Clone + Send + 'static,
    Out: Send + 'static,
    F: Fn(Item, B) -> Result<Out, Err> + Send + Sync + 'static,
  {
    Observable::new(CombineLatest { a: self.clone(), b: other, selector: Arc::new(f) })
  }
}
