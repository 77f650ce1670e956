use std::collections::VecDeque;

use crate::{
  observable::{from_iter, Observable, Operator},
  observer::Observer,
  rc::MutArc,
  subscriber::Subscriber,
};

#[derive(Clone)]
pub struct ConcatAllOp;

impl<Item, Err> Operator<Observable<Item, Err>, Item, Err> for ConcatAllOp
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn apply(&self, out: Subscriber<Item, Err>) -> Subscriber<Observable<Item, Err>, Err> {
    let outer = out.lifetime().child();
    let state = MutArc::own(Queue { waiting: VecDeque::new(), active: false, outer_done: false });
    Subscriber::new(outer, ConcatAllObserver { out, state })
  }
}

struct Queue<Item, Err> {
  waiting: VecDeque<Observable<Item, Err>>,
  /// An inner observable is subscribed and has not completed yet.
  active: bool,
  outer_done: bool,
}

pub struct ConcatAllObserver<Item, Err> {
  out: Subscriber<Item, Err>,
  state: MutArc<Queue<Item, Err>>,
}

fn subscribe_inner<Item, Err>(
  inner: Observable<Item, Err>, out: &Subscriber<Item, Err>, state: &MutArc<Queue<Item, Err>>,
) where
  Item: Send + 'static,
  Err: Send + 'static,
{
  let lifetime = out.lifetime().child();
  inner.subscribe_with(Subscriber::new(
    lifetime,
    InnerObserver { out: out.clone(), state: state.clone() },
  ));
}

impl<Item, Err> Observer<Observable<Item, Err>, Err> for ConcatAllObserver<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, inner: Observable<Item, Err>) {
    {
      let mut state = self.state.rc_deref_mut();
      if state.active {
        state.waiting.push_back(inner);
        return;
      }
      state.active = true;
    }
    subscribe_inner(inner, &self.out, &self.state);
  }

  fn error(self, err: Err) { self.out.on_error(err) }

  fn complete(self) {
    let idle = {
      let mut state = self.state.rc_deref_mut();
      state.outer_done = true;
      !state.active
    };
    if idle {
      self.out.on_completed();
    }
  }
}

struct InnerObserver<Item, Err> {
  out: Subscriber<Item, Err>,
  state: MutArc<Queue<Item, Err>>,
}

impl<Item, Err> Observer<Item, Err> for InnerObserver<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) { self.out.on_next(value) }

  fn error(self, err: Err) { self.out.on_error(err) }

  fn complete(self) {
    let next = {
      let mut state = self.state.rc_deref_mut();
      let next = state.waiting.pop_front();
      if next.is_none() {
        state.active = false;
      }
      next.ok_or(state.outer_done)
    };
    match next {
      Ok(inner) => subscribe_inner(inner, &self.out, &self.state),
      Err(true) => self.out.on_completed(),
      Err(false) => {}
    }
  }
}

/// Subscribes to each source in turn, starting the next when the previous
/// completes.
pub fn concat<Item, Err>(sources: Vec<Observable<Item, Err>>) -> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  from_iter(sources).concat_all()
}

impl<Item, Err> Observable<Observable<Item, Err>, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Forwards the inner observables one after another. Inner observables
  /// arriving while one is running are queued; the stream completes once the
  /// outer source and the last inner one have completed.
  pub fn concat_all(&self) -> Observable<Item, Err> { self.lift(ConcatAllOp) }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Emits everything from this observable, then everything from `other`.
  pub fn concat(&self, other: Observable<Item, Err>) -> Observable<Item, Err> {
    concat(vec![self.clone(), other])
  }

  /// Maps each value to an observable and concatenates them in order.
  pub fn concat_map<Out, F>(&self, f: F) -> Observable<Out, Err>
  where
    Out: Send + 'static,
    F: FnMut(Item) -> Observable<Out, Err> + Clone + Send + Sync + 'static,
  {
    self.map(f).concat_all()
  }
}
