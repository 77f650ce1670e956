use crate::{
  observable::{Observable, Operator},
  observer::Observer,
  rc::MutArc,
  subscriber::Subscriber,
  subscription::{CompositeSubscription, SubscriptionLike},
};

#[derive(Clone)]
pub struct SwitchOnNextOp;

impl<Item, Err> Operator<Observable<Item, Err>, Item, Err> for SwitchOnNextOp
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn apply(&self, out: Subscriber<Item, Err>) -> Subscriber<Observable<Item, Err>, Err> {
    let outer = out.lifetime().child();
    let state = MutArc::own(Switch { generation: 0, inner: None, outer_done: false });
    Subscriber::new(outer, SwitchOnNextObserver { out, state })
  }
}

struct Switch {
  /// Identifies the latest inner observable.
  generation: u64,
  /// Lifetime of the latest inner observable while it is running.
  inner: Option<CompositeSubscription>,
  outer_done: bool,
}

pub struct SwitchOnNextObserver<Item, Err> {
  out: Subscriber<Item, Err>,
  state: MutArc<Switch>,
}

impl<Item, Err> Observer<Observable<Item, Err>, Err> for SwitchOnNextObserver<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, inner: Observable<Item, Err>) {
    let lifetime = self.out.lifetime().child();
    let (generation, previous) = {
      let mut state = self.state.rc_deref_mut();
      state.generation += 1;
      (state.generation, state.inner.replace(lifetime.clone()))
    };
    if let Some(previous) = previous {
      previous.unsubscribe();
    }
    inner.subscribe_with(Subscriber::new(
      lifetime,
      InnerObserver { out: self.out.clone(), state: self.state.clone(), generation },
    ));
  }

  fn error(self, err: Err) { self.out.on_error(err) }

  fn complete(self) {
    let idle = {
      let mut state = self.state.rc_deref_mut();
      state.outer_done = true;
      state.inner.is_none()
    };
    if idle {
      self.out.on_completed();
    }
  }
}

struct InnerObserver<Item, Err> {
  out: Subscriber<Item, Err>,
  state: MutArc<Switch>,
  generation: u64,
}

impl<Item, Err> InnerObserver<Item, Err> {
  fn is_latest(&self) -> bool { self.state.rc_deref_mut().generation == self.generation }
}

impl<Item, Err> Observer<Item, Err> for InnerObserver<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) {
    if self.is_latest() {
      self.out.on_next(value);
    }
  }

  fn error(self, err: Err) {
    if self.is_latest() {
      self.out.on_error(err);
    }
  }

  fn complete(self) {
    let finished = {
      let mut state = self.state.rc_deref_mut();
      if state.generation != self.generation {
        return;
      }
      state.inner = None;
      state.outer_done
    };
    if finished {
      self.out.on_completed();
    }
  }
}

impl<Item, Err> Observable<Observable<Item, Err>, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Forwards only the latest inner observable, unsubscribing the previous
  /// one whenever a new one arrives. Completes once the outer source and the
  /// latest inner one have completed.
  pub fn switch_on_next(&self) -> Observable<Item, Err> { self.lift(SwitchOnNextOp) }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Maps each value to an observable and switches to the latest one.
  pub fn switch_map<Out, F>(&self, f: F) -> Observable<Out, Err>
  where
    Out: Send + 'static,
    F: FnMut(Item) -> Observable<Out, Err> + Clone + Send + Sync + 'static,
  {
    self.map(f).switch_on_next()
  }
}
