use crate::{
  coordination::Coordination,
  observable::{Observable, Operator},
  observer::Observer,
  rc::MutArc,
  scheduler::{once, Duration, Worker},
  subscriber::Subscriber,
};

#[derive(Clone)]
pub struct DebounceOp<C> {
  period: Duration,
  coordination: C,
}

impl<Item, Err, C> Operator<Item, Item, Err> for DebounceOp<C>
where
  Item: Send + 'static,
  Err: Send + 'static,
  C: Coordination,
{
  fn apply(&self, out: Subscriber<Item, Err>) -> Subscriber<Item, Err> {
    let coordinator = self.coordination.create_coordinator(out.lifetime().clone());
    let out = coordinator.output(out);
    let upstream = out.lifetime().child();
    Subscriber::new(
      upstream,
      DebounceObserver {
        out,
        worker: coordinator.worker().clone(),
        period: self.period,
        state: MutArc::own(Trailing { index: 0, value: None }),
      },
    )
  }
}

struct Trailing<Item> {
  /// Bumped by every value; a settle action only fires for the index it was
  /// scheduled with.
  index: u64,
  value: Option<Item>,
}

pub struct DebounceObserver<Item, Err> {
  out: Subscriber<Item, Err>,
  worker: Worker,
  period: Duration,
  state: MutArc<Trailing<Item>>,
}

impl<Item, Err> Observer<Item, Err> for DebounceObserver<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) {
    let index = {
      let mut state = self.state.rc_deref_mut();
      state.index += 1;
      state.value = Some(value);
      state.index
    };
    let (state, out) = (self.state.clone(), self.out.clone());
    self.worker.schedule_after(
      self.period,
      once(move |_| {
        let settled = {
          let mut state = state.rc_deref_mut();
          if state.index == index { state.value.take() } else { None }
        };
        if let Some(v) = settled {
          out.on_next(v);
        }
      }),
    );
  }

  fn error(self, err: Err) {
    let Self { out, worker, state, .. } = self;
    worker.schedule(once(move |_| {
      state.rc_deref_mut().value = None;
      out.on_error(err);
    }));
  }

  fn complete(self) {
    let Self { out, worker, state, .. } = self;
    worker.schedule(once(move |_| {
      let pending = state.rc_deref_mut().value.take();
      if let Some(v) = pending {
        out.on_next(v);
      }
      out.on_completed();
    }));
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Emits a value only after `period` has passed without another value.
  /// A pending value is flushed when the source completes.
  pub fn debounce<C: Coordination>(&self, period: Duration, coordination: C) -> Observable<Item, Err> {
    self.lift(DebounceOp { period, coordination })
  }
}
