use std::{
  collections::VecDeque,
  sync::{Arc, Mutex},
};

use crate::{
  observable::{create, Observable},
  observer::{Notification, Observer},
  rc::{lock, MutArc},
  subject::Subject,
  subscriber::Subscriber,
  subscription::{CompositeSubscription, Subscription, SubscriptionLike},
};

/// A [`Subject`] that remembers the latest value and hands it to every new
/// subscriber before anything else.
#[derive(Clone)]
pub struct BehaviorSubject<Item, Err> {
  value: Arc<Mutex<Item>>,
  subject: Subject<Item, Err>,
}

impl<Item, Err> BehaviorSubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  pub fn new(initial: Item) -> Self {
    BehaviorSubject { value: Arc::new(Mutex::new(initial)), subject: Subject::new() }
  }

  /// The latest value.
  pub fn value(&self) -> Item { lock(&self.value).clone() }

  pub fn next(&self, value: Item) {
    *lock(&self.value) = value.clone();
    self.subject.next(value);
  }

  pub fn error(&self, err: Err) { self.subject.error(err) }

  pub fn complete(&self) { self.subject.complete() }

  pub fn emit(&self, signal: Notification<Item, Err>) {
    match signal {
      Notification::Next(value) => self.next(value),
      other => self.subject.emit(other),
    }
  }

  pub fn add(&self, subscriber: Subscriber<Item, Err>) {
    // Signals racing the replay wait in the backlog until the current value
    // is out, then the gate opens.
    let state = MutArc::own(GateState { backlog: Some(VecDeque::new()), settled: false });
    let gate_lifetime = CompositeSubscription::new();
    let (c_state, c_subscriber) = (state.clone(), subscriber.clone());
    gate_lifetime.add(Subscription::new(move || {
      if !c_state.rc_deref_mut().settled {
        c_subscriber.unsubscribe();
      }
    }));
    subscriber.add(gate_lifetime.clone());
    let gate = Subscriber::new(gate_lifetime, Gate { target: subscriber.clone(), state: state.clone() });

    let current = {
      let value = lock(&self.value);
      let casting = self.subject.is_casting();
      self.subject.add(gate);
      casting.then(|| value.clone())
    };
    if let Some(current) = current {
      subscriber.on_next(current);
    }
    loop {
      let batch = {
        let mut state = state.rc_deref_mut();
        match state.backlog.as_mut() {
          Some(pending) if pending.is_empty() => {
            state.backlog = None;
            break;
          }
          Some(pending) => std::mem::take(pending),
          None => break,
        }
      };
      for signal in batch {
        subscriber.emit(signal);
      }
    }
  }

  pub fn observable(&self) -> Observable<Item, Err> {
    let subject = self.clone();
    create(move |s| subject.add(s))
  }

  pub fn subscriber(&self) -> Subscriber<Item, Err> {
    Subscriber::new(self.subject.lifetime().clone(), BehaviorObserver(self.clone()))
  }

  pub fn has_observers(&self) -> bool { self.subject.has_observers() }

  pub fn lifetime(&self) -> &CompositeSubscription { self.subject.lifetime() }
}

struct GateState<Item, Err> {
  backlog: Option<VecDeque<Notification<Item, Err>>>,
  settled: bool,
}

struct Gate<Item, Err> {
  target: Subscriber<Item, Err>,
  state: MutArc<GateState<Item, Err>>,
}

impl<Item: Send + 'static, Err: Send + 'static> Gate<Item, Err> {
  fn pass(&self, signal: Notification<Item, Err>) {
    let signal = {
      let mut state = self.state.rc_deref_mut();
      state.settled |= signal.is_terminal();
      match state.backlog.as_mut() {
        Some(pending) => {
          pending.push_back(signal);
          return;
        }
        None => signal,
      }
    };
    self.target.emit(signal);
  }
}

impl<Item: Send + 'static, Err: Send + 'static> Observer<Item, Err> for Gate<Item, Err> {
  fn next(&mut self, value: Item) { self.pass(Notification::Next(value)) }

  fn error(self, err: Err) { self.pass(Notification::Error(err)) }

  fn complete(self) { self.pass(Notification::Completed) }
}

pub(crate) struct BehaviorObserver<Item, Err>(pub(crate) BehaviorSubject<Item, Err>);

impl<Item, Err> Observer<Item, Err> for BehaviorObserver<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn next(&mut self, value: Item) { self.0.next(value) }

  fn error(self, err: Err) { self.0.error(err) }

  fn complete(self) { self.0.complete() }
}
